//! Match records produced by the searches.
//!
//! ## Records
//!
//! - [`OneToOneMatch`]: the root order filled entirely by one opposing order,
//!   item by item.
//! - [`OneToManyMatch`]: a multi-item root order filled exactly by several
//!   single-item opposing orders.
//!
//! Records carry the clearing price and the instant it is valid at. They are
//! plain data: persisting or broadcasting them is the caller's business.
//!
//! ## Identifiers
//!
//! Each record gets a deterministic id: the SHA-256 of the sorted ids of the
//! orders involved. The same set of orders always produces the same id, so
//! callers can upsert records idempotently.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::item::OrderItem;
use crate::types::order::Order;

/// Compute the deterministic id of a match between `order_ids`.
///
/// # Example
///
/// ```
/// use nft_order_matcher::types::match_id;
///
/// assert_eq!(match_id(["a", "b"]), match_id(["b", "a"]));
/// assert_eq!(match_id(["a", "b"]).len(), 64);
/// ```
pub fn match_id<'a>(order_ids: impl IntoIterator<Item = &'a str>) -> String {
    let mut ids: Vec<&str> = order_ids.into_iter().collect();
    ids.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(ids.join(":").as_bytes());
    hex::encode(hasher.finalize())
}

/// A root item paired with the opposing item that fulfils it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPair {
    pub order_item: OrderItem,
    pub opposing_order_item: OrderItem,
}

/// Flow between a root item and an opposing item in a one-to-many match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEdge {
    pub from: OrderItem,
    pub to: OrderItem,
    pub num_items: u32,
}

/// The root order filled by a single opposing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneToOneMatch {
    pub id: String,
    pub order: Order,
    pub opposing_order: Order,
    pub pairs: Vec<ItemPair>,
    /// Clearing price (ETH)
    pub price: Decimal,
    /// Instant the price is valid at (unix ms)
    pub timestamp: u64,
}

impl OneToOneMatch {
    pub fn new(
        order: Order,
        opposing_order: Order,
        pairs: Vec<ItemPair>,
        price: Decimal,
        timestamp: u64,
    ) -> Self {
        let id = match_id([order.id.as_str(), opposing_order.id.as_str()]);
        Self {
            id,
            order,
            opposing_order,
            pairs,
            price,
            timestamp,
        }
    }
}

/// A multi-item root order filled by several single-item opposing orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneToManyMatch {
    pub id: String,
    pub order: Order,
    pub opposing_orders: Vec<Order>,
    pub edges: Vec<ItemEdge>,
    /// Clearing price (ETH)
    pub price: Decimal,
    /// Instant the price is valid at (unix ms)
    pub timestamp: u64,
}

impl OneToManyMatch {
    pub fn new(
        order: Order,
        opposing_orders: Vec<Order>,
        edges: Vec<ItemEdge>,
        price: Decimal,
        timestamp: u64,
    ) -> Self {
        let id = match_id(
            std::iter::once(order.id.as_str()).chain(opposing_orders.iter().map(|o| o.id.as_str())),
        );
        Self {
            id,
            order,
            opposing_orders,
            edges,
            price,
            timestamp,
        }
    }

    /// Total number of NFTs moved across all edges.
    pub fn num_items(&self) -> u32 {
        self.edges.iter().map(|edge| edge.num_items).sum()
    }
}

/// Either kind of match record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderMatch {
    OneToOne(OneToOneMatch),
    OneToMany(OneToManyMatch),
}

impl OrderMatch {
    /// Deterministic record id
    pub fn id(&self) -> &str {
        match self {
            OrderMatch::OneToOne(m) => &m.id,
            OrderMatch::OneToMany(m) => &m.id,
        }
    }

    /// Clearing price (ETH)
    pub fn price(&self) -> Decimal {
        match self {
            OrderMatch::OneToOne(m) => m.price,
            OrderMatch::OneToMany(m) => m.price,
        }
    }

    /// Instant the price is valid at (unix ms)
    pub fn timestamp(&self) -> u64 {
        match self {
            OrderMatch::OneToOne(m) => m.timestamp,
            OrderMatch::OneToMany(m) => m.timestamp,
        }
    }

    /// Root order of the match
    pub fn order(&self) -> &Order {
        match self {
            OrderMatch::OneToOne(m) => &m.order,
            OrderMatch::OneToMany(m) => &m.order,
        }
    }

    /// Opposing orders of the match
    pub fn opposing_orders(&self) -> Vec<&Order> {
        match self {
            OrderMatch::OneToOne(m) => vec![&m.opposing_order],
            OrderMatch::OneToMany(m) => m.opposing_orders.iter().collect(),
        }
    }
}

impl From<OneToOneMatch> for OrderMatch {
    fn from(m: OneToOneMatch) -> Self {
        OrderMatch::OneToOne(m)
    }
}

impl From<OneToManyMatch> for OrderMatch {
    fn from(m: OneToManyMatch) -> Self {
        OrderMatch::OneToMany(m)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
