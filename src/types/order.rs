//! Order types for the matching engine.
//!
//! ## Orders and items
//!
//! An [`Order`] requests `num_items` NFTs at a total price described by its
//! [`PriceCurve`]. What qualifies as an acceptable NFT is described by the
//! order's [`OrderItem`]s: each item names a collection and optionally pins a
//! token or restricts by traits.
//!
//! An order is *fully specified* when every item pins an exact token. Only
//! fully specified orders can be matched against several counter-orders at
//! once (one-to-many).

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::types::item::OrderItem;
use crate::types::price::PriceCurve;

// ============================================================================
// Side enum
// ============================================================================

/// Order side: Buy or Sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid) - wants to acquire NFTs
    #[default]
    Buy,
    /// Sell order (ask) - wants to sell NFTs
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

// ============================================================================
// OrderStatus enum
// ============================================================================

/// Lifecycle status of an order. Only active orders are matchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    /// Open and valid
    #[default]
    Active,
    /// Temporarily invalid (e.g. missing approval or balance)
    Inactive,
    /// Past its end time
    Expired,
    /// Fulfilled on chain
    Filled,
    /// Cancelled by the maker
    Cancelled,
}

// ============================================================================
// Order struct
// ============================================================================

/// An order in the book.
///
/// ## Example
///
/// ```
/// use nft_order_matcher::types::{Order, PriceCurve, Side};
/// use nft_order_matcher::types::price::parse_eth;
///
/// let price = PriceCurve::flat(parse_eth("1.5").unwrap(), 0, 1_000);
/// let order = Order::new("order-1", Side::Buy, 2, price);
///
/// assert!(!order.is_sell());
/// assert_eq!(order.num_items, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique order identifier
    pub id: String,

    /// Chain the order settles on
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Buy or Sell
    pub side: Side,

    /// Number of NFTs requested (at least 1)
    pub num_items: u32,

    /// Total price for all `num_items` NFTs over time
    pub price: PriceCurve,

    /// Lifecycle status
    #[serde(default)]
    pub status: OrderStatus,

    /// Maker address
    #[serde(default)]
    pub maker: String,

    /// Settlement protocol (complication) address
    #[serde(default)]
    pub complication: String,

    /// Currency address
    #[serde(default)]
    pub currency: String,
}

fn default_chain_id() -> u64 {
    1
}

impl Order {
    /// Create a new active order on chain 1.
    ///
    /// # Arguments
    ///
    /// * `id` - Unique order identifier
    /// * `side` - Buy or Sell
    /// * `num_items` - Number of NFTs requested
    /// * `price` - Total price curve
    pub fn new(id: impl Into<String>, side: Side, num_items: u32, price: PriceCurve) -> Self {
        Self {
            id: id.into(),
            chain_id: default_chain_id(),
            side,
            num_items,
            price,
            status: OrderStatus::Active,
            maker: String::new(),
            complication: String::new(),
            currency: String::new(),
        }
    }

    /// Set the complication address.
    pub fn with_complication(mut self, complication: impl Into<String>) -> Self {
        self.complication = complication.into();
        self
    }

    /// Set the currency address.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set the chain id.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Check if this is a sell order
    #[inline]
    pub fn is_sell(&self) -> bool {
        self.side == Side::Sell
    }

    /// First instant the order is active (unix ms)
    #[inline]
    pub fn start_time(&self) -> u64 {
        self.price.start_time
    }

    /// Create an item of this order for `collection`.
    ///
    /// The item copies the order fields constraints look at, the same way
    /// the backing store denormalises them onto each item document.
    pub fn item(&self, id: impl Into<String>, collection: impl Into<String>) -> OrderItem {
        OrderItem {
            id: id.into(),
            order_id: self.id.clone(),
            chain_id: self.chain_id,
            side: self.side,
            status: self.status,
            num_items: self.num_items,
            price: self.price,
            complication: self.complication.clone(),
            currency: self.currency.clone(),
            collection: collection.into(),
            token_id: None,
            num_tokens: 1,
            token_attributes: Default::default(),
            trait_filters: Vec::new(),
        }
    }

    /// Whether every item pins an exact token.
    pub fn is_fully_specified(items: &[OrderItem]) -> bool {
        !items.is_empty() && items.iter().all(OrderItem::pins_token)
    }

    /// Check that `items` are consistent with this order.
    ///
    /// Every item must belong to this order, and a fully specified order must
    /// request exactly as many NFTs as its items can contribute.
    pub fn validate_items(&self, items: &[OrderItem]) -> Result<()> {
        if self.num_items == 0 {
            return Err(self.invalid("order requests zero items".to_string()));
        }

        if let Some(foreign) = items.iter().find(|item| item.order_id != self.id) {
            return Err(self.invalid(format!(
                "item {} belongs to order {}",
                foreign.id, foreign.order_id
            )));
        }

        if Self::is_fully_specified(items) {
            let contribution = items
                .iter()
                .try_fold(0u32, |acc, item| acc.checked_add(item.max_contribution()))
                .ok_or_else(|| self.invalid("token contributions overflow".to_string()))?;
            if contribution != self.num_items {
                return Err(self.invalid(format!(
                    "requests {} items but its tokens contribute {}",
                    self.num_items, contribution
                )));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> MatchError {
        MatchError::InvalidOrder {
            order_id: self.id.clone(),
            reason,
        }
    }
}

// ============================================================================
// Resolved order
// ============================================================================

/// An order together with its items, as resolved from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOrder {
    /// The order
    pub order: Order,

    /// The order's items, in store order
    pub items: Vec<OrderItem>,
}

impl ResolvedOrder {
    /// Pair an order with its items.
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }

    /// Order identifier
    #[inline]
    pub fn id(&self) -> &str {
        &self.order.id
    }

    /// Whether every item pins an exact token.
    pub fn is_fully_specified(&self) -> bool {
        Order::is_fully_specified(&self.items)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
