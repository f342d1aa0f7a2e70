//! Order items: the eligibility descriptors of an order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::order::{OrderStatus, Side};
use crate::types::price::PriceCurve;

/// A trait requirement on a wildcard item: the token's `trait_type`
/// attribute must take one of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitFilter {
    pub trait_type: String,
    pub values: Vec<String>,
}

impl TraitFilter {
    pub fn new(trait_type: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            trait_type: trait_type.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `attributes` satisfy this filter.
    pub fn accepts(&self, attributes: &BTreeMap<String, String>) -> bool {
        attributes
            .get(&self.trait_type)
            .map_or(false, |value| self.values.iter().any(|v| v == value))
    }
}

/// One eligibility descriptor of an order.
///
/// The parent order's chain, side, status, size, price and settlement fields
/// are copied onto each item so that a candidate item can be validated
/// without loading its order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Unique item identifier
    pub id: String,

    /// Parent order identifier
    pub order_id: String,

    pub chain_id: u64,
    pub side: Side,
    #[serde(default)]
    pub status: OrderStatus,

    /// Number of NFTs the parent order requests
    pub num_items: u32,

    /// Parent order's price curve
    pub price: PriceCurve,

    #[serde(default)]
    pub complication: String,
    #[serde(default)]
    pub currency: String,

    /// Collection address
    pub collection: String,

    /// Exact token, or `None` for any token of the collection
    #[serde(default)]
    pub token_id: Option<String>,

    /// Quantity of the pinned token
    #[serde(default = "default_num_tokens")]
    pub num_tokens: u32,

    /// Attributes of the pinned token
    #[serde(default)]
    pub token_attributes: BTreeMap<String, String>,

    /// Trait requirements for wildcard items
    #[serde(default)]
    pub trait_filters: Vec<TraitFilter>,
}

fn default_num_tokens() -> u32 {
    1
}

impl OrderItem {
    /// Pin this item to an exact token.
    pub fn with_token(mut self, token_id: impl Into<String>) -> Self {
        self.token_id = Some(token_id.into());
        self
    }

    /// Record an attribute of the pinned token.
    pub fn with_attribute(mut self, trait_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.token_attributes.insert(trait_type.into(), value.into());
        self
    }

    /// Require a trait on any token matched by this item.
    pub fn with_trait_filter(mut self, filter: TraitFilter) -> Self {
        self.trait_filters.push(filter);
        self
    }

    /// Whether the item pins an exact token.
    #[inline]
    pub fn pins_token(&self) -> bool {
        self.token_id.is_some()
    }

    /// Maximum number of NFTs this item can contribute to a single match.
    ///
    /// A pinned token contributes at most its quantity; a collection or
    /// trait wildcard can contribute up to the whole order.
    pub fn max_contribution(&self) -> u32 {
        if self.pins_token() {
            self.num_tokens.min(self.num_items)
        } else {
            self.num_items
        }
    }

    /// First instant the parent order is active (unix ms)
    #[inline]
    pub fn start_time(&self) -> u64 {
        self.price.start_time
    }

    /// Last instant of the parent order's window (unix ms)
    #[inline]
    pub fn end_time(&self) -> u64 {
        self.price.end_time
    }
}
