//! Item compatibility constraints.
//!
//! ## Design
//!
//! A [`ConstraintChain`] is an ordered list of [`ItemConstraint`] policies.
//! Each policy plays two roles:
//!
//! 1. **Validation**: `check` decides whether a concrete candidate item is
//!    compatible with the current item.
//! 2. **Query narrowing**: `narrow_query` adds an equivalent backend filter
//!    when the check is cheaply expressible in a query. Policies that depend
//!    on time (auction prices) leave the query untouched and rely on `check`.
//!
//! Validation runs every policy, so a rejection reports all failing reasons
//! rather than the first one.
//!
//! ## Example
//!
//! ```
//! use nft_order_matcher::constraints::ConstraintChain;
//! use nft_order_matcher::types::{Order, PriceCurve, Side};
//! use nft_order_matcher::types::price::parse_eth;
//!
//! let buy = Order::new("b", Side::Buy, 1, PriceCurve::flat(parse_eth("1.5").unwrap(), 0, 1_000));
//! let sell = Order::new("s", Side::Sell, 1, PriceCurve::flat(parse_eth("1").unwrap(), 0, 1_000));
//!
//! let chain = ConstraintChain::default();
//! let wanted = buy.item("b-0", "0xc011");
//! let offered = sell.item("s-0", "0xc011").with_token("7");
//!
//! assert!(chain.is_match(&wanted, &offered).is_valid());
//! assert!(chain.is_mutual_match(&wanted, &offered));
//! ```

mod policies;
mod query;

use std::fmt;

use crate::types::OrderItem;

pub use policies::{
    ChainConstraint, CollectionConstraint, ComplicationConstraint, CurrencyConstraint, PriceConstraint,
    SideConstraint, StatusConstraint, TimeWindowConstraint, TokenConstraint, TraitConstraint,
};
pub use query::{CandidateQuery, Cursor, QueryFilter, SortKey, SortValue};

/// A single compatibility rule between an item and a candidate item.
pub trait ItemConstraint: fmt::Debug + Send + Sync {
    /// Short name used to prefix rejection reasons
    fn name(&self) -> &'static str;

    /// Restrictiveness estimate; higher narrows the candidate set more
    fn score(&self) -> u32 {
        0
    }

    /// Check `candidate` against `item`, returning the reason on failure.
    fn check(&self, item: &OrderItem, candidate: &OrderItem) -> Result<(), String>;

    /// Add this rule's backend filter for candidates of `item`.
    fn narrow_query(&self, _item: &OrderItem, query: CandidateQuery) -> CandidateQuery {
        query
    }

    /// Ordering keys this rule contributes to the candidate stream
    fn sort_keys(&self) -> &'static [SortKey] {
        &[]
    }
}

/// Outcome of validating a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    /// Failure reasons, empty when valid
    pub reasons: Vec<String>,
}

impl Validation {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Ordered list of constraint policies.
#[derive(Debug)]
pub struct ConstraintChain {
    constraints: Vec<Box<dyn ItemConstraint>>,
}

impl Default for ConstraintChain {
    /// The full matching policy set.
    fn default() -> Self {
        Self::new()
            .with(ChainConstraint)
            .with(SideConstraint)
            .with(StatusConstraint)
            .with(CollectionConstraint)
            .with(TokenConstraint)
            .with(TraitConstraint)
            .with(ComplicationConstraint)
            .with(CurrencyConstraint)
            .with(TimeWindowConstraint)
            .with(PriceConstraint)
    }
}

impl ConstraintChain {
    /// An empty chain that accepts everything.
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    /// Append a policy.
    pub fn with(mut self, constraint: impl ItemConstraint + 'static) -> Self {
        self.constraints.push(Box::new(constraint));
        self
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Policy names in evaluation order
    pub fn names(&self) -> Vec<&'static str> {
        self.constraints.iter().map(|c| c.name()).collect()
    }

    /// Summed restrictiveness of all policies
    pub fn score(&self) -> u32 {
        self.constraints.iter().map(|c| c.score()).sum()
    }

    /// Validate `candidate` against `item` under every policy.
    pub fn is_match(&self, item: &OrderItem, candidate: &OrderItem) -> Validation {
        let reasons = self
            .constraints
            .iter()
            .filter_map(|constraint| {
                constraint
                    .check(item, candidate)
                    .err()
                    .map(|reason| format!("{}: {}", constraint.name(), reason))
            })
            .collect();
        Validation { reasons }
    }

    /// Whether the two items accept each other.
    pub fn is_mutual_match(&self, a: &OrderItem, b: &OrderItem) -> bool {
        self.is_match(a, b).is_valid() && self.is_match(b, a).is_valid()
    }

    /// Build the paged candidate query for `item`.
    ///
    /// Filters are folded in policy order, ordering keys are collected from
    /// every policy and finished with the item id so the stream has a total
    /// order.
    pub fn candidate_query(&self, item: &OrderItem, page_size: usize) -> CandidateQuery {
        let query = self
            .constraints
            .iter()
            .fold(CandidateQuery::new(), |query, constraint| {
                constraint.narrow_query(item, query)
            });

        self.constraints
            .iter()
            .flat_map(|constraint| constraint.sort_keys().iter().copied())
            .fold(query, CandidateQuery::order_by)
            .order_by(SortKey::ItemId)
            .limit(page_size)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
