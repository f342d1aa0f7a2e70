//! Error types for the matching engine.
//!
//! ## Taxonomy
//!
//! - **Invariant violations** ([`MatchError::FlowInvariant`]) are fatal for the
//!   current search and always surface to the caller.
//! - **No-match conditions** are not errors. Searches return empty results.
//! - **Per-candidate failures** ([`MatchError::Arithmetic`], [`MatchError::SameSide`])
//!   are logged by the one-to-one search and the candidate is skipped.
//! - **Upstream failures** ([`MatchError::Store`]) come from the order store.

use thiserror::Error;

use crate::store::StoreError;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, MatchError>;

/// Errors produced while matching orders.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The root order of a search does not exist in the store.
    #[error("order {0} not found")]
    OrderNotFound(String),

    /// An order's items disagree with the order itself.
    #[error("invalid order {order_id}: {reason}")]
    InvalidOrder { order_id: String, reason: String },

    /// An order received more flow than it requested.
    ///
    /// This can only happen if the flow graph was built incorrectly.
    #[error("flow invariant violated for order {order_id}: received {flow}, requested at most {expected}")]
    FlowInvariant {
        order_id: String,
        flow: u32,
        expected: u32,
    },

    /// Two orders on the same side of the book were compared for a price.
    #[error("orders {0} and {1} are on the same side of the book")]
    SameSide(String, String),

    /// Decimal overflow while evaluating a price curve.
    #[error("price arithmetic overflow: {0}")]
    Arithmetic(&'static str),

    /// The order store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MatchError {
    /// Whether the error invalidates the whole search rather than one candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MatchError::FlowInvariant { .. } | MatchError::Store(_))
    }
}
