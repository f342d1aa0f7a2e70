//! # NFT Order Matcher
//!
//! Order matching for NFT marketplaces with partially specified, bundle and
//! Dutch-auction orders.
//!
//! ## Architecture
//!
//! - **Types**: Orders, items, price curves and match records
//! - **Intersection**: Where a bid curve meets or exceeds an ask curve
//! - **Constraints**: Pluggable item compatibility policies
//! - **Graph**: Slab-backed flow graph for bundle matching
//! - **Engine**: One-to-one and one-to-many searches
//! - **Store**: Async order store with paged candidate streams
//!
//! ## Design Principles
//!
//! 1. **Determinism**: All operations produce identical results for identical inputs
//! 2. **No Floating Point**: All prices use `rust_decimal::Decimal`
//! 3. **Arena Allocation**: Slab storage for O(1) node and edge operations
//! 4. **Async only at the edges**: Store reads are async, matching is synchronous

// ============================================================================
// Module declarations
// ============================================================================

/// Core data types: Order, OrderItem, PriceCurve, match records
pub mod types;

/// Error types
pub mod error;

/// Price curve intersection
pub mod intersection;

/// Item constraint chain
pub mod constraints;

/// Flow graph: nodes, edges and order collections
pub mod graph;

/// Matching engine: one-to-one, one-to-many and orchestration
pub mod engine;

/// Order storage and candidate paging
pub mod store;

/// Configuration loading
pub mod config;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::{ConfigLoader, MatcherConfig};
pub use constraints::ConstraintChain;
pub use engine::{OrdersGraph, SearchOutcome};
pub use error::{MatchError, Result};
pub use intersection::PriceIntersection;
pub use store::{MemoryOrderStore, OrderStore};
pub use types::{Order, OrderItem, OrderMatch, PriceCurve, ResolvedOrder, Side};
