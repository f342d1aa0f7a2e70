//! Matching engine module.
//!
//! ## Design Principles
//!
//! 1. **Determinism**: Same orders and `now` always produce the same matches
//! 2. **Fixed-Point Math**: Prices are `Decimal`, never floating point
//! 3. **Per-search state**: Graphs live only for the duration of one search
//! 4. **Oldest first**: Candidates are considered in start-time order
//!
//! ## Searches
//!
//! - **One-to-one**: the root is filled entirely by one opposing order
//! - **One-to-many**: a fully specified multi-item root is filled exactly by
//!   several single-item opposing orders
//! - **Requires scan**: multi-item candidates of a single-item root are
//!   reported for a search from their own side
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use nft_order_matcher::config::MatcherConfig;
//! use nft_order_matcher::engine::OrdersGraph;
//! use nft_order_matcher::store::MemoryOrderStore;
//! use nft_order_matcher::types::{Order, PriceCurve, ResolvedOrder, Side};
//! use nft_order_matcher::types::price::parse_eth;
//!
//! let buy = Order::new("buy", Side::Buy, 1, PriceCurve::flat(parse_eth("1.5").unwrap(), 0, 1_000));
//! let sell = Order::new("sell", Side::Sell, 1, PriceCurve::flat(parse_eth("1").unwrap(), 0, 1_000));
//! let root = ResolvedOrder::new(buy.clone(), vec![buy.item("buy-0", "0xcoll")]);
//! let candidate = ResolvedOrder::new(sell.clone(), vec![sell.item("sell-0", "0xcoll").with_token("7")]);
//!
//! let engine = OrdersGraph::new(Arc::new(MemoryOrderStore::new()), MatcherConfig::default());
//! let outcome = engine.search_with_candidates(&root, &[candidate], 100).unwrap();
//!
//! assert_eq!(outcome.matches.len(), 1);
//! assert_eq!(outcome.matches[0].price(), parse_eth("1.5").unwrap());
//! ```

pub mod one_to_many;
pub mod one_to_one;
pub mod orders_graph;

pub use one_to_many::{is_eligible_root, OneToManySearch};
pub use one_to_one::OneToOneSearch;
pub use orders_graph::{OrdersGraph, SearchOutcome};
