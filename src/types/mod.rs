//! Core data types for the matching engine.
//!
//! All types derive `serde` traits so callers can store or publish them in
//! whatever schema they use. Prices are `rust_decimal::Decimal` ETH amounts.
//!
//! ## Types
//!
//! - [`Order`]: An order requesting one or more NFTs
//! - [`OrderItem`]: One eligibility descriptor of an order
//! - [`ResolvedOrder`]: An order with its items
//! - [`PriceCurve`]: Time-varying linear price
//! - [`OneToOneMatch`], [`OneToManyMatch`], [`OrderMatch`]: Match records

mod item;
mod matches;
mod order;
pub mod price;

pub use item::{OrderItem, TraitFilter};
pub use matches::{match_id, ItemEdge, ItemPair, OneToManyMatch, OneToOneMatch, OrderMatch};
pub use order::{Order, OrderStatus, ResolvedOrder, Side};
pub use price::PriceCurve;
