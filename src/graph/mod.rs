//! Flow graph primitives for bundle matching.
//!
//! ## Architecture
//!
//! The graph is a slab arena built fresh for every search and dropped when
//! the search ends:
//!
//! - **Nodes**: one per order item, bounded by the item's max contribution
//! - **Edges**: root item to compatible opposing item, capacity fixed at link
//! - **Groups**: one per order, capping flow at the order's requested count
//!
//! ## Components
//!
//! - [`Node`]: vertex with typed payload and adjacency lists of edge keys
//! - [`Edge`]: directed link carrying `flow <= capacity`
//! - [`FlowGraph`]: the arena, with `link`, `unlink` and `push_flow`
//! - [`OrderNodeCollection`]: an order's item nodes and live flow totals
//!
//! ## Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Add node | O(1) |
//! | Link | O(deg) |
//! | Unlink node | O(deg²) |
//! | Flow round | O(E · deg) |

pub mod collection;
pub mod edge;
pub mod flow;
pub mod node;

pub use collection::{OrderGraph, OrderItemNode, OrderNodeCollection};
pub use edge::Edge;
pub use flow::FlowGraph;
pub use node::{EdgeKey, FlowNode, GroupKey, Node, NodeKey};
