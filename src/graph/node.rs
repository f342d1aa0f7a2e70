//! Graph vertices.
//!
//! ## Slab Integration
//!
//! Nodes live in a `slab::Slab` owned by [`FlowGraph`](crate::graph::FlowGraph):
//! - Keys are `usize` values returned by `slab.insert()`
//! - Adjacency lists hold edge keys, never references
//! - O(1) insert and lookup

/// Slab key of a node
pub type NodeKey = usize;

/// Slab key of an edge
pub type EdgeKey = usize;

/// Slab key of a node group
pub type GroupKey = usize;

/// Payload that bounds how much flow its node may carry.
pub trait FlowNode {
    /// Maximum total flow through the node
    fn max_flow(&self) -> u32;
}

/// A graph vertex with a typed payload.
///
/// ## Memory Layout
///
/// ```text
/// Node<T> {
///     data: T
///     outgoing: Vec<EdgeKey>   edges leaving this node
///     incoming: Vec<EdgeKey>   edges arriving at this node
///     group: Option<GroupKey>  flow-capping group, if any
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// The payload
    pub data: T,

    pub(crate) outgoing: Vec<EdgeKey>,
    pub(crate) incoming: Vec<EdgeKey>,
    pub(crate) group: Option<GroupKey>,
}

impl<T> Node<T> {
    /// Create a node with no edges
    #[inline]
    pub fn new(data: T, group: Option<GroupKey>) -> Self {
        Self {
            data,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            group,
        }
    }

    /// Edges leaving this node, in creation order
    #[inline]
    pub fn outgoing(&self) -> &[EdgeKey] {
        &self.outgoing
    }

    /// Edges arriving at this node, in creation order
    #[inline]
    pub fn incoming(&self) -> &[EdgeKey] {
        &self.incoming
    }

    /// Group the node belongs to
    #[inline]
    pub fn group(&self) -> Option<GroupKey> {
        self.group
    }

    /// Check if the node has no edges
    #[inline]
    pub fn is_unlinked(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }
}
