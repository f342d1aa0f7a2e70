//! Capacity-bearing directed edges.

use crate::graph::node::NodeKey;

/// Directed edge between two nodes.
///
/// Invariant: `flow <= capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeKey,
    pub to: NodeKey,
    pub capacity: u32,
    pub(crate) flow: u32,
}

impl Edge {
    pub fn new(from: NodeKey, to: NodeKey, capacity: u32) -> Self {
        Self {
            from,
            to,
            capacity,
            flow: 0,
        }
    }

    /// Current flow
    #[inline]
    pub fn flow(&self) -> u32 {
        self.flow
    }

    /// Capacity not yet used by flow
    #[inline]
    pub fn residual(&self) -> u32 {
        self.capacity.saturating_sub(self.flow)
    }

    #[inline]
    pub fn is_saturated(&self) -> bool {
        self.flow >= self.capacity
    }

    #[inline]
    pub fn has_flow(&self) -> bool {
        self.flow > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_residual() {
        let mut edge = Edge::new(0, 1, 3);
        assert_eq!(edge.residual(), 3);
        assert!(!edge.has_flow());

        edge.flow = 2;
        assert_eq!(edge.residual(), 1);
        assert!(edge.has_flow());
        assert!(!edge.is_saturated());

        edge.flow = 3;
        assert!(edge.is_saturated());
    }
}
