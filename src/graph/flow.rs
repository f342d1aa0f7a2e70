//! Arena-backed flow graph.
//!
//! ## Architecture
//!
//! - **Nodes**: `Slab<Node<T>>`, each bounded by its payload's [`FlowNode::max_flow`]
//! - **Edges**: `Slab<Edge>`, capacity fixed at link time
//! - **Groups**: `Slab<Group>`, each capping the combined flow of its members
//!
//! A group models an order: its member nodes are the order's items and its
//! limit is the number of items the order requests.
//!
//! ## Flow pushing
//!
//! [`FlowGraph::push_flow`] runs one greedy round over every edge in key
//! order, pushing `min(residual capacity, supply at the source, demand at the
//! sink)` through each. Supply and demand only shrink during a round, so a
//! round that pushes nothing means the graph is stable.
//!
//! ## Example
//!
//! ```
//! use nft_order_matcher::graph::{FlowGraph, FlowNode};
//!
//! struct Slot(u32);
//! impl FlowNode for Slot {
//!     fn max_flow(&self) -> u32 { self.0 }
//! }
//!
//! let mut graph = FlowGraph::new();
//! let a = graph.add_node(Slot(2), None);
//! let b = graph.add_node(Slot(1), None);
//! let c = graph.add_node(Slot(1), None);
//!
//! graph.link(a, b).unwrap();
//! graph.link(a, c).unwrap();
//!
//! assert_eq!(graph.push_flow(), 2);
//! assert_eq!(graph.push_flow(), 0);
//! ```

use slab::Slab;

use crate::graph::edge::Edge;
use crate::graph::node::{EdgeKey, FlowNode, GroupKey, Node, NodeKey};

/// Flow cap shared by several nodes.
#[derive(Debug, Clone)]
pub(crate) struct Group {
    limit: u32,
    members: Vec<NodeKey>,
}

/// Directed flow graph over nodes of type `T`.
#[derive(Debug, Clone)]
pub struct FlowGraph<T> {
    nodes: Slab<Node<T>>,
    edges: Slab<Edge>,
    groups: Slab<Group>,
}

impl<T: FlowNode> Default for FlowGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FlowNode> FlowGraph<T> {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            edges: Slab::new(),
            groups: Slab::new(),
        }
    }

    /// Create a graph with pre-allocated storage
    ///
    /// # Arguments
    ///
    /// * `nodes` - Number of nodes to pre-allocate
    /// * `edges` - Number of edges to pre-allocate
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes: Slab::with_capacity(nodes),
            edges: Slab::with_capacity(edges),
            groups: Slab::new(),
        }
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Add a group capping the combined flow of its members at `limit`.
    pub fn add_group(&mut self, limit: u32) -> GroupKey {
        self.groups.insert(Group {
            limit,
            members: Vec::new(),
        })
    }

    /// Add a node, optionally as a member of `group`.
    ///
    /// An unknown group key is ignored.
    pub fn add_node(&mut self, data: T, group: Option<GroupKey>) -> NodeKey {
        let group = group.filter(|g| self.groups.contains(*g));
        let key = self.nodes.insert(Node::new(data, group));
        if let Some(group) = group.and_then(|g| self.groups.get_mut(g)) {
            group.members.push(key);
        }
        key
    }

    /// Link `from` to `to`.
    ///
    /// The capacity is the smaller of the two nodes' remaining contributions.
    ///
    /// # Returns
    ///
    /// * `Some(key)` - The new edge
    /// * `None` - Self-link, unknown node, duplicate edge or zero capacity
    pub fn link(&mut self, from: NodeKey, to: NodeKey) -> Option<EdgeKey> {
        if from == to || !self.nodes.contains(from) || !self.nodes.contains(to) {
            return None;
        }
        if self.find_edge(from, to).is_some() {
            return None;
        }

        let capacity = self.remaining(from).min(self.remaining(to));
        if capacity == 0 {
            return None;
        }

        let key = self.edges.insert(Edge::new(from, to, capacity));
        self.nodes[from].outgoing.push(key);
        self.nodes[to].incoming.push(key);
        Some(key)
    }

    /// Remove every edge touching `node`, in both directions.
    ///
    /// Flow carried by the removed edges is released at the other endpoints.
    ///
    /// # Returns
    ///
    /// The number of edges removed
    pub fn unlink(&mut self, node: NodeKey) -> usize {
        let keys: Vec<EdgeKey> = match self.nodes.get_mut(node) {
            Some(n) => n.outgoing.drain(..).chain(n.incoming.drain(..)).collect(),
            None => return 0,
        };

        let mut removed = 0;
        for key in keys {
            let Some(edge) = self.edges.try_remove(key) else {
                continue;
            };
            let other = if edge.from == node { edge.to } else { edge.from };
            if let Some(other) = self.nodes.get_mut(other) {
                other.outgoing.retain(|&k| k != key);
                other.incoming.retain(|&k| k != key);
            }
            removed += 1;
        }
        removed
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[inline]
    pub fn node(&self, key: NodeKey) -> Option<&Node<T>> {
        self.nodes.get(key)
    }

    #[inline]
    pub fn edge(&self, key: EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edge from `from` to `to`, if linked
    pub fn find_edge(&self, from: NodeKey, to: NodeKey) -> Option<EdgeKey> {
        self.nodes
            .get(from)?
            .outgoing
            .iter()
            .copied()
            .find(|&k| self.edges.get(k).map_or(false, |e| e.to == to))
    }

    /// Edges currently carrying flow, in key order
    pub fn edges_with_flow(&self) -> impl Iterator<Item = (EdgeKey, &Edge)> + '_ {
        self.edges.iter().filter(|(_, edge)| edge.has_flow())
    }

    /// Sum of flow over every edge
    pub fn total_flow(&self) -> u32 {
        self.edges.iter().map(|(_, edge)| edge.flow).sum()
    }

    // ========================================================================
    // Flow accounting
    // ========================================================================

    /// Flow arriving at `node`
    pub fn inflow(&self, node: NodeKey) -> u32 {
        self.sum_flow(self.nodes.get(node).map(|n| n.incoming.as_slice()))
    }

    /// Flow leaving `node`
    pub fn outflow(&self, node: NodeKey) -> u32 {
        self.sum_flow(self.nodes.get(node).map(|n| n.outgoing.as_slice()))
    }

    /// Flow arriving at the members of `group`
    pub fn group_inflow(&self, group: GroupKey) -> u32 {
        self.members(group).iter().map(|&n| self.inflow(n)).sum()
    }

    /// Flow leaving the members of `group`
    pub fn group_outflow(&self, group: GroupKey) -> u32 {
        self.members(group).iter().map(|&n| self.outflow(n)).sum()
    }

    fn members(&self, group: GroupKey) -> &[NodeKey] {
        self.groups
            .get(group)
            .map(|g| g.members.as_slice())
            .unwrap_or_default()
    }

    fn sum_flow(&self, keys: Option<&[EdgeKey]>) -> u32 {
        keys.unwrap_or_default()
            .iter()
            .filter_map(|&k| self.edges.get(k))
            .map(|e| e.flow)
            .sum()
    }

    fn group_limit(&self, node: &Node<T>) -> Option<(GroupKey, u32)> {
        let group = node.group?;
        self.groups.get(group).map(|g| (group, g.limit))
    }

    /// Contribution `node` can still make, counting flow in both directions.
    pub fn remaining(&self, node: NodeKey) -> u32 {
        let Some(n) = self.nodes.get(node) else {
            return 0;
        };
        let own = n
            .data
            .max_flow()
            .saturating_sub(self.inflow(node) + self.outflow(node));

        match self.group_limit(n) {
            Some((group, limit)) => {
                let used = self.group_inflow(group) + self.group_outflow(group);
                own.min(limit.saturating_sub(used))
            }
            None => own,
        }
    }

    /// Flow `node` can still send.
    pub fn supply(&self, node: NodeKey) -> u32 {
        let Some(n) = self.nodes.get(node) else {
            return 0;
        };
        let own = n.data.max_flow().saturating_sub(self.outflow(node));

        match self.group_limit(n) {
            Some((group, limit)) => own.min(limit.saturating_sub(self.group_outflow(group))),
            None => own,
        }
    }

    /// Flow `node` can still receive.
    pub fn demand(&self, node: NodeKey) -> u32 {
        let Some(n) = self.nodes.get(node) else {
            return 0;
        };
        let own = n.data.max_flow().saturating_sub(self.inflow(node));

        match self.group_limit(n) {
            Some((group, limit)) => own.min(limit.saturating_sub(self.group_inflow(group))),
            None => own,
        }
    }

    /// Run one flow round over every edge.
    ///
    /// # Returns
    ///
    /// Total flow pushed in this round (0 when the graph is stable)
    pub fn push_flow(&mut self) -> u32 {
        let keys: Vec<EdgeKey> = self.edges.iter().map(|(key, _)| key).collect();
        let mut pushed = 0;

        for key in keys {
            let Edge { from, to, .. } = self.edges[key];
            let amount = self.edges[key]
                .residual()
                .min(self.supply(from))
                .min(self.demand(to));

            if amount > 0 {
                self.edges[key].flow += amount;
                pushed += amount;
            }
        }
        pushed
    }

    /// Overwrite the flow on an edge, bypassing every bound.
    #[cfg(test)]
    pub(crate) fn force_flow(&mut self, edge: EdgeKey, flow: u32) {
        if let Some(edge) = self.edges.get_mut(edge) {
            edge.flow = flow;
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
