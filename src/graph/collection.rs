//! Order-level view over item nodes.
//!
//! ## Design
//!
//! An [`OrderNodeCollection`] groups the nodes of one order's items. The
//! group's flow limit is the order's requested item count, so no flow round
//! can ever assign an order more items than it asked for through its own
//! nodes. Flow totals are read live from the graph.
//!
//! ```text
//! OrderNodeCollection (order A, num_items = 2)
//!   group ──┬── node (item A-0, token 1)
//!           └── node (item A-1, token 2)
//! ```

use crate::graph::flow::FlowGraph;
use crate::graph::node::{FlowNode, GroupKey, NodeKey};
use crate::types::{Order, OrderItem};

/// Node payload: one order item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemNode {
    pub item: OrderItem,
}

impl FlowNode for OrderItemNode {
    fn max_flow(&self) -> u32 {
        self.item.max_contribution()
    }
}

/// Graph of order item nodes
pub type OrderGraph = FlowGraph<OrderItemNode>;

/// One order plus one node per item.
#[derive(Debug, Clone)]
pub struct OrderNodeCollection {
    order: Order,
    group: GroupKey,
    nodes: Vec<NodeKey>,
}

impl OrderNodeCollection {
    /// Add `order` and its `items` to `graph`.
    ///
    /// # Arguments
    ///
    /// * `graph` - Graph to add the nodes to
    /// * `order` - The order; its `num_items` caps the group's flow
    /// * `items` - The order's items, one node each
    pub fn insert(graph: &mut OrderGraph, order: Order, items: &[OrderItem]) -> Self {
        let group = graph.add_group(order.num_items);
        let nodes = items
            .iter()
            .map(|item| graph.add_node(OrderItemNode { item: item.clone() }, Some(group)))
            .collect();

        Self { order, group, nodes }
    }

    #[inline]
    pub fn order(&self) -> &Order {
        &self.order
    }

    #[inline]
    pub fn group(&self) -> GroupKey {
        self.group
    }

    /// Item nodes, in item order
    #[inline]
    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }

    /// Requested item count
    #[inline]
    pub fn num_items(&self) -> u32 {
        self.order.num_items
    }

    /// First instant the order is active (unix ms)
    #[inline]
    pub fn start_time(&self) -> u64 {
        self.order.start_time()
    }

    /// Items held by the collection's nodes
    pub fn items<'g>(&'g self, graph: &'g OrderGraph) -> impl Iterator<Item = (NodeKey, &'g OrderItem)> + 'g {
        self.nodes
            .iter()
            .filter_map(move |&key| graph.node(key).map(|node| (key, &node.data.item)))
    }

    /// Whether `node` belongs to this collection
    #[inline]
    pub fn contains(&self, node: NodeKey) -> bool {
        self.nodes.contains(&node)
    }

    /// Total flow arriving at the order's item nodes
    pub fn incoming_flow(&self, graph: &OrderGraph) -> u32 {
        graph.group_inflow(self.group)
    }

    /// Total flow leaving the order's item nodes
    pub fn outgoing_flow(&self, graph: &OrderGraph) -> u32 {
        graph.group_outflow(self.group)
    }

    /// Remove every edge touching the order's nodes.
    ///
    /// # Returns
    ///
    /// The number of edges removed
    pub fn unlink(&self, graph: &mut OrderGraph) -> usize {
        self.nodes.iter().map(|&node| graph.unlink(node)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PriceCurve, Side};
    use rust_decimal::Decimal;

    fn order(id: &str, side: Side, num_items: u32) -> Order {
        Order::new(id, side, num_items, PriceCurve::flat(Decimal::ONE, 0, 10))
    }

    #[test]
    fn test_insert_creates_grouped_nodes() {
        let mut graph = OrderGraph::new();
        let root = order("root", Side::Buy, 2);
        let items = vec![
            root.item("r-0", "c").with_token("1"),
            root.item("r-1", "c").with_token("2"),
        ];

        let collection = OrderNodeCollection::insert(&mut graph, root, &items);

        assert_eq!(collection.nodes().len(), 2);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(collection.num_items(), 2);
        let ids: Vec<&str> = collection.items(&graph).map(|(_, i)| i.id.as_str()).collect();
        assert_eq!(ids, vec!["r-0", "r-1"]);
        for &node in collection.nodes() {
            assert_eq!(graph.node(node).unwrap().group(), Some(collection.group()));
        }
    }

    #[test]
    fn test_live_flow_and_unlink() {
        let mut graph = OrderGraph::new();
        let root = order("root", Side::Buy, 2);
        let root_items = vec![
            root.item("r-0", "c").with_token("1"),
            root.item("r-1", "c").with_token("2"),
        ];
        let root = OrderNodeCollection::insert(&mut graph, root, &root_items);

        let a = order("a", Side::Sell, 1);
        let a_items = vec![a.item("a-0", "c").with_token("1")];
        let a = OrderNodeCollection::insert(&mut graph, a, &a_items);

        let b = order("b", Side::Sell, 1);
        let b_items = vec![b.item("b-0", "c").with_token("2")];
        let b = OrderNodeCollection::insert(&mut graph, b, &b_items);

        graph.link(root.nodes()[0], a.nodes()[0]).unwrap();
        graph.link(root.nodes()[1], b.nodes()[0]).unwrap();
        assert_eq!(graph.push_flow(), 2);

        assert_eq!(root.outgoing_flow(&graph), 2);
        assert_eq!(a.incoming_flow(&graph), 1);
        assert_eq!(b.incoming_flow(&graph), 1);

        assert_eq!(a.unlink(&mut graph), 1);
        assert_eq!(a.incoming_flow(&graph), 0);
        assert_eq!(root.outgoing_flow(&graph), 1);
        assert!(a.contains(a.nodes()[0]));
        assert!(!a.contains(b.nodes()[0]));
    }
}
