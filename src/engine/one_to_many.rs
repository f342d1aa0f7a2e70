//! One-to-many search: a multi-item root order filled exactly by several
//! single-item opposing orders.
//!
//! ## Algorithm
//!
//! The candidate pool is sorted oldest first. Each pass builds a fresh
//! [`OrderGraph`] with an edge from every root item to every mutually
//! compatible candidate item, then pushes flow round by round:
//!
//! ```text
//! push_flow() == 0 ──────────────► pass exhausted
//!       │ > 0
//!       ▼
//! engaged orders (sorted by start time)
//!       │
//!       ├─ any flow > num_items ─► FlowInvariant (fatal)
//!       ├─ any flow < num_items ─► unlink first under-filled order
//!       ├─ total == root.num_items
//!       │     ├─ prices intersect ► yield match
//!       │     └─ otherwise ──────► unlink the pass's main candidate
//!       └─ otherwise ────────────► next round
//! ```
//!
//! After a pass the oldest candidate leaves the pool and the next pass starts
//! from scratch, until the pool is empty. Every pass strictly shrinks either
//! the graph or the pool, so the search terminates.
//!
//! The search is a lazy [`Iterator`]: matches are produced as they are found.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use crate::constraints::ConstraintChain;
use crate::error::{MatchError, Result};
use crate::graph::{NodeKey, OrderGraph, OrderNodeCollection};
use crate::intersection::one_to_many_intersection;
use crate::types::{ItemEdge, OneToManyMatch, Order, ResolvedOrder};

/// Whether `root` can be filled by several opposing orders.
///
/// The root must request more than one item, pin every token, and its
/// tokens must add up to exactly the requested count.
pub fn is_eligible_root(root: &ResolvedOrder) -> bool {
    root.order.num_items > 1 && root.is_fully_specified() && root.order.validate_items(&root.items).is_ok()
}

/// Lazy one-to-many search over a candidate pool.
///
/// # Example
///
/// ```
/// use nft_order_matcher::constraints::ConstraintChain;
/// use nft_order_matcher::engine::OneToManySearch;
/// use nft_order_matcher::types::{Order, PriceCurve, ResolvedOrder, Side};
/// use nft_order_matcher::types::price::parse_eth;
///
/// let curve = |p: &str| PriceCurve::flat(parse_eth(p).unwrap(), 0, 1_000);
///
/// let buy = Order::new("buy", Side::Buy, 2, curve("1"));
/// let items = vec![buy.item("b-0", "0xc").with_token("1"), buy.item("b-1", "0xc").with_token("2")];
/// let root = ResolvedOrder::new(buy, items);
///
/// let candidates: Vec<ResolvedOrder> = ["1", "2"]
///     .iter()
///     .map(|token| {
///         let sell = Order::new(format!("sell-{token}"), Side::Sell, 1, curve("0.5"));
///         let item = sell.item(format!("s-{token}"), "0xc").with_token(*token);
///         ResolvedOrder::new(sell, vec![item])
///     })
///     .collect();
///
/// let chain = ConstraintChain::default();
/// let matches: Vec<_> = OneToManySearch::new(&chain, &root, &candidates, 0)
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// assert_eq!(matches.len(), 1);
/// assert_eq!(matches[0].num_items(), 2);
/// ```
#[derive(Debug)]
pub struct OneToManySearch<'a> {
    chain: &'a ConstraintChain,
    root: &'a ResolvedOrder,
    pool: VecDeque<&'a ResolvedOrder>,
    pass: Option<FlowPass<'a>>,
    now: u64,
    yielded: HashSet<String>,
    finished: bool,
}

impl<'a> OneToManySearch<'a> {
    /// Prepare a search of `root` against `candidates` evaluated at `now`.
    ///
    /// Only single-item opposing orders other than the root are considered.
    pub fn new(chain: &'a ConstraintChain, root: &'a ResolvedOrder, candidates: &'a [ResolvedOrder], now: u64) -> Self {
        let mut pool: Vec<&ResolvedOrder> = candidates
            .iter()
            .filter(|c| {
                c.order.num_items == 1 && c.order.side == root.order.side.opposite() && c.id() != root.id()
            })
            .collect();
        pool.sort_by(|a, b| {
            a.order
                .start_time()
                .cmp(&b.order.start_time())
                .then_with(|| a.id().cmp(b.id()))
        });

        Self {
            chain,
            root,
            pool: pool.into(),
            pass: None,
            now,
            yielded: HashSet::new(),
            finished: false,
        }
    }

    /// Number of candidates still waiting for a pass
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }
}

impl Iterator for OneToManySearch<'_> {
    type Item = Result<OneToManyMatch>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if self.pass.is_none() {
                if self.pool.is_empty() {
                    self.finished = true;
                    return None;
                }
                debug!(pool = self.pool.len(), "Starting one-to-many pass");
                self.pass = Some(FlowPass::build(self.chain, self.root, self.pool.iter().copied()));
                self.pool.pop_front();
            }
            let Some(pass) = self.pass.as_mut() else {
                continue;
            };

            match pass.step(self.now) {
                Ok(Step::Match(record)) => {
                    if self.yielded.insert(record.id.clone()) {
                        return Some(Ok(record));
                    }
                }
                Ok(Step::Continue) => {}
                Ok(Step::Exhausted) => self.pass = None,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

// ============================================================================
// Flow pass
// ============================================================================

/// Outcome of one flow round.
#[derive(Debug)]
enum Step {
    Match(OneToManyMatch),
    Continue,
    Exhausted,
}

/// Classification of the flow after a round.
#[derive(Debug, PartialEq, Eq)]
enum RoundState {
    /// Every engaged order is filled and the root is filled exactly
    Filled(Vec<usize>),
    /// This engaged order received less than it requested
    Underfilled(usize),
    /// Every engaged order is filled but the root is not yet
    Partial,
}

/// One graph built over the current pool.
#[derive(Debug)]
struct FlowPass<'a> {
    root: &'a ResolvedOrder,
    graph: OrderGraph,
    root_nodes: OrderNodeCollection,
    /// Candidate collections in pool order; index 0 is the main candidate
    candidates: Vec<OrderNodeCollection>,
    owner: HashMap<NodeKey, usize>,
}

impl<'a> FlowPass<'a> {
    fn build(
        chain: &ConstraintChain,
        root: &'a ResolvedOrder,
        pool: impl Iterator<Item = &'a ResolvedOrder>,
    ) -> Self {
        let mut graph = OrderGraph::new();
        let root_nodes = OrderNodeCollection::insert(&mut graph, root.order.clone(), &root.items);

        let mut candidates = Vec::new();
        let mut owner = HashMap::new();
        for candidate in pool {
            let collection = OrderNodeCollection::insert(&mut graph, candidate.order.clone(), &candidate.items);
            for &node in collection.nodes() {
                owner.insert(node, candidates.len());
            }
            candidates.push(collection);
        }

        for collection in &candidates {
            for &to in collection.nodes() {
                for &from in root_nodes.nodes() {
                    let compatible = match (graph.node(from), graph.node(to)) {
                        (Some(a), Some(b)) => chain.is_mutual_match(&a.data.item, &b.data.item),
                        _ => false,
                    };
                    if compatible {
                        graph.link(from, to);
                    }
                }
            }
        }

        Self {
            root,
            graph,
            root_nodes,
            candidates,
            owner,
        }
    }

    fn step(&mut self, now: u64) -> Result<Step> {
        let pushed = self.graph.push_flow();
        if pushed == 0 {
            return Ok(Step::Exhausted);
        }
        debug!(pushed, total = self.graph.total_flow(), "Pushed flow");

        match self.evaluate()? {
            RoundState::Filled(engaged) => self.settle(&engaged, now),
            RoundState::Underfilled(index) => {
                self.candidates[index].unlink(&mut self.graph);
                Ok(Step::Continue)
            }
            RoundState::Partial => Ok(Step::Continue),
        }
    }

    /// Candidates receiving flow, in pool (start time) order.
    fn engaged(&self) -> Vec<usize> {
        let mut engaged: Vec<usize> = self
            .graph
            .edges_with_flow()
            .filter_map(|(_, edge)| self.owner.get(&edge.to).copied())
            .collect();
        engaged.sort_unstable();
        engaged.dedup();
        engaged
    }

    fn evaluate(&self) -> Result<RoundState> {
        let engaged = self.engaged();
        let mut first_underfilled = None;
        let mut total = 0;

        for &index in &engaged {
            let collection = &self.candidates[index];
            let flow = collection.incoming_flow(&self.graph);
            let expected = collection.num_items();

            if flow > expected {
                return Err(MatchError::FlowInvariant {
                    order_id: collection.order().id.clone(),
                    flow,
                    expected,
                });
            }
            if flow < expected && first_underfilled.is_none() {
                first_underfilled = Some(index);
            }
            total += flow;
        }

        Ok(match first_underfilled {
            Some(index) => RoundState::Underfilled(index),
            None if total == self.root_nodes.num_items() => RoundState::Filled(engaged),
            None => RoundState::Partial,
        })
    }

    /// Price a filled round. Without a price the main candidate is dropped.
    fn settle(&mut self, engaged: &[usize], now: u64) -> Result<Step> {
        let opposing: Vec<&Order> = engaged.iter().map(|&i| self.candidates[i].order()).collect();

        let clearing = match one_to_many_intersection(&self.root.order, &opposing) {
            Ok(Some(intersection)) => intersection.resolve(now),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        let clearing = match clearing {
            Ok(Some(clearing)) => clearing,
            Ok(None) => {
                debug!("No combined price, dropping main candidate");
                self.drop_main_candidate();
                return Ok(Step::Continue);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(order_id = %self.root.id(), error = %e, "Pricing failed, dropping main candidate");
                self.drop_main_candidate();
                return Ok(Step::Continue);
            }
        };

        let edges = self
            .graph
            .edges_with_flow()
            .filter_map(|(_, edge)| {
                let from = self.graph.node(edge.from)?;
                let to = self.graph.node(edge.to)?;
                Some(ItemEdge {
                    from: from.data.item.clone(),
                    to: to.data.item.clone(),
                    num_items: edge.flow(),
                })
            })
            .collect();
        let opposing = opposing.into_iter().cloned().collect();

        Ok(Step::Match(OneToManyMatch::new(
            self.root.order.clone(),
            opposing,
            edges,
            clearing.price,
            clearing.timestamp,
        )))
    }

    fn drop_main_candidate(&mut self) {
        if let Some(main) = self.candidates.first() {
            main.unlink(&mut self.graph);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
