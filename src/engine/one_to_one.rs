//! One-to-one search: the root order filled entirely by a single opposing
//! order.
//!
//! ## Algorithm
//!
//! For each candidate order:
//!
//! 1. Intersect the two price curves. No intersection, no match.
//! 2. Build the mutual compatibility matrix of root items × candidate items
//!    under the [`ConstraintChain`].
//! 3. Enumerate injective pairings depth-first. Root items are taken in
//!    order; each either pairs with an unclaimed compatible candidate item
//!    (lowest index first) or stays unpaired. The first pairing found with
//!    the largest valid pair count wins.
//! 4. Resolve the price at `now` (see [`PriceIntersection::resolve`]).
//!
//! ## Fill direction
//!
//! | Opposing side | Valid pair count |
//! |---------------|------------------|
//! | Buy | `>= root.num_items` and `>= opposing.num_items` |
//! | Sell | `>= root.num_items` and `<= opposing.num_items` |
//!
//! A buyer must receive at least what it asked for; a seller may offer more
//! inventory than a single match consumes.
//!
//! [`PriceIntersection::resolve`]: crate::intersection::PriceIntersection::resolve

use tracing::{debug, warn};

use crate::constraints::ConstraintChain;
use crate::error::Result;
use crate::intersection::order_intersection;
use crate::types::{ItemPair, OneToOneMatch, ResolvedOrder, Side};

/// One-to-one matcher for a single root order.
#[derive(Debug)]
pub struct OneToOneSearch<'a> {
    chain: &'a ConstraintChain,
    root: &'a ResolvedOrder,
}

impl<'a> OneToOneSearch<'a> {
    pub fn new(chain: &'a ConstraintChain, root: &'a ResolvedOrder) -> Self {
        Self { chain, root }
    }

    /// Match the root against every candidate.
    ///
    /// A candidate that fails with a recoverable error is logged and skipped.
    /// Fatal errors abort the search.
    ///
    /// # Returns
    ///
    /// One record per candidate that fills the root, in candidate order
    pub fn search(&self, candidates: &[ResolvedOrder], now: u64) -> Result<Vec<OneToOneMatch>> {
        let mut matches = Vec::new();

        for candidate in candidates {
            match self.match_candidate(candidate, now) {
                Ok(Some(record)) => matches.push(record),
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(
                        order_id = %self.root.id(),
                        opposing_order_id = %candidate.id(),
                        error = %e,
                        "Skipping candidate after one-to-one failure"
                    );
                }
            }
        }

        Ok(matches)
    }

    /// Match the root against a single candidate order.
    pub fn match_candidate(&self, candidate: &ResolvedOrder, now: u64) -> Result<Option<OneToOneMatch>> {
        let root = &self.root.order;
        let opposing = &candidate.order;
        if opposing.id == root.id {
            return Ok(None);
        }

        let Some(intersection) = order_intersection(root, opposing)? else {
            debug!(opposing_order_id = %opposing.id, "No price intersection");
            return Ok(None);
        };

        let Some(pairs) = self.best_pairing(candidate) else {
            debug!(opposing_order_id = %opposing.id, "No valid item pairing");
            return Ok(None);
        };

        let Some(clearing) = intersection.resolve(now)? else {
            debug!(opposing_order_id = %opposing.id, now, "Price window closed");
            return Ok(None);
        };

        let pairs = pairs
            .into_iter()
            .map(|(i, j)| ItemPair {
                order_item: self.root.items[i].clone(),
                opposing_order_item: candidate.items[j].clone(),
            })
            .collect();

        Ok(Some(OneToOneMatch::new(
            root.clone(),
            opposing.clone(),
            pairs,
            clearing.price,
            clearing.timestamp,
        )))
    }

    /// Best valid pairing as (root item index, candidate item index) pairs.
    fn best_pairing(&self, candidate: &ResolvedOrder) -> Option<Vec<(usize, usize)>> {
        let root_items = &self.root.items;
        let opposing_items = &candidate.items;

        let compatible: Vec<Vec<bool>> = root_items
            .iter()
            .map(|item| {
                opposing_items
                    .iter()
                    .map(|opposing| self.chain.is_mutual_match(item, opposing))
                    .collect()
            })
            .collect();

        let root_n = self.root.order.num_items as usize;
        let opposing_n = candidate.order.num_items as usize;

        // A seller cannot hand over more than it offers.
        let cap = match candidate.order.side {
            Side::Sell => opposing_n,
            Side::Buy => usize::MAX,
        };

        let mut pairing = Pairing {
            compatible: &compatible,
            cap,
            target: cap.min(root_items.len()).min(opposing_items.len()),
            best: Vec::new(),
            path: Vec::new(),
            claimed: vec![false; opposing_items.len()],
        };
        pairing.search(0);

        let count = pairing.best.len();
        let valid = count >= root_n
            && match candidate.order.side {
                Side::Buy => count >= opposing_n,
                Side::Sell => count <= opposing_n,
            };

        valid.then_some(pairing.best)
    }
}

/// Depth-first enumeration state.
struct Pairing<'m> {
    compatible: &'m [Vec<bool>],
    cap: usize,
    target: usize,
    best: Vec<(usize, usize)>,
    path: Vec<(usize, usize)>,
    claimed: Vec<bool>,
}

impl Pairing<'_> {
    /// Returns `true` once a pairing of `target` size has been found.
    fn search(&mut self, root_index: usize) -> bool {
        if self.path.len() > self.best.len() {
            self.best = self.path.clone();
            if self.best.len() >= self.target {
                return true;
            }
        }

        let remaining = self.compatible.len().saturating_sub(root_index);
        if remaining == 0 || self.path.len() + remaining <= self.best.len() {
            return false;
        }

        if self.path.len() < self.cap {
            for j in 0..self.claimed.len() {
                if self.claimed[j] || !self.compatible[root_index][j] {
                    continue;
                }
                self.claimed[j] = true;
                self.path.push((root_index, j));
                let done = self.search(root_index + 1);
                self.path.pop();
                self.claimed[j] = false;
                if done {
                    return true;
                }
            }
        }

        self.search(root_index + 1)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::price::parse_eth;
    use crate::types::{Order, OrderItem, PriceCurve};
    use rust_decimal::Decimal;

    fn eth(s: &str) -> Decimal {
        parse_eth(s).unwrap()
    }

    fn resolved(id: &str, side: Side, num_items: u32, price: &str, tokens: &[&str]) -> ResolvedOrder {
        let order = Order::new(id, side, num_items, PriceCurve::flat(eth(price), 0, 10_000));
        let items: Vec<OrderItem> = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let item = order.item(format!("{id}-{i}"), "0xc");
                if token.is_empty() {
                    item
                } else {
                    item.with_token(*token)
                }
            })
            .collect();
        ResolvedOrder::new(order, items)
    }

    #[test]
    fn test_single_item_match() {
        let chain = ConstraintChain::default();
        let root = resolved("buy", Side::Buy, 1, "1.5", &[""]);
        let sell = resolved("sell", Side::Sell, 1, "1", &["7"]);

        let matches = OneToOneSearch::new(&chain, &root).search(&[sell], 100).unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pairs.len(), 1);
        assert_eq!(matches[0].price, eth("1.5"));
        assert_eq!(matches[0].timestamp, 100);
    }

    #[test]
    fn test_direction_asymmetry_rejects_under_requesting_buyer() {
        let chain = ConstraintChain::default();
        let root = resolved("sell", Side::Sell, 3, "1.0", &["1", "2", "3"]);
        let buy = resolved("buy", Side::Buy, 2, "1.2", &["1", "2"]);

        let matches = OneToOneSearch::new(&chain, &root).search(&[buy], 0).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_seller_with_more_inventory() {
        let chain = ConstraintChain::default();
        let root = resolved("buy", Side::Buy, 2, "3", &["1", "2"]);
        let sell = resolved("sell", Side::Sell, 3, "2", &["1", "2", "3"]);

        let record = OneToOneSearch::new(&chain, &root)
            .match_candidate(&sell, 0)
            .unwrap()
            .unwrap();

        let paired: Vec<(&str, &str)> = record
            .pairs
            .iter()
            .map(|p| (p.order_item.id.as_str(), p.opposing_order_item.id.as_str()))
            .collect();
        assert_eq!(paired, vec![("buy-0", "sell-0"), ("buy-1", "sell-1")]);
    }

    #[test]
    fn test_seller_cannot_be_over_matched() {
        let chain = ConstraintChain::default();
        let root = resolved("buy", Side::Buy, 1, "3", &["", ""]);
        let sell = resolved("sell", Side::Sell, 1, "2", &["1", "2"]);

        let record = OneToOneSearch::new(&chain, &root)
            .match_candidate(&sell, 0)
            .unwrap()
            .unwrap();
        assert_eq!(record.pairs.len(), 1);
    }

    #[test]
    fn test_pairing_backtracks() {
        let chain = ConstraintChain::default();
        // buy-0 accepts any token, buy-1 only token 1: the greedy choice of
        // token 1 for buy-0 must be undone.
        let root = resolved("buy", Side::Buy, 2, "3", &["", "1"]);
        let sell = resolved("sell", Side::Sell, 2, "2", &["1", "2"]);

        let record = OneToOneSearch::new(&chain, &root)
            .match_candidate(&sell, 0)
            .unwrap()
            .unwrap();

        let paired: Vec<(&str, &str)> = record
            .pairs
            .iter()
            .map(|p| (p.order_item.id.as_str(), p.opposing_order_item.id.as_str()))
            .collect();
        assert_eq!(paired, vec![("buy-0", "sell-1"), ("buy-1", "sell-0")]);
    }

    #[test]
    fn test_future_intersection_reports_start() {
        let chain = ConstraintChain::default();
        let root = resolved("buy", Side::Buy, 1, "1.5", &[""]);
        let mut sell = resolved("sell", Side::Sell, 1, "1", &["7"]);
        sell.order.price = PriceCurve::flat(eth("1"), 5_000, 10_000);
        sell.items[0].price = sell.order.price;

        let record = OneToOneSearch::new(&chain, &root)
            .match_candidate(&sell, 1_000)
            .unwrap()
            .unwrap();
        assert_eq!(record.timestamp, 5_000);
        assert_eq!(record.price, eth("1.5"));
    }

    #[test]
    fn test_closed_window_discards_match() {
        let chain = ConstraintChain::default();
        let root = resolved("buy", Side::Buy, 1, "1.5", &[""]);
        let sell = resolved("sell", Side::Sell, 1, "1", &["7"]);

        let record = OneToOneSearch::new(&chain, &root).match_candidate(&sell, 20_000).unwrap();
        assert!(record.is_none());
    }

    #[test]
    fn test_same_side_candidate_is_skipped() {
        let chain = ConstraintChain::default();
        let root = resolved("buy", Side::Buy, 1, "1.5", &[""]);
        let other = resolved("other", Side::Buy, 1, "1", &["7"]);
        let sell = resolved("sell", Side::Sell, 1, "1", &["7"]);

        let matches = OneToOneSearch::new(&chain, &root).search(&[other, sell], 0).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].opposing_order.id, "sell");
    }
}
