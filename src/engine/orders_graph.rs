//! Search orchestration for one root order.
//!
//! ## Flow
//!
//! ```text
//! resolve root ─► page candidates per root item ─► dedupe by order id
//!      ─► resolve candidate orders ─► one-to-one ─► one-to-many (eligible roots)
//!      ─► SearchOutcome { matches, requires_scan }
//! ```
//!
//! Store reads are the only suspension points. Each search owns its graphs,
//! so any number of searches for different roots can run concurrently over
//! one [`OrdersGraph`].

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::MatcherConfig;
use crate::constraints::ConstraintChain;
use crate::engine::one_to_many::{is_eligible_root, OneToManySearch};
use crate::engine::one_to_one::OneToOneSearch;
use crate::error::{MatchError, Result};
use crate::store::{paged_candidates, OrderStore};
use crate::types::{Order, OrderMatch, ResolvedOrder};

/// Result of searching one root order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    /// One-to-one records first, then one-to-many records
    pub matches: Vec<OrderMatch>,

    /// Multi-item candidates of a single-item root. They can only be filled
    /// by a search started from their own side.
    pub requires_scan: Vec<Order>,
}

/// Matching engine over an [`OrderStore`].
pub struct OrdersGraph {
    store: Arc<dyn OrderStore>,
    chain: ConstraintChain,
    config: MatcherConfig,
}

impl OrdersGraph {
    /// Create an engine using the default constraint chain.
    pub fn new(store: Arc<dyn OrderStore>, config: MatcherConfig) -> Self {
        Self {
            store,
            chain: ConstraintChain::default(),
            config,
        }
    }

    /// Replace the constraint chain.
    pub fn with_chain(mut self, chain: ConstraintChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn chain(&self) -> &ConstraintChain {
        &self.chain
    }

    /// Search every match of `order_id` as of `now` (unix ms).
    ///
    /// # Returns
    ///
    /// * `Ok(outcome)` - Possibly empty matches and requires-scan orders
    /// * `Err(MatchError::OrderNotFound)` - The root does not exist
    /// * `Err(_)` - Store failure or flow invariant violation
    #[instrument(skip(self), fields(page_size = self.config.page_size))]
    pub async fn search(&self, order_id: &str, now: u64) -> Result<SearchOutcome> {
        let root = self
            .store
            .resolve_order(order_id)
            .await?
            .ok_or_else(|| MatchError::OrderNotFound(order_id.to_string()))?;

        let candidates = self.find_candidates(&root).await?;
        self.search_with_candidates(&root, &candidates, now)
    }

    /// Collect the distinct opposing orders with at least one item matching
    /// a root item.
    ///
    /// Candidates are returned in discovery order. Ids that no longer resolve
    /// are skipped.
    pub async fn find_candidates(&self, root: &ResolvedOrder) -> Result<Vec<ResolvedOrder>> {
        let page_size = self.config.page_size;
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(root.id().to_string());
        let mut order_ids = Vec::new();

        for item in &root.items {
            let query = self.chain.candidate_query(item, page_size);
            let mut stream = paged_candidates(self.store.as_ref(), query, page_size);

            while let Some(candidate) = stream.next().await {
                let candidate = candidate?;
                if seen.contains(&candidate.order_id) || !self.chain.is_match(item, &candidate).is_valid() {
                    continue;
                }
                seen.insert(candidate.order_id.clone());
                order_ids.push(candidate.order_id);
            }
        }
        debug!(count = order_ids.len(), "Found candidate orders");

        let mut candidates = Vec::with_capacity(order_ids.len());
        for order_id in order_ids {
            match self.store.resolve_order(&order_id).await? {
                Some(resolved) => candidates.push(resolved),
                None => debug!(%order_id, "Skipping stale candidate"),
            }
        }
        Ok(candidates)
    }

    /// Run both searches for `root` against already resolved candidates.
    pub fn search_with_candidates(
        &self,
        root: &ResolvedOrder,
        candidates: &[ResolvedOrder],
        now: u64,
    ) -> Result<SearchOutcome> {
        let mut matches: Vec<OrderMatch> = OneToOneSearch::new(&self.chain, root)
            .search(candidates, now)?
            .into_iter()
            .map(OrderMatch::from)
            .collect();
        let one_to_one = matches.len();

        if self.config.one_to_many_enabled && is_eligible_root(root) {
            for record in OneToManySearch::new(&self.chain, root, candidates, now) {
                matches.push(record?.into());
            }
        }

        let requires_scan = if root.order.num_items == 1 {
            candidates
                .iter()
                .filter(|c| c.order.num_items > 1)
                .map(|c| c.order.clone())
                .collect()
        } else {
            Vec::new()
        };

        info!(
            order_id = %root.id(),
            candidates = candidates.len(),
            one_to_one,
            one_to_many = matches.len() - one_to_one,
            requires_scan = requires_scan.len(),
            "Search complete"
        );

        Ok(SearchOutcome {
            matches,
            requires_scan,
        })
    }
}
