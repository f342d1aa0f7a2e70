//! In-memory order store.
//!
//! Backs the CLI (loaded from a JSON [`Snapshot`]), the tests and the
//! benchmarks. Queries are evaluated by scanning every item.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constraints::CandidateQuery;
use crate::store::{OrderStore, StoreError};
use crate::types::{Order, OrderItem, ResolvedOrder};

/// A serialized order book: every order with its items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub orders: Vec<ResolvedOrder>,
}

/// Order store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: BTreeMap<String, Order>,
    items: BTreeMap<String, Vec<OrderItem>>,
    pages_served: AtomicUsize,
}

impl MemoryOrderStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every order of `snapshot`.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::new();
        for resolved in snapshot.orders {
            store.insert(resolved);
        }
        store
    }

    /// Insert or replace an order and its items.
    pub fn insert(&mut self, resolved: ResolvedOrder) {
        let ResolvedOrder { order, items } = resolved;
        self.items.insert(order.id.clone(), items);
        self.orders.insert(order.id.clone(), order);
    }

    /// Number of orders held
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of candidate pages served so far
    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(order_id).cloned())
    }

    async fn get_order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, StoreError> {
        Ok(self.items.get(order_id).cloned().unwrap_or_default())
    }

    async fn query_items(&self, query: &CandidateQuery) -> Result<Vec<OrderItem>, StoreError> {
        self.pages_served.fetch_add(1, Ordering::Relaxed);
        Ok(query.apply(self.items.values().flatten()))
    }
}
