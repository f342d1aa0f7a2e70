//! Order store abstraction.
//!
//! The engine never owns order data. It reads it through [`OrderStore`], which
//! a document database, an indexer API or the bundled [`MemoryOrderStore`]
//! can implement.
//!
//! Candidate items are consumed as a lazy stream ([`paged_candidates`]) that
//! fetches one page at a time and resumes from a cursor derived from the last
//! item of the previous page.

mod memory;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::constraints::CandidateQuery;
use crate::types::{Order, OrderItem, ResolvedOrder};

pub use memory::{MemoryOrderStore, Snapshot};

/// Errors that can occur while reading from an order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Error raised by the storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// A pagination cursor could not be decoded.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
}

/// Read access to orders and their items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Retrieves an order by id.
    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError>;

    /// Retrieves the items of an order, in store order.
    async fn get_order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, StoreError>;

    /// Runs one page of a candidate query.
    async fn query_items(&self, query: &CandidateQuery) -> Result<Vec<OrderItem>, StoreError>;

    /// Retrieves an order together with its items.
    async fn resolve_order(&self, order_id: &str) -> Result<Option<ResolvedOrder>, StoreError> {
        let order = match self.get_order(order_id).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        let items = self.get_order_items(order_id).await?;
        Ok(Some(ResolvedOrder::new(order, items)))
    }
}

/// Lazily paged stream of candidate items.
pub type CandidateStream<'a> = Pin<Box<dyn Stream<Item = Result<OrderItem, StoreError>> + Send + 'a>>;

/// Stream every item matching `query`, `page_size` items per store round trip.
///
/// The stream ends after the first short page. A store error is yielded once
/// and ends the stream.
pub fn paged_candidates<'a>(
    store: &'a dyn OrderStore,
    query: CandidateQuery,
    page_size: usize,
) -> CandidateStream<'a> {
    let stream = async_stream::stream! {
        let mut query = query.limit(page_size);
        loop {
            let page = match store.query_items(&query).await {
                Ok(page) => page,
                Err(e) => {
                    yield Err(e);
                    break;
                }
            };

            let exhausted = page_size == 0 || page.len() < page_size;
            let cursor = page.last().map(|item| query.cursor_for(item));
            for item in page {
                yield Ok(item);
            }

            match cursor {
                Some(cursor) if !exhausted => query = query.start_after(cursor),
                _ => break,
            }
        }
    };
    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::SortKey;
    use crate::types::{PriceCurve, Side};
    use futures::StreamExt;
    use rust_decimal::Decimal;

    fn store_with(n: u64) -> MemoryOrderStore {
        let mut store = MemoryOrderStore::new();
        for i in 0..n {
            let order = Order::new(
                format!("o{i}"),
                Side::Sell,
                1,
                PriceCurve::flat(Decimal::ONE, i, 1_000),
            );
            let item = order.item(format!("i{i}"), "0xc").with_token(i.to_string());
            store.insert(ResolvedOrder::new(order, vec![item]));
        }
        store
    }

    #[tokio::test]
    async fn test_paged_candidates_walks_all_pages() {
        let store = store_with(7);
        let query = CandidateQuery::new().order_by(SortKey::StartTime).order_by(SortKey::ItemId);

        let items: Vec<OrderItem> = paged_candidates(&store, query, 3)
            .map(|r| r.unwrap())
            .collect()
            .await;

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["i0", "i1", "i2", "i3", "i4", "i5", "i6"]);
        assert_eq!(store.pages_served(), 3);
    }

    #[tokio::test]
    async fn test_paged_candidates_exact_multiple() {
        let store = store_with(4);
        let query = CandidateQuery::new().order_by(SortKey::StartTime);

        let count = paged_candidates(&store, query, 2).count().await;
        assert_eq!(count, 4);
        // Two full pages, then an empty one that ends the stream.
        assert_eq!(store.pages_served(), 3);
    }

    #[tokio::test]
    async fn test_resolve_order() {
        let store = store_with(1);

        let resolved = store.resolve_order("o0").await.unwrap().unwrap();
        assert_eq!(resolved.items.len(), 1);
        assert!(store.resolve_order("missing").await.unwrap().is_none());
    }
}
