//! Backend-neutral candidate queries.
//!
//! ## Design
//!
//! A [`CandidateQuery`] is a conjunction of [`QueryFilter`]s plus an ordering
//! and a page limit. Stores translate it into their own query language; the
//! in-memory store evaluates it directly with [`CandidateQuery::apply`].
//!
//! ## Pagination
//!
//! Results are ordered by the query's [`SortKey`]s and finally by item id, so
//! every item has a unique position. A [`Cursor`] records the position of the
//! last item of a page; the next page starts strictly after it.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::store::StoreError;
use crate::types::{OrderItem, OrderStatus, Side};

// ============================================================================
// Filters
// ============================================================================

/// A single predicate a store can evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryFilter {
    ChainId(u64),
    Side(Side),
    Status(OrderStatus),
    /// Collection address, compared case-insensitively
    Collection(String),
    /// Items pinning this token, or pinning no token at all
    TokenIdOrAny(String),
    Complication(String),
    Currency(String),
    /// Items whose window ends at or after this instant (unix ms)
    EndTimeAtLeast(u64),
}

impl QueryFilter {
    /// Whether `item` satisfies the filter.
    pub fn matches(&self, item: &OrderItem) -> bool {
        match self {
            QueryFilter::ChainId(chain_id) => item.chain_id == *chain_id,
            QueryFilter::Side(side) => item.side == *side,
            QueryFilter::Status(status) => item.status == *status,
            QueryFilter::Collection(collection) => item.collection.eq_ignore_ascii_case(collection),
            QueryFilter::TokenIdOrAny(token_id) => {
                item.token_id.as_deref().map_or(true, |id| id == token_id)
            }
            QueryFilter::Complication(complication) => &item.complication == complication,
            QueryFilter::Currency(currency) => &item.currency == currency,
            QueryFilter::EndTimeAtLeast(t) => item.end_time() >= *t,
        }
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Field a query is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    StartTime,
    ItemId,
}

/// Value of a [`SortKey`] for one item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortValue {
    Time(u64),
    Id(String),
}

impl SortKey {
    /// Extract this key's value from `item`.
    pub fn value(self, item: &OrderItem) -> SortValue {
        match self {
            SortKey::StartTime => SortValue::Time(item.start_time()),
            SortKey::ItemId => SortValue::Id(item.id.clone()),
        }
    }
}

/// Resumable position in an ordered candidate stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    /// Sort-key values of the last item returned
    pub values: Vec<SortValue>,
    /// Id of the last item returned
    pub item_id: String,
}

impl Cursor {
    /// Position of `item` under the ordering `keys`.
    pub fn after(item: &OrderItem, keys: &[SortKey]) -> Self {
        Self {
            values: keys.iter().map(|key| key.value(item)).collect(),
            item_id: item.id.clone(),
        }
    }

    /// Encode as an opaque string.
    ///
    /// # Example
    ///
    /// ```
    /// use nft_order_matcher::constraints::{Cursor, SortValue};
    ///
    /// let cursor = Cursor { values: vec![SortValue::Time(7)], item_id: "i-1".into() };
    /// let decoded = Cursor::decode(&cursor.encode()).unwrap();
    /// assert_eq!(decoded, cursor);
    /// ```
    pub fn encode(&self) -> String {
        // A Vec of plain enums and strings always serializes.
        hex::encode(serde_json::to_vec(self).unwrap_or_default())
    }

    /// Decode a string produced by [`encode`](Self::encode).
    pub fn decode(encoded: &str) -> Result<Self, StoreError> {
        let bytes = hex::decode(encoded).map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::InvalidCursor(e.to_string()))
    }

    fn cmp_item(&self, values: &[SortValue], item_id: &str) -> Ordering {
        self.values
            .as_slice()
            .cmp(values)
            .then_with(|| self.item_id.as_str().cmp(item_id))
    }
}

// ============================================================================
// Query
// ============================================================================

/// A paged query for candidate items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateQuery {
    pub filters: Vec<QueryFilter>,
    pub order_by: Vec<SortKey>,
    pub limit: usize,
    pub start_after: Option<Cursor>,
}

impl CandidateQuery {
    /// An unfiltered, unordered query with no limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter.
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        if !self.filters.contains(&filter) {
            self.filters.push(filter);
        }
        self
    }

    /// Append an ordering key. Repeated keys are ignored.
    pub fn order_by(mut self, key: SortKey) -> Self {
        if !self.order_by.contains(&key) {
            self.order_by.push(key);
        }
        self
    }

    /// Set the page size. Zero means unlimited.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Resume after `cursor`.
    pub fn start_after(mut self, cursor: Cursor) -> Self {
        self.start_after = Some(cursor);
        self
    }

    /// Cursor positioned at `item` under this query's ordering.
    pub fn cursor_for(&self, item: &OrderItem) -> Cursor {
        Cursor::after(item, &self.order_by)
    }

    /// Whether `item` passes every filter.
    pub fn matches(&self, item: &OrderItem) -> bool {
        self.filters.iter().all(|filter| filter.matches(item))
    }

    fn sort_values(&self, item: &OrderItem) -> Vec<SortValue> {
        self.order_by.iter().map(|key| key.value(item)).collect()
    }

    /// Whether `item` is positioned strictly after the query's cursor.
    pub fn is_after_cursor(&self, item: &OrderItem) -> bool {
        match &self.start_after {
            Some(cursor) => cursor.cmp_item(&self.sort_values(item), &item.id) == Ordering::Less,
            None => true,
        }
    }

    /// Evaluate the query over `items`: filter, order, resume and limit.
    pub fn apply<'a>(&self, items: impl IntoIterator<Item = &'a OrderItem>) -> Vec<OrderItem> {
        let mut page: Vec<(Vec<SortValue>, &OrderItem)> = items
            .into_iter()
            .filter(|item| self.matches(item) && self.is_after_cursor(item))
            .map(|item| (self.sort_values(item), item))
            .collect();

        page.sort_by(|(a_values, a), (b_values, b)| a_values.cmp(b_values).then_with(|| a.id.cmp(&b.id)));

        let limit = if self.limit == 0 { usize::MAX } else { self.limit };
        page.into_iter().take(limit).map(|(_, item)| item.clone()).collect()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
