//! End-to-end matching scenarios through [`OrdersGraph`].
//!
//! Each test builds a small order book in a [`MemoryOrderStore`] (or a store
//! wrapping one) and runs a full search from a root order id.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use nft_order_matcher::constraints::CandidateQuery;
use nft_order_matcher::intersection::{one_to_many_intersection, order_intersection};
use nft_order_matcher::store::{MemoryOrderStore, OrderStore, StoreError};
use nft_order_matcher::types::price::parse_eth;
use nft_order_matcher::types::{Order, OrderItem, OrderMatch, PriceCurve, ResolvedOrder, Side};
use nft_order_matcher::{MatchError, MatcherConfig, OrdersGraph};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

const T0: u64 = 1_000;
const COLLECTION: &str = "0xcollection";

fn eth(s: &str) -> Decimal {
    parse_eth(s).unwrap()
}

fn flat(price: &str) -> PriceCurve {
    PriceCurve::flat(eth(price), T0, T0 + 1_000)
}

/// An order whose items pin `tokens`; an empty token is a collection wildcard.
fn resolved(id: &str, side: Side, num_items: u32, price: PriceCurve, tokens: &[&str]) -> ResolvedOrder {
    let order = Order::new(id, side, num_items, price);
    let items = tokens
        .iter()
        .enumerate()
        .map(|(i, token)| {
            let item = order.item(format!("{id}-{i}"), COLLECTION);
            if token.is_empty() {
                item
            } else {
                item.with_token(*token)
            }
        })
        .collect();
    ResolvedOrder::new(order, items)
}

fn store(orders: impl IntoIterator<Item = ResolvedOrder>) -> MemoryOrderStore {
    let mut store = MemoryOrderStore::new();
    for order in orders {
        store.insert(order);
    }
    store
}

fn engine(orders: impl IntoIterator<Item = ResolvedOrder>) -> OrdersGraph {
    OrdersGraph::new(Arc::new(store(orders)), MatcherConfig::default())
}

/// Price both sides agree on at the record's timestamp.
fn agreed_price(record: &OrderMatch) -> Decimal {
    let opposing = record.opposing_orders();
    let intersection = match record {
        OrderMatch::OneToOne(_) => order_intersection(record.order(), opposing[0]),
        OrderMatch::OneToMany(_) => one_to_many_intersection(record.order(), &opposing),
    };
    intersection
        .unwrap()
        .expect("record without intersection")
        .price_at_time(record.timestamp())
        .unwrap()
        .expect("record timestamp outside intersection")
}

// ============================================================================
// ONE-TO-ONE
// ============================================================================

#[tokio::test]
async fn test_bid_dominates_clearing_price() {
    let engine = engine([
        resolved("buy", Side::Buy, 1, flat("1.5"), &[""]),
        resolved("sell", Side::Sell, 1, flat("1.0"), &["7"]),
    ]);

    for (root, now) in [("buy", T0 + 500), ("sell", T0)] {
        let outcome = engine.search(root, now).await.unwrap();

        assert_eq!(outcome.matches.len(), 1, "root {root}");
        let record = &outcome.matches[0];
        assert!(matches!(record, OrderMatch::OneToOne(_)));
        assert_eq!(record.price(), eth("1.5"));
        assert_eq!(record.timestamp(), now);
        assert_eq!(agreed_price(record), record.price());
    }
}

#[tokio::test]
async fn test_under_requesting_buyer_is_rejected() {
    let engine = engine([
        resolved("sell", Side::Sell, 3, flat("1.0"), &["1", "2", "3"]),
        resolved("buy", Side::Buy, 2, flat("1.2"), &["1", "2"]),
    ]);

    let outcome = engine.search("sell", T0).await.unwrap();

    assert!(outcome.matches.is_empty());
    assert!(outcome.requires_scan.is_empty());
}

#[tokio::test]
async fn test_no_intersection_returns_empty() {
    let engine = engine([
        resolved("buy", Side::Buy, 1, flat("0.5"), &[""]),
        resolved("sell", Side::Sell, 1, flat("1.0"), &["7"]),
    ]);

    let outcome = engine.search("buy", T0).await.unwrap();
    assert!(outcome.matches.is_empty());
}

#[tokio::test]
async fn test_future_intersection_uses_window_start() {
    let later = PriceCurve::flat(eth("1.0"), T0 + 400, T0 + 1_000);
    let engine = engine([
        resolved("buy", Side::Buy, 1, flat("1.5"), &[""]),
        resolved("sell", Side::Sell, 1, later, &["7"]),
    ]);

    let outcome = engine.search("buy", T0).await.unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].timestamp(), T0 + 400);
    assert_eq!(agreed_price(&outcome.matches[0]), outcome.matches[0].price());
}

#[tokio::test]
async fn test_dutch_auction_clears_at_crossing() {
    // Ask decays 2.0 -> 1.0 over the window; a flat bid of 1.5 meets it halfway.
    let auction = PriceCurve::new(eth("2"), eth("1"), T0, T0 + 1_000);
    let engine = engine([
        resolved("buy", Side::Buy, 1, flat("1.5"), &[""]),
        resolved("sell", Side::Sell, 1, auction, &["7"]),
    ]);

    let outcome = engine.search("buy", T0).await.unwrap();

    assert_eq!(outcome.matches.len(), 1);
    let record = &outcome.matches[0];
    assert_eq!(record.timestamp(), T0 + 500);
    assert_eq!(record.price(), eth("1.5"));
    assert_eq!(agreed_price(record), record.price());
}

// ============================================================================
// ONE-TO-MANY
// ============================================================================

#[tokio::test]
async fn test_bundle_filled_by_single_item_sellers() {
    let engine = engine([
        resolved("bundle", Side::Buy, 2, flat("1.2"), &["1", "2"]),
        resolved("sell-1", Side::Sell, 1, flat("0.5"), &["1"]),
        resolved("sell-2", Side::Sell, 1, flat("0.5"), &["2"]),
    ]);

    let outcome = engine.search("bundle", T0 + 100).await.unwrap();

    assert_eq!(outcome.matches.len(), 1);
    let OrderMatch::OneToMany(record) = &outcome.matches[0] else {
        panic!("expected a one-to-many record");
    };
    assert_eq!(record.edges.len(), 2);
    assert_eq!(record.num_items(), 2);
    assert_eq!(record.opposing_orders.len(), 2);
    for edge in &record.edges {
        assert!(edge.num_items <= edge.from.max_contribution());
        assert!(edge.num_items <= edge.to.max_contribution());
        assert_eq!(edge.from.token_id, edge.to.token_id);
    }

    let expected = one_to_many_intersection(
        &record.order,
        &record.opposing_orders.iter().collect::<Vec<_>>(),
    )
    .unwrap()
    .unwrap()
    .resolve(T0 + 100)
    .unwrap()
    .unwrap();
    assert_eq!(record.price, expected.price);
    assert_eq!(record.price, eth("1.2"));
}

#[tokio::test]
async fn test_sell_bundle_filled_by_single_item_buyers() {
    let engine = engine([
        resolved("bundle", Side::Sell, 2, flat("1.0"), &["1", "2"]),
        resolved("buy-1", Side::Buy, 1, flat("0.6"), &["1"]),
        resolved("buy-2", Side::Buy, 1, flat("0.6"), &["2"]),
    ]);

    let outcome = engine.search("bundle", T0).await.unwrap();

    assert_eq!(outcome.matches.len(), 1);
    let OrderMatch::OneToMany(record) = &outcome.matches[0] else {
        panic!("expected a one-to-many record");
    };
    assert_eq!(record.num_items(), 2);
    let buyers: Vec<&str> = record.opposing_orders.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(buyers, vec!["buy-1", "buy-2"]);
    assert_eq!(record.price, eth("1.2"));
    assert_eq!(agreed_price(&outcome.matches[0]), record.price);
}

#[tokio::test]
async fn test_bundle_too_expensive_for_sellers() {
    let engine = engine([
        resolved("bundle", Side::Buy, 2, flat("0.8"), &["1", "2"]),
        resolved("sell-1", Side::Sell, 1, flat("0.5"), &["1"]),
        resolved("sell-2", Side::Sell, 1, flat("0.5"), &["2"]),
    ]);

    let outcome = engine.search("bundle", T0).await.unwrap();
    assert!(outcome.matches.is_empty());
}

#[tokio::test]
async fn test_bundle_missing_token_is_not_matched() {
    let engine = engine([
        resolved("bundle", Side::Buy, 3, flat("3"), &["1", "2", "3"]),
        resolved("sell-1", Side::Sell, 1, flat("0.5"), &["1"]),
        resolved("sell-2", Side::Sell, 1, flat("0.5"), &["2"]),
    ]);

    let outcome = engine.search("bundle", T0).await.unwrap();
    assert!(outcome.matches.is_empty());
}

// ============================================================================
// REQUIRES SCAN
// ============================================================================

#[tokio::test]
async fn test_multi_item_candidate_requires_scan() {
    let engine = engine([
        resolved("buy", Side::Buy, 1, flat("1.5"), &[""]),
        resolved("bundle", Side::Sell, 2, flat("1.0"), &["1", "2"]),
        resolved("single", Side::Sell, 1, flat("1.0"), &["3"]),
    ]);

    let outcome = engine.search("buy", T0).await.unwrap();

    let scan: Vec<&str> = outcome.requires_scan.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(scan, vec!["bundle"]);
    for record in &outcome.matches {
        assert_eq!(agreed_price(record), record.price());
    }
}

#[tokio::test]
async fn test_bundle_priced_above_single_bid_requires_scan() {
    // 2.0 for two tokens is 1.0 each, under the 1.5 bid, though the bundle
    // total is above it.
    let engine = engine([
        resolved("buy", Side::Buy, 1, flat("1.5"), &[""]),
        resolved("bundle", Side::Sell, 2, flat("2.0"), &["1", "2"]),
    ]);

    let outcome = engine.search("buy", T0).await.unwrap();

    assert!(outcome.matches.is_empty());
    let scan: Vec<&str> = outcome.requires_scan.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(scan, vec!["bundle"]);
}

// ============================================================================
// STORE BEHAVIOUR
// ============================================================================

#[tokio::test]
async fn test_missing_root_order() {
    let engine = engine([resolved("sell", Side::Sell, 1, flat("1.0"), &["7"])]);

    let err = engine.search("missing", T0).await.unwrap_err();
    assert!(matches!(err, MatchError::OrderNotFound(id) if id == "missing"));
}

/// Store whose candidate queries also return an item of an order it no
/// longer holds.
struct StaleStore {
    inner: MemoryOrderStore,
    stale: OrderItem,
}

#[async_trait]
impl OrderStore for StaleStore {
    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        self.inner.get_order(order_id).await
    }

    async fn get_order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, StoreError> {
        self.inner.get_order_items(order_id).await
    }

    async fn query_items(&self, query: &CandidateQuery) -> Result<Vec<OrderItem>, StoreError> {
        let mut page = self.inner.query_items(query).await?;
        page.push(self.stale.clone());
        Ok(page)
    }
}

#[tokio::test]
async fn test_stale_candidate_is_skipped() {
    let ghost = resolved("ghost", Side::Sell, 1, flat("1.0"), &["9"]);
    let store = StaleStore {
        inner: store([
            resolved("buy", Side::Buy, 1, flat("1.5"), &[""]),
            resolved("sell", Side::Sell, 1, flat("1.0"), &["7"]),
        ]),
        stale: ghost.items[0].clone(),
    };
    let engine = OrdersGraph::new(Arc::new(store), MatcherConfig::default());

    let outcome = engine.search("buy", T0).await.unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].opposing_orders()[0].id, "sell");
}

/// Store whose candidate queries always fail.
struct FailingStore {
    inner: MemoryOrderStore,
}

#[async_trait]
impl OrderStore for FailingStore {
    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        self.inner.get_order(order_id).await
    }

    async fn get_order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, StoreError> {
        self.inner.get_order_items(order_id).await
    }

    async fn query_items(&self, _query: &CandidateQuery) -> Result<Vec<OrderItem>, StoreError> {
        Err(StoreError::Backend("connection reset".to_string()))
    }
}

#[tokio::test]
async fn test_store_failure_propagates() {
    let store = FailingStore {
        inner: store([resolved("buy", Side::Buy, 1, flat("1.5"), &[""])]),
    };
    let engine = OrdersGraph::new(Arc::new(store), MatcherConfig::default());

    let err = engine.search("buy", T0).await.unwrap_err();
    assert!(matches!(err, MatchError::Store(StoreError::Backend(_))));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_small_pages_find_every_candidate() {
    let mut orders = vec![resolved("buy", Side::Buy, 1, flat("2"), &[""])];
    for i in 0..7 {
        let token = i.to_string();
        orders.push(resolved(&format!("sell-{i}"), Side::Sell, 1, flat("1"), &[token.as_str()]));
    }
    let config = MatcherConfig {
        page_size: 2,
        ..MatcherConfig::default()
    };
    let engine = OrdersGraph::new(Arc::new(store(orders)), config);

    let outcome = engine.search("buy", T0).await.unwrap();
    assert_eq!(outcome.matches.len(), 7);
}
