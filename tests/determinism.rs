//! Determinism and invariant checks over randomly generated order books.
//!
//! These tests verify:
//! 1. Repeated searches over the same book return identical outcomes
//! 2. No item is ever matched beyond its max contribution
//! 3. One-to-many records fill the root exactly
//! 4. Every record's price is the price both sides agree on at its timestamp
//!
//! ## Running
//!
//! ```bash
//! cargo test --release --test determinism -- --nocapture
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;

use nft_order_matcher::intersection::{one_to_many_intersection, order_intersection};
use nft_order_matcher::store::MemoryOrderStore;
use nft_order_matcher::types::{Order, OrderMatch, PriceCurve, ResolvedOrder, Side};
use nft_order_matcher::{MatcherConfig, OrdersGraph, SearchOutcome};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

/// Orders per generated book
const BOOK_SIZE: usize = 60;

/// Distinct tokens per collection; small so that orders collide often
const TOKENS: u32 = 8;

const COLLECTIONS: [&str; 2] = ["0xaaa", "0xbbb"];

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Generate a deterministic order book. Same seed = same book.
fn generate_book(seed: u64) -> Vec<ResolvedOrder> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut book = Vec::with_capacity(BOOK_SIZE);

    for i in 0..BOOK_SIZE {
        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let num_items: u32 = rng.gen_range(1..=3);

        // Total price scales with the bundle size: 0.5 to 3.0 ETH per item.
        let start_price = Decimal::new(rng.gen_range(5..=30) * i64::from(num_items), 1);
        let end_price = Decimal::new(rng.gen_range(5..=30) * i64::from(num_items), 1);
        let start_time: u64 = rng.gen_range(0..5_000);
        let end_time = start_time + rng.gen_range(1_000..10_000);
        let price = PriceCurve::new(start_price, end_price, start_time, end_time);

        let order = Order::new(format!("order-{i:03}"), side, num_items, price);
        let collection = COLLECTIONS[rng.gen_range(0..COLLECTIONS.len())];

        // Buyers sometimes accept any token of the collection.
        let items = if side == Side::Buy && rng.gen_bool(0.3) {
            vec![order.item(format!("order-{i:03}-0"), collection)]
        } else {
            let mut tokens: Vec<u32> = Vec::new();
            while tokens.len() < num_items as usize {
                let token = rng.gen_range(0..TOKENS);
                if !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
            tokens
                .iter()
                .enumerate()
                .map(|(j, token)| {
                    order
                        .item(format!("order-{i:03}-{j}"), collection)
                        .with_token(token.to_string())
                })
                .collect()
        };

        book.push(ResolvedOrder::new(order, items));
    }

    book
}

fn engine(book: &[ResolvedOrder]) -> OrdersGraph {
    let mut store = MemoryOrderStore::new();
    for order in book {
        store.insert(order.clone());
    }
    OrdersGraph::new(Arc::new(store), MatcherConfig::default())
}

async fn search_all(engine: &OrdersGraph, book: &[ResolvedOrder], now: u64) -> Vec<SearchOutcome> {
    let mut outcomes = Vec::with_capacity(book.len());
    for order in book {
        outcomes.push(engine.search(order.id(), now).await.unwrap());
    }
    outcomes
}

fn assert_capacity(record: &OrderMatch, book: &HashMap<&str, &ResolvedOrder>) {
    let mut used: HashMap<String, u32> = HashMap::new();
    match record {
        OrderMatch::OneToOne(m) => {
            for pair in &m.pairs {
                *used.entry(pair.order_item.id.clone()).or_default() += 1;
                *used.entry(pair.opposing_order_item.id.clone()).or_default() += 1;
            }
        }
        OrderMatch::OneToMany(m) => {
            for edge in &m.edges {
                *used.entry(edge.from.id.clone()).or_default() += edge.num_items;
                *used.entry(edge.to.id.clone()).or_default() += edge.num_items;
            }
            assert_eq!(m.num_items(), m.order.num_items, "one-to-many fill for {}", m.order.id);
        }
    }

    let items = record
        .opposing_orders()
        .into_iter()
        .chain(std::iter::once(record.order()))
        .flat_map(|order| book[order.id.as_str()].items.iter());
    for item in items {
        let count = used.get(&item.id).copied().unwrap_or_default();
        assert!(
            count <= item.max_contribution(),
            "item {} used {} times, max {}",
            item.id,
            count,
            item.max_contribution()
        );
    }
}

fn assert_agreed_price(record: &OrderMatch) {
    let opposing = record.opposing_orders();
    let intersection = match record {
        OrderMatch::OneToOne(_) => order_intersection(record.order(), opposing[0]),
        OrderMatch::OneToMany(_) => one_to_many_intersection(record.order(), &opposing),
    }
    .unwrap()
    .expect("record without intersection");

    assert_eq!(
        intersection.price_at_time(record.timestamp()).unwrap(),
        Some(record.price()),
        "price of match {}",
        record.id()
    );
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_repeated_searches_are_identical() {
    let book = generate_book(42);
    let graph = engine(&book);

    let first = search_all(&graph, &book, 2_500).await;
    let second = search_all(&graph, &book, 2_500).await;
    assert_eq!(first, second);

    // A fresh engine over the same book agrees too.
    let third = search_all(&engine(&book), &book, 2_500).await;
    assert_eq!(first, third);
}

#[test]
fn test_same_seed_same_book() {
    assert_eq!(generate_book(7), generate_book(7));
    assert_ne!(generate_book(7), generate_book(8));
}

#[tokio::test]
async fn test_invariants_hold_across_seeds() {
    let mut records = 0;

    for seed in [1, 2, 3, 42, 1337] {
        let book = generate_book(seed);
        let by_id: HashMap<&str, &ResolvedOrder> = book.iter().map(|o| (o.id(), o)).collect();
        let graph = engine(&book);

        for outcome in search_all(&graph, &book, 3_000).await {
            for record in &outcome.matches {
                assert_capacity(record, &by_id);
                assert_agreed_price(record);
                assert!(record.timestamp() >= 3_000);
                records += 1;
            }
            for order in &outcome.requires_scan {
                assert!(order.num_items > 1);
            }
        }
    }

    println!("Checked {} match records", records);
}
