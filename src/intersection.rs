//! Price intersection of opposing price curves.
//!
//! ## Algorithm
//!
//! A buy curve (bid) and a sell curve (ask) are line segments in
//! (time, price) space. Restricted to the overlap of their windows, the
//! difference `bid(t) - ask(t)` is linear, so the instants where the buyer
//! pays at least the ask form a single interval:
//!
//! ```text
//! price
//!   |  ask \
//!   |       \      ______ bid
//!   |   _____\____/
//!   |        |\
//!   |        | \
//!   +--------+----------------- time
//!         valid_from
//! ```
//!
//! - both ends non-negative: the whole overlap is valid
//! - both ends negative: no intersection
//! - sign change: solve `bid(t) == ask(t)` and keep the non-negative side
//!
//! The clearing price at `t` is the higher of the two curves, which inside
//! the valid interval is always the buyer's bid.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{MatchError, Result};
use crate::types::{Order, OrderItem, PriceCurve, Side};

/// A price and the instant it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearingPrice {
    /// Price (ETH)
    pub price: Decimal,
    /// Instant (unix ms)
    pub timestamp: u64,
}

/// The interval over which a bid meets an ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceIntersection {
    bid: PriceCurve,
    ask: PriceCurve,
    valid_from: u64,
    valid_until: u64,
    price: Decimal,
}

impl PriceIntersection {
    /// Earliest instant the curves intersect (unix ms)
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.valid_from
    }

    /// Last instant the curves intersect (unix ms)
    #[inline]
    pub fn valid_until(&self) -> u64 {
        self.valid_until
    }

    /// Clearing price at [`timestamp`](Self::timestamp)
    #[inline]
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Clearing price at `t`, or `None` outside the valid interval.
    pub fn price_at_time(&self, t: u64) -> Result<Option<Decimal>> {
        if t < self.valid_from || t > self.valid_until {
            return Ok(None);
        }
        let bid = self.bid.value_at(t)?;
        let ask = self.ask.value_at(t)?;
        Ok(Some(bid.max(ask)))
    }

    /// Resolve the price a match evaluated at `now` should carry.
    ///
    /// A future intersection reports its starting price and instant. An
    /// intersection that already started is evaluated at `now`; if the window
    /// has closed there is no price.
    pub fn resolve(&self, now: u64) -> Result<Option<ClearingPrice>> {
        if self.valid_from > now {
            return Ok(Some(ClearingPrice {
                price: self.price,
                timestamp: self.valid_from,
            }));
        }

        Ok(self.price_at_time(now)?.map(|price| ClearingPrice {
            price,
            timestamp: now,
        }))
    }
}

// ============================================================================
// Intersection
// ============================================================================

/// Intersect a buyer's curve with a seller's curve.
///
/// # Returns
///
/// * `Ok(None)` - The ask never drops to the bid inside the common window
/// * `Ok(Some(intersection))` - The interval where `bid >= ask`
///
/// # Example
///
/// ```
/// use nft_order_matcher::intersection::intersect;
/// use nft_order_matcher::types::PriceCurve;
/// use nft_order_matcher::types::price::parse_eth;
///
/// let ask = PriceCurve::flat(parse_eth("1.0").unwrap(), 0, 1_000);
/// let bid = PriceCurve::flat(parse_eth("1.5").unwrap(), 0, 1_000);
///
/// let intersection = intersect(&bid, &ask).unwrap().unwrap();
/// assert_eq!(intersection.timestamp(), 0);
/// assert_eq!(intersection.price(), parse_eth("1.5").unwrap());
/// ```
pub fn intersect(bid: &PriceCurve, ask: &PriceCurve) -> Result<Option<PriceIntersection>> {
    let from = bid.start_time.max(ask.start_time);
    let until = bid.end_time.min(ask.end_time);
    if from > until {
        return Ok(None);
    }

    let spread = |t: u64| -> Result<Decimal> {
        bid.value_at(t)?
            .checked_sub(ask.value_at(t)?)
            .ok_or(MatchError::Arithmetic("spread"))
    };

    let d0 = spread(from)?;
    let d1 = spread(until)?;

    let (valid_from, valid_until) = match (d0 >= Decimal::ZERO, d1 >= Decimal::ZERO) {
        (true, true) => (from, until),
        (false, false) => return Ok(None),
        (true, false) => {
            let crossed = crossing(from, until, d0, d1)?.floor();
            let mut last = to_millis(crossed.max(Decimal::from(from)))?;
            if spread(last)? < Decimal::ZERO {
                last = last.saturating_sub(1).max(from);
            }
            (from, last)
        }
        (false, true) => {
            let mut first = to_millis(crossing(from, until, d0, d1)?.ceil())?;
            if spread(first)? < Decimal::ZERO {
                first += 1;
            }
            if first > until || spread(first)? < Decimal::ZERO {
                return Ok(None);
            }
            (first, until)
        }
    };

    let price = bid.value_at(valid_from)?.max(ask.value_at(valid_from)?);
    Ok(Some(PriceIntersection {
        bid: *bid,
        ask: *ask,
        valid_from,
        valid_until,
        price,
    }))
}

/// Instant where a linear spread going from `d0` at `from` to `d1` at
/// `until` crosses zero. Requires `d0 != d1`.
fn crossing(from: u64, until: u64, d0: Decimal, d1: Decimal) -> Result<Decimal> {
    let span = Decimal::from(until - from);
    d0.checked_div(d0 - d1)
        .and_then(|ratio| ratio.checked_mul(span))
        .and_then(|offset| Decimal::from(from).checked_add(offset))
        .ok_or(MatchError::Arithmetic("crossing time"))
}

fn to_millis(t: Decimal) -> Result<u64> {
    t.to_u64().ok_or(MatchError::Arithmetic("timestamp conversion"))
}

/// Intersect the price curves of two opposing orders.
pub fn order_intersection(a: &Order, b: &Order) -> Result<Option<PriceIntersection>> {
    match (a.side, b.side) {
        (Side::Buy, Side::Sell) => intersect(&a.price, &b.price),
        (Side::Sell, Side::Buy) => intersect(&b.price, &a.price),
        _ => Err(MatchError::SameSide(a.id.clone(), b.id.clone())),
    }
}

/// Intersect the per-item prices of two opposing items.
///
/// Items carry their order's total price, so each curve is divided by its
/// order's `num_items` first. Orders of different sizes are then compared
/// unit for unit; the clearing price of an actual match still comes from
/// [`order_intersection`] or [`one_to_many_intersection`].
pub fn item_intersection(a: &OrderItem, b: &OrderItem) -> Result<Option<PriceIntersection>> {
    let (bid, ask) = match (a.side, b.side) {
        (Side::Buy, Side::Sell) => (a, b),
        (Side::Sell, Side::Buy) => (b, a),
        _ => return Err(MatchError::SameSide(a.order_id.clone(), b.order_id.clone())),
    };
    intersect(&bid.price.per_item(bid.num_items)?, &ask.price.per_item(ask.num_items)?)
}

/// Intersect a root order with the combined price of several opposing orders.
///
/// Order prices are totals, so the opposing side's price is the sum of the
/// opposing curves over their common window.
pub fn one_to_many_intersection(root: &Order, opposing: &[&Order]) -> Result<Option<PriceIntersection>> {
    if let Some(same) = opposing.iter().find(|o| o.side == root.side) {
        return Err(MatchError::SameSide(root.id.clone(), same.id.clone()));
    }

    let combined = match PriceCurve::sum(opposing.iter().map(|o| &o.price))? {
        Some(curve) => curve,
        None => return Ok(None),
    };

    match root.side {
        Side::Buy => intersect(&root.price, &combined),
        Side::Sell => intersect(&combined, &root.price),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
