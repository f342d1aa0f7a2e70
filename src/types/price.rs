//! Price curves and ETH decimal helpers.
//!
//! ## Overview
//!
//! Every order carries a [`PriceCurve`]: a linear interpolation between a
//! start and an end price over a time window. Flat orders have equal start
//! and end prices; Dutch auctions decay (sell side) or grow (buy side).
//!
//! All prices are `rust_decimal::Decimal` values denominated in ETH, and all
//! times are unix milliseconds. No floating point is used anywhere, so two
//! evaluations of the same curve at the same instant are always identical.
//!
//! ## Curve semantics
//!
//! | Instant | Price |
//! |---------|-------|
//! | `t < start_time` | undefined (order not active yet) |
//! | `start_time <= t <= end_time` | linear interpolation |
//! | `t > end_time` | `end_price` |
//!
//! ## Example
//!
//! ```
//! use nft_order_matcher::types::price::{parse_eth, PriceCurve};
//!
//! let curve = PriceCurve::new(parse_eth("2").unwrap(), parse_eth("1").unwrap(), 0, 1_000);
//! assert_eq!(curve.price_at(500).unwrap(), Some(parse_eth("1.5").unwrap()));
//! assert_eq!(curve.price_at(5_000).unwrap(), Some(parse_eth("1").unwrap()));
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

// ============================================================================
// Conversion Functions
// ============================================================================

/// Parse a decimal ETH amount.
///
/// # Returns
///
/// * `Some(Decimal)` - The parsed amount
/// * `None` - If parsing fails or the amount is negative
///
/// # Example
///
/// ```
/// use nft_order_matcher::types::price::parse_eth;
///
/// assert!(parse_eth("0.5").is_some());
/// assert!(parse_eth("-1").is_none());
/// assert!(parse_eth("abc").is_none());
/// ```
pub fn parse_eth(s: &str) -> Option<Decimal> {
    let value = Decimal::from_str(s.trim()).ok()?;
    if value.is_sign_negative() {
        return None;
    }
    Some(value)
}

/// Format an ETH amount without trailing zeros.
///
/// # Example
///
/// ```
/// use nft_order_matcher::types::price::{format_eth, parse_eth};
///
/// assert_eq!(format_eth(parse_eth("1.500").unwrap()), "1.5");
/// ```
pub fn format_eth(value: Decimal) -> String {
    value.normalize().to_string()
}

// ============================================================================
// Price Curve
// ============================================================================

/// Time-bounded linear price curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceCurve {
    /// Price at `start_time` (ETH)
    pub start_price: Decimal,

    /// Price at and after `end_time` (ETH)
    pub end_price: Decimal,

    /// First instant the order is active (unix ms)
    pub start_time: u64,

    /// Last instant of the interpolation window (unix ms)
    pub end_time: u64,
}

impl PriceCurve {
    /// Create a new price curve.
    ///
    /// # Arguments
    ///
    /// * `start_price` - Price at `start_time`
    /// * `end_price` - Price at `end_time`
    /// * `start_time` - Window start (unix ms)
    /// * `end_time` - Window end (unix ms)
    pub fn new(start_price: Decimal, end_price: Decimal, start_time: u64, end_time: u64) -> Self {
        Self {
            start_price,
            end_price,
            start_time,
            end_time,
        }
    }

    /// Create a curve with a constant price over the window.
    pub fn flat(price: Decimal, start_time: u64, end_time: u64) -> Self {
        Self::new(price, price, start_time, end_time)
    }

    /// Whether the price changes over time (Dutch auction).
    #[inline]
    pub fn is_auction(&self) -> bool {
        self.start_price != self.end_price
    }

    /// Whether `t` falls inside the curve's window.
    #[inline]
    pub fn contains(&self, t: u64) -> bool {
        self.start_time <= t && t <= self.end_time
    }

    /// Price of the order at instant `t`.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The order is not active yet
    /// * `Ok(Some(price))` - The interpolated price, or `end_price` after the window
    /// * `Err(_)` - Decimal overflow
    pub fn price_at(&self, t: u64) -> Result<Option<Decimal>> {
        if t < self.start_time {
            return Ok(None);
        }
        self.value_at(t).map(Some)
    }

    /// Interpolated value at `t`, clamped to the curve's endpoints.
    pub(crate) fn value_at(&self, t: u64) -> Result<Decimal> {
        if t <= self.start_time {
            return Ok(self.start_price);
        }
        if t >= self.end_time || self.end_time <= self.start_time {
            return Ok(self.end_price);
        }

        let elapsed = Decimal::from(t - self.start_time);
        let duration = Decimal::from(self.end_time - self.start_time);
        let delta = self
            .end_price
            .checked_sub(self.start_price)
            .ok_or(MatchError::Arithmetic("price delta"))?;

        delta
            .checked_mul(elapsed)
            .and_then(|v| v.checked_div(duration))
            .and_then(|v| self.start_price.checked_add(v))
            .ok_or(MatchError::Arithmetic("price interpolation"))
    }

    /// Price of one of `num_items` NFTs when the curve is a bundle total.
    ///
    /// # Returns
    ///
    /// * `Ok(curve)` - Both endpoints divided by `num_items`
    /// * `Err(MatchError::Arithmetic)` - `num_items` is zero
    pub fn per_item(&self, num_items: u32) -> Result<PriceCurve> {
        if num_items == 0 {
            return Err(MatchError::Arithmetic("per-item price of zero items"));
        }
        let n = Decimal::from(num_items);
        let start_price = self
            .start_price
            .checked_div(n)
            .ok_or(MatchError::Arithmetic("per-item price"))?;
        let end_price = self
            .end_price
            .checked_div(n)
            .ok_or(MatchError::Arithmetic("per-item price"))?;
        Ok(PriceCurve::new(start_price, end_price, self.start_time, self.end_time))
    }

    /// Aggregate several curves into one over their common window.
    ///
    /// Inside the common window every curve is linear, so their sum is linear
    /// as well and can be represented by a single curve.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - No curves were given or their windows do not overlap
    /// * `Ok(Some(curve))` - The summed curve
    pub fn sum<'a>(curves: impl IntoIterator<Item = &'a PriceCurve>) -> Result<Option<PriceCurve>> {
        let curves: Vec<&PriceCurve> = curves.into_iter().collect();
        if curves.is_empty() {
            return Ok(None);
        }

        let start_time = curves.iter().map(|c| c.start_time).max().unwrap_or(0);
        let end_time = curves.iter().map(|c| c.end_time).min().unwrap_or(0);
        if start_time > end_time {
            return Ok(None);
        }

        let mut start_price = Decimal::ZERO;
        let mut end_price = Decimal::ZERO;
        for curve in curves {
            start_price = start_price
                .checked_add(curve.value_at(start_time)?)
                .ok_or(MatchError::Arithmetic("curve sum"))?;
            end_price = end_price
                .checked_add(curve.value_at(end_time)?)
                .ok_or(MatchError::Arithmetic("curve sum"))?;
        }

        Ok(Some(PriceCurve::new(start_price, end_price, start_time, end_time)))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
