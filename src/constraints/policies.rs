//! Item constraint policies.
//!
//! | Policy | Check | Query filter |
//! |--------|-------|--------------|
//! | [`ChainConstraint`] | same chain | `ChainId` |
//! | [`SideConstraint`] | opposite side | `Side` |
//! | [`StatusConstraint`] | candidate active | `Status` |
//! | [`CollectionConstraint`] | same collection | `Collection` |
//! | [`TokenConstraint`] | token ids agree, one side pins | `TokenIdOrAny` |
//! | [`TraitConstraint`] | pinned token has required traits | - |
//! | [`ComplicationConstraint`] | same complication | `Complication` |
//! | [`CurrencyConstraint`] | same currency | `Currency` |
//! | [`TimeWindowConstraint`] | windows overlap | `EndTimeAtLeast` |
//! | [`PriceConstraint`] | price curves intersect | - |

use crate::constraints::query::{CandidateQuery, QueryFilter, SortKey};
use crate::constraints::ItemConstraint;
use crate::intersection::item_intersection;
use crate::types::{OrderItem, OrderStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct ChainConstraint;

impl ItemConstraint for ChainConstraint {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn check(&self, item: &OrderItem, candidate: &OrderItem) -> Result<(), String> {
        if item.chain_id == candidate.chain_id {
            Ok(())
        } else {
            Err(format!("chain {} != {}", candidate.chain_id, item.chain_id))
        }
    }

    fn narrow_query(&self, item: &OrderItem, query: CandidateQuery) -> CandidateQuery {
        query.filter(QueryFilter::ChainId(item.chain_id))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SideConstraint;

impl ItemConstraint for SideConstraint {
    fn name(&self) -> &'static str {
        "side"
    }

    fn check(&self, item: &OrderItem, candidate: &OrderItem) -> Result<(), String> {
        if candidate.side == item.side.opposite() {
            Ok(())
        } else {
            Err(format!("candidate is on the {:?} side as well", candidate.side))
        }
    }

    fn narrow_query(&self, item: &OrderItem, query: CandidateQuery) -> CandidateQuery {
        query.filter(QueryFilter::Side(item.side.opposite()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusConstraint;

impl ItemConstraint for StatusConstraint {
    fn name(&self) -> &'static str {
        "status"
    }

    fn check(&self, _item: &OrderItem, candidate: &OrderItem) -> Result<(), String> {
        if candidate.status == OrderStatus::Active {
            Ok(())
        } else {
            Err(format!("candidate is {:?}", candidate.status))
        }
    }

    fn narrow_query(&self, _item: &OrderItem, query: CandidateQuery) -> CandidateQuery {
        query.filter(QueryFilter::Status(OrderStatus::Active))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionConstraint;

impl ItemConstraint for CollectionConstraint {
    fn name(&self) -> &'static str {
        "collection"
    }

    fn score(&self) -> u32 {
        1
    }

    fn check(&self, item: &OrderItem, candidate: &OrderItem) -> Result<(), String> {
        if item.collection.eq_ignore_ascii_case(&candidate.collection) {
            Ok(())
        } else {
            Err(format!("collection {} != {}", candidate.collection, item.collection))
        }
    }

    fn narrow_query(&self, item: &OrderItem, query: CandidateQuery) -> CandidateQuery {
        query.filter(QueryFilter::Collection(item.collection.clone()))
    }
}

/// Token ids must agree when both items pin one. Two wildcards never match:
/// at least one side has to name the token that changes hands.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenConstraint;

impl ItemConstraint for TokenConstraint {
    fn name(&self) -> &'static str {
        "token"
    }

    fn score(&self) -> u32 {
        2
    }

    fn check(&self, item: &OrderItem, candidate: &OrderItem) -> Result<(), String> {
        match (&item.token_id, &candidate.token_id) {
            (Some(a), Some(b)) if a == b => Ok(()),
            (Some(a), Some(b)) => Err(format!("token {} != {}", b, a)),
            (None, None) => Err("neither item pins a token".to_string()),
            _ => Ok(()),
        }
    }

    fn narrow_query(&self, item: &OrderItem, query: CandidateQuery) -> CandidateQuery {
        match &item.token_id {
            Some(token_id) => query.filter(QueryFilter::TokenIdOrAny(token_id.clone())),
            None => query,
        }
    }
}

/// A wildcard item's trait filters must all accept the candidate's token.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraitConstraint;

impl ItemConstraint for TraitConstraint {
    fn name(&self) -> &'static str {
        "traits"
    }

    fn score(&self) -> u32 {
        1
    }

    fn check(&self, item: &OrderItem, candidate: &OrderItem) -> Result<(), String> {
        if !candidate.pins_token() {
            return Ok(());
        }
        match item
            .trait_filters
            .iter()
            .find(|filter| !filter.accepts(&candidate.token_attributes))
        {
            Some(filter) => Err(format!(
                "token lacks {} in {:?}",
                filter.trait_type, filter.values
            )),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComplicationConstraint;

impl ItemConstraint for ComplicationConstraint {
    fn name(&self) -> &'static str {
        "complication"
    }

    fn check(&self, item: &OrderItem, candidate: &OrderItem) -> Result<(), String> {
        if item.complication == candidate.complication {
            Ok(())
        } else {
            Err(format!(
                "complication {} != {}",
                candidate.complication, item.complication
            ))
        }
    }

    fn narrow_query(&self, item: &OrderItem, query: CandidateQuery) -> CandidateQuery {
        query.filter(QueryFilter::Complication(item.complication.clone()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyConstraint;

impl ItemConstraint for CurrencyConstraint {
    fn name(&self) -> &'static str {
        "currency"
    }

    fn check(&self, item: &OrderItem, candidate: &OrderItem) -> Result<(), String> {
        if item.currency == candidate.currency {
            Ok(())
        } else {
            Err(format!("currency {} != {}", candidate.currency, item.currency))
        }
    }

    fn narrow_query(&self, item: &OrderItem, query: CandidateQuery) -> CandidateQuery {
        query.filter(QueryFilter::Currency(item.currency.clone()))
    }
}

/// The two orders' windows overlap. Also orders the candidate stream
/// oldest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeWindowConstraint;

impl ItemConstraint for TimeWindowConstraint {
    fn name(&self) -> &'static str {
        "time window"
    }

    fn check(&self, item: &OrderItem, candidate: &OrderItem) -> Result<(), String> {
        if item.start_time() <= candidate.end_time() && candidate.start_time() <= item.end_time() {
            Ok(())
        } else {
            Err(format!(
                "window [{}, {}] misses [{}, {}]",
                candidate.start_time(),
                candidate.end_time(),
                item.start_time(),
                item.end_time()
            ))
        }
    }

    fn narrow_query(&self, item: &OrderItem, query: CandidateQuery) -> CandidateQuery {
        query.filter(QueryFilter::EndTimeAtLeast(item.start_time()))
    }

    fn sort_keys(&self) -> &'static [SortKey] {
        &[SortKey::StartTime]
    }
}

/// The per-item price curves intersect at some instant. Auction prices move
/// with time, so this is never pushed into the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceConstraint;

impl ItemConstraint for PriceConstraint {
    fn name(&self) -> &'static str {
        "price"
    }

    fn score(&self) -> u32 {
        1
    }

    fn check(&self, item: &OrderItem, candidate: &OrderItem) -> Result<(), String> {
        match item_intersection(item, candidate) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err("price curves never intersect".to_string()),
            Err(err) => Err(err.to_string()),
        }
    }
}
