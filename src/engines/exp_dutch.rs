//! Exponential reverse-Dutch auction engine.
//!
//! Same operation shape as [`crate::engines::linear_dutch`], but the
//! price curve is evaluated through [`crate::fixed_point::pow2_neg`]
//! instead of a linear interpolation.

use crate::capabilities::{
    AssetGateway, AssetMove, AssetMoveKind, AuctionId, PrincipalId, ProtocolParameters,
};
use crate::error::{EngineError, EngineResult};
use crate::fixed_point::{self, FIXED_ONE};
use crate::ledger::{AuctionRecord, Effect, LedgerState};
use crate::request::{CreateParams, CreateRequest, Event};
use crate::schedule::{AuctionKind, AuctionState, DutchSchedule, Schedule};

/// 5-decimal fixed-point scale for `decay_factor`.
pub const DECAY_SCALE: u128 = 100_000;

/// `price(t) = min_price + (start_price - min_price) * 2^(-(t-start_ts)*decay_factor/SCALE)`,
/// clamped to `min_price` at or past `deadline`.
fn price_at(schedule: &DutchSchedule, now: i64) -> u128 {
    if now >= schedule.deadline {
        return schedule.min_price;
    }
    let decay_factor = schedule.decay_factor.unwrap_or(0) as u128;
    let elapsed = (now - schedule.start_ts).max(0) as u128;
    let exponent_raw = elapsed * decay_factor * FIXED_ONE / DECAY_SCALE;
    let fraction = fixed_point::pow2_neg(exponent_raw);
    let spread = schedule.start_price - schedule.min_price;
    schedule.min_price + fixed_point::mul_fraction(spread, fraction)
}

pub async fn create(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    params: ProtocolParameters,
    auctioneer: PrincipalId,
    req: &CreateRequest,
) -> EngineResult<(AuctionId, Event)> {
    let CreateParams::Dutch {
        start_price,
        min_price,
        duration,
        decay_factor,
    } = req.params
    else {
        return Err(EngineError::KindMismatch);
    };

    if req.name.is_empty() || req.pay_asset == 0 {
        return Err(EngineError::AmountNonPositive);
    }
    if start_price < min_price || duration <= 0 {
        return Err(EngineError::AmountNonPositive);
    }
    let decay_factor = decay_factor.ok_or(EngineError::AmountNonPositive)?;

    let item_move = AssetMove {
        kind: req.asset_kind,
        asset: req.asset_id,
        principal: auctioneer,
        id_or_amount: req.id_or_amount,
    };
    gateway
        .escrow_take(&item_move)
        .await
        .map_err(EngineError::EscrowFailed)?;

    let id = ledger.next_auction_id();
    let record = AuctionRecord {
        id,
        kind: AuctionKind::ExpRDutch,
        asset_kind: req.asset_kind,
        auctioneer,
        item_asset: req.asset_id,
        item_id_or_amount: req.id_or_amount,
        pay_asset: req.pay_asset,
        schedule: Schedule::Dutch(DutchSchedule {
            start_price,
            min_price,
            start_ts: now,
            deadline: now + duration,
            duration,
            decay_factor: Some(decay_factor),
            settle_price: min_price,
        }),
        state: AuctionState::Open,
        winner: auctioneer,
        available_funds: 0,
        is_claimed: false,
        fee_bps_snapshot: params.fee_bps,
    };
    ledger.insert_auction(record);

    Ok((
        id,
        Event::AuctionCreated {
            auction_id: id,
            kind: AuctionKind::ExpRDutch,
            auctioneer,
            pay_asset: req.pay_asset,
        },
    ))
}

pub async fn bid(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    params: ProtocolParameters,
    auction_id: AuctionId,
    bidder: PrincipalId,
) -> EngineResult<Event> {
    ledger
        .apply_transition(gateway, auction_id, &[], |record, _book| {
            if record.kind != AuctionKind::ExpRDutch {
                return Err(EngineError::KindMismatch);
            }
            if record.is_claimed {
                return Err(EngineError::AlreadyClaimed);
            }
            let schedule = record
                .schedule
                .as_dutch_mut()
                .ok_or(EngineError::Internal("exp-dutch record without dutch schedule"))?;
            if now >= schedule.deadline {
                return Err(EngineError::DeadlineReached);
            }

            let price = price_at(schedule, now);
            schedule.settle_price = price;

            record.winner = bidder;
            record.is_claimed = true;
            record.state = AuctionState::Settled;

            let treasury_cut = price * params.fee_bps as u128 / crate::FEE_DENOMINATOR;
            let auctioneer_cut = price - treasury_cut;
            record.available_funds = 0;

            let effects = vec![
                Effect::Take(AssetMove {
                    kind: AssetMoveKind::Fungible,
                    asset: record.pay_asset,
                    principal: bidder,
                    id_or_amount: price,
                }),
                Effect::Release(AssetMove {
                    kind: record.asset_kind,
                    asset: record.item_asset,
                    principal: bidder,
                    id_or_amount: record.item_id_or_amount,
                }),
                Effect::Release(AssetMove {
                    kind: AssetMoveKind::Fungible,
                    asset: record.pay_asset,
                    principal: record.auctioneer,
                    id_or_amount: auctioneer_cut,
                }),
                Effect::Release(AssetMove {
                    kind: AssetMoveKind::Fungible,
                    asset: record.pay_asset,
                    principal: params.treasury,
                    id_or_amount: treasury_cut,
                }),
            ];
            let event = Event::BidPlaced {
                auction_id,
                bidder,
                amount: price,
                new_deadline: schedule.deadline,
            };
            Ok((effects, event))
        })
        .await
}

/// Returns the item to the auctioneer after the deadline if no bid
/// arrived, mirroring the linear variant's claim path.
pub async fn claim(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    auction_id: AuctionId,
) -> EngineResult<Event> {
    ledger
        .apply_transition(gateway, auction_id, &[], |record, _book| {
            if record.kind != AuctionKind::ExpRDutch {
                return Err(EngineError::KindMismatch);
            }
            let deadline = record
                .schedule
                .as_dutch()
                .ok_or(EngineError::Internal("exp-dutch record without dutch schedule"))?
                .deadline;
            if now < deadline {
                return Err(EngineError::BeforePhase);
            }
            if record.is_claimed {
                return Err(EngineError::AlreadyClaimed);
            }

            record.is_claimed = true;
            record.state = AuctionState::Cancelled;

            let effect = Effect::Release(AssetMove {
                kind: record.asset_kind,
                asset: record.item_asset,
                principal: record.auctioneer,
                id_or_amount: record.item_id_or_amount,
            });
            let event = Event::Claimed {
                auction_id,
                winner: record.auctioneer,
            };
            Ok((vec![effect], event))
        })
        .await
}

pub async fn cancel(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    auction_id: AuctionId,
    caller: PrincipalId,
) -> EngineResult<Event> {
    ledger
        .apply_transition(gateway, auction_id, &[], |record, _book| {
            if record.kind != AuctionKind::ExpRDutch {
                return Err(EngineError::KindMismatch);
            }
            if caller != record.auctioneer {
                return Err(EngineError::NotAuctioneer);
            }
            let deadline = record
                .schedule
                .as_dutch()
                .ok_or(EngineError::Internal("exp-dutch record without dutch schedule"))?
                .deadline;
            if now >= deadline {
                return Err(EngineError::DeadlineReached);
            }
            if record.is_claimed {
                return Err(EngineError::HasBids);
            }

            record.is_claimed = true;
            record.state = AuctionState::Cancelled;

            let effect = Effect::Release(AssetMove {
                kind: record.asset_kind,
                asset: record.item_asset,
                principal: record.auctioneer,
                id_or_amount: record.item_id_or_amount,
            });
            Ok((vec![effect], Event::AuctionCancelled { auction_id }))
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_curve_matches_checkpoints() {
        // start=10, min=1, decay_factor=20000 (0.2), duration=100s.
        let schedule = DutchSchedule {
            start_price: 10,
            min_price: 1,
            start_ts: 0,
            deadline: 100,
            duration: 100,
            decay_factor: Some(20_000),
            settle_price: 1,
        };
        assert_eq!(price_at(&schedule, 0), 10);
        assert!((3..=4).contains(&price_at(&schedule, 10)));
        assert!((1..=2).contains(&price_at(&schedule, 20)));
        assert!((1..=2).contains(&price_at(&schedule, 30)));
        assert_eq!(price_at(&schedule, 100), 1);
    }
}
