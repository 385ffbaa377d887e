//! Linear reverse-Dutch auction engine.
//!
//! The ask price decays linearly from `start_price` to `min_price`; the
//! first bidder to accept wins. Settlement runs through
//! [`crate::ledger::LedgerState::apply_transition`] and performs the
//! auctioneer/treasury fee split inline at bid time rather than as a
//! separate withdraw step — the first bid settles immediately, so there
//! is no balance left to withdraw afterwards.

use crate::capabilities::{
    AssetGateway, AssetMove, AssetMoveKind, AuctionId, PrincipalId, ProtocolParameters,
};
use crate::error::{EngineError, EngineResult};
use crate::ledger::{AuctionRecord, Effect, LedgerState};
use crate::request::{CreateParams, CreateRequest, Event};
use crate::schedule::{AuctionKind, AuctionState, DutchSchedule, Schedule};

/// `price(t)` for `t` strictly before `deadline`. Callers must not invoke
/// this at or past `deadline` — the price there is pinned to
/// `settle_price`, which defaults to `min_price` until a bid arrives.
fn price_at(schedule: &DutchSchedule, now: i64) -> u128 {
    let elapsed = (now - schedule.start_ts).max(0) as u128;
    let span = schedule.duration.max(1) as u128;
    let drop = schedule.start_price - schedule.min_price;
    schedule.start_price - drop * elapsed / span
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
        ..
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
        kind: AuctionKind::LinearRDutch,
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
            decay_factor: None,
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
            kind: AuctionKind::LinearRDutch,
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
            if record.kind != AuctionKind::LinearRDutch {
                return Err(EngineError::KindMismatch);
            }
            if record.is_claimed {
                return Err(EngineError::AlreadyClaimed);
            }
            let schedule = record
                .schedule
                .as_dutch_mut()
                .ok_or(EngineError::Internal("linear-dutch record without dutch schedule"))?;
            if now >= schedule.deadline {
                return Err(EngineError::DeadlineReached);
            }

            let price = price_at(schedule, now);
            schedule.settle_price = price;

            record.winner = bidder;
            record.available_funds = price;
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
/// arrived. Rejected once a bid has already settled the auction.
pub async fn claim(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    auction_id: AuctionId,
) -> EngineResult<Event> {
    ledger
        .apply_transition(gateway, auction_id, &[], |record, _book| {
            if record.kind != AuctionKind::LinearRDutch {
                return Err(EngineError::KindMismatch);
            }
            let deadline = record
                .schedule
                .as_dutch()
                .ok_or(EngineError::Internal("linear-dutch record without dutch schedule"))?
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
            if record.kind != AuctionKind::LinearRDutch {
                return Err(EngineError::KindMismatch);
            }
            if caller != record.auctioneer {
                return Err(EngineError::NotAuctioneer);
            }
            let deadline = record
                .schedule
                .as_dutch()
                .ok_or(EngineError::Internal("linear-dutch record without dutch schedule"))?
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
