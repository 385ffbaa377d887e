//! Ascending-bid (English) auction engine.
//!
//! Every accepted bid refunds the previous leader in full and extends the
//! deadline by a fixed soft-close increment, routed through
//! [`crate::ledger::LedgerState::apply_transition`] so the refund and the
//! new leader's escrow take happen as one atomic transition.

use crate::capabilities::{
    AssetGateway, AssetMove, AssetMoveKind, AuctionId, PrincipalId, ProtocolParameters,
};
use crate::error::{EngineError, EngineResult};
use crate::ledger::{AuctionRecord, Effect, LedgerState};
use crate::request::{CreateParams, CreateRequest, Event};
use crate::schedule::{AscendingSchedule, AuctionKind, AuctionState, Schedule};

pub async fn create(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    params: ProtocolParameters,
    auctioneer: PrincipalId,
    req: &CreateRequest,
) -> EngineResult<(AuctionId, Event)> {
    let CreateParams::Ascending {
        starting_bid,
        min_bid_delta,
        duration,
        deadline_extension,
    } = req.params
    else {
        return Err(EngineError::KindMismatch);
    };

    if req.name.is_empty() || req.pay_asset == 0 || duration <= 0 {
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
        kind: AuctionKind::English,
        asset_kind: req.asset_kind,
        auctioneer,
        item_asset: req.asset_id,
        item_id_or_amount: req.id_or_amount,
        pay_asset: req.pay_asset,
        schedule: Schedule::Ascending(AscendingSchedule {
            starting_bid,
            min_bid_delta,
            deadline: now + duration,
            deadline_extension,
            highest_bid: 0,
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
            kind: AuctionKind::English,
            auctioneer,
            pay_asset: req.pay_asset,
        },
    ))
}

pub async fn bid(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    auction_id: AuctionId,
    bidder: PrincipalId,
    delta: u128,
) -> EngineResult<Event> {
    if delta == 0 {
        return Err(EngineError::AmountNonPositive);
    }

    let prev_winner = ledger.get(auction_id)?.winner;
    let touched = [bidder, prev_winner];

    ledger
        .apply_transition(gateway, auction_id, &touched, |record, book| {
            if record.kind != AuctionKind::English {
                return Err(EngineError::KindMismatch);
            }
            let schedule = record
                .schedule
                .as_ascending_mut()
                .ok_or(EngineError::Internal("english record without ascending schedule"))?;

            if record.state != AuctionState::Open || now >= schedule.deadline {
                return Err(EngineError::DeadlineReached);
            }

            let candidate = book.bid(bidder) + delta;
            if schedule.highest_bid == 0 {
                if candidate < schedule.starting_bid {
                    return Err(EngineError::FirstBidBelowStart);
                }
            } else if candidate < schedule.highest_bid + schedule.min_bid_delta {
                return Err(EngineError::BidTooLow);
            }

            let mut effects = vec![Effect::Take(AssetMove {
                kind: AssetMoveKind::Fungible,
                asset: record.pay_asset,
                principal: bidder,
                id_or_amount: delta,
            })];

            let auctioneer = record.auctioneer;
            if record.winner != auctioneer && record.winner != bidder {
                let prev_tally = book.bid(record.winner);
                if prev_tally > 0 {
                    effects.push(Effect::Release(AssetMove {
                        kind: AssetMoveKind::Fungible,
                        asset: record.pay_asset,
                        principal: record.winner,
                        id_or_amount: prev_tally,
                    }));
                }
                book.zero_bid(record.winner);
            }

            book.set_bid(bidder, candidate);
            schedule.highest_bid = candidate;
            record.winner = bidder;
            record.available_funds = candidate;
            schedule.deadline += schedule.deadline_extension;

            let event = Event::BidPlaced {
                auction_id,
                bidder,
                amount: candidate,
                new_deadline: schedule.deadline,
            };
            Ok((effects, event))
        })
        .await
}

pub async fn claim(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    auction_id: AuctionId,
) -> EngineResult<Event> {
    ledger
        .apply_transition(gateway, auction_id, &[], |record, _book| {
            if record.kind != AuctionKind::English {
                return Err(EngineError::KindMismatch);
            }
            let deadline = record
                .schedule
                .as_ascending()
                .ok_or(EngineError::Internal("english record without ascending schedule"))?
                .deadline;

            if now < deadline {
                return Err(EngineError::DeadlineReached);
            }
            if record.is_claimed {
                return Err(EngineError::AlreadyClaimed);
            }

            record.is_claimed = true;
            record.state = AuctionState::Settled;

            let effect = Effect::Release(AssetMove {
                kind: record.asset_kind,
                asset: record.item_asset,
                principal: record.winner,
                id_or_amount: record.item_id_or_amount,
            });
            let event = Event::Claimed {
                auction_id,
                winner: record.winner,
            };
            Ok((vec![effect], event))
        })
        .await
}

pub async fn withdraw(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    params: ProtocolParameters,
    auction_id: AuctionId,
) -> EngineResult<Event> {
    ledger
        .apply_transition(gateway, auction_id, &[], |record, _book| {
            if record.kind != AuctionKind::English {
                return Err(EngineError::KindMismatch);
            }
            let deadline = record
                .schedule
                .as_ascending()
                .ok_or(EngineError::Internal("english record without ascending schedule"))?
                .deadline;
            if now < deadline {
                return Err(EngineError::DeadlineReached);
            }

            let gross = record.available_funds;
            record.available_funds = 0;

            let treasury_cut = gross * params.fee_bps as u128 / crate::FEE_DENOMINATOR;
            let auctioneer_cut = gross - treasury_cut;

            let effects = vec![
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
            let event = Event::Withdrawn {
                auction_id,
                auctioneer_amount: auctioneer_cut,
                treasury_amount: treasury_cut,
            };
            Ok((effects, event))
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
            if record.kind != AuctionKind::English {
                return Err(EngineError::KindMismatch);
            }
            if caller != record.auctioneer {
                return Err(EngineError::NotAuctioneer);
            }
            let deadline = record
                .schedule
                .as_ascending()
                .ok_or(EngineError::Internal("english record without ascending schedule"))?
                .deadline;
            if now >= deadline {
                return Err(EngineError::DeadlineReached);
            }
            if record.winner != record.auctioneer {
                return Err(EngineError::HasBids);
            }

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
