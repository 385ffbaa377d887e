//! Sealed-bid second-price (Vickrey) auction engine.
//!
//! A two-phase commit/reveal state machine (see [`crate::commitment`] for
//! the hash encoding), routed through
//! [`crate::ledger::LedgerState::apply_transition`] like every other
//! engine here. `winning_bid` always holds the current second-highest
//! revealed amount — the price the eventual winner pays.

use crate::capabilities::{
    AssetGateway, AssetMove, AssetMoveKind, AuctionId, PrincipalId, ProtocolParameters,
};
use crate::commitment;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{AuctionRecord, Effect, LedgerState};
use crate::request::{CreateParams, CreateRequest, Event};
use crate::schedule::{AuctionKind, AuctionState, Schedule, VickreySchedule};

/// The minimum valid `reveal_duration`, in seconds.
pub const MIN_REVEAL_DURATION: i64 = 86_401;

pub async fn create(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    params: ProtocolParameters,
    auctioneer: PrincipalId,
    req: &CreateRequest,
) -> EngineResult<(AuctionId, Event)> {
    let CreateParams::Vickrey {
        min_bid,
        commit_duration,
        reveal_duration,
        commit_fee,
    } = req.params
    else {
        return Err(EngineError::KindMismatch);
    };

    if req.name.is_empty() || req.pay_asset == 0 {
        return Err(EngineError::AmountNonPositive);
    }
    if commit_duration <= 0 {
        return Err(EngineError::AmountNonPositive);
    }
    if reveal_duration < MIN_REVEAL_DURATION {
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

    let commit_end = now + commit_duration;
    let id = ledger.next_auction_id();
    let record = AuctionRecord {
        id,
        kind: AuctionKind::Vickrey,
        asset_kind: req.asset_kind,
        auctioneer,
        item_asset: req.asset_id,
        item_id_or_amount: req.id_or_amount,
        pay_asset: req.pay_asset,
        schedule: Schedule::Vickrey(VickreySchedule {
            min_bid,
            commit_end,
            reveal_end: commit_end + reveal_duration,
            commit_fee,
            winning_bid: min_bid,
            accumulated_commit_fee: 0,
        }),
        state: AuctionState::Open,
        winner: auctioneer,
        available_funds: 0,
        is_claimed: false,
        fee_bps_snapshot: params.fee_bps,
    };
    ledger.insert_auction(record);
    // Sentinel: the auctioneer is recorded as "holding" `min_bid` so the
    // first reveal's `prev_high = bids[current_winner]` resolves to
    // `min_bid` rather than zero, making a lone revealer win at `min_bid`.
    ledger.seed_bid(id, auctioneer, min_bid);

    Ok((
        id,
        Event::AuctionCreated {
            auction_id: id,
            kind: AuctionKind::Vickrey,
            auctioneer,
            pay_asset: req.pay_asset,
        },
    ))
}

/// No `Event` variant corresponds to a successful commit, so this returns
/// unit rather than manufacturing one.
pub async fn commit_bid(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    auction_id: AuctionId,
    bidder: PrincipalId,
    commitment_hash: [u8; 32],
    fee_amount: u128,
) -> EngineResult<()> {
    ledger
        .apply_transition(gateway, auction_id, &[bidder], |record, book| {
            if record.kind != AuctionKind::Vickrey {
                return Err(EngineError::KindMismatch);
            }
            let schedule = record
                .schedule
                .as_vickrey()
                .ok_or(EngineError::Internal("vickrey record without vickrey schedule"))?;

            if bidder == record.auctioneer {
                return Err(EngineError::NotAuctioneer);
            }
            if now >= schedule.commit_end {
                return Err(EngineError::DeadlineReached);
            }
            if book.has_commitment(bidder) {
                return Err(EngineError::AlreadyCommitted);
            }
            if fee_amount != schedule.commit_fee {
                return Err(EngineError::CommitFeeMismatch);
            }

            book.set_commitment(bidder, commitment_hash);
            let schedule = record.schedule.as_vickrey_mut().unwrap();
            schedule.accumulated_commit_fee += fee_amount;

            let effect = Effect::Take(AssetMove {
                kind: AssetMoveKind::Fungible,
                asset: record.pay_asset,
                principal: bidder,
                id_or_amount: fee_amount,
            });
            Ok((vec![effect], ()))
        })
        .await
}

pub async fn reveal_bid(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    auction_id: AuctionId,
    bidder: PrincipalId,
    amount: u128,
    salt: [u8; 32],
) -> EngineResult<Event> {
    let prev_winner = ledger.get(auction_id)?.winner;
    let touched = [bidder, prev_winner];

    ledger
        .apply_transition(gateway, auction_id, &touched, |record, book| {
            if record.kind != AuctionKind::Vickrey {
                return Err(EngineError::KindMismatch);
            }
            let commit_end = record
                .schedule
                .as_vickrey()
                .ok_or(EngineError::Internal("vickrey record without vickrey schedule"))?
                .commit_end;
            let reveal_end = record.schedule.as_vickrey().unwrap().reveal_end;

            if now < commit_end {
                return Err(EngineError::BeforePhase);
            }
            if now >= reveal_end {
                return Err(EngineError::DeadlineReached);
            }

            let stored = book.commitment(bidder).ok_or(EngineError::NotCommitted)?;
            if !commitment::verify(&stored, amount, &salt) {
                return Err(EngineError::InvalidReveal);
            }

            record.state = AuctionState::SealedReveal;

            let previous_winner = record.winner;
            let prev_high = book.bid(previous_winner);
            let winning_bid_so_far = record.schedule.as_vickrey().unwrap().winning_bid;

            let mut effects = vec![Effect::Take(AssetMove {
                kind: AssetMoveKind::Fungible,
                asset: record.pay_asset,
                principal: bidder,
                id_or_amount: amount,
            })];

            if amount > prev_high {
                // New highest: the full amount stays escrowed under the
                // bidder's name (settled to `winning_bid` at claim time),
                // and the previous leader's stake is released — they were
                // never a "winner" paying second price, just the prior top.
                if prev_high > 0 && previous_winner != bidder && previous_winner != record.auctioneer {
                    effects.push(Effect::Release(AssetMove {
                        kind: AssetMoveKind::Fungible,
                        asset: record.pay_asset,
                        principal: previous_winner,
                        id_or_amount: prev_high,
                    }));
                }
                book.zero_bid(previous_winner);
                book.set_bid(bidder, amount);
                record.winner = bidder;
                record.available_funds = prev_high;
                record.schedule.as_vickrey_mut().unwrap().winning_bid = prev_high;
            } else if prev_high >= amount && amount > winning_bid_so_far {
                // New second-highest: bidder is not the winner, full refund.
                effects.push(Effect::Release(AssetMove {
                    kind: AssetMoveKind::Fungible,
                    asset: record.pay_asset,
                    principal: bidder,
                    id_or_amount: amount,
                }));
                book.zero_bid(bidder);
                record.available_funds = amount;
                record.schedule.as_vickrey_mut().unwrap().winning_bid = amount;
            } else {
                // Neither top nor runner-up: full refund, no state change.
                effects.push(Effect::Release(AssetMove {
                    kind: AssetMoveKind::Fungible,
                    asset: record.pay_asset,
                    principal: bidder,
                    id_or_amount: amount,
                }));
                book.zero_bid(bidder);
            }

            finalize_reveal(record, bidder, &mut effects)?;

            let winning_bid = record.schedule.as_vickrey().unwrap().winning_bid;
            let event = Event::BidRevealed {
                auction_id,
                bidder,
                amount,
                winning_bid,
            };
            Ok((effects, event))
        })
        .await
}

/// Refunds `commit_fee` to `bidder` and decrements `accumulated_commit_fee`,
/// shared by every branch of [`reveal_bid`].
fn finalize_reveal(
    record: &mut AuctionRecord,
    bidder: PrincipalId,
    effects: &mut Vec<Effect>,
) -> EngineResult<()> {
    let schedule = record
        .schedule
        .as_vickrey_mut()
        .ok_or(EngineError::Internal("vickrey record without vickrey schedule"))?;
    let fee = schedule.commit_fee;
    schedule.accumulated_commit_fee = schedule.accumulated_commit_fee.saturating_sub(fee);
    effects.push(Effect::Release(AssetMove {
        kind: AssetMoveKind::Fungible,
        asset: record.pay_asset,
        principal: bidder,
        id_or_amount: fee,
    }));
    Ok(())
}

pub async fn claim(
    ledger: &mut LedgerState,
    gateway: &dyn AssetGateway,
    now: i64,
    auction_id: AuctionId,
) -> EngineResult<Event> {
    let winner = ledger.get(auction_id)?.winner;

    ledger
        .apply_transition(gateway, auction_id, &[winner], |record, book| {
            if record.kind != AuctionKind::Vickrey {
                return Err(EngineError::KindMismatch);
            }
            let reveal_end = record
                .schedule
                .as_vickrey()
                .ok_or(EngineError::Internal("vickrey record without vickrey schedule"))?
                .reveal_end;
            if now < reveal_end {
                return Err(EngineError::DeadlineReached);
            }
            if record.is_claimed {
                return Err(EngineError::AlreadyClaimed);
            }

            let winning_bid = record.schedule.as_vickrey().unwrap().winning_bid;
            let winner_paid = book.bid(record.winner);
            let overpayment = winner_paid.saturating_sub(winning_bid);

            record.is_claimed = true;
            record.state = AuctionState::Settled;

            let mut effects = vec![Effect::Release(AssetMove {
                kind: record.asset_kind,
                asset: record.item_asset,
                principal: record.winner,
                id_or_amount: record.item_id_or_amount,
            })];
            if overpayment > 0 {
                effects.push(Effect::Release(AssetMove {
                    kind: AssetMoveKind::Fungible,
                    asset: record.pay_asset,
                    principal: record.winner,
                    id_or_amount: overpayment,
                }));
            }

            let event = Event::Claimed {
                auction_id,
                winner: record.winner,
            };
            Ok((effects, event))
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
            if record.kind != AuctionKind::Vickrey {
                return Err(EngineError::KindMismatch);
            }
            let reveal_end = record
                .schedule
                .as_vickrey()
                .ok_or(EngineError::Internal("vickrey record without vickrey schedule"))?
                .reveal_end;
            if now < reveal_end {
                return Err(EngineError::DeadlineReached);
            }

            let gross = record.available_funds;
            record.available_funds = 0;
            let schedule = record.schedule.as_vickrey_mut().unwrap();
            let leftover_fees = schedule.accumulated_commit_fee;
            schedule.accumulated_commit_fee = 0;

            let treasury_cut = gross * params.fee_bps as u128 / crate::FEE_DENOMINATOR;
            let auctioneer_cut = gross - treasury_cut + leftover_fees;

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
        .apply_transition(gateway, auction_id, &[], |record, book| {
            if record.kind != AuctionKind::Vickrey {
                return Err(EngineError::KindMismatch);
            }
            if caller != record.auctioneer {
                return Err(EngineError::NotAuctioneer);
            }
            let reveal_end = record
                .schedule
                .as_vickrey()
                .ok_or(EngineError::Internal("vickrey record without vickrey schedule"))?
                .reveal_end;
            if now >= reveal_end {
                return Err(EngineError::DeadlineReached);
            }
            if book.any_commitments() {
                return Err(EngineError::CommitmentsExist);
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
