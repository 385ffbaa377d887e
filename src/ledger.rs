//! Auction table and per-bidder accounting, with the effect-list
//! reentrancy discipline.
//!
//! An engine transition receives a `&mut AuctionRecord` and a
//! [`BidderBook`] scoped to one auction, computes state deltas and an
//! [`Effect`] list *synchronously* (no `.await` is reachable while those
//! borrows are live), and returns. Only after the borrows are dropped does
//! [`LedgerState::apply_transition`] execute the effects against the
//! [`AssetGateway`]. A failing effect rolls the in-memory mutation back
//! from a snapshot taken before the transition ran.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::capabilities::{AssetGateway, AssetMove, AssetMoveKind, AuctionId, PrincipalId};
use crate::error::{EngineError, EngineResult};
use crate::schedule::{AuctionKind, AuctionState, Schedule};

/// One escrow intent computed during a transition, executed after the
/// mutable borrow of the record is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Take(AssetMove),
    Release(AssetMove),
}

/// One auction session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionRecord {
    pub id: AuctionId,
    pub kind: AuctionKind,
    pub asset_kind: AssetMoveKind,
    pub auctioneer: PrincipalId,
    pub item_asset: u64,
    pub item_id_or_amount: u128,
    pub pay_asset: u64,
    pub schedule: Schedule,
    pub state: AuctionState,
    pub winner: PrincipalId,
    pub available_funds: u128,
    pub is_claimed: bool,
    pub fee_bps_snapshot: u32,
}

/// Per-auction view over the sparse bidder maps (`bids[·]`,
/// `commitments[·]`), so engine code reads `book.bid(principal)` instead of
/// threading `(auction_id, principal)` tuples everywhere.
pub struct BidderBook<'a> {
    auction_id: AuctionId,
    bids: &'a mut HashMap<(AuctionId, PrincipalId), u128>,
    commitments: &'a mut HashMap<(AuctionId, PrincipalId), [u8; 32]>,
}

impl<'a> BidderBook<'a> {
    pub fn bid(&self, principal: PrincipalId) -> u128 {
        *self.bids.get(&(self.auction_id, principal)).unwrap_or(&0)
    }

    pub fn set_bid(&mut self, principal: PrincipalId, amount: u128) {
        self.bids.insert((self.auction_id, principal), amount);
    }

    pub fn zero_bid(&mut self, principal: PrincipalId) {
        self.bids.remove(&(self.auction_id, principal));
    }

    pub fn commitment(&self, principal: PrincipalId) -> Option<[u8; 32]> {
        self.commitments.get(&(self.auction_id, principal)).copied()
    }

    pub fn has_commitment(&self, principal: PrincipalId) -> bool {
        self.commitments.contains_key(&(self.auction_id, principal))
    }

    pub fn set_commitment(&mut self, principal: PrincipalId, hash: [u8; 32]) {
        self.commitments.insert((self.auction_id, principal), hash);
    }

    pub fn any_commitments(&self) -> bool {
        self.commitments.keys().any(|(id, _)| *id == self.auction_id)
    }
}

/// Owns the auction table and bidder accounting maps.
#[derive(Default)]
pub struct LedgerState {
    auctions: HashMap<AuctionId, AuctionRecord>,
    bids: HashMap<(AuctionId, PrincipalId), u128>,
    commitments: HashMap<(AuctionId, PrincipalId), [u8; 32]>,
    next_id: AuctionId,
}

/// Snapshot of everything a transition might touch, taken before the
/// transition runs so a failed effect can be rolled back exactly.
struct Snapshot {
    record: AuctionRecord,
    bids: Vec<((AuctionId, PrincipalId), Option<u128>)>,
    commitments: Vec<((AuctionId, PrincipalId), Option<[u8; 32]>)>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_auction(&mut self, record: AuctionRecord) -> AuctionId {
        let id = record.id;
        self.auctions.insert(id, record);
        id
    }

    pub fn next_auction_id(&mut self) -> AuctionId {
        self.next_id += 1;
        self.next_id
    }

    /// Seeds a bidder-book entry outside of a transition. Used only at
    /// Vickrey `Create` to record the auctioneer's `min_bid` as the initial
    /// sentinel "current winner's bid" — there is no asset movement to
    /// perform, so this bypasses [`Self::apply_transition`] entirely.
    pub fn seed_bid(&mut self, id: AuctionId, principal: PrincipalId, amount: u128) {
        self.bids.insert((id, principal), amount);
    }

    pub fn get(&self, id: AuctionId) -> EngineResult<&AuctionRecord> {
        self.auctions.get(&id).ok_or(EngineError::UnknownAuction)
    }

    pub fn bid_of(&self, id: AuctionId, principal: PrincipalId) -> u128 {
        *self.bids.get(&(id, principal)).unwrap_or(&0)
    }

    fn snapshot(&self, id: AuctionId, touched: &[PrincipalId]) -> EngineResult<Snapshot> {
        let record = self.get(id)?.clone();
        let bids = touched
            .iter()
            .map(|p| {
                let key = (id, *p);
                (key, self.bids.get(&key).copied())
            })
            .collect();
        let commitments = touched
            .iter()
            .map(|p| {
                let key = (id, *p);
                (key, self.commitments.get(&key).copied())
            })
            .collect();
        Ok(Snapshot {
            record,
            bids,
            commitments,
        })
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let id = snapshot.record.id;
        self.auctions.insert(id, snapshot.record);
        for (key, value) in snapshot.bids {
            match value {
                Some(v) => {
                    self.bids.insert(key, v);
                }
                None => {
                    self.bids.remove(&key);
                }
            }
        }
        for (key, value) in snapshot.commitments {
            match value {
                Some(v) => {
                    self.commitments.insert(key, v);
                }
                None => {
                    self.commitments.remove(&key);
                }
            }
        }
    }

    /// Runs `transition` against the record and bidder book for `id`,
    /// then executes the effects it returns against `gateway`. On success
    /// returns whatever `transition` returned. On an escrow failure, the
    /// in-memory state is rolled back to exactly what it was before
    /// `transition` ran and [`EngineError::EscrowFailed`] is returned.
    ///
    /// `touched` must list every principal whose `bids`/`commitments`
    /// entries `transition` may read or write, so they can be
    /// snapshotted — callers pass the bidder(s) involved in the request
    /// plus the previous winner/leader where relevant.
    pub async fn apply_transition<T, F>(
        &mut self,
        gateway: &dyn AssetGateway,
        id: AuctionId,
        touched: &[PrincipalId],
        transition: F,
    ) -> EngineResult<T>
    where
        F: FnOnce(&mut AuctionRecord, &mut BidderBook<'_>) -> EngineResult<(Vec<Effect>, T)>,
    {
        let snapshot = self.snapshot(id, touched)?;

        let record = self
            .auctions
            .get_mut(&id)
            .ok_or(EngineError::UnknownAuction)?;
        let mut book = BidderBook {
            auction_id: id,
            bids: &mut self.bids,
            commitments: &mut self.commitments,
        };

        let (effects, out) = match transition(record, &mut book) {
            Ok(pair) => pair,
            Err(e) => {
                // Validation failure: restore defensively in case the
                // closure partially mutated before erroring, then
                // propagate without ever touching the gateway.
                self.restore(snapshot);
                warn!(auction_id = id, error = %e, "transition rejected");
                return Err(e);
            }
        };

        for effect in &effects {
            let result = match effect {
                Effect::Take(mv) => gateway.escrow_take(mv).await,
                Effect::Release(mv) => gateway.escrow_release(mv).await,
            };
            if let Err(msg) = result {
                warn!(auction_id = id, error = %msg, "escrow effect failed, rolling back");
                self.restore(snapshot);
                return Err(EngineError::EscrowFailed(msg));
            }
        }

        debug!(auction_id = id, effects = effects.len(), "transition applied");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::AssetMoveKind;
    use async_trait::async_trait;

    struct AlwaysFailGateway;

    #[async_trait]
    impl AssetGateway for AlwaysFailGateway {
        async fn escrow_take(&self, _mv: &AssetMove) -> Result<(), String> {
            Err("no funds".into())
        }
        async fn escrow_release(&self, _mv: &AssetMove) -> Result<(), String> {
            Ok(())
        }
    }

    struct AlwaysOkGateway;

    #[async_trait]
    impl AssetGateway for AlwaysOkGateway {
        async fn escrow_take(&self, _mv: &AssetMove) -> Result<(), String> {
            Ok(())
        }
        async fn escrow_release(&self, _mv: &AssetMove) -> Result<(), String> {
            Ok(())
        }
    }

    fn sample_record(id: AuctionId) -> AuctionRecord {
        AuctionRecord {
            id,
            kind: AuctionKind::English,
            asset_kind: AssetMoveKind::Unique,
            auctioneer: 1,
            item_asset: 10,
            item_id_or_amount: 1,
            pay_asset: 20,
            schedule: Schedule::Ascending(crate::schedule::AscendingSchedule {
                starting_bid: 100,
                min_bid_delta: 10,
                deadline: 1_000,
                deadline_extension: 10,
                highest_bid: 0,
            }),
            state: AuctionState::Open,
            winner: 1,
            available_funds: 0,
            is_claimed: false,
            fee_bps_snapshot: 100,
        }
    }

    #[tokio::test]
    async fn failed_effect_rolls_back_state() {
        let mut ledger = LedgerState::new();
        let id = ledger.insert_auction(sample_record(1));
        let gateway = AlwaysFailGateway;

        let result = ledger
            .apply_transition(&gateway, id, &[2], |record, book| {
                record.winner = 2;
                book.set_bid(2, 500);
                let mv = AssetMove {
                    kind: AssetMoveKind::Fungible,
                    asset: record.pay_asset,
                    principal: 2,
                    id_or_amount: 500,
                };
                Ok((vec![Effect::Take(mv)], ()))
            })
            .await;

        assert!(matches!(result, Err(EngineError::EscrowFailed(_))));
        let record = ledger.get(id).unwrap();
        assert_eq!(record.winner, 1);
        assert_eq!(ledger.bid_of(id, 2), 0);
    }

    #[tokio::test]
    async fn successful_effect_commits_state() {
        let mut ledger = LedgerState::new();
        let id = ledger.insert_auction(sample_record(1));
        let gateway = AlwaysOkGateway;

        ledger
            .apply_transition(&gateway, id, &[2], |record, book| {
                record.winner = 2;
                book.set_bid(2, 500);
                Ok((vec![], ()))
            })
            .await
            .unwrap();

        assert_eq!(ledger.get(id).unwrap().winner, 2);
        assert_eq!(ledger.bid_of(id, 2), 500);
    }
}
