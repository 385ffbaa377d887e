//! Request routing and capability wiring.
//!
//! A single [`Dispatcher`] owns a [`LedgerState`] and the four capability
//! traits for the duration of each call, and routes on
//! `(AuctionKind, Request)` to the engine matching the auction's own kind.

use crate::capabilities::{AssetGateway, Auth, AuctionId, Clock, ParameterSource, PrincipalId};
use crate::engines::{all_pay, english, exp_dutch, linear_dutch, vickrey};
use crate::error::{EngineError, EngineResult};
use crate::ledger::LedgerState;
use crate::request::{CreateRequest, Event, Request};
use crate::schedule::AuctionKind;

/// Owns the auction table and the capability collaborators it dispatches
/// requests through.
pub struct Dispatcher<G, C, A, P> {
    ledger: LedgerState,
    gateway: G,
    clock: C,
    auth: A,
    parameters: P,
}

impl<G, C, A, P> Dispatcher<G, C, A, P>
where
    G: AssetGateway,
    C: Clock,
    A: Auth,
    P: ParameterSource,
{
    pub fn new(gateway: G, clock: C, auth: A, parameters: P) -> Self {
        Self {
            ledger: LedgerState::new(),
            gateway,
            clock,
            auth,
            parameters,
        }
    }

    pub fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    /// Creates an auction of `req.kind`, returning its freshly assigned id.
    pub async fn create(&mut self, caller: PrincipalId, req: CreateRequest) -> EngineResult<(AuctionId, Event)> {
        if !self.auth.is_known(caller) {
            return Err(EngineError::NotAuctioneer);
        }
        let now = self.clock.now();
        let params = self.parameters.current();
        match req.kind {
            AuctionKind::English => english::create(&mut self.ledger, &self.gateway, now, params, caller, &req).await,
            AuctionKind::AllPay => all_pay::create(&mut self.ledger, &self.gateway, now, params, caller, &req).await,
            AuctionKind::Vickrey => vickrey::create(&mut self.ledger, &self.gateway, now, params, caller, &req).await,
            AuctionKind::LinearRDutch => {
                linear_dutch::create(&mut self.ledger, &self.gateway, now, params, caller, &req).await
            }
            AuctionKind::ExpRDutch => {
                exp_dutch::create(&mut self.ledger, &self.gateway, now, params, caller, &req).await
            }
        }
    }

    /// Routes every non-`Create` request to the engine matching the target
    /// auction's recorded kind. `KindMismatch` surfaces if a caller sends a
    /// request shape the auction's own kind cannot accept (e.g. `CommitBid`
    /// against an English auction).
    pub async fn dispatch(&mut self, caller: PrincipalId, req: Request) -> EngineResult<Option<Event>> {
        if !self.auth.is_known(caller) {
            return Err(EngineError::NotAuctioneer);
        }

        let now = self.clock.now();
        let params = self.parameters.current();

        match req {
            Request::Create(create_req) => {
                let (_, event) = self.create(caller, create_req).await?;
                Ok(Some(event))
            }
            Request::Bid { auction_id, amount } => {
                let kind = self.ledger.get(auction_id)?.kind;
                let event = match kind {
                    AuctionKind::English => {
                        let delta = amount.ok_or(EngineError::AmountNonPositive)?;
                        english::bid(&mut self.ledger, &self.gateway, now, auction_id, caller, delta).await?
                    }
                    AuctionKind::AllPay => {
                        let delta = amount.ok_or(EngineError::AmountNonPositive)?;
                        all_pay::bid(&mut self.ledger, &self.gateway, now, auction_id, caller, delta).await?
                    }
                    AuctionKind::LinearRDutch => {
                        linear_dutch::bid(&mut self.ledger, &self.gateway, now, params, auction_id, caller).await?
                    }
                    AuctionKind::ExpRDutch => {
                        exp_dutch::bid(&mut self.ledger, &self.gateway, now, params, auction_id, caller).await?
                    }
                    AuctionKind::Vickrey => return Err(EngineError::KindMismatch),
                };
                Ok(Some(event))
            }
            Request::CommitBid {
                auction_id,
                commitment,
                fee_amount,
            } => {
                let kind = self.ledger.get(auction_id)?.kind;
                if kind != AuctionKind::Vickrey {
                    return Err(EngineError::KindMismatch);
                }
                vickrey::commit_bid(&mut self.ledger, &self.gateway, now, auction_id, caller, commitment, fee_amount)
                    .await?;
                Ok(None)
            }
            Request::RevealBid {
                auction_id,
                amount,
                salt,
            } => {
                let kind = self.ledger.get(auction_id)?.kind;
                if kind != AuctionKind::Vickrey {
                    return Err(EngineError::KindMismatch);
                }
                let event =
                    vickrey::reveal_bid(&mut self.ledger, &self.gateway, now, auction_id, caller, amount, salt)
                        .await?;
                Ok(Some(event))
            }
            Request::Claim { auction_id } => {
                let kind = self.ledger.get(auction_id)?.kind;
                let event = match kind {
                    AuctionKind::English => english::claim(&mut self.ledger, &self.gateway, now, auction_id).await?,
                    AuctionKind::AllPay => all_pay::claim(&mut self.ledger, &self.gateway, now, auction_id).await?,
                    AuctionKind::Vickrey => vickrey::claim(&mut self.ledger, &self.gateway, now, auction_id).await?,
                    AuctionKind::LinearRDutch => {
                        linear_dutch::claim(&mut self.ledger, &self.gateway, now, auction_id).await?
                    }
                    AuctionKind::ExpRDutch => {
                        exp_dutch::claim(&mut self.ledger, &self.gateway, now, auction_id).await?
                    }
                };
                Ok(Some(event))
            }
            Request::Withdraw { auction_id } => {
                let kind = self.ledger.get(auction_id)?.kind;
                let event = match kind {
                    AuctionKind::English => {
                        english::withdraw(&mut self.ledger, &self.gateway, now, params, auction_id).await?
                    }
                    AuctionKind::AllPay => {
                        all_pay::withdraw(&mut self.ledger, &self.gateway, now, params, auction_id).await?
                    }
                    AuctionKind::Vickrey => {
                        vickrey::withdraw(&mut self.ledger, &self.gateway, now, params, auction_id).await?
                    }
                    AuctionKind::LinearRDutch | AuctionKind::ExpRDutch => {
                        // Reverse-Dutch auctions settle the fee split inline at
                        // `Bid` time; there is no separate balance to withdraw.
                        return Err(EngineError::KindMismatch);
                    }
                };
                Ok(Some(event))
            }
            Request::Cancel { auction_id } => {
                let kind = self.ledger.get(auction_id)?.kind;
                let event = match kind {
                    AuctionKind::English => {
                        english::cancel(&mut self.ledger, &self.gateway, now, auction_id, caller).await?
                    }
                    AuctionKind::AllPay => {
                        all_pay::cancel(&mut self.ledger, &self.gateway, now, auction_id, caller).await?
                    }
                    AuctionKind::Vickrey => {
                        vickrey::cancel(&mut self.ledger, &self.gateway, now, auction_id, caller).await?
                    }
                    AuctionKind::LinearRDutch => {
                        linear_dutch::cancel(&mut self.ledger, &self.gateway, now, auction_id, caller).await?
                    }
                    AuctionKind::ExpRDutch => {
                        exp_dutch::cancel(&mut self.ledger, &self.gateway, now, auction_id, caller).await?
                    }
                };
                Ok(Some(event))
            }
        }
    }
}
