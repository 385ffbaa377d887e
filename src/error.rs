//! Exhaustive error taxonomy for the auction engine.
//!
//! One consolidated `thiserror::Error` enum covers every way an engine
//! operation can be rejected, so callers match on a single type instead
//! of threading per-engine error kinds through the dispatcher.

use thiserror::Error;

/// Every error the engine can return. Validation errors never mutate state;
/// `EscrowFailed` rolls back state already computed before the failing
/// gateway call; `Internal` must be unreachable in a correct implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("no auction exists with the given id")]
    UnknownAuction,

    #[error("operation is not supported for this auction kind")]
    KindMismatch,

    #[error("the auction deadline has already passed")]
    DeadlineReached,

    #[error("operation attempted before its phase window opened")]
    BeforePhase,

    #[error("bid is below the required minimum")]
    BidTooLow,

    #[error("first bid did not meet the starting price")]
    FirstBidBelowStart,

    #[error("amount must be strictly positive")]
    AmountNonPositive,

    #[error("caller is not the auctioneer")]
    NotAuctioneer,

    #[error("caller is not the winner")]
    NotWinner,

    #[error("the item has already been claimed")]
    AlreadyClaimed,

    #[error("this principal has already committed a bid")]
    AlreadyCommitted,

    #[error("this principal has not committed a bid")]
    NotCommitted,

    #[error("revealed bid does not match the stored commitment")]
    InvalidReveal,

    #[error("commit fee does not match the required amount")]
    CommitFeeMismatch,

    #[error("auction already has bids")]
    HasBids,

    #[error("auction already has commitments")]
    CommitmentsExist,

    #[error("asset gateway rejected the requested transfer: {0}")]
    EscrowFailed(String),

    #[error("internal invariant violated: {0}")]
    Internal(&'static str),
}

pub type EngineResult<T> = Result<T, EngineError>;
