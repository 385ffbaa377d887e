//! Per-kind auction parameters and lifecycle state.
//!
//! One tagged `Schedule` enum carries the parameter/state payload for
//! each of the five auction protocols this engine hosts. Kept as one
//! data module separate from engine logic.

use serde::{Deserialize, Serialize};

/// The five supported auction protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionKind {
    English,
    AllPay,
    Vickrey,
    LinearRDutch,
    ExpRDutch,
}

/// Auction lifecycle state. `SealedReveal` is a unit variant since the
/// only sealed phase this engine tracks is reveal — the commit phase is
/// simply `Open`, giving a two-phase Vickrey state machine of
/// `Open(commit) -> Open(reveal)/SealedReveal -> Settled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionState {
    Open,
    SealedReveal,
    Settled,
    Cancelled,
}

/// Ascending-bid schedule shared by English and all-pay auctions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AscendingSchedule {
    pub starting_bid: u128,
    pub min_bid_delta: u128,
    pub deadline: i64,
    pub deadline_extension: i64,
    pub highest_bid: u128,
}

/// Commit-reveal schedule for Vickrey auctions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VickreySchedule {
    pub min_bid: u128,
    pub commit_end: i64,
    pub reveal_end: i64,
    pub commit_fee: u128,
    /// Current second-highest revealed amount; the price the winner pays.
    pub winning_bid: u128,
    pub accumulated_commit_fee: u128,
}

/// Decaying-price schedule shared by linear and exponential reverse-Dutch
/// auctions. `decay_factor` is only meaningful for the exponential variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutchSchedule {
    pub start_price: u128,
    pub min_price: u128,
    pub start_ts: i64,
    pub deadline: i64,
    pub duration: i64,
    /// 5-decimal fixed-point decay rate (`DECAY_SCALE = 1e5`); `None` for
    /// the linear variant.
    pub decay_factor: Option<u64>,
    pub settle_price: u128,
}

/// Tagged union of the per-kind schedule payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    Ascending(AscendingSchedule),
    Vickrey(VickreySchedule),
    Dutch(DutchSchedule),
}

impl Schedule {
    pub fn as_ascending(&self) -> Option<&AscendingSchedule> {
        match self {
            Schedule::Ascending(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_ascending_mut(&mut self) -> Option<&mut AscendingSchedule> {
        match self {
            Schedule::Ascending(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_vickrey(&self) -> Option<&VickreySchedule> {
        match self {
            Schedule::Vickrey(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_vickrey_mut(&mut self) -> Option<&mut VickreySchedule> {
        match self {
            Schedule::Vickrey(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_dutch(&self) -> Option<&DutchSchedule> {
        match self {
            Schedule::Dutch(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_dutch_mut(&mut self) -> Option<&mut DutchSchedule> {
        match self {
            Schedule::Dutch(s) => Some(s),
            _ => None,
        }
    }
}
