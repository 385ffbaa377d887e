//! Typed requests and events crossing the [`crate::dispatcher::Dispatcher`]
//! boundary. Field order in the `Event` variants is part of the wire
//! contract for external consumers and must not be reordered.

use serde::{Deserialize, Serialize};

use crate::capabilities::{AssetId, AssetMoveKind, AuctionId, PrincipalId};
use crate::schedule::AuctionKind;

/// Per-kind creation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreateParams {
    /// English and all-pay share the same ascending-bid schedule inputs.
    Ascending {
        starting_bid: u128,
        min_bid_delta: u128,
        duration: i64,
        deadline_extension: i64,
    },
    Vickrey {
        min_bid: u128,
        commit_duration: i64,
        reveal_duration: i64,
        commit_fee: u128,
    },
    /// Linear and exponential reverse-Dutch share the same price-curve
    /// inputs; `decay_factor` is required for `ExpRDutch` and ignored for
    /// `LinearRDutch`.
    Dutch {
        start_price: u128,
        min_price: u128,
        duration: i64,
        decay_factor: Option<u64>,
    },
}

/// `Create{kind, asset_kind, asset_id, id_or_amount, pay_asset, params}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub kind: AuctionKind,
    pub name: String,
    pub asset_kind: AssetMoveKind,
    pub asset_id: AssetId,
    pub id_or_amount: u128,
    pub pay_asset: AssetId,
    pub params: CreateParams,
}

/// Every request the dispatcher can route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Create(CreateRequest),
    /// `amount` is omitted for reverse-Dutch bids and required (`> 0`) for
    /// English/all-pay bids.
    Bid {
        auction_id: AuctionId,
        amount: Option<u128>,
    },
    CommitBid {
        auction_id: AuctionId,
        commitment: [u8; 32],
        fee_amount: u128,
    },
    RevealBid {
        auction_id: AuctionId,
        amount: u128,
        salt: [u8; 32],
    },
    Claim {
        auction_id: AuctionId,
    },
    Withdraw {
        auction_id: AuctionId,
    },
    Cancel {
        auction_id: AuctionId,
    },
}

/// Events emitted on success. Field order is fixed for external
/// consumers — do not reorder struct fields below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    AuctionCreated {
        auction_id: AuctionId,
        kind: AuctionKind,
        auctioneer: PrincipalId,
        pay_asset: AssetId,
    },
    BidPlaced {
        auction_id: AuctionId,
        bidder: PrincipalId,
        amount: u128,
        new_deadline: i64,
    },
    BidRevealed {
        auction_id: AuctionId,
        bidder: PrincipalId,
        amount: u128,
        winning_bid: u128,
    },
    Claimed {
        auction_id: AuctionId,
        winner: PrincipalId,
    },
    Withdrawn {
        auction_id: AuctionId,
        auctioneer_amount: u128,
        treasury_amount: u128,
    },
    AuctionCancelled {
        auction_id: AuctionId,
    },
}
