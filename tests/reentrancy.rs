mod common;

use auction_engine::capabilities::AssetMoveKind;
use auction_engine::{AuctionKind, CreateParams, CreateRequest, Request};
use common::{harness, AUCTIONEER, ITEM_ASSET, ITEM_ID, PAY_ASSET};

const BIDDER: u64 = 2;

fn create_req() -> CreateRequest {
    CreateRequest {
        kind: AuctionKind::English,
        name: "widget".to_string(),
        asset_kind: AssetMoveKind::Unique,
        asset_id: ITEM_ASSET,
        id_or_amount: ITEM_ID,
        pay_asset: PAY_ASSET,
        params: CreateParams::Ascending {
            starting_bid: 100,
            min_bid_delta: 10,
            duration: 1_000,
            deadline_extension: 0,
        },
    }
}

// A genuinely concurrent callback from the asset gateway back into the
// same `LedgerState` is impossible to construct here without `unsafe`:
// `LedgerState::apply_transition` holds its record mutation and effect
// list behind one exclusive `&mut self` borrow for its whole lifetime,
// so the borrow checker rules out the aliasing a real reentrancy bug
// would need. What remains observable is the *idempotency* that design
// produces: a second `claim` issued once the first has already run sees
// the already-committed state and is rejected, and exactly one item
// transfer occurs no matter how many times `claim` is attempted.
#[tokio::test]
async fn repeated_claim_only_transfers_the_item_once() {
    let (mut dispatcher, gateway, clock) = harness(0);
    gateway.seed_owner(ITEM_ASSET, ITEM_ID, AUCTIONEER);
    gateway.seed_balance(PAY_ASSET, BIDDER, 1_000);

    let (auction_id, _) = dispatcher.create(AUCTIONEER, create_req()).await.unwrap();
    dispatcher
        .dispatch(
            BIDDER,
            Request::Bid {
                auction_id,
                amount: Some(100),
            },
        )
        .await
        .unwrap();

    clock.advance(2_000);
    dispatcher.dispatch(AUCTIONEER, Request::Claim { auction_id }).await.unwrap();
    assert_eq!(gateway.owner_of(ITEM_ASSET, ITEM_ID), Some(BIDDER));

    let second = dispatcher.dispatch(AUCTIONEER, Request::Claim { auction_id }).await;
    assert_eq!(second.unwrap_err(), auction_engine::EngineError::AlreadyClaimed);

    // The item is still owned by exactly the one winner — no double transfer.
    assert_eq!(gateway.owner_of(ITEM_ASSET, ITEM_ID), Some(BIDDER));
}

// A failing escrow effect mid-transition must roll the whole in-memory
// mutation back, not leave the auction half-updated.
#[tokio::test]
async fn failed_escrow_effect_rolls_back_the_whole_bid() {
    let (mut dispatcher, gateway, _clock) = harness(0);
    gateway.seed_owner(ITEM_ASSET, ITEM_ID, AUCTIONEER);
    // No balance seeded for BIDDER, so the Take effect will fail.

    let (auction_id, _) = dispatcher.create(AUCTIONEER, create_req()).await.unwrap();
    let err = dispatcher
        .dispatch(
            BIDDER,
            Request::Bid {
                auction_id,
                amount: Some(100),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, auction_engine::EngineError::EscrowFailed(_)));

    // A subsequent, funded bid at the original starting price still succeeds,
    // proving the rejected attempt left no trace (highest_bid was rolled back).
    gateway.seed_balance(PAY_ASSET, BIDDER, 1_000);
    dispatcher
        .dispatch(
            BIDDER,
            Request::Bid {
                auction_id,
                amount: Some(100),
            },
        )
        .await
        .unwrap();
}
