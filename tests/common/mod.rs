//! Shared fakes for the integration suite.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use auction_engine::capabilities::{
    AssetGateway, AssetId, AssetMove, AssetMoveKind, Auth, Clock, ParameterSource, PrincipalId,
    ProtocolParameters,
};

/// An in-memory escrow: fungible balances per `(asset, principal)`, unique
/// ownership per `(asset, item id)`. `escrow_take` debits/asserts
/// ownership; `escrow_release` credits/reassigns it. Returns `Err` on
/// insufficient balance or non-ownership so tests can exercise
/// `EscrowFailed` and the resulting rollback.
pub struct FakeGateway {
    balances: Mutex<HashMap<(AssetId, PrincipalId), u128>>,
    owners: Mutex<HashMap<(AssetId, u128), PrincipalId>>,
    fail_next_take: Mutex<bool>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            owners: Mutex::new(HashMap::new()),
            fail_next_take: Mutex::new(false),
        }
    }

    pub fn seed_balance(&self, asset: AssetId, principal: PrincipalId, amount: u128) {
        *self.balances.lock().unwrap().entry((asset, principal)).or_insert(0) += amount;
    }

    pub fn seed_owner(&self, asset: AssetId, item_id: u128, owner: PrincipalId) {
        self.owners.lock().unwrap().insert((asset, item_id), owner);
    }

    pub fn balance_of(&self, asset: AssetId, principal: PrincipalId) -> u128 {
        *self.balances.lock().unwrap().get(&(asset, principal)).unwrap_or(&0)
    }

    pub fn owner_of(&self, asset: AssetId, item_id: u128) -> Option<PrincipalId> {
        self.owners.lock().unwrap().get(&(asset, item_id)).copied()
    }

    /// Arranges for the next `escrow_take` call to fail, to probe the
    /// ledger's rollback-on-`EscrowFailed` path.
    pub fn arm_take_failure(&self) {
        *self.fail_next_take.lock().unwrap() = true;
    }
}

#[async_trait]
impl AssetGateway for FakeGateway {
    async fn escrow_take(&self, mv: &AssetMove) -> Result<(), String> {
        if std::mem::take(&mut *self.fail_next_take.lock().unwrap()) {
            return Err("armed failure".to_string());
        }
        match mv.kind {
            AssetMoveKind::Fungible => {
                let mut balances = self.balances.lock().unwrap();
                let entry = balances.entry((mv.asset, mv.principal)).or_insert(0);
                if *entry < mv.id_or_amount {
                    return Err(format!(
                        "insufficient balance: have {}, need {}",
                        entry, mv.id_or_amount
                    ));
                }
                *entry -= mv.id_or_amount;
                Ok(())
            }
            AssetMoveKind::Unique => {
                let mut owners = self.owners.lock().unwrap();
                match owners.get(&(mv.asset, mv.id_or_amount)) {
                    Some(owner) if *owner == mv.principal => {
                        owners.remove(&(mv.asset, mv.id_or_amount));
                        Ok(())
                    }
                    Some(_) => Err("not the owner".to_string()),
                    None => Err("no such item".to_string()),
                }
            }
        }
    }

    async fn escrow_release(&self, mv: &AssetMove) -> Result<(), String> {
        match mv.kind {
            AssetMoveKind::Fungible => {
                *self.balances.lock().unwrap().entry((mv.asset, mv.principal)).or_insert(0) += mv.id_or_amount;
                Ok(())
            }
            AssetMoveKind::Unique => {
                self.owners.lock().unwrap().insert((mv.asset, mv.id_or_amount), mv.principal);
                Ok(())
            }
        }
    }
}

/// A clock callers advance explicitly; never wall-clock (tests must be
/// deterministic).
pub struct FakeClock {
    now: Mutex<i64>,
}

impl FakeClock {
    pub fn new(start: i64) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: i64) {
        *self.now.lock().unwrap() += by;
    }

    pub fn set(&self, to: i64) {
        *self.now.lock().unwrap() = to;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> i64 {
        *self.now.lock().unwrap()
    }
}

/// Accepts every principal in a fixed allow-list, or everyone if empty.
pub struct FakeAuth {
    known: HashSet<PrincipalId>,
}

impl FakeAuth {
    pub fn allow_all() -> Self {
        Self { known: HashSet::new() }
    }
}

impl Auth for FakeAuth {
    fn is_known(&self, caller: PrincipalId) -> bool {
        self.known.is_empty() || self.known.contains(&caller)
    }
}

pub struct FakeParameters {
    params: ProtocolParameters,
}

impl FakeParameters {
    pub fn new(fee_bps: u32, treasury: PrincipalId) -> Self {
        Self {
            params: ProtocolParameters { fee_bps, treasury },
        }
    }
}

impl ParameterSource for FakeParameters {
    fn current(&self) -> ProtocolParameters {
        self.params
    }
}

pub const TREASURY: PrincipalId = 999;
pub const AUCTIONEER: PrincipalId = 1;
pub const ITEM_ASSET: AssetId = 10;
pub const PAY_ASSET: AssetId = 20;
pub const ITEM_ID: u128 = 7;

// The dispatcher owns its capabilities by value; tests need to keep
// inspecting the fakes afterwards, so every fake is driven through an
// `Arc` and these blanket impls let `Arc<Fake*>` satisfy the capability
// traits directly.

#[async_trait]
impl AssetGateway for Arc<FakeGateway> {
    async fn escrow_take(&self, mv: &AssetMove) -> Result<(), String> {
        (**self).escrow_take(mv).await
    }
    async fn escrow_release(&self, mv: &AssetMove) -> Result<(), String> {
        (**self).escrow_release(mv).await
    }
}

impl Clock for Arc<FakeClock> {
    fn now(&self) -> i64 {
        (**self).now()
    }
}

impl Auth for Arc<FakeAuth> {
    fn is_known(&self, caller: PrincipalId) -> bool {
        (**self).is_known(caller)
    }
}

impl ParameterSource for Arc<FakeParameters> {
    fn current(&self) -> ProtocolParameters {
        (**self).current()
    }
}

/// A fresh `Dispatcher` wired to fresh `Arc`-backed fakes, plus the
/// `Arc<FakeGateway>` and `Arc<FakeClock>` handles tests use to seed
/// balances and advance time after construction.
pub fn harness(
    fee_bps: u32,
) -> (
    auction_engine::Dispatcher<Arc<FakeGateway>, Arc<FakeClock>, Arc<FakeAuth>, Arc<FakeParameters>>,
    Arc<FakeGateway>,
    Arc<FakeClock>,
) {
    let gateway = Arc::new(FakeGateway::new());
    let clock = Arc::new(FakeClock::new(0));
    let auth = Arc::new(FakeAuth::allow_all());
    let parameters = Arc::new(FakeParameters::new(fee_bps, TREASURY));

    let dispatcher = auction_engine::Dispatcher::new(gateway.clone(), clock.clone(), auth, parameters);
    (dispatcher, gateway, clock)
}
