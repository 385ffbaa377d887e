//! External collaborators: custody, identity, time, and protocol
//! parameters are all consumed through capability traits rather than
//! owned by the engine. Treats time and asset movement as
//! externally-supplied primitives — made explicit and swappable here so
//! tests can inject deterministic fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque principal identifier supplied by the Auth layer.
pub type PrincipalId = u64;

/// Opaque fungible/unique asset identifier.
pub type AssetId = u64;

/// Monotonically assigned auction identifier.
pub type AuctionId = u64;

/// Whether an asset movement concerns a unique item or a fungible balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetMoveKind {
    Unique,
    Fungible,
}

/// A single asset movement the engine has decided on but not yet executed.
/// `id_or_amount` is a unique token id for `Unique` moves and a quantity for
/// `Fungible` moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMove {
    pub kind: AssetMoveKind,
    pub asset: AssetId,
    pub principal: PrincipalId,
    pub id_or_amount: u128,
}

/// Custody capability. How the gateway actually moves value is out of
/// scope here — the engine only ever calls `escrow_take` / `escrow_release`
/// and treats failure as "the transition never happened".
#[async_trait]
pub trait AssetGateway: Send + Sync {
    /// Pull an asset from `from` into escrow. Must be idempotent-safe to
    /// call only once per logical transfer; the engine never retries a
    /// failed take.
    async fn escrow_take(&self, mv: &AssetMove) -> Result<(), String>;

    /// Release an escrowed asset to `to`.
    async fn escrow_release(&self, mv: &AssetMove) -> Result<(), String>;
}

/// Monotonic time capability. Never wall-clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Identity resolution capability. Kept minimal: the engine only needs
/// to compare opaque principal ids, never to resolve them to anything
/// richer, so `Auth` exists mainly as a seam for future expansion and for
/// documentation of where identity comes from.
pub trait Auth: Send + Sync {
    /// Returns true if `caller` is a principal known to the system.
    fn is_known(&self, caller: PrincipalId) -> bool;
}

/// Protocol-parameter snapshot, `{fee_bps, treasury}`, consumed read-only.
/// Snapshotted into the auction record at `Create` time so later parameter
/// changes never rewrite history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    pub fee_bps: u32,
    pub treasury: PrincipalId,
}

/// Read-only parameter source capability.
pub trait ParameterSource: Send + Sync {
    fn current(&self) -> ProtocolParameters;
}
