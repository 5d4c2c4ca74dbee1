//! The append-only transaction ledger entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use marketpay_core::{Entity, TxId, WalletId};

/// Operation kind recorded on a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Topup,
    Withdraw,
    PaySalary,
    PayMembership,
    OrderPayment,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Topup => "topup",
            TxType::Withdraw => "withdraw",
            TxType::PaySalary => "pay_salary",
            TxType::PayMembership => "pay_membership",
            TxType::OrderPayment => "order_payment",
        }
    }
}

impl core::fmt::Display for TxType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded on a ledger entry.
///
/// The shipped stores only ever append `Completed` entries: validation
/// failures append nothing and commit failures roll back. `Failed` exists
/// for externally-observable captures (e.g. a future gateway integration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Completed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Completed => "completed",
            TxStatus::Failed => "failed",
        }
    }
}

/// One immutable record of a balance-affecting event.
///
/// At least one of `from_wallet_id` / `to_wallet_id` is set: a pure topup
/// has no source, a pure withdrawal no destination, a transfer both.
/// Entries are never mutated or deleted after creation, and a present
/// `idempotency_key` is unique among `Completed` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: TxId,
    pub from_wallet_id: Option<WalletId>,
    pub to_wallet_id: Option<WalletId>,
    pub amount_cents: i64,
    pub status: TxStatus,
    pub tx_type: TxType,
    pub idempotency_key: Option<String>,
    /// Correlates the entry to an order, driver or company.
    pub ref_id: Option<String>,
    /// Opaque structured payload (period, plan, ... depending on `tx_type`).
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn involves(&self, wallet_id: WalletId) -> bool {
        self.from_wallet_id == Some(wallet_id) || self.to_wallet_id == Some(wallet_id)
    }

    /// Signed effect of this entry on `wallet_id` (0 if uninvolved).
    pub fn delta_for(&self, wallet_id: WalletId) -> i64 {
        let mut delta = 0;
        if self.from_wallet_id == Some(wallet_id) {
            delta -= self.amount_cents;
        }
        if self.to_wallet_id == Some(wallet_id) {
            delta += self.amount_cents;
        }
        delta
    }
}

impl Entity for LedgerEntry {
    type Id = TxId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
