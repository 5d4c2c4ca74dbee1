//! Storage ports for the settlement core.
//!
//! These traits are the seam between the pure engine/policy layer and the
//! persistence backends in `marketpay-infra`. The contracts below are load
//! bearing: the engine's correctness (no lost updates, no double-applied
//! idempotency keys, no ledger/balance divergence) depends on every
//! implementation honoring them.

use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;

use marketpay_core::{CompanyId, OrderId, Page, UserId, WalletId};
use marketpay_orders::Order;
use marketpay_parties::MembershipState;
use marketpay_wallet::{LedgerEntry, TxType, Wallet, WalletOwner};

/// A validated balance movement ready to commit.
///
/// Built by the transfer engine after request validation; the store turns it
/// into exactly one `Completed` ledger entry plus the implied balance
/// mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub from: Option<WalletOwner>,
    pub to: Option<WalletOwner>,
    pub amount_cents: i64,
    pub tx_type: TxType,
    pub idempotency_key: Option<String>,
    pub ref_id: Option<String>,
    pub metadata: JsonValue,
}

/// A state change that must land in the same atomic unit as the transfer.
///
/// Order completion and membership extension are only valid together with
/// their payment: no observer may see the money moved but the coupled state
/// unchanged, or vice versa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoupledEffect {
    /// Flip the order to `Completed` alongside the `OrderPayment` entry.
    CompleteOrder(OrderId),
    /// Renew the company's membership alongside the `PayMembership` entry.
    ExtendMembership { company_id: CompanyId, plan: String },
}

/// Result of a successful atomic commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedTransfer {
    pub entry: LedgerEntry,
    /// Post-commit snapshot of the debited wallet, if the plan had a source.
    pub from_wallet: Option<Wallet>,
    /// Post-commit snapshot of the credited wallet, if the plan had a destination.
    pub to_wallet: Option<Wallet>,
}

/// Storage-layer failure.
///
/// `Conflict` is the only transient variant; the engine retries it a bounded
/// number of times. Everything else is terminal for the attempt, and the
/// store guarantees the operation left no partial mutation behind.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A `Completed` entry with this idempotency key already exists. The
    /// caller lost a concurrent race and should replay the winner's entry.
    #[error("idempotency key already used by a completed entry: {0}")]
    DuplicateIdempotencyKey(String),

    /// The planned debit exceeds the source wallet's balance.
    #[error("insufficient funds: balance {balance_cents}, requested {requested_cents}")]
    InsufficientFunds {
        balance_cents: i64,
        requested_cents: i64,
    },

    /// A referenced record (order, wallet) does not exist.
    #[error("referenced record not found: {0}")]
    NotFound(String),

    /// Transient contention (lock conflict, serialization failure); safe to
    /// retry the whole commit.
    #[error("transient conflict: {0}")]
    Conflict(String),

    /// Non-retryable storage failure; the operation rolled back.
    #[error("storage error: {0}")]
    Internal(String),
}

/// Wallet balances + append-only transaction ledger.
///
/// ## Atomicity
///
/// `commit_transfer` is the single mutation primitive and must execute as
/// one indivisible unit covering: the completed-key uniqueness check, the
/// debit (with sufficiency check), the credit, the ledger append, and the
/// coupled effect. Two concurrent commits touching the same wallet must not
/// interleave their balance read and write.
///
/// ## Idempotency keys
///
/// Uniqueness among `Completed` entries is enforced *inside* the commit's
/// critical section (a storage-level constraint), never as a separate
/// check-then-insert step — otherwise two concurrent retries of the same
/// logical operation could both pass the check and double-apply.
///
/// ## Wallet creation
///
/// `get_or_create_wallet` converges concurrent creators for one owner
/// identity onto a single row (uniqueness constraint + retry, or
/// single-writer serialization). Wallets are never deleted.
pub trait LedgerStore: Send + Sync {
    /// Return the wallet for `owner`, creating a zero-balance one if absent.
    fn get_or_create_wallet(&self, owner: WalletOwner) -> Result<Wallet, StoreError>;

    /// Look up a wallet by id.
    fn get_wallet(&self, wallet_id: WalletId) -> Result<Option<Wallet>, StoreError>;

    /// Find the `Completed` ledger entry recorded under `key`, if any.
    fn find_by_idempotency_key(&self, key: &str) -> Result<Option<LedgerEntry>, StoreError>;

    /// Atomically apply `plan` (and `effect`, if any) and append exactly one
    /// `Completed` ledger entry. See the trait-level contract.
    fn commit_transfer(
        &self,
        plan: TransferPlan,
        effect: Option<CoupledEffect>,
    ) -> Result<CommittedTransfer, StoreError>;

    /// One page of the wallet's ledger history, newest first.
    fn list_by_wallet(
        &self,
        wallet_id: WalletId,
        page: usize,
        size: usize,
    ) -> Result<Page<LedgerEntry>, StoreError>;

    /// Current membership state of a company, if one has ever been recorded.
    fn membership(&self, company_id: CompanyId) -> Result<Option<MembershipState>, StoreError>;
}

/// Order persistence.
///
/// `update_order` covers the confirm/cancel transitions; the
/// `Pending|InProgress → Completed` transition never goes through it — that
/// one is applied by `commit_transfer` via `CoupledEffect::CompleteOrder` so
/// payment and status flip commit together.
pub trait OrderStore: Send + Sync {
    fn insert_order(&self, order: Order) -> Result<(), StoreError>;

    fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Persist a non-completion state change of an existing order.
    fn update_order(&self, order: &Order) -> Result<(), StoreError>;
}

/// Employment-relation lookup (external collaborator).
///
/// The relation itself is written by the out-of-scope invitation and
/// application workflows; payroll only asks whether it exists.
pub trait EmploymentDirectory: Send + Sync {
    fn is_employed(&self, company_id: CompanyId, driver_user_id: UserId)
        -> Result<bool, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn get_or_create_wallet(&self, owner: WalletOwner) -> Result<Wallet, StoreError> {
        (**self).get_or_create_wallet(owner)
    }

    fn get_wallet(&self, wallet_id: WalletId) -> Result<Option<Wallet>, StoreError> {
        (**self).get_wallet(wallet_id)
    }

    fn find_by_idempotency_key(&self, key: &str) -> Result<Option<LedgerEntry>, StoreError> {
        (**self).find_by_idempotency_key(key)
    }

    fn commit_transfer(
        &self,
        plan: TransferPlan,
        effect: Option<CoupledEffect>,
    ) -> Result<CommittedTransfer, StoreError> {
        (**self).commit_transfer(plan, effect)
    }

    fn list_by_wallet(
        &self,
        wallet_id: WalletId,
        page: usize,
        size: usize,
    ) -> Result<Page<LedgerEntry>, StoreError> {
        (**self).list_by_wallet(wallet_id, page, size)
    }

    fn membership(&self, company_id: CompanyId) -> Result<Option<MembershipState>, StoreError> {
        (**self).membership(company_id)
    }
}

impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn insert_order(&self, order: Order) -> Result<(), StoreError> {
        (**self).insert_order(order)
    }

    fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).get_order(order_id)
    }

    fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        (**self).update_order(order)
    }
}

impl<D> EmploymentDirectory for Arc<D>
where
    D: EmploymentDirectory + ?Sized,
{
    fn is_employed(
        &self,
        company_id: CompanyId,
        driver_user_id: UserId,
    ) -> Result<bool, StoreError> {
        (**self).is_employed(company_id, driver_user_id)
    }
}
