//! The atomic transfer primitive.
//!
//! This module implements the full transfer pipeline on top of a
//! [`LedgerStore`]:
//!
//! ```text
//! TransferRequest
//!   ↓
//! 1. Replay check (idempotency key → recorded entry, no re-apply)
//!   ↓
//! 2. Validate (positive amount, at least one endpoint)
//!   ↓
//! 3. Commit atomically (debit + credit + ledger append + coupled effect)
//!      - bounded retry on transient conflicts
//!      - a lost duplicate-key race resolves to a replay of the winner
//!   ↓
//! 4. TransferReceipt (entry + post-operation balances)
//! ```
//!
//! ## Failure semantics
//!
//! Validation failures (`InvalidAmount`, `InsufficientFunds`) are returned
//! to the caller with no mutation. Transient store conflicts are retried up
//! to [`COMMIT_RETRY_ATTEMPTS`] times; exhaustion surfaces as
//! `LedgerError::Internal` with the whole operation rolled back. A retried
//! operation re-enters the replay check, so a commit that landed before a
//! crash is never applied twice.

use marketpay_core::{LedgerError, LedgerResult};
use marketpay_wallet::{LedgerEntry, TransferRequest};

use crate::store::{CommittedTransfer, CoupledEffect, LedgerStore, StoreError, TransferPlan};

/// Bounded retry budget for transient commit conflicts.
pub const COMMIT_RETRY_ATTEMPTS: usize = 3;

/// Outcome of a transfer: the ledger entry plus the post-operation balances
/// of the involved wallets.
///
/// On `replayed = true` the entry is the originally-recorded one and the
/// balances are the wallets' *current* values — no balance change was
/// applied by this call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub entry: LedgerEntry,
    pub from_balance: Option<i64>,
    pub to_balance: Option<i64>,
    pub replayed: bool,
}

/// The transfer engine. Generic over the storage backend; all concurrency
/// and atomicity guarantees are delegated to the store's commit contract.
#[derive(Debug)]
pub struct TransferEngine<S> {
    store: S,
}

impl<S> TransferEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: LedgerStore> TransferEngine<S> {
    /// Execute a transfer with exactly-once financial effect.
    pub fn execute(&self, request: TransferRequest) -> LedgerResult<TransferReceipt> {
        self.execute_with_effect(request, None)
    }

    /// Execute a transfer whose commit carries a coupled state change
    /// (order completion, membership extension).
    ///
    /// Crate-internal: external callers go through the settlement policies
    /// or the order lifecycle, which decide the effect.
    pub(crate) fn execute_with_effect(
        &self,
        request: TransferRequest,
        effect: Option<CoupledEffect>,
    ) -> LedgerResult<TransferReceipt> {
        // Step 1: idempotent replay. A completed entry under this key means
        // the operation already happened; return its result untouched.
        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(entry) = self
                .store
                .find_by_idempotency_key(key)
                .map_err(map_store_error)?
            {
                tracing::debug!(key, tx = %entry.id, "idempotent replay");
                return self.replay(entry);
            }
        }

        // Step 2: deterministic validation, before any mutation.
        request.validate()?;

        let plan = TransferPlan {
            from: request.from,
            to: request.to,
            amount_cents: request.amount_cents,
            tx_type: request.tx_type,
            idempotency_key: request.idempotency_key,
            ref_id: request.ref_id,
            metadata: request.metadata,
        };

        // Steps 3-5: one atomic commit, retried on transient contention.
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.commit_transfer(plan.clone(), effect.clone()) {
                Ok(committed) => return Ok(self.receipt(committed)),
                Err(StoreError::DuplicateIdempotencyKey(key)) => {
                    // Lost a concurrent race on the same key: the winner's
                    // entry is the recorded result of this logical operation.
                    let entry = self
                        .store
                        .find_by_idempotency_key(&key)
                        .map_err(map_store_error)?
                        .ok_or_else(|| {
                            LedgerError::internal(format!(
                                "duplicate idempotency key {key} reported but no entry found"
                            ))
                        })?;
                    return self.replay(entry);
                }
                Err(StoreError::InsufficientFunds {
                    balance_cents,
                    requested_cents,
                }) => {
                    return Err(LedgerError::InsufficientFunds {
                        balance_cents,
                        requested_cents,
                    });
                }
                Err(StoreError::Conflict(msg)) if attempt < COMMIT_RETRY_ATTEMPTS => {
                    tracing::debug!(attempt, %msg, "commit conflict, retrying");
                }
                Err(err) => return Err(map_store_error(err)),
            }
        }
    }

    fn receipt(&self, committed: CommittedTransfer) -> TransferReceipt {
        let entry = &committed.entry;
        tracing::info!(
            tx = %entry.id,
            tx_type = %entry.tx_type,
            amount_cents = entry.amount_cents,
            "transfer committed"
        );

        if let Some(wallet) = committed.from_wallet.as_ref() {
            if wallet.is_below_threshold() {
                tracing::warn!(
                    wallet = %wallet.id,
                    owner = %wallet.owner,
                    balance_cents = wallet.balance_cents,
                    threshold_cents = wallet.low_balance_threshold,
                    "wallet balance below threshold"
                );
            }
        }

        TransferReceipt {
            from_balance: committed.from_wallet.map(|w| w.balance_cents),
            to_balance: committed.to_wallet.map(|w| w.balance_cents),
            entry: committed.entry,
            replayed: false,
        }
    }

    /// Build a replay receipt: the recorded entry plus the involved wallets'
    /// current balances.
    fn replay(&self, entry: LedgerEntry) -> LedgerResult<TransferReceipt> {
        let from_balance = match entry.from_wallet_id {
            Some(id) => self
                .store
                .get_wallet(id)
                .map_err(map_store_error)?
                .map(|w| w.balance_cents),
            None => None,
        };
        let to_balance = match entry.to_wallet_id {
            Some(id) => self
                .store
                .get_wallet(id)
                .map_err(map_store_error)?
                .map(|w| w.balance_cents),
            None => None,
        };

        Ok(TransferReceipt {
            entry,
            from_balance,
            to_balance,
            replayed: true,
        })
    }
}

/// Map terminal store failures into the domain error taxonomy.
///
/// `InsufficientFunds` and `DuplicateIdempotencyKey` are handled where they
/// occur; whatever reaches this function is either a missing reference or a
/// storage fault after rollback.
pub(crate) fn map_store_error(err: StoreError) -> LedgerError {
    match err {
        StoreError::NotFound(_) => LedgerError::NotFound,
        StoreError::InsufficientFunds {
            balance_cents,
            requested_cents,
        } => LedgerError::InsufficientFunds {
            balance_cents,
            requested_cents,
        },
        StoreError::DuplicateIdempotencyKey(key) => {
            LedgerError::internal(format!("unhandled duplicate idempotency key: {key}"))
        }
        StoreError::Conflict(msg) => {
            LedgerError::internal(format!("conflict retries exhausted: {msg}"))
        }
        StoreError::Internal(msg) => LedgerError::internal(msg),
    }
}
