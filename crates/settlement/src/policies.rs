//! Named settlement policies: thin, validated wrappers around the transfer
//! engine.
//!
//! Each policy fixes the transfer shape for one operation (who pays whom,
//! which `TxType`, what goes into `ref_id`/`metadata`) and adds its own
//! domain validation. The calling layer passes every identity explicitly —
//! nothing here inspects ambient "current user" state.

use serde_json::json;

use marketpay_core::{CompanyId, LedgerError, LedgerResult, Page, UserId, WalletId};
use marketpay_parties::MembershipState;
use marketpay_wallet::{salary_period_key, LedgerEntry, TransferRequest, TxType, Wallet, WalletOwner};

use crate::engine::{map_store_error, TransferEngine, TransferReceipt};
use crate::store::{CoupledEffect, EmploymentDirectory, LedgerStore};

/// Result of a membership payment: the transfer receipt plus the company's
/// membership state after the (atomically applied) extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipReceipt {
    pub receipt: TransferReceipt,
    pub membership: MembershipState,
}

/// The settlement facade exposed to the surrounding API/controller layer.
pub struct SettlementService<S, D> {
    engine: TransferEngine<S>,
    employment: D,
}

impl<S: LedgerStore, D: EmploymentDirectory> SettlementService<S, D> {
    pub fn new(store: S, employment: D) -> Self {
        Self {
            engine: TransferEngine::new(store),
            employment,
        }
    }

    pub fn engine(&self) -> &TransferEngine<S> {
        &self.engine
    }

    /// Execute an arbitrary validated transfer.
    ///
    /// The named policies below are the preferred entry points; this is the
    /// raw primitive for callers that build their own request.
    pub fn transfer(&self, request: TransferRequest) -> LedgerResult<TransferReceipt> {
        self.engine.execute(request)
    }

    /// Return the owner's wallet, creating it on first reference.
    pub fn get_or_create_wallet(&self, owner: WalletOwner) -> LedgerResult<Wallet> {
        self.engine
            .store()
            .get_or_create_wallet(owner)
            .map_err(map_store_error)
    }

    /// Wallet history, newest first.
    pub fn list_transactions(
        &self,
        wallet_id: WalletId,
        page: usize,
        size: usize,
    ) -> LedgerResult<Page<LedgerEntry>> {
        self.engine
            .store()
            .list_by_wallet(wallet_id, page, size)
            .map_err(map_store_error)
    }

    /// Credit `owner` from the outside world (mock payment in).
    pub fn topup(
        &self,
        owner: WalletOwner,
        amount_cents: i64,
        idempotency_key: Option<String>,
    ) -> LedgerResult<TransferReceipt> {
        self.engine.execute(TransferRequest {
            from: None,
            to: Some(owner),
            amount_cents,
            tx_type: TxType::Topup,
            idempotency_key,
            ref_id: None,
            metadata: json!({}),
        })
    }

    /// Debit `owner` to the outside world (mock payout).
    pub fn withdraw(
        &self,
        owner: WalletOwner,
        amount_cents: i64,
        idempotency_key: Option<String>,
    ) -> LedgerResult<TransferReceipt> {
        self.engine.execute(TransferRequest {
            from: Some(owner),
            to: None,
            amount_cents,
            tx_type: TxType::Withdraw,
            idempotency_key,
            ref_id: None,
            metadata: json!({}),
        })
    }

    /// Pay a driver's salary for `period` out of the company wallet.
    ///
    /// Requires an active employment relation. When the caller supplies no
    /// idempotency key, one is derived from `(company, driver, period,
    /// amount)`, so a payroll run submitted twice for the same period
    /// deduplicates on its own.
    pub fn pay_salary(
        &self,
        company_id: CompanyId,
        driver_user_id: UserId,
        amount_cents: i64,
        period: &str,
        idempotency_key: Option<String>,
    ) -> LedgerResult<TransferReceipt> {
        let employed = self
            .employment
            .is_employed(company_id, driver_user_id)
            .map_err(map_store_error)?;
        if !employed {
            return Err(LedgerError::not_employed(company_id, driver_user_id));
        }

        let key = idempotency_key
            .unwrap_or_else(|| salary_period_key(company_id, driver_user_id, period, amount_cents));

        self.engine.execute(TransferRequest {
            from: Some(WalletOwner::Company(company_id)),
            to: Some(WalletOwner::Driver(driver_user_id)),
            amount_cents,
            tx_type: TxType::PaySalary,
            idempotency_key: Some(key),
            ref_id: Some(driver_user_id.to_string()),
            metadata: json!({ "period": period }),
        })
    }

    /// Pay a membership fee into the platform-revenue wallet and extend the
    /// company's membership, as one atomic unit.
    pub fn pay_membership(
        &self,
        company_id: CompanyId,
        plan: &str,
        amount_cents: i64,
        idempotency_key: Option<String>,
    ) -> LedgerResult<MembershipReceipt> {
        let receipt = self.engine.execute_with_effect(
            TransferRequest {
                from: Some(WalletOwner::Company(company_id)),
                to: Some(WalletOwner::Platform),
                amount_cents,
                tx_type: TxType::PayMembership,
                idempotency_key,
                ref_id: Some(company_id.to_string()),
                metadata: json!({ "plan": plan }),
            },
            Some(CoupledEffect::ExtendMembership {
                company_id,
                plan: plan.to_string(),
            }),
        )?;

        // The extension was applied inside the commit (or, on replay, by the
        // original commit); read back the resulting state.
        let membership = self
            .engine
            .store()
            .membership(company_id)
            .map_err(map_store_error)?
            .ok_or_else(|| {
                LedgerError::internal("membership payment committed but no membership state found")
            })?;

        Ok(MembershipReceipt {
            receipt,
            membership,
        })
    }
}
