//! Transfer request validation and idempotency-key derivation.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use marketpay_core::{CompanyId, LedgerError, LedgerResult, OrderId, UserId};

use crate::entry::TxType;
use crate::wallet::WalletOwner;

/// A requested balance movement, before any storage interaction.
///
/// `from = None` is a pure topup, `to = None` a pure withdrawal; at least
/// one side must be present. Validation here is deterministic and free of
/// IO; balance sufficiency is only decidable inside the store's atomic
/// commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: Option<WalletOwner>,
    pub to: Option<WalletOwner>,
    pub amount_cents: i64,
    pub tx_type: TxType,
    pub idempotency_key: Option<String>,
    pub ref_id: Option<String>,
    pub metadata: JsonValue,
}

impl TransferRequest {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.amount_cents <= 0 {
            return Err(LedgerError::InvalidAmount(self.amount_cents));
        }
        if self.from.is_none() && self.to.is_none() {
            return Err(LedgerError::invalid_state(
                "transfer must reference at least one wallet",
            ));
        }
        if self.from.is_some() && self.from == self.to {
            return Err(LedgerError::invalid_state(
                "transfer source and destination are the same wallet",
            ));
        }
        Ok(())
    }
}

/// Deterministic idempotency key for an order-completion charge.
///
/// Retried completions of the same order always carry the same key, so the
/// rider is charged at most once per order.
pub fn order_completion_key(order_id: OrderId) -> String {
    format!("complete-order-{order_id}")
}

/// Default idempotency key for a payroll run.
///
/// Derived from `(company, driver, period, amount)` so two submissions of
/// the same period's salary deduplicate even when the caller supplies no
/// explicit key.
pub fn salary_period_key(
    company_id: CompanyId,
    driver_user_id: UserId,
    period: &str,
    amount_cents: i64,
) -> String {
    format!("salary-{company_id}-{driver_user_id}-{period}-{amount_cents}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(from: Option<WalletOwner>, to: Option<WalletOwner>, amount: i64) -> TransferRequest {
        TransferRequest {
            from,
            to,
            amount_cents: amount,
            tx_type: TxType::Topup,
            idempotency_key: None,
            ref_id: None,
            metadata: json!({}),
        }
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let to = Some(WalletOwner::Rider(UserId::new()));
        assert_eq!(
            request(None, to, 0).validate(),
            Err(LedgerError::InvalidAmount(0))
        );
        assert_eq!(
            request(None, to, -5).validate(),
            Err(LedgerError::InvalidAmount(-5))
        );
        assert!(request(None, to, 1).validate().is_ok());
    }

    #[test]
    fn endpointless_transfer_is_rejected() {
        let err = request(None, None, 100).validate().unwrap_err();
        match err {
            LedgerError::InvalidState(msg) => {
                assert!(msg.contains("at least one wallet"))
            }
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn self_transfer_is_rejected() {
        let owner = Some(WalletOwner::Company(CompanyId::new()));
        let err = request(owner, owner, 100).validate().unwrap_err();
        match err {
            LedgerError::InvalidState(msg) => assert!(msg.contains("same wallet")),
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn order_completion_key_is_deterministic() {
        let order = OrderId::new();
        assert_eq!(order_completion_key(order), order_completion_key(order));
        assert_eq!(
            order_completion_key(order),
            format!("complete-order-{order}")
        );
        assert_ne!(order_completion_key(order), order_completion_key(OrderId::new()));
    }

    #[test]
    fn salary_key_covers_all_inputs() {
        let company = CompanyId::new();
        let driver = UserId::new();

        let key = salary_period_key(company, driver, "2025-08", 150_000);
        assert_eq!(key, salary_period_key(company, driver, "2025-08", 150_000));
        // Any differing component yields a different key.
        assert_ne!(key, salary_period_key(company, driver, "2025-09", 150_000));
        assert_ne!(key, salary_period_key(company, driver, "2025-08", 150_001));
        assert_ne!(key, salary_period_key(CompanyId::new(), driver, "2025-08", 150_000));
    }
}
