//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Domain-level error for the settlement core.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, state conflicts). Infrastructure concerns belong elsewhere;
/// `Internal` is the catch-all a store failure is reported through after the
/// operation has been fully rolled back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A monetary amount was non-positive.
    #[error("invalid amount: {0} cents")]
    InvalidAmount(i64),

    /// A debit exceeded the wallet balance. No partial debit ever occurs.
    #[error("insufficient funds: balance {balance_cents}, requested {requested_cents}")]
    InsufficientFunds {
        balance_cents: i64,
        requested_cents: i64,
    },

    /// An order transition was not permitted from the current state.
    ///
    /// The message distinguishes already-completed, already-cancelled and
    /// wrong-precondition cases.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Payroll to a driver without an active employment relation.
    #[error("driver {driver} is not employed by company {company}")]
    NotEmployed { company: String, driver: String },

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A storage/transaction failure after retries were exhausted.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn not_employed(company: impl ToString, driver: impl ToString) -> Self {
        Self::NotEmployed {
            company: company.to_string(),
            driver: driver.to_string(),
        }
    }
}
