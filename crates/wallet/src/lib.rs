//! `marketpay-wallet` — wallet balances and the transaction ledger model.
//!
//! Pure domain types: the wallet balance holder, the append-only ledger
//! entry, and transfer request validation with the deterministic
//! idempotency-key derivation rules. All mutation goes through the transfer
//! engine in `marketpay-settlement`; nothing here performs IO.

pub mod entry;
pub mod transfer;
pub mod wallet;

pub use entry::{LedgerEntry, TxStatus, TxType};
pub use transfer::{order_completion_key, salary_period_key, TransferRequest};
pub use wallet::{OwnerKind, Wallet, WalletOwner, DEFAULT_LOW_BALANCE_THRESHOLD_CENTS};
