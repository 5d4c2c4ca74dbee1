//! `marketpay-settlement` — the transfer engine, settlement policies and
//! order lifecycle service.
//!
//! This crate is the write path of the marketplace ledger. It defines the
//! storage ports (`LedgerStore`, `OrderStore`, `EmploymentDirectory`), the
//! atomic transfer primitive with idempotent replay, the named settlement
//! policies (topup, withdraw, salary, membership), and the order lifecycle
//! whose completion transition is coupled to an `OrderPayment` transfer.
//!
//! No IO happens here; storage implementations live in `marketpay-infra`.

pub mod engine;
pub mod lifecycle;
pub mod policies;
pub mod store;

pub use engine::{TransferEngine, TransferReceipt};
pub use lifecycle::{OrderCompletion, OrderLifecycle};
pub use policies::{MembershipReceipt, SettlementService};
pub use store::{
    CommittedTransfer, CoupledEffect, EmploymentDirectory, LedgerStore, OrderStore, StoreError,
    TransferPlan,
};
