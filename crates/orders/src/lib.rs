//! `marketpay-orders` — the order aggregate and its lifecycle state machine.

pub mod order;

pub use order::{CompletionDecision, Order, OrderStatus};
