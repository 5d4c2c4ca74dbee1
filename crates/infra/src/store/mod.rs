//! Storage backends implementing the `marketpay-settlement` ports.

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryEmploymentDirectory, InMemorySettlementStore};
pub use postgres::PostgresSettlementStore;
