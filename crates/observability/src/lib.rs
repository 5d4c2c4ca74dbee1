//! Observability: tracing/logging initialization.

pub mod tracing;

pub fn init() {
    tracing::init();
}
