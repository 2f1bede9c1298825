//! Observability: metrics definitions and helpers

pub mod metrics;
