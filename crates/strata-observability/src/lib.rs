//! Logging initialization and build-time metrics for Strata.
//!
//! This crate is deliberately small: it does not model distributed traces
//! or cross-service spans, since the artifact builder and retrieval
//! pipeline run as a single process. It covers the two ambient concerns
//! every run still needs:
//! - `init_tracing` to wire up `tracing-subscriber` once at startup
//! - `BuildMetrics` to accumulate simple counters over a build

pub mod metrics;
pub mod tracing_init;

pub use metrics::BuildMetrics;
pub use tracing_init::init_tracing;
