//! Observability for pool behavior.
//!
//! Provides counter and latency metrics plus snapshot export.

pub mod export;
pub mod metrics;

pub use export::{JsonExporter, MetricsExporter};
pub use metrics::{Metrics, MetricsSnapshot};
