//! Metrics export functionality.

use super::metrics::MetricsSnapshot;
use crate::error::{Error, Result};

/// Trait for exporting metrics to different formats.
pub trait MetricsExporter: Send + Sync {
    /// Export a metrics snapshot.
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()>;
}

/// Export metrics to a JSON file.
#[derive(Debug)]
pub struct JsonExporter {
    output_path: std::path::PathBuf,
}

impl JsonExporter {
    pub fn new(output_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let serializable = SerializableSnapshot::from(snapshot);
        let json = serde_json::to_string_pretty(&serializable)
            .map_err(|e| Error::telemetry(format!("JSON serialization failed: {}", e)))?;

        std::fs::write(&self.output_path, json)?;
        Ok(())
    }
}

/// Serializable view of a snapshot, with durations flattened to plain units.
#[derive(Debug, Clone, serde::Serialize)]
struct SerializableSnapshot {
    uptime_secs: f64,
    tasks_submitted: u64,
    tasks_completed: u64,
    tasks_panicked: u64,
    tasks_detached: u64,
    waits_timed_out: u64,
    workers_spawned: u64,
    avg_latency_us: f64,
    p50_latency_us: f64,
    p95_latency_us: f64,
    p99_latency_us: f64,
    max_latency_us: f64,
    tasks_per_second: f64,
}

impl From<&MetricsSnapshot> for SerializableSnapshot {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            uptime_secs: snapshot.uptime.as_secs_f64(),
            tasks_submitted: snapshot.tasks_submitted,
            tasks_completed: snapshot.tasks_completed,
            tasks_panicked: snapshot.tasks_panicked,
            tasks_detached: snapshot.tasks_detached,
            waits_timed_out: snapshot.waits_timed_out,
            workers_spawned: snapshot.workers_spawned,
            avg_latency_us: snapshot.avg_latency_ns as f64 / 1000.0,
            p50_latency_us: snapshot.p50_latency_ns as f64 / 1000.0,
            p95_latency_us: snapshot.p95_latency_ns as f64 / 1000.0,
            p99_latency_us: snapshot.p99_latency_ns as f64 / 1000.0,
            max_latency_us: snapshot.max_latency_ns as f64 / 1000.0,
            tasks_per_second: snapshot.tasks_per_second(),
        }
    }
}
