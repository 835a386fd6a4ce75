//! Metrics collection for pool monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use hdrhistogram::Histogram;
use parking_lot::RwLock;

/// Pool metrics collector. Counters are updated by submission, worker, and
/// wait paths; all reads go through [`snapshot`](Metrics::snapshot).
#[derive(Debug)]
pub struct Metrics {
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_panicked: AtomicU64,
    tasks_detached: AtomicU64,
    waits_timed_out: AtomicU64,
    workers_spawned: AtomicU64,

    // Execution latency histogram (RwLock for interior mutability)
    latency_histogram: RwLock<Histogram<u64>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        // 3 significant figures, values up to one hour in nanoseconds
        let histogram =
            Histogram::new_with_max(3_600_000_000_000, 3).expect("failed to create histogram");

        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            tasks_detached: AtomicU64::new(0),
            waits_timed_out: AtomicU64::new(0),
            workers_spawned: AtomicU64::new(0),
            latency_histogram: RwLock::new(histogram),
            start_time: Instant::now(),
        }
    }

    /// Record an admitted task.
    pub fn record_task_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed execution with its duration.
    pub fn record_task_execution(&self, duration_ns: u64) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);

        if let Some(mut hist) = self.latency_histogram.try_write() {
            let _ = hist.record(duration_ns);
        }
    }

    /// Record a task whose closure panicked.
    pub fn record_task_panic(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a detach request.
    pub fn record_task_detached(&self) {
        self.tasks_detached.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a timed join that gave up before completion.
    pub fn record_wait_timed_out(&self) {
        self.waits_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lazily spawned worker.
    pub fn record_worker_spawned(&self) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let histogram = self.latency_histogram.read();

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            tasks_detached: self.tasks_detached.load(Ordering::Relaxed),
            waits_timed_out: self.waits_timed_out.load(Ordering::Relaxed),
            workers_spawned: self.workers_spawned.load(Ordering::Relaxed),
            avg_latency_ns: if histogram.len() > 0 {
                histogram.mean() as u64
            } else {
                0
            },
            p50_latency_ns: histogram.value_at_quantile(0.50),
            p95_latency_ns: histogram.value_at_quantile(0.95),
            p99_latency_ns: histogram.value_at_quantile(0.99),
            max_latency_ns: histogram.max(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        self.tasks_submitted.store(0, Ordering::Relaxed);
        self.tasks_completed.store(0, Ordering::Relaxed);
        self.tasks_panicked.store(0, Ordering::Relaxed);
        self.tasks_detached.store(0, Ordering::Relaxed);
        self.waits_timed_out.store(0, Ordering::Relaxed);
        self.workers_spawned.store(0, Ordering::Relaxed);

        if let Some(mut hist) = self.latency_histogram.try_write() {
            hist.reset();
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub uptime: std::time::Duration,
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_panicked: u64,
    pub tasks_detached: u64,
    pub waits_timed_out: u64,
    pub workers_spawned: u64,
    pub avg_latency_ns: u64,
    pub p50_latency_ns: u64,
    pub p95_latency_ns: u64,
    pub p99_latency_ns: u64,
    pub max_latency_ns: u64,
}

impl MetricsSnapshot {
    /// Tasks completed per second of pool uptime.
    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.tasks_completed as f64 / seconds
    }

    /// Admitted tasks whose outcome has not been published yet.
    pub fn tasks_outstanding(&self) -> u64 {
        self.tasks_submitted.saturating_sub(self.tasks_completed)
    }
}
