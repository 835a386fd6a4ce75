//! Tidepool - a bounded, lazily-growing worker thread pool.
//!
//! Tasks are submitted as closures wrapped in a [`Task`] handle. The pool
//! spawns workers only as load demands, up to a fixed ceiling, and tracks
//! every admitted task in a fixed-capacity slot table. Callers can observe
//! completion, retrieve results, wait with or without a timeout, detach
//! tasks to run fire-and-forget, and tear the pool down safely.
//!
//! # Quick Start
//!
//! ```
//! use tidepool::{Pool, Task};
//!
//! let mut pool = Pool::with_limits(4, 128).unwrap();
//!
//! // submit and join a task
//! let task = pool.spawn(|| 2 + 2).unwrap();
//! assert_eq!(task.join().unwrap(), 4);
//!
//! // or submit a standalone handle
//! let task = Task::new(|| "hello".to_string());
//! pool.submit(&task).unwrap();
//! assert_eq!(task.join().unwrap(), "hello");
//!
//! pool.shutdown().unwrap();
//! ```
//!
//! # Guarantees
//!
//! - **Bounded admission**: at most `max_tasks` tasks are tracked at once;
//!   submission beyond that fails rather than queueing unboundedly.
//! - **Lazy, bounded growth**: workers are spawned one at a time, only when
//!   every live worker is busy, never past `max_workers`.
//! - **FIFO claim order**: pending tasks are claimed in submission order.
//! - **Exactly-once delivery**: each task's result is handed to exactly one
//!   reclaiming call (a join, or the pool itself for detached tasks).
//! - **Safe teardown**: shutdown refuses while work is outstanding and joins
//!   every worker once it proceeds.

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod telemetry;

pub use config::{Config, ConfigBuilder, MAX_TASKS, MAX_WORKERS};
pub use error::{Error, Result};
pub use executor::{Pool, Task};
pub use telemetry::{Metrics, MetricsSnapshot};
