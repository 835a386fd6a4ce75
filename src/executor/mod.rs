//! Task execution infrastructure.
//!
//! This module provides the pool, its slot-table bookkeeping, the worker
//! loop, and the caller-facing task handles.

pub mod pool;
pub mod task;

mod slots;
mod worker;

pub use pool::Pool;
pub use task::Task;
