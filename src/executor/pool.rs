//! The pool: admission control, lazy worker growth, and shutdown.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::telemetry::Metrics;

use super::slots::SlotTable;
use super::task::{Status, Task};
use super::worker::Worker;

/// State shared between the pool handle and its worker threads.
pub(crate) struct PoolShared {
    pub(crate) state: Mutex<PoolState>,
    /// Wake signal for idle workers: pending work changed or shutdown was
    /// requested. Task completion has its own per-task signal.
    pub(crate) work_changed: Condvar,
    pub(crate) metrics: Metrics,
}

pub(crate) struct PoolState {
    pub(crate) slots: SlotTable,
    pub(crate) spawned: usize,
    pub(crate) shutdown: bool,
    workers: Vec<JoinHandle<()>>,
}

/// A bounded worker pool. Workers are spawned lazily as load demands, up to
/// the configured ceiling, and joined at shutdown.
pub struct Pool {
    shared: Arc<PoolShared>,
    config: Config,
}

impl Pool {
    /// Create an empty pool. No workers are spawned until work arrives.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let worker_limit = config.worker_limit();
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                slots: SlotTable::new(config.max_tasks),
                spawned: 0,
                shutdown: false,
                workers: Vec::with_capacity(worker_limit),
            }),
            work_changed: Condvar::new(),
            metrics: Metrics::new(),
        });

        Ok(Self { shared, config })
    }

    /// Convenience constructor over a default [`Config`].
    pub fn with_limits(max_workers: usize, max_tasks: usize) -> Result<Self> {
        Self::new(
            Config::builder()
                .max_workers(max_workers)
                .max_tasks(max_tasks)
                .build()?,
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.shared.metrics
    }

    /// Currently spawned workers. Grows monotonically up to the limit and
    /// only drops back to zero at shutdown.
    pub fn worker_count(&self) -> usize {
        self.shared.state.lock().spawned
    }

    /// Admitted tasks not yet claimed by a worker.
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().slots.pending_count()
    }

    /// Tasks currently executing.
    pub fn running_count(&self) -> usize {
        self.shared.state.lock().slots.running_count()
    }

    /// Finished tasks awaiting reclaim.
    pub fn reclaimable_count(&self) -> usize {
        self.shared.state.lock().slots.reclaimable_count()
    }

    /// All admitted tasks, whatever their state. Bounded by `max_tasks`.
    pub fn admitted_count(&self) -> usize {
        self.shared.state.lock().slots.admitted()
    }

    /// Admit a task. Never blocks: the task is appended to the pending ring
    /// and either a new worker is spawned (every live worker busy, ceiling
    /// not reached) or an idle one is woken.
    pub fn submit<R: Send + 'static>(&self, task: &Task<R>) -> Result<()> {
        let core = task.core();
        let mut state = self.shared.state.lock();

        if state.shutdown {
            return Err(Error::ShutDown);
        }
        if state.slots.is_full() {
            return Err(Error::TooManyTasks);
        }

        {
            let mut inner = core.inner.lock();
            if inner.owner.is_some() {
                return Err(Error::TaskAlreadyPooled);
            }
            if inner.work.is_none() {
                return Err(Error::TaskAlreadyRun);
            }
            inner.status = Status::Pending;
            inner.detached = false;
            inner.outcome = None;
            inner.owner = Some(Arc::downgrade(&self.shared));
        }
        state.slots.push_pending(Arc::clone(core));

        // lazy growth: spawn only when every live worker is busy
        if state.slots.running_count() == state.spawned && state.spawned < self.config.worker_limit()
        {
            if let Err(e) = self.spawn_worker(&mut state) {
                // roll the admission back; nobody could have claimed it
                // because the lock was held throughout
                state.slots.pop_pending();
                core.inner.lock().owner = None;
                return Err(e);
            }
        } else {
            self.shared.work_changed.notify_one();
        }

        self.shared.metrics.record_task_submitted();
        Ok(())
    }

    /// Create a task from a closure and submit it in one step.
    pub fn spawn<R, F>(&self, f: F) -> Result<Task<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let task = Task::new(f);
        self.submit(&task)?;
        Ok(task)
    }

    /// Fire-and-forget: submit and immediately detach, leaving reclamation
    /// to the pool.
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(f)?.detach()
    }

    /// Shut the pool down. Refuses, leaving the pool fully usable, while any
    /// task is pending or running; finished tasks awaiting reclaim do not
    /// block shutdown and remain joinable afterwards. On success all workers
    /// are woken and joined. Idempotent once successful.
    pub fn shutdown(&mut self) -> Result<()> {
        let workers = {
            let mut state = self.shared.state.lock();
            if state.slots.pending_count() > 0 || state.slots.running_count() > 0 {
                return Err(Error::HasTasks);
            }
            state.shutdown = true;
            state.spawned = 0;
            self.shared.work_changed.notify_all();
            std::mem::take(&mut state.workers)
        };

        for handle in workers {
            let _ = handle.join();
        }
        Ok(())
    }

    fn spawn_worker(&self, state: &mut PoolState) -> Result<()> {
        let worker = Worker::new(state.spawned);
        let shared = Arc::clone(&self.shared);

        let mut builder = thread::Builder::new()
            .name(format!("{}-{}", self.config.thread_name_prefix, worker.id));
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder.spawn(move || worker.run(shared))?;
        state.workers.push(handle);
        state.spawned += 1;
        self.shared.metrics.record_worker_spawned();
        Ok(())
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        let workers = {
            let mut state = self.shared.state.lock();
            if cfg!(debug_assertions)
                && (state.slots.pending_count() > 0 || state.slots.running_count() > 0)
            {
                eprintln!("tidepool: pool dropped with outstanding tasks; abandoning them");
            }
            state.shutdown = true;
            state.spawned = 0;
            self.shared.work_changed.notify_all();
            std::mem::take(&mut state.workers)
        };

        // workers finish their current task, observe shutdown, and exit
        for handle in workers {
            let _ = handle.join();
        }
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Pool")
            .field("workers", &state.spawned)
            .field("pending", &state.slots.pending_count())
            .field("running", &state.slots.running_count())
            .field("reclaimable", &state.slots.reclaimable_count())
            .field("shutdown", &state.shutdown)
            .finish()
    }
}
