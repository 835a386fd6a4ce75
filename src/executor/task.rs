//! Task handles and the task state machine.
//!
//! A [`Task`] is one deferred unit of work: a closure, a write-once outcome
//! slot, and a completion signal. The handle stays with the caller while the
//! pool holds its own reference; whoever reclaims the task (join, timed join,
//! or the pool itself after a detach) takes the outcome exactly once.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::executor::pool::PoolShared;

/// Type-erased work closure. The typed result is boxed at creation so the
/// pool never needs to know `R`.
pub(crate) type Work = Box<dyn FnOnce() -> Box<dyn Any + Send> + Send>;

/// What execution produced: the boxed result, or the panic payload.
pub(crate) type Outcome = std::result::Result<Box<dyn Any + Send>, Box<dyn Any + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Pending,
    Running,
    Finished,
}

pub(crate) struct TaskCore {
    pub(crate) inner: Mutex<TaskInner>,
    /// Completion signal. Paired with `inner` only; the pool-wide condvar
    /// lives on the pool mutex, so shutdown wakeups and completion wakeups
    /// never mix.
    pub(crate) done: Condvar,
}

pub(crate) struct TaskInner {
    pub(crate) work: Option<Work>,
    pub(crate) outcome: Option<Outcome>,
    pub(crate) status: Status,
    pub(crate) detached: bool,
    /// `None` both before submission and after reclamation; the two states
    /// are deliberately indistinguishable.
    pub(crate) owner: Option<Weak<PoolShared>>,
    /// Index into the pool's active zone. Valid only while claimed and owned.
    pub(crate) slot: usize,
}

/// Handle to one unit of deferred work producing an `R`.
pub struct Task<R> {
    core: Arc<TaskCore>,
    _result: PhantomData<fn() -> R>,
}

impl<R: Send + 'static> Task<R> {
    /// Create a standalone task. It does nothing until submitted to a pool.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
    {
        let work: Work = Box::new(move || Box::new(f()) as Box<dyn Any + Send>);
        Task {
            core: Arc::new(TaskCore {
                inner: Mutex::new(TaskInner {
                    work: Some(work),
                    outcome: None,
                    status: Status::Pending,
                    detached: false,
                    owner: None,
                    slot: usize::MAX,
                }),
                done: Condvar::new(),
            }),
            _result: PhantomData,
        }
    }

    /// True once the task's outcome has been published.
    pub fn is_finished(&self) -> bool {
        self.core.inner.lock().status == Status::Finished
    }

    /// True while a worker is executing the task.
    pub fn is_running(&self) -> bool {
        self.core.inner.lock().status == Status::Running
    }

    /// Block until the task finishes, reclaim it from its pool, and return
    /// the result. Fails with [`Error::TaskNotPushed`] if the task has no
    /// owning pool (never submitted, or already reclaimed).
    pub fn join(&self) -> Result<R> {
        let pool = self.wait_finished(None)?;
        self.reclaim(pool)
    }

    /// [`join`](Task::join) bounded by a deadline computed once, from the
    /// monotonic clock, at call time. On [`Error::Timeout`] the task is left
    /// exactly as it was and remains joinable.
    pub fn timed_join(&self, timeout: Duration) -> Result<R> {
        let deadline = Instant::now() + timeout;
        let pool = self.wait_finished(Some(deadline))?;
        self.reclaim(pool)
    }

    /// Hand the task over to its pool. If it already finished, it is
    /// reclaimed and its result discarded right here; otherwise the worker
    /// that publishes its completion reclaims it. Either way the caller must
    /// not join it afterwards.
    pub fn detach(&self) -> Result<()> {
        let owner = {
            let mut inner = self.core.inner.lock();
            let Some(owner) = inner.owner.clone() else {
                return Err(Error::TaskNotPushed);
            };
            if inner.status != Status::Finished {
                inner.detached = true;
                if let Some(pool) = owner.upgrade() {
                    pool.metrics.record_task_detached();
                }
                return Ok(());
            }
            owner
        };

        // already finished: reclaim immediately, dropping the outcome
        // outside the locks
        let dropped = match owner.upgrade() {
            Some(pool) => {
                let mut state = pool.state.lock();
                let mut inner = self.core.inner.lock();
                if inner.owner.is_none() {
                    return Err(Error::TaskNotPushed);
                }
                state.slots.remove(inner.slot);
                inner.owner = None;
                pool.metrics.record_task_detached();
                inner.outcome.take()
            }
            None => {
                let mut inner = self.core.inner.lock();
                if inner.owner.is_none() {
                    return Err(Error::TaskNotPushed);
                }
                inner.owner = None;
                inner.outcome.take()
            }
        };
        drop(dropped);
        Ok(())
    }

    /// Explicitly destroy the handle. While a pool still owns the task this
    /// refuses and hands the handle back intact, `Arc::try_unwrap`-style;
    /// join or detach first.
    pub fn destroy(self) -> std::result::Result<(), (Self, Error)> {
        let owned = self.core.inner.lock().owner.is_some();
        if owned {
            return Err((self, Error::TaskStillOwnedByPool));
        }
        Ok(())
    }

    /// Wait until the task is finished, or until `deadline` if one is given.
    /// Returns the owning pool if it is still alive; `None` means the pool
    /// was dropped but the task did finish.
    fn wait_finished(&self, deadline: Option<Instant>) -> Result<Option<Arc<PoolShared>>> {
        let mut inner = self.core.inner.lock();
        let Some(owner) = inner.owner.clone() else {
            return Err(Error::TaskNotPushed);
        };

        while inner.status != Status::Finished {
            match deadline {
                Some(deadline) => {
                    let timed_out = self.core.done.wait_until(&mut inner, deadline).timed_out();
                    if timed_out && inner.status != Status::Finished {
                        drop(inner);
                        if let Some(pool) = owner.upgrade() {
                            pool.metrics.record_wait_timed_out();
                        }
                        return Err(Error::Timeout);
                    }
                }
                None => self.core.done.wait(&mut inner),
            }
        }
        drop(inner);

        Ok(owner.upgrade())
    }

    /// Reclaim a finished task: remove it from the pool's bookkeeping and
    /// take the outcome. Losing the race to another reclaimer reports
    /// [`Error::TaskNotPushed`].
    fn reclaim(&self, pool: Option<Arc<PoolShared>>) -> Result<R> {
        match pool {
            // lock order everywhere: pool state first, then the task
            Some(pool) => {
                let mut state = pool.state.lock();
                let mut inner = self.core.inner.lock();
                if inner.owner.is_none() {
                    return Err(Error::TaskNotPushed);
                }
                state.slots.remove(inner.slot);
                inner.owner = None;
                take_outcome(&mut inner)
            }
            None => {
                let mut inner = self.core.inner.lock();
                if inner.owner.is_none() {
                    return Err(Error::TaskNotPushed);
                }
                inner.owner = None;
                take_outcome(&mut inner)
            }
        }
    }

    pub(crate) fn core(&self) -> &Arc<TaskCore> {
        &self.core
    }
}

impl<R> fmt::Debug for Task<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.core.inner.try_lock() {
            Some(inner) => f
                .debug_struct("Task")
                .field("status", &inner.status)
                .field("detached", &inner.detached)
                .field("pooled", &inner.owner.is_some())
                .finish(),
            None => f.debug_struct("Task").finish_non_exhaustive(),
        }
    }
}

fn take_outcome<R: 'static>(inner: &mut TaskInner) -> Result<R> {
    match inner.outcome.take() {
        Some(Ok(value)) => {
            let value = value
                .downcast::<R>()
                .expect("task outcome matches the handle's result type");
            Ok(*value)
        }
        Some(Err(payload)) => Err(Error::TaskPanicked(panic_message(payload.as_ref()))),
        // Finished implies a published outcome
        None => Err(Error::TaskNotPushed),
    }
}

/// Best-effort extraction of a panic payload message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
