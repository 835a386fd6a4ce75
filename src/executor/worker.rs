// worker loop: wait for work, claim, execute unlocked, publish
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use super::pool::PoolShared;
use super::task::{Status, TaskCore, Work};

pub(crate) type WorkerId = usize;

pub(crate) struct Worker {
    pub(crate) id: WorkerId,
}

impl Worker {
    pub fn new(id: WorkerId) -> Self {
        Self { id }
    }

    // main loop, one per spawned thread
    pub fn run(&self, shared: Arc<PoolShared>) {
        loop {
            let (task, work) = {
                let mut state = shared.state.lock();
                loop {
                    // shutdown wins over pending work; never claim after it
                    if state.shutdown {
                        return;
                    }
                    if state.slots.pending_count() > 0 {
                        break;
                    }
                    shared.work_changed.wait(&mut state);
                }

                let (task, slot) = state
                    .slots
                    .claim()
                    .expect("pending task available under the pool lock");
                let work = {
                    let mut inner = task.inner.lock();
                    inner.status = Status::Running;
                    inner.slot = slot;
                    inner.work.take()
                };
                (task, work)
            };

            self.execute(&shared, task, work);
        }
    }

    /// Run the user closure outside the lock, then publish the outcome.
    fn execute(&self, shared: &Arc<PoolShared>, task: Arc<TaskCore>, work: Option<Work>) {
        let work = work.expect("admitted task carries its closure");

        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(work));
        let duration_ns = started.elapsed().as_nanos() as u64;

        if outcome.is_err() {
            eprintln!("tidepool: task panicked in worker {}", self.id);
            shared.metrics.record_task_panic();
        }
        shared.metrics.record_task_execution(duration_ns);

        // publish: outcome write and completion signal under the same locks,
        // so no waiter can observe the signal before the result
        let dropped = {
            let mut state = shared.state.lock();
            let mut inner = task.inner.lock();
            state.slots.mark_finished();
            inner.status = Status::Finished;
            inner.outcome = Some(outcome);

            let dropped = if inner.detached {
                // detached tasks are the pool's to reclaim
                state.slots.remove(inner.slot);
                inner.owner = None;
                inner.outcome.take()
            } else {
                None
            };

            task.done.notify_all();
            dropped
        };
        drop(dropped);
    }
}
