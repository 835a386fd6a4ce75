use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use tidepool::{Error, Pool, Task};

const WAIT_BUDGET: Duration = Duration::from_secs(5);

fn wait_for(mut condition: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + WAIT_BUDGET;
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::yield_now();
    }
}

#[test]
fn capacity_limit_is_enforced_until_reclaim() {
    let pool = Pool::with_limits(1, 2).unwrap();
    let (gate_tx, gate_rx) = bounded::<()>(0);

    let blocker = pool
        .spawn({
            let gate_rx = gate_rx.clone();
            move || gate_rx.recv().unwrap()
        })
        .unwrap();

    let parked = Task::new(|| 7);
    pool.submit(&parked).unwrap();

    // table is full now; admission fails until something is reclaimed
    let overflow = Task::new(|| 8);
    assert!(matches!(pool.submit(&overflow), Err(Error::TooManyTasks)));

    gate_tx.send(()).unwrap();
    blocker.join().unwrap();

    pool.submit(&overflow).unwrap();
    assert_eq!(parked.join().unwrap(), 7);
    assert_eq!(overflow.join().unwrap(), 8);
}

#[test]
fn worker_growth_is_lazy_and_bounded() {
    let pool = Pool::with_limits(2, 16).unwrap();
    assert_eq!(pool.worker_count(), 0);

    let (gate_tx, gate_rx) = bounded::<()>(0);
    let mut tasks = Vec::new();
    for i in 0..5usize {
        let gate_rx = gate_rx.clone();
        tasks.push(pool.spawn(move || gate_rx.recv().unwrap()).unwrap());

        // growth is demand-driven: let the claim land before submitting more
        let expected_running = (i + 1).min(2);
        wait_for(|| pool.running_count() == expected_running, "workers to claim");
    }

    // five blocking tasks, but never more workers than the ceiling
    assert_eq!(pool.worker_count(), 2);
    assert_eq!(pool.pending_count(), 3);

    for _ in 0..5 {
        gate_tx.send(()).unwrap();
    }
    for task in &tasks {
        task.join().unwrap();
    }
    assert_eq!(pool.worker_count(), 2);
}

#[test]
fn join_returns_the_tasks_value() {
    let pool = Pool::with_limits(2, 16).unwrap();

    let squares: Vec<_> = (0..8usize)
        .map(|i| pool.spawn(move || i * i).unwrap())
        .collect();
    for (i, task) in squares.iter().enumerate() {
        assert_eq!(task.join().unwrap(), i * i);
    }

    let owned = pool.spawn(|| String::from("result")).unwrap();
    assert_eq!(owned.join().unwrap(), "result");
}

#[test]
fn detached_tasks_reclaim_themselves() {
    let mut pool = Pool::with_limits(2, 8).unwrap();
    let (done_tx, done_rx) = bounded(8);

    for i in 0..4 {
        let done_tx = done_tx.clone();
        let task = pool.spawn(move || done_tx.send(i).unwrap()).unwrap();
        task.detach().unwrap();
    }

    for _ in 0..4 {
        done_rx.recv_timeout(WAIT_BUDGET).unwrap();
    }

    // the completion signal fires before reclamation, so poll the table
    wait_for(|| pool.admitted_count() == 0, "detached tasks to drain");
    assert_eq!(pool.pending_count(), 0);
    assert_eq!(pool.running_count(), 0);

    pool.shutdown().unwrap();
}

#[test]
fn detach_after_finish_reclaims_immediately() {
    let pool = Pool::with_limits(1, 4).unwrap();

    let task = pool.spawn(|| 11).unwrap();
    wait_for(|| task.is_finished(), "task to finish");

    task.detach().unwrap();
    assert_eq!(pool.admitted_count(), 0);
    assert!(matches!(task.join(), Err(Error::TaskNotPushed)));
}

#[test]
fn timed_join_times_out_then_join_succeeds() {
    let pool = Pool::with_limits(1, 4).unwrap();
    let (gate_tx, gate_rx) = bounded::<()>(0);

    let task = pool
        .spawn(move || {
            gate_rx.recv().unwrap();
            99
        })
        .unwrap();

    let err = task.timed_join(Duration::from_millis(50)).unwrap_err();
    assert!(matches!(err, Error::Timeout));

    // the timeout left the task exactly as it was
    assert!(!task.is_finished());
    assert_eq!(pool.admitted_count(), 1);

    gate_tx.send(()).unwrap();
    assert_eq!(task.join().unwrap(), 99);

    // the result was delivered exactly once
    assert!(matches!(task.join(), Err(Error::TaskNotPushed)));
    assert_eq!(pool.metrics().snapshot().waits_timed_out, 1);
}

#[test]
fn timed_join_succeeds_within_budget() {
    let pool = Pool::with_limits(1, 4).unwrap();

    let task = pool.spawn(|| 13).unwrap();
    assert_eq!(task.timed_join(WAIT_BUDGET).unwrap(), 13);
}

#[test]
fn shutdown_refused_while_tasks_outstanding() {
    let mut pool = Pool::with_limits(1, 4).unwrap();
    let (gate_tx, gate_rx) = bounded::<()>(0);

    let blocker = pool
        .spawn({
            let gate_rx = gate_rx.clone();
            move || gate_rx.recv().unwrap()
        })
        .unwrap();

    assert!(matches!(pool.shutdown(), Err(Error::HasTasks)));

    // the refused shutdown left the pool fully usable
    let second = pool.spawn(|| 5).unwrap();

    gate_tx.send(()).unwrap();
    blocker.join().unwrap();
    assert_eq!(second.join().unwrap(), 5);

    pool.shutdown().unwrap();
    assert_eq!(pool.worker_count(), 0);
    assert!(matches!(pool.spawn(|| 0), Err(Error::ShutDown)));
}

#[test]
fn shutdown_allows_finished_unreclaimed_tasks() {
    let mut pool = Pool::with_limits(1, 4).unwrap();

    let task = pool.spawn(|| 17).unwrap();
    wait_for(|| task.is_finished(), "task to finish");

    // finished-but-unreclaimed work does not block shutdown,
    // and stays joinable afterwards
    pool.shutdown().unwrap();
    assert_eq!(task.join().unwrap(), 17);
}

#[test]
fn results_deliver_exactly_once() {
    let pool = Pool::with_limits(4, 64).unwrap();

    let tasks: Vec<_> = (0..32).map(|i| pool.spawn(move || i).unwrap()).collect();

    let delivered = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for task in &tasks {
            // two competing joiners per task; exactly one may win
            for _ in 0..2 {
                s.spawn(|| match task.join() {
                    Ok(_) => {
                        delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(Error::TaskNotPushed) => {}
                    Err(e) => panic!("unexpected join error: {e}"),
                });
            }
        }
    });

    assert_eq!(delivered.load(Ordering::Relaxed), 32);
    assert_eq!(pool.admitted_count(), 0);
}

#[test]
fn single_worker_claims_in_submission_order() {
    let pool = Pool::with_limits(1, 32).unwrap();
    let (gate_tx, gate_rx) = bounded::<()>(0);
    let (order_tx, order_rx) = crossbeam_channel::unbounded();

    // pin the only worker so the rest queue up behind it
    let blocker = pool.spawn(move || gate_rx.recv().unwrap()).unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let order_tx = order_tx.clone();
        tasks.push(pool.spawn(move || order_tx.send(i).unwrap()).unwrap());
    }

    gate_tx.send(()).unwrap();
    blocker.join().unwrap();
    for task in &tasks {
        task.join().unwrap();
    }

    let order: Vec<i32> = order_rx.try_iter().collect();
    assert_eq!(order, (0..16).collect::<Vec<_>>());
}

#[test]
fn panicking_task_reports_and_pool_survives() {
    let pool = Pool::with_limits(1, 4).unwrap();

    let task = pool.spawn(|| -> i32 { panic!("boom") }).unwrap();
    match task.join() {
        Err(Error::TaskPanicked(msg)) => assert!(msg.contains("boom")),
        other => panic!("expected panic error, got {other:?}"),
    }

    // the worker that caught the panic keeps serving
    assert_eq!(pool.spawn(|| 3).unwrap().join().unwrap(), 3);
    assert_eq!(pool.metrics().snapshot().tasks_panicked, 1);
}

#[test]
fn destroy_refused_while_pooled() {
    let pool = Pool::with_limits(1, 4).unwrap();
    let (gate_tx, gate_rx) = bounded::<()>(0);

    let task = pool.spawn(move || gate_rx.recv().unwrap()).unwrap();

    let (task, err) = task.destroy().unwrap_err();
    assert!(matches!(err, Error::TaskStillOwnedByPool));

    gate_tx.send(()).unwrap();
    task.join().unwrap();
    task.destroy().unwrap();
}

#[test]
fn resubmission_is_rejected() {
    let pool = Pool::with_limits(1, 4).unwrap();
    let (gate_tx, gate_rx) = bounded::<()>(0);

    let task = pool.spawn(move || gate_rx.recv().unwrap()).unwrap();
    assert!(matches!(pool.submit(&task), Err(Error::TaskAlreadyPooled)));

    gate_tx.send(()).unwrap();
    task.join().unwrap();

    // the closure is gone after one run
    assert!(matches!(pool.submit(&task), Err(Error::TaskAlreadyRun)));
}

#[test]
fn status_flags_track_the_lifecycle() {
    let pool = Pool::with_limits(1, 4).unwrap();
    let (gate_tx, gate_rx) = bounded::<()>(0);

    let task = pool.spawn(move || gate_rx.recv().unwrap()).unwrap();
    wait_for(|| task.is_running(), "worker to claim");
    assert!(!task.is_finished());

    gate_tx.send(()).unwrap();
    wait_for(|| task.is_finished(), "task to finish");
    assert!(!task.is_running());

    task.join().unwrap();
    // finished stays observable after reclamation
    assert!(task.is_finished());
}

#[test]
fn metrics_track_submission_and_completion() {
    let pool = Pool::with_limits(2, 32).unwrap();

    let tasks: Vec<_> = (0..10).map(|i| pool.spawn(move || i).unwrap()).collect();
    for task in &tasks {
        task.join().unwrap();
    }

    let snapshot = pool.metrics().snapshot();
    assert_eq!(snapshot.tasks_submitted, 10);
    assert_eq!(snapshot.tasks_completed, 10);
    assert_eq!(snapshot.tasks_outstanding(), 0);
    assert!(snapshot.workers_spawned >= 1);
    assert!(snapshot.tasks_per_second() > 0.0);
}

#[test]
fn invalid_limits_are_rejected() {
    assert!(Pool::with_limits(0, 16).is_err());
    assert!(Pool::with_limits(tidepool::MAX_WORKERS + 1, 16).is_err());
    assert!(Pool::with_limits(4, 0).is_err());
    assert!(Pool::with_limits(4, tidepool::MAX_TASKS + 1).is_err());
}
