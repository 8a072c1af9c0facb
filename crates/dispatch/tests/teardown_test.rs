//! Integration tests for cooperative cancellation and teardown draining.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fahrplan_core::{RunnerFactory, TaskContext, TaskRunner, TaskToken};
use fahrplan_dispatch::TaskManager;

/// Factory whose runners offload onto their own thread: sleep in short slices,
/// polling for cancellation, then complete with the number of slices worked.
struct SlicedFactory {
    slices: usize,
    completions: Arc<AtomicUsize>,
}

impl RunnerFactory<String, usize> for SlicedFactory {
    fn new_runner(&self, _token: TaskToken, _request: Arc<String>) -> Box<dyn TaskRunner<usize>> {
        Box::new(SlicedRunner {
            slices: self.slices,
            completions: Arc::clone(&self.completions),
        })
    }
}

struct SlicedRunner {
    slices: usize,
    completions: Arc<AtomicUsize>,
}

impl TaskRunner<usize> for SlicedRunner {
    fn run(self: Box<Self>, ctx: TaskContext<usize>) {
        let completions = self.completions;
        let slices = self.slices;
        std::thread::spawn(move || {
            let mut worked = 0;
            loop {
                std::thread::sleep(Duration::from_millis(10));
                worked += 1;
                if worked >= slices || ctx.is_canceled() {
                    break;
                }
            }
            completions.fetch_add(1, Ordering::SeqCst);
            ctx.complete(worked);
        });
    }
}

#[test]
fn drop_blocks_until_inflight_tasks_complete() {
    let completions = Arc::new(AtomicUsize::new(0));
    let manager: TaskManager<String, usize> = TaskManager::new(Box::new(SlicedFactory {
        slices: 10,
        completions: Arc::clone(&completions),
    }));

    for i in 0..3 {
        let token = manager.add_task(format!("job-{i}"));
        manager.start_task(token).unwrap();
    }
    assert_eq!(manager.status_info().running, 3);

    drop(manager);

    // Drop cancels the runners so they stop early, but it must not return
    // before every one of them has confirmed.
    assert_eq!(completions.load(Ordering::SeqCst), 3);
}

#[test]
fn teardown_cancellation_shortens_work() {
    let completions = Arc::new(AtomicUsize::new(0));
    // 10ms slices x 500 slices = ~5s of uncanceled work per task.
    let manager: TaskManager<String, usize> = TaskManager::new(Box::new(SlicedFactory {
        slices: 500,
        completions: Arc::clone(&completions),
    }));

    let token = manager.add_task("long haul".to_string());
    manager.start_task(token).unwrap();

    let started = Instant::now();
    drop(manager);

    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert!(
        started.elapsed() < Duration::from_secs(4),
        "cancellation should have cut the work short, took {:?}",
        started.elapsed()
    );
}

#[test]
fn explicit_cancel_shortens_work_and_discards_response() {
    let completions = Arc::new(AtomicUsize::new(0));
    let manager: TaskManager<String, usize> = TaskManager::new(Box::new(SlicedFactory {
        slices: 500,
        completions: Arc::clone(&completions),
    }));

    let token = manager.add_task("canceled midway".to_string());
    manager.start_task(token).unwrap();

    std::thread::sleep(Duration::from_millis(50));
    manager.cancel_task(token).unwrap();

    // Wait for the runner to notice and confirm.
    let deadline = Instant::now() + Duration::from_secs(5);
    while completions.load(Ordering::SeqCst) == 0 {
        assert!(Instant::now() < deadline, "runner never confirmed");
        std::thread::sleep(Duration::from_millis(10));
    }

    // The confirmation removes the entry and discards the partial response.
    let deadline = Instant::now() + Duration::from_secs(5);
    while manager.metrics().responses_discarded != 1 {
        assert!(Instant::now() < deadline, "response was never discarded");
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(manager.status_info().total, 0);
}

#[test]
fn teardown_drops_unclaimed_entries() {
    let completions = Arc::new(AtomicUsize::new(0));
    let manager: TaskManager<String, usize> = TaskManager::new(Box::new(SlicedFactory {
        slices: 1,
        completions: Arc::clone(&completions),
    }));

    // One task runs to completion but is never collected; one never starts.
    let finished = manager.add_task("finished".to_string());
    manager.start_task(finished).unwrap();
    manager.add_task("never started".to_string());

    let deadline = Instant::now() + Duration::from_secs(5);
    while manager.status_info().completed != 1 {
        assert!(Instant::now() < deadline, "task never completed");
        std::thread::sleep(Duration::from_millis(10));
    }

    // Teardown has nothing in flight to wait for; it just frees both entries.
    drop(manager);
}
