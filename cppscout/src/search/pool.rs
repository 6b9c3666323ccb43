//! Fixed-size worker pool with a shared FIFO queue and a completion barrier.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace, warn};

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct PoolState {
    queue: VecDeque<Task>,
    /// Tasks pushed but not yet finished (queued + running)
    pending: usize,
    /// Workers between "dequeued" and "finished"
    active: usize,
    shutdown: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    task_available: Condvar,
    all_done: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A pool of `n` worker threads executing pushed tasks in FIFO order.
///
/// `wait` is the barrier that ends a directory scan: it returns only once
/// every pushed task has run to completion. Dropping the pool drains the
/// queue and joins the workers.
pub struct TaskPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskPool {
    pub fn new(n_workers: NonZeroUsize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState::default()),
            task_available: Condvar::new(),
            all_done: Condvar::new(),
        });

        let workers = (0..n_workers.get())
            .filter_map(|id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("cppscout-worker-{}", id))
                    .spawn(move || worker_loop(&shared))
                    .map_err(|e| error!("Failed to spawn worker {}: {}", id, e))
                    .ok()
            })
            .collect::<Vec<_>>();

        debug!("Started task pool with {} workers", workers.len());
        Self { shared, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueues one unit of work; never blocks beyond queue contention
    pub fn push<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.workers.is_empty() {
            // No thread could be spawned; run inline so nothing is dropped.
            run_task(Box::new(task));
            return;
        }

        let mut state = self.shared.lock();
        state.queue.push_back(Box::new(task));
        state.pending += 1;
        drop(state);
        self.shared.task_available.notify_one();
    }

    /// Blocks until the queue is empty and no worker is mid-task
    pub fn wait(&self) {
        let mut state = self.shared.lock();
        while state.pending > 0 || state.active > 0 {
            state = self
                .shared
                .all_done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        debug_assert!(state.queue.is_empty());
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.task_available.notify_all();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("Worker thread terminated abnormally");
            }
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut state = shared.lock();
            loop {
                if let Some(task) = state.queue.pop_front() {
                    state.active += 1;
                    break task;
                }
                if state.shutdown {
                    return;
                }
                state = shared
                    .task_available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        run_task(task);

        let mut state = shared.lock();
        state.active -= 1;
        state.pending -= 1;
        if state.pending == 0 && state.active == 0 {
            shared.all_done.notify_all();
        }
    }
}

fn run_task(task: Task) {
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        warn!("A scan task panicked; continuing with the remaining tasks");
    } else {
        trace!("Task finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn pool(n: usize) -> TaskPool {
        TaskPool::new(NonZeroUsize::new(n).unwrap())
    }

    #[test]
    fn test_counter_reaches_task_count() {
        for workers in [1, 4, 16] {
            for tasks in [1, 8, 64] {
                let pool = pool(workers);
                let counter = Arc::new(AtomicUsize::new(0));
                for _ in 0..tasks {
                    let counter = Arc::clone(&counter);
                    pool.push(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    });
                }
                pool.wait();
                assert_eq!(counter.load(Ordering::SeqCst), tasks, "M={} K={}", workers, tasks);
            }
        }
    }

    #[test]
    fn test_no_task_runs_twice() {
        let pool = pool(8);
        let runs: Arc<Vec<AtomicUsize>> = Arc::new((0..64).map(|_| AtomicUsize::new(0)).collect());
        for i in 0..64 {
            let runs = Arc::clone(&runs);
            pool.push(move || {
                runs[i].fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait();
        assert!(runs.iter().all(|r| r.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn test_wait_covers_running_tasks() {
        let pool = pool(2);
        let finished = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let finished = Arc::clone(&finished);
            pool.push(move || {
                thread::sleep(Duration::from_millis(20));
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait();
        assert_eq!(finished.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_wait_on_idle_pool_returns() {
        let pool = pool(3);
        pool.wait();
        assert_eq!(pool.worker_count(), 3);
    }

    #[test]
    fn test_pool_is_reusable_after_wait() {
        let pool = pool(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for round in 1..=3 {
            for _ in 0..10 {
                let counter = Arc::clone(&counter);
                pool.push(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
            pool.wait();
            assert_eq!(counter.load(Ordering::SeqCst), round * 10);
        }
    }

    #[test]
    fn test_panicking_task_does_not_block_wait() {
        let pool = pool(2);
        let counter = Arc::new(AtomicUsize::new(0));
        pool.push(|| panic!("boom"));
        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            pool.push(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }
}
