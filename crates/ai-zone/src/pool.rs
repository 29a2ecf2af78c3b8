use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Queue {
    jobs: VecDeque<Job>,
    stop: bool,
    force: bool,
}

struct Inner {
    queue: Mutex<Queue>,
    queue_cv: Condvar,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of a task handed to [`ThreadPool::enqueue`].
#[derive(Debug)]
pub struct TaskHandle<R> {
    rx: mpsc::Receiver<R>,
}

impl<R> TaskHandle<R> {
    /// Blocks until the task has run. `None` if it never will: it was dropped by a forced
    /// shutdown, enqueued after shutdown, or it panicked.
    pub fn wait(self) -> Option<R> {
        self.rx.recv().ok()
    }

    /// The result if the task already ran.
    pub fn try_take(&self) -> Option<R> {
        self.rx.try_recv().ok()
    }
}

/// Fixed number of named worker threads pulling from one FIFO queue.
///
/// There is no per-task cancellation. [`ThreadPool::shutdown`] drains the queue before the
/// workers exit, [`ThreadPool::shutdown_now`] drops whatever has not started yet. Dropping
/// the pool shuts it down gracefully.
pub struct ThreadPool {
    name: String,
    inner: Arc<Inner>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawns `threads` workers (at least one) named `{name}-{index}`.
    ///
    /// # Panics
    ///
    /// If the OS refuses to create a worker thread.
    pub fn new(name: impl Into<String>, threads: usize) -> Self {
        let name = name.into();
        let inner = Arc::new(Inner {
            queue: Mutex::new(Queue::default()),
            queue_cv: Condvar::new(),
        });

        let workers = (0..threads.max(1))
            .map(|index| {
                let worker_inner = inner.clone();
                thread::Builder::new()
                    .name(format!("{name}-{index}"))
                    .spawn(move || worker_loop(worker_inner))
                    .unwrap_or_else(|err| {
                        panic!("failed to spawn worker thread {name}-{index}: {err}")
                    })
            })
            .collect();

        Self {
            name,
            inner,
            workers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    pub fn enqueue<F, R>(&self, task: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let job: Job = Box::new(move || match catch_unwind(AssertUnwindSafe(task)) {
            Ok(result) => {
                let _ = tx.send(result);
            }
            Err(_) => error!("task panicked"),
        });

        let mut queue = self.inner.lock();
        if queue.stop {
            warn!(pool = %self.name, "task enqueued after shutdown was dropped");
            return TaskHandle { rx };
        }
        queue.jobs.push_back(job);
        drop(queue);
        self.inner.queue_cv.notify_one();
        TaskHandle { rx }
    }

    /// Runs every queued task, then joins the workers.
    pub fn shutdown(&mut self) {
        self.stop(false);
    }

    /// Drops queued tasks and joins the workers once their current task is done.
    pub fn shutdown_now(&mut self) {
        self.stop(true);
    }

    fn stop(&mut self, force: bool) {
        let dropped: Vec<Job> = {
            let mut queue = self.inner.lock();
            queue.stop = true;
            queue.force |= force;
            if force {
                queue.jobs.drain(..).collect()
            } else {
                Vec::new()
            }
        };
        self.inner.queue_cv.notify_all();
        if !dropped.is_empty() {
            debug!(pool = %self.name, dropped = dropped.len(), "dropping queued tasks");
        }
        drop(dropped);

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!(pool = %self.name, "worker thread panicked");
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop(false);
        }
    }
}

fn worker_loop(inner: Arc<Inner>) {
    loop {
        let job = {
            let mut queue = inner.lock();
            loop {
                if queue.force {
                    return;
                }
                if let Some(job) = queue.jobs.pop_front() {
                    break job;
                }
                if queue.stop {
                    return;
                }
                queue = inner
                    .queue_cv
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        job();
    }
}
