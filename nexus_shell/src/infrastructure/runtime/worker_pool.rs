// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Pool
//!
//! Fixed-size pool of OS threads executing submitted closures and handing
//! results back as futures. The engine runs commands inline on the caller
//! thread by default; `execute_async` and independent pipelines fan out
//! here. Bridge surfaces block freely on pool threads - they never run on
//! the async runtime's reactor threads.
//!
//! ## Design
//!
//! - jobs travel over an unbounded crossbeam channel
//! - results come back through tokio oneshot channels, so async callers
//!   simply `.await` the returned [`TaskHandle`]
//! - dropping a [`TaskHandle`] discards the eventual result; a worker that
//!   finishes past its deadline therefore completes into the void
//! - `shutdown` closes the channel and joins every worker

use crossbeam::channel::{unbounded, Receiver, Sender};
use nexus_shell_domain::{ShellError, WorkerCount};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Future for a submitted task's result.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Awaits the task result
    pub async fn join(self) -> Result<T, ShellError> {
        self.receiver
            .await
            .map_err(|_| ShellError::internal_error("worker pool dropped the task result"))
    }

    /// Blocks the current (non-runtime) thread for the result
    pub fn join_blocking(self) -> Result<T, ShellError> {
        self.receiver
            .blocking_recv()
            .map_err(|_| ShellError::internal_error("worker pool dropped the task result"))
    }
}

#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    active: AtomicUsize,
}

/// Fixed-size worker pool.
pub struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<PoolCounters>,
    size: usize,
}

impl WorkerPool {
    /// Starts a pool with `workers` threads
    pub fn new(workers: WorkerCount) -> Self {
        let (sender, receiver) = unbounded::<Job>();
        let counters = Arc::new(PoolCounters::default());
        let size = workers.count();
        let handles = (0..size)
            .map(|index| {
                let receiver: Receiver<Job> = receiver.clone();
                let counters = counters.clone();
                std::thread::Builder::new()
                    .name(format!("nexus-worker-{}", index))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            counters.active.fetch_add(1, Ordering::SeqCst);
                            job();
                            counters.active.fetch_sub(1, Ordering::SeqCst);
                            counters.completed.fetch_add(1, Ordering::Relaxed);
                        }
                    })
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!("Failed to spawn worker thread: {}", e);
                    None
                }
            })
            .collect();
        debug!("Worker pool started with {} threads", size);
        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            counters,
            size,
        }
    }

    /// Submits a closure, returning a future for its result
    pub fn submit<T, F>(&self, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        let wrapped: Job = Box::new(move || {
            let result = job();
            // Receiver may be gone (deadline passed, caller moved on);
            // the result is discarded in that case.
            let _ = tx.send(result);
        });
        match self.sender.lock().as_ref() {
            Some(sender) => {
                if sender.send(wrapped).is_err() {
                    warn!("Worker pool channel closed; task dropped");
                }
            }
            None => warn!("Worker pool already shut down; task dropped"),
        }
        TaskHandle { receiver: rx }
    }

    /// Configured thread count
    pub fn size(&self) -> usize {
        self.size
    }

    /// Tasks currently executing
    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Tasks submitted over the pool's lifetime
    pub fn submitted(&self) -> u64 {
        self.counters.submitted.load(Ordering::Relaxed)
    }

    /// Tasks completed over the pool's lifetime
    pub fn completed(&self) -> u64 {
        self.counters.completed.load(Ordering::Relaxed)
    }

    /// Closes the job channel and joins every worker; idempotent
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_some() {
            for handle in self.workers.lock().drain(..) {
                if handle.join().is_err() {
                    warn!("Worker thread panicked during shutdown");
                }
            }
            debug!("Worker pool shut down");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("active", &self.active())
            .field("submitted", &self.submitted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_and_join() {
        let pool = WorkerPool::new(WorkerCount::new(2));
        let handle = pool.submit(|| 21 * 2);
        assert_eq!(handle.join().await.unwrap(), 42);
        assert_eq!(pool.submitted(), 1);
    }

    #[tokio::test]
    async fn test_many_tasks_complete() {
        let pool = WorkerPool::new(WorkerCount::new(4));
        let handles: Vec<_> = (0..32).map(|i| pool.submit(move || i * 2)).collect();
        let mut total = 0;
        for handle in handles {
            total += handle.join().await.unwrap();
        }
        assert_eq!(total, (0..32).map(|i| i * 2).sum::<i32>());
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let pool = WorkerPool::new(WorkerCount::new(2));
        let handle = pool.submit(|| "done");
        pool.shutdown();
        assert_eq!(handle.join_blocking().unwrap(), "done");
        assert_eq!(pool.completed(), 1);
    }

    #[tokio::test]
    async fn test_dropped_handle_discards_result() {
        let pool = WorkerPool::new(WorkerCount::new(1));
        drop(pool.submit(|| "ignored"));
        // The next task still runs normally.
        let handle = pool.submit(|| 7);
        assert_eq!(handle.join().await.unwrap(), 7);
    }
}
