//! A fixed-size pool of workers bounding how many operations run at once.
//!
//! A channel acts as the shared work queue. Callers box their operation
//! into a job that writes the operation's output into a caller-owned
//! oneshot slot, push the job onto the queue, then wait on the slot.
//! `worker_count` tasks take turns receiving from the queue and each
//! runs one job to completion before receiving the next, so no more than
//! `worker_count` jobs ever execute at the same time.
//!
//! The receiver lock is only held while dequeuing, never while a job runs.
//! A job that panics is caught by its worker, which keeps serving the
//! queue, so the pool never shrinks.

use futures::FutureExt;
use modproxy_api::*;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::{
    sync::mpsc::{channel, Receiver, Sender},
    task::JoinHandle,
};

type Job = BoxFut<'static, ()>;

/// A fixed-size worker pool.
#[derive(Debug)]
pub struct WorkerPool {
    job_tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers draining a queue that holds up to
    /// `queue_len` pending jobs. Must be called within a tokio runtime.
    pub fn new(worker_count: usize, queue_len: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (job_tx, job_rx) = channel::<Job>(queue_len.max(1));
        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));

        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            workers.push(tokio::task::spawn(WorkerPool::worker(
                job_rx.clone(),
            )));
        }

        tracing::debug!(worker_count, "worker pool started");

        Self { job_tx, workers }
    }

    /// The number of workers in this pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Run `fut` on one of the pool's workers, waiting for its output.
    ///
    /// Fails only if the pool has shut down.
    pub async fn run<T, F>(&self, fut: F) -> ProxyResult<T>
    where
        F: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (slot_tx, slot_rx) = tokio::sync::oneshot::channel();
        let job: Job = Box::pin(async move {
            // the caller may have given up waiting, that's fine
            let _ = slot_tx.send(fut.await);
        });

        self.job_tx
            .send(job)
            .await
            .map_err(|_| ProxyError::other("worker pool is closed"))?;

        slot_rx
            .await
            .map_err(|_| ProxyError::other("worker pool dropped the job"))
    }

    async fn worker(job_rx: Arc<tokio::sync::Mutex<Receiver<Job>>>) {
        loop {
            let job = job_rx.lock().await.recv().await;
            match job {
                Some(job) => {
                    // the job's output slot is dropped while unwinding,
                    // so its caller sees the failure
                    if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                        tracing::error!("worker pool job panicked");
                    }
                }
                None => break,
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for w in self.workers.iter() {
            w.abort();
        }
    }
}
