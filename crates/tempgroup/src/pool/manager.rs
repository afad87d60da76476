use crate::{Error, Grouper, Record, Result, TempIdGenerator, pool::{WorkRequest, worker_loop}};
use core::time::Duration;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

/// How long shutdown waits for each worker to acknowledge.
const SHUTDOWN_ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// A fixed set of Tokio tasks that stamp records through a shared
/// [`Grouper`].
///
/// Work is handed out round-robin over bounded channels of capacity one, so
/// each worker has at most one queued slice. Once [`shutdown`](Self::shutdown)
/// has run, further submissions fail with [`Error::PoolShutdown`].
pub struct WorkerPool {
    workers: Vec<mpsc::Sender<WorkRequest>>,
    next_worker: AtomicUsize,
    shutdown_token: CancellationToken,
}

impl WorkerPool {
    /// Spawns `num_workers` worker tasks (at least one) on the current Tokio
    /// runtime, all sharing `grouper`.
    pub fn spawn<G>(num_workers: usize, grouper: Arc<Grouper<G>>) -> Self
    where
        G: TempIdGenerator + 'static,
    {
        let num_workers = num_workers.max(1);
        let mut workers = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            // One in-flight slice per worker: `process_chunk` sends at most
            // one slice to each worker and awaits them all before returning.
            let (tx, rx) = mpsc::channel(1);
            workers.push(tx);
            tokio::spawn(worker_loop(worker_id, rx, Arc::clone(&grouper)));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Spawned {num_workers} workers");

        Self {
            workers,
            next_worker: AtomicUsize::new(0),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    fn next_worker_index(&self) -> usize {
        self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len()
    }

    async fn send_to_next_worker(&self, request: WorkRequest) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::PoolShutdown);
        }

        let worker_idx = self.next_worker_index();
        self.workers[worker_idx]
            .send(request)
            .await
            .map_err(|_| Error::ChannelError {
                context: format!("Worker {worker_idx} channel closed"),
            })
    }

    /// Stamps every record of `chunk` and returns them in input order.
    ///
    /// The chunk is split into at most one contiguous slice per worker.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolShutdown`] if the pool has been shut down.
    /// - [`Error::ChannelError`] if a worker exits before answering.
    pub async fn process_chunk(&self, chunk: Vec<Record>) -> Result<Vec<Record>> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::PoolShutdown);
        }
        if chunk.is_empty() {
            return Ok(chunk);
        }

        let total = chunk.len();
        let slice_len = total.div_ceil(self.workers.len());
        let mut records = chunk.into_iter();
        let mut pending = Vec::with_capacity(self.workers.len());

        for slice in 0.. {
            let records: Vec<_> = records.by_ref().take(slice_len).collect();
            if records.is_empty() {
                break;
            }
            let (response, rx) = oneshot::channel();
            self.send_to_next_worker(WorkRequest::Process {
                slice,
                records,
                response,
            })
            .await?;
            pending.push(async move {
                rx.await.map_err(|_| Error::ChannelError {
                    context: format!("Worker dropped slice {slice} without answering"),
                })
            });
        }

        let slices = futures::future::try_join_all(pending).await?;
        let mut stamped = Vec::with_capacity(total);
        for slice in slices {
            stamped.extend(slice);
        }
        Ok(stamped)
    }

    /// Stops every worker.
    ///
    /// Cancels the shared token so no new work is accepted, sends a
    /// [`WorkRequest::Shutdown`] to each worker and waits up to three seconds
    /// per worker for the acknowledgement. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        if self.shutdown_token.is_cancelled() {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Cancelling remaining work via shutdown token");
        self.shutdown_token.cancel();

        let mut shutdown_handles = Vec::with_capacity(self.workers.len());
        for (i, worker) in self.workers.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            if let Err(_e) = worker.send(WorkRequest::Shutdown { response: tx }).await {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to send shutdown to worker {i}: {_e}");
            } else {
                shutdown_handles.push((i, rx));
            }
        }

        let acks = shutdown_handles.into_iter().map(|(_i, rx)| async move {
            match timeout(SHUTDOWN_ACK_TIMEOUT, rx).await {
                Ok(Ok(())) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Worker {_i} shutdown acknowledged");
                }
                Ok(Err(_e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Worker {_i} returned error: {_e}");
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Worker {_i} shutdown timed out");
                }
            }
        });
        futures::future::join_all(acks).await;

        #[cfg(feature = "tracing")]
        tracing::debug!("Worker pool shutdown complete");
    }
}
