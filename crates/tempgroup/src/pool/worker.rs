use crate::{Grouper, TempIdGenerator, pool::WorkRequest};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Worker task that stamps record slices until told to shut down.
///
/// Spawned once per pool slot. The worker holds no grouping state of its own;
/// every decision goes through the shared `grouper`.
pub(crate) async fn worker_loop<G>(
    worker_id: usize,
    mut rx: mpsc::Receiver<WorkRequest>,
    grouper: Arc<Grouper<G>>,
) where
    G: TempIdGenerator,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    while let Some(work) = rx.recv().await {
        match work {
            WorkRequest::Process {
                slice: _slice,
                records,
                response,
            } => {
                let stamped: Vec<_> = records.into_iter().map(|r| grouper.process(r)).collect();
                if response.send(stamped).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Worker {worker_id} could not return slice {_slice}, caller went away");
                }
            }
            WorkRequest::Shutdown { response } => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
}
