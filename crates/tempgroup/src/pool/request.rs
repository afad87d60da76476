use crate::Record;
use tokio::sync::oneshot;

/// A message sent to a pool worker.
#[derive(Debug)]
pub(crate) enum WorkRequest {
    /// Stamp every record in `records`, in order, and send them back on
    /// `response`.
    Process {
        slice: usize,
        records: Vec<Record>,
        response: oneshot::Sender<Vec<Record>>,
    },

    /// Stop the worker; the worker acknowledges on `response` before exiting.
    Shutdown { response: oneshot::Sender<()> },
}
