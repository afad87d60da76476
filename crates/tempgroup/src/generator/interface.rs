use crate::TempId;

/// A minimal interface for minting temporary grouping IDs.
///
/// Implementations must be safe to share across worker threads: concurrent
/// callers never observe the same value twice, and values are handed out in
/// strictly increasing order.
pub trait TempIdGenerator: Send + Sync {
    /// Mints the next ID.
    fn next_id(&self) -> TempId;
}

impl<G: TempIdGenerator + ?Sized> TempIdGenerator for &G {
    fn next_id(&self) -> TempId {
        (**self).next_id()
    }
}
