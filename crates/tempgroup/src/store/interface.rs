use crate::{Record, RecordId, Result, TempId};
use std::collections::HashSet;

/// Read and bulk-write access to the records being grouped.
///
/// All futures are `Send` so a store can be driven from any Tokio task.
pub trait RecordStore: Send + Sync {
    /// Transaction handle scoping one chunk's writes.
    type Transaction: ChunkTransaction;

    /// Returns up to `limit` records with an ID strictly greater than
    /// `after` (or from the start when `None`), in ascending ID order.
    fn scan_page(
        &self,
        after: Option<RecordId>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Record>>> + Send;

    /// Returns every distinct account ID currently stored.
    fn distinct_account_ids(&self) -> impl Future<Output = Result<HashSet<String>>> + Send;

    /// Sets `temp_id` on every record whose account is in `accounts`.
    ///
    /// Returns the number of rows updated.
    fn update_temp_id_for_accounts(
        &self,
        temp_id: TempId,
        accounts: &HashSet<String>,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Opens a transaction for one chunk.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction>> + Send;
}

/// A unit of atomicity for a chunk write.
///
/// Changes become visible only on [`commit`](Self::commit). Rolling back, or
/// dropping the handle without committing, discards everything staged.
pub trait ChunkTransaction: Send {
    /// Writes each record's `temp_id` by primary key. Returns the number of
    /// rows the update matched.
    fn update_temp_ids(&mut self, records: &[Record]) -> impl Future<Output = Result<u64>> + Send;

    /// Writes each record in full, inserting it if its key is absent. Returns
    /// the number of rows written.
    fn upsert_records(&mut self, records: &[Record]) -> impl Future<Output = Result<u64>> + Send;

    fn commit(self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}
