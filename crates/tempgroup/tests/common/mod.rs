//! Fault-injecting record store shared by the integration tests.

#![allow(dead_code)]

use portable_atomic::{AtomicU64, Ordering};
use std::{collections::HashSet, sync::Arc};
use tempgroup::{
    ChunkTransaction, Error, MemoryStore, MemoryTransaction, Record, RecordId, RecordStore,
    Result, TempId,
};

/// Which operations a [`FlakyStore`] fails.
///
/// Chunk ordinals count transactions in the order they are begun, from 1.
#[derive(Clone, Debug, Default)]
pub struct Faults {
    pub fail_preload: bool,
    pub fail_write_on_chunk: Option<u64>,
    pub fail_commit_on_chunk: Option<u64>,
    pub fail_finalization: bool,
}

#[derive(Clone, Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    faults: Faults,
    begun: Arc<AtomicU64>,
    rollbacks: Arc<AtomicU64>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore, faults: Faults) -> Self {
        Self {
            inner,
            faults,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn transactions_begun(&self) -> u64 {
        self.begun.load(Ordering::Relaxed)
    }

    pub fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }
}

fn injected(operation: &'static str) -> Error {
    Error::store(operation, "injected failure")
}

impl RecordStore for FlakyStore {
    type Transaction = FlakyTransaction;

    async fn scan_page(&self, after: Option<RecordId>, limit: usize) -> Result<Vec<Record>> {
        self.inner.scan_page(after, limit).await
    }

    async fn distinct_account_ids(&self) -> Result<HashSet<String>> {
        if self.faults.fail_preload {
            return Err(injected("distinct_account_ids"));
        }
        self.inner.distinct_account_ids().await
    }

    async fn update_temp_id_for_accounts(
        &self,
        temp_id: TempId,
        accounts: &HashSet<String>,
    ) -> Result<u64> {
        if self.faults.fail_finalization {
            return Err(injected("update_temp_id_for_accounts"));
        }
        self.inner.update_temp_id_for_accounts(temp_id, accounts).await
    }

    async fn begin(&self) -> Result<FlakyTransaction> {
        let ordinal = self.begun.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(FlakyTransaction {
            inner: self.inner.begin().await?,
            ordinal,
            faults: self.faults.clone(),
            rollbacks: Arc::clone(&self.rollbacks),
        })
    }
}

pub struct FlakyTransaction {
    inner: MemoryTransaction,
    ordinal: u64,
    faults: Faults,
    rollbacks: Arc<AtomicU64>,
}

impl FlakyTransaction {
    fn fails_write(&self) -> bool {
        self.faults.fail_write_on_chunk == Some(self.ordinal)
    }
}

impl ChunkTransaction for FlakyTransaction {
    async fn update_temp_ids(&mut self, records: &[Record]) -> Result<u64> {
        if self.fails_write() {
            return Err(injected("update_temp_ids"));
        }
        self.inner.update_temp_ids(records).await
    }

    async fn upsert_records(&mut self, records: &[Record]) -> Result<u64> {
        if self.fails_write() {
            return Err(injected("upsert_records"));
        }
        self.inner.upsert_records(records).await
    }

    async fn commit(self) -> Result<()> {
        if self.faults.fail_commit_on_chunk == Some(self.ordinal) {
            // Dropping the staged writes is the rollback.
            self.rollbacks.fetch_add(1, Ordering::Relaxed);
            return Err(injected("commit"));
        }
        self.inner.commit().await
    }

    async fn rollback(self) -> Result<()> {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
        self.inner.rollback().await
    }
}

/// Asserts that every pair of records sharing an account shares a temp ID.
pub fn assert_accounts_share_ids(records: &[Record]) {
    let mut seen = std::collections::HashMap::new();
    for record in records {
        let temp_id = record.temp_id.expect("record left without a temp ID");
        let first = *seen.entry(record.account_id.clone()).or_insert(temp_id);
        assert_eq!(
            first, temp_id,
            "account {} carries both {first} and {temp_id}",
            record.account_id
        );
    }
}
