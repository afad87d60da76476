use crate::{ChunkTransaction, NewRecord, Record, RecordId, RecordStore, Result, TempId};
use core::ops::Bound;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<RecordId, Record>,
    next_id: i64,
}

/// An ordered, thread-safe, in-memory [`RecordStore`].
///
/// Cloning yields another handle to the same records. Primary keys are
/// assigned sequentially from 1 on insert.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one record and returns its assigned key.
    pub fn insert(&self, new: NewRecord) -> RecordId {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = RecordId(inner.next_id);
        inner.records.insert(id, Record::from_new(id, new));
        id
    }

    /// Inserts records in order and returns their assigned keys.
    pub fn insert_all<I>(&self, records: I) -> Vec<RecordId>
    where
        I: IntoIterator<Item = NewRecord>,
    {
        let mut inner = self.inner.write();
        records
            .into_iter()
            .map(|new| {
                inner.next_id += 1;
                let id = RecordId(inner.next_id);
                inner.records.insert(id, Record::from_new(id, new));
                id
            })
            .collect()
    }

    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.inner.read().records.get(&id).cloned()
    }

    /// Snapshot of every record in ascending key order.
    pub fn records(&self) -> Vec<Record> {
        self.inner.read().records.values().cloned().collect()
    }

    pub fn records_for_account(&self, account_id: &str) -> Vec<Record> {
        self.inner
            .read()
            .records
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect()
    }

    pub fn distinct_group_keys(&self) -> HashSet<String> {
        self.inner
            .read()
            .records
            .values()
            .map(|r| r.group_key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn scan_page(&self, after: Option<RecordId>, limit: usize) -> Result<Vec<Record>> {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(self
            .inner
            .read()
            .records
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn distinct_account_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .inner
            .read()
            .records
            .values()
            .map(|r| r.account_id.clone())
            .collect())
    }

    async fn update_temp_id_for_accounts(
        &self,
        temp_id: TempId,
        accounts: &HashSet<String>,
    ) -> Result<u64> {
        let mut updated = 0;
        for record in self.inner.write().records.values_mut() {
            if accounts.contains(&record.account_id) {
                record.temp_id = Some(temp_id);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn begin(&self) -> Result<MemoryTransaction> {
        Ok(MemoryTransaction {
            store: self.clone(),
            staged: Vec::new(),
        })
    }
}

#[derive(Debug)]
enum Staged {
    TempId(RecordId, Option<TempId>),
    Upsert(Record),
}

/// Staged writes against a [`MemoryStore`], applied atomically on commit.
#[derive(Debug)]
pub struct MemoryTransaction {
    store: MemoryStore,
    staged: Vec<Staged>,
}

impl MemoryTransaction {
    /// Number of staged row writes.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }
}

impl ChunkTransaction for MemoryTransaction {
    async fn update_temp_ids(&mut self, records: &[Record]) -> Result<u64> {
        let inner = self.store.inner.read();
        let mut matched = 0;
        for record in records {
            // Like `UPDATE ... WHERE id = ?`, a missing key matches nothing.
            if inner.records.contains_key(&record.id) {
                self.staged.push(Staged::TempId(record.id, record.temp_id));
                matched += 1;
            }
        }
        Ok(matched)
    }

    async fn upsert_records(&mut self, records: &[Record]) -> Result<u64> {
        self.staged
            .extend(records.iter().cloned().map(Staged::Upsert));
        Ok(records.len() as u64)
    }

    async fn commit(self) -> Result<()> {
        let mut inner = self.store.inner.write();
        for staged in self.staged {
            match staged {
                Staged::TempId(id, temp_id) => {
                    if let Some(record) = inner.records.get_mut(&id) {
                        record.temp_id = temp_id;
                    }
                }
                Staged::Upsert(record) => {
                    inner.next_id = inner.next_id.max(record.id.0);
                    inner.records.insert(record.id, record);
                }
            }
        }
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::sample_records;

    fn stamped(mut record: Record, raw: u64) -> Record {
        record.temp_id = Some(TempId::from_raw(raw));
        record
    }

    #[tokio::test]
    async fn scan_pages_by_cursor() {
        let store = MemoryStore::new();
        let ids = store.insert_all(sample_records());
        assert_eq!(ids.first(), Some(&RecordId(1)));

        let first = store.scan_page(None, 4).await.unwrap();
        assert_eq!(first.len(), 4);
        let cursor = first.last().map(|r| r.id);
        let second = store.scan_page(cursor, 4).await.unwrap();
        assert_eq!(second[0].id, RecordId(5));
        let rest = store.scan_page(Some(RecordId(8)), 4).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert!(store.scan_page(Some(RecordId(9)), 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_applies_staged_updates() {
        let store = MemoryStore::new();
        store.insert_all(sample_records());
        let chunk: Vec<_> = store.records().into_iter().map(|r| stamped(r, 3)).collect();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.update_temp_ids(&chunk[..2]).await.unwrap(), 2);
        // Nothing is visible before commit.
        assert!(store.records().iter().all(|r| r.temp_id.is_none()));
        tx.commit().await.unwrap();

        let records = store.records();
        assert_eq!(records[0].temp_id, Some(TempId::from_raw(3)));
        assert_eq!(records[1].temp_id, Some(TempId::from_raw(3)));
        assert_eq!(records[2].temp_id, None);
    }

    #[tokio::test]
    async fn rollback_and_drop_discard_staged_updates() {
        let store = MemoryStore::new();
        store.insert_all(sample_records());
        let chunk: Vec<_> = store.records().into_iter().map(|r| stamped(r, 1)).collect();

        let mut tx = store.begin().await.unwrap();
        tx.update_temp_ids(&chunk).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.upsert_records(&chunk).await.unwrap();
        assert_eq!(tx.staged_len(), chunk.len());
        drop(tx);

        assert!(store.records().iter().all(|r| r.temp_id.is_none()));
    }

    #[tokio::test]
    async fn update_of_missing_key_matches_nothing() {
        let store = MemoryStore::new();
        store.insert(NewRecord::new("org1", "A", "AC101"));
        let ghost = Record {
            id: RecordId(42),
            org_id: "org9".into(),
            group_key: "Z".into(),
            account_id: "AC999".into(),
            temp_id: Some(TempId::from_raw(0)),
        };

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.update_temp_ids(&[ghost.clone()]).await.unwrap(), 0);
        // Upsert inserts it instead.
        assert_eq!(tx.upsert_records(&[ghost]).await.unwrap(), 1);
        tx.commit().await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.insert(NewRecord::new("org1", "A", "AC102")), RecordId(43));
    }

    #[tokio::test]
    async fn account_update_touches_only_listed_accounts() {
        let store = MemoryStore::new();
        store.insert_all(sample_records());
        let accounts: HashSet<String> = ["AC101".to_string(), "AC104".to_string()].into();

        let updated = store
            .update_temp_id_for_accounts(TempId::from_raw(7), &accounts)
            .await
            .unwrap();
        assert_eq!(updated, 4);
        assert!(
            store
                .records_for_account("AC101")
                .iter()
                .all(|r| r.temp_id == Some(TempId::from_raw(7)))
        );
        assert!(
            store
                .records_for_account("AC102")
                .iter()
                .all(|r| r.temp_id.is_none())
        );
        assert_eq!(store.distinct_account_ids().await.unwrap().len(), 4);
        assert_eq!(store.distinct_group_keys().len(), 5);
    }
}
