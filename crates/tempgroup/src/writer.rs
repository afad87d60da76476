//! Transactional chunk writes.

use crate::{ChunkTransaction, Error, Record, Result};
use core::{fmt, str::FromStr};

/// How a processed chunk is persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum WriteMode {
    /// One batched `temp_id` update keyed by primary key.
    #[default]
    Batch,
    /// Whole-record upsert keyed by primary key.
    Upsert,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Batch => "batch",
            Self::Upsert => "upsert",
        })
    }
}

impl FromStr for WriteMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batch" => Ok(Self::Batch),
            "upsert" => Ok(Self::Upsert),
            other => Err(Error::invalid_config(format!(
                "unknown write mode `{other}` (expected `batch` or `upsert`)"
            ))),
        }
    }
}

/// Writes one chunk inside a caller-owned transaction.
///
/// The writer never commits; the step that opened the transaction decides
/// between commit and rollback based on the returned result.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChunkWriter {
    mode: WriteMode,
}

impl ChunkWriter {
    pub const fn new(mode: WriteMode) -> Self {
        Self { mode }
    }

    pub const fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Persists `chunk` through `tx`.
    ///
    /// Fails with [`Error::WriteMismatch`] if the store applied a different
    /// number of rows than the chunk holds, which leaves the chunk for the
    /// caller to roll back.
    pub async fn write<T>(&self, tx: &mut T, chunk: &[Record], ordinal: u64) -> Result<u64>
    where
        T: ChunkTransaction,
    {
        if chunk.is_empty() {
            return Ok(0);
        }
        let applied = match self.mode {
            WriteMode::Batch => tx.update_temp_ids(chunk).await?,
            WriteMode::Upsert => tx.upsert_records(chunk).await?,
        };
        let expected = chunk.len() as u64;
        if applied != expected {
            return Err(Error::WriteMismatch {
                chunk: ordinal,
                expected,
                applied,
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Chunk {ordinal}: wrote {applied} records ({})", self.mode);

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, NewRecord, Record, RecordId, RecordStore, TempId};

    fn stamped(store: &MemoryStore, raw: u64) -> Vec<Record> {
        store
            .records()
            .into_iter()
            .map(|mut r| {
                r.temp_id = Some(TempId::from_raw(raw));
                r
            })
            .collect()
    }

    #[test]
    fn write_mode_parses_case_insensitively() {
        assert_eq!("batch".parse::<WriteMode>().unwrap(), WriteMode::Batch);
        assert_eq!(" Upsert ".parse::<WriteMode>().unwrap(), WriteMode::Upsert);
        assert!(matches!(
            "merge".parse::<WriteMode>(),
            Err(Error::InvalidConfig { .. })
        ));
        assert_eq!(WriteMode::default().to_string(), "batch");
    }

    #[tokio::test]
    async fn batch_write_updates_only_temp_ids() {
        let store = MemoryStore::new();
        store.insert_all([NewRecord::new("o", "A", "AC1"), NewRecord::new("o", "B", "AC2")]);
        let mut chunk = stamped(&store, 3);
        chunk[0].group_key = "changed".to_string();

        let writer = ChunkWriter::new(WriteMode::Batch);
        let mut tx = store.begin().await.unwrap();
        assert_eq!(writer.write(&mut tx, &chunk, 1).await.unwrap(), 2);
        tx.commit().await.unwrap();

        let first = store.get(RecordId(1)).unwrap();
        assert_eq!(first.temp_id, Some(TempId::from_raw(3)));
        assert_eq!(first.group_key, "A");
    }

    #[tokio::test]
    async fn upsert_write_replaces_whole_records() {
        let store = MemoryStore::new();
        store.insert(NewRecord::new("o", "A", "AC1"));
        let mut chunk = stamped(&store, 1);
        chunk[0].group_key = "changed".to_string();

        let writer = ChunkWriter::new(WriteMode::Upsert);
        let mut tx = store.begin().await.unwrap();
        writer.write(&mut tx, &chunk, 1).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get(RecordId(1)).unwrap(), chunk[0]);
    }

    #[tokio::test]
    async fn short_write_is_a_mismatch() {
        let store = MemoryStore::new();
        store.insert(NewRecord::new("o", "A", "AC1"));
        let mut chunk = stamped(&store, 0);
        let mut ghost = chunk[0].clone();
        ghost.id = RecordId(99);
        chunk.push(ghost);

        let mut tx = store.begin().await.unwrap();
        let err = ChunkWriter::default()
            .write(&mut tx, &chunk, 7)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::WriteMismatch {
                chunk: 7,
                expected: 2,
                applied: 1
            }
        ));
    }

    #[tokio::test]
    async fn empty_chunk_writes_nothing() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        assert_eq!(ChunkWriter::default().write(&mut tx, &[], 1).await.unwrap(), 0);
        assert_eq!(tx.staged_len(), 0);
    }
}
