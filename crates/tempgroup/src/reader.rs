//! Paged, exactly-once reading of a [`RecordStore`].
//!
//! [`ChunkReader`] pulls pages of `page_size` records with keyset pagination
//! on the primary key and hands them out in chunks. Only one page is held in
//! memory at a time, and the cursor only moves forward, so a write to an
//! already-read record can never make it reappear or shift a later one out of
//! the scan.

use crate::{Error, Record, RecordId, RecordStore, Result};
use std::collections::VecDeque;

pub struct ChunkReader<'a, S> {
    store: &'a S,
    page_size: usize,
    cursor: Option<RecordId>,
    buffer: VecDeque<Record>,
    exhausted: bool,
}

impl<'a, S: RecordStore> ChunkReader<'a, S> {
    pub fn new(store: &'a S, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Returns the next chunk of at most `chunk_size` records.
    ///
    /// An empty chunk signals the end of the scan.
    pub async fn read_chunk(&mut self, chunk_size: usize) -> Result<Vec<Record>> {
        let chunk_size = chunk_size.max(1);
        let mut chunk = Vec::with_capacity(chunk_size);
        while chunk.len() < chunk_size {
            if self.buffer.is_empty() && !self.fill().await? {
                break;
            }
            let take = (chunk_size - chunk.len()).min(self.buffer.len());
            chunk.extend(self.buffer.drain(..take));
        }
        Ok(chunk)
    }

    /// Key of the last record fetched from the store.
    pub const fn cursor(&self) -> Option<RecordId> {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.buffer.is_empty()
    }

    /// Rewinds to the start of the store and drops any buffered page.
    pub fn reset(&mut self) {
        self.cursor = None;
        self.buffer.clear();
        self.exhausted = false;
    }

    /// Fetches the next page. Returns `false` once the store is drained.
    async fn fill(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let page = self.store.scan_page(self.cursor, self.page_size).await?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        for record in &page {
            if self.cursor.is_some_and(|cursor| record.id <= cursor) {
                return Err(Error::OutOfOrderScan {
                    id: record.id,
                    cursor: self.cursor,
                });
            }
            self.cursor = Some(record.id);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Fetched page of {} records, cursor now {:?}",
            page.len(),
            self.cursor
        );

        let fetched = !page.is_empty();
        self.buffer.extend(page);
        Ok(fetched)
    }
}
