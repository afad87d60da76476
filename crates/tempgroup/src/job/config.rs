use crate::{Error, Result, WriteMode};

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_PAGE_SIZE: usize = 10_000;
pub const DEFAULT_MAX_THREADS: usize = 4;
pub const DEFAULT_LOG_FREQUENCY: u64 = 10_000;
pub const DEFAULT_PRELOAD_THRESHOLD: usize = 100_000;

/// Parameters of one grouping job.
///
/// `page_size` drives how many records are fetched per scan; `chunk_size`
/// drives commit granularity and must not exceed it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobConfig {
    pub chunk_size: usize,
    pub page_size: usize,
    pub max_threads: usize,
    pub log_frequency: u64,
    /// Warm the known-account set from the store before scanning.
    ///
    /// Off by default: a snapshot of the store about to be scanned makes
    /// every first sighting a collision.
    pub preload: bool,
    /// Snapshots with this many accounts or more are not preloaded.
    pub preload_threshold: usize,
    pub write_mode: WriteMode,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            max_threads: DEFAULT_MAX_THREADS,
            log_frequency: DEFAULT_LOG_FREQUENCY,
            preload: false,
            preload_threshold: DEFAULT_PRELOAD_THRESHOLD,
            write_mode: WriteMode::Batch,
        }
    }
}

impl JobConfig {
    /// Checks the constraints between parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when a size, the thread count or the
    /// log frequency is zero, or when `page_size < chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::invalid_config("chunk size must be greater than 0"));
        }
        if self.page_size == 0 {
            return Err(Error::invalid_config("page size must be greater than 0"));
        }
        if self.max_threads == 0 {
            return Err(Error::invalid_config("max threads must be greater than 0"));
        }
        if self.log_frequency == 0 {
            return Err(Error::invalid_config("log frequency must be greater than 0"));
        }
        if self.page_size < self.chunk_size {
            return Err(Error::invalid_config(format!(
                "page size ({}) must be at least the chunk size ({})",
                self.page_size, self.chunk_size
            )));
        }
        Ok(())
    }

    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub const fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    #[must_use]
    pub const fn with_log_frequency(mut self, log_frequency: u64) -> Self {
        self.log_frequency = log_frequency;
        self
    }

    #[must_use]
    pub const fn with_preload(mut self, preload: bool, threshold: usize) -> Self {
        self.preload = preload;
        self.preload_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }
}
