//! Stateful account-collision grouping.
//!
//! [`Grouper`] wraps a [`RunState`] in a single exclusive lock together with
//! the [`TempIdGenerator`] it mints from. Worker tasks share one grouper via
//! `Arc` and call [`Grouper::process`] concurrently; each call holds the lock
//! for its entire decision, so two workers can never both treat the same
//! account as new, and a collision can never interleave with another
//! worker's assignment.
//!
//! ## Cost
//!
//! Each call is O(1) on top of one hash-set probe. Under contention the lock
//! serializes grouping decisions; only I/O around the grouper runs in
//! parallel.

mod state;

pub use state::*;

use crate::{AtomicTempIdGenerator, RecordStore, Record, TempId, TempIdGenerator};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Processed-record interval at which a state summary is logged.
pub const SUMMARY_FREQUENCY: u64 = 100_000;

/// The result of finalizing a run: the last ID minted and every account known
/// to the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finalized {
    pub temp_id: TempId,
    pub accounts: HashSet<String>,
}

/// Thread-safe grouping front end over one run's [`RunState`].
pub struct Grouper<G = AtomicTempIdGenerator> {
    state: Mutex<RunState>,
    generator: G,
    log_frequency: u64,
}

impl<G: TempIdGenerator> Grouper<G> {
    /// Creates a grouper and seeds the current ID from `generator`.
    ///
    /// `log_frequency` controls how often progress is logged; `0` disables
    /// progress logging.
    pub fn new(generator: G, log_frequency: u64) -> Self {
        let initial = generator.next_id();
        Self {
            state: Mutex::new(RunState::new(initial)),
            generator,
            log_frequency,
        }
    }

    /// Warms the known-account set from a store snapshot.
    ///
    /// The snapshot is only applied when it holds fewer than `threshold`
    /// accounts; above that the set is built incrementally. A failing lookup
    /// is logged and tolerated. Returns the number of accounts preloaded.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, store)))]
    pub async fn preload<S>(&self, store: &S, threshold: usize) -> usize
    where
        S: RecordStore,
    {
        match store.distinct_account_ids().await {
            Ok(accounts) if accounts.len() < threshold => {
                let count = accounts.len();
                self.state.lock().preload(accounts);
                #[cfg(feature = "tracing")]
                tracing::info!("Preloaded {count} existing account IDs");
                count
            }
            Ok(_accounts) => {
                #[cfg(feature = "tracing")]
                tracing::info!(
                    "Skipping preload of {} account IDs (threshold {threshold}), building cache incrementally",
                    _accounts.len()
                );
                0
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Could not preload account IDs, will build cache incrementally: {_e}");
                0
            }
        }
    }

    /// Stamps `record` with the ID its account resolves to in this run.
    pub fn process(&self, mut record: Record) -> Record {
        let mut state = self.state.lock();
        let assignment = state.assign(&record.account_id, &self.generator);
        let _processed = state.processed();

        #[cfg(feature = "tracing")]
        {
            if let Assignment::Collision(_id) = assignment {
                tracing::trace!("Account {} collided, minted {_id}", record.account_id);
            }
            if self.log_frequency > 0 && _processed % self.log_frequency == 0 {
                tracing::info!("Processed {_processed} records");
            }
            if _processed % SUMMARY_FREQUENCY == 0 {
                tracing::info!(
                    "Processed {_processed} records, current temp ID: {}, known accounts: {}",
                    state.current(),
                    state.known_len()
                );
            }
        }
        drop(state);

        record.temp_id = Some(assignment.temp_id());
        record
    }

    /// Returns the final ID together with every known account.
    ///
    /// Does not modify the run state, so calling it again without further
    /// processing yields the same value.
    pub fn finalize(&self) -> Finalized {
        let state = self.state.lock();
        Finalized {
            temp_id: state.current(),
            accounts: state.known_accounts().clone(),
        }
    }

    pub const fn log_frequency(&self) -> u64 {
        self.log_frequency
    }

    pub fn current_temp_id(&self) -> TempId {
        self.state.lock().current()
    }

    pub fn account_temp_id(&self, account_id: &str) -> Option<TempId> {
        self.state.lock().account_temp_id(account_id)
    }

    pub fn known_len(&self) -> usize {
        self.state.lock().known_len()
    }

    pub fn collisions(&self) -> u64 {
        self.state.lock().collisions()
    }

    pub fn processed(&self) -> u64 {
        self.state.lock().processed()
    }
}

#[cfg(test)]
mod tests;
