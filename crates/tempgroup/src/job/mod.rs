//! Job orchestration.
//!
//! A [`Job`] runs two steps strictly in sequence over a [`RecordStore`]:
//!
//! 1. [`GROUP_RECORDS_STEP`] scans the store in chunks, stamps every record
//!    with its run-local temporary ID and commits each chunk in its own
//!    transaction.
//! 2. [`FINALIZE_TEMP_ID_STEP`] overwrites the temporary ID of every account
//!    seen during the run with the run's last ID.
//!
//! The job completes only if both steps complete. The first failing step
//! fails the job and later steps stay [`StepStatus::Pending`]. Chunks
//! committed before a failure stay committed.

mod config;
mod finalize;
mod grouping;
mod status;

pub use config::*;
pub use status::*;

use crate::{AtomicTempIdGenerator, Grouper, RecordStore, Result, TempIdGenerator};
use std::{sync::Arc, time::Instant};

pub const GROUP_RECORDS_STEP: &str = "groupRecordsStep";
pub const FINALIZE_TEMP_ID_STEP: &str = "finalizeTempIdStep";

const GROUPING: usize = 0;
const FINALIZATION: usize = 1;

/// A configured grouping job over one store.
///
/// Each call to [`run`](Self::run) builds a fresh [`Grouper`], so runs never
/// share state.
#[derive(Debug)]
pub struct Job<S> {
    store: S,
    config: JobConfig,
}

impl<S: RecordStore> Job<S> {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
    /// `config` fails validation.
    pub fn new(store: S, config: JobConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Runs the job with IDs counted from `T00000000000000`.
    pub async fn run(&self) -> JobExecution {
        self.run_with_generator(AtomicTempIdGenerator::new()).await
    }

    /// Runs the job, minting IDs from `generator`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            skip_all,
            fields(
                chunk_size = self.config.chunk_size,
                page_size = self.config.page_size,
                max_threads = self.config.max_threads,
            )
        )
    )]
    pub async fn run_with_generator<G>(&self, generator: G) -> JobExecution
    where
        G: TempIdGenerator + 'static,
    {
        let started = Instant::now();
        let mut execution = JobExecution::new(&[GROUP_RECORDS_STEP, FINALIZE_TEMP_ID_STEP]);
        execution.status = JobStatus::Running;

        #[cfg(feature = "tracing")]
        tracing::info!("Job launched with parameters: {:?}", self.config);

        let grouper = Arc::new(Grouper::new(generator, self.config.log_frequency));
        if self.config.preload {
            grouper
                .preload(&self.store, self.config.preload_threshold)
                .await;
        }

        let step = &mut execution.steps[GROUPING];
        let step_started = step.start();
        let grouped = grouping::group_records(&self.store, &self.config, &grouper, step).await;
        step.finish(step_started, &grouped);
        execution.records_processed = grouper.processed();
        execution.collisions = grouper.collisions();
        if let Err(e) = grouped {
            execution.fail(GROUP_RECORDS_STEP, e);
            return Self::complete(execution, started);
        }

        let step = &mut execution.steps[FINALIZATION];
        let step_started = step.start();
        let finalized = finalize::finalize_temp_ids(&self.store, &grouper, step).await;
        step.finish(step_started, &finalized);
        match finalized {
            Ok(finalized) => {
                execution.final_temp_id = Some(finalized.temp_id);
                execution.known_accounts = finalized.accounts.len();
                execution.status = JobStatus::Completed;
            }
            Err(e) => execution.fail(FINALIZE_TEMP_ID_STEP, e),
        }

        Self::complete(execution, started)
    }

    fn complete(mut execution: JobExecution, started: Instant) -> JobExecution {
        execution.elapsed = started.elapsed();

        #[cfg(feature = "tracing")]
        {
            match execution.error() {
                None => tracing::info!(
                    "Job completed with status [{}] in {:?}",
                    execution.status,
                    execution.elapsed
                ),
                Some(e) => tracing::error!(
                    "Job completed with status [{}] in {:?}: {e}",
                    execution.status,
                    execution.elapsed
                ),
            }
        }

        execution
    }
}
