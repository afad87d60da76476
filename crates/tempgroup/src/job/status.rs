use crate::{Error, Result, TempId};
use core::{fmt, time::Duration};
use std::time::Instant;

/// Lifecycle of a job execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum JobStatus {
    Created,
    Running,
    Completed,
    Failed,
}

/// Lifecycle of one step within a job execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Bookkeeping for one step: counts of records read and written, chunk
/// commits and rollbacks, and the failure that stopped it, if any.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StepExecution {
    pub name: &'static str,
    pub status: StepStatus,
    pub read_count: u64,
    pub write_count: u64,
    pub commit_count: u64,
    pub rollback_count: u64,
    pub failure: Option<String>,
    pub elapsed: Duration,
}

impl StepExecution {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            status: StepStatus::Pending,
            read_count: 0,
            write_count: 0,
            commit_count: 0,
            rollback_count: 0,
            failure: None,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn start(&mut self) -> Instant {
        #[cfg(feature = "tracing")]
        tracing::info!("Executing step: [{}]", self.name);
        self.status = StepStatus::Running;
        Instant::now()
    }

    pub(crate) fn finish<T>(&mut self, started: Instant, result: &Result<T>) {
        self.elapsed = started.elapsed();
        match result {
            Ok(_) => {
                self.status = StepStatus::Completed;
                #[cfg(feature = "tracing")]
                tracing::info!(
                    "Step: [{}] executed in {:?} (read {}, written {}, commits {})",
                    self.name,
                    self.elapsed,
                    self.read_count,
                    self.write_count,
                    self.commit_count
                );
            }
            Err(e) => {
                self.status = StepStatus::Failed;
                self.failure = Some(e.to_string());
                #[cfg(feature = "tracing")]
                tracing::error!("Step: [{}] failed after {:?}: {e}", self.name, self.elapsed);
            }
        }
    }
}

/// The outcome of one job run.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct JobExecution {
    pub status: JobStatus,
    pub steps: Vec<StepExecution>,
    /// The last identifier of the run; set once finalization has computed it.
    pub final_temp_id: Option<TempId>,
    pub known_accounts: usize,
    pub collisions: u64,
    pub records_processed: u64,
    pub elapsed: Duration,
    #[cfg_attr(feature = "serde", serde(skip))]
    error: Option<Error>,
}

impl JobExecution {
    pub(crate) fn new(step_names: &[&'static str]) -> Self {
        Self {
            status: JobStatus::Created,
            steps: step_names.iter().copied().map(StepExecution::new).collect(),
            final_temp_id: None,
            known_accounts: 0,
            collisions: 0,
            records_processed: 0,
            elapsed: Duration::ZERO,
            error: None,
        }
    }

    pub(crate) fn fail(&mut self, step: &'static str, source: Error) {
        self.status = JobStatus::Failed;
        self.error = Some(Error::StepFailed {
            step,
            source: Box::new(source),
        });
    }

    pub fn step(&self, name: &str) -> Option<&StepExecution> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub const fn is_completed(&self) -> bool {
        matches!(self.status, JobStatus::Completed)
    }

    /// The error that failed the job, wrapped in [`Error::StepFailed`].
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Converts a failed execution into its error.
    pub fn into_result(mut self) -> Result<Self> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}
