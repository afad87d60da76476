use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use tempgroup::{
    DEFAULT_CHUNK_SIZE, DEFAULT_LOG_FREQUENCY, DEFAULT_MAX_THREADS, DEFAULT_PAGE_SIZE,
    DEFAULT_PRELOAD_THRESHOLD, JobConfig, WriteMode,
};

/// Records loaded into the store before the job runs.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
    /// The nine-record sample with five account collisions.
    Sample,
    /// `--synthetic-count` generated records.
    Synthetic,
    /// Nothing; run over whatever the store already holds.
    None,
}

/// Runtime configuration for the `tempgroup-batch` binary.
///
/// Every flag can also be set through the environment variable named in its
/// help text. A `.env` file in the working directory is loaded first.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tempgroup-batch",
    version,
    about = "Assigns shared temporary grouping IDs to records with colliding account IDs"
)]
pub struct CliArgs {
    /// Records per transaction.
    ///
    /// Each chunk is stamped by the worker pool and written in one commit.
    ///
    /// Environment variable: `CHUNK_SIZE`
    #[arg(long, env = "CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Records fetched from the store per scan. Must be at least the chunk
    /// size.
    ///
    /// Environment variable: `PAGE_SIZE`
    #[arg(long, env = "PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Number of worker tasks stamping a chunk concurrently.
    ///
    /// With a value of 1 the run is fully deterministic.
    ///
    /// Environment variable: `MAX_THREADS`
    #[arg(long, env = "MAX_THREADS", default_value_t = DEFAULT_MAX_THREADS)]
    pub max_threads: usize,

    /// Log progress every this many processed records.
    ///
    /// Environment variable: `LOG_FREQUENCY`
    #[arg(long, env = "LOG_FREQUENCY", default_value_t = DEFAULT_LOG_FREQUENCY)]
    pub log_frequency: u64,

    /// Warm the known-account set with the store's distinct account IDs
    /// before scanning.
    ///
    /// Environment variable: `PRELOAD`
    #[arg(long, env = "PRELOAD", default_value_t = false)]
    pub preload: bool,

    /// Skip the preload when the store holds this many distinct accounts or
    /// more.
    ///
    /// Environment variable: `PRELOAD_THRESHOLD`
    #[arg(long, env = "PRELOAD_THRESHOLD", default_value_t = DEFAULT_PRELOAD_THRESHOLD)]
    pub preload_threshold: usize,

    /// How chunks are written: `batch` updates `temp_id` by key, `upsert`
    /// saves whole records.
    ///
    /// Environment variable: `WRITE_MODE`
    #[arg(long, env = "WRITE_MODE", default_value_t = String::from("batch"))]
    pub write_mode: String,

    /// Records to load before the run.
    ///
    /// Environment variable: `SEED`
    #[arg(long, env = "SEED", value_enum, default_value_t = Seed::Sample)]
    pub seed: Seed,

    /// Number of records generated by `--seed synthetic`.
    ///
    /// Environment variable: `SYNTHETIC_COUNT`
    #[arg(long, env = "SYNTHETIC_COUNT", default_value_t = 10_000)]
    pub synthetic_count: usize,

    /// PostgreSQL connection string. Without it the job runs against an
    /// in-memory store.
    ///
    /// Environment variable: `DATABASE_URL`
    #[cfg(feature = "postgres")]
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Print every record after the run.
    #[arg(long, default_value_t = false)]
    pub print_records: bool,

    /// Print the execution report as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub job: JobConfig,
    pub seed: Seed,
    pub synthetic_count: usize,
    #[cfg(feature = "postgres")]
    pub database_url: Option<String>,
    pub print_records: bool,
    pub json: bool,
}

impl TryFrom<CliArgs> for BatchConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.seed == Seed::Synthetic && args.synthetic_count == 0 {
            bail!("SYNTHETIC_COUNT must be greater than 0 when seeding synthetic records");
        }

        let write_mode: WriteMode = args.write_mode.parse().context("invalid WRITE_MODE")?;
        let job = JobConfig {
            chunk_size: args.chunk_size,
            page_size: args.page_size,
            max_threads: args.max_threads,
            log_frequency: args.log_frequency,
            preload: args.preload,
            preload_threshold: args.preload_threshold,
            write_mode,
        };
        job.validate().context("invalid job parameters")?;

        Ok(Self {
            job,
            seed: args.seed,
            synthetic_count: args.synthetic_count,
            #[cfg(feature = "postgres")]
            database_url: args.database_url,
            print_records: args.print_records,
            json: args.json,
        })
    }
}
