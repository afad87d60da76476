#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use anyhow::Context;
use clap::Parser;
use config::{BatchConfig, CliArgs, Seed};
use tempgroup::{
    FINALIZE_TEMP_ID_STEP, GROUP_RECORDS_STEP, Job, JobExecution, MemoryStore, NewRecord, Record,
    RecordStore,
    seed::{sample_records, synthetic_records},
};
use telemetry::{TelemetryProviders, init_telemetry, shutdown_telemetry};
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = BatchConfig::try_from(args)?;

    let providers: TelemetryProviders = init_telemetry()?;
    log_startup_info(&config);

    let result = run(&config).await;
    shutdown_telemetry(providers);

    let execution = result?;
    execution.into_result()?;
    Ok(())
}

async fn run(config: &BatchConfig) -> anyhow::Result<JobExecution> {
    #[cfg(feature = "postgres")]
    {
        if let Some(url) = config.database_url.as_deref() {
            let connections = u32::try_from(config.job.max_threads + 1).unwrap_or(u32::MAX);
            let store = tempgroup::PgStore::connect(url, connections)
                .await
                .context("failed to connect to the database")?;
            store
                .ensure_schema()
                .await
                .context("failed to create the `address` table")?;
            let _seeded = store
                .insert_all(&seed_records(config))
                .await
                .context("failed to seed records")?;
            #[cfg(feature = "tracing")]
            tracing::info!("Seeded {_seeded} records into PostgreSQL");

            let execution = run_job(store.clone(), config).await?;
            if config.print_records {
                print_records(&store.records().await?);
            }
            return Ok(execution);
        }
    }

    let store = MemoryStore::new();
    let _seeded = store.insert_all(seed_records(config)).len();
    #[cfg(feature = "tracing")]
    tracing::info!("Seeded {_seeded} records into the in-memory store");

    let execution = run_job(store.clone(), config).await?;
    if config.print_records {
        print_records(&store.records());
    }
    Ok(execution)
}

fn seed_records(config: &BatchConfig) -> Vec<NewRecord> {
    match config.seed {
        Seed::Sample => sample_records(),
        Seed::Synthetic => synthetic_records(config.synthetic_count),
        Seed::None => Vec::new(),
    }
}

/// Runs one job, giving up if the process is told to stop first.
///
/// An interrupted run drops the in-flight chunk transaction, so only chunks
/// that already committed stay written.
async fn run_job<S: RecordStore>(store: S, config: &BatchConfig) -> anyhow::Result<JobExecution> {
    let job = Job::new(store, config.job.clone()).context("invalid job parameters")?;

    let execution = tokio::select! {
        execution = job.run() => execution,
        () = shutdown_signal() => anyhow::bail!("Interrupted before the job finished"),
    };

    record_metrics(&execution);
    report(&execution, config.json)?;
    Ok(execution)
}

fn record_metrics(execution: &JobExecution) {
    if let Some(step) = execution.step(GROUP_RECORDS_STEP) {
        telemetry::increment_records_processed(step.read_count);
        telemetry::increment_chunks_committed(step.commit_count);
        telemetry::increment_chunks_rolled_back(step.rollback_count);
    }
    // The seed draw plus one per collision.
    telemetry::increment_identifiers_minted(execution.collisions + 1);
    telemetry::record_job_duration(execution.elapsed.as_secs_f64() * 1_000.0);
}

fn report(execution: &JobExecution, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(execution)?);
        return Ok(());
    }

    println!("Job status: {}", execution.status);
    for step in &execution.steps {
        println!(
            "  {:<20} {:<10} read={} written={} commits={} rollbacks={}{}",
            step.name,
            step.status.to_string(),
            step.read_count,
            step.write_count,
            step.commit_count,
            step.rollback_count,
            step.failure
                .as_deref()
                .map(|f| format!(" failure=\"{f}\""))
                .unwrap_or_default()
        );
    }
    if let Some(temp_id) = execution.final_temp_id {
        println!(
            "Final temp ID {temp_id} across {} accounts ({} collisions, {} records)",
            execution.known_accounts, execution.collisions, execution.records_processed
        );
    } else if execution.step(FINALIZE_TEMP_ID_STEP).is_some() {
        println!("No final temp ID: finalization did not complete");
    }
    println!("Elapsed: {:?}", execution.elapsed);
    Ok(())
}

fn print_records(records: &[Record]) {
    for record in records {
        println!("{record}");
    }
}

fn log_startup_info(_config: &BatchConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting grouping job with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting grouping job with chunk size {}, page size {} and {} workers",
            _config.job.chunk_size,
            _config.job.page_size,
            _config.job.max_threads
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Received SIGTERM signal");
        },
    }
}
