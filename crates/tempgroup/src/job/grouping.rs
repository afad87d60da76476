use crate::{
    ChunkReader, ChunkTransaction, ChunkWriter, Grouper, JobConfig, RecordStore, Result,
    StepExecution, TempIdGenerator, WorkerPool,
};
use std::sync::Arc;

/// Reads the store chunk by chunk, stamps each chunk through the worker pool
/// and writes it back inside one transaction per chunk.
///
/// The pool is shut down whether or not the step succeeds.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "groupRecordsStep"))]
pub(crate) async fn group_records<S, G>(
    store: &S,
    config: &JobConfig,
    grouper: &Arc<Grouper<G>>,
    step: &mut StepExecution,
) -> Result<()>
where
    S: RecordStore,
    G: TempIdGenerator + 'static,
{
    let pool = WorkerPool::spawn(config.max_threads, Arc::clone(grouper));
    let result = process_chunks(store, config, &pool, step).await;
    pool.shutdown().await;
    result
}

async fn process_chunks<S>(
    store: &S,
    config: &JobConfig,
    pool: &WorkerPool,
    step: &mut StepExecution,
) -> Result<()>
where
    S: RecordStore,
{
    let mut reader = ChunkReader::new(store, config.page_size);
    let writer = ChunkWriter::new(config.write_mode);
    let mut ordinal = 0;

    loop {
        let chunk = reader.read_chunk(config.chunk_size).await?;
        if chunk.is_empty() {
            break;
        }
        ordinal += 1;
        step.read_count += chunk.len() as u64;

        let stamped = pool.process_chunk(chunk).await?;

        let mut tx = store.begin().await?;
        let written = match writer.write(&mut tx, &stamped, ordinal).await {
            Ok(written) => written,
            Err(e) => {
                step.rollback_count += 1;
                #[cfg(feature = "tracing")]
                tracing::warn!("Rolling back chunk {ordinal}: {e}");
                if let Err(_rollback) = tx.rollback().await {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Rollback of chunk {ordinal} failed: {_rollback}");
                }
                return Err(e);
            }
        };

        if let Err(e) = tx.commit().await {
            step.rollback_count += 1;
            #[cfg(feature = "tracing")]
            tracing::warn!("Commit of chunk {ordinal} failed, chunk rolled back: {e}");
            return Err(e);
        }
        step.write_count += written;
        step.commit_count += 1;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Committed chunk {ordinal} ({written} records, {} read so far)",
            step.read_count
        );
    }

    Ok(())
}
