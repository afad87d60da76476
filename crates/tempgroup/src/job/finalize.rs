use crate::{Finalized, Grouper, RecordStore, Result, StepExecution, TempIdGenerator};

/// Reconciles the store with the run's final identifier.
///
/// Every record of every known account is set to the last identifier of the
/// run in one bulk write. With no known accounts nothing is written. Running
/// it again without further processing writes the same values.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "finalizeTempIdStep"))]
pub(crate) async fn finalize_temp_ids<S, G>(
    store: &S,
    grouper: &Grouper<G>,
    step: &mut StepExecution,
) -> Result<Finalized>
where
    S: RecordStore,
    G: TempIdGenerator,
{
    let finalized = grouper.finalize();
    step.read_count = finalized.accounts.len() as u64;

    if finalized.accounts.is_empty() {
        #[cfg(feature = "tracing")]
        tracing::info!("No known accounts, skipping finalization write");
        return Ok(finalized);
    }

    let updated = store
        .update_temp_id_for_accounts(finalized.temp_id, &finalized.accounts)
        .await?;
    step.write_count = updated;
    step.commit_count = 1;

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Finalized temp ID {} across {} accounts ({updated} records)",
        finalized.temp_id,
        finalized.accounts.len()
    );

    Ok(finalized)
}
