use std::path::{Path, PathBuf};
use std::sync::Arc;

use jiff::civil::Date;
use vbc_core::models::workflow::{WorkflowState, WorkflowStatus};
use vbc_orchestrator::{
    FileStateStore, Orchestrator, StateStore, check_workflow_id, write_atomic,
};
use vbc_storage::{FileDataSource, S3StateStore};

use crate::config::{StoreConfig, VbcConfig};

pub async fn build_store(config: &VbcConfig) -> Arc<dyn StateStore> {
    match &config.store {
        StoreConfig::Local { dir } => Arc::new(FileStateStore::new(dir.clone())),
        StoreConfig::S3 {
            bucket,
            prefix,
            region,
            endpoint_url,
        } => {
            let client =
                vbc_storage::client::build_client(region.as_deref(), endpoint_url.as_deref()).await;
            Arc::new(S3StateStore::new(client, bucket.clone()).with_prefix(prefix.clone()))
        }
    }
}

/// Wire the configured store, data source, renderers and contracts.
pub async fn build_orchestrator(
    config: &VbcConfig,
    as_of: Option<Date>,
) -> eyre::Result<Orchestrator> {
    let store = build_store(config).await;
    let source = Arc::new(FileDataSource::new(config.data_dir.clone()));

    let mut orchestrator = Orchestrator::new(source, store)
        .with_retry(config.retry.clone())
        .with_thresholds(config.validation.thresholds.clone())
        .with_expected_volumes(config.validation.expected_volumes.clone())
        .with_analysis_settings(config.analysis.clone());

    for name in &config.renderers {
        let renderer = vbc_export::renderer_by_name(name)
            .ok_or_else(|| eyre::eyre!("unknown renderer '{name}' in config"))?;
        orchestrator = orchestrator.with_renderer(renderer);
    }
    for (id, params) in &config.contracts {
        if id != &params.contract_id {
            return Err(eyre::eyre!(
                "contract entry '{id}' holds parameters for '{}'",
                params.contract_id
            ));
        }
        params.validate()?;
        orchestrator = orchestrator.with_contract(params.clone());
    }
    if let Some(as_of) = as_of {
        orchestrator = orchestrator.with_as_of(as_of);
    }
    Ok(orchestrator)
}

/// Copy a completed workflow's artifacts to `{output_dir}/{workflow_id}/`.
pub async fn export_artifacts(
    store: &dyn StateStore,
    state: &WorkflowState,
    output_dir: &Path,
) -> eyre::Result<Vec<PathBuf>> {
    if state.status != WorkflowStatus::Completed {
        return Ok(Vec::new());
    }
    check_workflow_id(&state.workflow_id)?;
    let dir = output_dir.join(&state.workflow_id);
    let mut written = Vec::new();
    for name in &state.artifacts {
        let body = store
            .get_artifact(&state.workflow_id, name)
            .await?
            .ok_or_else(|| eyre::eyre!("artifact {name} missing from state store"))?;
        let path = dir.join(name);
        write_atomic(&path, &body).await?;
        tracing::info!(workflow_id = %state.workflow_id, path = %path.display(), "artifact written");
        written.push(path);
    }
    Ok(written)
}

/// A few lines describing where a workflow stands.
pub fn describe(state: &WorkflowState) -> String {
    let mut out = format!(
        "{}  {}  {}  {}\n",
        state.workflow_id, state.contract_id, state.period, state.status
    );
    for record in &state.stages {
        let mut line = format!("  {:<11} {:?}", record.stage.as_str(), record.status);
        if record.attempts > 1 {
            line.push_str(&format!(" ({} attempts)", record.attempts));
        }
        if let Some(err) = &record.last_error {
            line.push_str(&format!(": {err}"));
        }
        out.push_str(&line);
        out.push('\n');
    }
    if let Some(metrics) = &state.metrics {
        let fin = &metrics.financial;
        out.push_str(&format!(
            "  savings {:.2} ({:.2}%), shared savings {:.2} [{:?}], quality {:.1} ({})\n",
            fin.total_savings,
            fin.savings_percentage,
            fin.shared_savings_amount,
            fin.shared_savings_status,
            metrics.quality.composite_score,
            metrics.quality.quality_gate_status.as_str()
        ));
    }
    if let Some(failure) = &state.failure {
        out.push_str(&format!("  failed ({:?}): {}\n", failure.kind, failure.message));
    }
    out
}
