//! The workflow state machine.
//!
//! A workflow moves through its stages strictly in order. Every transition
//! is written to the state store before the stage body runs, so a process
//! that dies mid-stage re-enters that stage on the next `run`. Stage outputs
//! that later stages read are kept as snapshots, so finished stages never
//! run twice.

use std::collections::BTreeMap;
use std::sync::Arc;

use jiff::civil::Date;
use jiff::{Timestamp, Zoned};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use vbc_core::Period;
use vbc_core::models::contract::ContractParams;
use vbc_core::models::dataset::DatasetKind;
use vbc_core::models::metrics::MetricsReport;
use vbc_core::models::validation::ValidationReport;
use vbc_core::models::workflow::{
    ControlRequest, FailureCause, LogLevel, Stage, StageStatus, WorkflowRequest, WorkflowState,
    WorkflowStatus,
};
use vbc_export::{Renderer, WorkflowSummary};
use vbc_metrics::AnalysisSettings;
use vbc_validation::{RuleSet, Thresholds, ValidationContext};

use crate::error::OrchestratorError;
use crate::events::TransitionEvent;
use crate::retry::RetryPolicy;
use crate::source::DataSource;
use crate::store::{Snapshot, StateStore};

/// What a stage body produced, applied to the state in the same write that
/// marks the stage completed.
enum StageOutput {
    Extracted(BTreeMap<DatasetKind, usize>),
    Validated(ValidationReport),
    /// Validation found unresolved critical problems.
    Rejected(ValidationReport),
    Analyzed(Box<MetricsReport>),
    Reported(Vec<String>),
}

enum StageRun {
    Finished(StageOutput),
    /// A pause or cancel request arrived between attempts.
    Interrupted,
}

pub struct Orchestrator {
    source: Arc<dyn DataSource>,
    store: Arc<dyn StateStore>,
    renderers: Vec<Arc<dyn Renderer>>,
    contracts: BTreeMap<String, ContractParams>,
    rules: RuleSet,
    thresholds: Thresholds,
    expected_volumes: BTreeMap<DatasetKind, usize>,
    analysis: AnalysisSettings,
    retry: RetryPolicy,
    as_of: Option<Date>,
}

impl Orchestrator {
    pub fn new(source: Arc<dyn DataSource>, store: Arc<dyn StateStore>) -> Self {
        Self {
            source,
            store,
            renderers: Vec::new(),
            contracts: BTreeMap::new(),
            rules: RuleSet::standard(),
            thresholds: Thresholds::default(),
            expected_volumes: BTreeMap::new(),
            analysis: AnalysisSettings::default(),
            retry: RetryPolicy::default(),
            as_of: None,
        }
    }

    pub fn with_contract(mut self, params: ContractParams) -> Self {
        self.contracts.insert(params.contract_id.clone(), params);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderers.push(renderer);
        self
    }

    pub fn with_renderers(mut self, renderers: impl IntoIterator<Item = Arc<dyn Renderer>>) -> Self {
        self.renderers.extend(renderers);
        self
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_expected_volumes(mut self, volumes: BTreeMap<DatasetKind, usize>) -> Self {
        self.expected_volumes = volumes;
        self
    }

    pub fn with_analysis_settings(mut self, settings: AnalysisSettings) -> Self {
        self.analysis = settings;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fix the evaluation date used by validation. Defaults to today.
    pub fn with_as_of(mut self, as_of: Date) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    fn contract(&self, contract_id: &str) -> Result<&ContractParams, OrchestratorError> {
        self.contracts
            .get(contract_id)
            .ok_or_else(|| OrchestratorError::UnknownContract {
                contract_id: contract_id.to_string(),
            })
    }

    /// Create and persist a pending workflow.
    pub async fn submit(&self, request: WorkflowRequest) -> Result<WorkflowState, OrchestratorError> {
        self.contract(&request.contract_id)?.validate()?;
        Period::new(request.period.year, request.period.month)?;

        let mut state =
            WorkflowState::new(WorkflowState::generate_id(), &request, Timestamp::now());
        state.log(LogLevel::Info, None, "workflow submitted");
        let state = self.store.put(state).await?;
        TransitionEvent::new(&state, None).emit();
        Ok(state)
    }

    pub async fn status(&self, workflow_id: &str) -> Result<WorkflowState, OrchestratorError> {
        self.load(workflow_id).await
    }

    pub async fn list(&self) -> Result<Vec<WorkflowState>, OrchestratorError> {
        self.store.list().await
    }

    /// Drive a workflow from its persisted position until it completes,
    /// fails, pauses, or is cancelled.
    pub async fn run(&self, workflow_id: &str) -> Result<WorkflowState, OrchestratorError> {
        let state = self.load(workflow_id).await?;
        let from = state.status;
        match from {
            WorkflowStatus::Pending | WorkflowStatus::Running => {}
            s if s.is_active_stage() => {
                info!(workflow_id, status = %s, "re-entering interrupted stage");
            }
            status => {
                return Err(OrchestratorError::InvalidTransition {
                    workflow_id: workflow_id.to_string(),
                    operation: "run",
                    status,
                });
            }
        }

        let state = if from == WorkflowStatus::Pending {
            let state = self
                .commit(state, |s| {
                    if s.status != WorkflowStatus::Pending {
                        return Err(preempted(s));
                    }
                    s.transition_to(WorkflowStatus::Running)?;
                    s.started_at = Some(Timestamp::now());
                    s.log(LogLevel::Info, None, "workflow started");
                    Ok(())
                })
                .await?;
            TransitionEvent::new(&state, Some(from)).emit();
            state
        } else {
            state
        };

        self.drive(state).await
    }

    /// Run the workflow on its own task.
    pub fn spawn(
        self: &Arc<Self>,
        workflow_id: impl Into<String>,
    ) -> JoinHandle<Result<WorkflowState, OrchestratorError>> {
        let this = Arc::clone(self);
        let workflow_id = workflow_id.into();
        tokio::spawn(async move { this.run(&workflow_id).await })
    }

    /// Pause immediately when between stages; otherwise record a request
    /// honored at the next stage boundary.
    pub async fn pause(&self, workflow_id: &str) -> Result<WorkflowState, OrchestratorError> {
        let state = self.load(workflow_id).await?;
        let from = state.status;
        let state = self
            .commit(state, |s| match s.status {
                WorkflowStatus::Pending | WorkflowStatus::Running => {
                    s.transition_to(WorkflowStatus::Paused)?;
                    s.log(LogLevel::Info, None, "workflow paused");
                    Ok(())
                }
                WorkflowStatus::Paused => Ok(()),
                status if status.is_active_stage() => {
                    if s.control.is_none() {
                        s.control = Some(ControlRequest::Pause);
                        s.log(LogLevel::Info, status.stage(), "pause requested");
                    }
                    Ok(())
                }
                status => Err(OrchestratorError::InvalidTransition {
                    workflow_id: s.workflow_id.clone(),
                    operation: "pause",
                    status,
                }),
            })
            .await?;
        if state.status != from {
            TransitionEvent::new(&state, Some(from)).emit();
        }
        Ok(state)
    }

    /// Cancel immediately when not executing a stage; otherwise record a
    /// request honored at the next checkpoint.
    pub async fn cancel(&self, workflow_id: &str) -> Result<WorkflowState, OrchestratorError> {
        let state = self.load(workflow_id).await?;
        let from = state.status;
        let state = self
            .commit(state, |s| match s.status {
                WorkflowStatus::Pending | WorkflowStatus::Running | WorkflowStatus::Paused => {
                    mark_cancelled(s)
                }
                WorkflowStatus::Cancelled => Ok(()),
                status if status.is_active_stage() => {
                    s.control = Some(ControlRequest::Cancel);
                    s.log(LogLevel::Info, status.stage(), "cancel requested");
                    Ok(())
                }
                status => Err(OrchestratorError::InvalidTransition {
                    workflow_id: s.workflow_id.clone(),
                    operation: "cancel",
                    status,
                }),
            })
            .await?;
        if state.status != from {
            TransitionEvent::new(&state, Some(from)).emit();
        }
        Ok(state)
    }

    /// Continue a paused workflow, or retry a failed one from the stage that
    /// failed.
    pub async fn resume(&self, workflow_id: &str) -> Result<WorkflowState, OrchestratorError> {
        let state = self.load(workflow_id).await?;
        let from = state.status;
        let state = self
            .commit(state, |s| match s.status {
                WorkflowStatus::Paused => {
                    s.transition_to(WorkflowStatus::Running)?;
                    s.control = None;
                    s.log(LogLevel::Info, None, "workflow resumed");
                    Ok(())
                }
                WorkflowStatus::Failed => {
                    s.transition_to(WorkflowStatus::Running)?;
                    for record in s
                        .stages
                        .iter_mut()
                        .filter(|r| matches!(r.status, StageStatus::Failed | StageStatus::Skipped))
                    {
                        record.status = StageStatus::Pending;
                        record.attempts = 0;
                        record.started_at = None;
                        record.completed_at = None;
                        record.last_error = None;
                    }
                    s.failure = None;
                    s.completed_at = None;
                    s.control = None;
                    s.log(LogLevel::Info, None, "workflow resumed after failure");
                    Ok(())
                }
                status => Err(OrchestratorError::InvalidTransition {
                    workflow_id: s.workflow_id.clone(),
                    operation: "resume",
                    status,
                }),
            })
            .await?;
        TransitionEvent::new(&state, Some(from)).emit();
        self.drive(state).await
    }

    async fn load(&self, workflow_id: &str) -> Result<WorkflowState, OrchestratorError> {
        let state = self
            .store
            .get(workflow_id)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound {
                workflow_id: workflow_id.to_string(),
            })?;
        state.check_integrity()?;
        Ok(state)
    }

    /// Apply `mutate` and persist. On a revision conflict the mutation is
    /// re-applied once to a freshly read state; a second conflict is fatal.
    async fn commit<F>(
        &self,
        mut state: WorkflowState,
        mutate: F,
    ) -> Result<WorkflowState, OrchestratorError>
    where
        F: Fn(&mut WorkflowState) -> Result<(), OrchestratorError>,
    {
        let workflow_id = state.workflow_id.clone();
        mutate(&mut state)?;
        match self.store.put(state).await {
            Err(OrchestratorError::Conflict { expected, found, .. }) => {
                warn!(
                    workflow_id = %workflow_id,
                    expected,
                    found,
                    "state changed concurrently, re-applying transition"
                );
                let mut fresh = self.load(&workflow_id).await?;
                mutate(&mut fresh)?;
                self.store.put(fresh).await
            }
            other => other,
        }
    }

    async fn drive(&self, mut state: WorkflowState) -> Result<WorkflowState, OrchestratorError> {
        loop {
            state = self.load(&state.workflow_id).await?;
            let workflow_id = state.workflow_id.clone();
            let current = state.status.stage();
            match self.checkpoint(state.clone()).await {
                Ok(Some(done)) => return Ok(done),
                Ok(None) => {}
                Err(e) => return self.escalate(&workflow_id, current, e).await,
            }

            let Some(stage) = state.next_stage() else {
                let from = state.status;
                let result = self
                    .commit(state, |s| {
                        guard_active(s, None)?;
                        if s.status != WorkflowStatus::Running {
                            s.transition_to(WorkflowStatus::Running)?;
                        }
                        s.transition_to(WorkflowStatus::Completed)?;
                        s.completed_at = Some(Timestamp::now());
                        s.log(LogLevel::Info, None, "workflow completed");
                        Ok(())
                    })
                    .await;
                match result {
                    Ok(done) => {
                        TransitionEvent::new(&done, Some(from)).emit();
                        return Ok(done);
                    }
                    Err(OrchestratorError::Preempted { workflow_id, .. }) => {
                        state = self.load(&workflow_id).await?;
                        continue;
                    }
                    Err(e) => return self.escalate(&workflow_id, None, e).await,
                }
            };

            let from = state.status;
            state = match self
                .commit(state, |s| {
                    guard_active(s, Some(stage))?;
                    s.transition_to(stage.active_status())?;
                    s.started_at.get_or_insert_with(Timestamp::now);
                    let record = s.stage_mut(stage)?;
                    record.status = StageStatus::Running;
                    record.attempts = 0;
                    record.started_at = Some(Timestamp::now());
                    record.last_error = None;
                    s.log(LogLevel::Info, Some(stage), format!("{stage} started"));
                    Ok(())
                })
                .await
            {
                Ok(state) => state,
                Err(OrchestratorError::Preempted { workflow_id, .. }) => {
                    // The loop head reloads and honors whatever changed.
                    state = self.load(&workflow_id).await?;
                    continue;
                }
                Err(e) => return self.escalate(&workflow_id, Some(stage), e).await,
            };
            if from != state.status {
                TransitionEvent::new(&state, Some(from)).emit();
            }

            match self.execute_stage(&mut state, stage).await {
                Ok(StageRun::Finished(StageOutput::Rejected(report))) => {
                    let critical = report.unresolved_critical().count();
                    let err = OrchestratorError::DataQuality { critical };
                    return self.fail(state, Some(stage), &err, Some(report)).await;
                }
                Ok(StageRun::Finished(output)) => {
                    state = match self.complete_stage(state, stage, output).await {
                        Ok(state) => state,
                        Err(e) => return self.escalate(&workflow_id, Some(stage), e).await,
                    };
                }
                Ok(StageRun::Interrupted) => {
                    let result = self
                        .commit(state, |s| {
                            let record = s.stage_mut(stage)?;
                            record.status = StageStatus::Pending;
                            record.started_at = None;
                            if s.status.is_active_stage() {
                                s.transition_to(WorkflowStatus::Running)?;
                            }
                            Ok(())
                        })
                        .await;
                    state = match result {
                        Ok(state) => state,
                        Err(e) => return self.escalate(&workflow_id, Some(stage), e).await,
                    };
                }
                Err(e) => return self.fail(state, Some(stage), &e, None).await,
            }
        }
    }

    /// A transition the driver could not persist, even after re-reading, is
    /// recorded as the workflow's failure against a fresh read. If that
    /// write fails too, the original error goes back to the caller.
    async fn escalate(
        &self,
        workflow_id: &str,
        stage: Option<Stage>,
        err: OrchestratorError,
    ) -> Result<WorkflowState, OrchestratorError> {
        let fresh = match self.load(workflow_id).await {
            Ok(fresh) => fresh,
            Err(load_err) => {
                error!(workflow_id, error = %load_err, "cannot re-read state to record failure");
                return Err(err);
            }
        };
        match self.fail(fresh, stage, &err, None).await {
            Ok(failed) => Ok(failed),
            Err(fail_err) => {
                error!(workflow_id, error = %fail_err, "cannot record workflow failure");
                Err(err)
            }
        }
    }

    /// Honor a pending control request or notice a status someone else set.
    /// Returns the state to hand back to the caller when the run must stop.
    async fn checkpoint(
        &self,
        state: WorkflowState,
    ) -> Result<Option<WorkflowState>, OrchestratorError> {
        if state.status.is_terminal() || state.status == WorkflowStatus::Paused {
            return Ok(Some(state));
        }
        let Some(request) = state.control else {
            return Ok(None);
        };

        let from = state.status;
        let state = self
            .commit(state, |s| {
                if s.status.is_terminal() || s.status == WorkflowStatus::Paused {
                    return Ok(());
                }
                match s.control {
                    Some(ControlRequest::Cancel) => mark_cancelled(s),
                    Some(ControlRequest::Pause) => {
                        if let Some(stage) = s.status.stage() {
                            // Unfinished stage is re-entered on resume.
                            s.stage_mut(stage)?.status = StageStatus::Pending;
                            s.transition_to(WorkflowStatus::Running)?;
                        }
                        s.transition_to(WorkflowStatus::Paused)?;
                        s.control = None;
                        s.log(LogLevel::Info, None, "workflow paused at stage boundary");
                        Ok(())
                    }
                    None => Ok(()),
                }
            })
            .await?;
        info!(workflow_id = %state.workflow_id, request = ?request, "control request honored");
        TransitionEvent::new(&state, Some(from)).emit();
        Ok(Some(state))
    }

    /// Run one stage body in a bounded retry loop. Only transient errors are
    /// retried; pause and cancel requests are checked between attempts.
    async fn execute_stage(
        &self,
        state: &mut WorkflowState,
        stage: Stage,
    ) -> Result<StageRun, OrchestratorError> {
        let max_attempts = self.retry.attempts();
        let mut attempt = 1;
        loop {
            *state = self
                .commit(state.clone(), |s| {
                    s.stage_mut(stage)?.attempts = attempt;
                    Ok(())
                })
                .await?;

            let err = match self.stage_body(state, stage).await {
                Ok(output) => return Ok(StageRun::Finished(output)),
                Err(e) => e,
            };
            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }

            let delay = self.retry.delay_after(attempt);
            warn!(
                workflow_id = %state.workflow_id,
                stage = %stage,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "stage attempt failed, retrying"
            );
            let message = err.to_string();
            *state = self
                .commit(state.clone(), |s| {
                    s.stage_mut(stage)?.last_error = Some(message.clone());
                    s.log(
                        LogLevel::Warn,
                        Some(stage),
                        format!("attempt {attempt} failed: {message}"),
                    );
                    Ok(())
                })
                .await?;
            tokio::time::sleep(delay).await;

            *state = self.load(&state.workflow_id).await?;
            if state.control.is_some() {
                return Ok(StageRun::Interrupted);
            }
            attempt += 1;
        }
    }

    async fn stage_body(
        &self,
        state: &WorkflowState,
        stage: Stage,
    ) -> Result<StageOutput, OrchestratorError> {
        match stage {
            Stage::Extraction => self.extract(state).await,
            Stage::Validation => self.validate(state).await,
            Stage::Analysis => self.analyze(state).await,
            Stage::Reporting => self.report(state).await,
        }
    }

    async fn extract(&self, state: &WorkflowState) -> Result<StageOutput, OrchestratorError> {
        let dataset = self.source.fetch(&state.contract_id, state.period).await?;
        self.store
            .put_snapshot(&state.workflow_id, Snapshot::Extracted, &dataset)
            .await?;
        Ok(StageOutput::Extracted(dataset.counts().into_iter().collect()))
    }

    async fn validate(&self, state: &WorkflowState) -> Result<StageOutput, OrchestratorError> {
        let dataset = self.snapshot(state, Snapshot::Extracted).await?;
        let as_of = self.as_of.unwrap_or_else(|| Zoned::now().date());
        let ctx = ValidationContext::new(as_of)
            .with_thresholds(self.thresholds.clone())
            .with_expected_volumes(self.expected_volumes.clone());

        let outcome = vbc_validation::validate(dataset, &self.rules, &ctx)?;
        if !outcome.report.passed() {
            return Ok(StageOutput::Rejected(outcome.report));
        }
        let mut dataset = outcome.dataset;
        let params = self.contract(&state.contract_id)?;
        vbc_metrics::risk::assign_categories(&mut dataset.members, &params.risk_cut_points);
        self.store
            .put_snapshot(&state.workflow_id, Snapshot::Validated, &dataset)
            .await?;
        Ok(StageOutput::Validated(outcome.report))
    }

    async fn analyze(&self, state: &WorkflowState) -> Result<StageOutput, OrchestratorError> {
        let dataset = self.snapshot(state, Snapshot::Validated).await?;
        let params = self.contract(&state.contract_id)?;
        let report = vbc_metrics::analyze(&dataset, params, &state.period, &self.analysis)?;
        Ok(StageOutput::Analyzed(Box::new(report)))
    }

    async fn report(&self, state: &WorkflowState) -> Result<StageOutput, OrchestratorError> {
        let metrics = state
            .metrics
            .as_ref()
            .ok_or_else(|| OrchestratorError::MissingSnapshot {
                workflow_id: state.workflow_id.clone(),
                snapshot: "metrics",
            })?;
        let summary = WorkflowSummary::new(&state.workflow_id, metrics, state.validation.as_ref());

        let mut names = Vec::new();
        for renderer in &self.renderers {
            let artifact = renderer
                .render(&summary)
                .map_err(|source| OrchestratorError::Render {
                    renderer: renderer.name().to_string(),
                    source,
                })?;
            self.store
                .put_artifact(&state.workflow_id, &artifact)
                .await?;
            names.push(artifact.name);
        }
        Ok(StageOutput::Reported(names))
    }

    async fn snapshot(
        &self,
        state: &WorkflowState,
        snapshot: Snapshot,
    ) -> Result<vbc_core::models::dataset::Dataset, OrchestratorError> {
        self.store
            .get_snapshot(&state.workflow_id, snapshot)
            .await?
            .ok_or_else(|| OrchestratorError::MissingSnapshot {
                workflow_id: state.workflow_id.clone(),
                snapshot: snapshot.as_str(),
            })
    }

    async fn complete_stage(
        &self,
        state: WorkflowState,
        stage: Stage,
        output: StageOutput,
    ) -> Result<WorkflowState, OrchestratorError> {
        let from = state.status;
        let state = self
            .commit(state, |s| {
                let message = match &output {
                    StageOutput::Extracted(counts) => {
                        s.records_extracted = counts.clone();
                        let total: usize = counts.values().sum();
                        format!("extracted {total} records")
                    }
                    StageOutput::Validated(report) | StageOutput::Rejected(report) => {
                        s.validation = Some(report.clone());
                        s.remediation_log.extend(report.remediations.iter().cloned());
                        format!(
                            "{} findings, {} records remediated, {} unresolved warnings",
                            report.findings.len(),
                            report.fix_count(),
                            report.unresolved_warnings().count()
                        )
                    }
                    StageOutput::Analyzed(metrics) => {
                        s.metrics = Some(metrics.as_ref().clone());
                        format!(
                            "savings {:.2}%, composite {:.1} ({})",
                            metrics.financial.savings_percentage,
                            metrics.quality.composite_score,
                            metrics.quality.quality_gate_status.as_str()
                        )
                    }
                    StageOutput::Reported(names) => {
                        s.artifacts = names.clone();
                        format!("rendered {} artifacts", names.len())
                    }
                };
                let record = s.stage_mut(stage)?;
                record.status = StageStatus::Completed;
                record.completed_at = Some(Timestamp::now());
                record.last_error = None;
                if s.status.is_active_stage() {
                    s.transition_to(WorkflowStatus::Running)?;
                }
                s.log(LogLevel::Info, Some(stage), format!("{stage} completed: {message}"));
                Ok(())
            })
            .await?;
        TransitionEvent::new(&state, Some(from))
            .with_detail(format!("{stage} completed"))
            .emit();
        Ok(state)
    }

    /// Mark the stage and workflow failed and skip the stages after it.
    async fn fail(
        &self,
        state: WorkflowState,
        stage: Option<Stage>,
        err: &OrchestratorError,
        report: Option<ValidationReport>,
    ) -> Result<WorkflowState, OrchestratorError> {
        let message = err.to_string();
        let kind = err.kind();
        error!(
            workflow_id = %state.workflow_id,
            stage = ?stage,
            kind = ?kind,
            error = %message,
            "workflow failed"
        );

        let from = state.status;
        let state = self
            .commit(state, |s| {
                if s.status.is_terminal() {
                    return Ok(());
                }
                if let Some(report) = &report {
                    s.validation = Some(report.clone());
                    s.remediation_log.extend(report.remediations.iter().cloned());
                }
                if let Some(stage) = stage {
                    let record = s.stage_mut(stage)?;
                    record.status = StageStatus::Failed;
                    record.last_error = Some(message.clone());
                    record.completed_at = Some(Timestamp::now());
                    for later in Stage::ALL.iter().filter(|l| **l > stage) {
                        s.stage_mut(*later)?.status = StageStatus::Skipped;
                    }
                }
                s.transition_to(WorkflowStatus::Failed)?;
                s.failure = Some(FailureCause {
                    stage,
                    kind,
                    message: message.clone(),
                    at: Timestamp::now(),
                });
                s.control = None;
                s.completed_at = Some(Timestamp::now());
                let text = match stage {
                    Some(stage) => format!("{stage} failed: {message}"),
                    None => format!("workflow failed: {message}"),
                };
                s.log(LogLevel::Error, stage, text);
                Ok(())
            })
            .await?;
        TransitionEvent::new(&state, Some(from))
            .with_detail(message)
            .emit();
        Ok(state)
    }
}

fn preempted(s: &WorkflowState) -> OrchestratorError {
    OrchestratorError::Preempted {
        workflow_id: s.workflow_id.clone(),
        status: s.status,
    }
}

/// The driver may only move the workflow while it is running (or re-entering
/// `stage`) and nobody has asked it to stop.
fn guard_active(s: &WorkflowState, stage: Option<Stage>) -> Result<(), OrchestratorError> {
    let running = s.status == WorkflowStatus::Running
        || (s.status.is_active_stage() && (stage.is_none() || s.status.stage() == stage));
    if !running || s.control.is_some() {
        return Err(preempted(s));
    }
    Ok(())
}

fn mark_cancelled(s: &mut WorkflowState) -> Result<(), OrchestratorError> {
    if let Some(stage) = s.status.stage() {
        s.stage_mut(stage)?.status = StageStatus::Pending;
    }
    s.transition_to(WorkflowStatus::Cancelled)?;
    s.control = None;
    s.completed_at = Some(Timestamp::now());
    s.log(LogLevel::Info, None, "workflow cancelled");
    Ok(())
}
