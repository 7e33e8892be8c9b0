use std::collections::BTreeMap;
use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::dataset::DatasetKind;
use super::metrics::MetricsReport;
use super::validation::{RemediationAction, ValidationReport};
use crate::error::CoreError;
use crate::period::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    /// Between stages.
    Running,
    Extracting,
    Validating,
    Analyzing,
    Reporting,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// A stage body is (or was, before a crash) executing.
    pub fn is_active_stage(&self) -> bool {
        self.stage().is_some()
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Extracting => Some(Stage::Extraction),
            Self::Validating => Some(Stage::Validation),
            Self::Analyzing => Some(Stage::Analysis),
            Self::Reporting => Some(Stage::Reporting),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: WorkflowStatus) -> bool {
        use WorkflowStatus::*;
        match (self, next) {
            (Pending, Running | Paused | Cancelled) => true,
            (Running, Extracting | Validating | Analyzing | Reporting) => true,
            (Running, Paused | Completed | Failed | Cancelled) => true,
            // Re-entering the same stage after a crash.
            (s, n) if s.is_active_stage() && *s == n => true,
            (s, Running | Failed | Cancelled) if s.is_active_stage() => true,
            (Paused, Running | Cancelled) => true,
            // Explicit resume-from-failure.
            (Failed, Running) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Extracting => "extracting",
            Self::Validating => "validating",
            Self::Analyzing => "analyzing",
            Self::Reporting => "reporting",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Validation,
    Analysis,
    Reporting,
}

impl Stage {
    /// Execution order.
    pub const ALL: [Stage; 4] = [
        Stage::Extraction,
        Stage::Validation,
        Stage::Analysis,
        Stage::Reporting,
    ];

    pub fn active_status(&self) -> WorkflowStatus {
        match self {
            Self::Extraction => WorkflowStatus::Extracting,
            Self::Validation => WorkflowStatus::Validating,
            Self::Analysis => WorkflowStatus::Analyzing,
            Self::Reporting => WorkflowStatus::Reporting,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Validation => "validation",
            Self::Analysis => "analysis",
            Self::Reporting => "reporting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    /// Attempts made by the current (or last) run of this stage.
    pub attempts: u32,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub last_error: Option<String>,
}

impl StageRecord {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            status: StageStatus::Pending,
            attempts: 0,
            started_at: None,
            completed_at: None,
            last_error: None,
        }
    }
}

/// A pause or cancel request recorded while a stage is executing, honored at
/// the next checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlRequest {
    Pause,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    DataQuality,
    Calculation,
    ConcurrencyConflict,
    /// Fails the same way on every attempt, such as a broken report template.
    Permanent,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureCause {
    pub stage: Option<Stage>,
    pub kind: ErrorKind,
    pub message: String,
    pub at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: Timestamp,
    pub level: LogLevel,
    pub stage: Option<Stage>,
    pub message: String,
}

/// Request to analyze one contract for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub contract_id: String,
    pub period: Period,
}

/// Persisted workflow state. Mutated only by the orchestrator and written
/// after every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub workflow_id: String,
    pub contract_id: String,
    pub period: Period,
    pub status: WorkflowStatus,
    pub stages: Vec<StageRecord>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub records_extracted: BTreeMap<DatasetKind, usize>,
    #[serde(default)]
    pub validation: Option<ValidationReport>,
    #[serde(default)]
    pub metrics: Option<MetricsReport>,
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Append-only.
    #[serde(default)]
    pub remediation_log: Vec<RemediationAction>,
    /// Append-only.
    #[serde(default)]
    pub events: Vec<LogEntry>,
    #[serde(default)]
    pub control: Option<ControlRequest>,
    #[serde(default)]
    pub failure: Option<FailureCause>,
    /// Incremented by the state store on every accepted write.
    #[serde(default)]
    pub revision: u64,
}

impl WorkflowState {
    pub fn new(workflow_id: impl Into<String>, request: &WorkflowRequest, now: Timestamp) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            contract_id: request.contract_id.clone(),
            period: request.period,
            status: WorkflowStatus::Pending,
            stages: Stage::ALL.iter().map(|s| StageRecord::new(*s)).collect(),
            created_at: now,
            started_at: None,
            completed_at: None,
            records_extracted: BTreeMap::new(),
            validation: None,
            metrics: None,
            artifacts: Vec::new(),
            remediation_log: Vec::new(),
            events: Vec::new(),
            control: None,
            failure: None,
            revision: 0,
        }
    }

    /// `wf-` followed by 12 hex characters.
    pub fn generate_id() -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        format!("wf-{}", &hex[..12])
    }

    pub fn stage(&self, stage: Stage) -> Result<&StageRecord, CoreError> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .ok_or_else(|| self.missing_stage(stage))
    }

    pub fn stage_mut(&mut self, stage: Stage) -> Result<&mut StageRecord, CoreError> {
        let err = self.missing_stage(stage);
        self.stages.iter_mut().find(|r| r.stage == stage).ok_or(err)
    }

    fn missing_stage(&self, stage: Stage) -> CoreError {
        CoreError::CorruptState {
            workflow_id: self.workflow_id.clone(),
            reason: format!("no record for stage {stage}"),
        }
    }

    /// A persisted state must hold exactly one record per stage, in stage
    /// order. Anything else was written by hand or by a broken store.
    pub fn check_integrity(&self) -> Result<(), CoreError> {
        let stages: Vec<Stage> = self.stages.iter().map(|r| r.stage).collect();
        if stages != Stage::ALL {
            return Err(CoreError::CorruptState {
                workflow_id: self.workflow_id.clone(),
                reason: format!("stage records {stages:?} do not match {:?}", Stage::ALL),
            });
        }
        Ok(())
    }

    /// The first stage not yet completed or skipped.
    pub fn next_stage(&self) -> Option<Stage> {
        self.stages
            .iter()
            .find(|r| !r.status.is_done())
            .map(|r| r.stage)
    }

    pub fn transition_to(&mut self, next: WorkflowStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                workflow_id: self.workflow_id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn log(&mut self, level: LogLevel, stage: Option<Stage>, message: impl Into<String>) {
        self.events.push(LogEntry {
            at: Timestamp::now(),
            level,
            stage,
            message: message.into(),
        });
    }
}
