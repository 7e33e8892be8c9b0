use thiserror::Error;
use vbc_core::CoreError;
use vbc_core::models::workflow::{ErrorKind, WorkflowStatus};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("workflow not found: {workflow_id}")]
    NotFound { workflow_id: String },

    #[error("invalid workflow id '{workflow_id}'")]
    InvalidWorkflowId { workflow_id: String },

    #[error("no contract parameters configured for {contract_id}")]
    UnknownContract { contract_id: String },

    #[error("cannot {operation} workflow {workflow_id} while it is {status}")]
    InvalidTransition {
        workflow_id: String,
        operation: &'static str,
        status: WorkflowStatus,
    },

    #[error("workflow {workflow_id} was paused or cancelled by another caller (now {status})")]
    Preempted {
        workflow_id: String,
        status: WorkflowStatus,
    },

    #[error("state revision conflict for {workflow_id}: expected {expected}, found {found}")]
    Conflict {
        workflow_id: String,
        expected: u64,
        found: u64,
    },

    #[error("data source error: {0}")]
    DataSource(String),

    #[error("state store error: {0}")]
    Store(String),

    #[error("missing {snapshot} snapshot for {workflow_id}")]
    MissingSnapshot {
        workflow_id: String,
        snapshot: &'static str,
    },

    #[error("validation failed with {critical} unresolved critical findings")]
    DataQuality { critical: usize },

    #[error("calculation error: {0}")]
    Calculation(#[from] vbc_metrics::MetricsError),

    #[error("validation engine error: {0}")]
    Validation(#[from] vbc_validation::ValidationError),

    #[error("renderer '{renderer}' failed: {source}")]
    Render {
        renderer: String,
        #[source]
        source: vbc_export::ExportError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DataSource(_) | Self::Store(_) | Self::Io(_) => ErrorKind::Transient,
            // Renderers are pure; writing the artifact is a store error.
            Self::Render { .. } => ErrorKind::Permanent,
            Self::DataQuality { .. } => ErrorKind::DataQuality,
            Self::Calculation(_) => ErrorKind::Calculation,
            Self::Conflict { .. } => ErrorKind::ConcurrencyConflict,
            Self::NotFound { .. }
            | Self::InvalidWorkflowId { .. }
            | Self::UnknownContract { .. }
            | Self::InvalidTransition { .. }
            | Self::Preempted { .. }
            | Self::MissingSnapshot { .. }
            | Self::Validation(_)
            | Self::Core(_)
            | Self::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Only transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// Storage SDK errors often have terse `Display` impls (e.g. "service error")
/// but useful detail in the source chain.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
