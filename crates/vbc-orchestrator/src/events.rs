use serde::Serialize;
use tracing::info;
use vbc_core::models::workflow::{Stage, WorkflowState, WorkflowStatus};

/// A structured record of one workflow status change.
///
/// Emitted through `tracing` so every transition lands in the same log
/// stream as the rest of the run, with fields that can be filtered on.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionEvent {
    pub workflow_id: String,
    pub contract_id: String,
    pub from: Option<WorkflowStatus>,
    pub to: WorkflowStatus,
    pub stage: Option<Stage>,
    pub revision: u64,
    pub detail: Option<String>,
}

impl TransitionEvent {
    pub fn new(state: &WorkflowState, from: Option<WorkflowStatus>) -> Self {
        Self {
            workflow_id: state.workflow_id.clone(),
            contract_id: state.contract_id.clone(),
            from,
            to: state.status,
            stage: state.status.stage(),
            revision: state.revision,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn emit(&self) {
        let from = self.from.map(|s| s.as_str()).unwrap_or("none");
        let stage = self.stage.map(|s| s.as_str()).unwrap_or("none");
        info!(
            transition.workflow_id = %self.workflow_id,
            transition.contract_id = %self.contract_id,
            transition.from = from,
            transition.to = %self.to,
            transition.stage = stage,
            transition.revision = self.revision,
            transition.detail = self.detail.as_deref().unwrap_or(""),
            "workflow transition"
        );
    }
}
