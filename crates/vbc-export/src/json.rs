use crate::Renderer;
use crate::artifact::{Artifact, WorkflowSummary};
use crate::error::ExportError;

/// The metrics object as pretty-printed JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn name(&self) -> &str {
        "json"
    }

    fn render(&self, summary: &WorkflowSummary<'_>) -> Result<Artifact, ExportError> {
        let body = serde_json::to_vec_pretty(summary.metrics)?;
        Ok(Artifact::new("metrics.json", "application/json", body))
    }
}
