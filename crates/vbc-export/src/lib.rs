//! vbc-export
//!
//! Reporting collaborators. Each renderer turns a finished analysis into one
//! artifact; callers never branch on which renderers are configured.

pub mod artifact;
pub mod error;
pub mod json;
pub mod render;
pub mod summary;

use std::sync::Arc;

pub use artifact::{Artifact, WorkflowSummary};
pub use error::ExportError;
pub use json::JsonRenderer;
pub use summary::SummaryRenderer;

pub trait Renderer: Send + Sync {
    /// Short identifier used in logs and configuration.
    fn name(&self) -> &str;

    fn render(&self, summary: &WorkflowSummary<'_>) -> Result<Artifact, ExportError>;
}

/// The renderers enabled when nothing else is configured.
pub fn default_renderers() -> Vec<Arc<dyn Renderer>> {
    vec![
        Arc::new(JsonRenderer),
        Arc::new(SummaryRenderer::new()),
    ]
}

/// Look up a built-in renderer by name.
pub fn renderer_by_name(name: &str) -> Option<Arc<dyn Renderer>> {
    match name {
        "json" => Some(Arc::new(JsonRenderer)),
        "summary" => Some(Arc::new(SummaryRenderer::new())),
        _ => None,
    }
}
