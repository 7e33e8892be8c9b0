use serde::Serialize;
use vbc_core::models::metrics::MetricsReport;
use vbc_core::models::validation::ValidationReport;

/// A rendered report, ready to be stored or written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name, unique per workflow (e.g. `metrics.json`).
    pub name: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            body,
        }
    }
}

/// Everything a renderer may draw on for one completed analysis.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary<'a> {
    pub workflow_id: &'a str,
    pub contract_id: &'a str,
    /// Display form of the period, e.g. `2024-M11`.
    pub period: String,
    pub metrics: &'a MetricsReport,
    pub validation: Option<&'a ValidationReport>,
}

impl<'a> WorkflowSummary<'a> {
    pub fn new(
        workflow_id: &'a str,
        metrics: &'a MetricsReport,
        validation: Option<&'a ValidationReport>,
    ) -> Self {
        Self {
            workflow_id,
            contract_id: &metrics.contract_id,
            period: metrics.period.to_string(),
            metrics,
            validation,
        }
    }
}
