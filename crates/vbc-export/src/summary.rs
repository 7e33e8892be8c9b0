use crate::Renderer;
use crate::artifact::{Artifact, WorkflowSummary};
use crate::error::ExportError;
use crate::render::render_template;

pub const DEFAULT_TEMPLATE: &str = r#"# {{ contract_id }} performance summary ({{ period }})

Workflow `{{ workflow_id }}`

## Financial

| Metric | Value |
|---|---|
| Baseline spending | {{ metrics.financial.baseline_spending | round(precision=2) }} |
| Actual spending | {{ metrics.financial.actual_spending | round(precision=2) }} |
| Total savings | {{ metrics.financial.total_savings | round(precision=2) }} ({{ metrics.financial.savings_percentage | round(precision=2) }}%) |
| Shared savings | {{ metrics.financial.shared_savings_amount | round(precision=2) }} ({{ metrics.financial.shared_savings_status }}) |
| Member-months | {{ metrics.financial.member_months }} |
| Actual PMPM | {{ metrics.financial.actual_pmpm | round(precision=2) }} |
| Target PMPM | {{ metrics.financial.target_pmpm | round(precision=2) }} |
| Admits per 1,000 | {{ metrics.financial.admits_per_1000 | round(precision=1) }} |
| ER visits per 1,000 | {{ metrics.financial.er_visits_per_1000 | round(precision=1) }} |

## Quality

Composite score {{ metrics.quality.composite_score | round(precision=1) }} against a threshold of {{ metrics.quality.quality_threshold }}: **{{ metrics.quality.quality_gate_status }}**.

## Risk

{{ metrics.risk.high_risk_count }} of {{ metrics.risk.total_members }} members are high-risk ({{ metrics.risk.high_risk_pct | round(precision=2) }}%). Average HCC score {{ metrics.risk.average_risk_score | round(precision=3) }}.

## Outlook

Projected year-end savings {{ metrics.predictions.projected_year_end_savings | round(precision=2) }} (95% range {{ metrics.predictions.savings_lower_bound | round(precision=2) }} to {{ metrics.predictions.savings_upper_bound | round(precision=2) }}).
Probability of meeting the savings target: {{ metrics.predictions.probability_meeting_target | round(precision=1) }}%.
{% if metrics.predictions.risks %}
### Risks
{% for r in metrics.predictions.risks %}
- **{{ r.title }}** ({{ r.severity }}): {{ r.description }}. {{ r.impact }}.
{%- endfor %}
{% endif %}{% if metrics.predictions.opportunities %}
### Opportunities
{% for o in metrics.predictions.opportunities %}
- **{{ o.title }}**: {{ o.description }}. {{ o.impact }}.
{%- endfor %}
{% endif %}{% if validation %}
## Data quality

{{ validation.findings | length }} findings, {{ validation.remediations | length }} remediations applied, {{ validation.unresolved | length }} unresolved.
{% endif %}"#;

/// Markdown summary rendered through a Tera template.
#[derive(Debug, Clone)]
pub struct SummaryRenderer {
    template: String,
}

impl SummaryRenderer {
    pub fn new() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl Default for SummaryRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for SummaryRenderer {
    fn name(&self) -> &str {
        "summary"
    }

    fn render(&self, summary: &WorkflowSummary<'_>) -> Result<Artifact, ExportError> {
        let text = render_template("summary.md", &self.template, summary)?;
        Ok(Artifact::new("summary.md", "text/markdown", text.into_bytes()))
    }
}
