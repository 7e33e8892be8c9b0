use jiff::civil::date;
use vbc_core::Period;
use vbc_core::models::claim::MedicalClaim;
use vbc_core::models::contract::ContractParams;
use vbc_core::models::dataset::Dataset;
use vbc_core::models::member::Member;
use vbc_core::models::metrics::MetricsReport;
use vbc_core::models::validation::ValidationReport;
use vbc_export::{
    ExportError, JsonRenderer, Renderer, SummaryRenderer, WorkflowSummary, default_renderers,
    renderer_by_name,
};
use vbc_metrics::{AnalysisSettings, analyze};

fn report() -> MetricsReport {
    let members = (0..10)
        .map(|i| Member {
            member_id: format!("M{i}"),
            first_name: None,
            last_name: None,
            date_of_birth: None,
            gender: None,
            attribution_start: Some(date(2024, 1, 1)),
            attribution_end: None,
            pcp_id: None,
            hcc_risk_score: Some(if i < 3 { 2.0 } else { 1.0 }),
            risk_category: None,
        })
        .collect();
    let claims = vec![MedicalClaim {
        claim_id: "C1".to_string(),
        member_id: "M1".to_string(),
        service_date: Some(date(2024, 2, 1)),
        paid_date: Some(date(2024, 2, 20)),
        paid_amount: Some(12_000.0),
        allowed_amount: None,
        primary_diagnosis: None,
        place_of_service: None,
        er_visit: false,
        inpatient_admit: true,
    }];
    let ds = Dataset {
        members,
        medical_claims: claims,
        ..Dataset::default()
    };
    let params = ContractParams::new("ACO-7", 1_200_000.0);
    let period = Period::new(2024, 3).unwrap();
    analyze(&ds, &params, &period, &AnalysisSettings::default()).unwrap()
}

#[test]
fn json_renderer_emits_metrics_object() {
    let metrics = report();
    let summary = WorkflowSummary::new("wf-0123456789ab", &metrics, None);
    let artifact = JsonRenderer.render(&summary).unwrap();

    assert_eq!(artifact.name, "metrics.json");
    assert_eq!(artifact.content_type, "application/json");
    let parsed: MetricsReport = serde_json::from_slice(&artifact.body).unwrap();
    assert_eq!(parsed, metrics);

    let value: serde_json::Value = serde_json::from_slice(&artifact.body).unwrap();
    assert!(value["financial"]["baseline_pmpm"].is_number());
    assert!(value["quality"]["quality_gate_status"].is_string());
    assert!(value["risk"]["high_risk_pct"].is_number());
    assert!(value["predictions"]["probability_meeting_target"].is_number());
}

#[test]
fn summary_renderer_includes_headline_figures() {
    let metrics = report();
    let validation = ValidationReport::default();
    let summary = WorkflowSummary::new("wf-0123456789ab", &metrics, Some(&validation));
    let artifact = SummaryRenderer::new().render(&summary).unwrap();
    let text = String::from_utf8(artifact.body).unwrap();

    assert_eq!(artifact.name, "summary.md");
    assert!(text.starts_with("# ACO-7 performance summary (2024-M03)"));
    assert!(text.contains("wf-0123456789ab"));
    assert!(text.contains("**pending**"));
    assert!(text.contains("3 of 10 members are high-risk"));
    assert!(text.contains("## Data quality"));
    assert!(text.contains("Quality data incomplete"));
}

#[test]
fn custom_template_is_used() {
    let metrics = report();
    let summary = WorkflowSummary::new("wf-1", &metrics, None);
    let renderer = SummaryRenderer::with_template("{{ contract_id }}:{{ metrics.risk.total_members }}");
    let artifact = renderer.render(&summary).unwrap();
    assert_eq!(artifact.body, b"ACO-7:10");
}

#[test]
fn broken_template_is_a_parse_error() {
    let metrics = report();
    let summary = WorkflowSummary::new("wf-1", &metrics, None);
    let err = SummaryRenderer::with_template("{% if %}")
        .render(&summary)
        .unwrap_err();
    assert!(matches!(err, ExportError::TemplateParse(_)));
}

#[test]
fn built_in_renderers_resolve_by_name() {
    let names: Vec<String> = default_renderers()
        .iter()
        .map(|r| r.name().to_string())
        .collect();
    assert_eq!(names, vec!["json", "summary"]);
    assert!(renderer_by_name("summary").is_some());
    assert!(renderer_by_name("pptx").is_none());
}
