use std::collections::BTreeMap;

use jiff::civil::date;
use vbc_cli::app;
use vbc_cli::config::{StoreConfig, VbcConfig};
use vbc_core::Period;
use vbc_core::models::contract::ContractParams;
use vbc_core::models::workflow::{WorkflowRequest, WorkflowStatus};

const MEMBERS: &str = r#"[
  {"member_id": "M1", "first_name": "Pat", "last_name": "Doe", "date_of_birth": "1950-01-01",
   "gender": "F", "attribution_start": "2024-01-01", "hcc_risk_score": 1.0},
  {"member_id": "M2", "first_name": "Sam", "last_name": "Roe", "date_of_birth": "1948-06-30",
   "gender": "M", "attribution_start": "2024-01-01", "hcc_risk_score": 2.5}
]"#;

const MEDICAL: &str = r#"[
  {"claim_id": "C1", "member_id": "M1", "service_date": "2024-02-03", "paid_date": "2024-02-20",
   "paid_amount": 1250.0},
  {"claim_id": "C2", "member_id": "M2", "service_date": "2024-03-07", "paid_date": "2024-03-25",
   "paid_amount": 800.0, "er_visit": true}
]"#;

const PHARMACY: &str = r#"[
  {"claim_id": "R1", "member_id": "M1", "fill_date": "2024-03-01", "paid_amount": 12.0,
   "drug_name": "metformin", "generic": true}
]"#;

fn config_in(root: &std::path::Path) -> VbcConfig {
    let mut contracts = BTreeMap::new();
    contracts.insert("ACO-1".to_string(), ContractParams::new("ACO-1", 100_000.0));
    VbcConfig {
        data_dir: root.join("data"),
        output_dir: root.join("reports"),
        store: StoreConfig::Local {
            dir: root.join("state"),
        },
        contracts,
        ..VbcConfig::default()
    }
}

#[tokio::test]
async fn configured_run_writes_artifacts_to_output_dir() {
    let root = tempfile::tempdir().unwrap();
    let extract = root.path().join("data").join("ACO-1").join("2024-03");
    std::fs::create_dir_all(&extract).unwrap();
    std::fs::write(extract.join("members.json"), MEMBERS).unwrap();
    std::fs::write(extract.join("medical_claims.json"), MEDICAL).unwrap();
    std::fs::write(extract.join("pharmacy_claims.json"), PHARMACY).unwrap();

    let cfg = config_in(root.path());
    let orch = app::build_orchestrator(&cfg, Some(date(2024, 4, 1)))
        .await
        .unwrap();
    let wf = orch
        .submit(WorkflowRequest {
            contract_id: "ACO-1".to_string(),
            period: Period::new(2024, 3).unwrap(),
        })
        .await
        .unwrap();
    let done = orch.run(&wf.workflow_id).await.unwrap();
    assert_eq!(done.status, WorkflowStatus::Completed, "{}", app::describe(&done));

    let written = app::export_artifacts(orch.store().as_ref(), &done, &cfg.output_dir)
        .await
        .unwrap();
    assert_eq!(written.len(), 2);
    let out = root.path().join("reports").join(&done.workflow_id);
    assert!(out.join("metrics.json").is_file());
    assert!(out.join("summary.md").is_file());

    let text = app::describe(&done);
    assert!(text.contains(&done.workflow_id));
    assert!(text.contains("completed"));
}

#[tokio::test]
async fn unknown_renderer_is_a_config_error() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config_in(root.path());
    cfg.renderers.push("pdf".to_string());
    let err = app::build_orchestrator(&cfg, None).await.err().unwrap();
    assert!(err.to_string().contains("unknown renderer 'pdf'"));
}

#[tokio::test]
async fn mismatched_contract_key_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let mut cfg = config_in(root.path());
    cfg.contracts
        .insert("ACO-2".to_string(), ContractParams::new("ACO-3", 1.0));
    assert!(app::build_orchestrator(&cfg, None).await.is_err());
}
