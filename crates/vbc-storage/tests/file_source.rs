use std::path::Path;

use vbc_core::Period;
use vbc_orchestrator::{DataSource, OrchestratorError};
use vbc_storage::FileDataSource;
use vbc_storage::s3_store::object_key;

const MEMBERS: &str = r#"[
  {"member_id": "M1", "first_name": "Pat", "last_name": "Doe", "date_of_birth": "1950-01-01",
   "gender": "F", "attribution_start": "2024-01-01", "hcc_risk_score": 1.2},
  {"member_id": "M2", "gender": "M", "hcc_risk_score": 0.8}
]"#;

const MEDICAL: &str = r#"[
  {"claim_id": "C1", "member_id": "M1", "service_date": "2024-02-03", "paid_date": "2024-02-20",
   "paid_amount": 125.5, "er_visit": true}
]"#;

fn period() -> Period {
    Period::new(2024, 3).unwrap()
}

fn write_extract(root: &Path, contract: &str) {
    let dir = root.join(contract).join("2024-03");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("members.json"), MEMBERS).unwrap();
    std::fs::write(dir.join("medical_claims.json"), MEDICAL).unwrap();
}

#[tokio::test]
async fn reads_collections_and_defaults_missing_files() {
    let root = tempfile::tempdir().unwrap();
    write_extract(root.path(), "ACO-1");
    let source = FileDataSource::new(root.path());

    let ds = source.fetch("ACO-1", period()).await.unwrap();
    assert_eq!(ds.members.len(), 2);
    assert_eq!(ds.members[1].first_name, None);
    assert_eq!(ds.medical_claims.len(), 1);
    assert!(ds.medical_claims[0].er_visit);
    assert!(!ds.medical_claims[0].inpatient_admit);
    assert!(ds.pharmacy_claims.is_empty());
    assert!(ds.quality_measures.is_empty());
}

#[tokio::test]
async fn missing_period_is_a_source_error() {
    let root = tempfile::tempdir().unwrap();
    write_extract(root.path(), "ACO-1");
    let source = FileDataSource::new(root.path());

    let err = source
        .fetch("ACO-1", Period::new(2024, 4).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::DataSource(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn malformed_file_is_not_retried() {
    let root = tempfile::tempdir().unwrap();
    write_extract(root.path(), "ACO-1");
    std::fs::write(
        root.path().join("ACO-1/2024-03/pharmacy_claims.json"),
        "{not json",
    )
    .unwrap();
    let source = FileDataSource::new(root.path());

    let err = source.fetch("ACO-1", period()).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Serialization(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn contract_ids_cannot_leave_the_root() {
    let root = tempfile::tempdir().unwrap();
    let source = FileDataSource::new(root.path());
    for bad in ["", "../etc", "a/b", ".hidden"] {
        assert!(source.extract_dir(bad, period()).is_err(), "{bad:?}");
    }
    assert_eq!(
        source.extract_dir("ACO-1", period()).unwrap(),
        root.path().join("ACO-1").join("2024-03")
    );
}

#[test]
fn object_keys_respect_prefix() {
    assert_eq!(object_key("", "workflows/wf-1/state.json"), "workflows/wf-1/state.json");
    assert_eq!(
        object_key("/analytics/", "workflows/wf-1/state.json"),
        "analytics/workflows/wf-1/state.json"
    );
}
