use vbc_core::models::workflow::{
    Stage, StageStatus, WorkflowRequest, WorkflowState, WorkflowStatus,
};
use vbc_core::{CoreError, Period, state_keys};

fn state() -> WorkflowState {
    let request = WorkflowRequest {
        contract_id: "VBC-MSSP-001".to_string(),
        period: Period::new(2024, 6).unwrap(),
    };
    WorkflowState::new(WorkflowState::generate_id(), &request, jiff::Timestamp::now())
}

#[test]
fn generated_ids_have_expected_shape() {
    let id = WorkflowState::generate_id();
    assert!(id.starts_with("wf-"));
    assert_eq!(id.len(), 15);
    assert!(id[3..].chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn new_state_has_one_pending_record_per_stage() {
    let s = state();
    assert_eq!(s.status, WorkflowStatus::Pending);
    assert_eq!(s.stages.len(), 4);
    for stage in Stage::ALL {
        assert_eq!(s.stage(stage).unwrap().stage, stage);
        assert_eq!(s.stage(stage).unwrap().status, StageStatus::Pending);
    }
    assert_eq!(s.next_stage(), Some(Stage::Extraction));
}

#[test]
fn next_stage_skips_completed_and_skipped() {
    let mut s = state();
    s.stage_mut(Stage::Extraction).unwrap().status = StageStatus::Completed;
    s.stage_mut(Stage::Validation).unwrap().status = StageStatus::Skipped;
    assert_eq!(s.next_stage(), Some(Stage::Analysis));
    s.stage_mut(Stage::Analysis).unwrap().status = StageStatus::Completed;
    s.stage_mut(Stage::Reporting).unwrap().status = StageStatus::Completed;
    assert_eq!(s.next_stage(), None);
}

#[test]
fn truncated_stage_list_is_reported_not_indexed() {
    let mut s = state();
    assert!(s.check_integrity().is_ok());
    s.stages.truncate(2);

    assert!(matches!(
        s.check_integrity(),
        Err(CoreError::CorruptState { .. })
    ));
    assert!(s.stage(Stage::Reporting).is_err());
    assert!(s.stage_mut(Stage::Analysis).is_err());
    assert!(s.stage(Stage::Validation).is_ok());
}

#[test]
fn reordered_stage_list_fails_integrity_check() {
    let mut s = state();
    s.stages.swap(0, 3);
    assert!(s.check_integrity().is_err());
    // Lookup is by stage, not by position.
    assert_eq!(s.stage(Stage::Reporting).unwrap().stage, Stage::Reporting);
}

#[test]
fn terminal_states_reject_transitions() {
    let mut s = state();
    s.transition_to(WorkflowStatus::Running).unwrap();
    s.transition_to(WorkflowStatus::Cancelled).unwrap();
    assert!(s.transition_to(WorkflowStatus::Running).is_err());
    assert_eq!(s.status, WorkflowStatus::Cancelled);
}

#[test]
fn stage_statuses_cannot_move_backward_between_stages() {
    use WorkflowStatus::*;
    assert!(Running.can_transition_to(Extracting));
    assert!(Extracting.can_transition_to(Extracting));
    assert!(Extracting.can_transition_to(Running));
    assert!(!Extracting.can_transition_to(Validating));
    assert!(!Completed.can_transition_to(Running));
    assert!(!Pending.can_transition_to(Completed));
    assert!(Paused.can_transition_to(Running));
    assert!(Failed.can_transition_to(Running));
    assert!(!Failed.can_transition_to(Completed));
}

#[test]
fn state_round_trips_through_json() {
    let mut s = state();
    s.records_extracted
        .insert(vbc_core::models::dataset::DatasetKind::Members, 12);
    let json = serde_json::to_string(&s).unwrap();
    let back: WorkflowState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, s);
}

#[test]
fn state_keys_parse_back_to_ids() {
    let key = state_keys::workflow_state("wf-abc123");
    assert_eq!(key, "workflows/wf-abc123/state.json");
    assert_eq!(state_keys::workflow_id_from_state_key(&key), Some("wf-abc123"));
    assert_eq!(
        state_keys::workflow_id_from_state_key("workflows/wf-abc123/snapshots/extracted.json"),
        None
    );
}
