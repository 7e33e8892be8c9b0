//! State store key conventions.
//!
//! Pure string functions. These define the canonical layout of workflow
//! objects in any key-addressed store (local directory or S3 bucket).

pub const WORKFLOWS_PREFIX: &str = "workflows/";

pub fn workflow_state(workflow_id: &str) -> String {
    format!("workflows/{workflow_id}/state.json")
}

/// Held by a writer for the duration of a revision check and write.
pub fn workflow_state_lock(workflow_id: &str) -> String {
    format!("workflows/{workflow_id}/state.lock")
}

pub fn workflow_snapshot(workflow_id: &str, snapshot: &str) -> String {
    format!("workflows/{workflow_id}/snapshots/{snapshot}.json")
}

/// Extract the workflow id from a state key, if it is one.
pub fn workflow_id_from_state_key(key: &str) -> Option<&str> {
    key.strip_prefix(WORKFLOWS_PREFIX)?
        .strip_suffix("/state.json")
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

pub fn workflow_artifact(workflow_id: &str, name: &str) -> String {
    format!("workflows/{workflow_id}/artifacts/{name}")
}
