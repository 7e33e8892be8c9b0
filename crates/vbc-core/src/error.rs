use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid period {year}-{month}: month must be between 1 and 12")]
    InvalidPeriod { year: i16, month: i8 },

    #[error("invalid contract parameters for {contract_id}: {reason}")]
    InvalidContractParams { contract_id: String, reason: String },

    #[error("workflow {workflow_id}: cannot transition from {from} to {to}")]
    InvalidTransition {
        workflow_id: String,
        from: String,
        to: String,
    },

    #[error("workflow {workflow_id} has a corrupt state document: {reason}")]
    CorruptState { workflow_id: String, reason: String },

    #[error("date arithmetic failed: {0}")]
    Date(#[from] jiff::Error),
}
