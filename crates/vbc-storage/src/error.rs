use thiserror::Error;
use vbc_orchestrator::OrchestratorError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("precondition failed for key: {key}")]
    PreconditionFailed { key: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("S3 GetObject error: {0}")]
    GetObject(String),

    #[error("S3 PutObject error: {0}")]
    PutObject(String),

    #[error("S3 ListObjects error: {0}")]
    ListObjects(String),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid extract location: {0}")]
    InvalidLocation(String),
}

/// Backend failures are reported as store or source errors so the
/// orchestrator retries them; malformed payloads are not retried.
impl From<StorageError> for OrchestratorError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Serialization(e) => OrchestratorError::Serialization(e),
            other => OrchestratorError::Store(other.to_string()),
        }
    }
}
