use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("date arithmetic failed: {0}")]
    Date(#[from] jiff::Error),

    #[error("invalid threshold '{name}': {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}
