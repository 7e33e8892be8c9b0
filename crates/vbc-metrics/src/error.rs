use thiserror::Error;
use vbc_core::{CoreError, Period};

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("no attributed member-months in {period}")]
    ZeroMemberMonths { period: Period },

    #[error("invalid analysis setting '{name}': {value}")]
    InvalidSetting { name: &'static str, value: f64 },
}
