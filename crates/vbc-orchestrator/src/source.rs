use std::future::Future;
use std::pin::Pin;

use vbc_core::Period;
use vbc_core::models::dataset::Dataset;

use crate::error::OrchestratorError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read-only access to the raw records for a contract.
pub trait DataSource: Send + Sync {
    /// One consistent snapshot of every collection for the contract and
    /// period. Failures reaching the backing system should surface as
    /// [`OrchestratorError::DataSource`] so they are retried.
    fn fetch<'a>(
        &'a self,
        contract_id: &'a str,
        period: Period,
    ) -> BoxFuture<'a, Result<Dataset, OrchestratorError>>;
}
