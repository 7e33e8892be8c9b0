//! Extracts laid out on local disk, one directory per contract and period:
//!
//! ```text
//! {root}/{contract_id}/{year}-{month:02}/members.json
//!                                       medical_claims.json
//!                                       pharmacy_claims.json
//!                                       quality_measures.json
//! ```
//!
//! Each file holds a JSON array. A missing file is an empty collection; a
//! missing period directory is an error.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use vbc_core::Period;
use vbc_core::models::dataset::{Dataset, DatasetKind};
use vbc_orchestrator::{BoxFuture, DataSource, OrchestratorError};

use crate::error::StorageError;

pub struct FileDataSource {
    root: PathBuf,
}

impl FileDataSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the extract for one contract and period.
    pub fn extract_dir(&self, contract_id: &str, period: Period) -> Result<PathBuf, StorageError> {
        if contract_id.is_empty()
            || contract_id.starts_with('.')
            || contract_id.contains(['/', '\\'])
        {
            return Err(StorageError::InvalidLocation(format!(
                "contract id '{contract_id}' is not a valid directory name"
            )));
        }
        Ok(self
            .root
            .join(contract_id)
            .join(format!("{}-{:02}", period.year, period.month)))
    }

    async fn load(&self, contract_id: &str, period: Period) -> Result<Dataset, StorageError> {
        let dir = self.extract_dir(contract_id, period)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(StorageError::InvalidLocation(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: dir.display().to_string(),
                    source,
                });
            }
        }

        let (members, medical_claims, pharmacy_claims, quality_measures) = tokio::try_join!(
            read_collection(&dir, DatasetKind::Members),
            read_collection(&dir, DatasetKind::MedicalClaims),
            read_collection(&dir, DatasetKind::PharmacyClaims),
            read_collection(&dir, DatasetKind::QualityMeasures),
        )?;

        let dataset = Dataset {
            members,
            medical_claims,
            pharmacy_claims,
            quality_measures,
        };
        tracing::info!(
            contract_id,
            period = %period,
            members = dataset.members.len(),
            medical_claims = dataset.medical_claims.len(),
            pharmacy_claims = dataset.pharmacy_claims.len(),
            quality_measures = dataset.quality_measures.len(),
            "extract loaded from disk"
        );
        Ok(dataset)
    }
}

async fn read_collection<T: DeserializeOwned>(
    dir: &Path,
    kind: DatasetKind,
) -> Result<Vec<T>, StorageError> {
    let path = dir.join(format!("{}.json", kind.as_str()));
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "collection file absent, treating as empty");
            Ok(Vec::new())
        }
        Err(source) => Err(StorageError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

impl DataSource for FileDataSource {
    fn fetch<'a>(
        &'a self,
        contract_id: &'a str,
        period: Period,
    ) -> BoxFuture<'a, Result<Dataset, OrchestratorError>> {
        Box::pin(async move {
            self.load(contract_id, period).await.map_err(|e| match e {
                StorageError::Serialization(e) => OrchestratorError::Serialization(e),
                other => OrchestratorError::DataSource(other.to_string()),
            })
        })
    }
}
