//! Workflow state in an S3 bucket.
//!
//! Revision checks are backed by ETag preconditions, so two processes
//! sharing a bucket cannot both win a write.

use aws_sdk_s3::Client;
use vbc_core::models::dataset::Dataset;
use vbc_core::models::workflow::WorkflowState;
use vbc_core::state_keys;
use vbc_export::Artifact;
use vbc_orchestrator::store::check_revision;
use vbc_orchestrator::{BoxFuture, OrchestratorError, Snapshot, StateStore};

use crate::error::StorageError;
use crate::objects::{self, Precondition};
use crate::state;

/// Join an optional key prefix and a store key.
pub fn object_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}/{key}")
    }
}

pub struct S3StateStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3StateStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: String::new(),
        }
    }

    /// Keep every object under `prefix/` in the bucket.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn key(&self, key: &str) -> String {
        object_key(&self.prefix, key)
    }

    async fn load_state(
        &self,
        workflow_id: &str,
    ) -> Result<Option<(WorkflowState, String)>, StorageError> {
        state::load_json(
            &self.client,
            &self.bucket,
            &self.key(&state_keys::workflow_state(workflow_id)),
        )
        .await
    }

    async fn put_blob(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        objects::put_object(
            &self.client,
            &self.bucket,
            &self.key(key),
            body,
            Some(content_type),
            Precondition::None,
        )
        .await?;
        Ok(())
    }

    async fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(objects::get_object_optional(&self.client, &self.bucket, &self.key(key))
            .await?
            .map(|o| o.body))
    }
}

impl StateStore for S3StateStore {
    fn get<'a>(
        &'a self,
        workflow_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<WorkflowState>, OrchestratorError>> {
        Box::pin(async move { Ok(self.load_state(workflow_id).await?.map(|(s, _)| s)) })
    }

    fn put(&self, state: WorkflowState) -> BoxFuture<'_, Result<WorkflowState, OrchestratorError>> {
        Box::pin(async move {
            let current = self.load_state(&state.workflow_id).await?;
            let etag = current.as_ref().map(|(_, etag)| etag.clone());
            let saved = check_revision(current.map(|(s, _)| s.revision), state)?;

            let precondition = match etag.as_deref() {
                Some(etag) => Precondition::IfMatch(etag),
                None => Precondition::IfAbsent,
            };
            let key = self.key(&state_keys::workflow_state(&saved.workflow_id));
            match state::save_json(&self.client, &self.bucket, &key, &saved, precondition).await {
                Ok(new_etag) => {
                    tracing::debug!(
                        workflow_id = %saved.workflow_id,
                        revision = saved.revision,
                        etag = %new_etag,
                        "state flushed to S3"
                    );
                    Ok(saved)
                }
                Err(StorageError::PreconditionFailed { .. }) => {
                    // Someone wrote between our read and our write.
                    let found = self
                        .load_state(&saved.workflow_id)
                        .await?
                        .map(|(s, _)| s.revision)
                        .unwrap_or(0);
                    Err(OrchestratorError::Conflict {
                        workflow_id: saved.workflow_id,
                        expected: saved.revision - 1,
                        found,
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn put_snapshot<'a>(
        &'a self,
        workflow_id: &'a str,
        snapshot: Snapshot,
        dataset: &'a Dataset,
    ) -> BoxFuture<'a, Result<(), OrchestratorError>> {
        Box::pin(async move {
            let body = serde_json::to_vec(dataset)?;
            let key = state_keys::workflow_snapshot(workflow_id, snapshot.as_str());
            self.put_blob(&key, body, "application/json").await?;
            Ok(())
        })
    }

    fn get_snapshot<'a>(
        &'a self,
        workflow_id: &'a str,
        snapshot: Snapshot,
    ) -> BoxFuture<'a, Result<Option<Dataset>, OrchestratorError>> {
        Box::pin(async move {
            let key = state_keys::workflow_snapshot(workflow_id, snapshot.as_str());
            match self.get_blob(&key).await? {
                Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
                None => Ok(None),
            }
        })
    }

    fn put_artifact<'a>(
        &'a self,
        workflow_id: &'a str,
        artifact: &'a Artifact,
    ) -> BoxFuture<'a, Result<(), OrchestratorError>> {
        Box::pin(async move {
            if artifact.name.is_empty() || artifact.name.contains('/') {
                return Err(OrchestratorError::Store(format!(
                    "invalid artifact name '{}'",
                    artifact.name
                )));
            }
            let key = state_keys::workflow_artifact(workflow_id, &artifact.name);
            self.put_blob(&key, artifact.body.clone(), &artifact.content_type)
                .await?;
            Ok(())
        })
    }

    fn get_artifact<'a>(
        &'a self,
        workflow_id: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, OrchestratorError>> {
        Box::pin(async move {
            Ok(self
                .get_blob(&state_keys::workflow_artifact(workflow_id, name))
                .await?)
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<WorkflowState>, OrchestratorError>> {
        Box::pin(async move {
            let prefix = self.key(state_keys::WORKFLOWS_PREFIX);
            let keys = objects::list_objects(&self.client, &self.bucket, &prefix).await?;
            let strip = self.key("");

            let mut states = Vec::new();
            for key in &keys {
                let relative = key.strip_prefix(strip.as_str()).unwrap_or(key);
                let Some(workflow_id) = state_keys::workflow_id_from_state_key(relative) else {
                    continue;
                };
                if let Some((state, _)) = self.load_state(workflow_id).await? {
                    states.push(state);
                }
            }
            states.sort_by(|a, b| {
                (a.created_at, &a.workflow_id).cmp(&(b.created_at, &b.workflow_id))
            });
            Ok(states)
        })
    }
}
