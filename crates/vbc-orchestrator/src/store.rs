//! Workflow state persistence.
//!
//! Every write is optimistic: the caller passes the state it last read, and
//! the store rejects it with [`OrchestratorError::Conflict`] if someone else
//! has written since. Accepted writes come back with `revision` bumped.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use vbc_core::models::dataset::Dataset;
use vbc_core::models::workflow::WorkflowState;
use vbc_core::state_keys;
use vbc_export::Artifact;

use crate::error::OrchestratorError;
use crate::source::BoxFuture;

/// Stage outputs kept so a resumed workflow never re-runs a finished stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Snapshot {
    Extracted,
    Validated,
}

impl Snapshot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::Validated => "validated",
        }
    }
}

pub trait StateStore: Send + Sync {
    fn get<'a>(
        &'a self,
        workflow_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<WorkflowState>, OrchestratorError>>;

    /// Write `state` if the stored revision still equals `state.revision`
    /// (or nothing is stored and `state.revision` is 0).
    fn put(&self, state: WorkflowState) -> BoxFuture<'_, Result<WorkflowState, OrchestratorError>>;

    fn put_snapshot<'a>(
        &'a self,
        workflow_id: &'a str,
        snapshot: Snapshot,
        dataset: &'a Dataset,
    ) -> BoxFuture<'a, Result<(), OrchestratorError>>;

    fn get_snapshot<'a>(
        &'a self,
        workflow_id: &'a str,
        snapshot: Snapshot,
    ) -> BoxFuture<'a, Result<Option<Dataset>, OrchestratorError>>;

    fn put_artifact<'a>(
        &'a self,
        workflow_id: &'a str,
        artifact: &'a Artifact,
    ) -> BoxFuture<'a, Result<(), OrchestratorError>>;

    fn get_artifact<'a>(
        &'a self,
        workflow_id: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, OrchestratorError>>;

    /// All workflows, oldest first.
    fn list(&self) -> BoxFuture<'_, Result<Vec<WorkflowState>, OrchestratorError>>;
}

/// Check an incoming write against the stored revision and bump it.
pub fn check_revision(
    stored: Option<u64>,
    mut state: WorkflowState,
) -> Result<WorkflowState, OrchestratorError> {
    let found = stored.unwrap_or(0);
    let fresh_insert = stored.is_none() && state.revision == 0;
    if !fresh_insert && stored != Some(state.revision) {
        return Err(OrchestratorError::Conflict {
            workflow_id: state.workflow_id,
            expected: state.revision,
            found,
        });
    }
    state.revision += 1;
    Ok(state)
}

fn check_artifact_name(name: &str) -> Result<(), OrchestratorError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
        return Err(OrchestratorError::Store(format!(
            "invalid artifact name '{name}'"
        )));
    }
    Ok(())
}

#[derive(Default)]
struct MemoryInner {
    states: HashMap<String, WorkflowState>,
    blobs: HashMap<String, Vec<u8>>,
}

/// In-process store. Each write is a single swap under one lock.
#[derive(Default)]
pub struct MemoryStateStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get<'a>(
        &'a self,
        workflow_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<WorkflowState>, OrchestratorError>> {
        Box::pin(async move { Ok(self.inner.lock().await.states.get(workflow_id).cloned()) })
    }

    fn put(&self, state: WorkflowState) -> BoxFuture<'_, Result<WorkflowState, OrchestratorError>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let stored = inner.states.get(&state.workflow_id).map(|s| s.revision);
            let saved = check_revision(stored, state)?;
            inner
                .states
                .insert(saved.workflow_id.clone(), saved.clone());
            Ok(saved)
        })
    }

    fn put_snapshot<'a>(
        &'a self,
        workflow_id: &'a str,
        snapshot: Snapshot,
        dataset: &'a Dataset,
    ) -> BoxFuture<'a, Result<(), OrchestratorError>> {
        Box::pin(async move {
            let bytes = serde_json::to_vec(dataset)?;
            let key = state_keys::workflow_snapshot(workflow_id, snapshot.as_str());
            self.inner.lock().await.blobs.insert(key, bytes);
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
            let inner = self.inner.lock().await;
            match inner.blobs.get(&key) {
                Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
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
            check_artifact_name(&artifact.name)?;
            let key = state_keys::workflow_artifact(workflow_id, &artifact.name);
            self.inner
                .lock()
                .await
                .blobs
                .insert(key, artifact.body.clone());
            Ok(())
        })
    }

    fn get_artifact<'a>(
        &'a self,
        workflow_id: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, OrchestratorError>> {
        Box::pin(async move {
            let key = state_keys::workflow_artifact(workflow_id, name);
            Ok(self.inner.lock().await.blobs.get(&key).cloned())
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<WorkflowState>, OrchestratorError>> {
        Box::pin(async move {
            let mut states: Vec<_> = self.inner.lock().await.states.values().cloned().collect();
            states.sort_by(|a, b| {
                (a.created_at, &a.workflow_id).cmp(&(b.created_at, &b.workflow_id))
            });
            Ok(states)
        })
    }
}

/// Workflow ids become directory names in the file store, so anything that
/// could step outside its own directory is refused.
pub fn check_workflow_id(workflow_id: &str) -> Result<(), OrchestratorError> {
    if workflow_id.is_empty()
        || workflow_id.starts_with('.')
        || workflow_id.contains(['/', '\\', '\0'])
    {
        return Err(OrchestratorError::InvalidWorkflowId {
            workflow_id: workflow_id.to_string(),
        });
    }
    Ok(())
}

const LOCK_POLL: Duration = Duration::from_millis(20);
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);
/// A lock file older than this was left by a writer that died.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(30);

/// Cross-process lock on one workflow's state: a file created with
/// `create_new`, removed on drop.
struct StateLock {
    path: PathBuf,
}

impl StateLock {
    async fn acquire(path: PathBuf) -> Result<Self, OrchestratorError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let deadline = Instant::now() + LOCK_TIMEOUT;
        loop {
            let created = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match created {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
            if Self::is_stale(&path).await {
                tracing::warn!(path = %path.display(), "removing stale state lock");
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => continue,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            if Instant::now() >= deadline {
                return Err(OrchestratorError::Store(format!(
                    "timed out waiting for {}",
                    path.display()
                )));
            }
            tokio::time::sleep(LOCK_POLL).await;
        }
    }

    async fn is_stale(path: &Path) -> bool {
        let Ok(meta) = tokio::fs::metadata(path).await else {
            return false;
        };
        meta.modified()
            .ok()
            .and_then(|at| at.elapsed().ok())
            .is_some_and(|age| age > LOCK_STALE_AFTER)
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release state lock");
        }
    }
}

/// Local-directory store laid out by [`state_keys`]. Writes go to a uniquely
/// named temp file and are renamed into place, so readers never see a
/// partial file. State writes hold a lock file, so a second process (a CLI
/// `pause` against a running `vbc run`) cannot interleave its revision check
/// with ours.
pub struct FileStateStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, OrchestratorError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_state(&self, workflow_id: &str) -> Result<Option<WorkflowState>, OrchestratorError> {
        check_workflow_id(workflow_id)?;
        let path = self.path(&state_keys::workflow_state(workflow_id));
        match Self::read_optional(&path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

/// Write to a fresh temp file beside `path`, then rename it over `path`.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir).await?;
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)?;
        Ok::<(), std::io::Error>(())
    })
    .await
    .map_err(std::io::Error::other)?
}

impl StateStore for FileStateStore {
    fn get<'a>(
        &'a self,
        workflow_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<WorkflowState>, OrchestratorError>> {
        Box::pin(self.read_state(workflow_id))
    }

    fn put(&self, state: WorkflowState) -> BoxFuture<'_, Result<WorkflowState, OrchestratorError>> {
        Box::pin(async move {
            check_workflow_id(&state.workflow_id)?;
            let _guard = self.write_lock.lock().await;
            let _lock =
                StateLock::acquire(self.path(&state_keys::workflow_state_lock(&state.workflow_id)))
                    .await?;
            let stored = self
                .read_state(&state.workflow_id)
                .await?
                .map(|s| s.revision);
            let saved = check_revision(stored, state)?;
            let path = self.path(&state_keys::workflow_state(&saved.workflow_id));
            write_atomic(&path, &serde_json::to_vec_pretty(&saved)?).await?;
            tracing::debug!(
                workflow_id = %saved.workflow_id,
                revision = saved.revision,
                path = %path.display(),
                "state flushed to local disk"
            );
            Ok(saved)
        })
    }

    fn put_snapshot<'a>(
        &'a self,
        workflow_id: &'a str,
        snapshot: Snapshot,
        dataset: &'a Dataset,
    ) -> BoxFuture<'a, Result<(), OrchestratorError>> {
        Box::pin(async move {
            check_workflow_id(workflow_id)?;
            let path = self.path(&state_keys::workflow_snapshot(workflow_id, snapshot.as_str()));
            write_atomic(&path, &serde_json::to_vec(dataset)?).await?;
            Ok(())
        })
    }

    fn get_snapshot<'a>(
        &'a self,
        workflow_id: &'a str,
        snapshot: Snapshot,
    ) -> BoxFuture<'a, Result<Option<Dataset>, OrchestratorError>> {
        Box::pin(async move {
            check_workflow_id(workflow_id)?;
            let path = self.path(&state_keys::workflow_snapshot(workflow_id, snapshot.as_str()));
            match Self::read_optional(&path).await? {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
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
            check_workflow_id(workflow_id)?;
            check_artifact_name(&artifact.name)?;
            let path = self.path(&state_keys::workflow_artifact(workflow_id, &artifact.name));
            write_atomic(&path, &artifact.body).await?;
            Ok(())
        })
    }

    fn get_artifact<'a>(
        &'a self,
        workflow_id: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, OrchestratorError>> {
        Box::pin(async move {
            check_workflow_id(workflow_id)?;
            check_artifact_name(name)?;
            Self::read_optional(&self.path(&state_keys::workflow_artifact(workflow_id, name))).await
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<WorkflowState>, OrchestratorError>> {
        Box::pin(async move {
            let dir = self.path(state_keys::WORKFLOWS_PREFIX);
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };
            let mut states = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if check_workflow_id(&id).is_err() {
                    continue;
                }
                if let Some(state) = self.read_state(&id).await? {
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
