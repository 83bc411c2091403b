//! Versioned store bound 1:1 to a workspace
//!
//! [`VersionedStore`] owns the repository inside a workspace's control
//! directory and serializes every operation on it through one FIFO queue,
//! so a checkpoint and a revert issued back-to-back never interleave at
//! the repository level. The blocking git work itself lives in
//! [`backend`] and runs on the blocking thread pool.

mod backend;

use std::path::Path;

use tokio::sync::Mutex;

use crate::config::ScmConfig;
use crate::error::{ScmError, ScmResult};
use crate::types::{CheckpointOutcome, CommitEntry, CommitId};

use backend::GitBackend;

/// Handle to one workspace's snapshot repository
///
/// Created by the [`WorkspaceRegistry`](crate::registry::WorkspaceRegistry)
/// and cached for the process lifetime. Construction does no IO; the
/// repository is initialized lazily by the first real operation.
pub struct VersionedStore {
    backend: GitBackend,
    op_lock: Mutex<()>,
}

impl VersionedStore {
    pub(crate) fn new(workspace: std::path::PathBuf, config: &ScmConfig) -> Self {
        Self {
            backend: GitBackend::new(workspace, config),
            op_lock: Mutex::new(()),
        }
    }

    /// The canonical workspace path this store is bound to
    pub fn workspace(&self) -> &Path {
        self.backend.workspace()
    }

    /// Initialize the underlying repository if needed. Idempotent.
    pub async fn ensure_initialized(&self) -> ScmResult<()> {
        self.run(move |backend| backend.ensure_initialized()).await
    }

    /// Snapshot the full working tree under the given message
    ///
    /// Returns the no-changes sentinel when the tree matches HEAD;
    /// initializes the repository on first use.
    pub async fn commit_all(&self, message: &str) -> ScmResult<CheckpointOutcome> {
        let message = message.to_string();
        self.run(move |backend| backend.commit_all(&message)).await
    }

    /// Unified-diff text between `from` and `to`, or the working tree when
    /// `to` is absent. Empty string when both sides are identical.
    pub async fn diff(&self, from: &str, to: Option<&str>) -> ScmResult<String> {
        let from = from.to_string();
        let to = to.map(str::to_string);
        self.run(move |backend| backend.diff(&from, to.as_deref()))
            .await
    }

    /// Restore the workspace's tracked content to the given snapshot
    ///
    /// Destructive to uncommitted working-tree state; callers wanting a
    /// safety net must checkpoint first.
    pub async fn restore_to_commit(&self, commit: &str) -> ScmResult<()> {
        let commit = commit.to_string();
        self.run(move |backend| backend.restore_to_commit(&commit))
            .await
    }

    /// Up to `limit` snapshots reachable from HEAD, newest first
    pub async fn log(&self, limit: usize) -> ScmResult<Vec<CommitEntry>> {
        self.run(move |backend| backend.log(limit)).await
    }

    /// Current HEAD snapshot, or None before the first commit
    pub async fn current_head(&self) -> ScmResult<Option<CommitId>> {
        self.run(move |backend| backend.current_head()).await
    }

    /// Exact content of one file as it existed at `commit`
    pub async fn file_at(&self, commit: &str, path: &Path) -> ScmResult<Vec<u8>> {
        let commit = commit.to_string();
        let path = path.to_path_buf();
        self.run(move |backend| backend.file_at(&commit, &path))
            .await
    }

    /// Queue `op` behind any in-flight operation, then run it on the
    /// blocking pool. `tokio::sync::Mutex` hands the lock out in FIFO
    /// order, so mutating and read operations never interleave.
    async fn run<T, F>(&self, op: F) -> ScmResult<T>
    where
        F: FnOnce(GitBackend) -> ScmResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.op_lock.lock().await;
        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || op(backend))
            .await
            .map_err(|e| ScmError::io(format!("snapshot task aborted: {e}")))?
    }
}

impl std::fmt::Debug for VersionedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedStore")
            .field("workspace", &self.workspace())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_operations_are_serialized_per_store() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(VersionedStore::new(
            dir.path().to_path_buf(),
            &ScmConfig::default(),
        ));

        tokio::fs::write(dir.path().join("file.txt"), "v1")
            .await
            .unwrap();
        let c1 = store
            .commit_all("first")
            .await
            .unwrap()
            .into_commit_id()
            .unwrap();

        tokio::fs::write(dir.path().join("file.txt"), "v2")
            .await
            .unwrap();

        // Fire a commit and a revert back-to-back without awaiting the
        // first; the store's queue must keep the repository consistent.
        let commit_store = Arc::clone(&store);
        let commit_task = tokio::spawn(async move { commit_store.commit_all("second").await });
        let revert_store = Arc::clone(&store);
        let target = c1.clone();
        let revert_task =
            tokio::spawn(
                async move { revert_store.restore_to_commit(target.as_str()).await },
            );

        commit_task.await.unwrap().unwrap();
        revert_task.await.unwrap().unwrap();

        // Whatever order the tasks ran in, the store must be in exactly
        // one of the two consistent end states.
        let head = store.current_head().await.unwrap().unwrap();
        let content = tokio::fs::read_to_string(dir.path().join("file.txt"))
            .await
            .unwrap();
        if head == c1 {
            assert_eq!(content, "v1");
        } else {
            assert_eq!(content, "v2");
        }
    }

    #[tokio::test]
    async fn test_lazy_initialization_on_first_operation() {
        let dir = TempDir::new().unwrap();
        let store = VersionedStore::new(dir.path().to_path_buf(), &ScmConfig::default());

        assert!(!dir.path().join(crate::config::CONTROL_DIR).exists());
        assert_eq!(store.current_head().await.unwrap(), None);
        assert!(dir.path().join(crate::config::CONTROL_DIR).exists());
    }
}
