//! Checkpoint coordinator: the public verbs of the SCM core
//!
//! Translates caller-level inputs into [`VersionedStore`] calls and
//! normalizes outcomes for UI-facing consumers: "nothing changed" is a
//! documented sentinel, diff failures collapse to an empty string, and
//! revert failures collapse to `false`. Initialization and commit
//! failures stay real errors.

use std::path::Path;
use std::sync::Arc;

use crate::config::{DEFAULT_HISTORY_LIMIT, ScmConfig};
use crate::error::ScmResult;
use crate::registry::WorkspaceRegistry;
use crate::store::VersionedStore;
use crate::types::{CheckpointOutcome, CommitEntry, CommitId};

/// Coordinator for checkpoint, diff, and revert over workspaces
pub struct CheckpointCoordinator {
    config: ScmConfig,
    registry: Arc<WorkspaceRegistry>,
}

impl CheckpointCoordinator {
    /// Create a coordinator backed by the process-wide registry
    pub fn new(config: ScmConfig) -> Self {
        Self::with_registry(config, WorkspaceRegistry::global())
    }

    /// Create a coordinator with its own registry (test isolation)
    pub fn with_registry(config: ScmConfig, registry: Arc<WorkspaceRegistry>) -> Self {
        Self { config, registry }
    }

    /// Get the configuration
    pub fn config(&self) -> &ScmConfig {
        &self.config
    }

    /// Snapshot the workspace under the given message
    ///
    /// Returns [`CheckpointOutcome::NoChanges`] when the tree is unchanged
    /// or auto-checkpoints are disabled. Underlying failures (workspace
    /// missing, commit failed) are errors, never the sentinel.
    pub async fn checkpoint(
        &self,
        workspace: &Path,
        message: &str,
    ) -> ScmResult<CheckpointOutcome> {
        if !self.config.enable_auto_checkpoints {
            tracing::debug!(
                workspace = %workspace.display(),
                "Auto-checkpoints disabled, skipping"
            );
            return Ok(CheckpointOutcome::NoChanges);
        }

        let store = self.store(workspace)?;
        store.ensure_initialized().await?;
        let outcome = store.commit_all(message).await?;

        match &outcome {
            CheckpointOutcome::Committed(id) => {
                tracing::info!(
                    workspace = %workspace.display(),
                    commit = %id.short(),
                    message = %message,
                    "Created checkpoint"
                );
            }
            CheckpointOutcome::NoChanges => {
                tracing::debug!(
                    workspace = %workspace.display(),
                    "No changes since last checkpoint"
                );
            }
        }

        Ok(outcome)
    }

    /// Unified-diff text between two snapshots, or a snapshot and the
    /// working tree when `to` is absent
    ///
    /// Returns `""` both when the sides are identical and when the diff
    /// could not be computed; the failure is logged here, and callers
    /// treat the empty string as "nothing to show".
    pub async fn diff(&self, workspace: &Path, from: &str, to: Option<&str>) -> String {
        let result = match self.store(workspace) {
            Ok(store) => store.diff(from, to).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    workspace = %workspace.display(),
                    from = %from,
                    error = %e,
                    "Diff failed, returning empty result"
                );
                String::new()
            }
        }
    }

    /// Restore the workspace to the given snapshot
    ///
    /// Returns `false` instead of an error on failure (bad or stale
    /// identifiers from UI state are common and recoverable); the cause
    /// is logged here. On `false` the workspace is unchanged.
    pub async fn revert(&self, workspace: &Path, commit: &str) -> bool {
        let result = match self.store(workspace) {
            Ok(store) => store.restore_to_commit(commit).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    workspace = %workspace.display(),
                    commit = %commit,
                    "Reverted workspace to checkpoint"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    workspace = %workspace.display(),
                    commit = %commit,
                    error = %e,
                    "Revert failed, workspace unchanged"
                );
                false
            }
        }
    }

    /// Up to `limit` (default 50) snapshots, newest first
    ///
    /// Returns an empty list, not an error, when the workspace has no
    /// repository yet; the control directory is not created by this call.
    pub async fn get_history(
        &self,
        workspace: &Path,
        limit: Option<usize>,
    ) -> ScmResult<Vec<CommitEntry>> {
        if !self.registry.has(workspace) {
            return Ok(Vec::new());
        }
        let store = self.store(workspace)?;
        store.log(limit.unwrap_or(DEFAULT_HISTORY_LIMIT)).await
    }

    /// Current snapshot identifier, or None when there is none yet
    ///
    /// Like [`get_history`](Self::get_history), never initializes.
    pub async fn get_current_commit(&self, workspace: &Path) -> ScmResult<Option<CommitId>> {
        if !self.registry.has(workspace) {
            return Ok(None);
        }
        let store = self.store(workspace)?;
        store.current_head().await
    }

    /// Whether an initialized repository exists for this workspace.
    /// No side effects.
    pub fn has_repository(&self, workspace: &Path) -> bool {
        self.registry.has(workspace)
    }

    /// Exact content of one file as it existed at `commit`
    ///
    /// Used by diff viewers that need a single file at a snapshot rather
    /// than the full patch text.
    pub async fn file_at_commit(
        &self,
        workspace: &Path,
        commit: &str,
        path: &Path,
    ) -> ScmResult<Vec<u8>> {
        let store = self.store(workspace)?;
        store.file_at(commit, path).await
    }

    fn store(&self, workspace: &Path) -> ScmResult<Arc<VersionedStore>> {
        self.registry.get_or_create(workspace, &self.config)
    }
}
