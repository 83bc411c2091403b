//! Automatic pre/post checkpointing around tool execution
//!
//! Wraps an arbitrary tool callback so every invocation is bracketed by
//! snapshots: one before the tool runs and one after, taken even when the
//! tool fails, so partial edits from a failing tool stay diffable and
//! recoverable. Checkpoint failures never block the tool itself.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use crate::coordinator::CheckpointCoordinator;
use crate::types::{CommitId, FailedExecution, ToolVersioningRecord, VersionedExecution};

/// Wrapper adding automatic versioning around tool callbacks
pub struct ToolExecutionIntegration {
    coordinator: Arc<CheckpointCoordinator>,
}

impl ToolExecutionIntegration {
    /// Create a new integration over the given coordinator
    pub fn new(coordinator: Arc<CheckpointCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Get the underlying coordinator
    pub fn coordinator(&self) -> &CheckpointCoordinator {
        &self.coordinator
    }

    /// Run `tool_fn` with a checkpoint before and after
    ///
    /// The post-checkpoint is taken regardless of the tool's outcome. On
    /// success the tool result is returned together with the versioning
    /// record; on failure the original error is re-surfaced with the
    /// record attached as [`FailedExecution`]. No retries happen here;
    /// retry policy belongs to the caller.
    pub async fn execute_with_versioning<A, R, E, F, Fut>(
        &self,
        workspace: &Path,
        tool_name: &str,
        tool_args: A,
        tool_fn: F,
    ) -> Result<VersionedExecution<R>, FailedExecution<E>>
    where
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let pre_checkpoint = self.checkpoint_phase(workspace, tool_name, "Before").await;

        let result = tool_fn(tool_args).await;

        let post_checkpoint = self.checkpoint_phase(workspace, tool_name, "After").await;

        let scm = ToolVersioningRecord {
            tool_name: tool_name.to_string(),
            pre_checkpoint,
            post_checkpoint,
            success: result.is_ok(),
        };

        match result {
            Ok(tool_result) => Ok(VersionedExecution { tool_result, scm }),
            Err(error) => Err(FailedExecution { error, scm }),
        }
    }

    /// One checkpoint phase; failures are logged and collapse to None so
    /// tool execution is never blocked by the versioning subsystem.
    async fn checkpoint_phase(
        &self,
        workspace: &Path,
        tool_name: &str,
        phase: &str,
    ) -> Option<CommitId> {
        let message = format!(
            "{}: {} {}",
            self.coordinator.config().checkpoint_prefix,
            phase,
            tool_name
        );

        match self.coordinator.checkpoint(workspace, &message).await {
            Ok(outcome) => outcome.into_commit_id(),
            Err(e) => {
                tracing::warn!(
                    tool = %tool_name,
                    phase = %phase,
                    error = %e,
                    "Checkpoint failed, continuing with tool execution"
                );
                None
            }
        }
    }
}
