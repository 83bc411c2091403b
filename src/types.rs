//! Core type definitions for the checkpoint subsystem
//!
//! These are the values that cross the coordinator boundary: commit
//! identifiers, history entries, the checkpoint outcome (a committed
//! snapshot or the documented no-changes sentinel), and the versioning
//! record attached to every wrapped tool execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a workspace snapshot
///
/// A full-length hex digest (40 characters) produced by the underlying
/// store. Only the store constructs these; callers receive them from
/// checkpoint and history operations and pass them back as plain strings
/// to `diff` / `revert`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitId(String);

impl CommitId {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create from an existing identifier string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the short form (first 8 characters) for log lines
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of workspace history, newest first from `get_history`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitEntry {
    /// Snapshot identifier
    #[serde(rename = "hash")]
    pub id: CommitId,

    /// Human-readable label the snapshot was created with
    pub message: String,

    /// When the snapshot was created
    pub timestamp: DateTime<Utc>,

    /// Fixed author identity of the subsystem
    pub author: String,
}

/// Result of a checkpoint operation
///
/// Snapshotting an unchanged tree is expected and common, so "nothing
/// changed" is a first-class outcome rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "commit", rename_all = "kebab-case")]
pub enum CheckpointOutcome {
    /// A new snapshot was created
    Committed(CommitId),
    /// The working tree matched the last snapshot; nothing was written
    NoChanges,
}

impl CheckpointOutcome {
    /// Get the new commit identifier, if one was created
    pub fn commit_id(&self) -> Option<&CommitId> {
        match self {
            Self::Committed(id) => Some(id),
            Self::NoChanges => None,
        }
    }

    /// Consume the outcome, yielding the commit identifier if any
    pub fn into_commit_id(self) -> Option<CommitId> {
        match self {
            Self::Committed(id) => Some(id),
            Self::NoChanges => None,
        }
    }

    /// Check for the no-changes sentinel
    pub fn is_no_changes(&self) -> bool {
        matches!(self, Self::NoChanges)
    }
}

/// Versioning metadata recorded around one wrapped tool execution
///
/// Immutable after construction; returned alongside (not instead of) the
/// tool's own result. A `None` checkpoint means the corresponding phase
/// produced no snapshot: no changes, checkpoints disabled, or a logged
/// checkpoint failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolVersioningRecord {
    /// Name of the wrapped tool
    pub tool_name: String,

    /// Snapshot taken before the tool ran
    pub pre_checkpoint: Option<CommitId>,

    /// Snapshot taken after the tool ran (even on failure)
    pub post_checkpoint: Option<CommitId>,

    /// Whether the tool itself succeeded
    pub success: bool,
}

/// Successful result of a versioned tool execution
#[derive(Debug, Clone)]
pub struct VersionedExecution<R> {
    /// The wrapped tool's own result
    pub tool_result: R,

    /// Versioning metadata for this execution
    pub scm: ToolVersioningRecord,
}

/// Failed tool execution with the versioning record attached
///
/// The original tool error is preserved and re-surfaced; the record rides
/// along as a side channel so a failing tool's partial edits stay
/// diffable and recoverable.
#[derive(Debug)]
pub struct FailedExecution<E> {
    /// The wrapped tool's original error
    pub error: E,

    /// Versioning metadata for this execution
    pub scm: ToolVersioningRecord,
}

impl<E> FailedExecution<E> {
    /// Get the versioning record for this failed execution
    pub fn scm(&self) -> &ToolVersioningRecord {
        &self.scm
    }

    /// Consume the wrapper, yielding the original error
    pub fn into_error(self) -> E {
        self.error
    }
}

impl<E: std::fmt::Display> std::fmt::Display for FailedExecution<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for FailedExecution<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
