//! Error types for the Orchestra SCM core

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for SCM operations
pub type ScmResult<T> = Result<T, ScmError>;

/// Main error type for the SCM core
///
/// Initialization and commit failures are real errors and surface to the
/// caller. Diff and restore failures are also typed here, but the
/// [`CheckpointCoordinator`](crate::coordinator::CheckpointCoordinator)
/// absorbs them into `""` / `false` results at its boundary.
#[derive(Error, Debug, Clone)]
pub enum ScmError {
    /// Workspace missing, not a directory, or repository setup failed
    #[error("Repository init failed for {workspace}: {message}")]
    RepositoryInit { workspace: PathBuf, message: String },

    /// Staging or commit creation failed
    #[error("Commit failed: {0}")]
    Commit(String),

    /// Commit identifier unresolvable or diff computation failed
    #[error("Diff failed: {0}")]
    Diff(String),

    /// Commit identifier unresolvable or working-tree restore failed
    #[error("Restore failed: {0}")]
    Restore(String),

    /// Requested path did not exist at the given commit
    #[error("File {path} not found at commit {commit}")]
    FileNotFound { commit: String, path: PathBuf },

    /// Filesystem or task-level errors
    #[error("IO error: {0}")]
    Io(String),
}

impl ScmError {
    /// Create a new repository initialization error
    pub fn repository_init(workspace: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::RepositoryInit {
            workspace: workspace.into(),
            message: message.into(),
        }
    }

    /// Create a new commit error
    pub fn commit(message: impl Into<String>) -> Self {
        Self::Commit(message.into())
    }

    /// Create a new diff error
    pub fn diff(message: impl Into<String>) -> Self {
        Self::Diff(message.into())
    }

    /// Create a new restore error
    pub fn restore(message: impl Into<String>) -> Self {
        Self::Restore(message.into())
    }

    /// Create a new file-not-found error
    pub fn file_not_found(commit: impl Into<String>, path: &Path) -> Self {
        Self::FileNotFound {
            commit: commit.into(),
            path: path.to_path_buf(),
        }
    }

    /// Create a new IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }
}

impl From<std::io::Error> for ScmError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScmError::repository_init("/tmp/missing", "workspace does not exist");
        assert!(err.to_string().contains("/tmp/missing"));
        assert!(err.to_string().contains("workspace does not exist"));

        let err = ScmError::file_not_found("abc123", Path::new("src/app.js"));
        assert!(err.to_string().contains("abc123"));
        assert!(err.to_string().contains("src/app.js"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ScmError = io_err.into();
        assert!(matches!(err, ScmError::Io(_)));
    }
}
