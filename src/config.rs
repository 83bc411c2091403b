//! SCM core configuration

/// Name of the hidden control directory created at the workspace root
///
/// Everything this subsystem writes lives under this directory; the
/// snapshot content itself never includes it.
pub const CONTROL_DIR: &str = ".orchestra";

/// Subdirectory of the control directory holding the repository metadata
pub(crate) const REPO_SUBDIR: &str = "repo";

/// Fixed author identity used for every snapshot
pub(crate) const SCM_AUTHOR_NAME: &str = "Orchestra SCM";
pub(crate) const SCM_AUTHOR_EMAIL: &str = "scm@orchestra.local";

/// History length used when callers do not pass a limit
pub(crate) const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Configuration for the checkpoint coordinator
#[derive(Debug, Clone)]
pub struct ScmConfig {
    /// Create snapshots on checkpoint calls; when false, `checkpoint`
    /// returns the no-changes sentinel without touching the repository
    pub enable_auto_checkpoints: bool,
    /// Prefix for generated commit messages, e.g. "<prefix>: Before <tool>"
    pub checkpoint_prefix: String,
    /// Paths excluded from snapshots in addition to the control directory
    pub ignore_patterns: Vec<String>,
}

impl Default for ScmConfig {
    fn default() -> Self {
        Self {
            enable_auto_checkpoints: true,
            checkpoint_prefix: "Orchestra".to_string(),
            ignore_patterns: vec![
                "node_modules/".to_string(),
                "target/".to_string(),
                ".DS_Store".to_string(),
            ],
        }
    }
}

impl ScmConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the commit message prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.checkpoint_prefix = prefix.into();
        self
    }

    /// Replace the ignore patterns
    pub fn with_ignore_patterns(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.ignore_patterns = patterns.into_iter().collect();
        self
    }

    /// Disable automatic checkpointing
    pub fn without_auto_checkpoints(mut self) -> Self {
        self.enable_auto_checkpoints = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScmConfig::new()
            .with_prefix("Checkpoint")
            .with_ignore_patterns(vec!["dist/".to_string()])
            .without_auto_checkpoints();

        assert_eq!(config.checkpoint_prefix, "Checkpoint");
        assert_eq!(config.ignore_patterns, vec!["dist/".to_string()]);
        assert!(!config.enable_auto_checkpoints);
    }

    #[test]
    fn test_defaults() {
        let config = ScmConfig::default();
        assert!(config.enable_auto_checkpoints);
        assert_eq!(config.checkpoint_prefix, "Orchestra");
        assert!(config.ignore_patterns.iter().any(|p| p == "node_modules/"));
    }
}
