//! Workspace-to-store registry
//!
//! Maps an absolute workspace path to its [`VersionedStore`], lazily
//! creating and caching one store per canonical path so repeated calls
//! for the same workspace observe a consistent repository handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::config::{CONTROL_DIR, REPO_SUBDIR, ScmConfig};
use crate::error::{ScmError, ScmResult};
use crate::store::VersionedStore;

static GLOBAL_REGISTRY: Lazy<Arc<WorkspaceRegistry>> =
    Lazy::new(|| Arc::new(WorkspaceRegistry::new()));

/// Process-lifetime cache of one [`VersionedStore`] per workspace
pub struct WorkspaceRegistry {
    stores: DashMap<PathBuf, Arc<VersionedStore>>,
}

impl WorkspaceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            stores: DashMap::new(),
        }
    }

    /// The process-wide registry used by default
    ///
    /// Lives until process exit; tests needing isolation should construct
    /// their own registry or call [`clear`](Self::clear) between cases.
    pub fn global() -> Arc<WorkspaceRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Get the cached store for a workspace, creating it if absent
    ///
    /// The path is canonicalized first, so `./project` and a symlink to it
    /// share one store. The per-key entry lock guarantees concurrent
    /// first-time callers end up with the same instance. Store
    /// construction does no IO; repository initialization happens lazily
    /// inside the store's own operation queue.
    pub fn get_or_create(
        &self,
        workspace: &Path,
        config: &ScmConfig,
    ) -> ScmResult<Arc<VersionedStore>> {
        let canonical = std::fs::canonicalize(workspace).map_err(|e| {
            ScmError::repository_init(workspace, format!("cannot resolve workspace path: {e}"))
        })?;
        if !canonical.is_dir() {
            return Err(ScmError::repository_init(
                workspace,
                "workspace is not a directory",
            ));
        }

        let store = self
            .stores
            .entry(canonical.clone())
            .or_insert_with(|| {
                tracing::debug!(workspace = %canonical.display(), "Creating versioned store");
                Arc::new(VersionedStore::new(canonical.clone(), config))
            })
            .clone();
        Ok(store)
    }

    /// Whether an initialized repository already exists for this workspace
    ///
    /// Pure disk check with no side effects: nothing is created, and the
    /// cache is not consulted or mutated.
    pub fn has(&self, workspace: &Path) -> bool {
        let Ok(canonical) = std::fs::canonicalize(workspace) else {
            return false;
        };
        canonical
            .join(CONTROL_DIR)
            .join(REPO_SUBDIR)
            .join("HEAD")
            .is_file()
    }

    /// Drop every cached store. Test reset hook; on-disk state is untouched.
    pub fn clear(&self) {
        self.stores.clear();
    }

    /// Number of cached stores
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl Default for WorkspaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_same_workspace_returns_same_instance() {
        let dir = TempDir::new().unwrap();
        let registry = WorkspaceRegistry::new();
        let config = ScmConfig::default();

        let a = registry.get_or_create(dir.path(), &config).unwrap();
        // A relative-ish spelling of the same directory.
        let spelled = dir.path().join(".");
        let b = registry.get_or_create(&spelled, &config).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_workspace_is_init_error() {
        let registry = WorkspaceRegistry::new();
        let err = registry
            .get_or_create(Path::new("/definitely/not/here"), &ScmConfig::default())
            .unwrap_err();
        assert!(matches!(err, ScmError::RepositoryInit { .. }));
    }

    #[tokio::test]
    async fn test_has_reflects_disk_not_cache() {
        let dir = TempDir::new().unwrap();
        let registry = WorkspaceRegistry::new();
        let config = ScmConfig::default();

        let store = registry.get_or_create(dir.path(), &config).unwrap();
        // Cached but never initialized: still no repository.
        assert!(!registry.has(dir.path()));

        store.ensure_initialized().await.unwrap();
        assert!(registry.has(dir.path()));

        registry.clear();
        assert!(registry.is_empty());
        // Clearing the cache does not delete on-disk state.
        assert!(registry.has(dir.path()));
    }
}
