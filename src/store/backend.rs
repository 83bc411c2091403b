//! Synchronous git2 backend for one workspace repository
//!
//! This module is the single doorway to git2: no other module touches the
//! library directly. The repository metadata lives at
//! `<workspace>/.orchestra/repo` as a detached git dir whose worktree is
//! the workspace root, so snapshot content never includes the control
//! directory and nothing is written outside it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use git2::build::CheckoutBuilder;
use git2::{DiffFormat, DiffOptions, IndexAddOption, Repository, RepositoryInitOptions};

use crate::config::{CONTROL_DIR, REPO_SUBDIR, SCM_AUTHOR_EMAIL, SCM_AUTHOR_NAME, ScmConfig};
use crate::error::{ScmError, ScmResult};
use crate::types::{CheckpointOutcome, CommitEntry, CommitId};

/// Blocking repository operations for one workspace
///
/// Cheap to clone; holds only paths and the configured ignore patterns.
/// Serialization of mutating calls is the owning
/// [`VersionedStore`](super::VersionedStore)'s job.
#[derive(Debug, Clone)]
pub(crate) struct GitBackend {
    workspace: PathBuf,
    git_dir: PathBuf,
    ignore_patterns: Vec<String>,
}

impl GitBackend {
    pub(crate) fn new(workspace: PathBuf, config: &ScmConfig) -> Self {
        let git_dir = workspace.join(CONTROL_DIR).join(REPO_SUBDIR);
        Self {
            workspace,
            git_dir,
            ignore_patterns: config.ignore_patterns.clone(),
        }
    }

    pub(crate) fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Initialize the repository if it does not exist yet. Idempotent.
    pub(crate) fn ensure_initialized(&self) -> ScmResult<()> {
        if !self.workspace.is_dir() {
            return Err(ScmError::repository_init(
                &self.workspace,
                "workspace does not exist or is not a directory",
            ));
        }

        if self.git_dir.join("HEAD").is_file() {
            return Ok(());
        }

        fs::create_dir_all(&self.git_dir)
            .map_err(|e| ScmError::repository_init(&self.workspace, e.to_string()))?;

        // Bare layout at the git dir, re-pointed at the workspace via
        // core.worktree; a non-bare init would write a gitlink into the
        // workspace itself.
        let mut opts = RepositoryInitOptions::new();
        opts.bare(true);
        opts.initial_head("main");
        let repo = Repository::init_opts(&self.git_dir, &opts)
            .map_err(|e| ScmError::repository_init(&self.workspace, e.message()))?;

        let mut config = repo
            .config()
            .map_err(|e| ScmError::repository_init(&self.workspace, e.message()))?;
        let worktree = self.workspace.to_string_lossy();
        for (key, value) in [
            ("core.worktree", worktree.as_ref()),
            ("user.name", SCM_AUTHOR_NAME),
            ("user.email", SCM_AUTHOR_EMAIL),
        ] {
            config
                .set_str(key, value)
                .map_err(|e| ScmError::repository_init(&self.workspace, e.message()))?;
        }
        config
            .set_bool("core.bare", false)
            .map_err(|e| ScmError::repository_init(&self.workspace, e.message()))?;

        self.write_excludes()?;

        tracing::info!(
            workspace = %self.workspace.display(),
            "Initialized checkpoint repository"
        );
        Ok(())
    }

    /// Stage the full working tree and snapshot it if anything changed
    pub(crate) fn commit_all(&self, message: &str) -> ScmResult<CheckpointOutcome> {
        let repo = self.open_or_init()?;

        let mut index = repo.index().map_err(|e| ScmError::commit(e.message()))?;
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .map_err(|e| ScmError::commit(e.message()))?;
        index
            .update_all(["*"].iter(), None)
            .map_err(|e| ScmError::commit(e.message()))?;
        index.write().map_err(|e| ScmError::commit(e.message()))?;
        let tree_id = index
            .write_tree()
            .map_err(|e| ScmError::commit(e.message()))?;

        let head = head_commit(&repo).map_err(|e| ScmError::commit(e.message()))?;
        match &head {
            Some(head_commit) if head_commit.tree_id() == tree_id => {
                return Ok(CheckpointOutcome::NoChanges);
            }
            None => {
                // Unborn HEAD over zero trackable files is still the
                // sentinel path, not an error.
                let tree = repo
                    .find_tree(tree_id)
                    .map_err(|e| ScmError::commit(e.message()))?;
                if tree.is_empty() {
                    return Ok(CheckpointOutcome::NoChanges);
                }
            }
            Some(_) => {}
        }

        let tree = repo
            .find_tree(tree_id)
            .map_err(|e| ScmError::commit(e.message()))?;
        let signature = git2::Signature::now(SCM_AUTHOR_NAME, SCM_AUTHOR_EMAIL)
            .map_err(|e| ScmError::commit(e.message()))?;
        let parents: Vec<&git2::Commit<'_>> = head.iter().collect();
        let oid = repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(|e| ScmError::commit(e.message()))?;

        Ok(CheckpointOutcome::Committed(CommitId::new(oid.to_string())))
    }

    /// Unified-diff text between two commits, or a commit and the working tree
    pub(crate) fn diff(&self, from: &str, to: Option<&str>) -> ScmResult<String> {
        let repo = self.open_or_init()?;

        let from_tree = resolve_commit(&repo, from)
            .and_then(|c| c.tree())
            .map_err(|e| ScmError::diff(format!("cannot resolve {from}: {}", e.message())))?;

        let mut opts = DiffOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true);

        let diff = match to {
            Some(to) => {
                let to_tree = resolve_commit(&repo, to)
                    .and_then(|c| c.tree())
                    .map_err(|e| ScmError::diff(format!("cannot resolve {to}: {}", e.message())))?;
                repo.diff_tree_to_tree(Some(&from_tree), Some(&to_tree), Some(&mut opts))
                    .map_err(|e| ScmError::diff(e.message()))?
            }
            None => repo
                .diff_tree_to_workdir_with_index(Some(&from_tree), Some(&mut opts))
                .map_err(|e| ScmError::diff(e.message()))?,
        };

        let mut text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                text.push(line.origin());
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })
        .map_err(|e| ScmError::diff(e.message()))?;

        Ok(text)
    }

    /// Make the workspace's tracked content exactly match the snapshot
    ///
    /// Hard reset: HEAD, index, and working tree all move to the target,
    /// and files unknown to that snapshot are removed. Ignored paths (the
    /// control directory included) are left alone.
    pub(crate) fn restore_to_commit(&self, commit: &str) -> ScmResult<()> {
        let repo = self.open_or_init()?;

        let target = resolve_commit(&repo, commit)
            .map_err(|e| ScmError::restore(format!("cannot resolve {commit}: {}", e.message())))?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        repo.reset(
            &target.into_object(),
            git2::ResetType::Hard,
            Some(&mut checkout),
        )
        .map_err(|e| ScmError::restore(e.message()))?;

        Ok(())
    }

    /// Up to `limit` commits reachable from HEAD, newest first
    pub(crate) fn log(&self, limit: usize) -> ScmResult<Vec<CommitEntry>> {
        let repo = self.open_or_init()?;

        if head_commit(&repo)
            .map_err(|e| ScmError::io(e.message()))?
            .is_none()
        {
            return Ok(Vec::new());
        }

        let mut walk = repo.revwalk().map_err(|e| ScmError::io(e.message()))?;
        walk.push_head().map_err(|e| ScmError::io(e.message()))?;

        let mut entries = Vec::new();
        for oid in walk.take(limit) {
            let oid = oid.map_err(|e| ScmError::io(e.message()))?;
            let commit = repo
                .find_commit(oid)
                .map_err(|e| ScmError::io(e.message()))?;
            entries.push(commit_entry(&commit));
        }

        Ok(entries)
    }

    /// Current HEAD commit identifier, or None before the first snapshot
    pub(crate) fn current_head(&self) -> ScmResult<Option<CommitId>> {
        let repo = self.open_or_init()?;
        let head = head_commit(&repo).map_err(|e| ScmError::io(e.message()))?;
        Ok(head.map(|c| CommitId::new(c.id().to_string())))
    }

    /// Exact content of one file as it existed at `commit`
    pub(crate) fn file_at(&self, commit: &str, path: &Path) -> ScmResult<Vec<u8>> {
        let repo = self.open_or_init()?;

        let target = resolve_commit(&repo, commit)
            .map_err(|_| ScmError::file_not_found(commit, path))?;
        let tree = target
            .tree()
            .map_err(|_| ScmError::file_not_found(commit, path))?;
        let entry = tree
            .get_path(path)
            .map_err(|_| ScmError::file_not_found(commit, path))?;
        let blob = repo
            .find_blob(entry.id())
            .map_err(|_| ScmError::file_not_found(commit, path))?;

        Ok(blob.content().to_vec())
    }

    fn open_or_init(&self) -> ScmResult<Repository> {
        self.ensure_initialized()?;
        let repo = Repository::open(&self.git_dir).map_err(|e| {
            ScmError::repository_init(
                &self.workspace,
                format!("cannot open checkpoint repository: {}", e.message()),
            )
        })?;
        // Re-pin the worktree on every open so a relocated workspace does
        // not fall back to a stale core.worktree path.
        repo.set_workdir(&self.workspace, false)
            .map_err(|e| ScmError::repository_init(&self.workspace, e.message()))?;
        Ok(repo)
    }

    fn write_excludes(&self) -> ScmResult<()> {
        let info_dir = self.git_dir.join("info");
        fs::create_dir_all(&info_dir)
            .map_err(|e| ScmError::repository_init(&self.workspace, e.to_string()))?;

        // The control directory is excluded by an anchored path pattern so
        // a similarly-named user directory deeper in the tree stays tracked.
        let mut lines = vec![format!("/{CONTROL_DIR}/")];
        lines.extend(self.ignore_patterns.iter().cloned());
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(info_dir.join("exclude"), content)
            .map_err(|e| ScmError::repository_init(&self.workspace, e.to_string()))?;
        Ok(())
    }
}

/// HEAD commit, or None while the repository is unborn
fn head_commit(repo: &Repository) -> Result<Option<git2::Commit<'_>>, git2::Error> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e)
            if e.code() == git2::ErrorCode::UnbornBranch
                || e.code() == git2::ErrorCode::NotFound =>
        {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn resolve_commit<'r>(repo: &'r Repository, spec: &str) -> Result<git2::Commit<'r>, git2::Error> {
    repo.revparse_single(spec)?.peel_to_commit()
}

fn commit_entry(commit: &git2::Commit<'_>) -> CommitEntry {
    let timestamp =
        DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or(DateTime::UNIX_EPOCH);
    CommitEntry {
        id: CommitId::new(commit.id().to_string()),
        message: commit.message().unwrap_or("").trim_end().to_string(),
        timestamp: timestamp.with_timezone(&Utc),
        author: commit.author().name().unwrap_or("").to_string(),
    }
}
