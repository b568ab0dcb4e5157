//! Changed source files of the working tree

use anyhow::{Context, Result};
use git2::{Delta, DiffOptions, Repository, Status, StatusOptions};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub struct GitDiff {
    repo: Repository,
}

impl GitDiff {
    pub fn new(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("Failed to find git repository at {}", path.display()))?;

        Ok(Self { repo })
    }

    /// Directory the returned paths are relative to
    pub fn workdir(&self) -> Option<PathBuf> {
        self.repo.workdir().map(|p| p.to_path_buf())
    }

    /// Added or modified files, uncommitted ones plus those changed since `since`.
    ///
    /// Deleted files are left out since there is nothing left to cover.
    pub fn changed_files(&self, since: Option<&str>) -> Result<Vec<String>> {
        let mut changed: HashSet<String> = self.uncommitted_changes()?.into_iter().collect();

        if let Some(ref_name) = since {
            changed.extend(self.committed_changes_since(ref_name)?);
        }

        let mut files: Vec<String> = changed.into_iter().collect();
        files.sort();
        tracing::debug!(count = files.len(), "changed files collected");

        Ok(files)
    }

    /// `changed_files` with paths made relative to `root` instead of the work tree.
    ///
    /// Files outside `root` are returned as absolute paths.
    pub fn changed_files_under(&self, root: &Path, since: Option<&str>) -> Result<Vec<String>> {
        let workdir = self
            .workdir()
            .context("Repository has no work tree")?
            .canonicalize()?;
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", root.display()))?;

        Ok(self
            .changed_files(since)?
            .into_iter()
            .map(|file| {
                let full = workdir.join(&file);
                match full.strip_prefix(&root) {
                    Ok(relative) => relative.to_string_lossy().to_string(),
                    Err(_) => full.to_string_lossy().to_string(),
                }
            })
            .collect())
    }

    /// Staged, unstaged and untracked files
    pub fn uncommitted_changes(&self) -> Result<Vec<String>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true);
        opts.recurse_untracked_dirs(true);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let deleted = Status::WT_DELETED | Status::INDEX_DELETED;

        Ok(statuses
            .iter()
            .filter(|entry| !entry.status().intersects(deleted))
            .filter_map(|entry| entry.path().map(|p| p.to_string()))
            .collect())
    }

    fn committed_changes_since(&self, ref_name: &str) -> Result<Vec<String>> {
        let since = self
            .repo
            .revparse_single(ref_name)
            .with_context(|| format!("Failed to resolve reference: {}", ref_name))?;
        let old_tree = since.peel_to_commit()?.tree()?;
        let new_tree = self.repo.head()?.peel_to_commit()?.tree()?;

        let mut diff_opts = DiffOptions::new();
        let diff =
            self.repo
                .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut diff_opts))?;

        Ok(diff
            .deltas()
            .filter(|delta| delta.status() != Delta::Deleted)
            .filter_map(|delta| delta.new_file().path())
            .map(|path| path.to_string_lossy().to_string())
            .collect())
    }
}
