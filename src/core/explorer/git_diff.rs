use anyhow::{Context, Result};
use tracing::info;

use crate::core::explorer::CodeExplorer;
use crate::core::git::{DiffTarget, GitCli};

pub struct GitDiffExplorer {
    git: GitCli,
    base: String,
    target: DiffTarget,
    only: Option<String>,
}

impl GitDiffExplorer {
    pub fn new(git: GitCli, base: impl Into<String>, target: DiffTarget) -> Self {
        Self {
            git,
            base: base.into(),
            target,
            only: None,
        }
    }

    /// Restrict `explore` to a single file.
    pub fn only(mut self, file_path: impl Into<String>) -> Self {
        self.only = Some(file_path.into());
        self
    }

    /// Diff of a single file against the same base and target.
    pub fn file_patch(&self, file_path: &str) -> Result<String> {
        self.git
            .file_patch(&self.base, &self.target, file_path)
            .with_context(|| format!("Failed to get diff for {}", file_path))
    }
}

impl CodeExplorer for GitDiffExplorer {
    fn explore(&self) -> Result<String> {
        if let Some(path) = &self.only {
            info!("Collecting diff of {} against {:?}", path, self.target);
            return self.file_patch(path);
        }
        info!(
            "Collecting diff of {} against {:?} in {}",
            self.base,
            self.target,
            self.git.repo().display()
        );
        let patch = self
            .git
            .diff_patch(&self.base, &self.target)
            .context("Failed to get repository diff")?;
        Ok(patch)
    }
}
