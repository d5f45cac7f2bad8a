use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::explorer::{format_block, join_blocks, CodeExplorer};
use crate::core::git::GitCli;

/// Collects file contents as they were at a given revision.
pub struct RevisionFileExplorer {
    git: GitCli,
    rev: String,
    paths: Vec<String>,
}

impl RevisionFileExplorer {
    pub fn new(git: GitCli, rev: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            git,
            rev: rev.into(),
            paths,
        }
    }
}

impl CodeExplorer for RevisionFileExplorer {
    fn explore(&self) -> Result<String> {
        let mut blocks = Vec::new();
        for path in &self.paths {
            let (text, sha) = self
                .git
                .show_text(&self.rev, path)
                .with_context(|| format!("Failed to read {} at {}", path, self.rev))?;
            match sha {
                Some(sha) => {
                    debug!("Loaded {}:{} (blob {})", self.rev, path, sha);
                    blocks.push(format_block(path, &text));
                }
                None => warn!("{} does not exist at {}", path, self.rev),
            }
        }
        Ok(join_blocks(blocks))
    }
}
