mod git_diff;
mod project_files;
mod revision_files;

pub use git_diff::GitDiffExplorer;
pub use project_files::{ProjectFileExplorer, DEFAULT_MAX_FILE_SIZE};
pub use revision_files::RevisionFileExplorer;

use anyhow::Result;

/// A source of code to hand to the reviewer.
pub trait CodeExplorer: Send + Sync {
    fn explore(&self) -> Result<String>;
}

pub(crate) fn format_block(path: &str, content: &str) -> String {
    format!("File:{}\nCode:\n{}", path, content)
}

pub(crate) fn join_blocks(blocks: Vec<String>) -> String {
    blocks.join("\n\n")
}
