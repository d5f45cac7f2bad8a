pub mod explorer;
pub mod git;
pub mod prompt;
pub mod reviewer;

pub use explorer::{CodeExplorer, GitDiffExplorer, ProjectFileExplorer, RevisionFileExplorer};
pub use git::{DiffTarget, GitCli};
pub use reviewer::Reviewer;
