use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

/// What the base ref is compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffTarget {
    /// Changes on `head` since it diverged from the base (`base...head`).
    Head(String),
    /// Uncommitted changes in the working tree.
    WorkingTree,
    /// Changes staged in the index.
    Staged,
}

impl DiffTarget {
    fn range_args(&self, base: &str) -> Vec<String> {
        match self {
            DiffTarget::Head(head) => vec![format!("{}...{}", base, head)],
            DiffTarget::WorkingTree => vec![base.to_string()],
            DiffTarget::Staged => vec!["--cached".to_string(), base.to_string()],
        }
    }
}

/// Runs git as a subprocess against a single repository.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl AsRef<Path>) -> Self {
        Self {
            program: PathBuf::from("git"),
            repo: repo.as_ref().to_path_buf(),
        }
    }

    /// Use a different executable in place of `git`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Runs `git -C <repo> <args>` and returns stdout with trailing whitespace trimmed.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<String, GitError> {
        let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        let command = format!("git {}", args.join(" "));
        debug!("Running {} in {}", command, self.repo.display());

        let output = Command::new(&self.program)
            .arg("-C")
            .arg(&self.repo)
            .args(&args)
            .output()
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::CommandFailed { command, stderr });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end().to_string())
    }

    pub fn diff_patch(&self, base: &str, target: &DiffTarget) -> Result<String, GitError> {
        let mut args = diff_args();
        args.extend(target.range_args(base));
        self.run(args.as_slice())
    }

    pub fn file_patch(
        &self,
        base: &str,
        target: &DiffTarget,
        file_path: &str,
    ) -> Result<String, GitError> {
        let mut args = diff_args();
        args.extend(target.range_args(base));
        args.push("--".to_string());
        args.push(file_path.to_string());
        self.run(args.as_slice())
    }

    /// Content of `path` at `rev` together with its blob id.
    ///
    /// A path that does not exist at `rev` yields an empty string and no id.
    pub fn show_text(&self, rev: &str, path: &str) -> Result<(String, Option<String>), GitError> {
        let ls_tree = self.run(&["ls-tree", rev, "--", path])?;
        let ls_tree = ls_tree.trim();
        if ls_tree.is_empty() {
            return Ok((String::new(), None));
        }

        // <mode> SP <type> SP <object> TAB <path>
        let sha = ls_tree.split_whitespace().nth(2).map(str::to_string);
        let object = format!("{}:{}", rev, path);
        let text = self.run(&["show", object.as_str()])?;
        Ok((text.trim().to_string(), sha))
    }
}

fn diff_args() -> Vec<String> {
    ["diff", "-p", "-U3", "-M", "-C"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;
    use std::process::Command;
    use tempfile::TempDir;

    pub fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    pub fn git(repo: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .arg("-C")
            .arg(repo)
            .args([
                "-c",
                "user.name=Test",
                "-c",
                "user.email=test@example.com",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .output()
            .expect("git should run");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// A repository with one commit containing `app.py`.
    pub fn init_repo() -> Option<TempDir> {
        if !git_available() {
            eprintln!("git not found on PATH, skipping repository-backed test");
            return None;
        }
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "-q"]);
        std::fs::write(dir.path().join("app.py"), "def add(a, b):\n    return a + b\n").unwrap();
        git(dir.path(), &["add", "app.py"]);
        git(dir.path(), &["commit", "-q", "-m", "initial"]);
        Some(dir)
    }

    #[cfg(unix)]
    pub fn stub_program(dir: &Path, script: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-git");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }
}
