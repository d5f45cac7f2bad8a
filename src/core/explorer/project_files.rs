use anyhow::{Context, Result};
use glob::Pattern;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::explorer::{format_block, join_blocks, CodeExplorer};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Walks a project directory and collects every file with an allowed extension.
pub struct ProjectFileExplorer {
    root: PathBuf,
    extensions: Vec<String>,
    max_file_size: u64,
    respect_ignore: bool,
    exclude: Vec<Pattern>,
}

impl ProjectFileExplorer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: vec!["py".to_string()],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            respect_ignore: false,
            exclude: Vec::new(),
        }
    }

    /// Extensions are compared without the leading dot; an empty list keeps the default.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        if !extensions.is_empty() {
            self.extensions = extensions;
        }
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Honor `.gitignore` files and skip hidden entries. Off by default.
    pub fn respect_ignore(mut self, respect_ignore: bool) -> Self {
        self.respect_ignore = respect_ignore;
        self
    }

    pub fn with_exclude(mut self, patterns: &[String]) -> Result<Self> {
        for pattern in patterns {
            let compiled = Pattern::new(pattern)
                .with_context(|| format!("Invalid exclude pattern: {}", pattern))?;
            self.exclude.push(compiled);
        }
        Ok(self)
    }

    fn is_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| self.extensions.iter().any(|e| e == ext))
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.exclude.iter().any(|p| p.matches_path(relative))
    }

    fn read_block(&self, path: &Path, size: Option<u64>) -> String {
        let label = path.display().to_string();
        if let Some(size) = size {
            if size > self.max_file_size {
                warn!("Skipping {} ({} bytes): file too large", label, size);
                return format_block(
                    &label,
                    &format!(
                        "[skipped: file too large ({} bytes, limit {} bytes)]",
                        size, self.max_file_size
                    ),
                );
            }
        }

        match std::fs::read_to_string(path) {
            Ok(content) => format_block(&label, &content),
            Err(e) => {
                warn!("Failed to read {}: {}", label, e);
                format_block(&label, &format!("[error reading file: {}]", e))
            }
        }
    }
}

impl CodeExplorer for ProjectFileExplorer {
    fn explore(&self) -> Result<String> {
        if !self.root.is_dir() {
            anyhow::bail!("Project root is not a directory: {}", self.root.display());
        }
        info!(
            "Exploring {} for extensions {:?}",
            self.root.display(),
            self.extensions
        );

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(self.respect_ignore)
            .follow_links(true)
            .build();

        let mut blocks = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().map_or(false, |ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            if !self.is_allowed(path) {
                continue;
            }
            if self.is_excluded(path) {
                debug!("Excluded {}", path.display());
                continue;
            }

            let size = entry.metadata().ok().map(|m| m.len());
            blocks.push(self.read_block(path, size));
        }

        info!("Collected {} files", blocks.len());
        Ok(join_blocks(blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn oversized_file_becomes_placeholder() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("big.py"), vec![b'x'; 2 * 1024 * 1024]).unwrap();
        std::fs::write(dir.path().join("small.py"), "print(1)\n\n").unwrap();

        let blob = ProjectFileExplorer::new(dir.path()).explore().unwrap();

        assert!(blob.contains("print(1)"));
        assert!(blob.contains("too large"));
        assert!(blob.contains("big.py"));
        assert!(!blob.contains("xxxxxxxx"));
    }

    #[test]
    fn blocks_are_labeled_and_filtered_by_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg").join("mod.py"), "A = 1").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let blob = ProjectFileExplorer::new(dir.path()).explore().unwrap();
        let expected = format!(
            "File:{}\nCode:\nA = 1",
            dir.path().join("pkg").join("mod.py").display()
        );
        assert_eq!(blob, expected);
    }

    #[test]
    fn multiple_files_are_separated_by_blank_line() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();
        std::fs::write(dir.path().join("b.rs"), "fn b() {}").unwrap();

        let blob = ProjectFileExplorer::new(dir.path())
            .with_extensions([".rs"])
            .explore()
            .unwrap();
        assert_eq!(blob.split("\n\n").count(), 2);
        assert!(blob.contains("fn a() {}"));
        assert!(blob.contains("fn b() {}"));
    }

    #[test]
    fn unreadable_file_is_reported_inline() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("binary.py"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        std::fs::write(dir.path().join("ok.py"), "B = 2").unwrap();

        let blob = ProjectFileExplorer::new(dir.path()).explore().unwrap();
        assert!(blob.contains("[error reading file:"));
        assert!(blob.contains("B = 2"));
    }

    #[test]
    fn exclude_patterns_match_relative_paths() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("tests")).unwrap();
        std::fs::write(dir.path().join("tests").join("test_app.py"), "T = 1").unwrap();
        std::fs::write(dir.path().join("app.py"), "APP = 1").unwrap();

        let blob = ProjectFileExplorer::new(dir.path())
            .with_exclude(&["tests/*".to_string()])
            .unwrap()
            .explore()
            .unwrap();
        assert!(blob.contains("APP = 1"));
        assert!(!blob.contains("T = 1"));
    }

    #[test]
    fn hidden_and_gitignored_files_are_included_by_default() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".gitignore"), "generated.py\n").unwrap();
        std::fs::create_dir(dir.path().join(".scripts")).unwrap();
        std::fs::write(dir.path().join(".scripts").join("deploy.py"), "DEPLOY = 1").unwrap();
        std::fs::write(dir.path().join("generated.py"), "GENERATED = 1").unwrap();
        std::fs::write(dir.path().join("app.py"), "APP = 1").unwrap();

        let blob = ProjectFileExplorer::new(dir.path()).explore().unwrap();
        assert!(blob.contains("DEPLOY = 1"), "{}", blob);
        assert!(blob.contains("GENERATED = 1"), "{}", blob);
        assert!(blob.contains("APP = 1"), "{}", blob);

        let filtered = ProjectFileExplorer::new(dir.path())
            .respect_ignore(true)
            .explore()
            .unwrap();
        assert!(!filtered.contains("DEPLOY = 1"));
        assert!(filtered.contains("APP = 1"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_followed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("real.txt"), "LINKED = 1").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.py"))
            .unwrap();

        let blob = ProjectFileExplorer::new(dir.path()).explore().unwrap();
        assert!(blob.contains("link.py"));
        assert!(blob.contains("LINKED = 1"));
    }

    #[test]
    fn empty_project_yields_empty_string() {
        let dir = TempDir::new().unwrap();
        assert_eq!(ProjectFileExplorer::new(dir.path()).explore().unwrap(), "");
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(ProjectFileExplorer::new(missing).explore().is_err());
    }

    #[test]
    fn invalid_exclude_pattern_is_rejected() {
        let result = ProjectFileExplorer::new(".").with_exclude(&["[".to_string()]);
        assert!(result.is_err());
    }
}
