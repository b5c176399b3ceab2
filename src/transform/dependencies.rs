//! Upstream artifacts handed to a transform alongside its primary input.

use anyhow::{Context, Result};
use glob::glob;
use std::path::{Path, PathBuf};

/// Artifacts the primary input depends upon.
pub trait ArtifactTransformDependencies: Send + Sync {
    fn files(&self) -> &[PathBuf];
}

/// Sorted, de-duplicated set of dependency artifact paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    files: Vec<PathBuf>,
}

impl DependencySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(files: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut files: Vec<PathBuf> = files.into_iter().collect();
        files.sort();
        files.dedup();
        Self { files }
    }

    /// Expand glob patterns relative to `base_dir`.
    pub fn from_globs<S: AsRef<str>>(patterns: &[S], base_dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let full_pattern = if Path::new(pattern).is_absolute() {
                pattern.to_string()
            } else {
                base_dir.join(pattern).to_string_lossy().to_string()
            };

            for entry in
                glob(&full_pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?
            {
                let path =
                    entry.with_context(|| format!("Failed to read glob entry for: {}", pattern))?;
                files.push(path);
            }
        }
        Ok(Self::new(files))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ArtifactTransformDependencies for DependencySet {
    fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_new_sorts_and_dedups() {
        let set = DependencySet::new(vec![
            PathBuf::from("b.jar"),
            PathBuf::from("a.jar"),
            PathBuf::from("b.jar"),
        ]);
        assert_eq!(set.files(), &[PathBuf::from("a.jar"), PathBuf::from("b.jar")]);
    }

    #[test]
    fn test_from_globs() {
        let temp = TempDir::new().unwrap();
        let base = temp.path();
        fs::create_dir(base.join("libs")).unwrap();
        fs::write(base.join("libs/guava.jar"), "g").unwrap();
        fs::write(base.join("libs/annotations.jar"), "a").unwrap();
        fs::write(base.join("libs/readme.md"), "r").unwrap();

        let set = DependencySet::from_globs(&["libs/*.jar"], base).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.files()[0].ends_with("annotations.jar"));
        assert!(set.files()[1].ends_with("guava.jar"));

        assert!(DependencySet::from_globs(&["[invalid"], base).is_err());
    }
}
