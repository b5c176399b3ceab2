//! Resolution of user-supplied paths before fingerprinting.

use std::path::{Path, PathBuf};

use super::paths::normalize_lexically;

pub trait PathToFileResolver: Send + Sync {
    fn resolve(&self, path: &Path) -> PathBuf;
}

/// Leaves paths untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResolver;

impl PathToFileResolver for IdentityResolver {
    fn resolve(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

/// Resolves relative paths against a fixed base directory.
#[derive(Debug, Clone)]
pub struct BaseDirResolver {
    base_dir: PathBuf,
}

impl BaseDirResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl PathToFileResolver for BaseDirResolver {
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize_lexically(path)
        } else {
            normalize_lexically(&self.base_dir.join(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_dir_resolver() {
        let resolver = BaseDirResolver::new("/project");
        assert_eq!(
            resolver.resolve(Path::new("libs/../build/a.jar")),
            PathBuf::from("/project/build/a.jar")
        );
        assert_eq!(resolver.resolve(Path::new("/abs/b.jar")), PathBuf::from("/abs/b.jar"));
    }
}
