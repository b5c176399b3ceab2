//! Lexical path helpers shared by fingerprinting and output validation.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` at the root is dropped, so `/a/../../b` becomes `/b`.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Absolute, lexically normalized form of `path`, relative paths being
/// resolved against the current directory.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_lexically(path))
    } else {
        Ok(normalize_lexically(&std::env::current_dir()?.join(path)))
    }
}

/// `true` if `path` is `ancestor` or lies beneath it. Both must already be
/// normalized.
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    path.starts_with(ancestor)
}

/// Render a relative path with `/` separators regardless of platform.
pub fn to_portable(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(normalize_lexically(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_lexically(Path::new("/a/../../b")), PathBuf::from("/b"));
        assert_eq!(normalize_lexically(Path::new("../x/y/..")), PathBuf::from("../x"));
    }

    #[test]
    fn test_is_within() {
        let out = Path::new("/work/out");
        assert!(is_within(Path::new("/work/out"), out));
        assert!(is_within(Path::new("/work/out/a/b.txt"), out));
        assert!(!is_within(Path::new("/work/output"), out));
        assert!(!is_within(&normalize_lexically(Path::new("/work/out/../x")), out));
    }

    #[test]
    fn test_to_portable() {
        assert_eq!(to_portable(Path::new("a/b/c.txt")), "a/b/c.txt");
    }
}
