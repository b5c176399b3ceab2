use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::TransformConfig;

/// Project-level configuration file name
pub const CONFIG_FILE_NAME: &str = "transform.toml";

/// Discovers configuration by traversing up the directory tree
pub fn discover_config(start_dir: &Path) -> Result<Option<PathBuf>> {
    if let Some(found) = discover_project_config(start_dir) {
        return Ok(Some(found));
    }

    // Fallback to global config
    if let Some(home) = dirs::home_dir() {
        let global_config = home.join(".config/artifact-transform/config.toml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

fn discover_project_config(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Loads configuration with auto-discovery support
///
/// If `explicit_path` is provided, loads config from that path.
/// Otherwise, auto-discovers config by traversing up directory tree from cwd.
/// Falls back to defaults when nothing is found. Returns the config and the
/// path it was loaded from.
pub fn load_config_with_discovery(
    explicit_path: Option<&str>,
) -> Result<(TransformConfig, Option<PathBuf>)> {
    if let Some(config_path) = explicit_path {
        let config = TransformConfig::from_file(config_path)?;
        return Ok((config, Some(PathBuf::from(config_path))));
    }

    let current_dir =
        std::env::current_dir().context("Failed to get current directory for config discovery")?;

    match discover_config(&current_dir)? {
        Some(discovered_path) => {
            let config = TransformConfig::from_file(&discovered_path)?;
            Ok((config, Some(discovered_path)))
        }
        None => Ok((TransformConfig::default(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join("a").join(CONFIG_FILE_NAME), "").unwrap();

        let found = discover_config(&nested).unwrap().unwrap();
        assert_eq!(found, temp.path().join("a").join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_nearest_config_wins() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "").unwrap();
        fs::write(nested.join(CONFIG_FILE_NAME), "").unwrap();

        assert_eq!(
            discover_project_config(&nested),
            Some(nested.join(CONFIG_FILE_NAME))
        );
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(&path, "[workspace]\nmax_parallel = 3\n").unwrap();

        let (config, loaded_from) =
            load_config_with_discovery(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.workspace.max_parallel, 3);
        assert_eq!(loaded_from, Some(path));
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        assert!(load_config_with_discovery(Some("/definitely/not/here.toml")).is_err());
    }
}
