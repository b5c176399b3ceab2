use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::transform::Normalization;

/// Complete configuration (loaded from `transform.toml`)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TransformConfig {
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub fingerprint: FingerprintConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Where transform outputs go and how many run at once
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceConfig {
    /// Root under which each invocation gets its own output directory
    #[serde(default = "default_output_root")]
    pub output_root: String,

    /// Maximum concurrent transform executions (0 = number of CPUs)
    #[serde(default)]
    pub max_parallel: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            max_parallel: 0,
        }
    }
}

impl WorkspaceConfig {
    pub fn effective_parallelism(&self) -> usize {
        if self.max_parallel == 0 {
            num_cpus::get().max(1)
        } else {
            self.max_parallel
        }
    }
}

/// Defaults for the `fingerprint` command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FingerprintConfig {
    /// Path normalization: absolute-path, relative-path, name-only, ignored-path
    #[serde(default = "default_normalization")]
    pub normalization: Normalization,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            normalization: default_normalization(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// Default value functions
fn default_output_root() -> String {
    ".transforms".to_string()
}

fn default_normalization() -> Normalization {
    Normalization::AbsolutePath
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl TransformConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: TransformConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Generate example configuration as TOML string
    pub fn example() -> Result<String> {
        let config = TransformConfig {
            workspace: WorkspaceConfig {
                output_root: "build/transforms".to_string(),
                max_parallel: 4,
            },
            fingerprint: FingerprintConfig {
                normalization: Normalization::RelativePath,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                log_format: "compact".to_string(),
            },
        };

        toml::to_string_pretty(&config).context("Failed to serialize example config")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.workspace.output_root.trim().is_empty() {
            anyhow::bail!("workspace.output_root must be set");
        }

        if !["trace", "debug", "info", "warn", "error"]
            .contains(&self.observability.log_level.as_str())
        {
            anyhow::bail!("observability.log_level must be one of: trace, debug, info, warn, error");
        }

        if crate::logging::LogFormat::parse(&self.observability.log_format).is_none() {
            anyhow::bail!("observability.log_format must be one of: pretty, compact, json");
        }

        Ok(())
    }
}
