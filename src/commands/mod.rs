pub mod config;
pub mod fingerprint;
pub mod identify;
pub mod list;
pub mod run;

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::cli::{CommonConfigArgs, TransformArgs};
use crate::config::TransformConfig;
use crate::config_discovery::load_config_with_discovery;
use crate::transform::{
    DependencySet, ImmutableAttributes, ImplementationId, ParameterSnapshot, TransformCatalog,
    Transformer,
};

/// Load configuration, apply command-line overrides and validate the result.
pub fn load_settings(common: &CommonConfigArgs) -> Result<(TransformConfig, Option<PathBuf>)> {
    let (mut config, path) = load_config_with_discovery(common.config.as_deref())?;

    if let Some(output_root) = &common.config_output_root {
        config.workspace.output_root = output_root.clone();
    }
    if let Some(max_parallel) = common.config_max_parallel {
        config.workspace.max_parallel = max_parallel;
    }
    if let Some(log_level) = &common.config_log_level {
        config.observability.log_level = log_level.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok((config, path))
}

pub fn init_logging(config: &TransformConfig) {
    crate::logging::init_with(
        Some(config.observability.log_level.as_str()),
        Some(config.observability.log_format.as_str()),
    );
}

/// A configured transform step together with the inputs to run it on.
pub struct PreparedStep {
    pub transformer: Arc<dyn Transformer>,
    pub dependencies: Arc<DependencySet>,
    pub inputs: Vec<PathBuf>,
}

/// Configure the transform named in `args`, resolving inputs and dependency
/// globs against `base_dir`.
pub fn prepare_step(
    args: &TransformArgs,
    catalog: &TransformCatalog,
    base_dir: &Path,
) -> Result<PreparedStep> {
    let parameters = ParameterSnapshot::parse_json(&args.params)
        .context("Failed to capture transform parameters")?;
    let attributes = ImmutableAttributes::parse(&args.attributes)?;

    let transformer = catalog
        .transformer(ImplementationId::new(&args.transform), parameters, attributes)
        .with_context(|| format!("Failed to configure transform '{}'", args.transform))?;

    let dependencies = if transformer.requires_dependencies() {
        DependencySet::from_globs(&args.dependencies, base_dir)?
    } else {
        if !args.dependencies.is_empty() {
            warn!(
                implementation = %transformer.implementation(),
                "transform does not consume dependencies, ignoring --dependencies"
            );
        }
        DependencySet::empty()
    };

    let mut seen = BTreeSet::new();
    let inputs = args
        .inputs
        .iter()
        .map(|input| base_dir.join(input))
        .filter(|input| seen.insert(input.clone()))
        .collect();

    Ok(PreparedStep {
        transformer,
        dependencies: Arc::new(dependencies),
        inputs,
    })
}
