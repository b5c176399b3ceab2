/// `artifact-transform identify` command implementation
///
/// Prints the cache key each input would be stored under, without running
/// the transform.
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::IdentifyArgs;
use crate::transform::{
    BaseDirResolver, DefaultFingerprinterRegistry, HashCode, InputFingerprints, TransformCatalog,
    TransformExecutor, TransformerIdentity,
};

#[derive(Debug, Serialize)]
struct IdentifyReport {
    input: PathBuf,
    identity: TransformerIdentity,
    cache_key: HashCode,
    fingerprints: InputFingerprints,
}

pub fn run(args: IdentifyArgs) -> Result<()> {
    let (config, _) = super::load_settings(&args.common)?;
    super::init_logging(&config);

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let step = super::prepare_step(&args.transform, &TransformCatalog::builtin(), &cwd)?;
    let executor = TransformExecutor::new(
        Arc::new(DefaultFingerprinterRegistry::new()),
        Arc::new(BaseDirResolver::new(&cwd)),
    );

    let mut reports = Vec::with_capacity(step.inputs.len());
    for input in step.inputs {
        let identification = executor
            .identify(step.transformer.as_ref(), &input, step.dependencies.as_ref())
            .with_context(|| format!("Failed to identify {}", input.display()))?;
        reports.push(IdentifyReport {
            input,
            identity: identification.identity,
            cache_key: identification.cache_key,
            fingerprints: identification.fingerprints,
        });
    }

    if args.transform.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}  {}", report.cache_key, report.input.display());
            for (property, fingerprint) in report.fingerprints.iter() {
                println!(
                    "  {} ({}, {} entries): {}",
                    property,
                    fingerprint.normalization,
                    fingerprint.entries.len(),
                    fingerprint.hash
                );
            }
        }
    }

    Ok(())
}
