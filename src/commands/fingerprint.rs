/// `artifact-transform fingerprint` command implementation
use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::cli::FingerprintArgs;
use crate::transform::{
    BaseDirResolver, DefaultFingerprinterRegistry, FingerprinterRegistry, InputFilePropertyType,
    Normalization, PathToFileResolver,
};

pub fn run(args: FingerprintArgs) -> Result<()> {
    let (config, _) = super::load_settings(&args.common)?;
    super::init_logging(&config);

    let normalization: Normalization = match &args.normalization {
        Some(value) => value.parse()?,
        None => config.fingerprint.normalization,
    };
    let property_type = if args.directory {
        InputFilePropertyType::Directory
    } else {
        InputFilePropertyType::Files
    };

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let resolver = BaseDirResolver::new(cwd);
    let roots: Vec<PathBuf> = args.inputs.iter().map(|p| resolver.resolve(p)).collect();

    let fingerprint = DefaultFingerprinterRegistry::new()
        .fingerprinter(normalization, property_type)
        .fingerprint(&roots)
        .context("Failed to fingerprint inputs")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&fingerprint)?);
    } else {
        println!("{}", fingerprint.hash);
        for entry in &fingerprint.entries {
            println!("  {}  {}", entry.content_hash.short(), entry.normalized_path);
        }
    }

    Ok(())
}
