/// `artifact-transform list` command implementation
use anyhow::Result;

use crate::transform::{TransformCatalog, TransformKind};

pub fn run() -> Result<()> {
    for (id, kind) in TransformCatalog::builtin().entries() {
        match kind {
            TransformKind::Legacy => println!("{:<12} legacy", id),
            TransformKind::Action(inputs) => println!(
                "{:<12} action (primary: {}, dependencies: {})",
                id,
                inputs.primary_normalization,
                if inputs.requires_dependencies {
                    inputs.dependencies_normalization.as_str()
                } else {
                    "none"
                }
            ),
        }
    }
    Ok(())
}
