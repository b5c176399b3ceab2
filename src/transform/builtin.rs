//! Transform implementations shipped with the binary.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use walkdir::WalkDir;
use zstd::decode_all;

use super::action::{ActionInstantiator, TransformAction, TransformContext};
use super::error::InstantiationError;
use super::legacy::{ArtifactTransform, LegacyInstantiator};
use super::params::Arguments;

pub const COPY: &str = "copy";
pub const IDENTITY: &str = "identity";
pub const UNPACK: &str = "unpack";
pub const MANIFEST: &str = "manifest";

/// Register the legacy built-ins: `copy`, `identity` and `unpack`.
pub fn register_legacy(registry: &mut LegacyInstantiator) {
    registry
        .register(COPY, |args| {
            args.expect_at_most(1)?;
            let file_name = args.optional::<String>(0)?;
            if let Some(name) = &file_name {
                require_contained(&args, 0, name)?;
            }
            Ok(Box::new(CopyTransform {
                file_name,
                output_dir: None,
            }) as Box<dyn ArtifactTransform>)
        })
        .register(IDENTITY, |args| {
            args.expect_exactly(0)?;
            Ok(Box::new(IdentityTransform) as Box<dyn ArtifactTransform>)
        })
        .register(UNPACK, |args| {
            args.expect_exactly(0)?;
            Ok(Box::new(UnpackTransform { output_dir: None }) as Box<dyn ArtifactTransform>)
        });
}

/// Register the action built-ins: `manifest`.
pub fn register_actions(registry: &mut ActionInstantiator) {
    registry.register(MANIFEST, |args| {
        args.expect_at_most(1)?;
        let file_name = args
            .optional(0)?
            .unwrap_or_else(|| "manifest.txt".to_string());
        require_contained(&args, 0, &file_name)?;
        Ok(Box::new(ManifestAction { file_name }) as Box<dyn TransformAction>)
    });
}

/// A file name parameter must be a relative path of plain names, so that the
/// file is written below the output directory.
fn require_contained(
    args: &Arguments,
    index: usize,
    name: &str,
) -> std::result::Result<(), InstantiationError> {
    let contained = !name.is_empty()
        && Path::new(name)
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if contained {
        Ok(())
    } else {
        Err(InstantiationError::Parameter {
            implementation: args.implementation().clone(),
            index,
            reason: format!("'{}' is not a relative path below the output directory", name),
        })
    }
}

fn output_dir(dir: &Option<PathBuf>) -> Result<&Path> {
    dir.as_deref()
        .ok_or_else(|| anyhow::anyhow!("Output directory was not set"))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("Input has no file name: {}", path.display()))
}

/// Copies the input (file or directory tree) into the output directory.
struct CopyTransform {
    file_name: Option<String>,
    output_dir: Option<PathBuf>,
}

impl ArtifactTransform for CopyTransform {
    fn set_output_directory(&mut self, output_dir: &Path) {
        self.output_dir = Some(output_dir.to_path_buf());
    }

    fn transform(&mut self, input: &Path) -> Result<Option<Vec<PathBuf>>> {
        let name = match &self.file_name {
            Some(name) => name.clone(),
            None => file_name(input)?,
        };
        let target = output_dir(&self.output_dir)?.join(name);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        if input.is_dir() {
            copy_tree(input, &target)?;
        } else {
            fs::copy(input, &target).with_context(|| {
                format!("Failed to copy {} to {}", input.display(), target.display())
            })?;
        }

        Ok(Some(vec![target]))
    }
}

fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", source.display()))?;
        let relative = entry.path().strip_prefix(source)?;
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)
                .with_context(|| format!("Failed to create {}", destination.display()))?;
        } else {
            fs::copy(entry.path(), &destination)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Passes the input through unchanged.
struct IdentityTransform;

impl ArtifactTransform for IdentityTransform {
    fn set_output_directory(&mut self, _output_dir: &Path) {}

    fn transform(&mut self, input: &Path) -> Result<Option<Vec<PathBuf>>> {
        Ok(Some(vec![input.to_path_buf()]))
    }
}

/// Extracts a `.tar` or `.tar.zst` archive into `<output>/<stem>`.
struct UnpackTransform {
    output_dir: Option<PathBuf>,
}

impl UnpackTransform {
    fn stem(name: &str) -> &str {
        name.strip_suffix(".tar.zst")
            .or_else(|| name.strip_suffix(".tzst"))
            .or_else(|| name.strip_suffix(".tar"))
            .unwrap_or(name)
    }
}

impl ArtifactTransform for UnpackTransform {
    fn set_output_directory(&mut self, output_dir: &Path) {
        self.output_dir = Some(output_dir.to_path_buf());
    }

    fn transform(&mut self, input: &Path) -> Result<Option<Vec<PathBuf>>> {
        let name = file_name(input)?;
        let target = output_dir(&self.output_dir)?.join(Self::stem(&name));

        let data = fs::read(input)
            .with_context(|| format!("Failed to read archive: {}", input.display()))?;
        let tar_data = if name.ends_with(".tar") {
            data
        } else {
            decode_all(data.as_slice()).context("Failed to decompress archive with zstd")?
        };

        fs::create_dir_all(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        Archive::new(tar_data.as_slice())
            .unpack(&target)
            .with_context(|| format!("Failed to extract archive to: {}", target.display()))?;

        Ok(Some(vec![target]))
    }
}

/// Writes a listing of the primary input and every dependency with its
/// SHA-256.
struct ManifestAction {
    file_name: String,
}

impl ManifestAction {
    fn line(path: &Path) -> Result<String> {
        let hash = if path.is_dir() {
            "directory".to_string()
        } else {
            let content =
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            hex::encode(Sha256::digest(&content))
        };
        Ok(format!("{}  {}", hash, file_name(path)?))
    }
}

impl TransformAction for ManifestAction {
    fn transform(&mut self, context: &TransformContext<'_>) -> Result<Vec<PathBuf>> {
        let mut lines = vec![Self::line(context.primary_input)?];
        for dependency in context.dependencies.files() {
            lines.push(Self::line(dependency)?);
        }

        let target = context.output_dir.join(&self.file_name);
        fs::write(&target, lines.join("\n") + "\n")
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(vec![target])
    }
}
