//! The contract every transform kind implements.

use std::path::{Path, PathBuf};

use super::dependencies::ArtifactTransformDependencies;
use super::error::TransformError;
use super::fingerprint::{
    FileCollectionFingerprint, FingerprinterRegistry, InputFilePropertyType, InputFingerprints,
    Normalization,
};
use super::identity::{HashCode, ImmutableAttributes, ImplementationId, TransformerIdentity};
use super::paths::{absolutize, is_within};
use super::resolver::PathToFileResolver;

/// A configured, immutable transform step.
///
/// A `Transformer` is shared read-only between concurrent invocations. Any
/// per-invocation state lives in the implementation instance created for
/// that invocation.
pub trait Transformer: Send + Sync {
    fn base(&self) -> &TransformerBase;

    fn implementation(&self) -> &ImplementationId {
        &self.base().implementation
    }

    fn inputs_hash(&self) -> HashCode {
        self.base().inputs_hash
    }

    fn from_attributes(&self) -> &ImmutableAttributes {
        &self.base().from_attributes
    }

    fn identity(&self) -> TransformerIdentity {
        let base = self.base();
        TransformerIdentity {
            implementation: base.implementation.clone(),
            inputs_hash: base.inputs_hash,
            from_attributes: base.from_attributes.clone(),
        }
    }

    /// Whether the caller must assemble dependency artifacts before
    /// fingerprinting or executing this step.
    fn requires_dependencies(&self) -> bool;

    /// Run the transform, returning validated outputs in the order the
    /// implementation produced them.
    fn transform(
        &self,
        primary_input: &Path,
        output_dir: &Path,
        dependencies: &dyn ArtifactTransformDependencies,
    ) -> Result<Vec<PathBuf>, TransformError>;

    /// Fingerprints of every input property, sorted by property name.
    fn input_file_fingerprints(
        &self,
        primary_input: &Path,
        dependencies: &dyn ArtifactTransformDependencies,
        registry: &dyn FingerprinterRegistry,
        resolver: &dyn PathToFileResolver,
    ) -> Result<InputFingerprints, TransformError>;
}

/// Fields common to all transform kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformerBase {
    pub implementation: ImplementationId,
    pub inputs_hash: HashCode,
    pub from_attributes: ImmutableAttributes,
}

impl TransformerBase {
    pub fn new(
        implementation: ImplementationId,
        inputs_hash: HashCode,
        from_attributes: ImmutableAttributes,
    ) -> Self {
        Self {
            implementation,
            inputs_hash,
            from_attributes,
        }
    }
}

/// Check that every output is the primary input itself, or the output
/// directory or something beneath it.
///
/// Relative paths, whether outputs, `primary_input` or `output_dir`, are
/// resolved against the current directory, so an implementation reporting
/// `output_dir.join(name)` gets back the path it wrote. Paths are compared
/// after lexical normalization; symbolic links are not followed. Order and
/// duplicates are preserved, and the returned paths are absolute.
pub fn validate_outputs(
    implementation: &ImplementationId,
    primary_input: &Path,
    output_dir: &Path,
    outputs: Vec<PathBuf>,
) -> Result<Vec<PathBuf>, TransformError> {
    let io_error = |path: &Path, source: std::io::Error| TransformError::Io {
        implementation: implementation.clone(),
        path: path.to_path_buf(),
        source,
    };
    let primary = absolutize(primary_input).map_err(|e| io_error(primary_input, e))?;
    let output_root = absolutize(output_dir).map_err(|e| io_error(output_dir, e))?;

    outputs
        .into_iter()
        .map(|output| {
            let resolved = absolutize(&output).map_err(|e| io_error(&output, e))?;
            if resolved == primary || is_within(&resolved, &output_root) {
                Ok(resolved)
            } else {
                Err(TransformError::InvalidTransformResult {
                    implementation: implementation.clone(),
                    primary_input: primary_input.to_path_buf(),
                    reason: format!(
                        "output {} is neither the primary input nor inside the output directory {}",
                        output.display(),
                        output_root.display()
                    ),
                })
            }
        })
        .collect()
}

/// Fingerprint one named input property with the fingerprinter the registry
/// provides for `normalization`.
pub fn fingerprint_input(
    implementation: &ImplementationId,
    property: &str,
    roots: &[PathBuf],
    normalization: Normalization,
    property_type: InputFilePropertyType,
    registry: &dyn FingerprinterRegistry,
    resolver: &dyn PathToFileResolver,
) -> Result<FileCollectionFingerprint, TransformError> {
    let resolved: Vec<PathBuf> = roots.iter().map(|root| resolver.resolve(root)).collect();
    registry
        .fingerprinter(normalization, property_type)
        .fingerprint(&resolved)
        .map_err(|source| TransformError::Fingerprint {
            implementation: implementation.clone(),
            property: property.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ImplementationId {
        ImplementationId::new("test")
    }

    #[test]
    fn test_validate_outputs_accepts_contained_paths() {
        let outputs = validate_outputs(
            &id(),
            Path::new("/in/lib.jar"),
            Path::new("/work/out"),
            vec![
                PathBuf::from("/work/out/classes"),
                PathBuf::from("/in/lib.jar"),
                PathBuf::from("/work/out/./sub/../relative.txt"),
                PathBuf::from("/work/out"),
                PathBuf::from("/work/out/classes"),
            ],
        )
        .unwrap();

        assert_eq!(
            outputs,
            vec![
                PathBuf::from("/work/out/classes"),
                PathBuf::from("/in/lib.jar"),
                PathBuf::from("/work/out/relative.txt"),
                PathBuf::from("/work/out"),
                PathBuf::from("/work/out/classes"),
            ]
        );
    }

    #[test]
    fn test_validate_outputs_rejects_escaping_paths() {
        for escaping in ["/tmp/elsewhere.txt", "/work/out/../sibling", "../up.txt", "/in"] {
            let result = validate_outputs(
                &id(),
                Path::new("/in/lib.jar"),
                Path::new("/work/out"),
                vec![PathBuf::from(escaping)],
            );
            assert!(
                matches!(result, Err(TransformError::InvalidTransformResult { .. })),
                "{} should be rejected",
                escaping
            );
        }
    }

    #[test]
    fn test_validate_outputs_relative_paths_resolve_against_current_dir() {
        let cwd = std::env::current_dir().unwrap();
        let outputs = validate_outputs(
            &id(),
            Path::new("in/lib.jar"),
            Path::new("work/out"),
            vec![
                PathBuf::from("work/out/copy.txt"),
                PathBuf::from("in/lib.jar"),
                PathBuf::from("./work/out/sub/../b.txt"),
            ],
        )
        .unwrap();
        assert_eq!(
            outputs,
            vec![
                cwd.join("work/out/copy.txt"),
                cwd.join("in/lib.jar"),
                cwd.join("work/out/b.txt"),
            ]
        );

        // Relative to the output directory is not the same as inside it
        for escaping in ["copy.txt", "work/out/../../in.txt", "in"] {
            let result = validate_outputs(
                &id(),
                Path::new("in/lib.jar"),
                Path::new("work/out"),
                vec![PathBuf::from(escaping)],
            );
            assert!(
                matches!(result, Err(TransformError::InvalidTransformResult { .. })),
                "{} should be rejected",
                escaping
            );
        }
    }

    #[test]
    fn test_validate_outputs_empty_is_valid() {
        let outputs =
            validate_outputs(&id(), Path::new("/in/a"), Path::new("/out"), vec![]).unwrap();
        assert!(outputs.is_empty());
    }
}
