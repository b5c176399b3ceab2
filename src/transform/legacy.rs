//! Legacy single-directory transforms.
//!
//! A legacy implementation is told its output directory, then asked to
//! transform one input file. It never sees dependency artifacts, and only
//! its primary input is fingerprinted, path-sensitively.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::dependencies::ArtifactTransformDependencies;
use super::error::{InstantiationError, TransformError};
use super::fingerprint::{
    FingerprinterRegistry, InputFilePropertyType, InputFingerprints, Normalization,
    PRIMARY_INPUT_PROPERTY_NAME,
};
use super::identity::{HashCode, ImmutableAttributes, ImplementationId, InputsHash};
use super::instantiator::InstantiatorRegistry;
use super::params::ParameterSnapshot;
use super::resolver::PathToFileResolver;
use super::transformer::{fingerprint_input, validate_outputs, Transformer, TransformerBase};

/// A legacy transform implementation. One instance serves one invocation.
pub trait ArtifactTransform: Send {
    fn set_output_directory(&mut self, output_dir: &Path);

    /// Transform `input`. `Ok(None)` means the implementation produced no
    /// result at all, which is rejected.
    fn transform(&mut self, input: &Path) -> anyhow::Result<Option<Vec<PathBuf>>>;
}

pub type LegacyInstantiator = InstantiatorRegistry<dyn ArtifactTransform>;

pub struct LegacyTransformer {
    base: TransformerBase,
    parameters: ParameterSnapshot,
    instantiator: Arc<LegacyInstantiator>,
}

impl LegacyTransformer {
    pub fn new(
        implementation: ImplementationId,
        parameters: ParameterSnapshot,
        inputs_hash: HashCode,
        instantiator: Arc<LegacyInstantiator>,
        from_attributes: ImmutableAttributes,
    ) -> Self {
        Self {
            base: TransformerBase::new(implementation, inputs_hash, from_attributes),
            parameters,
            instantiator,
        }
    }

    /// Register-time constructor: checks the implementation exists and
    /// derives the inputs hash from it and its parameters.
    pub fn configure(
        implementation: ImplementationId,
        parameters: ParameterSnapshot,
        instantiator: Arc<LegacyInstantiator>,
        from_attributes: ImmutableAttributes,
    ) -> Result<Self, TransformError> {
        if !instantiator.contains(&implementation) {
            return Err(InstantiationError::Unresolved(implementation).into());
        }
        let inputs_hash = InputsHash::compute(&implementation, &parameters);
        Ok(Self::new(
            implementation,
            parameters,
            inputs_hash,
            instantiator,
            from_attributes,
        ))
    }

    pub fn parameters(&self) -> &ParameterSnapshot {
        &self.parameters
    }

    fn new_transformer(&self) -> Result<Box<dyn ArtifactTransform>, InstantiationError> {
        self.instantiator
            .instantiate(self.implementation(), self.parameters.materialize())
    }
}

impl Transformer for LegacyTransformer {
    fn base(&self) -> &TransformerBase {
        &self.base
    }

    fn requires_dependencies(&self) -> bool {
        false
    }

    fn transform(
        &self,
        primary_input: &Path,
        output_dir: &Path,
        _dependencies: &dyn ArtifactTransformDependencies,
    ) -> Result<Vec<PathBuf>, TransformError> {
        let mut transformer = self.new_transformer()?;
        transformer.set_output_directory(output_dir);
        let outputs = transformer
            .transform(primary_input)
            .map_err(|source| TransformError::Execution {
                implementation: self.implementation().clone(),
                primary_input: primary_input.to_path_buf(),
                source,
            })?
            .ok_or_else(|| TransformError::InvalidTransformResult {
                implementation: self.implementation().clone(),
                primary_input: primary_input.to_path_buf(),
                reason: "Transform returned null result".to_string(),
            })?;
        validate_outputs(self.implementation(), primary_input, output_dir, outputs)
    }

    fn input_file_fingerprints(
        &self,
        primary_input: &Path,
        _dependencies: &dyn ArtifactTransformDependencies,
        registry: &dyn FingerprinterRegistry,
        resolver: &dyn PathToFileResolver,
    ) -> Result<InputFingerprints, TransformError> {
        let mut fingerprints = InputFingerprints::new();
        fingerprints.insert(
            PRIMARY_INPUT_PROPERTY_NAME,
            fingerprint_input(
                self.implementation(),
                PRIMARY_INPUT_PROPERTY_NAME,
                &[primary_input.to_path_buf()],
                Normalization::AbsolutePath,
                InputFilePropertyType::Files,
                registry,
                resolver,
            )?,
        );
        Ok(fingerprints)
    }
}
