//! Parameterized transform actions.
//!
//! Unlike legacy transforms, an action receives everything in one
//! [`TransformContext`], may consume upstream dependency artifacts, and
//! declares how its inputs are normalized for fingerprinting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::dependencies::ArtifactTransformDependencies;
use super::error::{InstantiationError, TransformError};
use super::fingerprint::{
    FingerprinterRegistry, InputFilePropertyType, InputFingerprints, Normalization,
    DEPENDENCIES_PROPERTY_NAME, PRIMARY_INPUT_PROPERTY_NAME,
};
use super::identity::{ImmutableAttributes, ImplementationId, InputsHash};
use super::instantiator::InstantiatorRegistry;
use super::params::ParameterSnapshot;
use super::resolver::PathToFileResolver;
use super::transformer::{fingerprint_input, validate_outputs, Transformer, TransformerBase};

/// Inputs of one action invocation.
pub struct TransformContext<'a> {
    pub primary_input: &'a Path,
    pub output_dir: &'a Path,
    pub dependencies: &'a dyn ArtifactTransformDependencies,
}

pub trait TransformAction: Send {
    fn transform(&mut self, context: &TransformContext<'_>) -> anyhow::Result<Vec<PathBuf>>;
}

pub type ActionInstantiator = InstantiatorRegistry<dyn TransformAction>;

/// How an action's inputs take part in its fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionInputs {
    pub primary_normalization: Normalization,
    pub requires_dependencies: bool,
    pub dependencies_normalization: Normalization,
}

impl Default for ActionInputs {
    fn default() -> Self {
        Self {
            primary_normalization: Normalization::AbsolutePath,
            requires_dependencies: false,
            dependencies_normalization: Normalization::AbsolutePath,
        }
    }
}

pub struct DefaultTransformer {
    base: TransformerBase,
    parameters: ParameterSnapshot,
    inputs: ActionInputs,
    instantiator: Arc<ActionInstantiator>,
}

impl DefaultTransformer {
    pub fn configure(
        implementation: ImplementationId,
        parameters: ParameterSnapshot,
        inputs: ActionInputs,
        instantiator: Arc<ActionInstantiator>,
        from_attributes: ImmutableAttributes,
    ) -> Result<Self, TransformError> {
        if !instantiator.contains(&implementation) {
            return Err(InstantiationError::Unresolved(implementation).into());
        }
        let inputs_hash = InputsHash::compute(&implementation, &parameters);
        Ok(Self {
            base: TransformerBase::new(implementation, inputs_hash, from_attributes),
            parameters,
            inputs,
            instantiator,
        })
    }

    pub fn inputs(&self) -> ActionInputs {
        self.inputs
    }
}

impl Transformer for DefaultTransformer {
    fn base(&self) -> &TransformerBase {
        &self.base
    }

    fn requires_dependencies(&self) -> bool {
        self.inputs.requires_dependencies
    }

    fn transform(
        &self,
        primary_input: &Path,
        output_dir: &Path,
        dependencies: &dyn ArtifactTransformDependencies,
    ) -> Result<Vec<PathBuf>, TransformError> {
        let mut action = self
            .instantiator
            .instantiate(self.implementation(), self.parameters.materialize())?;
        let context = TransformContext {
            primary_input,
            output_dir,
            dependencies,
        };
        let outputs = action
            .transform(&context)
            .map_err(|source| TransformError::Execution {
                implementation: self.implementation().clone(),
                primary_input: primary_input.to_path_buf(),
                source,
            })?;
        validate_outputs(self.implementation(), primary_input, output_dir, outputs)
    }

    fn input_file_fingerprints(
        &self,
        primary_input: &Path,
        dependencies: &dyn ArtifactTransformDependencies,
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
                self.inputs.primary_normalization,
                InputFilePropertyType::Files,
                registry,
                resolver,
            )?,
        );
        if self.inputs.requires_dependencies {
            fingerprints.insert(
                DEPENDENCIES_PROPERTY_NAME,
                fingerprint_input(
                    self.implementation(),
                    DEPENDENCIES_PROPERTY_NAME,
                    dependencies.files(),
                    self.inputs.dependencies_normalization,
                    InputFilePropertyType::Files,
                    registry,
                    resolver,
                )?,
            );
        }
        Ok(fingerprints)
    }
}
