//! Artifact transform execution and cache identity.
//!
//! A [`Transformer`] is a configured, immutable transform step. The
//! [`TransformExecutor`] runs it against a primary input and an exclusive
//! output directory, and fingerprints its inputs so a build cache can decide
//! whether a previous execution can be reused.

pub mod action;
pub mod builtin;
pub mod catalog;
pub mod dependencies;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod identity;
pub mod instantiator;
pub mod legacy;
pub mod params;
pub mod paths;
pub mod resolver;
pub mod transformer;

pub use action::{ActionInputs, DefaultTransformer, TransformAction, TransformContext};
pub use catalog::{TransformCatalog, TransformKind};
pub use dependencies::{ArtifactTransformDependencies, DependencySet};
pub use error::{ConfigurationError, FingerprintError, InstantiationError, TransformError};
pub use executor::{ExecutionResult, Identification, TransformExecutor};
pub use fingerprint::{
    DefaultFingerprinterRegistry, FileCollectionFingerprint, FingerprinterRegistry,
    InputFilePropertyType, InputFingerprints, Normalization, DEPENDENCIES_PROPERTY_NAME,
    PRIMARY_INPUT_PROPERTY_NAME,
};
pub use identity::{HashCode, ImmutableAttributes, ImplementationId, InputsHash, TransformerIdentity};
pub use legacy::{ArtifactTransform, LegacyInstantiator, LegacyTransformer};
pub use params::{Arguments, ParameterSnapshot};
pub use resolver::{BaseDirResolver, IdentityResolver, PathToFileResolver};
pub use transformer::Transformer;
