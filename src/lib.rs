// Library interface for artifact-transform
// This allows integration tests and external code to use the transform core

pub mod cli;
pub mod commands;
pub mod config;
pub mod config_discovery;
pub mod logging;
pub mod transform;

// Re-export commonly used types
pub use config::TransformConfig;
pub use transform::{
    DependencySet, InputFingerprints, LegacyTransformer, ParameterSnapshot, TransformCatalog,
    TransformError, TransformExecutor, Transformer, TransformerIdentity,
};
