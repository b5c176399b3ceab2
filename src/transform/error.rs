//! Error types for transform execution and fingerprinting.

use std::path::PathBuf;

use super::identity::ImplementationId;

/// Errors surfaced by [`TransformExecutor`](super::executor::TransformExecutor)
/// and the [`Transformer`](super::transformer::Transformer) variants.
///
/// Nothing in this module retries. Every variant carries enough context to
/// diagnose the failure without inspecting executor state.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// A parameter could not be isolated when the transform was registered.
    #[error("invalid transform configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The implementation could not be constructed from its parameters.
    #[error(transparent)]
    Instantiation(#[from] InstantiationError),

    /// The implementation returned no result, or an output outside the
    /// primary input and the output directory.
    #[error("invalid result from transform '{implementation}' for {}: {reason}", .primary_input.display())]
    InvalidTransformResult {
        implementation: ImplementationId,
        primary_input: PathBuf,
        reason: String,
    },

    /// An input could not be read while fingerprinting.
    #[error("failed to fingerprint property '{property}' of transform '{implementation}': {source}")]
    Fingerprint {
        implementation: ImplementationId,
        property: String,
        #[source]
        source: FingerprintError,
    },

    /// The implementation itself failed while transforming.
    #[error("transform '{implementation}' failed for {}: {source:#}", .primary_input.display())]
    Execution {
        implementation: ImplementationId,
        primary_input: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The executor could not prepare the invocation.
    #[error("I/O error at {} for transform '{implementation}': {source}", .path.display())]
    Io {
        implementation: ImplementationId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransformError {
    /// Short, stable name of the error kind for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Instantiation(_) => "instantiation",
            Self::InvalidTransformResult { .. } => "invalid_result",
            Self::Fingerprint { .. } => "fingerprint",
            Self::Execution { .. } => "execution",
            Self::Io { .. } => "io",
        }
    }
}

/// A parameter snapshot could not be captured.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("parameter {index} cannot be isolated: {reason}")]
    NotIsolatable { index: usize, reason: String },
}

/// A transform implementation could not be constructed.
#[derive(Debug, thiserror::Error)]
pub enum InstantiationError {
    #[error("no transform implementation registered as '{0}'")]
    Unresolved(ImplementationId),

    #[error("transform '{implementation}' expects {expected} parameter(s), got {actual}")]
    Arity {
        implementation: ImplementationId,
        expected: String,
        actual: usize,
    },

    #[error("parameter {index} of transform '{implementation}' is invalid: {reason}")]
    Parameter {
        implementation: ImplementationId,
        index: usize,
        reason: String,
    },
}

/// A file or directory could not be fingerprinted.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// The input does not exist. Callers may treat this as invalidation.
    #[error("input does not exist: {}", .0.display())]
    Missing(PathBuf),

    /// The input exists but has the wrong type for the property.
    #[error("expected a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FingerprintError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
