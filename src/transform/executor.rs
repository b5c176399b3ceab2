//! Runs transform steps and computes their cache identity.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::dependencies::ArtifactTransformDependencies;
use super::error::TransformError;
use super::fingerprint::{DefaultFingerprinterRegistry, FingerprinterRegistry, InputFingerprints};
use super::identity::{HashCode, TransformerIdentity};
use super::resolver::{IdentityResolver, PathToFileResolver};
use super::transformer::Transformer;
use crate::logging::{operations, status};

/// Outputs of one successful invocation.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub outputs: Vec<PathBuf>,
    pub duration: Duration,
}

/// Cache identity of one prospective invocation.
#[derive(Debug, Clone)]
pub struct Identification {
    pub identity: TransformerIdentity,
    pub fingerprints: InputFingerprints,
    pub cache_key: HashCode,
}

/// Executes transforms and fingerprints their inputs.
///
/// Holds no per-invocation state and may be shared between threads. Each
/// invocation must be given its own output directory.
#[derive(Clone)]
pub struct TransformExecutor {
    registry: Arc<dyn FingerprinterRegistry>,
    resolver: Arc<dyn PathToFileResolver>,
}

impl TransformExecutor {
    pub fn new(
        registry: Arc<dyn FingerprinterRegistry>,
        resolver: Arc<dyn PathToFileResolver>,
    ) -> Self {
        Self { registry, resolver }
    }

    pub fn execute(
        &self,
        transformer: &dyn Transformer,
        primary_input: &Path,
        output_dir: &Path,
        dependencies: &dyn ArtifactTransformDependencies,
    ) -> Result<ExecutionResult, TransformError> {
        let start = Instant::now();
        debug!(
            operation = operations::EXECUTE,
            implementation = %transformer.implementation(),
            primary_input = %primary_input.display(),
            output_dir = %output_dir.display(),
            "executing transform"
        );

        fs::create_dir_all(output_dir).map_err(|source| TransformError::Io {
            implementation: transformer.implementation().clone(),
            path: output_dir.to_path_buf(),
            source,
        })?;

        match transformer.transform(primary_input, output_dir, dependencies) {
            Ok(outputs) => {
                let duration = start.elapsed();
                info!(
                    operation = operations::EXECUTE,
                    status = status::SUCCESS,
                    implementation = %transformer.implementation(),
                    primary_input = %primary_input.display(),
                    output_count = outputs.len(),
                    duration_ms = duration.as_millis() as u64,
                    "transform completed"
                );
                Ok(ExecutionResult { outputs, duration })
            }
            Err(e) => {
                warn!(
                    operation = operations::EXECUTE,
                    status = status::ERROR,
                    implementation = %transformer.implementation(),
                    primary_input = %primary_input.display(),
                    error_kind = e.kind(),
                    "transform failed: {}",
                    e
                );
                Err(e)
            }
        }
    }

    pub fn fingerprint(
        &self,
        transformer: &dyn Transformer,
        primary_input: &Path,
        dependencies: &dyn ArtifactTransformDependencies,
    ) -> Result<InputFingerprints, TransformError> {
        let fingerprints = transformer.input_file_fingerprints(
            primary_input,
            dependencies,
            self.registry.as_ref(),
            self.resolver.as_ref(),
        )?;
        debug!(
            operation = operations::FINGERPRINT,
            implementation = %transformer.implementation(),
            primary_input = %primary_input.display(),
            property_count = fingerprints.len(),
            hash = %fingerprints.combined_hash().short(),
            "fingerprinted inputs"
        );
        Ok(fingerprints)
    }

    /// Static identity, input fingerprints and the resulting cache key,
    /// without running the transform.
    pub fn identify(
        &self,
        transformer: &dyn Transformer,
        primary_input: &Path,
        dependencies: &dyn ArtifactTransformDependencies,
    ) -> Result<Identification, TransformError> {
        let identity = transformer.identity();
        let fingerprints = self.fingerprint(transformer, primary_input, dependencies)?;
        let cache_key = identity.cache_key(&fingerprints);
        debug!(
            operation = operations::IDENTIFY,
            implementation = %identity.implementation,
            from_attributes = %identity.from_attributes,
            cache_key = %cache_key.short(),
            "identified transform"
        );
        Ok(Identification {
            identity,
            fingerprints,
            cache_key,
        })
    }
}

impl Default for TransformExecutor {
    fn default() -> Self {
        Self::new(
            Arc::new(DefaultFingerprinterRegistry::new()),
            Arc::new(IdentityResolver),
        )
    }
}
