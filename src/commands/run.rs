/// `artifact-transform run` command implementation
///
/// Identifies every input first, then executes each distinct cache key once
/// in the output directory named after it. Inputs sharing a cache key share
/// that execution's outputs, so no directory ever has two writers.
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::cli::RunArgs;
use crate::transform::{
    BaseDirResolver, DefaultFingerprinterRegistry, DependencySet, ExecutionResult, HashCode,
    TransformCatalog, TransformExecutor, Transformer,
};

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    /// Input whose execution produced `outputs`. Differs from `input` when
    /// several inputs share a cache key.
    pub executed_input: PathBuf,
    pub implementation: String,
    pub cache_key: String,
    pub output_dir: PathBuf,
    pub outputs: Vec<PathBuf>,
    pub duration_ms: u64,
}

/// One execution in the output directory owned by its cache key.
#[derive(Debug)]
pub struct Execution {
    pub output_dir: PathBuf,
    pub result: ExecutionResult,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let (config, _) = super::load_settings(&args.common)?;
    super::init_logging(&config);

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let step = super::prepare_step(&args.transform, &TransformCatalog::builtin(), &cwd)?;
    let executor = Arc::new(TransformExecutor::new(
        Arc::new(DefaultFingerprinterRegistry::new()),
        Arc::new(BaseDirResolver::new(&cwd)),
    ));
    let output_root = cwd.join(&config.workspace.output_root);
    let semaphore = Arc::new(Semaphore::new(config.workspace.effective_parallelism()));
    let total = step.inputs.len();
    let mut failures = 0;

    let mut identifying = Vec::with_capacity(total);
    for input in &step.inputs {
        let executor = executor.clone();
        let transformer = step.transformer.clone();
        let dependencies = step.dependencies.clone();
        let task_input = input.clone();
        let handle = spawn_limited(&semaphore, move || {
            let identification =
                executor.identify(transformer.as_ref(), &task_input, dependencies.as_ref())?;
            Ok(identification.cache_key)
        })
        .await?;
        identifying.push((input.clone(), handle));
    }

    // Inputs keep their command-line position for reporting
    let mut groups: BTreeMap<HashCode, Vec<(usize, PathBuf)>> = BTreeMap::new();
    for (index, (input, handle)) in identifying.into_iter().enumerate() {
        match join(handle).await {
            Ok(cache_key) => groups.entry(cache_key).or_default().push((index, input)),
            Err(e) => {
                failures += 1;
                report_failure(&input, &e);
            }
        }
    }

    let mut executing = Vec::with_capacity(groups.len());
    for (cache_key, inputs) in groups {
        let Some((_, primary)) = inputs.first().cloned() else {
            continue;
        };
        if inputs.len() > 1 {
            debug!(
                cache_key = %cache_key.short(),
                input_count = inputs.len(),
                "inputs share a cache key, executing once"
            );
        }
        let executor = executor.clone();
        let transformer = step.transformer.clone();
        let dependencies = step.dependencies.clone();
        let output_root = output_root.clone();
        let task_input = primary.clone();
        let handle = spawn_limited(&semaphore, move || {
            execute_key(
                &executor,
                transformer.as_ref(),
                &task_input,
                &dependencies,
                &output_root,
                &cache_key,
            )
        })
        .await?;
        executing.push((cache_key, primary, inputs, handle));
    }

    let implementation = step.transformer.implementation().to_string();
    let mut reports = Vec::with_capacity(total);
    for (cache_key, primary, inputs, handle) in executing {
        match join(handle).await {
            Ok(execution) => {
                reports.extend(inputs.into_iter().map(|(index, input)| {
                    let report = RunReport {
                        input,
                        executed_input: primary.clone(),
                        implementation: implementation.clone(),
                        cache_key: cache_key.to_hex(),
                        output_dir: execution.output_dir.clone(),
                        outputs: execution.result.outputs.clone(),
                        duration_ms: execution.result.duration.as_millis() as u64,
                    };
                    (index, report)
                }));
            }
            Err(e) => {
                failures += inputs.len();
                for (_, input) in &inputs {
                    report_failure(input, &e);
                }
            }
        }
    }
    reports.sort_by_key(|(index, _)| *index);
    let reports: Vec<RunReport> = reports.into_iter().map(|(_, report)| report).collect();

    if args.transform.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!(
                "{} | {} | {} output(s) | {:.2}s",
                report.input.display(),
                &report.cache_key[..16],
                report.outputs.len(),
                report.duration_ms as f64 / 1000.0
            );
            for output in &report.outputs {
                println!("  {}", output.display());
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} transform(s) failed", failures, total);
    }
    Ok(())
}

/// Execute `input` in the directory owned by `cache_key`, clearing what an
/// earlier run left there.
pub fn execute_key(
    executor: &TransformExecutor,
    transformer: &dyn Transformer,
    input: &Path,
    dependencies: &DependencySet,
    output_root: &Path,
    cache_key: &HashCode,
) -> Result<Execution> {
    let output_dir = output_root
        .join(transformer.implementation().as_str())
        .join(cache_key.short());

    if output_dir.exists() {
        fs::remove_dir_all(&output_dir).with_context(|| {
            format!("Failed to clear output directory: {}", output_dir.display())
        })?;
    }

    let result = executor.execute(transformer, input, &output_dir, dependencies)?;
    Ok(Execution { output_dir, result })
}

async fn spawn_limited<T, F>(semaphore: &Arc<Semaphore>, task: F) -> Result<JoinHandle<Result<T>>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let permit = semaphore
        .clone()
        .acquire_owned()
        .await
        .context("Execution pool closed")?;
    Ok(tokio::task::spawn_blocking(move || {
        let _permit = permit;
        task()
    }))
}

async fn join<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    handle.await.context("Transform task panicked")?
}

fn report_failure(input: &Path, e: &anyhow::Error) {
    error!(primary_input = %input.display(), "{:#}", e);
    eprintln!("[transform] {}: {:#}", input.display(), e);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{ImmutableAttributes, ImplementationId, ParameterSnapshot};
    use tempfile::TempDir;

    #[test]
    fn test_execute_key_uses_cache_key_directory() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in.txt");
        fs::write(&input, "data").unwrap();
        let root = temp.path().join("out");

        let transformer = TransformCatalog::builtin()
            .transformer(
                ImplementationId::new("copy"),
                ParameterSnapshot::capture(&["copy.txt"]).unwrap(),
                ImmutableAttributes::empty(),
            )
            .unwrap();
        let executor = TransformExecutor::default();
        let deps = DependencySet::empty();
        let cache_key = executor
            .identify(transformer.as_ref(), &input, &deps)
            .unwrap()
            .cache_key;

        let first =
            execute_key(&executor, transformer.as_ref(), &input, &deps, &root, &cache_key).unwrap();
        assert_eq!(first.output_dir, root.join("copy").join(cache_key.short()));
        assert_eq!(first.result.outputs, vec![first.output_dir.join("copy.txt")]);

        // Re-running clears and recreates the same directory
        fs::write(first.output_dir.join("stale.txt"), "old").unwrap();
        let second =
            execute_key(&executor, transformer.as_ref(), &input, &deps, &root, &cache_key).unwrap();
        assert_eq!(first.output_dir, second.output_dir);
        assert!(!second.output_dir.join("stale.txt").exists());
    }
}
