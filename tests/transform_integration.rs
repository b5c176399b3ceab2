/// End-to-end tests of transform execution and cache identity through the
/// public library API.
mod common;

use artifact_transform::transform::{
    ArtifactTransform, DependencySet, ImmutableAttributes, ImplementationId, LegacyInstantiator,
    LegacyTransformer, ParameterSnapshot, TransformCatalog, TransformError, TransformExecutor,
    Transformer, PRIMARY_INPUT_PROPERTY_NAME,
};
use common::TestWorkspace;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

fn builtin(id: &str, params: ParameterSnapshot) -> Arc<dyn Transformer> {
    TransformCatalog::builtin()
        .transformer(ImplementationId::new(id), params, ImmutableAttributes::empty())
        .unwrap()
}

#[test]
fn test_copy_twice_into_fresh_output_dirs() {
    let ws = TestWorkspace::new();
    let input = ws.create_file("input.txt", "hello transforms");
    let transformer = builtin("copy", ParameterSnapshot::capture(&["copy.txt"]).unwrap());
    let executor = TransformExecutor::default();
    let deps = DependencySet::empty();

    let first = executor
        .execute(transformer.as_ref(), &input, &ws.join("out1"), &deps)
        .unwrap();
    let second = executor
        .execute(transformer.as_ref(), &input, &ws.join("out2"), &deps)
        .unwrap();

    for result in [&first, &second] {
        assert_eq!(result.outputs.len(), 1);
        assert!(result.outputs[0].ends_with("copy.txt"));
        assert_eq!(
            fs::read_to_string(&result.outputs[0]).unwrap(),
            "hello transforms"
        );
    }
    assert_ne!(first.outputs[0], second.outputs[0]);

    let fp1 = executor.fingerprint(transformer.as_ref(), &input, &deps).unwrap();
    let fp2 = executor.fingerprint(transformer.as_ref(), &input, &deps).unwrap();
    assert_eq!(fp1, fp2);
    assert_eq!(fp1.len(), 1);
    assert_eq!(
        fp1.properties().collect::<Vec<_>>(),
        vec![PRIMARY_INPUT_PROPERTY_NAME]
    );
}

#[test]
fn test_primary_input_is_not_modified() {
    let ws = TestWorkspace::new();
    let input = ws.create_file("input.txt", "original");
    let transformer = builtin("copy", ParameterSnapshot::empty());
    let executor = TransformExecutor::default();
    let deps = DependencySet::empty();

    let before = executor.fingerprint(transformer.as_ref(), &input, &deps).unwrap();
    executor
        .execute(transformer.as_ref(), &input, &ws.join("out"), &deps)
        .unwrap();
    let after = executor.fingerprint(transformer.as_ref(), &input, &deps).unwrap();

    assert_eq!(before, after);
}

#[test]
fn test_unpack_archive_end_to_end() {
    let ws = TestWorkspace::new();
    let archive = ws.create_archive(
        "guava.tar.zst",
        &[("com/google/A.class", "a"), ("META-INF/MANIFEST.MF", "m")],
    );
    let transformer = builtin("unpack", ParameterSnapshot::empty());
    let out = ws.join("out");

    let result = TransformExecutor::default()
        .execute(transformer.as_ref(), &archive, &out, &DependencySet::empty())
        .unwrap();

    assert_eq!(result.outputs, vec![out.join("guava")]);
    assert!(out.join("guava/com/google/A.class").is_file());
    assert!(out.join("guava/META-INF/MANIFEST.MF").is_file());
}

#[test]
fn test_relative_paths_yield_existing_outputs() {
    let ws = TestWorkspace::new_in_current_dir();
    ws.create_file("in.txt", "relative");
    let input = ws.relative("in.txt");
    let out = ws.relative("out");
    assert!(input.is_relative() && out.is_relative());
    let executor = TransformExecutor::default();
    let deps = DependencySet::empty();

    let copy = builtin("copy", ParameterSnapshot::capture(&["copy.txt"]).unwrap());
    let copied = executor
        .execute(copy.as_ref(), &input, &out.join("copy"), &deps)
        .unwrap();
    assert_eq!(copied.outputs, vec![ws.join("out/copy/copy.txt")]);
    assert_eq!(fs::read_to_string(&copied.outputs[0]).unwrap(), "relative");

    let identity = builtin("identity", ParameterSnapshot::empty());
    let passed = executor
        .execute(identity.as_ref(), &input, &out.join("identity"), &deps)
        .unwrap();
    assert_eq!(passed.outputs, vec![ws.join("in.txt")]);
    assert!(passed.outputs[0].is_file());
}

#[test]
fn test_identity_returns_primary_input() {
    let ws = TestWorkspace::new();
    let input = ws.create_file("lib.jar", "jar");
    let transformer = builtin("identity", ParameterSnapshot::empty());

    let result = TransformExecutor::default()
        .execute(transformer.as_ref(), &input, &ws.join("out"), &DependencySet::empty())
        .unwrap();

    assert_eq!(result.outputs, vec![input]);
}

#[test]
fn test_manifest_action_fingerprints_dependencies() {
    let ws = TestWorkspace::new();
    let input = ws.create_file("app.jar", "app");
    ws.create_file("libs/a.jar", "a");
    ws.create_file("libs/b.jar", "b");
    let deps = DependencySet::from_globs(&["libs/*.jar"], ws.path()).unwrap();
    let transformer = builtin("manifest", ParameterSnapshot::empty());
    assert!(transformer.requires_dependencies());

    let executor = TransformExecutor::default();
    let identification = executor.identify(transformer.as_ref(), &input, &deps).unwrap();
    assert_eq!(
        identification.fingerprints.properties().collect::<Vec<_>>(),
        vec!["dependencies", "primaryInput"]
    );

    let result = executor
        .execute(transformer.as_ref(), &input, &ws.join("out"), &deps)
        .unwrap();
    let manifest = fs::read_to_string(&result.outputs[0]).unwrap();
    assert_eq!(manifest.lines().count(), 3);

    ws.create_file("libs/b.jar", "b2");
    let changed = executor.identify(transformer.as_ref(), &input, &deps).unwrap();
    assert_ne!(identification.cache_key, changed.cache_key);
}

/// Records the parameters each instance was created with, then mutates its
/// own copy.
struct Recording {
    params: Vec<Value>,
    seen: Arc<Mutex<Vec<Value>>>,
    output_dir: PathBuf,
    escape_to: Option<PathBuf>,
}

impl ArtifactTransform for Recording {
    fn set_output_directory(&mut self, output_dir: &Path) {
        self.output_dir = output_dir.to_path_buf();
    }

    fn transform(&mut self, input: &Path) -> anyhow::Result<Option<Vec<PathBuf>>> {
        self.seen.lock().unwrap().push(self.params[0].clone());
        self.params[0]["count"] = json!(self.params[0]["count"].as_u64().unwrap_or(0) + 1);

        if let Some(escape) = &self.escape_to {
            fs::write(escape, "leaked")?;
            return Ok(Some(vec![escape.clone()]));
        }
        let out = self.output_dir.join("seen.txt");
        fs::write(&out, input.display().to_string())?;
        Ok(Some(vec![out]))
    }
}

fn recording_transformer(
    seen: Arc<Mutex<Vec<Value>>>,
    escape_to: Option<PathBuf>,
) -> LegacyTransformer {
    let mut registry = LegacyInstantiator::new();
    registry.register("recording", move |args| {
        args.expect_exactly(1)?;
        Ok(Box::new(Recording {
            params: args.into_values(),
            seen: seen.clone(),
            output_dir: PathBuf::new(),
            escape_to: escape_to.clone(),
        }) as Box<dyn ArtifactTransform>)
    });
    LegacyTransformer::configure(
        ImplementationId::new("recording"),
        ParameterSnapshot::capture(&[json!({"count": 0})]).unwrap(),
        Arc::new(registry),
        ImmutableAttributes::of([("artifactType", "txt")]),
    )
    .unwrap()
}

#[test]
fn test_concurrent_executions_share_no_state() {
    let ws = TestWorkspace::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let transformer = recording_transformer(seen.clone(), None);
    let executor = TransformExecutor::default();
    let inputs: Vec<PathBuf> = (0..8)
        .map(|i| ws.create_file(&format!("in/{}.txt", i), &i.to_string()))
        .collect();

    std::thread::scope(|scope| {
        for (i, input) in inputs.iter().enumerate() {
            let transformer = &transformer;
            let executor = &executor;
            let out = ws.join(&format!("out/{}", i));
            scope.spawn(move || {
                executor
                    .execute(transformer, input, &out, &DependencySet::empty())
                    .unwrap()
            });
        }
    });

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 8);
    assert!(seen.iter().all(|params| params == &json!({"count": 0})));
}

#[test]
fn test_escaping_output_fails_execution() {
    let ws = TestWorkspace::new();
    let input = ws.create_file("in.txt", "x");
    let escape = ws.join("elsewhere.txt");
    let transformer = recording_transformer(Arc::new(Mutex::new(Vec::new())), Some(escape));

    let result = TransformExecutor::default().execute(
        &transformer,
        &input,
        &ws.join("out"),
        &DependencySet::empty(),
    );

    match result {
        Err(TransformError::InvalidTransformResult {
            implementation,
            primary_input,
            ..
        }) => {
            assert_eq!(implementation.as_str(), "recording");
            assert_eq!(primary_input, input);
        }
        other => panic!("expected InvalidTransformResult, got {:?}", other),
    }
}

#[test]
fn test_cache_key_is_stable_across_transformer_instances() {
    let ws = TestWorkspace::new();
    let input = ws.create_file("in.txt", "x");
    let executor = TransformExecutor::default();
    let deps = DependencySet::empty();

    let a = builtin("copy", ParameterSnapshot::capture(&["copy.txt"]).unwrap());
    let b = builtin("copy", ParameterSnapshot::capture(&["copy.txt"]).unwrap());

    let key_a = executor.identify(a.as_ref(), &input, &deps).unwrap().cache_key;
    let key_b = executor.identify(b.as_ref(), &input, &deps).unwrap().cache_key;
    assert_eq!(key_a, key_b);
}
