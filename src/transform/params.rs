//! Isolated transform parameters.
//!
//! Parameters are captured once, when a transform is registered, as owned
//! structural values. Each execution materializes its own deep copy, so no
//! two executions ever share a mutable argument.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::error::{ConfigurationError, InstantiationError};
use super::identity::ImplementationId;

/// Immutable snapshot of a transform's constructor arguments.
///
/// Cloning the snapshot is cheap and shares the frozen values; only
/// [`materialize`](Self::materialize) hands out mutable copies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSnapshot {
    values: Arc<Vec<Value>>,
}

impl ParameterSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture a homogeneous argument list.
    ///
    /// Fails with [`ConfigurationError`] if any argument cannot be expressed
    /// as a structural value (e.g. a map with non-string keys).
    pub fn capture<T: Serialize>(args: &[T]) -> Result<Self, ConfigurationError> {
        let values = args
            .iter()
            .enumerate()
            .map(|(index, arg)| isolate(index, arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_values(values))
    }

    /// Capture arguments that are already structural values.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    /// Builder-style capture of heterogeneous arguments.
    pub fn builder() -> ParameterSnapshotBuilder {
        ParameterSnapshotBuilder::default()
    }

    /// Parse each argument from a JSON literal (as given on the command line).
    pub fn parse_json<S: AsRef<str>>(args: &[S]) -> Result<Self, ConfigurationError> {
        let values = args
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                serde_json::from_str(raw.as_ref()).map_err(|e| ConfigurationError::NotIsolatable {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<Value>, _>>()?;
        Ok(Self::from_values(values))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fresh deep copy of every captured argument.
    pub fn materialize(&self) -> Vec<Value> {
        self.values.iter().cloned().collect()
    }

    /// Deterministic encoding of the captured values. Object keys are
    /// sorted, so equal configurations always encode identically.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Vec<Value> serialization cannot fail
        serde_json::to_vec(self.values.as_ref()).unwrap_or_default()
    }
}

/// Collects heterogeneous arguments, failing on the first one that cannot
/// be isolated.
#[derive(Debug, Default)]
pub struct ParameterSnapshotBuilder {
    values: Vec<Value>,
}

impl ParameterSnapshotBuilder {
    pub fn arg<T: Serialize + ?Sized>(mut self, arg: &T) -> Result<Self, ConfigurationError> {
        let value = isolate(self.values.len(), arg)?;
        self.values.push(value);
        Ok(self)
    }

    pub fn build(self) -> ParameterSnapshot {
        ParameterSnapshot::from_values(self.values)
    }
}

fn isolate<T: Serialize + ?Sized>(index: usize, arg: &T) -> Result<Value, ConfigurationError> {
    serde_json::to_value(arg).map_err(|e| ConfigurationError::NotIsolatable {
        index,
        reason: e.to_string(),
    })
}

/// Materialized arguments handed to a transform factory.
#[derive(Debug)]
pub struct Arguments {
    implementation: ImplementationId,
    values: Vec<Value>,
}

impl Arguments {
    pub fn new(implementation: ImplementationId, values: Vec<Value>) -> Self {
        Self {
            implementation,
            values,
        }
    }

    pub fn implementation(&self) -> &ImplementationId {
        &self.implementation
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn expect_exactly(&self, expected: usize) -> Result<(), InstantiationError> {
        if self.values.len() != expected {
            return Err(self.arity_error(expected.to_string()));
        }
        Ok(())
    }

    pub fn expect_at_most(&self, max: usize) -> Result<(), InstantiationError> {
        if self.values.len() > max {
            return Err(self.arity_error(format!("at most {}", max)));
        }
        Ok(())
    }

    /// Required argument at `index`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, InstantiationError> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| self.arity_error(format!("at least {}", index + 1)))?;
        self.decode(index, value)
    }

    /// Argument at `index`, `None` if absent or null.
    pub fn optional<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, InstantiationError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.decode(index, value).map(Some),
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn decode<T: DeserializeOwned>(&self, index: usize, value: &Value) -> Result<T, InstantiationError> {
        T::deserialize(value).map_err(|e| InstantiationError::Parameter {
            implementation: self.implementation.clone(),
            index,
            reason: e.to_string(),
        })
    }

    fn arity_error(&self, expected: String) -> InstantiationError {
        InstantiationError::Arity {
            implementation: self.implementation.clone(),
            expected,
            actual: self.values.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_materialize_does_not_alias() {
        let snapshot = ParameterSnapshot::capture(&[json!({"excludes": ["META-INF"]})]).unwrap();

        let mut first = snapshot.materialize();
        let second = snapshot.materialize();

        first[0]["excludes"]
            .as_array_mut()
            .unwrap()
            .push(json!("module-info.class"));
        first[0]["extra"] = json!(true);

        assert_eq!(second[0], json!({"excludes": ["META-INF"]}));
        assert_eq!(snapshot.materialize()[0], json!({"excludes": ["META-INF"]}));
    }

    #[test]
    fn test_capture_rejects_non_isolatable() {
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], "value");

        let result = ParameterSnapshot::builder().arg("ok").unwrap().arg(&bad);
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigurationError::NotIsolatable { index: 1, .. }));
    }

    #[test]
    fn test_parse_json() {
        let snapshot = ParameterSnapshot::parse_json(&["\"copy.txt\"", "3"]).unwrap();
        assert_eq!(snapshot.materialize(), vec![json!("copy.txt"), json!(3)]);

        assert!(ParameterSnapshot::parse_json(&["not json"]).is_err());
    }

    #[test]
    fn test_canonical_bytes_sort_keys() {
        let a = ParameterSnapshot::parse_json(&[r#"{"b": 1, "a": 2}"#]).unwrap();
        let b = ParameterSnapshot::parse_json(&[r#"{"a": 2, "b": 1}"#]).unwrap();
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn test_arguments_accessors() {
        let id = ImplementationId::new("copy");
        let args = Arguments::new(id, vec![json!("out.txt"), Value::Null]);

        assert_eq!(args.get::<String>(0).unwrap(), "out.txt");
        assert_eq!(args.optional::<String>(1).unwrap(), None);
        assert_eq!(args.optional::<String>(5).unwrap(), None);
        assert!(matches!(
            args.get::<u32>(0),
            Err(InstantiationError::Parameter { index: 0, .. })
        ));
        assert!(matches!(
            args.get::<String>(2),
            Err(InstantiationError::Arity { actual: 2, .. })
        ));
        assert!(args.expect_at_most(2).is_ok());
        assert!(args.expect_exactly(1).is_err());
    }
}
