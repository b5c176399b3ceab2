//! Identity types naming a transform step for caching purposes.
//!
//! A [`TransformerIdentity`] covers everything static about a step: which
//! implementation runs, a hash of its configured parameters, and the variant
//! attributes the input is assumed to have. The runtime input fingerprint is
//! combined in separately via [`TransformerIdentity::cache_key`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::fingerprint::InputFingerprints;
use super::params::ParameterSnapshot;

/// Name of a registered transform implementation (e.g. "copy").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImplementationId(String);

impl ImplementationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImplementationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ImplementationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A SHA-256 digest, displayed and serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashCode([u8; 32]);

impl HashCode {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn of(data: &[u8]) -> Self {
        Self::from_digest(Sha256::new_with_prefix(data))
    }

    pub(crate) fn from_digest(hasher: Sha256) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self::from_bytes(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 16 hex characters, used for directory names and log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..16].to_string()
    }
}

impl fmt::Display for HashCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for HashCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashCode({})", self.short())
    }
}

impl FromStr for HashCode {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self::from_bytes(bytes))
    }
}

impl Serialize for HashCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HashCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sorted set of variant attributes (e.g. `artifactType=jar`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImmutableAttributes(BTreeMap<String, String>);

impl ImmutableAttributes {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Parse `key=value` pairs as given on the command line.
    pub fn parse<S: AsRef<str>>(pairs: &[S]) -> anyhow::Result<Self> {
        let mut attributes = BTreeMap::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Attribute must be key=value: {}", pair))?;
            if key.trim().is_empty() {
                anyhow::bail!("Attribute key must not be empty: {}", pair);
            }
            attributes.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self(attributes))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ImmutableAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        f.write_str("}")
    }
}

/// Hash of an implementation and its static configuration.
pub struct InputsHash;

impl InputsHash {
    /// Independent of any file content; identical configuration on any
    /// machine produces the same hash.
    pub fn compute(implementation: &ImplementationId, parameters: &ParameterSnapshot) -> HashCode {
        let mut hasher = Sha256::new();
        hasher.update(b"implementation\0");
        hasher.update(implementation.as_str().as_bytes());
        hasher.update(b"\0parameters\0");
        hasher.update(parameters.canonical_bytes());
        HashCode::from_digest(hasher)
    }
}

/// Static, cache-relevant identity of a configured transform step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransformerIdentity {
    pub implementation: ImplementationId,
    pub inputs_hash: HashCode,
    pub from_attributes: ImmutableAttributes,
}

impl TransformerIdentity {
    /// Full cache key: static identity plus the runtime input fingerprint.
    pub fn cache_key(&self, fingerprints: &InputFingerprints) -> HashCode {
        let mut hasher = Sha256::new();
        hasher.update(self.implementation.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.inputs_hash.as_bytes());
        for (key, value) in self.from_attributes.iter() {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update([0]);
        }
        hasher.update(fingerprints.combined_hash().as_bytes());
        HashCode::from_digest(hasher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_code_hex_roundtrip() {
        let hash = HashCode::of(b"hello");
        let parsed: HashCode = hash.to_hex().parse().unwrap();
        assert_eq!(hash, parsed);
        assert_eq!(hash.short().len(), 16);
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = ImmutableAttributes::parse(&["artifactType=jar", "platform = jvm"]).unwrap();
        assert_eq!(attrs.get("artifactType"), Some("jar"));
        assert_eq!(attrs.get("platform"), Some("jvm"));
        assert_eq!(attrs.to_string(), "{artifactType=jar, platform=jvm}");

        assert!(ImmutableAttributes::parse(&["novalue"]).is_err());
        assert!(ImmutableAttributes::parse(&["=x"]).is_err());
    }

    #[test]
    fn test_inputs_hash_depends_on_parameters() {
        let id = ImplementationId::new("copy");
        let a = ParameterSnapshot::capture(&["a.txt"]).unwrap();
        let b = ParameterSnapshot::capture(&["b.txt"]).unwrap();

        assert_eq!(InputsHash::compute(&id, &a), InputsHash::compute(&id, &a));
        assert_ne!(InputsHash::compute(&id, &a), InputsHash::compute(&id, &b));
        assert_ne!(
            InputsHash::compute(&id, &a),
            InputsHash::compute(&ImplementationId::new("unpack"), &a)
        );
    }

    #[test]
    fn test_cache_key_depends_on_attributes() {
        let snapshot = ParameterSnapshot::empty();
        let implementation = ImplementationId::new("copy");
        let inputs_hash = InputsHash::compute(&implementation, &snapshot);
        let jar = TransformerIdentity {
            implementation: implementation.clone(),
            inputs_hash,
            from_attributes: ImmutableAttributes::of([("artifactType", "jar")]),
        };
        let aar = TransformerIdentity {
            from_attributes: ImmutableAttributes::of([("artifactType", "aar")]),
            ..jar.clone()
        };

        let fingerprints = InputFingerprints::new();
        assert_eq!(jar.cache_key(&fingerprints), jar.clone().cache_key(&fingerprints));
        assert_ne!(jar.cache_key(&fingerprints), aar.cache_key(&fingerprints));
    }
}
