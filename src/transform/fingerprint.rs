//! Content fingerprints of transform inputs.
//!
//! A fingerprint is computed in two steps: a [`FileSnapshotter`] walks the
//! input and hashes raw file content, then a [`FileCollectionFingerprinter`]
//! applies a [`Normalization`] deciding which part of each path matters.
//! Entries are always sorted, so the resulting hash only depends on what was
//! fingerprinted, never on traversal or insertion order.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use walkdir::WalkDir;

use super::error::FingerprintError;
use super::identity::HashCode;
use super::paths::{absolutize, to_portable};

/// Property name of the primary input in [`InputFingerprints`].
pub const PRIMARY_INPUT_PROPERTY_NAME: &str = "primaryInput";

/// Property name of upstream dependency artifacts in [`InputFingerprints`].
pub const DEPENDENCIES_PROPERTY_NAME: &str = "dependencies";

/// Which aspects of a path take part in fingerprint equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// Content plus the resolved absolute path.
    AbsolutePath,
    /// Content plus the path relative to the input root.
    RelativePath,
    /// Content plus the file name only.
    NameOnly,
    /// Content only.
    IgnoredPath,
}

impl Normalization {
    pub const ALL: [Normalization; 4] = [
        Self::AbsolutePath,
        Self::RelativePath,
        Self::NameOnly,
        Self::IgnoredPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AbsolutePath => "absolute-path",
            Self::RelativePath => "relative-path",
            Self::NameOnly => "name-only",
            Self::IgnoredPath => "ignored-path",
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Normalization {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown normalization '{}': expected absolute-path, relative-path, name-only or ignored-path",
                    s
                )
            })
    }
}

/// Classification of an input property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFilePropertyType {
    /// A file, or a directory tree walked recursively.
    Files,
    /// The root must be a directory.
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    RegularFile,
    Directory,
}

impl FileKind {
    fn tag(&self) -> u8 {
        match self {
            Self::RegularFile => b'f',
            Self::Directory => b'd',
        }
    }
}

/// Raw hash of one file or directory found below an input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub absolute_path: PathBuf,
    /// Path relative to the root; empty for the root itself.
    pub relative_path: PathBuf,
    pub kind: FileKind,
    pub content_hash: HashCode,
}

impl FileSnapshot {
    fn name(&self) -> String {
        self.absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Walks an input root and hashes raw file content.
pub trait FileSnapshotter: Send + Sync {
    /// Snapshots of `root` and everything below it, sorted by relative path.
    fn snapshot(&self, root: &Path) -> Result<Vec<FileSnapshot>, FingerprintError>;
}

/// Default snapshotter: `walkdir` traversal, SHA-256 content hashes.
#[derive(Debug, Default, Clone, Copy)]
pub struct WalkdirSnapshotter;

impl WalkdirSnapshotter {
    fn directory_hash() -> HashCode {
        HashCode::of(b"DIR")
    }

    fn hash_file(path: &Path) -> Result<HashCode, FingerprintError> {
        let mut file = File::open(path).map_err(|e| FingerprintError::io(path, e))?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher).map_err(|e| FingerprintError::io(path, e))?;
        Ok(HashCode::from_digest(hasher))
    }
}

impl FileSnapshotter for WalkdirSnapshotter {
    fn snapshot(&self, root: &Path) -> Result<Vec<FileSnapshot>, FingerprintError> {
        let root = absolutize(root).map_err(|e| FingerprintError::io(root, e))?;
        let metadata = match fs::metadata(&root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FingerprintError::Missing(root));
            }
            Err(e) => return Err(FingerprintError::io(&root, e)),
        };

        if metadata.is_file() {
            return Ok(vec![FileSnapshot {
                content_hash: Self::hash_file(&root)?,
                absolute_path: root,
                relative_path: PathBuf::new(),
                kind: FileKind::RegularFile,
            }]);
        }

        let mut snapshots = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root.as_path()).to_path_buf();
                FingerprintError::io(path, e.into())
            })?;
            let relative_path = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let (kind, content_hash) = if entry.file_type().is_dir() {
                (FileKind::Directory, Self::directory_hash())
            } else {
                (FileKind::RegularFile, Self::hash_file(entry.path())?)
            };
            snapshots.push(FileSnapshot {
                absolute_path: entry.path().to_path_buf(),
                relative_path,
                kind,
                content_hash,
            });
        }

        snapshots.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(snapshots)
    }
}

/// One normalized entry of a [`FileCollectionFingerprint`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FingerprintEntry {
    pub normalized_path: String,
    pub kind: FileKind,
    pub content_hash: HashCode,
}

/// Normalized fingerprint of a file collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileCollectionFingerprint {
    pub normalization: Normalization,
    pub entries: Vec<FingerprintEntry>,
    pub hash: HashCode,
}

impl FileCollectionFingerprint {
    /// Sorts `entries` and derives the combined hash.
    pub fn new(normalization: Normalization, mut entries: Vec<FingerprintEntry>) -> Self {
        entries.sort();
        let mut hasher = Sha256::new();
        hasher.update(normalization.as_str().as_bytes());
        for entry in &entries {
            hasher.update([0]);
            hasher.update(entry.normalized_path.as_bytes());
            hasher.update([0, entry.kind.tag()]);
            hasher.update(entry.content_hash.as_bytes());
        }
        Self {
            normalization,
            entries,
            hash: HashCode::from_digest(hasher),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Computes a normalized fingerprint for a set of input roots.
pub trait FileCollectionFingerprinter: Send + Sync {
    fn fingerprint(&self, roots: &[PathBuf]) -> Result<FileCollectionFingerprint, FingerprintError>;
}

/// Fingerprinter applying one normalization on top of a snapshotter.
pub struct NormalizingFingerprinter {
    normalization: Normalization,
    property_type: InputFilePropertyType,
    snapshotter: Arc<dyn FileSnapshotter>,
}

impl NormalizingFingerprinter {
    pub fn new(
        normalization: Normalization,
        property_type: InputFilePropertyType,
        snapshotter: Arc<dyn FileSnapshotter>,
    ) -> Self {
        Self {
            normalization,
            property_type,
            snapshotter,
        }
    }

    fn normalize(&self, root_name: &str, snapshot: &FileSnapshot) -> Option<String> {
        match self.normalization {
            Normalization::AbsolutePath => {
                Some(snapshot.absolute_path.to_string_lossy().into_owned())
            }
            Normalization::RelativePath => {
                if snapshot.relative_path.as_os_str().is_empty() {
                    // A directory root contributes no name, a file root its name
                    match snapshot.kind {
                        FileKind::Directory => Some(String::new()),
                        FileKind::RegularFile => Some(root_name.to_string()),
                    }
                } else {
                    Some(to_portable(&snapshot.relative_path))
                }
            }
            Normalization::NameOnly => Some(snapshot.name()),
            Normalization::IgnoredPath => match snapshot.kind {
                FileKind::Directory => None,
                FileKind::RegularFile => Some(String::new()),
            },
        }
    }
}

impl FileCollectionFingerprinter for NormalizingFingerprinter {
    fn fingerprint(&self, roots: &[PathBuf]) -> Result<FileCollectionFingerprint, FingerprintError> {
        let mut entries = Vec::new();
        for root in roots {
            let snapshots = self.snapshotter.snapshot(root)?;
            if self.property_type == InputFilePropertyType::Directory
                && !snapshots
                    .first()
                    .is_some_and(|s| s.kind == FileKind::Directory)
            {
                return Err(FingerprintError::NotADirectory(root.clone()));
            }
            let root_name = root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.extend(snapshots.iter().filter_map(|snapshot| {
                self.normalize(&root_name, snapshot)
                    .map(|normalized_path| FingerprintEntry {
                        normalized_path,
                        kind: snapshot.kind,
                        content_hash: snapshot.content_hash,
                    })
            }));
        }
        Ok(FileCollectionFingerprint::new(self.normalization, entries))
    }
}

/// Looks up the fingerprinter for a normalization and property type.
pub trait FingerprinterRegistry: Send + Sync {
    fn fingerprinter(
        &self,
        normalization: Normalization,
        property_type: InputFilePropertyType,
    ) -> &dyn FileCollectionFingerprinter;
}

/// Registry serving every [`Normalization`] over one shared snapshotter.
pub struct DefaultFingerprinterRegistry {
    fingerprinters: [[NormalizingFingerprinter; 2]; 4],
}

impl DefaultFingerprinterRegistry {
    pub fn new() -> Self {
        Self::with_snapshotter(Arc::new(WalkdirSnapshotter))
    }

    pub fn with_snapshotter(snapshotter: Arc<dyn FileSnapshotter>) -> Self {
        let fingerprinters = Normalization::ALL.map(|normalization| {
            [InputFilePropertyType::Files, InputFilePropertyType::Directory].map(|property_type| {
                NormalizingFingerprinter::new(normalization, property_type, snapshotter.clone())
            })
        });
        Self { fingerprinters }
    }
}

impl Default for DefaultFingerprinterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprinterRegistry for DefaultFingerprinterRegistry {
    fn fingerprinter(
        &self,
        normalization: Normalization,
        property_type: InputFilePropertyType,
    ) -> &dyn FileCollectionFingerprinter {
        let row = match normalization {
            Normalization::AbsolutePath => 0,
            Normalization::RelativePath => 1,
            Normalization::NameOnly => 2,
            Normalization::IgnoredPath => 3,
        };
        let column = match property_type {
            InputFilePropertyType::Files => 0,
            InputFilePropertyType::Directory => 1,
        };
        &self.fingerprinters[row][column]
    }
}

/// Fingerprints of all input properties of one transform invocation, sorted
/// by property name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputFingerprints(BTreeMap<String, FileCollectionFingerprint>);

impl InputFingerprints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        property: impl Into<String>,
        fingerprint: FileCollectionFingerprint,
    ) -> Option<FileCollectionFingerprint> {
        self.0.insert(property.into(), fingerprint)
    }

    pub fn get(&self, property: &str) -> Option<&FileCollectionFingerprint> {
        self.0.get(property)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.0.contains_key(property)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileCollectionFingerprint)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Hash over every property, in property-name order.
    pub fn combined_hash(&self) -> HashCode {
        let mut hasher = Sha256::new();
        for (property, fingerprint) in &self.0 {
            hasher.update(property.as_bytes());
            hasher.update([0]);
            hasher.update(fingerprint.hash.as_bytes());
        }
        HashCode::from_digest(hasher)
    }
}

impl FromIterator<(String, FileCollectionFingerprint)> for InputFingerprints {
    fn from_iter<I: IntoIterator<Item = (String, FileCollectionFingerprint)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
