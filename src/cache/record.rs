//! Cache records and the portable on-disk state format
//!
//! Paths are stored as structured tokens relative to the cache or root
//! directory, so a state file can move between machines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Version of the state file layout
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Metadata about one transformed source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Canonical path of the original source
    pub source_path: PathBuf,

    /// Rewritten copy under the cache directory (None = not materialized)
    pub cache_uri: Option<PathBuf>,

    /// SHA256 of the original source bytes (first 12 hex chars)
    pub source_hash: Option<String>,

    /// When the source was last transformed
    pub transformed_at: Option<DateTime<Utc>>,

    /// Opaque extension metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl CacheRecord {
    /// Create a record that has not been materialized yet
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            cache_uri: None,
            source_hash: None,
            transformed_at: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a record for a freshly written cache copy
    pub fn materialized(
        source_path: impl Into<PathBuf>,
        cache_uri: PathBuf,
        source: &[u8],
    ) -> Self {
        Self {
            cache_uri: Some(cache_uri),
            source_hash: Some(content_hash(source)),
            transformed_at: Some(Utc::now()),
            ..Self::new(source_path)
        }
    }

    /// Whether `source` still matches the bytes this record was built from
    ///
    /// Records without a hash are never considered fresh.
    pub fn matches_source(&self, source: &[u8]) -> bool {
        self.source_hash
            .as_deref()
            .is_some_and(|hash| hash == content_hash(source))
    }
}

/// Hash content using SHA256, returning first 12 hex chars
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();

    hex::encode(&result[..6])
}

/// Placeholder base for a stored path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathBase {
    /// Relative to the configured cache directory
    CacheDir,
    /// Relative to the configured root directory
    RootDir,
    /// Stored verbatim, outside both directories
    Absolute,
}

/// Path token as written to the state file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortablePath {
    pub base: PathBase,
    pub path: PathBuf,
}

/// The two directories placeholders are resolved against
#[derive(Debug, Clone, Copy)]
pub struct PathAnchors<'a> {
    pub root_dir: &'a Path,
    pub cache_dir: &'a Path,
}

impl PathAnchors<'_> {
    /// Encode `path` against the most specific matching directory
    pub fn encode(&self, path: &Path) -> PortablePath {
        let candidates = [
            (PathBase::CacheDir, self.cache_dir),
            (PathBase::RootDir, self.root_dir),
        ];

        candidates
            .iter()
            .filter(|(_, dir)| !dir.as_os_str().is_empty())
            .filter_map(|(base, dir)| path.strip_prefix(dir).ok().map(|rel| (*base, rel)))
            .min_by_key(|(_, rel)| rel.components().count())
            .map(|(base, rel)| PortablePath {
                base,
                path: rel.to_path_buf(),
            })
            .unwrap_or_else(|| PortablePath {
                base: PathBase::Absolute,
                path: path.to_path_buf(),
            })
    }

    /// Resolve a stored token back into a path on this machine
    pub fn decode(&self, token: &PortablePath) -> PathBuf {
        match token.base {
            PathBase::CacheDir => self.cache_dir.join(&token.path),
            PathBase::RootDir => self.root_dir.join(&token.path),
            PathBase::Absolute => token.path.clone(),
        }
    }
}

/// Record body as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub cache_uri: Option<PortablePath>,
    pub source_hash: Option<String>,
    pub transformed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// One entry of the state file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub source: PortablePath,
    pub record: StoredRecord,
}

/// Complete state file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub entries: Vec<StoredEntry>,
}

impl StateFile {
    /// Encode a record map with placeholder tokens
    pub fn encode(records: &BTreeMap<PathBuf, CacheRecord>, anchors: PathAnchors<'_>) -> Self {
        let entries = records
            .values()
            .map(|record| StoredEntry {
                source: anchors.encode(&record.source_path),
                record: StoredRecord {
                    cache_uri: record.cache_uri.as_deref().map(|uri| anchors.encode(uri)),
                    source_hash: record.source_hash.clone(),
                    transformed_at: record.transformed_at,
                    metadata: record.metadata.clone(),
                },
            })
            .collect();

        Self {
            version: STATE_FORMAT_VERSION,
            entries,
        }
    }

    /// Decode entries back into a record map keyed by source path
    pub fn decode(self, anchors: PathAnchors<'_>) -> BTreeMap<PathBuf, CacheRecord> {
        self.entries
            .into_iter()
            .map(|entry| {
                let source_path = anchors.decode(&entry.source);
                let record = CacheRecord {
                    source_path: source_path.clone(),
                    cache_uri: entry.record.cache_uri.map(|uri| anchors.decode(&uri)),
                    source_hash: entry.record.source_hash,
                    transformed_at: entry.record.transformed_at,
                    metadata: entry.record.metadata,
                };
                (source_path, record)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors<'a>(root: &'a Path, cache: &'a Path) -> PathAnchors<'a> {
        PathAnchors {
            root_dir: root,
            cache_dir: cache,
        }
    }

    #[test]
    fn hash_deterministic() {
        let hash1 = content_hash(b"fn main() {}");
        let hash2 = content_hash(b"fn main() {}");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 12);
        assert_ne!(hash1, content_hash(b"fn main() { }"));
    }

    #[test]
    fn matches_source() {
        let record = CacheRecord::materialized("/app/a.rs", PathBuf::from("/cache/a.rs"), b"old");
        assert!(record.matches_source(b"old"));
        assert!(!record.matches_source(b"new"));
        assert!(!CacheRecord::new("/app/a.rs").matches_source(b"old"));
    }

    #[test]
    fn encode_prefers_most_specific_base() {
        let root = Path::new("/app");
        let cache = Path::new("/app/var/cache");
        let a = anchors(root, cache);

        let token = a.encode(Path::new("/app/var/cache/src/lib.rs"));
        assert_eq!(token.base, PathBase::CacheDir);
        assert_eq!(token.path, PathBuf::from("src/lib.rs"));

        let token = a.encode(Path::new("/app/src/lib.rs"));
        assert_eq!(token.base, PathBase::RootDir);
        assert_eq!(token.path, PathBuf::from("src/lib.rs"));
    }

    #[test]
    fn encode_does_not_match_partial_names() {
        let a = anchors(Path::new("/app"), Path::new("/cache"));
        let token = a.encode(Path::new("/application/lib.rs"));
        assert_eq!(token.base, PathBase::Absolute);
        assert_eq!(token.path, PathBuf::from("/application/lib.rs"));
    }

    #[test]
    fn state_file_relocates() {
        let mut records = BTreeMap::new();
        let record = CacheRecord::materialized(
            "/build/app/src/lib.rs",
            PathBuf::from("/build/cache/src/lib.rs"),
            b"fn a() {}",
        );
        records.insert(record.source_path.clone(), record);

        let state = StateFile::encode(
            &records,
            anchors(Path::new("/build/app"), Path::new("/build/cache")),
        );
        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("/build/app"));
        assert!(!json.contains("/build/cache"));

        let parsed: StateFile = serde_json::from_str(&json).unwrap();
        let moved = parsed.decode(anchors(Path::new("/srv/app"), Path::new("/srv/cache")));
        let record = &moved[Path::new("/srv/app/src/lib.rs")];
        assert_eq!(
            record.cache_uri.as_deref(),
            Some(Path::new("/srv/cache/src/lib.rs"))
        );
    }
}
