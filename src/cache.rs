//! Output cache for repeated manipulations.
//!
//! Decoding, resampling and re-encoding the same source with the same steps
//! produces the same bytes every time. When `cache = true` in the config the
//! pipeline consults this manifest first and skips the work if an identical
//! output already exists on disk.
//!
//! ## Cache keys
//!
//! The cache is **content-addressed**: lookups go by the pair
//! `source_hash` + `params_hash`, not by output path, so writing the same
//! result under a new name copies the earlier file instead of re-encoding.
//!
//! - **`source_hash`**: SHA-256 of the source bytes. Content-based rather
//!   than mtime-based, so it survives `git checkout` and works for sources
//!   that never touched disk (URLs, base64).
//!
//! - **`params_hash`**: SHA-256 of the serialized recipe: backend settings,
//!   quality, geometry defaults and the full step list. Overlay images and
//!   fonts are referenced by path only; editing one in place does not bust
//!   the cache.
//!
//! A cache hit requires:
//! 1. An entry with matching `source_hash` and `params_hash` exists
//! 2. The previously-written output file still exists on disk
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<output_dir>/.reframe-cache.json`, next
//! to the outputs it describes. Entry keys are paths relative to that
//! directory.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the output directory.
const MANIFEST_FILENAME: &str = ".reframe-cache.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single cached output file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk cache manifest mapping output paths to their cache entries.
///
/// Lookups go through a runtime `content_index` that maps
/// `"{source_hash}:{params_hash}"` to the stored output path.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    /// Built at load time, maintained on insert. Never serialized.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load from the output directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(output_dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(_) => return Self::empty(),
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.content_index = build_content_index(&manifest.entries);
        manifest
    }

    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(output_dir), json)
    }

    /// Look up a cached output file by content hashes.
    ///
    /// Returns the stored relative path if a matching entry exists **and**
    /// the file is still on disk. The path may differ from the caller's
    /// intended output; copying it over is the caller's job.
    pub fn find_cached(
        &self,
        source_hash: &str,
        params_hash: &str,
        output_dir: &Path,
    ) -> Option<String> {
        let stored_path = self.content_index.get(&content_key(source_hash, params_hash))?;
        if output_dir.join(stored_path).exists() {
            Some(stored_path.clone())
        } else {
            None
        }
    }

    /// Record a cache entry for an output file.
    ///
    /// If the same content was previously stored under another path, the
    /// old entry is dropped.
    pub fn insert(&mut self, output_path: String, source_hash: String, params_hash: String) {
        let key = content_key(&source_hash, &params_hash);

        if let Some(old_path) = self.content_index.get(&key)
            && *old_path != output_path
        {
            self.entries.remove(old_path.as_str());
        }

        self.content_index.insert(key, output_path.clone());
        self.entries.insert(
            output_path,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{}:{}", source_hash, params_hash)
}

fn build_content_index(entries: &HashMap<String, CacheEntry>) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(output_path, entry)| {
            (
                content_key(&entry.source_hash, &entry.params_hash),
                output_path.clone(),
            )
        })
        .collect()
}

/// SHA-256 of raw source bytes, returned as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of a serializable recipe.
///
/// The recipe is serialized to JSON first, so any field change (a different
/// focus, one more step, another backend) yields a different hash.
pub fn hash_params<T: Serialize>(recipe: &T) -> serde_json::Result<String> {
    let json = serde_json::to_vec(recipe)?;
    let mut hasher = Sha256::new();
    hasher.update(b"recipe\0");
    hasher.update(&json);
    Ok(format!("{:x}", hasher.finalize()))
}

/// How an output was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Identical output already at the requested path.
    Hit,
    /// Identical output found elsewhere and copied over.
    Copied,
    /// Decoded, processed and encoded.
    Encoded,
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheOutcome::Hit => "cached",
            CacheOutcome::Copied => "copied",
            CacheOutcome::Encoded => "encoded",
        })
    }
}

/// Resolve the cache manifest path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}
