//! On-disk package cache keyed by source descriptor.
//!
//! Remote packages (URL, git and catalog sources) are downloaded and extracted once,
//! then served from disk until their entry expires. The cache remembers *where* a
//! package lives, not a snapshot of its bytes: every hit re-reads the files from the
//! extracted tree.
//!
//! # Cache Directory Structure
//!
//! ```text
//! ~/.agpkg/cache/
//! ├── catalog_3f2a…/          # one directory per cache key
//! │   ├── source.zip          # raw download
//! │   ├── extracted/          # archive contents
//! │   └── cache.json          # serialized CacheEntry
//! └── git_91bc…/
//! ```
//!
//! # Validity
//!
//! An entry is usable only while **both** hold:
//! - the current time is before `expires_at`, and
//! - the recorded package root still exists on disk.
//!
//! The extracted tree can be deleted independently of the TTL, so the second check
//! is not optional. [`Cache::lookup`] folds both into a single `Option`.
//!
//! # Concurrency
//!
//! Entries for different keys never touch each other. Concurrent fetches of the same
//! key are not coordinated: each rewrites the entry from scratch and the last writer wins.

use crate::constants::{
    CACHE_DOWNLOAD_FILE, CACHE_EXTRACTED_DIR, CACHE_SIDECAR_FILE, DEFAULT_CACHE_TTL, MAX_CACHE_TTL,
};
use crate::source::{CacheKey, SourceDescriptor};
use crate::utils::fs::{atomic_write, ensure_dir};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Sidecar record describing one cached package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Descriptor the package was fetched for
    pub source: SourceDescriptor,
    /// Package root inside the extracted tree
    #[serde(rename = "path")]
    pub extracted_path: PathBuf,
    /// When the entry was written
    #[serde(rename = "cached_at")]
    pub created_at: DateTime<Utc>,
    /// When the entry stops being served
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// `true` while the entry is unexpired and its package root still exists.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at && self.extracted_path.is_dir()
    }
}

/// Package cache rooted at a configurable directory.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    /// Creates a cache rooted at `dir` with the default 24 hour TTL.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Overrides the entry lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Cache root directory.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.dir
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Working directory for one cache key.
    #[must_use]
    pub fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    /// Path of the raw download for a key.
    #[must_use]
    pub fn download_path(&self, key: &CacheKey) -> PathBuf {
        self.entry_dir(key).join(CACHE_DOWNLOAD_FILE)
    }

    /// Extraction directory for a key.
    #[must_use]
    pub fn extracted_dir(&self, key: &CacheKey) -> PathBuf {
        self.entry_dir(key).join(CACHE_EXTRACTED_DIR)
    }

    fn sidecar_path(&self, key: &CacheKey) -> PathBuf {
        self.entry_dir(key).join(CACHE_SIDECAR_FILE)
    }

    /// Returns the cached package root for `key` if the entry is still valid.
    #[must_use]
    pub fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        self.lookup_at(key, Utc::now())
    }

    /// [`lookup`](Self::lookup) evaluated at an explicit point in time.
    #[must_use]
    pub fn lookup_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<PathBuf> {
        let entry = read_entry(&self.sidecar_path(key))?;
        if entry.is_valid_at(now) {
            debug!("Cache hit for {} at {}", key, entry.extracted_path.display());
            Some(entry.extracted_path)
        } else {
            debug!("Cache entry for {} is stale", key);
            None
        }
    }

    /// Records `package_root` as the cached location for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sidecar cannot be serialized or written.
    pub fn store(
        &self,
        key: &CacheKey,
        source: &SourceDescriptor,
        package_root: &Path,
    ) -> Result<CacheEntry> {
        let created_at = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl.min(MAX_CACHE_TTL))
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        let expires_at = created_at.checked_add_signed(ttl).unwrap_or(created_at);
        let entry = CacheEntry {
            source: source.clone(),
            extracted_path: package_root.to_path_buf(),
            created_at,
            expires_at,
        };

        let json = serde_json::to_vec_pretty(&entry).context("Failed to serialize cache entry")?;
        atomic_write(&self.sidecar_path(key), &json)?;
        debug!("Cached {} until {}", key, entry.expires_at);
        Ok(entry)
    }

    /// Lists every entry directory that has a readable sidecar.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache root exists but cannot be read.
    pub fn entries(&self) -> Result<Vec<(String, CacheEntry)>> {
        let mut entries = Vec::new();
        for dir in self.entry_dirs()? {
            let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if let Some(entry) = read_entry(&dir.join(CACHE_SIDECAR_FILE)) {
                entries.push((name, entry));
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    /// Removes stale entries, or every entry when `all` is set.
    ///
    /// Stale means expired, pointing at a missing package root, or lacking a
    /// readable sidecar (left behind by an interrupted fetch).
    ///
    /// # Errors
    ///
    /// Returns an error if an entry directory cannot be removed.
    pub fn clean(&self, all: bool) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;

        for dir in self.entry_dirs()? {
            let stale = all
                || read_entry(&dir.join(CACHE_SIDECAR_FILE)).is_none_or(|entry| !entry.is_valid_at(now));
            if stale {
                std::fs::remove_dir_all(&dir)
                    .with_context(|| format!("Failed to remove cache entry: {}", dir.display()))?;
                removed += 1;
            }
        }

        debug!("Removed {} cache entries from {}", removed, self.dir.display());
        Ok(removed)
    }

    /// Total size in bytes of everything under the cache root.
    ///
    /// # Errors
    ///
    /// Returns an error if a file's metadata cannot be read.
    pub fn size(&self) -> Result<u64> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut total = 0;
        for entry in walkdir::WalkDir::new(&self.dir).follow_links(false) {
            let entry = entry.with_context(|| format!("Failed to walk {}", self.dir.display()))?;
            if entry.file_type().is_file() {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }

    /// Creates the working directory for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn prepare_entry_dir(&self, key: &CacheKey) -> Result<PathBuf> {
        let dir = self.entry_dir(key);
        ensure_dir(&dir)?;
        Ok(dir)
    }

    fn entry_dirs(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read cache directory: {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        Ok(dirs)
    }
}

fn read_entry(sidecar: &Path) -> Option<CacheEntry> {
    let bytes = std::fs::read(sidecar).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Ignoring unreadable cache entry {}: {}", sidecar.display(), e);
            None
        }
    }
}
