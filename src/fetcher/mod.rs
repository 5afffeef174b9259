//! Package fetching with an on-disk cache.
//!
//! The [`Fetcher`] turns a [`SourceDescriptor`] into a fully loaded [`Package`]:
//!
//! 1. Remote sources consult the [`Cache`] first. A valid entry is re-read from disk.
//! 2. Local sources are read straight from their directory on every call and never cached.
//! 3. Remote sources on a miss are downloaded into the entry's working directory
//!    ([`download`]), extracted into `extracted/` ([`archive`]), and the package root is
//!    located inside the extracted tree.
//! 4. The package manifest is parsed and every declared file is read into memory.
//!    A missing declared file fails the whole fetch.
//! 5. A successful remote fetch records a cache entry. Failing to record it only logs
//!    a warning.
//!
//! # Locating the package root
//!
//! | `sub_path` | kind      | package root                                           |
//! |------------|-----------|--------------------------------------------------------|
//! | empty      | any       | extraction root, or its single top-level directory    |
//! | set        | `Catalog` | `<top-level dir>/<sub_path>` (repository archive)     |
//! | set        | other     | `extracted/<sub_path>`                                 |
//!
//! There is no fallback search: a manifest missing at the expected location is
//! [`AgpkgError::ManifestMissing`].

pub mod archive;
pub mod download;

use crate::cache::Cache;
use crate::constants::{HTTP_TIMEOUT, MAX_PACKAGE_SIZE, PACKAGE_MANIFEST_FILE};
use crate::core::AgpkgError;
use crate::manifest::{Package, PackageManifest};
use crate::source::{CacheKey, SourceDescriptor, SourceKind, SourceResolver};
use crate::utils::fs::remove_dir_if_exists;
use crate::utils::path_validation::is_safe_relative_path;
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Retrieves packages from local directories and remote archives.
#[derive(Debug, Clone)]
pub struct Fetcher {
    resolver: SourceResolver,
    cache: Cache,
    client: reqwest::Client,
    max_download_size: u64,
}

impl Fetcher {
    /// Creates a fetcher backed by `cache`, using the default catalog, a 30 second
    /// HTTP timeout and a 100 MB download limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(cache: Cache) -> Result<Self> {
        Ok(Self {
            resolver: SourceResolver::new(),
            cache,
            client: build_client(HTTP_TIMEOUT)?,
            max_download_size: MAX_PACKAGE_SIZE,
        })
    }

    /// Uses `resolver` for cache keys and download URLs.
    #[must_use]
    pub fn with_resolver(mut self, resolver: SourceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Overrides the download size limit.
    #[must_use]
    pub const fn with_max_download_size(mut self, limit: u64) -> Self {
        self.max_download_size = limit;
        self
    }

    /// Rebuilds the HTTP client with an overall request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// The cache this fetcher reads and writes.
    #[must_use]
    pub const fn cache(&self) -> &Cache {
        &self.cache
    }

    /// The resolver used for key and URL derivation.
    #[must_use]
    pub const fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    /// Fetches and fully loads the package described by `source`.
    ///
    /// # Errors
    ///
    /// - [`AgpkgError::NotFound`] when a local path or remote URL does not exist
    /// - [`AgpkgError::TooLarge`] when a download exceeds the limit
    /// - [`AgpkgError::ExtractionFailed`] when the archive is corrupt
    /// - [`AgpkgError::ManifestMissing`] when no manifest is at the package root
    /// - [`AgpkgError::FileMissing`] when a declared file is absent
    pub async fn fetch(&self, source: &SourceDescriptor) -> Result<Package> {
        if !source.is_remote() {
            return self.fetch_local(source).await;
        }

        let key = self.resolver.cache_key(source);
        if let Some(root) = self.cache.lookup(&key) {
            match load_blocking(source.clone(), root).await {
                Ok(package) => return Ok(package),
                Err(e) => debug!("Cached package for {} is unusable, fetching again: {:#}", key, e),
            }
        }

        self.fetch_remote(source, &key).await
    }

    async fn fetch_local(&self, source: &SourceDescriptor) -> Result<Package> {
        let path = source.local_path();
        if !path.exists() {
            return Err(AgpkgError::NotFound {
                location: source.location.clone(),
            }
            .into());
        }

        debug!("Loading local package from {}", path.display());
        load_blocking(source.clone(), path).await
    }

    async fn fetch_remote(&self, source: &SourceDescriptor, key: &CacheKey) -> Result<Package> {
        let url = self.resolver.download_url(source)?;
        self.cache.prepare_entry_dir(key)?;

        let archive_path = self.cache.download_path(key);
        download::download_to(&self.client, &url, &archive_path, self.max_download_size).await?;

        let extracted = self.cache.extracted_dir(key);
        let owned = source.clone();
        let package = tokio::task::spawn_blocking(move || -> Result<Package> {
            remove_dir_if_exists(&extracted)?;
            let count = archive::extract_zip(&archive_path, &extracted)?;
            debug!("Extracted {} files into {}", count, extracted.display());

            let root = locate_package_root(&extracted, &owned)?;
            load_package(owned, root)
        })
        .await
        .context("Package extraction task failed")??;

        if let Err(e) = self.cache.store(key, source, &package.root_path) {
            warn!("Failed to write cache entry for {}: {:#}", source.raw, e);
        }

        Ok(package)
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("agpkg/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

async fn load_blocking(source: SourceDescriptor, root: PathBuf) -> Result<Package> {
    tokio::task::spawn_blocking(move || load_package(source, root))
        .await
        .context("Package loading task failed")?
}

/// Finds the directory holding the package manifest inside an extracted archive.
///
/// # Errors
///
/// - [`AgpkgError::InvalidFormat`] for a `sub_path` that escapes the extraction root
/// - [`AgpkgError::ManifestMissing`] when no manifest is at the expected location
pub fn locate_package_root(extracted: &Path, source: &SourceDescriptor) -> Result<PathBuf> {
    let root = if source.sub_path.is_empty() {
        if has_manifest(extracted) {
            extracted.to_path_buf()
        } else {
            let dirs = top_level_dirs(extracted)?;
            match dirs.as_slice() {
                [only] => only.clone(),
                _ => extracted.to_path_buf(),
            }
        }
    } else {
        if !is_safe_relative_path(&source.sub_path) {
            return Err(AgpkgError::InvalidFormat {
                source_str: source.raw.clone(),
                reason: format!("sub-path escapes the package: {}", source.sub_path),
            }
            .into());
        }

        if source.kind == SourceKind::Catalog {
            let repo_root = top_level_dirs(extracted)?.into_iter().next().ok_or_else(|| {
                AgpkgError::ManifestMissing {
                    path: extracted.join(&source.sub_path),
                }
            })?;
            repo_root.join(&source.sub_path)
        } else {
            extracted.join(&source.sub_path)
        }
    };

    if !has_manifest(&root) {
        return Err(AgpkgError::ManifestMissing { path: root }.into());
    }

    debug!("Package root for {} is {}", source.raw, root.display());
    Ok(root)
}

/// Parses the manifest at `root` and reads every declared file into memory.
///
/// Declared paths that are absolute or contain `..` are not read; the validator
/// reports them.
///
/// # Errors
///
/// - [`AgpkgError::ManifestMissing`] / [`AgpkgError::ManifestParse`] for the manifest
/// - [`AgpkgError::FileMissing`] when a declared file does not exist
pub fn load_package(source: SourceDescriptor, root: PathBuf) -> Result<Package> {
    let manifest = PackageManifest::load_from_dir(&root)?;

    let mut files = BTreeMap::new();
    for file in &manifest.files {
        if !is_safe_relative_path(file) {
            debug!("Not reading unsafe declared path: {}", file);
            continue;
        }

        let path = root.join(file);
        if !path.is_file() {
            return Err(AgpkgError::FileMissing { file: file.clone() }.into());
        }

        let content =
            std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        files.insert(file.clone(), content);
    }

    Ok(Package {
        source,
        manifest,
        files,
        root_path: root,
        fetched_at: Utc::now(),
    })
}

fn has_manifest(dir: &Path) -> bool {
    dir.join(PACKAGE_MANIFEST_FILE).is_file()
}

fn top_level_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
