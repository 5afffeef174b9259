//! Source resolution for agent packages.
//!
//! Turns the free-form string a user types after `agpkg add` into a typed
//! [`SourceDescriptor`]. Resolution performs no I/O. The descriptor is then used to
//! derive the cache key and, for remote kinds, the archive download URL.
//!
//! # Supported Formats
//!
//! Classification is an ordered list of rules, evaluated top to bottom, first match wins:
//!
//! | Rule | Example | Kind |
//! |------|---------|------|
//! | `./`, `../`, `/`, `~` prefix | `./local-agents/custom` | [`SourceKind::Local`] |
//! | `http://` or `https://` prefix | `https://example.com/agent.zip#dev` | [`SourceKind::Url`] |
//! | `host.tld/owner/repo[#branch] [sub path]` | `github.com/user/repo#dev agent-name` | [`SourceKind::GitRepo`] |
//! | `segment/segment` | `memory/vector-store` | [`SourceKind::Catalog`] |
//!
//! Anything else is rejected with [`AgpkgError::InvalidFormat`].
//!
//! # Example
//!
//! ```rust
//! use agpkg_cli::source::{SourceKind, SourceResolver};
//!
//! let resolver = SourceResolver::new();
//! let source = resolver.resolve("github.com/user/repo#dev agent-name").unwrap();
//!
//! assert_eq!(source.kind, SourceKind::GitRepo);
//! assert_eq!(source.location, "https://github.com/user/repo");
//! assert_eq!(source.branch, "dev");
//! assert_eq!(source.sub_path, "agent-name");
//! assert_eq!(
//!     resolver.download_url(&source).unwrap(),
//!     "https://github.com/user/repo/archive/dev.zip"
//! );
//! ```

use crate::constants::{DEFAULT_BRANCH, DEFAULT_CATALOG_URL};
use crate::core::AgpkgError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static GIT_REPO_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})/([a-zA-Z0-9._-]+)/([a-zA-Z0-9._-]+)").ok()
});

static CATALOG_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+/[a-zA-Z0-9._-]+$").ok());

/// Where an agent package comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A directory on the local filesystem
    Local,
    /// A direct archive URL
    Url,
    /// A repository on a git hosting service
    #[serde(rename = "git")]
    GitRepo,
    /// An entry in the default catalog repository
    Catalog,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Url => "url",
            Self::GitRepo => "git",
            Self::Catalog => "catalog",
        };
        f.write_str(name)
    }
}

/// The typed, resolved form of a raw source string.
///
/// - `location` is a filesystem path for [`SourceKind::Local`], a full URL for
///   [`SourceKind::Url`], and a normalized `https://host/owner/repo` otherwise.
/// - `branch` is empty only for local sources and URLs without a fragment.
/// - `sub_path` is the agent directory inside the repository, empty when the
///   package sits at the archive root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Source category
    pub kind: SourceKind,
    /// Path or URL of the source
    pub location: String,
    /// Branch to download
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    /// Agent directory inside the source
    #[serde(default, rename = "path", skip_serializing_if = "String::is_empty")]
    pub sub_path: String,
    /// The string the user typed
    pub raw: String,
}

impl SourceDescriptor {
    /// Returns `true` for sources that are fetched over the network and cached.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.kind != SourceKind::Local
    }

    /// Filesystem path of a local source with `~` expanded.
    #[must_use]
    pub fn local_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.location).as_ref())
    }
}

/// A cache key derived from every identifying field of a [`SourceDescriptor`].
///
/// The key doubles as the name of the per-source cache directory, so it is made of
/// the source kind followed by a SHA-256 digest of the remaining fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// The key as a string, safe to use as a directory name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Rule = (fn(&str) -> bool, fn(&SourceResolver, &str) -> Result<SourceDescriptor, AgpkgError>);

/// Parses raw source strings into [`SourceDescriptor`]s.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    catalog_url: String,
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceResolver {
    /// Creates a resolver that maps catalog references to the default catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalog(DEFAULT_CATALOG_URL)
    }

    /// Creates a resolver that maps catalog references to `catalog_url`.
    #[must_use]
    pub fn with_catalog(catalog_url: impl Into<String>) -> Self {
        Self {
            catalog_url: catalog_url.into(),
        }
    }

    /// The catalog repository used for two-segment references.
    #[must_use]
    pub fn catalog_url(&self) -> &str {
        &self.catalog_url
    }

    /// Classification rules in precedence order.
    const RULES: [Rule; 4] = [
        (is_local_path, Self::parse_local),
        (is_url, Self::parse_url),
        (is_git_repo, Self::parse_git_repo),
        (is_any, Self::parse_catalog_ref),
    ];

    /// Resolves a raw source string.
    ///
    /// # Errors
    ///
    /// - [`AgpkgError::EmptySource`] for an empty string
    /// - [`AgpkgError::InvalidFormat`] when no rule accepts the string
    pub fn resolve(&self, raw: &str) -> Result<SourceDescriptor, AgpkgError> {
        if raw.is_empty() {
            return Err(AgpkgError::EmptySource);
        }

        for (matches, build) in Self::RULES {
            if matches(raw) {
                let source = build(self, raw)?;
                debug!("Resolved '{}' as {} source at {}", raw, source.kind, source.location);
                return Ok(source);
            }
        }

        Err(invalid(raw, "unrecognized source"))
    }

    fn parse_local(&self, raw: &str) -> Result<SourceDescriptor, AgpkgError> {
        Ok(SourceDescriptor {
            kind: SourceKind::Local,
            location: raw.to_string(),
            branch: String::new(),
            sub_path: String::new(),
            raw: raw.to_string(),
        })
    }

    fn parse_url(&self, raw: &str) -> Result<SourceDescriptor, AgpkgError> {
        let mut url = reqwest::Url::parse(raw).map_err(|e| invalid(raw, &format!("invalid URL: {e}")))?;

        let branch = url.fragment().unwrap_or_default().to_string();
        url.set_fragment(None);

        Ok(SourceDescriptor {
            kind: SourceKind::Url,
            location: url.to_string(),
            branch,
            sub_path: String::new(),
            raw: raw.to_string(),
        })
    }

    fn parse_git_repo(&self, raw: &str) -> Result<SourceDescriptor, AgpkgError> {
        let mut parts = raw.split(' ');
        let git_ref = parts.next().unwrap_or_default();
        let sub_path = parts.collect::<Vec<_>>().join(" ");

        let (repo, branch) = match git_ref.split_once('#') {
            Some((repo, rest)) => {
                // A second '#' ends the branch name.
                let branch = rest.split('#').next().unwrap_or_default();
                (repo, branch)
            }
            None => (git_ref, DEFAULT_BRANCH),
        };

        Ok(SourceDescriptor {
            kind: SourceKind::GitRepo,
            location: format!("https://{repo}"),
            branch: branch.to_string(),
            sub_path,
            raw: raw.to_string(),
        })
    }

    fn parse_catalog_ref(&self, raw: &str) -> Result<SourceDescriptor, AgpkgError> {
        let matches = CATALOG_PATTERN.as_ref().is_some_and(|re| re.is_match(raw));
        if !matches {
            return Err(invalid(raw, "expected format: category/agent-name"));
        }

        Ok(SourceDescriptor {
            kind: SourceKind::Catalog,
            location: self.catalog_url.clone(),
            branch: DEFAULT_BRANCH.to_string(),
            sub_path: raw.to_string(),
            raw: raw.to_string(),
        })
    }

    /// Derives the cache key for a descriptor.
    ///
    /// Local sources key on their absolute, resolved path so that different relative
    /// spellings of the same directory collapse to one key. Local sources are never
    /// written to the cache; the key exists for identification only.
    #[must_use]
    pub fn cache_key(&self, source: &SourceDescriptor) -> CacheKey {
        let fields = match source.kind {
            SourceKind::Local => {
                vec![absolute_path(&source.local_path()).to_string_lossy().into_owned()]
            }
            _ => vec![source.location.clone(), source.branch.clone(), source.sub_path.clone()],
        };

        // JSON array encoding keeps field boundaries unambiguous before hashing.
        let encoded = serde_json::to_string(&fields).unwrap_or_else(|_| fields.join("\u{0}"));
        let digest = Sha256::digest(encoded.as_bytes());
        CacheKey(format!("{}_{}", source.kind, hex::encode(digest)))
    }

    /// Derives the archive download URL for a remote descriptor.
    ///
    /// # Errors
    ///
    /// - [`AgpkgError::NoDownloadUrl`] for local sources
    /// - [`AgpkgError::InvalidFormat`] when a repository location has no `owner/repo` path
    pub fn download_url(&self, source: &SourceDescriptor) -> Result<String, AgpkgError> {
        match source.kind {
            SourceKind::Url => Ok(source.location.clone()),
            SourceKind::GitRepo | SourceKind::Catalog => {
                let url = reqwest::Url::parse(&source.location)
                    .map_err(|e| invalid(&source.raw, &format!("invalid repository URL: {e}")))?;
                let host = match (url.host_str(), url.port()) {
                    (Some(host), Some(port)) => format!("{host}:{port}"),
                    (Some(host), None) => host.to_string(),
                    (None, _) => String::new(),
                };

                let segments: Vec<&str> =
                    url.path().trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
                if segments.len() < 2 {
                    return Err(invalid(
                        &source.raw,
                        &format!("invalid repository path: {}", url.path()),
                    ));
                }

                let branch = if source.branch.is_empty() {
                    DEFAULT_BRANCH
                } else {
                    &source.branch
                };

                Ok(format!(
                    "https://{host}/{}/{}/archive/{branch}.zip",
                    segments[0], segments[1]
                ))
            }
            SourceKind::Local => Err(AgpkgError::NoDownloadUrl {
                source_str: source.raw.clone(),
            }),
        }
    }
}

fn invalid(raw: &str, reason: &str) -> AgpkgError {
    AgpkgError::InvalidFormat {
        source_str: raw.to_string(),
        reason: reason.to_string(),
    }
}

fn is_local_path(raw: &str) -> bool {
    ["./", "../", "/", "~"].iter().any(|prefix| raw.starts_with(prefix))
}

fn is_url(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

fn is_git_repo(raw: &str) -> bool {
    GIT_REPO_PATTERN.as_ref().is_some_and(|re| re.is_match(raw))
}

// Catalog is the fallback rule; its parser rejects malformed input.
fn is_any(_raw: &str) -> bool {
    true
}

fn absolute_path(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
