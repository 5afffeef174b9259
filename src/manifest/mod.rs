//! Package manifest (`agent.yaml`) and the in-memory package model.
//!
//! Every agent package carries an `agent.yaml` at its package root:
//!
//! ```yaml
//! name: vector-store
//! version: 1.0.0
//! description: Vector memory for agents
//! author: Jane Doe
//! language: typescript
//! dependencies:
//!   npm:
//!     - "@pinecone-database/pinecone"
//! files:
//!   - index.ts
//!   - lib/store.ts
//! config:
//!   dimensions: 1536
//! ```
//!
//! `files` is the authoritative list of content belonging to the package: the fetcher
//! reads exactly these paths from the package root and nothing else.

use crate::constants::PACKAGE_MANIFEST_FILE;
use crate::core::AgpkgError;
use crate::source::SourceDescriptor;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Languages an agent package can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// TypeScript
    TypeScript,
    /// JavaScript
    JavaScript,
    /// Python
    Python,
    /// Go
    Go,
}

impl Language {
    /// Every supported language, in display order.
    pub const ALL: [Self; 4] = [Self::TypeScript, Self::JavaScript, Self::Python, Self::Go];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Go => "go",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = AgpkgError;

    /// Case-insensitive parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL.into_iter().find(|lang| lang.as_str() == lower).ok_or_else(|| {
            AgpkgError::UnsupportedLanguage {
                language: s.to_string(),
            }
        })
    }
}

/// Per-ecosystem package lists declared by an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    /// npm packages (typescript/javascript agents)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub npm: Vec<String>,
    /// pip packages (python agents)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pip: Vec<String>,
    /// Go modules (go agents)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub go: Vec<String>,
}

impl Dependencies {
    /// `true` when no ecosystem lists any package.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.npm.is_empty() && self.pip.is_empty() && self.go.is_empty()
    }
}

/// Parsed contents of `agent.yaml`.
///
/// `language` is kept as written so the validator can report unsupported values
/// verbatim; use [`PackageManifest::language`] for the typed form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Agent name
    #[serde(default)]
    pub name: String,
    /// Agent version (free-form, never resolved)
    #[serde(default)]
    pub version: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Optional author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Implementation language as written in the manifest
    #[serde(default, rename = "language")]
    pub language_name: String,
    /// Optional per-ecosystem dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Dependencies>,
    /// Relative paths of every file in the package
    #[serde(default)]
    pub files: Vec<String>,
    /// Free-form agent configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<BTreeMap<String, serde_yaml::Value>>,
}

impl PackageManifest {
    /// Typed language, if supported.
    ///
    /// # Errors
    ///
    /// [`AgpkgError::UnsupportedLanguage`] for any value outside the supported set.
    pub fn language(&self) -> Result<Language, AgpkgError> {
        self.language_name.parse()
    }

    /// Parses a manifest from YAML text.
    ///
    /// # Errors
    ///
    /// [`AgpkgError::ManifestParse`] when the text is not a valid manifest.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, AgpkgError> {
        serde_yaml::from_str(content).map_err(|e| AgpkgError::ManifestParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Reads and parses `<dir>/agent.yaml`.
    ///
    /// # Errors
    ///
    /// - [`AgpkgError::ManifestMissing`] when the file does not exist
    /// - [`AgpkgError::ManifestParse`] when it cannot be parsed
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(PACKAGE_MANIFEST_FILE);
        if !path.is_file() {
            return Err(AgpkgError::ManifestMissing {
                path: dir.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::from_yaml(&content, &path)?)
    }

    /// Canonical YAML encoding written next to installed agents.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize agent manifest")
    }
}

/// A fetched agent package, fully loaded into memory.
///
/// Constructed only by the [`Fetcher`](crate::fetcher::Fetcher); the validator and
/// installer consume it read-only.
#[derive(Debug, Clone)]
pub struct Package {
    /// Where the package came from
    pub source: SourceDescriptor,
    /// Parsed `agent.yaml`
    pub manifest: PackageManifest,
    /// Declared files keyed by relative path
    pub files: BTreeMap<String, Vec<u8>>,
    /// Directory holding `agent.yaml`
    pub root_path: PathBuf,
    /// When the package was loaded
    pub fetched_at: DateTime<Utc>,
}
