//! User configuration for AGPKG.
//!
//! Settings that apply to every project live in `~/.agpkg/config.toml`. The file is
//! optional; a missing file yields [`Config::default`].
//!
//! ```toml
//! cache_dir = "~/.agpkg/cache"
//! catalog_url = "https://github.com/agentuity/agents"
//! cache_ttl_secs = 86400
//! max_download_size = 104857600
//! http_timeout_secs = 30
//! strict_validation = false
//! ```
//!
//! # Precedence
//!
//! 1. Command-line flags (`--cache-dir`, `--strict`)
//! 2. Environment: `AGPKG_CACHE_DIR`, `AGPKG_CATALOG_URL`
//! 3. The config file (`--config`, else `AGPKG_CONFIG`, else `~/.agpkg/config.toml`)
//! 4. Built-in defaults

use crate::cache::Cache;
use crate::constants::{DEFAULT_CACHE_TTL, DEFAULT_CATALOG_URL, HTTP_TIMEOUT, MAX_CACHE_TTL, MAX_PACKAGE_SIZE};
use crate::core::AgpkgError;
use crate::fetcher::Fetcher;
use crate::source::SourceResolver;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "AGPKG_CONFIG";
/// Environment variable overriding [`Config::cache_dir`].
pub const CACHE_DIR_ENV: &str = "AGPKG_CACHE_DIR";
/// Environment variable overriding [`Config::catalog_url`].
pub const CATALOG_URL_ENV: &str = "AGPKG_CATALOG_URL";

/// User-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package cache root; `~` is expanded
    pub cache_dir: String,
    /// Repository used for `category/name` references
    pub catalog_url: String,
    /// Cache entry lifetime in seconds
    pub cache_ttl_secs: u64,
    /// Download limit in bytes
    pub max_download_size: u64,
    /// Overall HTTP timeout in seconds
    pub http_timeout_secs: u64,
    /// Enforce the extension allow-list during validation
    pub strict_validation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: "~/.agpkg/cache".to_string(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            max_download_size: MAX_PACKAGE_SIZE,
            http_timeout_secs: HTTP_TIMEOUT.as_secs(),
            strict_validation: false,
        }
    }
}

impl Config {
    /// Default config file location: `~/.agpkg/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| AgpkgError::ConfigError {
            message: "Unable to determine home directory".to_string(),
        })?;
        Ok(home.join(".agpkg").join("config.toml"))
    }

    /// Loads configuration the way the CLI does.
    ///
    /// The file is `path` if given, else `$AGPKG_CONFIG`, else the default path.
    /// Environment overrides are applied on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable or invalid.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path.or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)) {
            Some(path) => path,
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            Self::load_from(&path).await?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            AgpkgError::ConfigError {
                message: format!("Failed to parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Applies `AGPKG_CACHE_DIR` and `AGPKG_CATALOG_URL` from `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.cache_dir = dir;
        }
        if let Some(url) = lookup(CATALOG_URL_ENV).filter(|v| !v.is_empty()) {
            self.catalog_url = url;
        }
    }

    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// [`AgpkgError::ConfigError`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), AgpkgError> {
        let fail = |message: String| Err(AgpkgError::ConfigError { message });

        if self.cache_dir.trim().is_empty() {
            return fail("cache_dir cannot be empty".to_string());
        }
        if self.cache_ttl_secs == 0 {
            return fail("cache_ttl_secs must be greater than zero".to_string());
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL.as_secs() {
            return fail(format!("cache_ttl_secs cannot exceed {}", MAX_CACHE_TTL.as_secs()));
        }
        if self.max_download_size == 0 {
            return fail("max_download_size must be greater than zero".to_string());
        }
        if self.http_timeout_secs == 0 {
            return fail("http_timeout_secs must be greater than zero".to_string());
        }
        match reqwest::Url::parse(&self.catalog_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => fail(format!("catalog_url is not an http(s) URL: {}", self.catalog_url)),
        }
    }

    /// Cache root with `~` and environment variables expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if expansion references an unknown variable.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.cache_dir).map_err(|e| AgpkgError::ConfigError {
            message: format!("Cannot expand cache_dir '{}': {e}", self.cache_dir),
        })?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    /// Cache entry lifetime.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Resolver using the configured catalog.
    #[must_use]
    pub fn resolver(&self) -> SourceResolver {
        SourceResolver::with_catalog(&self.catalog_url)
    }

    /// Cache at the configured location with the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be expanded.
    pub fn cache(&self) -> Result<Cache> {
        Ok(Cache::new(self.cache_dir()?).with_ttl(self.cache_ttl()))
    }

    /// Fetcher wired with this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be expanded or the HTTP client
    /// cannot be built.
    pub fn fetcher(&self) -> Result<Fetcher> {
        Ok(Fetcher::new(self.cache()?)?
            .with_resolver(self.resolver())
            .with_max_download_size(self.max_download_size)
            .with_timeout(self.http_timeout())?)
    }
}
