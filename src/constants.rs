//! Global constants used throughout the AGPKG codebase.
//!
//! This module contains file names, size limits, timeouts and other
//! values shared by the resolver, fetcher, validator and installer.
//! Defining them centrally keeps magic numbers discoverable.

use std::time::Duration;

/// File name of the package manifest inside an agent package.
pub const PACKAGE_MANIFEST_FILE: &str = "agent.yaml";

/// File name of the project manifest at the root of a project.
pub const PROJECT_MANIFEST_FILE: &str = "project.yaml";

/// Directory (relative to the project root) that holds installed agents.
pub const AGENTS_DIR: &str = "agents";

/// Repository used for two-segment catalog references such as `memory/vector-store`.
pub const DEFAULT_CATALOG_URL: &str = "https://github.com/agentuity/agents";

/// Branch used when a source does not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// How long a remote package stays valid in the cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest cache lifetime honoured; larger settings are clamped to it.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Upper bound on a single package download.
pub const MAX_PACKAGE_SIZE: u64 = 100 * 1024 * 1024; // 100 MB

/// Overall timeout for a package download.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum size of a single file inside a package.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10 MiB

/// Maximum length of an agent name.
pub const MAX_AGENT_NAME_LENGTH: usize = 50;

/// Raw download file name inside a cache entry directory.
pub const CACHE_DOWNLOAD_FILE: &str = "source.zip";

/// Extracted archive directory inside a cache entry directory.
pub const CACHE_EXTRACTED_DIR: &str = "extracted";

/// Sidecar holding the serialized cache entry.
pub const CACHE_SIDECAR_FILE: &str = "cache.json";
