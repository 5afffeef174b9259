//! Error handling for AGPKG
//!
//! This module provides the error taxonomy for the agent package pipeline and the
//! user-friendly reporting used by the CLI. The error system follows two principles:
//! 1. **Strongly-typed errors** so callers branch on the failure kind, never on message text
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! Errors are grouped by the pipeline stage that raises them:
//! - **Resolution** (no I/O): [`AgpkgError::EmptySource`], [`AgpkgError::InvalidFormat`],
//!   [`AgpkgError::NoDownloadUrl`]
//! - **Fetch**: [`AgpkgError::NotFound`], [`AgpkgError::TooLarge`], [`AgpkgError::Network`],
//!   [`AgpkgError::ExtractionFailed`], [`AgpkgError::ManifestMissing`],
//!   [`AgpkgError::ManifestParse`], [`AgpkgError::FileMissing`]
//! - **Install**: [`AgpkgError::ValidationFailed`], [`AgpkgError::NameConflict`],
//!   [`AgpkgError::ProjectManifestNotFound`], [`AgpkgError::UnsupportedLanguage`],
//!   [`AgpkgError::DependencyInstallFailed`], [`AgpkgError::Io`]
//!
//! Validation itself never fails: it produces a
//! [`ValidationReport`](crate::validator::ValidationReport) that the installer turns into
//! [`AgpkgError::ValidationFailed`] when it is not valid.
//!
//! # Error Conversion and Context
//!
//! Orchestrating code returns `anyhow::Result` and raises [`AgpkgError`] values as root
//! causes. Because `anyhow` keeps the original error reachable through any added context,
//! callers recover the typed variant with `downcast_ref`:
//!
//! ```rust,no_run
//! use agpkg_cli::core::AgpkgError;
//!
//! fn report(err: &anyhow::Error) {
//!     match err.downcast_ref::<AgpkgError>() {
//!         Some(AgpkgError::NameConflict { name, .. }) => eprintln!("{name} is taken"),
//!         Some(other) => eprintln!("{other}"),
//!         None => eprintln!("unexpected: {err}"),
//!     }
//! }
//! ```
//!
//! Use [`user_friendly_error`] to convert any error into an [`ErrorContext`] with a
//! suggestion suitable for terminal display.

use crate::constants::PROJECT_MANIFEST_FILE;
use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for AGPKG operations.
///
/// Each variant represents one failure mode of the resolve → fetch → validate → install
/// pipeline and carries the structured fields a caller needs to present guidance
/// (offending path, limit exceeded, issue list).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgpkgError {
    /// The raw source string was empty
    #[error("Source cannot be empty")]
    EmptySource,

    /// The raw source string matched none of the supported shapes
    #[error("Invalid source '{source_str}': {reason}")]
    InvalidFormat {
        /// The raw string as given by the user
        source_str: String,
        /// Why the string was rejected
        reason: String,
    },

    /// A download URL was requested for a source that has none (local paths)
    #[error("Source '{source_str}' has no download URL")]
    NoDownloadUrl {
        /// The raw source string
        source_str: String,
    },

    /// The package location does not exist (local path missing, HTTP 404)
    #[error("Agent not found: {location}")]
    NotFound {
        /// Path or URL that could not be found
        location: String,
    },

    /// The download exceeded the configured transfer limit
    #[error("Package too large: {size} bytes (max {limit})")]
    TooLarge {
        /// Declared or observed size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// A network request failed for a reason other than not-found or size
    #[error("Failed to download {url}: {reason}")]
    Network {
        /// The URL being fetched
        url: String,
        /// Transport error or HTTP status
        reason: String,
    },

    /// The downloaded archive could not be extracted
    #[error("Failed to extract {path}: {reason}")]
    ExtractionFailed {
        /// Archive path on disk
        path: PathBuf,
        /// Underlying archive error
        reason: String,
    },

    /// No package manifest at the expected package root
    #[error("agent.yaml not found at: {path}")]
    ManifestMissing {
        /// Directory where the manifest was expected
        path: PathBuf,
    },

    /// The package manifest exists but is not valid YAML for the manifest schema
    #[error("Failed to parse {path}: {reason}")]
    ManifestParse {
        /// Manifest path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// A file declared in the manifest is absent from the package root
    #[error("File declared in manifest not found: {file}")]
    FileMissing {
        /// Relative path as declared in the manifest
        file: String,
    },

    /// The package failed validation; the installer refuses it
    #[error("Agent validation failed for '{name}' ({} issue(s))", .issues.len())]
    ValidationFailed {
        /// Package name (may be empty when the name itself is invalid)
        name: String,
        /// Every problem found by the validator
        issues: Vec<String>,
    },

    /// An agent with this name is already installed or registered
    #[error("Agent '{name}' already exists at: {path}")]
    NameConflict {
        /// Target agent name
        name: String,
        /// Directory or manifest that already holds it
        path: PathBuf,
    },

    /// The install target name is not usable as a directory name
    #[error("Invalid agent name '{name}' (only alphanumeric, dots, underscores, and hyphens allowed)")]
    InvalidName {
        /// The rejected name
        name: String,
    },

    /// The project has no project manifest
    #[error("Project manifest not found at: {path}")]
    ProjectManifestNotFound {
        /// Expected manifest path
        path: PathBuf,
    },

    /// The project manifest could not be parsed
    #[error("Failed to parse project manifest {path}: {reason}")]
    ProjectManifestParse {
        /// Manifest path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// The package language has no dependency installer
    #[error("Unsupported language for dependency installation: {language}")]
    UnsupportedLanguage {
        /// The language as declared in the manifest
        language: String,
    },

    /// A package-manager invocation failed
    #[error("Failed to install {family} dependencies ({}): {reason}", .packages.join(", "))]
    DependencyInstallFailed {
        /// Package family (`npm`, `pip`, `go`)
        family: String,
        /// Packages passed to the tool
        packages: Vec<String>,
        /// Exit status and stderr of the tool, or the precondition that failed
        reason: String,
    },

    /// A package-manager binary is not installed
    #[error("Required tool '{tool}' not found in PATH")]
    ToolNotFound {
        /// Binary name
        tool: String,
    },

    /// Configuration file problems
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// A filesystem operation failed
    #[error("Failed {operation} {path}: {reason}")]
    Io {
        /// What was being done ("writing", "creating directory", ...)
        operation: String,
        /// Path involved
        path: PathBuf,
        /// Underlying I/O message
        reason: String,
    },

    /// Catch-all for errors without a dedicated variant
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl AgpkgError {
    /// Builds an [`AgpkgError::Io`] from an `std::io::Error`.
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AgpkgError {
    /// Conversion for I/O failures where the path is not known; prefer
    /// [`AgpkgError::io`] when it is.
    fn from(err: std::io::Error) -> Self {
        Self::io("accessing", PathBuf::new(), &err)
    }
}

/// Error wrapper that pairs an [`AgpkgError`] with user-facing guidance.
///
/// ```rust,no_run
/// use agpkg_cli::core::{AgpkgError, ErrorContext};
///
/// let context = ErrorContext::new(AgpkgError::EmptySource)
///     .with_suggestion("Pass a catalog reference such as memory/vector-store");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: AgpkgError,
    /// Actionable next step for the user
    pub suggestion: Option<String>,
    /// Additional explanation
    pub details: Option<String>,
}

impl ErrorContext {
    /// Creates a context without suggestion or details.
    #[must_use]
    pub const fn new(error: AgpkgError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Adds a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

const SOURCE_FORMATS: &str = "Supported source formats:\n  \
     - Catalog: memory/vector-store\n  \
     - Git: github.com/user/repo#branch path/to/agent\n  \
     - URL: https://example.com/agent.zip\n  \
     - Local: ./path/to/agent";

/// Converts any error into an [`ErrorContext`] with a suggestion.
///
/// Typed [`AgpkgError`] root causes get a tailored suggestion; anything else is reported
/// with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(agpkg_error) = error.downcast_ref::<AgpkgError>() {
        return create_error_context(agpkg_error.clone());
    }

    let permission_denied = error
        .downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied);
    if permission_denied {
        return ErrorContext::new(AgpkgError::Other {
            message: error.to_string(),
        })
        .with_suggestion("Check file and directory permissions in the project and cache directories");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(AgpkgError::Other {
        message,
    })
}

fn create_error_context(error: AgpkgError) -> ErrorContext {
    match &error {
        AgpkgError::EmptySource | AgpkgError::InvalidFormat { .. } => {
            ErrorContext::new(error).with_details(SOURCE_FORMATS)
        }
        AgpkgError::NotFound { location } => {
            let base_name = location.rsplit('/').next().unwrap_or(location).to_string();
            ErrorContext::new(error)
                .with_suggestion(format!(
                    "Check the agent name spelling ('{base_name}') and verify the source is accessible"
                ))
        }
        AgpkgError::Network { .. } => ErrorContext::new(error).with_suggestion(
            "Check your internet connection, verify the URL is accessible, or use --cache-dir to specify a different cache location",
        ),
        AgpkgError::TooLarge { .. } => ErrorContext::new(error)
            .with_suggestion("Raise max_download_size in ~/.agpkg/config.toml if the package is trusted"),
        AgpkgError::ManifestMissing { .. } => ErrorContext::new(error)
            .with_suggestion("Make sure the source points at a directory containing agent.yaml")
            .with_details("For git and catalog sources the agent path is relative to the repository root"),
        AgpkgError::ValidationFailed { issues, .. } => {
            let mut details = String::from("Issues found:");
            for (i, issue) in issues.iter().enumerate() {
                details.push_str(&format!("\n  {}. {}", i + 1, issue));
            }
            ErrorContext::new(error)
                .with_details(details)
                .with_suggestion("Only install agents from trusted sources")
        }
        AgpkgError::NameConflict { name, path } if path.ends_with(PROJECT_MANIFEST_FILE) => {
            let suggestion = format!(
                "Run 'agpkg remove {name}' first or use --as <name> to install with a different name"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        AgpkgError::NameConflict { .. } => ErrorContext::new(error).with_suggestion(
            "Use --force to overwrite or --as <name> to install with a different name",
        ),
        AgpkgError::ProjectManifestNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run this command from a project directory containing project.yaml"),
        AgpkgError::DependencyInstallFailed { family, .. } => {
            let hint = match family.as_str() {
                "npm" => "Ensure npm is installed, package.json exists, and run 'npm install' manually",
                "pip" => "Ensure pip is installed, check your virtual environment, and run 'pip install <package>' manually",
                "go" => "Ensure go is installed, go.mod exists, and run 'go get <package>' manually",
                _ => "Install the dependencies manually",
            };
            ErrorContext::new(error).with_suggestion(hint)
        }
        AgpkgError::ToolNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Install the tool or re-run with --no-install to skip dependency installation"),
        _ => ErrorContext::new(error),
    }
}
