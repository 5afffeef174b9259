//! AGPKG - Agent Package Manager
//!
//! Fetches agent packages from a catalog, git hosting services, archive URLs or local
//! directories, validates them, and installs them into the `agents/` directory of a
//! project whose `project.yaml` records every installed agent.
//!
//! # Architecture Overview
//!
//! Installing an agent is a four stage pipeline:
//!
//! 1. [`source::SourceResolver`] turns a user string into a [`source::SourceDescriptor`]
//! 2. [`fetcher::Fetcher`] downloads and extracts remote packages through the
//!    [`cache::Cache`], or reads local directories in place, producing a
//!    [`manifest::Package`]
//! 3. [`validator::Validator`] checks the manifest, the file set, file contents and
//!    declared dependencies
//! 4. [`installer::Installer`] stages the files, registers the agent in
//!    `project.yaml` and installs package-manager dependencies
//!
//! # Source Forms
//!
//! ```text
//! memory/vector-store                          catalog entry
//! github.com/user/repo#dev agents/helper       git host, branch and sub-path
//! https://example.com/agent.zip                archive URL
//! ./local-agents/custom                        local directory
//! ```
//!
//! # Core Modules
//!
//! - [`source`] - source string parsing and download URL derivation
//! - [`fetcher`] - downloads, archive extraction and package loading
//! - [`cache`] - on-disk cache of extracted packages with TTL expiry
//! - [`validator`] - security and structural checks
//! - [`installer`] - staged installation and removal
//! - [`project`] - `project.yaml` persistence
//! - [`deps`] - npm, pip and go dependency installation
//!
//! ## Supporting Modules
//! - [`cli`] - command-line interface
//! - [`config`] - user configuration (`~/.agpkg/config.toml`)
//! - [`core`] - error types and user-facing error rendering
//! - [`manifest`] - `agent.yaml` model
//! - [`utils`] - file system helpers, path checks and spinners

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod deps;
pub mod fetcher;
pub mod installer;
pub mod manifest;
pub mod project;
pub mod source;
pub mod utils;
pub mod validator;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
