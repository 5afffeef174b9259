//! Command-line interface for AGPKG.
//!
//! Built on clap's derive API. Each subcommand lives in its own module and exposes
//! an `execute` method that receives the shared [`CliContext`].
//!
//! # Available Commands
//!
//! - `add` - fetch, validate and install an agent into the project
//! - `list` - show installed agents
//! - `remove` (aliases `rm`, `uninstall`) - uninstall an agent
//! - `validate` - fetch and validate an agent without installing it
//! - `cache` - inspect and clean the package cache
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: only errors
//! - `--no-progress`: disable spinners
//! - `--config <PATH>`: alternative config file
//! - `--project-dir <DIR>`: project root (defaults to the current directory)
//!
//! # Examples
//!
//! ```bash
//! agpkg add memory/vector-store
//! agpkg add "github.com/user/repo#dev agent-name" --as helper
//! agpkg add ./local-agents/custom --force --no-install
//! agpkg validate https://example.com/agent.zip --strict
//! agpkg cache clean --all
//! ```

mod add;
mod cache;
mod list;
mod remove;
mod validate;

use crate::config::Config;
use crate::core::AgpkgError;
use crate::manifest::Package;
use crate::project::YamlProjectStore;
use crate::utils::progress::Spinner;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Everything a subcommand needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Loaded user configuration
    pub config: Config,
    /// Project root commands operate on
    pub project_dir: PathBuf,
    /// Whether spinners may be drawn
    pub progress: bool,
    /// Suppress informational output
    pub quiet: bool,
}

impl CliContext {
    /// Fails unless the project directory has a project manifest.
    ///
    /// # Errors
    ///
    /// [`AgpkgError::ProjectManifestNotFound`] when `project.yaml` is missing.
    pub fn require_project(&self) -> Result<()> {
        if YamlProjectStore::exists(&self.project_dir) {
            Ok(())
        } else {
            Err(AgpkgError::ProjectManifestNotFound {
                path: YamlProjectStore::manifest_path(&self.project_dir),
            }
            .into())
        }
    }

    /// Resolves and fetches `raw`, showing a spinner while it runs.
    ///
    /// `cache_dir` overrides the configured cache location for this call.
    ///
    /// # Errors
    ///
    /// Any resolution or fetch error.
    pub async fn fetch(&self, raw: &str, cache_dir: Option<&Path>) -> Result<Package> {
        let mut config = self.config.clone();
        if let Some(dir) = cache_dir {
            config.cache_dir = dir.to_string_lossy().into_owned();
        }

        let source = config.resolver().resolve(raw)?;
        let fetcher = config.fetcher()?;

        let spinner = Spinner::start(format!("Fetching {raw}..."), self.progress);
        let result = fetcher.fetch(&source).await;
        spinner.finish_and_clear();
        result
    }
}

/// Agent package manager: fetch, validate and install agents into a project.
#[derive(Parser, Debug)]
#[command(
    name = "agpkg",
    about = "Agent package manager - fetch, validate and install agents",
    version,
    long_about = "AGPKG installs agent packages from a catalog, git repositories, archive URLs or local directories into the agents/ directory of a project and registers them in project.yaml."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable spinners
    #[arg(long, global = true)]
    no_progress: bool,

    /// Path to an alternative config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch, validate and install an agent
    Add(add::AddCommand),

    /// List installed agents
    List(list::ListCommand),

    /// Remove an installed agent
    #[command(visible_aliases = ["rm", "uninstall"])]
    Remove(remove::RemoveCommand),

    /// Fetch and validate an agent without installing it
    Validate(validate::ValidateCommand),

    /// Manage the package cache
    Cache(cache::CacheCommand),
}

impl Cli {
    /// Default tracing filter implied by `--verbose` / `--quiet`.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    /// Loads configuration and runs the selected subcommand.
    ///
    /// # Errors
    ///
    /// Returns whatever the subcommand fails with; `main` renders it.
    pub async fn execute(self) -> Result<()> {
        let config = Config::load_with_optional(self.config.clone()).await?;
        let project_dir = match self.project_dir.clone() {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };

        let ctx = CliContext {
            config,
            project_dir,
            progress: !self.no_progress && !self.quiet,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Add(cmd) => cmd.execute(&ctx).await,
            Commands::List(cmd) => cmd.execute(&ctx),
            Commands::Remove(cmd) => cmd.execute(&ctx),
            Commands::Validate(cmd) => cmd.execute(&ctx).await,
            Commands::Cache(cmd) => cmd.execute(&ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_flags() {
        assert_eq!(Cli::parse_from(["agpkg", "list"]).log_level(), "warn");
        assert_eq!(Cli::parse_from(["agpkg", "-v", "list"]).log_level(), "debug");
        assert_eq!(Cli::parse_from(["agpkg", "list", "--quiet"]).log_level(), "error");
        assert!(Cli::try_parse_from(["agpkg", "-v", "-q", "list"]).is_err());
    }

    #[test]
    fn test_remove_aliases() {
        for alias in ["remove", "rm", "uninstall"] {
            let cli = Cli::parse_from(["agpkg", alias, "my-agent"]);
            assert!(matches!(cli.command, Commands::Remove(_)), "{alias}");
        }
    }

    #[test]
    fn test_add_arguments() {
        let cli = Cli::parse_from([
            "agpkg",
            "add",
            "memory/vector-store",
            "--as",
            "vs",
            "--force",
            "--no-install",
        ]);
        let Commands::Add(cmd) = cli.command else {
            panic!("expected add command");
        };
        assert_eq!(cmd.source, "memory/vector-store");
        assert_eq!(cmd.target_name(), Some("vs"));
        assert!(cmd.force);
        assert!(cmd.no_install);

        assert!(Cli::try_parse_from(["agpkg", "add", "a/b", "name", "--as", "other"]).is_err());
    }
}
