//! Fetch, validate and install an agent.

use super::CliContext;
use crate::installer::{InstallOptions, Installer};
use crate::manifest::Package;
use crate::validator::Validator;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

/// Arguments for `agpkg add`.
#[derive(Args, Debug)]
pub struct AddCommand {
    /// Agent source: `category/name`, `host/owner/repo[#branch] [path]`, an archive URL,
    /// or a local directory
    pub(super) source: String,

    /// Install under this name instead of the manifest name
    #[arg(conflicts_with = "as_name")]
    pub(super) name: Option<String>,

    /// Install under this name instead of the manifest name
    #[arg(long = "as", value_name = "NAME")]
    pub(super) as_name: Option<String>,

    /// Do not install the agent's package dependencies
    #[arg(long)]
    pub(super) no_install: bool,

    /// Replace an agent that is already installed
    #[arg(long)]
    pub(super) force: bool,

    /// Use this cache directory instead of the configured one
    #[arg(long, value_name = "DIR")]
    pub(super) cache_dir: Option<PathBuf>,

    /// Only allow known source and text file extensions
    #[arg(long)]
    pub(super) strict: bool,
}

impl AddCommand {
    /// Name override from the positional argument or `--as`.
    pub(super) fn target_name(&self) -> Option<&str> {
        self.as_name.as_deref().or(self.name.as_deref())
    }

    pub(super) async fn execute(self, ctx: &CliContext) -> Result<()> {
        ctx.require_project()?;

        let package = ctx.fetch(&self.source, self.cache_dir.as_deref()).await?;
        if !ctx.quiet {
            print_summary(&package);
        }

        let strict = self.strict || ctx.config.strict_validation;
        let installer =
            Installer::new(&ctx.project_dir).with_validator(Validator::new(strict));
        let options = InstallOptions {
            name_override: self.target_name().map(str::to_string),
            force: self.force,
            skip_dependency_install: self.no_install,
        };
        debug!("Installing with {:?}", options);

        let dependencies = package.manifest.dependencies.clone();
        let outcome = tokio::task::spawn_blocking(move || installer.install(&package, &options))
            .await
            .context("Install task failed")??;

        if ctx.quiet {
            return Ok(());
        }

        let verb = if outcome.replaced { "Replaced" } else { "Installed" };
        println!(
            "{} {} agent '{}' ({} files) at {}",
            "✓".green(),
            verb,
            outcome.name.bold(),
            outcome.files_written,
            outcome.path.display()
        );

        for family in &outcome.dependency_families {
            println!("{} Installed {} dependencies", "✓".green(), family);
        }
        if self.no_install {
            if let Some(deps) = dependencies.filter(|d| !d.is_empty()) {
                println!("\n{}", "Dependencies were not installed. Install them with:".yellow());
                if !deps.npm.is_empty() {
                    println!("  npm install {}", deps.npm.join(" "));
                }
                if !deps.pip.is_empty() {
                    println!("  pip install {}", deps.pip.join(" "));
                }
                for module in &deps.go {
                    println!("  go get {module}");
                }
            }
        }

        println!("\n{}", "Next steps:".bold());
        println!("  Review the agent in agents/{}", outcome.name);
        println!("  Run 'agpkg list' to see installed agents");
        Ok(())
    }
}

fn print_summary(package: &Package) {
    let manifest = &package.manifest;
    println!(
        "{} {} {}",
        "Found agent".cyan(),
        manifest.name.bold(),
        format!("v{}", manifest.version).dimmed()
    );
    if !manifest.description.is_empty() {
        println!("  {}", manifest.description);
    }
    println!("  Language: {}", manifest.language_name);
    if let Some(author) = &manifest.author {
        println!("  Author: {author}");
    }
    println!("  Files: {}", package.files.len());
}
