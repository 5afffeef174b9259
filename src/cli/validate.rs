//! Fetch and validate an agent without touching the project.

use super::CliContext;
use crate::validator::Validator;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

/// Arguments for `agpkg validate`.
#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Agent source, in any form accepted by `agpkg add`
    source: String,

    /// Only allow known source and text file extensions
    #[arg(long)]
    strict: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl ValidateCommand {
    pub(super) async fn execute(self, ctx: &CliContext) -> Result<()> {
        let package = ctx.fetch(&self.source, None).await?;
        let strict = self.strict || ctx.config.strict_validation;
        let report = Validator::new(strict).validate(&package);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report).context("Failed to encode report")?);
        } else if !ctx.quiet {
            if report.valid {
                println!(
                    "{} {} v{} is valid",
                    "✓".green(),
                    package.manifest.name.bold(),
                    package.manifest.version
                );
            } else {
                println!("{} {} has {} problem(s):", "✗".red(), self.source.bold(), report.errors.len());
                for error in &report.errors {
                    println!("  - {error}");
                }
            }
        }

        Ok(report.into_result(&package.manifest.name)?)
    }
}
