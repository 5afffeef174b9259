use super::CliContext;
use crate::installer::Installer;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::warn;

/// Arguments for `agpkg list`.
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Print names only
    #[arg(long)]
    names_only: bool,
}

impl ListCommand {
    pub(super) fn execute(self, ctx: &CliContext) -> Result<()> {
        let installer = Installer::new(&ctx.project_dir);
        let names = installer.list_installed()?;

        if names.is_empty() {
            if !ctx.quiet {
                println!("No agents installed");
            }
            return Ok(());
        }

        for name in names {
            if self.names_only {
                println!("{name}");
                continue;
            }

            match installer.installed_manifest(&name) {
                Ok(manifest) => {
                    println!(
                        "{} {} {}",
                        name.bold(),
                        format!("v{}", manifest.version).dimmed(),
                        format!("[{}]", manifest.language_name).cyan()
                    );
                    if !manifest.description.is_empty() {
                        println!("  {}", manifest.description);
                    }
                }
                Err(e) => {
                    warn!("Cannot read manifest of {}: {:#}", name, e);
                    println!("{} {}", name.bold(), "(unreadable agent.yaml)".red());
                }
            }
        }
        Ok(())
    }
}
