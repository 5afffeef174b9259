use super::CliContext;
use crate::installer::Installer;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Arguments for `agpkg remove`.
#[derive(Args, Debug)]
pub struct RemoveCommand {
    /// Name of the installed agent
    name: String,
}

impl RemoveCommand {
    pub(super) fn execute(self, ctx: &CliContext) -> Result<()> {
        ctx.require_project()?;

        let removed = Installer::new(&ctx.project_dir).uninstall(&self.name)?;
        if !ctx.quiet {
            if removed {
                println!("{} Removed agent '{}'", "✓".green(), self.name.bold());
            } else {
                println!("Agent '{}' is not installed", self.name);
            }
        }
        Ok(())
    }
}
