use super::CliContext;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

/// Arguments for `agpkg cache`.
#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    command: Option<CacheSubcommand>,
}

#[derive(Subcommand, Debug)]
enum CacheSubcommand {
    /// Show cache location, entries and size
    Info,
    /// Remove expired and orphaned entries
    Clean {
        /// Remove every entry
        #[arg(long)]
        all: bool,
    },
}

impl CacheCommand {
    pub(super) fn execute(self, ctx: &CliContext) -> Result<()> {
        let cache = ctx.config.cache()?;

        match self.command.unwrap_or(CacheSubcommand::Info) {
            CacheSubcommand::Info => {
                let entries = cache.entries()?;
                println!("{} {}", "Cache location:".bold(), cache.location().display());
                println!("{} {}", "Entries:".bold(), entries.len());
                println!("{} {}s", "TTL:".bold(), cache.ttl().as_secs());
                println!("{} {}", "Size:".bold(), format_size(cache.size()?));
                for (_, entry) in entries {
                    let state = if entry.is_valid_at(chrono::Utc::now()) {
                        format!("expires {}", entry.expires_at.format("%Y-%m-%d %H:%M UTC")).normal()
                    } else {
                        "stale".yellow()
                    };
                    println!("  {} ({})", entry.source.raw, state);
                }
            }
            CacheSubcommand::Clean { all } => {
                let removed = cache.clean(all)?;
                if !ctx.quiet {
                    println!("{} Removed {} cache entries", "✓".green(), removed);
                }
            }
        }
        Ok(())
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
