//! Clean command implementation

use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;
use crate::clean::Cleaner;
use crate::utils::terminal;

/// Remove the staged sources, the output binary and object files
#[derive(Args, Debug)]
pub struct CleanCommand {
    /// Show what would be deleted
    #[arg(long)]
    pub dry_run: bool,
}

impl CleanCommand {
    /// Execute the clean command
    pub fn execute(self, ctx: &Context) -> Result<()> {
        println!("Cleaning build artifacts...");

        let layout = ctx.config.layout(&ctx.working_dir);
        let report = Cleaner::new(&layout, self.dry_run)
            .clean()
            .context("Error cleaning project")?;

        if report.removed.is_empty() {
            terminal::print_info("Nothing to clean");
        } else if self.dry_run {
            terminal::print_info(&format!(
                "Would free {}; run without --dry-run to delete",
                terminal::format_size(report.freed_bytes)
            ));
        } else {
            terminal::print_success(&format!(
                "Freed {}",
                terminal::format_size(report.freed_bytes)
            ));
        }

        Ok(())
    }
}
