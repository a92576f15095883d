//! Deps command implementation

use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;
use crate::fetch::{FetchOptions, Fetcher};
use crate::utils::terminal;

/// Download and stage the Luau sources
#[derive(Args, Debug)]
pub struct DepsCommand {
    /// Archive URL (https://, file:// or a local path)
    #[arg(long, env = "LUAUBUILD_URL")]
    pub url: Option<String>,

    /// Expected SHA-256 of the archive
    #[arg(long, env = "LUAUBUILD_SHA256")]
    pub sha256: Option<String>,

    /// Top-level folder inside the archive to strip
    #[arg(long)]
    pub prefix: Option<String>,

    /// Download timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl DepsCommand {
    /// Execute the deps command
    pub fn execute(self, ctx: &Context) -> Result<()> {
        println!("Downloading Luau dependencies...");

        let mut options = FetchOptions::from(&ctx.config.source);
        if let Some(url) = self.url {
            options.url = url;
        }
        if let Some(sha256) = self.sha256 {
            options.sha256 = Some(sha256);
        }
        if let Some(prefix) = self.prefix {
            options.archive_prefix = prefix;
        }
        if let Some(timeout) = self.timeout {
            options.timeout = Duration::from_secs(timeout);
        }

        let layout = ctx.config.layout(&ctx.working_dir);
        let report = Fetcher::new(&layout, options, ctx.verbose)
            .fetch()
            .context("Error downloading dependencies")?;

        println!();
        terminal::print_success(&format!(
            "Staged {} files and {} directories",
            report.extracted.files, report.extracted.directories
        ));
        if ctx.verbose {
            terminal::print_info(&format!(
                "Archive: {}, SHA-256 {}",
                terminal::format_size(report.bytes),
                report.sha256
            ));
            if report.extracted.skipped > 0 {
                terminal::print_info(&format!(
                    "Skipped {} entries outside the archive root",
                    report.extracted.skipped
                ));
            }
        }
        if !report.missing_headers.is_empty() {
            terminal::print_warning(&format!(
                "{} expected headers are missing; the upstream layout may have changed",
                report.missing_headers.len()
            ));
        }

        Ok(())
    }
}
