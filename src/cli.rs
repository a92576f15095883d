//! CLI argument parsing using clap derive macros

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};

use crate::commands::{build::BuildCommand, clean::CleanCommand, deps::DepsCommand, Context};
use crate::config::Config;

/// luaubuild - fetch Luau and build a program against it
#[derive(Parser, Debug)]
#[command(name = "luaubuild")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Enable verbose output (echo toolchain commands)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file (defaults to luaubuild.toml in the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Working directory (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and stage the Luau sources
    Deps(DepsCommand),

    /// Remove staged sources, the output binary and object files
    Clean(CleanCommand),

    /// Build the main program, compiling the Luau library first if needed
    Build(BuildCommand),

    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // Set up terminal colors
        if self.no_color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }

        if let Commands::Unknown(args) = &self.command {
            bail!("Unknown command: {}", args.first().map(String::as_str).unwrap_or(""));
        }

        // Absolute, since toolchain steps run with their own cwd
        let current_dir =
            std::env::current_dir().context("Failed to get current working directory")?;
        let working_dir = match self.dir {
            Some(dir) => current_dir.join(dir),
            None => current_dir,
        };
        let config = match &self.config {
            Some(path) => Config::load_from_path(path)?,
            None => Config::load(&working_dir)?,
        };
        let ctx = Context {
            working_dir,
            config,
            verbose: self.verbose,
        };

        // Execute the subcommand
        match self.command {
            Commands::Deps(cmd) => cmd.execute(&ctx),
            Commands::Clean(cmd) => cmd.execute(&ctx),
            Commands::Build(cmd) => cmd.execute(&ctx),
            Commands::Unknown(_) => unreachable!("handled above"),
        }
    }
}
