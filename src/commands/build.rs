//! Build command implementation

use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;
use crate::build::cmake::CmakeBuilder;
use crate::build::toolchains::{self, CompileFlags, ToolchainKind};
use crate::build::Builder;
use crate::config::Backend;
use crate::exec::SystemRunner;
use crate::utils::paths::display_relative;
use crate::utils::terminal;

/// Build the main program against the staged Luau sources
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Use the CMake backend instead of invoking the compiler directly
    #[arg(long)]
    pub cmake: bool,

    /// Parallel jobs for the CMake backend (defaults to available cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Toolchain family (defaults to the host's native one)
    #[arg(long, value_enum)]
    pub toolchain: Option<ToolchainKind>,
}

impl BuildCommand {
    /// Execute the build command
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let mut config = ctx.config.clone();
        if self.cmake {
            config.build.backend = Backend::Cmake;
        }
        if let Some(kind) = self.toolchain {
            config.build.toolchain = Some(kind);
        }

        let layout = config.layout(&ctx.working_dir);
        let runner = SystemRunner::new(ctx.verbose);

        let report = match config.build.backend {
            Backend::Direct => {
                let toolchain = toolchains::detect(config.toolchain_kind(), &config.build)
                    .context("Error building project")?;
                println!("Building with {} toolchain...", config.toolchain_kind());
                Builder::new(&layout, toolchain.as_ref(), &runner, CompileFlags::from(&config.build))
                    .build()
                    .context("Error building project")?
            }
            Backend::Cmake => {
                let cmake = CmakeBuilder::find_cmake().context("Error building project")?;
                let jobs = self
                    .jobs
                    .or(config.build.jobs)
                    .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
                    .unwrap_or(1);
                println!("Building with CMake...");
                CmakeBuilder::new(&layout, &runner, cmake, &config.build.std, jobs)
                    .build()
                    .context("Error building project")?
            }
        };

        if ctx.verbose {
            let steps: Vec<String> = report.steps.iter().map(|s| s.to_string()).collect();
            terminal::print_info(&format!("Steps: {}", steps.join(" → ")));
        }

        terminal::print_success(&format!(
            "Built {}{}",
            display_relative(&report.binary, &ctx.working_dir),
            if report.library_rebuilt {
                " (Luau library rebuilt)"
            } else {
                ""
            }
        ));

        Ok(())
    }
}
