//! Native build orchestration
//!
//! The direct backend builds in two phases:
//!
//! ```text
//! Start → CheckLibrary ─┬─ present ──────────────────────────────→ Link → Done
//!                       └─ absent → CompileDeps → ArchiveDeps ───→ Link → Done
//! ```
//!
//! Phase 1 (compile + archive the Luau sources into a static library) is
//! skipped whenever the library already exists. That existence check is the
//! whole caching policy: no hashes, no timestamps. `luaubuild clean` is the
//! way to force a rebuild. Any step may fail; failure ends the build.
//!
//! The CMake backend (see [`cmake`]) hands the whole job to Luau's own
//! CMake project instead.

pub mod cmake;
pub mod modules;
pub mod toolchains;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Layout;
use crate::error::{hints, LuauBuildError};
use crate::exec::{CommandResult, CommandRunner, Invocation};
use crate::utils::paths::{display_relative, glob_files, remove_file_if_exists};
use crate::utils::terminal;

use toolchains::{CompileFlags, Toolchain};

/// A state of the build, recorded in [`BuildReport::steps`] as it is passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    CheckLibrary,
    CompileDeps,
    ArchiveDeps,
    Link,
    Configure,
    CmakeBuild,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::CheckLibrary => write!(f, "Library check"),
            BuildStep::CompileDeps => write!(f, "Compiling Luau sources"),
            BuildStep::ArchiveDeps => write!(f, "Archiving Luau library"),
            BuildStep::Link => write!(f, "Linking"),
            BuildStep::Configure => write!(f, "CMake configure"),
            BuildStep::CmakeBuild => write!(f, "CMake build"),
        }
    }
}

/// What a successful build did
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    /// Output binary in the working directory
    pub binary: PathBuf,
    /// Whether the static library was (re)built during this run
    pub library_rebuilt: bool,
    /// Steps passed, in order
    pub steps: Vec<BuildStep>,
}

/// Two-phase direct builder
pub struct Builder<'a> {
    layout: &'a Layout,
    toolchain: &'a dyn Toolchain,
    runner: &'a dyn CommandRunner,
    flags: CompileFlags,
}

impl<'a> Builder<'a> {
    pub fn new(
        layout: &'a Layout,
        toolchain: &'a dyn Toolchain,
        runner: &'a dyn CommandRunner,
        flags: CompileFlags,
    ) -> Self {
        Self {
            layout,
            toolchain,
            runner,
            flags,
        }
    }

    /// Build the library if needed, then the output binary
    pub fn build(&self) -> Result<BuildReport, LuauBuildError> {
        check_main_source(self.layout)?;

        let include_dirs = modules::include_dirs(&self.layout.staging_dir);
        let mut steps = vec![BuildStep::CheckLibrary];

        let library_rebuilt = if library_present(&self.layout.library) {
            terminal::print_info(&format!(
                "Using cached {}",
                display_relative(&self.layout.library, &self.layout.working_dir)
            ));
            false
        } else {
            self.build_library(&include_dirs, &mut steps)?;
            true
        };

        let total = if library_rebuilt { 3 } else { 1 };
        terminal::print_step(total, total, "Linking main program");
        let link = self.toolchain.link(
            &self.layout.main_source,
            &include_dirs,
            &self.layout.library,
            &self.layout.output_binary,
            &self.flags,
        );
        run_step(self.runner, BuildStep::Link, &link, &self.layout.working_dir)?;
        steps.push(BuildStep::Link);

        Ok(BuildReport {
            binary: self.layout.output_binary.clone(),
            library_rebuilt,
            steps,
        })
    }

    /// Phase 1: compile every Luau source once, archive, drop the objects
    fn build_library(
        &self,
        include_dirs: &[PathBuf],
        steps: &mut Vec<BuildStep>,
    ) -> Result<(), LuauBuildError> {
        let sources = modules::source_files(&self.layout.staging_dir)?;
        if sources.is_empty() {
            return Err(LuauBuildError::missing_source(
                &self.layout.staging_dir,
                "No Luau sources are staged. Run `luaubuild deps` first.",
            ));
        }

        terminal::print_step(
            1,
            3,
            &format!(
                "Compiling {} Luau sources with {}",
                sources.len(),
                self.toolchain.name()
            ),
        );
        let compile = self
            .toolchain
            .compile_objects(&sources, include_dirs, &self.flags);
        let result = run_step(
            self.runner,
            BuildStep::CompileDeps,
            &compile,
            &self.layout.working_dir,
        )?;
        steps.push(BuildStep::CompileDeps);
        terminal::print_info(&format!("Compiled in {:.1}s", result.duration.as_secs_f64()));

        let extension = self.toolchain.kind().object_extension();
        let objects = glob_files(&self.layout.working_dir, &format!("*.{}", extension))?;
        if objects.is_empty() {
            return Err(LuauBuildError::toolchain(
                BuildStep::CompileDeps.to_string(),
                compile.to_string(),
                result.exit_code,
                format!("compiler succeeded but left no .{} files", extension),
            ));
        }

        // A zero-length library is the remnant of an interrupted archive step
        remove_file_if_exists(&self.layout.library)?;

        terminal::print_step(
            2,
            3,
            &format!(
                "Archiving {} objects into {}",
                objects.len(),
                display_relative(&self.layout.library, &self.layout.working_dir)
            ),
        );
        let archive = self.toolchain.archive(&objects, &self.layout.library);
        let archived = run_step(
            self.runner,
            BuildStep::ArchiveDeps,
            &archive,
            &self.layout.working_dir,
        );

        let mut cleanup_error = None;
        for object in &objects {
            if let Err(e) = remove_file_if_exists(object) {
                cleanup_error.get_or_insert(e);
            }
        }

        archived?;
        steps.push(BuildStep::ArchiveDeps);

        match cleanup_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Whether a usable static library is already staged
pub fn library_present(library: &Path) -> bool {
    fs::metadata(library)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Fail before any subprocess when the main source is absent
pub(crate) fn check_main_source(layout: &Layout) -> Result<(), LuauBuildError> {
    if layout.main_source.is_file() {
        return Ok(());
    }
    let name = display_relative(&layout.main_source, &layout.working_dir);
    Err(LuauBuildError::missing_source(
        &layout.main_source,
        hints::main_source(&name),
    ))
}

/// Run one toolchain step, turning spawn failures and non-zero exits into [`LuauBuildError::Toolchain`]
pub(crate) fn run_step(
    runner: &dyn CommandRunner,
    step: BuildStep,
    invocation: &Invocation,
    cwd: &Path,
) -> Result<CommandResult, LuauBuildError> {
    let result = runner.run(invocation, cwd).map_err(|e| {
        LuauBuildError::toolchain(
            step.to_string(),
            invocation.to_string(),
            None,
            format!("failed to start {}: {}", invocation.program_name(), e),
        )
    })?;

    if !result.success {
        let output = if result.stderr.trim().is_empty() {
            result.stdout.clone()
        } else {
            result.stderr.clone()
        };
        return Err(LuauBuildError::toolchain(
            step.to_string(),
            invocation.to_string(),
            result.exit_code,
            output,
        ));
    }

    // Compiler warnings
    let warnings = result.stderr.trim();
    if !warnings.is_empty() {
        terminal::print_warning(&format!("{} reported:", invocation.program_name()));
        for line in warnings.lines() {
            println!("  {}", line);
        }
    }

    Ok(result)
}
