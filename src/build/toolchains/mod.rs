//! Toolchain detection and command-line construction
//!
//! The builder only ever asks a [`Toolchain`] for three command lines:
//! compile the dependency sources to objects, archive the objects, and
//! compile+link the main program. Which family answers is decided once,
//! by host platform or by `build.toolchain` in luaubuild.toml.

pub mod gnu;
pub mod msvc;

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;

use crate::config::BuildConfig;
use crate::error::LuauBuildError;
use crate::exec::Invocation;

pub use gnu::GnuToolchain;
pub use msvc::MsvcToolchain;

/// Toolchain family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainKind {
    /// g++ / clang++ with ar
    Gnu,
    /// cl.exe with lib.exe
    Msvc,
}

impl ToolchainKind {
    /// Native family for the platform we are running on
    pub fn host() -> Self {
        if cfg!(target_env = "msvc") {
            ToolchainKind::Msvc
        } else {
            ToolchainKind::Gnu
        }
    }

    /// Static library file name for a base name
    pub fn library_file_name(&self, base: &str) -> String {
        match self {
            ToolchainKind::Gnu => format!("lib{}.a", base),
            ToolchainKind::Msvc => format!("{}.lib", base),
        }
    }

    /// Extension of the object files the compiler drops in the working directory
    pub fn object_extension(&self) -> &'static str {
        match self {
            ToolchainKind::Gnu => "o",
            ToolchainKind::Msvc => "obj",
        }
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolchainKind::Gnu => write!(f, "gnu"),
            ToolchainKind::Msvc => write!(f, "msvc"),
        }
    }
}

/// Flags shared by the compile and link steps
#[derive(Debug, Clone, PartialEq)]
pub struct CompileFlags {
    /// Language standard, e.g. `c++17`
    pub std: String,
    /// Optimization level without the flag prefix, e.g. `2`
    pub opt_level: String,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,
}

impl From<&BuildConfig> for CompileFlags {
    fn from(config: &BuildConfig) -> Self {
        Self {
            std: config.std.clone(),
            opt_level: config.opt_level.clone(),
            cxxflags: config.cxxflags.clone(),
            ldflags: config.ldflags.clone(),
        }
    }
}

/// Generic toolchain trait
pub trait Toolchain {
    /// Get the toolchain name
    fn name(&self) -> &str;

    /// Toolchain family
    fn kind(&self) -> ToolchainKind;

    /// One invocation compiling every source to an object file in the working directory
    fn compile_objects(
        &self,
        sources: &[PathBuf],
        include_dirs: &[PathBuf],
        flags: &CompileFlags,
    ) -> Invocation;

    /// One invocation bundling `objects` into the static library at `library`
    fn archive(&self, objects: &[PathBuf], library: &Path) -> Invocation;

    /// One invocation compiling `main_source` and linking it with `library` into `output`
    fn link(
        &self,
        main_source: &Path,
        include_dirs: &[PathBuf],
        library: &Path,
        output: &Path,
        flags: &CompileFlags,
    ) -> Invocation;
}

/// Find an executable in PATH
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find an executable, checking multiple possible names
pub fn find_executable_any(names: &[&str]) -> Option<PathBuf> {
    names.iter().find_map(|name| find_executable(name))
}

/// Resolve a tool: explicit setting, then environment variable, then PATH candidates
pub(crate) fn resolve_tool(
    configured: Option<&str>,
    env_var: &str,
    candidates: &[&str],
) -> Option<PathBuf> {
    if let Some(tool) = configured {
        return find_executable(tool);
    }
    if let Some(tool) = std::env::var(env_var).ok().filter(|v| !v.trim().is_empty()) {
        return find_executable(tool.trim());
    }
    find_executable_any(candidates)
}

/// Detect the toolchain for `kind`, honouring the `[build]` overrides
pub fn detect(kind: ToolchainKind, config: &BuildConfig) -> Result<Box<dyn Toolchain>, LuauBuildError> {
    match kind {
        ToolchainKind::Gnu => Ok(Box::new(GnuToolchain::detect(config)?)),
        ToolchainKind::Msvc => Ok(Box::new(MsvcToolchain::detect(config)?)),
    }
}

/// Render paths as command-line arguments
pub(crate) fn path_args(paths: &[PathBuf]) -> impl Iterator<Item = String> + '_ {
    paths.iter().map(|p| p.display().to_string())
}
