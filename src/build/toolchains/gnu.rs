//! GCC/Clang toolchain (g++ or clang++ with ar)

use std::path::{Path, PathBuf};

use super::{path_args, resolve_tool, CompileFlags, Toolchain, ToolchainKind};
use crate::config::BuildConfig;
use crate::error::{hints, LuauBuildError};
use crate::exec::Invocation;

/// GNU-style driver plus `ar`
#[derive(Debug, Clone)]
pub struct GnuToolchain {
    cxx: PathBuf,
    ar: PathBuf,
}

impl GnuToolchain {
    pub fn new(cxx: impl Into<PathBuf>, ar: impl Into<PathBuf>) -> Self {
        Self {
            cxx: cxx.into(),
            ar: ar.into(),
        }
    }

    /// Locate the compiler (config, `CXX`, g++, clang++, c++) and archiver (config, `AR`, ar)
    pub fn detect(config: &BuildConfig) -> Result<Self, LuauBuildError> {
        let cxx = resolve_tool(config.compiler.as_deref(), "CXX", &["g++", "clang++", "c++"])
            .ok_or_else(|| {
                LuauBuildError::missing_tool(
                    config.compiler.as_deref().unwrap_or("g++"),
                    "compiling Luau and the main program",
                    hints::cxx_compiler(),
                )
            })?;

        let ar = resolve_tool(config.archiver.as_deref(), "AR", &["ar"]).ok_or_else(|| {
            LuauBuildError::missing_tool(
                config.archiver.as_deref().unwrap_or("ar"),
                "archiving the Luau static library",
                hints::archiver(),
            )
        })?;

        Ok(Self::new(cxx, ar))
    }

    fn common_flags(flags: &CompileFlags) -> Vec<String> {
        let mut args = vec![
            format!("-std={}", flags.std),
            format!("-O{}", flags.opt_level),
        ];
        args.extend(flags.cxxflags.iter().cloned());
        args
    }

    fn include_flags(include_dirs: &[PathBuf]) -> impl Iterator<Item = String> + '_ {
        include_dirs.iter().map(|d| format!("-I{}", d.display()))
    }
}

impl Toolchain for GnuToolchain {
    fn name(&self) -> &str {
        self.cxx
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("c++")
    }

    fn kind(&self) -> ToolchainKind {
        ToolchainKind::Gnu
    }

    fn compile_objects(
        &self,
        sources: &[PathBuf],
        include_dirs: &[PathBuf],
        flags: &CompileFlags,
    ) -> Invocation {
        Invocation::new(&self.cxx)
            .args(Self::common_flags(flags))
            .args(["-fPIC", "-c"])
            .args(Self::include_flags(include_dirs))
            .args(path_args(sources))
    }

    fn archive(&self, objects: &[PathBuf], library: &Path) -> Invocation {
        Invocation::new(&self.ar)
            .arg("rcs")
            .arg(library.display().to_string())
            .args(path_args(objects))
    }

    fn link(
        &self,
        main_source: &Path,
        include_dirs: &[PathBuf],
        library: &Path,
        output: &Path,
        flags: &CompileFlags,
    ) -> Invocation {
        Invocation::new(&self.cxx)
            .args(Self::common_flags(flags))
            .args(Self::include_flags(include_dirs))
            .arg(main_source.display().to_string())
            .arg(library.display().to_string())
            .arg("-o")
            .arg(output.display().to_string())
            .args(flags.ldflags.iter().cloned())
    }
}
