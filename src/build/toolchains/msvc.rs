//! MSVC toolchain for Windows (cl.exe with lib.exe)
//!
//! Expects a developer prompt: `cl` and `lib` are looked up on PATH, the way
//! `vcvarsall.bat` leaves them.

use std::path::{Path, PathBuf};

use super::{path_args, resolve_tool, CompileFlags, Toolchain, ToolchainKind};
use crate::config::BuildConfig;
use crate::error::LuauBuildError;
use crate::exec::Invocation;

const VS_HINT: &str = "Run from a Visual Studio Developer Command Prompt so cl.exe and lib.exe are on PATH:\n\
     1. Install Visual Studio with 'Desktop development with C++'\n\
     2. Open 'x64 Native Tools Command Prompt'\n\
     \n\
     Or set build.toolchain = \"gnu\" in luaubuild.toml to use MinGW.";

/// cl.exe driver plus lib.exe
#[derive(Debug, Clone)]
pub struct MsvcToolchain {
    cl: PathBuf,
    lib: PathBuf,
}

impl MsvcToolchain {
    pub fn new(cl: impl Into<PathBuf>, lib: impl Into<PathBuf>) -> Self {
        Self {
            cl: cl.into(),
            lib: lib.into(),
        }
    }

    pub fn detect(config: &BuildConfig) -> Result<Self, LuauBuildError> {
        let cl = resolve_tool(config.compiler.as_deref(), "CXX", &["cl"]).ok_or_else(|| {
            LuauBuildError::missing_tool("cl.exe", "compiling Luau and the main program", VS_HINT)
        })?;
        let lib = resolve_tool(config.archiver.as_deref(), "AR", &["lib"]).ok_or_else(|| {
            LuauBuildError::missing_tool("lib.exe", "archiving the Luau static library", VS_HINT)
        })?;
        Ok(Self::new(cl, lib))
    }

    fn common_flags(flags: &CompileFlags) -> Vec<String> {
        let mut args = vec![
            "/nologo".to_string(),
            "/EHsc".to_string(),
            format!("/std:{}", flags.std),
            format!("/O{}", flags.opt_level),
        ];
        args.extend(flags.cxxflags.iter().cloned());
        args
    }

    fn include_flags(include_dirs: &[PathBuf]) -> impl Iterator<Item = String> + '_ {
        include_dirs.iter().map(|d| format!("/I{}", d.display()))
    }
}

impl Toolchain for MsvcToolchain {
    fn name(&self) -> &str {
        "msvc"
    }

    fn kind(&self) -> ToolchainKind {
        ToolchainKind::Msvc
    }

    fn compile_objects(
        &self,
        sources: &[PathBuf],
        include_dirs: &[PathBuf],
        flags: &CompileFlags,
    ) -> Invocation {
        Invocation::new(&self.cl)
            .args(Self::common_flags(flags))
            .arg("/c")
            .args(Self::include_flags(include_dirs))
            .args(path_args(sources))
    }

    fn archive(&self, objects: &[PathBuf], library: &Path) -> Invocation {
        Invocation::new(&self.lib)
            .arg("/nologo")
            .arg(format!("/OUT:{}", library.display()))
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
        // main.obj lands in the staging dir, outside the working-directory `*.obj` sweep
        let object_dir = library.parent().unwrap_or_else(|| Path::new("."));
        let mut inv = Invocation::new(&self.cl)
            .args(Self::common_flags(flags))
            .args(Self::include_flags(include_dirs))
            .arg(main_source.display().to_string())
            .arg(library.display().to_string())
            .arg(format!("/Fo{}{}", object_dir.display(), std::path::MAIN_SEPARATOR))
            .arg(format!("/Fe{}", output.display()));

        if !flags.ldflags.is_empty() {
            inv = inv.arg("/link").args(flags.ldflags.iter().cloned());
        }
        inv
    }
}
