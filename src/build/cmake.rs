//! CMake backend
//!
//! Generates a CMakeLists.txt next to the main source that pulls the staged
//! Luau tree in with `add_subdirectory`, then runs configure and build and
//! copies the produced binary into the working directory. Incrementality is
//! CMake's business here; the static-library cache of the direct backend
//! does not apply.

use std::fs;
use std::path::{Path, PathBuf};

use super::{check_main_source, modules, run_step, BuildReport, BuildStep};
use crate::config::Layout;
use crate::error::{hints, LuauBuildError};
use crate::exec::{CommandRunner, Invocation};
use crate::utils::paths::{display_relative, ensure_dir};
use crate::utils::terminal;

/// First line of every CMakeLists.txt we write; files without it are left alone
pub const GENERATED_MARKER: &str = "# Generated by luaubuild. Remove this line to keep local edits.";

pub const CMAKE_LISTS: &str = "CMakeLists.txt";

/// CMake configure + build driver
pub struct CmakeBuilder<'a> {
    layout: &'a Layout,
    runner: &'a dyn CommandRunner,
    cmake: PathBuf,
    cxx_standard: String,
    jobs: usize,
}

impl<'a> CmakeBuilder<'a> {
    pub fn new(
        layout: &'a Layout,
        runner: &'a dyn CommandRunner,
        cmake: impl Into<PathBuf>,
        std: &str,
        jobs: usize,
    ) -> Self {
        Self {
            layout,
            runner,
            cmake: cmake.into(),
            cxx_standard: cxx_standard_number(std),
            jobs: jobs.max(1),
        }
    }

    /// Find CMake executable
    pub fn find_cmake() -> Result<PathBuf, LuauBuildError> {
        which::which("cmake").map_err(|_| {
            LuauBuildError::missing_tool("cmake", "the CMake build backend", hints::cmake())
        })
    }

    pub fn build(&self) -> Result<BuildReport, LuauBuildError> {
        check_main_source(self.layout)?;

        if !self.layout.staging_dir.join(CMAKE_LISTS).is_file() {
            return Err(LuauBuildError::missing_source(
                self.layout.staging_dir.join(CMAKE_LISTS),
                "No Luau sources are staged. Run `luaubuild deps` first.",
            ));
        }

        self.write_cmake_lists()?;
        ensure_dir(&self.layout.cmake_build_dir)?;

        let build_dir = self.layout.cmake_build_dir.display().to_string();
        let mut steps = Vec::new();

        terminal::print_step(1, 2, "Configuring with CMake");
        let configure = Invocation::new(&self.cmake)
            .arg("-S")
            .arg(self.layout.working_dir.display().to_string())
            .arg("-B")
            .arg(build_dir.clone())
            .arg("-DCMAKE_BUILD_TYPE=Release");
        run_step(self.runner, BuildStep::Configure, &configure, &self.layout.working_dir)?;
        steps.push(BuildStep::Configure);

        terminal::print_step(2, 2, &format!("Building with {} parallel jobs", self.jobs));
        let build = Invocation::new(&self.cmake)
            .args(["--build".to_string(), build_dir])
            .args(["--config", "Release", "--parallel"])
            .arg(self.jobs.to_string());
        run_step(self.runner, BuildStep::CmakeBuild, &build, &self.layout.working_dir)?;
        steps.push(BuildStep::CmakeBuild);

        self.copy_binary()?;

        Ok(BuildReport {
            binary: self.layout.output_binary.clone(),
            library_rebuilt: false,
            steps,
        })
    }

    /// Write the generated CMakeLists.txt unless the user owns the file
    fn write_cmake_lists(&self) -> Result<(), LuauBuildError> {
        let path = self.layout.working_dir.join(CMAKE_LISTS);
        if path.exists() && !is_generated_cmake_lists(&path) {
            terminal::print_warning(&format!(
                "Keeping hand-written {}; it must add the Luau targets itself",
                CMAKE_LISTS
            ));
            return Ok(());
        }

        let content = render_cmake_lists(self.layout, &self.cxx_standard);
        fs::write(&path, content).map_err(|e| LuauBuildError::io("write", &path, e))
    }

    fn copy_binary(&self) -> Result<(), LuauBuildError> {
        let file_name = self
            .layout
            .output_binary
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default();

        // Multi-config generators (Visual Studio, Xcode) add a config subdirectory
        let candidates = [
            self.layout.cmake_build_dir.join(&file_name),
            self.layout.cmake_build_dir.join("Release").join(&file_name),
        ];
        let built = candidates.iter().find(|p| p.is_file()).ok_or_else(|| {
            LuauBuildError::toolchain(
                BuildStep::CmakeBuild.to_string(),
                format!("cmake --build {}", self.layout.cmake_build_dir.display()),
                Some(0),
                format!(
                    "build finished but {} was not found in {}",
                    file_name.display(),
                    self.layout.cmake_build_dir.display()
                ),
            )
        })?;

        fs::copy(built, &self.layout.output_binary)
            .map_err(|e| LuauBuildError::io("copy", built, e))?;
        Ok(())
    }
}

/// Whether `path` is a CMakeLists.txt written by [`CmakeBuilder`]
pub fn is_generated_cmake_lists(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|content| content.starts_with(GENERATED_MARKER))
        .unwrap_or(false)
}

/// `c++17` / `gnu++20` → `17` / `20`
fn cxx_standard_number(std: &str) -> String {
    std.rsplit("++").next().unwrap_or(std).to_string()
}

/// Render the CMakeLists.txt for `layout`, using the shared module table
pub fn render_cmake_lists(layout: &Layout, cxx_standard: &str) -> String {
    let staging = cmake_path(&display_relative(&layout.staging_dir, &layout.working_dir));
    let main_source = cmake_path(&display_relative(&layout.main_source, &layout.working_dir));
    let target = target_name(&layout.output_binary);

    let mut out = String::new();
    out.push_str(GENERATED_MARKER);
    out.push('\n');
    out.push_str("cmake_minimum_required(VERSION 3.10)\n");
    out.push_str("project(LuauProject LANGUAGES C CXX)\n\n");
    out.push_str(&format!("set(CMAKE_CXX_STANDARD {})\n", cxx_standard));
    out.push_str("set(CMAKE_CXX_STANDARD_REQUIRED ON)\n\n");
    out.push_str(&format!("add_subdirectory({})\n\n", staging));
    out.push_str(&format!("add_executable({} {})\n\n", target, main_source));

    out.push_str(&format!("target_link_libraries({} PRIVATE\n", target));
    for cmake_target in modules::cmake_targets() {
        out.push_str(&format!("    {}\n", cmake_target));
    }
    out.push_str(")\n\n");

    out.push_str(&format!("target_include_directories({} PRIVATE\n", target));
    for module in modules::MODULES {
        for dir in module.include_dirs {
            out.push_str(&format!("    ${{CMAKE_SOURCE_DIR}}/{}/{}\n", staging, dir));
        }
    }
    out.push_str(")\n");
    out
}

fn target_name(output: &Path) -> String {
    output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "main".to_string())
}

fn cmake_path(path: &str) -> String {
    path.replace('\\', "/")
}
