//! Luau module table
//!
//! One table drives both phases of the direct build (dependency compile and
//! main link) as well as the generated CMakeLists.txt, so include paths
//! cannot drift between them. Paths are relative to the staging directory.

use std::path::{Path, PathBuf};

use crate::error::LuauBuildError;

/// A directory of the upstream source tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyModule {
    pub name: &'static str,
    /// Include directories exported by this module
    pub include_dirs: &'static [&'static str],
    /// Glob patterns for the sources compiled into the static library
    pub source_globs: &'static [&'static str],
    /// CMake target from Luau's own build, if the module defines one
    pub cmake_target: Option<&'static str>,
}

/// All modules, in compile order
pub const MODULES: &[DependencyModule] = &[
    DependencyModule {
        name: "Common",
        include_dirs: &["Common/include"],
        source_globs: &[],
        cmake_target: None,
    },
    DependencyModule {
        name: "Ast",
        include_dirs: &["Ast/include"],
        source_globs: &["Ast/src/*.cpp"],
        cmake_target: Some("Luau.Ast"),
    },
    DependencyModule {
        name: "Compiler",
        include_dirs: &["Compiler/include"],
        source_globs: &["Compiler/src/*.cpp"],
        cmake_target: Some("Luau.Compiler"),
    },
    DependencyModule {
        name: "Config",
        include_dirs: &["Config/include"],
        source_globs: &["Config/src/*.cpp"],
        cmake_target: Some("Luau.Config"),
    },
    DependencyModule {
        name: "Analysis",
        include_dirs: &["Analysis/include"],
        source_globs: &["Analysis/src/*.cpp"],
        cmake_target: Some("Luau.Analysis"),
    },
    DependencyModule {
        name: "EqSat",
        include_dirs: &["EqSat/include"],
        source_globs: &["EqSat/src/*.cpp"],
        cmake_target: Some("Luau.EqSat"),
    },
    DependencyModule {
        name: "VM",
        include_dirs: &["VM/include"],
        source_globs: &["VM/src/*.cpp"],
        cmake_target: Some("Luau.VM"),
    },
    // CodeGen reaches into VM internals (lobject.h, lstate.h)
    DependencyModule {
        name: "CodeGen",
        include_dirs: &["CodeGen/include", "VM/src"],
        source_globs: &["CodeGen/src/*.cpp"],
        cmake_target: Some("Luau.CodeGen"),
    },
    // Only the library half of the CLI; the *Entry.cpp files define main()
    DependencyModule {
        name: "CLI",
        include_dirs: &["CLI/include", "CLI/src"],
        source_globs: &[
            "CLI/src/FileUtils.cpp",
            "CLI/src/Flags.cpp",
            "CLI/src/Coverage.cpp",
            "CLI/src/Profiler.cpp",
            "CLI/src/Require.cpp",
        ],
        cmake_target: Some("Luau.CLI.lib"),
    },
    DependencyModule {
        name: "isocline",
        include_dirs: &["extern/isocline/include"],
        source_globs: &["extern/isocline/src/isocline.c"],
        cmake_target: Some("isocline"),
    },
];

/// Headers whose presence `deps` reports after extraction
pub const CRITICAL_HEADERS: &[&str] = &[
    "Config/include/Luau/LinterConfig.h",
    "Analysis/include/Luau/Linter.h",
    "Analysis/include/Luau/Module.h",
    "EqSat/include/Luau/EGraph.h",
    "Analysis/include/Luau/EqSatSimplificationImpl.h",
    "Analysis/include/Luau/BuiltinTypes.h",
    "Analysis/include/Luau/Frontend.h",
    "Analysis/include/Luau/TypeInfer.h",
];

/// Include directories of every module under `staging`, deduplicated, in table order
pub fn include_dirs(staging: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for module in MODULES {
        for dir in module.include_dirs {
            let path = staging.join(dir);
            if !dirs.contains(&path) {
                dirs.push(path);
            }
        }
    }
    dirs
}

/// Expand every module's source globs under `staging`
///
/// Modules are visited in table order and each pattern's matches are sorted,
/// so the object list is the same from run to run.
pub fn source_files(staging: &Path) -> Result<Vec<PathBuf>, LuauBuildError> {
    let root = glob::Pattern::escape(&staging.to_string_lossy());
    let mut sources = Vec::new();
    for module in MODULES {
        for pattern in module.source_globs {
            let full = format!("{}/{}", root, pattern);
            let paths = glob::glob(&full).map_err(|e| {
                LuauBuildError::config_error_with_hint(
                    format!("Invalid source pattern for module {}: {}", module.name, pattern),
                    Some(e.into()),
                    "The module table contains a malformed glob pattern.",
                )
            })?;

            let mut matched: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
            matched.sort();
            sources.extend(matched);
        }
    }
    Ok(sources)
}

/// CMake targets to link against, in table order
pub fn cmake_targets() -> Vec<&'static str> {
    MODULES.iter().filter_map(|m| m.cmake_target).collect()
}
