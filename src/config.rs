//! luaubuild.toml configuration parsing
//!
//! Every key is optional; a missing file is the same as an empty one.
//!
//! ```toml
//! [source]
//! url = "https://github.com/luau-lang/luau/archive/refs/heads/master.zip"
//! archive_prefix = "luau-master"
//!
//! [layout]
//! staging_dir = "luau"
//! main_source = "main.cpp"
//!
//! [build]
//! backend = "cmake"
//! jobs = 8
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::build::toolchains::ToolchainKind;
use crate::error::{hints, LuauBuildError};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "luaubuild.toml";

/// Default upstream archive
pub const DEFAULT_URL: &str = "https://github.com/luau-lang/luau/archive/refs/heads/master.zip";

/// Root configuration from luaubuild.toml
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the Luau sources come from
    pub source: SourceConfig,

    /// File and directory names inside the working directory
    pub layout: LayoutConfig,

    /// Compiler and backend selection
    pub build: BuildConfig,
}

/// `[source]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Archive URL (`https://`, `http://`, `file://` or a plain path)
    pub url: String,

    /// Top-level folder inside the archive, stripped on extraction
    pub archive_prefix: String,

    /// Expected SHA-256 of the archive (lowercase hex)
    pub sha256: Option<String>,

    /// Total request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            archive_prefix: "luau-master".to_string(),
            sha256: None,
            timeout_secs: 300,
        }
    }
}

/// `[layout]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub staging_dir: PathBuf,
    pub main_source: PathBuf,
    /// Output binary name, without the platform executable suffix
    pub output: String,
    /// Static library base name (`luau` → `libluau.a` / `luau.lib`)
    pub library: String,
    pub cmake_build_dir: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("luau"),
            main_source: PathBuf::from("main.cpp"),
            output: "main".to_string(),
            library: "luau".to_string(),
            cmake_build_dir: PathBuf::from("build"),
        }
    }
}

/// How the `build` verb drives the toolchain
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Two-phase compile/archive/link with a cached static library
    #[default]
    Direct,
    /// Generate a CMakeLists.txt and let CMake drive Luau's own targets
    Cmake,
}

/// `[build]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub backend: Backend,
    /// Toolchain family; defaults to the host's native one
    pub toolchain: Option<ToolchainKind>,
    /// C++ compiler executable (falls back to `CXX`, then PATH search)
    pub compiler: Option<String>,
    /// Archiver executable (falls back to `AR`, then `ar`)
    pub archiver: Option<String>,
    pub std: String,
    pub opt_level: String,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,
    /// Parallel jobs forwarded to `cmake --build --parallel`
    pub jobs: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Direct,
            toolchain: None,
            compiler: None,
            archiver: None,
            std: "c++17".to_string(),
            opt_level: "2".to_string(),
            cxxflags: Vec::new(),
            ldflags: Vec::new(),
            jobs: None,
        }
    }
}

impl Config {
    /// Load `luaubuild.toml` from the working directory, or defaults if absent
    pub fn load(working_dir: &Path) -> Result<Self, LuauBuildError> {
        let path = working_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Load an explicit configuration file; it must exist
    pub fn load_from_path(path: &Path) -> Result<Self, LuauBuildError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LuauBuildError::io("read", path, e))?;
        Self::parse(&content).map_err(|e| match e {
            LuauBuildError::Config { message, source, hint } => LuauBuildError::Config {
                message: format!("{}: {}", path.display(), message),
                source,
                hint,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, LuauBuildError> {
        toml::from_str(content).map_err(|e| {
            LuauBuildError::config_error_with_hint(
                e.message().to_string(),
                Some(e.into()),
                hints::invalid_config(),
            )
        })
    }

    /// Toolchain family for this host unless the file pins one
    pub fn toolchain_kind(&self) -> ToolchainKind {
        self.build.toolchain.unwrap_or_else(ToolchainKind::host)
    }

    /// Resolve the layout against a working directory
    pub fn layout(&self, working_dir: &Path) -> Layout {
        Layout::new(working_dir, &self.layout, self.toolchain_kind())
    }
}

/// Absolute paths every verb works with
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub working_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub library: PathBuf,
    pub main_source: PathBuf,
    pub output_binary: PathBuf,
    pub cmake_build_dir: PathBuf,
}

impl Layout {
    pub fn new(working_dir: &Path, layout: &LayoutConfig, kind: ToolchainKind) -> Self {
        let staging_dir = working_dir.join(&layout.staging_dir);
        let library = staging_dir.join(kind.library_file_name(&layout.library));
        Self {
            working_dir: working_dir.to_path_buf(),
            library,
            staging_dir,
            main_source: working_dir.join(&layout.main_source),
            output_binary: working_dir.join(format!(
                "{}{}",
                layout.output,
                std::env::consts::EXE_SUFFIX
            )),
            cmake_build_dir: working_dir.join(&layout.cmake_build_dir),
        }
    }
}
