//! Error types and helpers for user-friendly error messages
//!
//! Every verb reports failures through [`LuauBuildError`]. Variants carry the
//! context a user needs to act on them (the URL, the path, the failing
//! command line) and an optional hint printed under the message.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Custom error types with helpful context and suggestions
#[derive(Error, Debug)]
pub enum LuauBuildError {
    /// Request or transport failure while downloading the source archive
    #[error("Network error fetching {url}: {message}")]
    Network {
        url: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Malformed, unreadable or unexpected zip archive
    #[error("Archive error in {}: {message}", path.display())]
    Archive {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Filesystem create/write/remove failure
    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required input file is absent
    #[error("Missing source file: {}", path.display())]
    MissingSource { path: PathBuf, hint: String },

    /// An invoked compiler, archiver or CMake step failed
    #[error("{step} failed ({}): {command}", ExitCode(*exit_code))]
    Toolchain {
        step: String,
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Compiler, archiver or CMake not found
    #[error("Missing tool: {tool}")]
    MissingTool {
        tool: String,
        required_for: String,
        hint: String,
    },

    /// Invalid luaubuild.toml
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        hint: Option<String>,
    },
}

/// Renders an optional process exit code
struct ExitCode(Option<i32>);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "could not start or killed by signal"),
        }
    }
}

impl LuauBuildError {
    /// Create a network error
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error wrapping the underlying failure
    pub fn network_with_source(
        url: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an archive error
    pub fn archive(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an archive error wrapping the zip reader failure
    pub fn archive_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a filesystem error
    pub fn io(action: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action: action.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a missing source error
    pub fn missing_source(path: impl Into<PathBuf>, hint: impl Into<String>) -> Self {
        Self::MissingSource {
            path: path.into(),
            hint: hint.into(),
        }
    }

    /// Create a toolchain error from a failed subprocess
    pub fn toolchain(
        step: impl Into<String>,
        command: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Toolchain {
            step: step.into(),
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create a missing tool error
    pub fn missing_tool(
        tool: impl Into<String>,
        required_for: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::MissingTool {
            tool: tool.into(),
            required_for: required_for.into(),
            hint: hint.into(),
        }
    }

    /// Create a configuration error with source and hint
    pub fn config_error_with_hint(
        message: impl Into<String>,
        source: Option<anyhow::Error>,
        hint: impl Into<String>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source,
            hint: Some(hint.into()),
        }
    }

    /// Hint shown under the error message, if any
    pub fn hint(&self) -> Option<&str> {
        match self {
            LuauBuildError::Network { .. } => Some(hints::network()),
            LuauBuildError::Archive { .. } => Some(hints::archive()),
            LuauBuildError::Io { .. } => None,
            LuauBuildError::MissingSource { hint, .. } | LuauBuildError::MissingTool { hint, .. } => {
                Some(hint)
            }
            LuauBuildError::Toolchain { .. } => Some(hints::toolchain()),
            LuauBuildError::Config { hint, .. } => hint.as_deref(),
        }
    }

    /// Display error with formatting and hints
    ///
    /// Diagnostics go to standard output so they interleave with the
    /// progress lines the verbs print.
    pub fn display_with_hints(&self) {
        use console::style;

        if let LuauBuildError::MissingTool { required_for, .. } = self {
            println!("  (required for {})", required_for);
        }

        if let LuauBuildError::Toolchain { stderr, .. } = self {
            let stderr = stderr.trim();
            if !stderr.is_empty() {
                println!("\n{}", style("TOOLCHAIN OUTPUT:").cyan().bold());
                for line in stderr.lines() {
                    println!("  {}", line);
                }
            }
        }

        if let Some(h) = self.hint() {
            println!("\n{} {}", style("HINT:").yellow().bold(), h);
        }

        println!();
    }
}

/// Common error hints
pub mod hints {
    /// Hint for download failures
    pub fn network() -> &'static str {
        "Check your network connection and the archive URL, then re-run:\n\
         • luaubuild deps\n\
         • Override the URL with --url or LUAUBUILD_URL (file:// paths work offline)"
    }

    /// Hint for malformed archives
    pub fn archive() -> &'static str {
        "The downloaded file is not the expected zip archive.\n\
         Run `luaubuild clean` and then `luaubuild deps` to start over."
    }

    /// Hint for failed compiler/archiver invocations
    pub fn toolchain() -> &'static str {
        "The external toolchain reported an error. Common causes:\n\
         • The staged Luau tree is incomplete: run `luaubuild clean && luaubuild deps`\n\
         • The upstream layout changed and a module path no longer matches\n\
         • Stray object files from an interrupted build: run `luaubuild clean`"
    }

    /// Hint for a missing main source file
    pub fn main_source(name: &str) -> String {
        format!(
            "Create {} in the working directory, or point [layout] main_source in luaubuild.toml at your entry file.",
            name
        )
    }

    /// Hint for a missing C++ compiler
    pub fn cxx_compiler() -> &'static str {
        "Install a C++ compiler or set CXX:\n\
         • macOS: xcode-select --install\n\
         • Ubuntu: sudo apt install g++\n\
         • Windows: install Visual Studio with 'Desktop development with C++'"
    }

    /// Hint for a missing archiver
    pub fn archiver() -> &'static str {
        "Install binutils (provides `ar`) or set AR:\n\
         • Ubuntu: sudo apt install binutils\n\
         • macOS: xcode-select --install"
    }

    /// Get hint for missing CMake
    pub fn cmake() -> &'static str {
        "Install CMake from https://cmake.org/ or use your package manager:\n\
         • macOS: brew install cmake\n\
         • Ubuntu: sudo apt install cmake\n\
         • Windows: winget install Kitware.CMake"
    }

    /// Hint for an invalid luaubuild.toml
    pub fn invalid_config() -> &'static str {
        "luaubuild.toml is invalid. Common issues:\n\
         • Unknown key or section (allowed: [source], [layout], [build])\n\
         • Invalid TOML syntax (check quotes, brackets, commas)\n\
         • backend must be \"direct\" or \"cmake\", toolchain \"gnu\" or \"msvc\""
    }
}
