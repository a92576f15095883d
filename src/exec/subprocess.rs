//! Subprocess execution for the external toolchain
//!
//! Every compiler, archiver and CMake call goes through a [`CommandRunner`],
//! so the build logic can be exercised without spawning real processes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::utils::terminal;

/// A fully-specified external command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program file name without directories, e.g. `g++`
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of a subprocess execution
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,

    /// Process exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Execution duration
    pub duration: Duration,
}

impl CommandResult {
    /// Create a CommandResult from an exit status
    pub fn from_status(status: ExitStatus, stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            success: status.success(),
            exit_code: status.code(),
            stdout,
            stderr,
            duration,
        }
    }
}

/// Runs invocations on behalf of the builders
pub trait CommandRunner {
    /// Run `invocation` with `cwd` as its working directory.
    ///
    /// Returns `Err` only when the process could not be started; a non-zero
    /// exit is reported through [`CommandResult::success`].
    fn run(&self, invocation: &Invocation, cwd: &Path) -> std::io::Result<CommandResult>;
}

/// Spawns real processes
///
/// Children stay in our process group, so a terminal Ctrl-C reaches the
/// running compiler as well.
#[derive(Debug, Default)]
pub struct SystemRunner {
    verbose: bool,
}

impl SystemRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, cwd: &Path) -> std::io::Result<CommandResult> {
        if self.verbose {
            terminal::print_command(&invocation.to_string());
        }

        let start = Instant::now();
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(cwd)
            .stdin(Stdio::null());

        let output = cmd.output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if self.verbose && !stdout.trim().is_empty() {
            println!("{}", stdout.trim_end());
        }

        Ok(CommandResult::from_status(
            output.status,
            stdout,
            stderr,
            start.elapsed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("g++")
            .arg("-c")
            .args(["-I", "dir with space"]);
        assert_eq!(inv.to_string(), "g++ -c -I \"dir with space\"");
        assert_eq!(inv.program_name(), "g++");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sh").args(["-c", "echo oops >&2; exit 3"]);

        let result = SystemRunner::new(false).run(&inv, temp_dir.path()).unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_uses_cwd() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sh").args(["-c", "touch marker"]);

        let result = SystemRunner::new(false).run(&inv, temp_dir.path()).unwrap();
        assert!(result.success);
        assert!(temp_dir.path().join("marker").exists());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("luaubuild-definitely-not-a-program");
        assert!(SystemRunner::new(false).run(&inv, temp_dir.path()).is_err());
    }
}
