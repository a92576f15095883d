//! Command implementations
//!
//! Each command module provides a clap-derived struct and execute method.

pub mod build;
pub mod clean;
pub mod deps;

use std::path::PathBuf;

use crate::config::Config;

/// Settings every verb shares, resolved once from the global flags
#[derive(Debug, Clone)]
pub struct Context {
    pub working_dir: PathBuf,
    pub config: Config,
    pub verbose: bool,
}
