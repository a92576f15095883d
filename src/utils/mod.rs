//! Utility modules

pub mod paths;
pub mod terminal;
