//! luaubuild - fetch the Luau sources and build a program against them
//!
//! ## Architecture
//!
//! ```text
//! deps  → fetch.rs  → HTTP GET → zip → luau/
//! build → build/    → c++ + ar (or CMake) → ./main
//! clean → clean.rs  → rm luau/ main *.o
//! ```

mod build;
mod clean;
mod cli;
mod commands;
mod config;
mod error;
mod exec;
mod fetch;
mod utils;

use clap::Parser;

use cli::Cli;
use error::LuauBuildError;
use utils::terminal;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version report exit code 0; usage errors exit 1 like every other failure
            let code = if err.exit_code() == 0 { 0 } else { 1 };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    if let Err(err) = cli.execute() {
        terminal::print_error(&format!("{:#}", err));
        if let Some(e) = err.chain().find_map(|e| e.downcast_ref::<LuauBuildError>()) {
            e.display_with_hints();
        }
        std::process::exit(1);
    }
}
