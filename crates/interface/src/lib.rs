//! termspeed Interface - entry points
//!
//! Responsibilities:
//! - CLI argument parsing and config loading
//! - Full-screen terminal (delegates to termspeed-tui)
//! - Line mode: run commands and print their output
//!
//! Layout:
//! - cli: command-line interface
//! - line_mode: stdout display sink
//! - logging: tracing subscriber setup

pub mod cli;
pub mod line_mode;
pub mod logging;


pub use cli::{CliConfig, CliError, run_cli};
pub use line_mode::{StdoutSink, run_commands};
