//! termspeed Core - terminal state and the speed test session
//!
//! Contains:
//! - LineBuffer / HistoryLedger / OutputLog: what the terminal holds
//! - CommandInterpreter: line -> Action
//! - SpeedTestSession: phase sequencing and progress mapping
//! - TerminalSession: the controller that owns all of the above
//! - NetworkProbe: the seam runtime probes plug into

mod config;
mod controller;
mod error;
mod history;
mod interpreter;
mod line_buffer;
mod output;
mod probe;
pub mod report;
mod sink;
mod speedtest;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::*;
pub use controller::*;
pub use error::*;
pub use history::*;
pub use interpreter::*;
pub use line_buffer::*;
pub use output::*;
pub use probe::*;
pub use sink::*;
pub use speedtest::*;
