//! termspeed entry point
//!
//! Starts the full-screen terminal, or runs commands in line mode with `run`.

use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = termspeed_interface::run_cli().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
