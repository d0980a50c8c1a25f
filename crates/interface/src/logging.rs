//! Tracing setup
//!
//! Line mode logs to stderr. The full-screen terminal owns stdout and the
//! alternate screen, so its logs go to a file instead.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Level;

#[derive(Debug, Clone, PartialEq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing(target: LogTarget) -> io::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_target(false);

    let installed = match target {
        LogTarget::Stderr => builder.with_writer(io::stderr).try_init(),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };
    // Already installed by an earlier call (tests, embedding).
    let _ = installed;
    Ok(())
}
