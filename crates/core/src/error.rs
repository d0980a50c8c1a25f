//! Error types shared across the workspace.

use thiserror::Error;

/// A single measurement could not complete. Never fatal to a session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("not supported by this probe")]
    Unsupported,

    #[error("{0}")]
    Other(String),
}

/// Errors the interpreter hands back to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminalError {
    #[error("A speed test is already running. Wait for it to finish.")]
    SessionAlreadyRunning,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
