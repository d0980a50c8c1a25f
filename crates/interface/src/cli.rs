//! CLI - Command Line Interface
//!
//! Available Commands:
//! - termspeed            - Start the full-screen terminal (same as `tui`)
//! - termspeed tui        - Start the full-screen terminal
//! - termspeed run CMD... - Run terminal commands in line mode and exit

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use termspeed_core::{ProbeKind, TerminalSession, TermspeedConfig};
use termspeed_runtime::build_probe;

use crate::line_mode::{StdoutSink, run_commands};
use crate::logging::{LogTarget, init_tracing};

/// CLI Errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Probe initialization failed: {0}")]
    ProbeInitFailed(String),

    #[error("Terminal I/O error: {0}")]
    TerminalError(String),
}

/// CLI Configuration
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Config file; `./termspeed.yaml` is tried when absent
    pub config_path: Option<PathBuf>,

    /// Probe override from the command line
    pub probe: Option<ProbeChoice>,

    /// Verbose output
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum ProbeChoice {
    Http,
    Simulated,
}

impl From<ProbeChoice> for ProbeKind {
    fn from(choice: ProbeChoice) -> Self {
        match choice {
            ProbeChoice::Http => ProbeKind::Http,
            ProbeChoice::Simulated => ProbeKind::Simulated,
        }
    }
}

/// termspeed CLI
#[derive(Parser, Debug)]
#[command(name = "termspeed")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Config file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network probe to use
    #[arg(long, global = true, value_enum)]
    probe: Option<ProbeChoice>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Start the full-screen terminal
    Tui,

    /// Run terminal commands one after another and print their output
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Commands to run, e.g. `help` `"speedtest --download"`
    #[arg(required = true)]
    pub commands: Vec<String>,
}

/// Parse CLI arguments and execute commands
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    let config = CliConfig {
        config_path: cli.config,
        probe: cli.probe,
        verbose: cli.verbose,
    };

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => cmd_tui(&config).await,
        Commands::Run(args) => cmd_run(args, &config).await,
    }
}

/// Load the config file and apply command-line overrides.
pub fn load_config(config: &CliConfig) -> Result<TermspeedConfig, CliError> {
    let mut loaded = TermspeedConfig::load(config.config_path.as_deref())
        .map_err(|e| CliError::ConfigError(e.to_string()))?;
    if let Some(choice) = config.probe {
        loaded.probe.kind = choice.into();
    }
    Ok(loaded)
}

pub fn create_terminal_session(config: TermspeedConfig) -> Result<TerminalSession, CliError> {
    let probe =
        build_probe(&config.probe).map_err(|e| CliError::ProbeInitFailed(e.to_string()))?;
    Ok(TerminalSession::new(config, probe))
}

async fn cmd_tui(config: &CliConfig) -> Result<(), CliError> {
    let loaded = load_config(config)?;
    if config.verbose {
        init_tracing(LogTarget::File(loaded.log_file.clone()))
            .map_err(|e| CliError::TerminalError(e.to_string()))?;
    }
    info!("Starting TUI...");
    let mut session = create_terminal_session(loaded)?;
    termspeed_tui::run_terminal_tui(&mut session)
        .await
        .map_err(|e| CliError::TerminalError(e.to_string()))
}

async fn cmd_run(args: RunArgs, config: &CliConfig) -> Result<(), CliError> {
    if config.verbose {
        init_tracing(LogTarget::Stderr).map_err(|e| CliError::TerminalError(e.to_string()))?;
    }
    let loaded = load_config(config)?;
    info!("Running {} command(s) in line mode", args.commands.len());
    let mut session = create_terminal_session(loaded)?;
    let mut sink = StdoutSink::stdout();
    run_commands(&mut session, &args.commands, &mut sink)
        .await
        .map_err(|e| CliError::TerminalError(e.to_string()))
}

#[cfg(test)]
pub(crate) fn parse_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

#[cfg(test)]
impl Cli {
    pub(crate) fn command(&self) -> Option<&Commands> {
        self.command.as_ref()
    }

    pub(crate) fn probe(&self) -> Option<ProbeChoice> {
        self.probe
    }

    pub(crate) fn verbose(&self) -> bool {
        self.verbose
    }

    pub(crate) fn config(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }
}
