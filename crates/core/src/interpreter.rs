//! Command Interpreter - turns a submitted line into an [`Action`].
//!
//! The interpreter never fails on user input: unknown commands come back as
//! [`Action::Unrecognized`]. The only error is trying to start a second
//! speed test while one is running.

use tracing::debug;

use crate::error::TerminalError;
use crate::output::OutputRecord;
use crate::report;
use crate::speedtest::SpeedTestOptions;

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub command: &'static str,
    pub summary: &'static str,
}

pub const COMMAND_SPECS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        summary: "show help",
    },
    CommandSpec {
        command: "clear",
        summary: "clear the terminal",
    },
    CommandSpec {
        command: "cls",
        summary: "alias of clear",
    },
    CommandSpec {
        command: "speedtest",
        summary: "run a speed test",
    },
    CommandSpec {
        command: "about",
        summary: "about this app",
    },
    CommandSpec {
        command: "history",
        summary: "show command history",
    },
];

pub const SPEEDTEST_FLAGS: &[&str] = &["--download", "--upload", "--full"];

/// Kinds of long-running session a command can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    SpeedTest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Records to append right away.
    Immediate(Vec<OutputRecord>),
    /// Wipe the output log.
    Clear,
    StartSession(SessionKind, SpeedTestOptions),
    Unrecognized(String),
    /// Blank line; nothing to run.
    Empty,
}

/// Read-only view of controller state the handlers need.
#[derive(Debug, Clone, Copy)]
pub struct InterpreterContext<'a> {
    pub history: &'a [String],
    pub session_active: bool,
}

pub fn canonical_command(command: &str) -> &str {
    match command {
        "clear" | "cls" => "clear",
        _ => command,
    }
}

/// Split a line into a lowercase command name and verbatim arguments.
pub fn parse_command_line(line: &str) -> Option<(String, Vec<String>)> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next()?.to_lowercase();
    let args = tokens.map(str::to_string).collect();
    Some((name, args))
}

#[derive(Debug, Clone, Default)]
pub struct CommandInterpreter;

impl CommandInterpreter {
    pub fn new() -> Self {
        Self
    }

    pub fn interpret(
        &self,
        raw_line: &str,
        ctx: InterpreterContext<'_>,
    ) -> Result<Action, TerminalError> {
        let Some((name, args)) = parse_command_line(raw_line) else {
            return Ok(Action::Empty);
        };
        debug!(command = %name, args = args.len(), "interpret");

        let action = match canonical_command(&name) {
            "help" => Action::Immediate(vec![report::help_record()]),
            "clear" => Action::Clear,
            "about" => Action::Immediate(vec![report::about_record()]),
            "history" => Action::Immediate(vec![report::history_record(ctx.history)]),
            "speedtest" => {
                if ctx.session_active {
                    return Err(TerminalError::SessionAlreadyRunning);
                }
                Action::StartSession(SessionKind::SpeedTest, SpeedTestOptions::from_args(&args))
            }
            _ => Action::Unrecognized(name),
        };
        Ok(action)
    }
}

// ===== Tab completion =====

#[derive(Debug, Clone)]
pub struct CompletionState {
    pub suggestions: Vec<String>,
    pub selected_index: usize,
}

pub fn matching_commands(prefix: &str) -> Vec<CommandSpec> {
    let normalized = prefix.trim().to_lowercase();
    COMMAND_SPECS
        .iter()
        .copied()
        .filter(|spec| spec.command.starts_with(normalized.as_str()))
        .collect()
}

pub fn completion_suggestions_for_input(input: &str) -> Vec<String> {
    let trailing_space = input.ends_with(' ');
    let Some((name, args)) = parse_command_line(input) else {
        return COMMAND_SPECS
            .iter()
            .map(|spec| spec.command.to_string())
            .collect();
    };
    if args.is_empty() && !trailing_space {
        return matching_commands(&name)
            .into_iter()
            .map(|spec| spec.command.to_string())
            .collect();
    }
    if name != "speedtest" || args.len() > 1 || (args.len() == 1 && trailing_space) {
        return Vec::new();
    }
    let flag_prefix = args.first().map(|a| a.to_lowercase()).unwrap_or_default();
    SPEEDTEST_FLAGS
        .iter()
        .filter(|flag| flag.starts_with(flag_prefix.as_str()))
        .map(|flag| format!("{} {}", name, flag))
        .collect()
}

/// Replace `input` with the next completion. Repeated calls cycle through
/// the suggestions; `reverse` cycles backwards.
pub fn apply_completion(
    input: &mut String,
    completion: &mut Option<CompletionState>,
    reverse: bool,
) -> bool {
    if let Some(state) = completion.as_mut()
        && !state.suggestions.is_empty()
        && state.selected_index < state.suggestions.len()
        && input.trim() == state.suggestions[state.selected_index]
    {
        let len = state.suggestions.len();
        state.selected_index = if reverse {
            (state.selected_index + len - 1) % len
        } else {
            (state.selected_index + 1) % len
        };
        *input = state.suggestions[state.selected_index].clone();
        return true;
    }

    let suggestions = completion_suggestions_for_input(input);
    if suggestions.is_empty() {
        *completion = None;
        return false;
    }
    let selected_index = if reverse { suggestions.len() - 1 } else { 0 };
    *input = suggestions[selected_index].clone();
    *completion = Some(CompletionState {
        suggestions,
        selected_index,
    });
    true
}
