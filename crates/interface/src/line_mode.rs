//! Line mode - run commands without the full-screen terminal
//!
//! Output records are printed as plain text, highlights stripped. Progress is
//! shown as a bar line every time it crosses another tenth.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use tracing::debug;

use termspeed_core::{DisplaySink, OutputRecord, TerminalSession};

const PUMP_INTERVAL: Duration = Duration::from_millis(50);
const PROGRESS_WIDTH: usize = 20;

/// DisplaySink over any writer.
pub struct StdoutSink<W: Write> {
    out: W,
    ansi: bool,
    last_decile: Option<u8>,
    error: Option<io::Error>,
}

impl StdoutSink<io::Stdout> {
    pub fn stdout() -> Self {
        let out = io::stdout();
        let ansi = out.is_terminal();
        Self::new(out, ansi)
    }
}

impl<W: Write> StdoutSink<W> {
    /// `ansi` enables the clear-screen escape; otherwise clear prints nothing.
    pub fn new(out: W, ansi: bool) -> Self {
        Self {
            out,
            ansi,
            last_decile: None,
            error: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// First write error seen, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn write(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            self.error = Some(e);
        }
    }
}

/// `percent` is on the session's 0-100 scale.
pub fn progress_bar_line(percent: f64) -> String {
    let percent = percent.clamp(0.0, 100.0);
    let filled = (percent / 100.0 * PROGRESS_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled),
        percent.round() as u32
    )
}

impl<W: Write> DisplaySink for StdoutSink<W> {
    fn append_line(&mut self, record: &OutputRecord) {
        let line = format!("{}\n", record.to_plain_string());
        self.write(&line);
    }

    fn clear(&mut self) {
        self.last_decile = None;
        if self.ansi {
            self.write("\x1b[2J\x1b[H");
        }
    }

    fn set_progress(&mut self, progress: Option<f64>) {
        let Some(percent) = progress else {
            self.last_decile = None;
            return;
        };
        let decile = (percent.clamp(0.0, 100.0) / 10.0).floor() as u8;
        if self.last_decile.is_some_and(|last| last >= decile) {
            return;
        }
        self.last_decile = Some(decile);
        let line = format!("{}\n", progress_bar_line(percent));
        self.write(&line);
    }

    fn render_input_line(&mut self, _text: &str, _caret: usize) {}
}

/// Submit each command in turn. A started speed test is pumped to completion
/// before the next command runs.
pub async fn run_commands<W: Write>(
    session: &mut TerminalSession,
    commands: &[String],
    sink: &mut StdoutSink<W>,
) -> io::Result<()> {
    session.paint(sink);
    for command in commands {
        debug!(command = %command, "line mode submit");
        session.submit_line(command);
        session.paint(sink);
        while session.is_session_active() {
            tokio::time::sleep(PUMP_INTERVAL).await;
            session.pump();
            session.paint(sink);
        }
        if let Some(e) = sink.take_error() {
            return Err(e);
        }
    }
    Ok(())
}
