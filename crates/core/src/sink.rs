//! Display Sink - what a renderer has to offer the controller.

use crate::output::OutputRecord;
use crate::speedtest::SessionPhase;

/// Receives paint calls from [`crate::TerminalSession::paint`].
///
/// Implementations hold no terminal state of their own beyond what they were
/// told; everything needed to draw a frame arrives through these calls.
pub trait DisplaySink {
    fn append_line(&mut self, record: &OutputRecord);

    fn clear(&mut self);

    /// `None` hides the progress indicator.
    fn set_progress(&mut self, pct: Option<f64>);

    /// `caret` is a char offset into `text`.
    fn render_input_line(&mut self, text: &str, caret: usize);
}

/// Read-only view of everything on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub buffer_text: String,
    pub caret: usize,
    pub records: Vec<OutputRecord>,
    pub progress: Option<f64>,
    pub phase: Option<SessionPhase>,
}

/// Sink that keeps what it was told. Handy for tests and for renderers that
/// redraw whole frames.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub lines: Vec<OutputRecord>,
    pub progress: Option<f64>,
    pub input: String,
    pub caret: usize,
    pub clears: usize,
}

impl DisplaySink for RecordingSink {
    fn append_line(&mut self, record: &OutputRecord) {
        self.lines.push(record.clone());
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.lines.clear();
    }

    fn set_progress(&mut self, pct: Option<f64>) {
        self.progress = pct;
    }

    fn render_input_line(&mut self, text: &str, caret: usize) {
        self.input = text.to_string();
        self.caret = caret;
    }
}
