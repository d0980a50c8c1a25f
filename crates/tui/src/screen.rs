//! Screen state the frame is drawn from, filled through the display sink.

use termspeed_core::{DisplaySink, OutputRecord};

#[derive(Debug, Clone, Default)]
pub struct ScreenSink {
    records: Vec<OutputRecord>,
    progress: Option<f64>,
    input: String,
    caret: usize,
}

impl ScreenSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    pub fn progress(&self) -> Option<f64> {
        self.progress
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn caret(&self) -> usize {
        self.caret
    }
}

impl DisplaySink for ScreenSink {
    fn append_line(&mut self, record: &OutputRecord) {
        self.records.push(record.clone());
    }

    fn clear(&mut self) {
        self.records.clear();
    }

    fn set_progress(&mut self, pct: Option<f64>) {
        self.progress = pct;
    }

    fn render_input_line(&mut self, text: &str, caret: usize) {
        text.clone_into(&mut self.input);
        self.caret = caret;
    }
}
