//! Terminal Session Controller - the single owner of terminal state.
//!
//! Key events mutate the line buffer and history; Enter runs the line through
//! the interpreter and appends the outcome to the output log. A speed test
//! runs as a tokio task and reports back over an unbounded channel, which the
//! controller drains with [`TerminalSession::pump`] or
//! [`TerminalSession::wait_for_session`]. Nothing else writes to the log.

use tokio::sync::mpsc::{self, UnboundedReceiver, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::TermspeedConfig;
use crate::error::TerminalError;
use crate::history::HistoryLedger;
use crate::interpreter::{
    Action, CommandInterpreter, CompletionState, InterpreterContext, SessionKind,
    apply_completion,
};
use crate::line_buffer::LineBuffer;
use crate::output::{OutputLog, OutputRecord};
use crate::probe::DynNetworkProbe;
use crate::report;
use crate::sink::{DisplaySink, Snapshot};
use crate::speedtest::{
    COMPLETE_PCT, SessionEvent, SessionPhase, SpeedTestOptions, SpeedTestResult,
    SpeedTestSession,
};

/// Keys the controller understands. Renderers translate their own events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Up,
    Down,
    Enter,
    Tab,
    BackTab,
}

struct ActiveSession {
    events: UnboundedReceiver<SessionEvent>,
    handle: JoinHandle<SpeedTestResult>,
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct TerminalSession {
    config: TermspeedConfig,
    probe: DynNetworkProbe,
    interpreter: CommandInterpreter,
    buffer: LineBuffer,
    history: HistoryLedger,
    log: OutputLog,
    completion: Option<CompletionState>,
    active: Option<ActiveSession>,
    progress: Option<f64>,
    phase: Option<SessionPhase>,
    last_result: Option<SpeedTestResult>,
    /// Records already handed to the sink.
    painted: usize,
    /// Progress changes since the last paint, each tagged with the log
    /// length at the time, so paint can replay them between records.
    progress_marks: Vec<(usize, Option<f64>)>,
    repaint: bool,
}

impl TerminalSession {
    /// New session with the welcome banner already in the log.
    pub fn new(config: TermspeedConfig, probe: DynNetworkProbe) -> Self {
        let mut log = OutputLog::new();
        log.extend(report::welcome_records(&config.repl.banner));
        Self {
            history: HistoryLedger::new(config.repl.max_history),
            config,
            probe,
            interpreter: CommandInterpreter::new(),
            buffer: LineBuffer::new(),
            log,
            completion: None,
            active: None,
            progress: None,
            phase: None,
            last_result: None,
            painted: 0,
            progress_marks: Vec::new(),
            repaint: false,
        }
    }

    pub fn config(&self) -> &TermspeedConfig {
        &self.config
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn log(&self) -> &OutputLog {
        &self.log
    }

    pub fn is_session_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn progress(&self) -> Option<f64> {
        self.progress
    }

    pub fn phase(&self) -> Option<&SessionPhase> {
        self.phase.as_ref()
    }

    pub fn last_result(&self) -> Option<&SpeedTestResult> {
        self.last_result.as_ref()
    }

    pub fn handle_key(&mut self, key: KeyInput) {
        if !matches!(key, KeyInput::Tab | KeyInput::BackTab) {
            self.completion = None;
        }
        match key {
            KeyInput::Char(ch) => {
                // Typing always leaves history browsing.
                self.history.reset_navigation();
                self.buffer.insert_char(ch);
            }
            KeyInput::Backspace => self.buffer.delete_backward(),
            KeyInput::Delete => self.buffer.delete_forward(),
            KeyInput::Left => self.buffer.move_caret(-1),
            KeyInput::Right => self.buffer.move_caret(1),
            KeyInput::Home => self.buffer.move_home(),
            KeyInput::End => self.buffer.move_end(),
            KeyInput::Up => {
                if let Some(line) = self.history.recall_older(self.buffer.text()) {
                    let caret = line.chars().count();
                    self.buffer.set_all(line, caret);
                }
            }
            KeyInput::Down => {
                if let Some(line) = self.history.recall_newer() {
                    let caret = line.chars().count();
                    self.buffer.set_all(line, caret);
                }
            }
            KeyInput::Enter => self.submit(),
            KeyInput::Tab | KeyInput::BackTab => {
                let mut text = self.buffer.text().to_string();
                let reverse = key == KeyInput::BackTab;
                if apply_completion(&mut text, &mut self.completion, reverse) {
                    let caret = text.chars().count();
                    self.buffer.set_all(&text, caret);
                }
            }
        }
    }

    /// Replace the line with `text` and submit it.
    pub fn submit_line(&mut self, text: &str) {
        self.buffer.set_all(text, text.chars().count());
        self.submit();
    }

    /// Submit the current line.
    pub fn submit(&mut self) {
        let line = self.buffer.text().trim().to_string();
        self.buffer.clear();
        self.completion = None;

        self.log
            .append(report::prompt_echo(&self.config.repl.prompt, &line));
        // A rejected command must leave history as it was.
        let saved_history = self.active.is_some().then(|| self.history.clone());
        self.history.record(&line);

        let ctx = InterpreterContext {
            history: self.history.entries(),
            session_active: self.active.is_some(),
        };
        let outcome = self.interpreter.interpret(&line, ctx);
        if let (Err(TerminalError::SessionAlreadyRunning), Some(saved)) =
            (&outcome, saved_history)
        {
            self.history = saved;
            self.history.reset_navigation();
        }
        match outcome {
            Ok(Action::Immediate(records)) => self.log.extend(records),
            Ok(Action::Clear) => self.clear_output(),
            Ok(Action::StartSession(kind, options)) => self.start_session(kind, options),
            Ok(Action::Unrecognized(name)) => {
                debug!(command = %name, "unrecognized command");
                self.log.append(report::command_not_found(&name));
            }
            Ok(Action::Empty) => {}
            Err(e) => {
                warn!(error = %e, "command rejected");
                self.log.append(OutputRecord::plain(e.to_string()));
            }
        }
    }

    fn clear_output(&mut self) {
        self.log.clear();
        self.painted = 0;
        self.repaint = true;
        for mark in &mut self.progress_marks {
            mark.0 = 0;
        }
    }

    fn set_progress(&mut self, progress: Option<f64>) {
        self.progress = progress;
        let at = self.log.len();
        // Unpainted intermediate steps at the same spot collapse into one.
        if let Some(last) = self.progress_marks.last_mut()
            && last.0 == at
            && matches!(last.1, Some(pct) if pct < COMPLETE_PCT)
            && progress.is_some()
        {
            last.1 = progress;
            return;
        }
        self.progress_marks.push((at, progress));
    }

    fn start_session(&mut self, kind: SessionKind, options: SpeedTestOptions) {
        match kind {
            SessionKind::SpeedTest => {
                let (tx, rx) = mpsc::unbounded_channel();
                let session = SpeedTestSession::new(
                    self.probe.clone(),
                    options,
                    self.config.speedtest.clone(),
                    tx,
                );
                info!(probe = self.probe.name(), "spawning speed test");
                let handle = tokio::spawn(session.run());
                self.active = Some(ActiveSession { events: rx, handle });
                self.set_progress(Some(0.0));
                self.phase = Some(SessionPhase::Init);
            }
        }
    }

    /// Apply every session event that is already waiting. Never blocks.
    /// Returns whether anything changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        loop {
            let next = match self.active.as_mut() {
                Some(active) => active.events.try_recv(),
                None => break,
            };
            match next {
                Ok(event) => {
                    self.apply_event(event);
                    changed = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.session_lost();
                    changed = true;
                }
            }
        }
        changed
    }

    /// Apply session events until the running session finishes. Returns at
    /// once when nothing is running.
    pub async fn wait_for_session(&mut self) {
        loop {
            let next = match self.active.as_mut() {
                Some(active) => active.events.recv().await,
                None => break,
            };
            match next {
                Some(event) => self.apply_event(event),
                None => self.session_lost(),
            }
        }
    }

    fn apply_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Phase(phase) => self.phase = Some(phase),
            SessionEvent::Output(record) => self.log.append(record),
            SessionEvent::Progress(pct) => self.set_progress(Some(pct)),
            SessionEvent::Finished(result) => {
                self.log.extend(report::result_records(&result));
                self.last_result = Some(*result);
                self.active = None;
                self.set_progress(None);
            }
        }
    }

    /// The channel closed without a result; the task died.
    fn session_lost(&mut self) {
        if self.active.take().is_some() {
            warn!("speed test task ended without a result");
            self.log
                .append(OutputRecord::plain("Speed test aborted unexpectedly."));
        }
        if self.progress.is_some() {
            self.set_progress(None);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            buffer_text: self.buffer.text().to_string(),
            caret: self.buffer.caret(),
            records: self.log.records().to_vec(),
            progress: self.progress,
            phase: self.phase.clone(),
        }
    }

    /// Bring `sink` up to date: a `clear` is replayed as a sink clear, then
    /// new records and progress changes arrive in the order they happened,
    /// then the input line is set.
    ///
    /// Every progress value goes through, so the final 100 reaches the sink
    /// before the result table and before the indicator is hidden.
    pub fn paint(&mut self, sink: &mut dyn DisplaySink) {
        if self.repaint {
            sink.clear();
            self.repaint = false;
        }
        let records = self.log.records();
        for (at, progress) in self.progress_marks.drain(..) {
            let at = at.clamp(self.painted, records.len());
            for record in &records[self.painted..at] {
                sink.append_line(record);
            }
            self.painted = at;
            sink.set_progress(progress);
        }
        for record in &records[self.painted..] {
            sink.append_line(record);
        }
        self.painted = records.len();
        sink.render_input_line(self.buffer.text(), self.buffer.caret());
    }
}
