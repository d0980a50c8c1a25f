//! History Ledger - submitted commands plus up/down recall state.
//!
//! Entries are stored oldest first. Navigation counts from the newest entry:
//! cursor `Some(0)` is the most recent command, `None` means the user is not
//! browsing and the line holds their own draft.

#[derive(Debug, Clone)]
pub struct HistoryLedger {
    entries: Vec<String>,
    cursor: Option<usize>,
    draft: String,
    max_entries: usize,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_HISTORY)
    }
}

impl HistoryLedger {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            draft: String::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Append a submitted command unless it is empty or repeats the last entry.
    pub fn record(&mut self, command: &str) {
        self.reset_navigation();
        if command.is_empty() {
            return;
        }
        if self.entries.last().is_some_and(|last| last == command) {
            return;
        }
        self.entries.push(command.to_string());
        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    /// Step toward older entries. Returns the line to show, or `None` when
    /// there is nothing to recall and the caller should keep its draft.
    pub fn recall_older(&mut self, current_draft: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let next = match self.cursor {
            None => {
                self.draft = current_draft.to_string();
                0
            }
            Some(i) if i + 1 < self.entries.len() => i + 1,
            Some(i) => i,
        };
        self.cursor = Some(next);
        Some(self.entry_from_newest(next))
    }

    /// Step toward newer entries; past the newest the remembered draft comes
    /// back and browsing stops. `None` when not browsing.
    pub fn recall_newer(&mut self) -> Option<&str> {
        match self.cursor {
            None => None,
            Some(0) => {
                self.cursor = None;
                Some(self.draft.as_str())
            }
            Some(i) => {
                self.cursor = Some(i - 1);
                Some(self.entry_from_newest(i - 1))
            }
        }
    }

    /// Forget the browsing position and the remembered draft.
    pub fn reset_navigation(&mut self) {
        self.cursor = None;
        self.draft.clear();
    }

    pub fn is_browsing(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_from_newest(&self, offset: usize) -> &str {
        &self.entries[self.entries.len() - 1 - offset]
    }
}
