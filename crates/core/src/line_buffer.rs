//! Line Buffer - the editable input line and its caret.
//!
//! The caret is a character offset, never a byte offset, so multi-byte input
//! can be edited without splitting a code point. Every operation clamps the
//! caret into `[0, len]` instead of rejecting out-of-range requests.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
    caret: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text left of the caret.
    pub fn before_caret(&self) -> &str {
        &self.text[..self.byte_index(self.caret)]
    }

    /// Text from the caret to the end.
    pub fn after_caret(&self) -> &str {
        &self.text[self.byte_index(self.caret)..]
    }

    /// Insert `text` at the caret and move the caret past it.
    pub fn insert(&mut self, text: &str) {
        let at = self.byte_index(self.caret);
        self.text.insert_str(at, text);
        self.caret += text.chars().count();
    }

    pub fn insert_char(&mut self, ch: char) {
        let at = self.byte_index(self.caret);
        self.text.insert(at, ch);
        self.caret += 1;
    }

    /// Remove the character left of the caret. No-op at the start of the line.
    pub fn delete_backward(&mut self) {
        if self.caret == 0 {
            return;
        }
        let at = self.byte_index(self.caret - 1);
        self.text.remove(at);
        self.caret -= 1;
    }

    /// Remove the character under the caret. No-op at the end of the line.
    pub fn delete_forward(&mut self) {
        if self.caret >= self.len() {
            return;
        }
        let at = self.byte_index(self.caret);
        self.text.remove(at);
    }

    pub fn move_caret(&mut self, delta: isize) {
        let target = (self.caret as isize).saturating_add(delta).max(0) as usize;
        self.set_caret(target);
    }

    pub fn set_caret(&mut self, offset: usize) {
        self.caret = offset.min(self.len());
    }

    pub fn move_home(&mut self) {
        self.caret = 0;
    }

    pub fn move_end(&mut self) {
        self.caret = self.len();
    }

    /// Replace the whole line, e.g. with a recalled history entry.
    pub fn set_all(&mut self, text: &str, caret: usize) {
        self.text.clear();
        self.text.push_str(text);
        self.set_caret(caret);
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.caret = 0;
    }

    fn byte_index(&self, char_offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_offset)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}
