//! Output Log - append-only record of everything the terminal printed.

use serde::{Deserialize, Serialize};

/// How a record's content is to be interpreted by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    /// Shown verbatim; never interpreted.
    PlainText,
    /// May contain `[[...]]` highlight spans.
    Markup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub kind: OutputKind,
    pub content: String,
}

impl OutputRecord {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            kind: OutputKind::PlainText,
            content: content.into(),
        }
    }

    pub fn markup(content: impl Into<String>) -> Self {
        Self {
            kind: OutputKind::Markup,
            content: content.into(),
        }
    }

    /// Split into `(text, highlighted)` segments. Plain records yield a single
    /// unhighlighted segment.
    pub fn segments(&self) -> Vec<(String, bool)> {
        match self.kind {
            OutputKind::PlainText => vec![(self.content.clone(), false)],
            OutputKind::Markup => split_markup(&self.content),
        }
    }

    /// Content with highlight markers and escapes removed.
    pub fn to_plain_string(&self) -> String {
        match self.kind {
            OutputKind::PlainText => self.content.clone(),
            OutputKind::Markup => split_markup(&self.content)
                .into_iter()
                .map(|(text, _)| text)
                .collect(),
        }
    }
}

pub const HIGHLIGHT_OPEN: &str = "[[";
pub const HIGHLIGHT_CLOSE: &str = "]]";
const ESCAPE: char = '\\';

/// Make arbitrary text safe to embed in markup: `\`, `[` and `]` are
/// backslash-escaped and come back out unchanged.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '[' | ']') {
            out.push(ESCAPE);
        }
        out.push(ch);
    }
    out
}

/// Wrap `text` in highlight markers. The text itself is escaped.
pub fn highlight(text: impl AsRef<str>) -> String {
    format!(
        "{}{}{}",
        HIGHLIGHT_OPEN,
        escape_markup(text.as_ref()),
        HIGHLIGHT_CLOSE
    )
}

fn split_markup(content: &str) -> Vec<(String, bool)> {
    let mut out: Vec<(String, bool)> = Vec::new();
    let mut current = String::new();
    let mut highlighted = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ESCAPE => current.push(chars.next().unwrap_or(ESCAPE)),
            '[' if !highlighted && chars.peek() == Some(&'[') => {
                chars.next();
                push_segment(&mut out, std::mem::take(&mut current), false);
                highlighted = true;
            }
            ']' if highlighted && chars.peek() == Some(&']') => {
                chars.next();
                push_segment(&mut out, std::mem::take(&mut current), true);
                highlighted = false;
            }
            _ => current.push(ch),
        }
    }
    if highlighted {
        // Unterminated span: keep the opener as literal text.
        current.insert_str(0, HIGHLIGHT_OPEN);
    }
    push_segment(&mut out, current, false);
    out
}

fn push_segment(out: &mut Vec<(String, bool)>, text: String, highlighted: bool) {
    if text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some((last, hl)) if *hl == highlighted => last.push_str(&text),
        _ => out.push((text, highlighted)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    records: Vec<OutputRecord>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: OutputRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = OutputRecord>) {
        self.records.extend(records);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut log = OutputLog::new();
        log.append(OutputRecord::plain("one"));
        log.extend([OutputRecord::plain("two"), OutputRecord::markup("three")]);
        let contents: Vec<_> = log.records().iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "three"]);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut log = OutputLog::new();
        log.append(OutputRecord::plain("x"));
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_markup_segments() {
        let record = OutputRecord::markup(format!("Latency: {} done", highlight("12 ms")));
        assert_eq!(
            segs(&record),
            vec![
                ("Latency: ".to_string(), false),
                ("12 ms".to_string(), true),
                (" done".to_string(), false)
            ]
        );
        assert_eq!(record.to_plain_string(), "Latency: 12 ms done");
    }

    fn segs(record: &OutputRecord) -> Vec<(String, bool)> {
        record.segments()
    }

    #[test]
    fn test_escaped_text_never_opens_a_span() {
        for raw in ["[[x]]", "[[[x]]]", "a]]b[[c", "\\[[x]]", "back\\slash", "]["] {
            let record = OutputRecord::markup(format!("$ {}", escape_markup(raw)));
            assert_eq!(segs(&record), vec![(format!("$ {}", raw), false)], "{raw}");
        }
    }

    #[test]
    fn test_highlight_keeps_brackets_literal() {
        let record = OutputRecord::markup(format!("{} tail", highlight("[[root]]")));
        assert_eq!(
            segs(&record),
            vec![("[[root]]".to_string(), true), (" tail".to_string(), false)]
        );
    }

    #[test]
    fn test_plain_text_is_not_interpreted() {
        let record = OutputRecord::plain("[[not markup]]");
        assert_eq!(segs(&record), vec![("[[not markup]]".to_string(), false)]);
        assert_eq!(record.to_plain_string(), "[[not markup]]");
    }

    #[test]
    fn test_unterminated_marker_kept_literal() {
        let record = OutputRecord::markup("a [[b");
        assert_eq!(record.to_plain_string(), "a [[b");
    }
}
