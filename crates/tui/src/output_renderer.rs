//! Output Renderer - theme and styling of output records.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

use termspeed_core::OutputRecord;

#[derive(Debug, Clone, Copy)]
pub struct TuiTheme {
    pub text_strong: Color,
    pub text_base: Color,
    pub text_muted: Color,
    pub text_dim: Color,
    pub primary: Color,
    pub highlight: Color,
    pub success: Color,
    pub warning: Color,
    pub danger: Color,
    pub prompt: Color,
    pub border_normal: Color,
    pub border_active: Color,
    pub progress_active: Color,
    pub progress_pending: Color,
    pub title_bg: Color,
    pub hint_bg: Color,
}

impl TuiTheme {
    /// Green-on-black, like an old CRT.
    pub fn default_retro() -> Self {
        Self {
            text_strong: Color::White,
            text_base: Color::Rgb(0, 200, 0),
            text_muted: Color::DarkGray,
            text_dim: Color::Rgb(100, 100, 100),
            primary: Color::Green,
            highlight: Color::Rgb(170, 255, 0),
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            prompt: Color::Rgb(170, 255, 0),
            border_normal: Color::DarkGray,
            border_active: Color::Green,
            progress_active: Color::Rgb(170, 255, 0),
            progress_pending: Color::Rgb(30, 60, 30),
            title_bg: Color::Rgb(20, 30, 20),
            hint_bg: Color::Rgb(15, 20, 15),
        }
    }
}

/// Break lines into rows no wider than `width` columns, splitting at any
/// character. The body is drawn from these rows, so scrolling counts exactly
/// what is on screen.
pub fn wrap_lines(lines: Vec<Line<'static>>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows = Vec::with_capacity(lines.len());
    for line in lines {
        if line.width() <= width {
            rows.push(line);
            continue;
        }
        let mut row: Vec<Span<'static>> = Vec::new();
        let mut used = 0;
        for span in line.spans {
            let mut chunk = String::new();
            for ch in span.content.chars() {
                let w = ch.width().unwrap_or(0);
                if used + w > width && used > 0 {
                    if !chunk.is_empty() {
                        row.push(Span::styled(std::mem::take(&mut chunk), span.style));
                    }
                    rows.push(Line::from(std::mem::take(&mut row)));
                    used = 0;
                }
                chunk.push(ch);
                used += w;
            }
            if !chunk.is_empty() {
                row.push(Span::styled(chunk, span.style));
            }
        }
        rows.push(Line::from(row));
    }
    rows
}

/// Style one record. Highlight spans may cross line breaks.
pub fn style_record(record: &OutputRecord, theme: &TuiTheme) -> Vec<Line<'static>> {
    let base = Style::default().fg(theme.text_base);
    let highlighted = Style::default()
        .fg(theme.highlight)
        .add_modifier(Modifier::BOLD);

    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    for (text, is_highlight) in record.segments() {
        let style = if is_highlight { highlighted } else { base };
        let mut parts = text.split('\n');
        if let Some(first) = parts.next()
            && !first.is_empty()
        {
            spans.push(Span::styled(first.to_string(), style));
        }
        for part in parts {
            lines.push(Line::from(std::mem::take(&mut spans)));
            if !part.is_empty() {
                spans.push(Span::styled(part.to_string(), style));
            }
        }
    }
    lines.push(Line::from(spans));
    lines
}

pub fn style_records(records: &[OutputRecord], theme: &TuiTheme) -> Vec<Line<'static>> {
    records
        .iter()
        .flat_map(|record| style_record(record, theme))
        .collect()
}
