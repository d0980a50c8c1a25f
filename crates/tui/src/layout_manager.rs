//! Layout Manager - frame layout, scroll math, title and hint bars.

use ratatui::layout::Constraint;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use termspeed_core::{SessionPhase, completion_suggestions_for_input, report::APP_TITLE};

use super::TuiTheme;

pub const TUI_SCROLL_STEP: usize = 3;

#[derive(Debug, Clone)]
pub struct TuiSessionViewState {
    pub scroll_offset: usize,
    pub auto_follow: bool,
    pub body_height: usize,
    /// Wrapped rows in the body as of the last frame.
    pub content_rows: usize,
}

impl Default for TuiSessionViewState {
    fn default() -> Self {
        Self {
            scroll_offset: 0,
            auto_follow: true,
            body_height: 1,
            content_rows: 0,
        }
    }
}

/// Title, body, optional progress gauge, hint bar, input box.
pub fn tui_layout_constraints(show_progress: bool) -> Vec<Constraint> {
    let mut c = vec![Constraint::Length(1), Constraint::Min(5)];
    if show_progress {
        c.push(Constraint::Length(1));
    }
    c.push(Constraint::Length(1));
    c.push(Constraint::Length(3));
    c
}

pub fn calc_log_scroll_usize(log_count: usize, body_height: usize) -> usize {
    log_count.saturating_sub(body_height)
}

pub fn effective_log_scroll(log_count: usize, session_view: &TuiSessionViewState) -> usize {
    let max_scroll = calc_log_scroll_usize(log_count, session_view.body_height);
    if session_view.auto_follow {
        max_scroll
    } else {
        session_view.scroll_offset.min(max_scroll)
    }
}

pub fn phase_status_text(phase: Option<&SessionPhase>, active: bool) -> String {
    match phase {
        Some(phase) if active => phase.label().to_string(),
        Some(SessionPhase::Failed { phase, .. }) => format!("last test failed ({})", phase.label()),
        _ => "idle".to_string(),
    }
}

pub fn build_title_bar<'a>(
    phase: Option<&SessionPhase>,
    active: bool,
    theme: &TuiTheme,
) -> Line<'a> {
    let state_color = if active {
        theme.warning
    } else {
        theme.text_muted
    };
    Line::from(vec![
        Span::styled(
            format!(" {} ", APP_TITLE),
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  ", Style::default()),
        Span::styled(
            phase_status_text(phase, active),
            Style::default().fg(state_color),
        ),
    ])
}

pub fn progress_label(pct: f64) -> String {
    format!("{:.0}%", pct.clamp(0.0, 100.0))
}

/// Completion candidates while typing, key help otherwise.
pub fn build_status_hint_bar<'a>(input: &str, theme: &TuiTheme) -> Line<'a> {
    if !input.trim().is_empty() {
        let suggestions = completion_suggestions_for_input(input);
        if !suggestions.is_empty() && !suggestions.iter().any(|s| s == input.trim()) {
            let mut spans = vec![Span::styled(" Tab: ", Style::default().fg(theme.text_muted))];
            for (i, suggestion) in suggestions.into_iter().enumerate() {
                if i > 0 {
                    spans.push(Span::styled(" | ", Style::default().fg(theme.text_dim)));
                }
                spans.push(Span::styled(suggestion, Style::default().fg(theme.highlight)));
            }
            return Line::from(spans);
        }
    }
    Line::from(Span::styled(
        " Enter run  ↑/↓ history  Tab complete  PgUp/PgDn scroll  Esc quit",
        Style::default().fg(theme.text_muted),
    ))
}

pub fn build_input_line<'a>(prompt: &str, text: &str, theme: &TuiTheme) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            prompt.to_string(),
            Style::default()
                .fg(theme.prompt)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(text.to_string(), Style::default().fg(theme.text_strong)),
    ])
}

/// Column of the caret relative to the start of the input line.
pub fn caret_column(prompt: &str, text: &str, caret: usize) -> u16 {
    let before = text.chars().take(caret).count();
    (prompt.chars().count() + 1 + before).min(u16::MAX as usize) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::line_plain;

    #[test]
    fn test_layout_constraints_with_progress() {
        assert_eq!(tui_layout_constraints(false).len(), 4);
        assert_eq!(tui_layout_constraints(true).len(), 5);
    }

    #[test]
    fn test_effective_scroll_follows_tail() {
        let mut view = TuiSessionViewState {
            scroll_offset: 2,
            auto_follow: true,
            body_height: 10,
            ..Default::default()
        };
        assert_eq!(effective_log_scroll(25, &view), 15);
        view.auto_follow = false;
        assert_eq!(effective_log_scroll(25, &view), 2);
        view.scroll_offset = 99;
        assert_eq!(effective_log_scroll(25, &view), 15);
        assert_eq!(effective_log_scroll(3, &view), 0);
    }

    #[test]
    fn test_title_bar_shows_phase() {
        let theme = TuiTheme::default_retro();
        let running = build_title_bar(Some(&SessionPhase::MeasuringJitter), true, &theme);
        assert!(line_plain(&running).contains("measuring jitter"));
        let done = build_title_bar(Some(&SessionPhase::Complete), false, &theme);
        assert!(line_plain(&done).ends_with("idle"));
    }

    #[test]
    fn test_hint_bar_lists_completions() {
        let theme = TuiTheme::default_retro();
        let hint = line_plain(&build_status_hint_bar("h", &theme));
        assert!(hint.contains("help"));
        assert!(hint.contains("history"));
        let idle = line_plain(&build_status_hint_bar("", &theme));
        assert!(idle.contains("Esc quit"));
    }

    #[test]
    fn test_caret_column_counts_chars() {
        assert_eq!(caret_column("$", "héllo", 2), 4);
        assert_eq!(caret_column("root@x:~$", "", 0), 10);
    }

    #[test]
    fn test_progress_label() {
        assert_eq!(progress_label(42.4), "42%");
        assert_eq!(progress_label(150.0), "100%");
    }
}
