//! TUI application loop - the main ratatui event loop for the terminal session.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Span, Text};
use ratatui::widgets::{
    Block, Borders, Gauge, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
};
use ratatui::{Frame, Terminal};
use tracing::{debug, info};

use termspeed_core::{KeyInput, SessionPhase, TerminalSession};

use super::*;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Everything one frame needs besides the screen.
struct FrameContext<'a> {
    prompt: &'a str,
    phase: Option<&'a SessionPhase>,
    active: bool,
}

fn draw_frame(
    f: &mut Frame<'_>,
    screen: &ScreenSink,
    ctx: &FrameContext<'_>,
    session_view: &mut TuiSessionViewState,
    theme: &TuiTheme,
) {
    let show_progress = screen.progress().is_some();
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(tui_layout_constraints(show_progress))
        .split(f.area());
    let n = areas.len();
    let hint_idx = n - 2;
    let input_idx = n - 1;

    // [0] Title bar
    f.render_widget(
        Paragraph::new(build_title_bar(ctx.phase, ctx.active, theme))
            .style(Style::default().bg(theme.title_bg)),
        areas[0],
    );

    // [1] Output body
    let body_block = Block::default()
        .title(Span::styled(" Output ", Style::default().fg(theme.primary)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_normal));
    let inner = body_block.inner(areas[1]);
    session_view.body_height = (inner.height as usize).max(1);
    let rows = wrap_lines(style_records(screen.records(), theme), inner.width as usize);
    let display_line_count = rows.len();
    session_view.content_rows = display_line_count;
    let scroll = effective_log_scroll(display_line_count, session_view);
    let body = Paragraph::new(Text::from(rows))
        .block(body_block)
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    f.render_widget(body, areas[1]);
    if display_line_count > session_view.body_height {
        let mut scrollbar_state = ScrollbarState::new(display_line_count).position(scroll);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .thumb_style(Style::default().fg(theme.text_muted));
        f.render_stateful_widget(scrollbar, areas[1], &mut scrollbar_state);
    }

    // [2] Progress gauge while a test runs
    if let Some(pct) = screen.progress() {
        let gauge = Gauge::default()
            .gauge_style(
                Style::default()
                    .fg(theme.progress_active)
                    .bg(theme.progress_pending),
            )
            .ratio((pct / 100.0).clamp(0.0, 1.0))
            .label(progress_label(pct));
        f.render_widget(gauge, areas[2]);
    }

    // [n-2] Hint bar
    f.render_widget(
        Paragraph::new(build_status_hint_bar(screen.input(), theme))
            .style(Style::default().bg(theme.hint_bg)),
        areas[hint_idx],
    );

    // [n-1] Input line
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(
            Style::default()
                .fg(theme.border_active)
                .add_modifier(Modifier::BOLD),
        );
    let input_widget =
        Paragraph::new(build_input_line(ctx.prompt, screen.input(), theme)).block(input_block);
    f.render_widget(input_widget, areas[input_idx]);
    let max_x = areas[input_idx].width.saturating_sub(2);
    let x = areas[input_idx].x
        + 1
        + caret_column(ctx.prompt, screen.input(), screen.caret()).min(max_x);
    let y = areas[input_idx].y + 1;
    f.set_cursor_position((x, y));
}

/// Run the full-screen terminal until the user quits. Dropping out of the
/// loop leaves any running speed test to the session's owner.
pub async fn run_terminal_tui(session: &mut TerminalSession) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    info!("tui started");

    let result = event_loop(&mut terminal, session).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("tui stopped");
    result
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    session: &mut TerminalSession,
) -> io::Result<()> {
    let theme = TuiTheme::default_retro();
    let mut screen = ScreenSink::new();
    let mut session_view = TuiSessionViewState::default();
    let prompt = session.config().repl.prompt.clone();
    let mut should_quit = false;

    while !should_quit {
        session.pump();
        session.paint(&mut screen);
        let ctx = FrameContext {
            prompt: &prompt,
            phase: session.phase(),
            active: session.is_session_active(),
        };
        terminal.draw(|f| draw_frame(f, &screen, &ctx, &mut session_view, &theme))?;

        if !event::poll(POLL_INTERVAL)? {
            // Give the session task a turn between polls.
            tokio::task::yield_now().await;
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let line_count = session_view.content_rows;
                if handle_session_scroll_key(&key, &mut session_view, line_count) {
                    continue;
                }
                match map_key_event(&key) {
                    TuiKeyAction::Quit => {
                        debug!("quit requested");
                        should_quit = true;
                    }
                    TuiKeyAction::Edit(input) => {
                        if input == KeyInput::Enter {
                            session_view.auto_follow = true;
                        }
                        session.handle_key(input);
                    }
                    TuiKeyAction::Ignore => {}
                }
            }
            Event::Paste(text) => {
                for ch in text.chars().filter(|c| !c.is_control()) {
                    session.handle_key(KeyInput::Char(ch));
                }
            }
            _ => {}
        }
    }
    Ok(())
}
