//! Input Handler - crossterm key events to controller keys and view scrolling.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use termspeed_core::KeyInput;

use super::{TUI_SCROLL_STEP, TuiSessionViewState, calc_log_scroll_usize, effective_log_scroll};

/// What a key press means to the TUI loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuiKeyAction {
    Quit,
    Edit(KeyInput),
    Ignore,
}

pub fn map_key_event(key: &KeyEvent) -> TuiKeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => TuiKeyAction::Quit,
        KeyCode::Char('c') | KeyCode::Char('d') if ctrl => TuiKeyAction::Quit,
        KeyCode::Char('a') if ctrl => TuiKeyAction::Edit(KeyInput::Home),
        KeyCode::Char('e') if ctrl => TuiKeyAction::Edit(KeyInput::End),
        KeyCode::Char(_) if ctrl || key.modifiers.contains(KeyModifiers::ALT) => {
            TuiKeyAction::Ignore
        }
        KeyCode::Char(ch) => TuiKeyAction::Edit(KeyInput::Char(ch)),
        KeyCode::Backspace => TuiKeyAction::Edit(KeyInput::Backspace),
        KeyCode::Delete => TuiKeyAction::Edit(KeyInput::Delete),
        KeyCode::Left => TuiKeyAction::Edit(KeyInput::Left),
        KeyCode::Right => TuiKeyAction::Edit(KeyInput::Right),
        KeyCode::Home => TuiKeyAction::Edit(KeyInput::Home),
        KeyCode::End => TuiKeyAction::Edit(KeyInput::End),
        KeyCode::Up => TuiKeyAction::Edit(KeyInput::Up),
        KeyCode::Down => TuiKeyAction::Edit(KeyInput::Down),
        KeyCode::Enter => TuiKeyAction::Edit(KeyInput::Enter),
        KeyCode::Tab => TuiKeyAction::Edit(KeyInput::Tab),
        KeyCode::BackTab => TuiKeyAction::Edit(KeyInput::BackTab),
        _ => TuiKeyAction::Ignore,
    }
}

pub fn move_session_scroll(session_view: &mut TuiSessionViewState, log_count: usize, delta: isize) {
    let max_scroll = calc_log_scroll_usize(log_count, session_view.body_height);
    let current = effective_log_scroll(log_count, session_view) as isize;
    let next = (current + delta).clamp(0, max_scroll as isize) as usize;
    session_view.scroll_offset = next;
    session_view.auto_follow = next >= max_scroll;
}

/// Scroll keys. Plain Home/End and arrows belong to the input line, so the
/// output scrolls with PageUp/PageDown and the Ctrl variants.
pub fn handle_session_scroll_key(
    key: &KeyEvent,
    session_view: &mut TuiSessionViewState,
    log_count: usize,
) -> bool {
    let page = (session_view.body_height / 2).max(1) as isize;
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Up if ctrl => {
            move_session_scroll(session_view, log_count, -(TUI_SCROLL_STEP as isize));
            true
        }
        KeyCode::Down if ctrl => {
            move_session_scroll(session_view, log_count, TUI_SCROLL_STEP as isize);
            true
        }
        KeyCode::PageUp => {
            move_session_scroll(session_view, log_count, -page);
            true
        }
        KeyCode::PageDown => {
            move_session_scroll(session_view, log_count, page);
            true
        }
        KeyCode::Home if ctrl => {
            session_view.scroll_offset = 0;
            session_view.auto_follow = false;
            true
        }
        KeyCode::End if ctrl => {
            session_view.scroll_offset = calc_log_scroll_usize(log_count, session_view.body_height);
            session_view.auto_follow = true;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::key;

    #[test]
    fn test_map_editing_keys() {
        assert_eq!(
            map_key_event(&key(KeyCode::Char('x'), KeyModifiers::NONE)),
            TuiKeyAction::Edit(KeyInput::Char('x'))
        );
        assert_eq!(
            map_key_event(&key(KeyCode::Char('X'), KeyModifiers::SHIFT)),
            TuiKeyAction::Edit(KeyInput::Char('X'))
        );
        assert_eq!(
            map_key_event(&key(KeyCode::Enter, KeyModifiers::NONE)),
            TuiKeyAction::Edit(KeyInput::Enter)
        );
        assert_eq!(
            map_key_event(&key(KeyCode::BackTab, KeyModifiers::SHIFT)),
            TuiKeyAction::Edit(KeyInput::BackTab)
        );
        assert_eq!(
            map_key_event(&key(KeyCode::Char('a'), KeyModifiers::CONTROL)),
            TuiKeyAction::Edit(KeyInput::Home)
        );
    }

    #[test]
    fn test_map_quit_keys() {
        assert_eq!(
            map_key_event(&key(KeyCode::Esc, KeyModifiers::NONE)),
            TuiKeyAction::Quit
        );
        assert_eq!(
            map_key_event(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            TuiKeyAction::Quit
        );
        assert_eq!(
            map_key_event(&key(KeyCode::Char('z'), KeyModifiers::CONTROL)),
            TuiKeyAction::Ignore
        );
    }

    #[test]
    fn test_handle_session_scroll_key_page_navigation() {
        let mut view = TuiSessionViewState {
            scroll_offset: 0,
            auto_follow: true,
            body_height: 10,
            ..Default::default()
        };
        assert!(handle_session_scroll_key(
            &key(KeyCode::PageUp, KeyModifiers::NONE),
            &mut view,
            30
        ));
        assert_eq!(view.scroll_offset, 15);
        assert!(!view.auto_follow);
        assert!(handle_session_scroll_key(
            &key(KeyCode::PageDown, KeyModifiers::NONE),
            &mut view,
            30
        ));
        assert_eq!(view.scroll_offset, 20);
        assert!(view.auto_follow);
        assert!(handle_session_scroll_key(
            &key(KeyCode::Home, KeyModifiers::CONTROL),
            &mut view,
            30
        ));
        assert_eq!(view.scroll_offset, 0);
        assert!(!view.auto_follow);
    }

    #[test]
    fn test_plain_home_is_not_scroll() {
        let mut view = TuiSessionViewState::default();
        assert!(!handle_session_scroll_key(
            &key(KeyCode::Home, KeyModifiers::NONE),
            &mut view,
            30
        ));
        assert!(!handle_session_scroll_key(
            &key(KeyCode::Up, KeyModifiers::NONE),
            &mut view,
            30
        ));
    }
}
