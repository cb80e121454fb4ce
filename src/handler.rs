use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, Focus};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_turn().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work with either focus
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.should_quit = true,
            KeyCode::Char('n') => app.new_conversation(),
            KeyCode::Char('t') => app.toggle_theme(),
            KeyCode::Char('b') => app.toggle_sidebar(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Tab => {
            if app.sidebar_visible {
                app.focus = match app.focus {
                    Focus::Input => Focus::Sidebar,
                    Focus::Sidebar => Focus::Input,
                };
            }
        }
        KeyCode::PageUp => app.scroll_chat_page_up(),
        KeyCode::PageDown => app.scroll_chat_page_down(),
        _ => match app.focus {
            Focus::Input => handle_input_key(app, key),
            Focus::Sidebar => handle_sidebar_key(app, key),
        },
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                // Shift+Enter inserts a newline instead of sending
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.insert(byte_pos, '\n');
                app.input_cursor += 1;
            } else {
                app.submit();
            }
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Esc => {
            if app.sidebar_visible {
                app.focus = Focus::Sidebar;
            }
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_sidebar_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.sidebar_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.sidebar_nav_up(),
        KeyCode::Enter => {
            app.activate_selected();
            app.focus = Focus::Input;
        }
        KeyCode::Esc => app.focus = Focus::Input,
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    // Determine which area the mouse is in (position-based scrolling)
    let in_sidebar = app.sidebar_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_sidebar {
                app.sidebar_nav_down();
            } else if in_chat {
                app.scroll_chat_down();
                app.scroll_chat_down();
                app.scroll_chat_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_sidebar {
                app.sidebar_nav_up();
            } else if in_chat {
                app.scroll_chat_up();
                app.scroll_chat_up();
                app.scroll_chat_up();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        App::new("http://localhost:7860/api/predict", "Anonymous".to_string(), false)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_chars_insert_at_cursor_with_multibyte_text() {
        let mut app = test_app();
        app.input = "héllo".to_string();
        app.input_cursor = 2;

        handle_input_key(&mut app, press(KeyCode::Char('x')));

        assert_eq!(app.input, "héxllo");
        assert_eq!(app.input_cursor, 3);
    }

    #[test]
    fn test_backspace_removes_char_before_cursor() {
        let mut app = test_app();
        app.input = "héllo".to_string();
        app.input_cursor = 2;

        handle_input_key(&mut app, press(KeyCode::Backspace));

        assert_eq!(app.input, "hllo");
        assert_eq!(app.input_cursor, 1);
    }

    #[test]
    fn test_shift_enter_inserts_newline_without_sending() {
        let mut app = test_app();
        app.input = "line".to_string();
        app.input_cursor = 4;

        handle_input_key(
            &mut app,
            KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT),
        );

        assert_eq!(app.input, "line\n");
        assert_eq!(app.input_cursor, 5);
        assert!(app.store.messages().is_empty());
    }

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        assert_eq!(char_to_byte_index("héllo", 0), 0);
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("héllo", 10), 6);
    }
}
