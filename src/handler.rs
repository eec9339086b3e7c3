use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, FocusPane, InputMode, WidgetId};
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
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick();
            app.poll_pending().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Nova overlay toggle; opening it moves focus to its input
        KeyCode::Char('n') => {
            app.nova.toggle_open();
            if app.nova.is_open() {
                app.focus = FocusPane::Input;
                app.input_mode = InputMode::Editing;
                app.nova.cursor = app.nova.input.chars().count();
            } else {
                app.focus = FocusPane::Input;
            }
        }

        KeyCode::Esc => {
            if app.nova.is_open() {
                app.nova.close();
                app.focus = FocusPane::Input;
            }
        }

        // Enter editing on the active widget's input
        KeyCode::Char('i') | KeyCode::Char('/') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
            let widget = app.active_mut();
            widget.cursor = widget.input.chars().count();
        }

        // Tab cycles focus over the panes the active widget actually has
        KeyCode::Tab => {
            app.focus = next_focus(app);
        }

        // Scroll or navigate based on focus
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Log => app.active_mut().scroll_down(),
            FocusPane::Cards => app.active_mut().card_nav_down(),
            FocusPane::QuickReplies => app.active_mut().quick_nav_down(),
            FocusPane::Input => {}
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Log => app.active_mut().scroll_up(),
            FocusPane::Cards => app.active_mut().card_nav_up(),
            FocusPane::QuickReplies => app.active_mut().quick_nav_up(),
            FocusPane::Input => {}
        },

        KeyCode::Char('g') => {
            if app.focus == FocusPane::Log {
                app.active_mut().log_scroll = 0;
            }
        }
        KeyCode::Char('G') => {
            if app.focus == FocusPane::Log {
                app.active_mut().scroll_to_bottom();
            }
        }

        // Activate the selected card or quick reply
        KeyCode::Enter => match app.focus {
            FocusPane::Cards => app.open_selected_card(),
            FocusPane::QuickReplies => {
                let label = app
                    .active()
                    .quick_state
                    .selected()
                    .and_then(|i| app.active().quick_reply(i))
                    .map(str::to_string);
                if let Some(label) = label {
                    app.submit_text(&label);
                }
            }
            FocusPane::Input => {
                app.input_mode = InputMode::Editing;
                let widget = app.active_mut();
                widget.cursor = widget.input.chars().count();
            }
            FocusPane::Log => {}
        },

        // Number keys fire a quick reply directly
        KeyCode::Char(c @ '1'..='9') => {
            let idx = (c as usize) - ('1' as usize);
            let label = app.active().quick_reply(idx).map(str::to_string);
            if let Some(label) = label {
                app.submit_text(&label);
            }
        }

        _ => {}
    }
}

fn next_focus(app: &App) -> FocusPane {
    let widget = app.active();
    let has_cards = widget.cards_len() > 0;
    let has_quick = !widget.quick_replies.is_empty();

    match app.focus {
        FocusPane::Input => FocusPane::Log,
        FocusPane::Log => {
            if has_cards {
                FocusPane::Cards
            } else if has_quick {
                FocusPane::QuickReplies
            } else {
                FocusPane::Input
            }
        }
        FocusPane::Cards => {
            if has_quick {
                FocusPane::QuickReplies
            } else {
                FocusPane::Input
            }
        }
        FocusPane::QuickReplies => FocusPane::Input,
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_active();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Log;
        }
        KeyCode::Backspace => {
            let widget = app.active_mut();
            if widget.cursor > 0 {
                widget.cursor -= 1;
                let byte_pos = char_to_byte_index(&widget.input, widget.cursor);
                widget.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let widget = app.active_mut();
            let char_count = widget.input.chars().count();
            if widget.cursor < char_count {
                let byte_pos = char_to_byte_index(&widget.input, widget.cursor);
                widget.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            let widget = app.active_mut();
            widget.cursor = widget.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let widget = app.active_mut();
            let char_count = widget.input.chars().count();
            widget.cursor = (widget.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.active_mut().cursor = 0;
        }
        KeyCode::End => {
            let widget = app.active_mut();
            widget.cursor = widget.input.chars().count();
        }
        KeyCode::Char(c) => {
            let widget = app.active_mut();
            let byte_pos = char_to_byte_index(&widget.input, widget.cursor);
            widget.input.insert(byte_pos, c);
            widget.cursor += 1;
        }
        _ => {}
    }
}
