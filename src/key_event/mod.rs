use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, Pane, Screen};

pub mod connected;
pub mod connection_list;
pub mod form;
pub mod keygen;

pub use connected::handle_session_key;
pub use connection_list::{handle_connection_list_key, handle_snippet_list_key};
pub use form::{handle_delete_confirmation_key, handle_prompt_key};
pub use keygen::handle_keygen_key;

/// Result of handling a key event
pub enum KeyFlow {
    Continue,
    Quit,
}

/// Top-level key event handler: popups first, then global keys, then the focused pane
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> KeyFlow {
    // Only handle actual key presses (ignore repeats/releases)
    if key.kind != KeyEventKind::Press {
        return KeyFlow::Continue;
    }

    if app.error.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.error = None;
        }
        return KeyFlow::Continue;
    }

    if app.info.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.info = None;
        }
        return KeyFlow::Continue;
    }

    if app.pending_delete.is_some() {
        handle_delete_confirmation_key(app, key);
        return KeyFlow::Continue;
    }

    if app.prompt.is_some() {
        handle_prompt_key(app, key);
        return KeyFlow::Continue;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') if ctrl => return KeyFlow::Quit,
        KeyCode::F(2) => {
            app.screen = match app.screen {
                Screen::Main => Screen::KeyGen,
                Screen::KeyGen => Screen::Main,
            };
            return KeyFlow::Continue;
        }
        _ => {}
    }

    if app.screen == Screen::KeyGen {
        handle_keygen_key(app, key);
        return KeyFlow::Continue;
    }

    let alt = key.modifiers.contains(KeyModifiers::ALT);
    match key.code {
        KeyCode::Tab => {
            cycle_focus(app);
            return KeyFlow::Continue;
        }
        KeyCode::Char('w') if ctrl => {
            if !app.views.is_empty() {
                let result = app.close_session_view(app.active_view);
                app.report(result);
            }
            return KeyFlow::Continue;
        }
        KeyCode::Right if alt => {
            app.next_view();
            return KeyFlow::Continue;
        }
        KeyCode::Left if alt => {
            app.prev_view();
            return KeyFlow::Continue;
        }
        _ => {}
    }

    match app.focus {
        Pane::Connections => handle_connection_list_key(app, key),
        Pane::Snippets => handle_snippet_list_key(app, key),
        Pane::Session => handle_session_key(app, key),
    }
    KeyFlow::Continue
}

fn cycle_focus(app: &mut App) {
    app.focus = match app.focus {
        Pane::Connections => Pane::Snippets,
        Pane::Snippets if !app.views.is_empty() => Pane::Session,
        Pane::Snippets | Pane::Session => Pane::Connections,
    };
}
