use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tui_textarea::Input;

use crate::app::{App, Pane, PromptKind};
use crate::session::ControlInput;

const SCROLL_PAGE: usize = 10;

/// Keys for the focused session tab. Everything not bound here edits the input line.
pub fn handle_session_key(app: &mut App, key: KeyEvent) {
    let Some(session) = app.focused_session() else {
        app.focus = Pane::Connections;
        return;
    };

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                let result = app.send_control(ControlInput::Interrupt);
                app.report(result);
                return;
            }
            KeyCode::Char('d') => {
                let result = app.send_control(ControlInput::EndOfInput);
                app.report(result);
                return;
            }
            KeyCode::Char('u') => {
                app.open_prompt(PromptKind::Upload { session });
                return;
            }
            KeyCode::Char('g') => {
                app.open_prompt(PromptKind::Download { session });
                return;
            }
            _ => {}
        }
    }

    match key.code {
        KeyCode::Enter => {
            if let Some(view) = app.views.get_mut(app.active_view) {
                view.scroll = 0;
            }
            let result = app.submit_input();
            app.report(result);
        }
        KeyCode::Up => app.history_up(),
        KeyCode::Down => app.history_down(),
        KeyCode::PageUp => {
            if let Some(view) = app.views.get_mut(app.active_view) {
                view.scroll_up(SCROLL_PAGE);
            }
        }
        KeyCode::PageDown => {
            if let Some(view) = app.views.get_mut(app.active_view) {
                view.scroll_down(SCROLL_PAGE);
            }
        }
        KeyCode::Esc => app.focus = Pane::Connections,
        _ => {
            if let Some(view) = app.views.get_mut(app.active_view) {
                view.input.input(Input::from(key));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::key_event::tests::{ctrl, press, test_app};
    use crate::session::{RemoteSession, SessionId};

    #[tokio::test]
    async fn test_typed_line_is_sent_on_enter() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        let (client, mut server) = tokio::io::duplex(256);
        app.attach_session(RemoteSession::attach(
            SessionId::new(),
            "alpha".into(),
            client,
            None,
        ));

        for c in "pwd".chars() {
            handle_session_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_session_key(&mut app, press(KeyCode::Enter));
        handle_session_key(&mut app, ctrl('c'));

        let mut buf = vec![0u8; 5];
        tokio::time::timeout(Duration::from_secs(2), server.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(buf, b"pwd\n\x03");
        assert!(app.error.is_none());
    }

    #[tokio::test]
    async fn test_ctrl_u_opens_upload_prompt_for_focused_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        let (client, _server) = tokio::io::duplex(64);
        let id = app.attach_session(RemoteSession::attach(
            SessionId::new(),
            "alpha".into(),
            client,
            None,
        ));

        handle_session_key(&mut app, ctrl('u'));
        assert_eq!(
            app.prompt.as_ref().map(|p| p.kind.clone()),
            Some(PromptKind::Upload { session: id })
        );
    }
}
