use crossterm::event::{KeyCode, KeyEvent};
use tui_textarea::Input;

use crate::app::App;

pub fn handle_prompt_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.prompt = None,
        KeyCode::Enter => app.submit_prompt(),
        KeyCode::Tab | KeyCode::Down => {
            if let Some(prompt) = &mut app.prompt {
                prompt.form.next();
            }
        }
        KeyCode::BackTab | KeyCode::Up => {
            if let Some(prompt) = &mut app.prompt {
                prompt.form.prev();
            }
        }
        _ => {
            if let Some(prompt) = &mut app.prompt {
                prompt.form.error = None;
                if let Some(textarea) = prompt.form.focused_textarea_mut() {
                    textarea.input(Input::from(key));
                }
            }
        }
    }
}

pub fn handle_delete_confirmation_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_delete(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.pending_delete = None,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{PendingDelete, PromptKind};
    use crate::config::profiles::Credential;
    use crate::key_event::tests::{press, test_app};

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_prompt_key(app, press(KeyCode::Char(c)));
        }
    }

    #[tokio::test]
    async fn test_new_connection_form() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.open_prompt(PromptKind::NewConnection);

        type_str(&mut app, "web01");
        handle_prompt_key(&mut app, press(KeyCode::Tab));
        type_str(&mut app, "deploy");
        handle_prompt_key(&mut app, press(KeyCode::Tab));
        type_str(&mut app, "~/.ssh/id_ed25519");
        handle_prompt_key(&mut app, press(KeyCode::Enter));

        assert!(app.prompt.is_none());
        assert!(app.error.is_none());
        let profile = app.profiles.get(0).unwrap();
        assert_eq!(profile.host, "web01");
        assert_eq!(profile.username, "deploy");
        assert_eq!(
            profile.credential,
            Credential::KeyFile("~/.ssh/id_ed25519".to_string())
        );
    }

    #[tokio::test]
    async fn test_escape_cancels_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.open_prompt(PromptKind::NewSnippet);
        type_str(&mut app, "x");
        handle_prompt_key(&mut app, press(KeyCode::Esc));
        assert!(app.prompt.is_none());
        assert!(app.snippets.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_snippet_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.add_snippet("disk", "df -h", "").unwrap();

        app.pending_delete = Some(PendingDelete::Snippet("disk".into()));
        handle_delete_confirmation_key(&mut app, press(KeyCode::Char('n')));
        assert_eq!(app.snippets.len(), 1);

        app.pending_delete = Some(PendingDelete::Snippet("disk".into()));
        handle_delete_confirmation_key(&mut app, press(KeyCode::Char('y')));
        assert!(app.snippets.is_empty());
        assert!(app.pending_delete.is_none());
    }
}
