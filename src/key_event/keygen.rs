use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tui_textarea::Input;

use crate::app::{App, PromptKind, Screen};
use crate::error::AppError;
use crate::ui::KeyGenField;

pub fn handle_keygen_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
        if app.keygen.generated.is_some() {
            app.open_prompt(PromptKind::SaveKeyPair);
        } else {
            app.error = Some(AppError::KeyGenerationError(
                "Generate a key before saving".to_string(),
            ));
        }
        return;
    }

    let on_passphrase = app.keygen.focus == KeyGenField::Passphrase;
    match key.code {
        KeyCode::Esc => app.screen = Screen::Main,
        KeyCode::Tab | KeyCode::Down => app.keygen.next_field(),
        KeyCode::BackTab | KeyCode::Up => app.keygen.prev_field(),
        KeyCode::Enter => {
            let result = app.generate_key();
            app.report(result);
        }
        KeyCode::Left if !on_passphrase => app.keygen.cycle(false),
        KeyCode::Right if !on_passphrase => app.keygen.cycle(true),
        _ if on_passphrase => {
            app.keygen.passphrase.input(Input::from(key));
        }
        _ => {}
    }
}
