use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{App, PendingDelete, PromptKind};

fn step(selected: &mut usize, len: usize, down: bool) {
    if len == 0 {
        *selected = 0;
    } else if down {
        *selected = (*selected + 1) % len;
    } else {
        *selected = (*selected + len - 1) % len;
    }
}

pub fn handle_connection_list_key(app: &mut App, key: KeyEvent) {
    let len = app.profiles.len();
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => step(&mut app.selected_profile, len, false),
        KeyCode::Down | KeyCode::Char('j') => step(&mut app.selected_profile, len, true),
        KeyCode::Char('n') | KeyCode::Char('a') => app.open_prompt(PromptKind::NewConnection),
        KeyCode::Char('d') | KeyCode::Delete if len > 0 => {
            app.pending_delete = Some(PendingDelete::Connection(app.selected_profile.min(len - 1)));
        }
        KeyCode::Enter => app.launch_selected(),
        _ => {}
    }
}

pub fn handle_snippet_list_key(app: &mut App, key: KeyEvent) {
    let len = app.snippets.len();
    let selected_name = app
        .snippets
        .snippets()
        .get(app.selected_snippet)
        .map(|s| s.name.clone());
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => step(&mut app.selected_snippet, len, false),
        KeyCode::Down | KeyCode::Char('j') => step(&mut app.selected_snippet, len, true),
        KeyCode::Char('n') | KeyCode::Char('a') => app.open_prompt(PromptKind::NewSnippet),
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(name) = selected_name {
                app.pending_delete = Some(PendingDelete::Snippet(name));
            }
        }
        KeyCode::Enter => {
            if let Some(name) = selected_name {
                let result = app.execute_snippet(&name);
                app.report(result);
            }
        }
        _ => {}
    }
}
