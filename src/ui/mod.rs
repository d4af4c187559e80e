pub mod form;
pub mod keygen;
pub mod popup;
pub mod session;
pub mod sidebar;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{App, Pane, PendingDelete, Screen};

// Re-export commonly used items for convenience
pub use form::{PromptForm, draw_prompt_form};
pub use keygen::{KeyGenField, KeyGenState, draw_keygen};
pub use popup::{
    draw_connecting_popup, draw_delete_confirmation_popup, draw_error_popup, draw_info_popup,
};
pub use session::{SessionView, draw_sessions};
pub use sidebar::{draw_connection_list, draw_snippet_list};

const MAIN_HINTS: &str = "Tab: Pane   Enter: Connect/Run   N: New   D: Delete   Alt+←/→: Tabs   Ctrl+W: Close Tab   Ctrl+U/G: Upload/Download   F2: Keys   Ctrl+Q: Quit";

/// Render the whole application for one frame.
pub fn draw(f: &mut Frame<'_>, app: &App) {
    let area = f.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    match app.screen {
        Screen::Main => draw_main(layout[0], app, f),
        Screen::KeyGen => draw_keygen(layout[0], &app.keygen, f),
    }
    draw_footer(layout[1], app, f);

    if !app.connecting.is_empty() {
        draw_connecting_popup(area, &app.connecting, f);
    }
    if let Some(prompt) = &app.prompt {
        draw_prompt_form(area, &prompt.form, f);
    }
    if let Some(pending) = &app.pending_delete {
        let (what, name) = match pending {
            PendingDelete::Connection(index) => (
                "Connection",
                app.profiles
                    .get(*index)
                    .map(|p| p.display_name())
                    .unwrap_or_default(),
            ),
            PendingDelete::Snippet(name) => ("Command", name.clone()),
        };
        draw_delete_confirmation_popup(area, what, &name, f);
    }
    if let Some(e) = &app.error {
        draw_error_popup(area, &e.to_string(), f);
    } else if let Some(info) = &app.info {
        draw_info_popup(area, info, f);
    }
}

fn draw_main(area: Rect, app: &App, f: &mut Frame<'_>) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(area);
    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[0]);

    draw_connection_list(
        sidebar[0],
        app.profiles.profiles(),
        app.selected_profile,
        app.focus == Pane::Connections,
        f,
    );
    draw_snippet_list(
        sidebar[1],
        app.snippets.snippets(),
        app.selected_snippet,
        app.focus == Pane::Snippets,
        f,
    );
    draw_sessions(
        columns[1],
        &app.views,
        app.active_view,
        app.focus == Pane::Session,
        f,
    );
}

fn draw_footer(area: Rect, app: &App, f: &mut Frame<'_>) {
    let footer = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(80), Constraint::Percentage(20)])
        .split(area);

    let hints = match app.screen {
        Screen::Main => MAIN_HINTS.to_string(),
        Screen::KeyGen => "F2/Esc: Back to sessions   Ctrl+Q: Quit".to_string(),
    };
    let hints = if app.transfers_in_flight > 0 {
        format!("{} transfer(s) running   {hints}", app.transfers_in_flight)
    } else {
        hints
    };
    let dim = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::DIM);

    let left = Paragraph::new(Line::from(Span::styled(hints, dim))).alignment(Alignment::Left);
    let right = Paragraph::new(Line::from(Span::styled(
        format!("JetSSH v{}", env!("CARGO_PKG_VERSION")),
        dim,
    )))
    .alignment(Alignment::Right);

    f.render_widget(left, footer[0]);
    f.render_widget(right, footer[1]);
}
