use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

use crate::config::profiles::{ConnectionProfile, Credential};
use crate::config::snippets::CommandSnippet;

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let block = Block::default().borders(Borders::ALL).title(title);
    if focused {
        block.border_style(Style::default().fg(Color::Cyan))
    } else {
        block
    }
}

fn clamp_selected(selected: usize, len: usize) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some(selected.min(len - 1))
    }
}

pub fn draw_connection_list(
    area: Rect,
    profiles: &[ConnectionProfile],
    selected: usize,
    focused: bool,
    frame: &mut ratatui::Frame<'_>,
) {
    let items: Vec<ListItem> = profiles
        .iter()
        .map(|p| {
            let auth = match p.credential {
                Credential::KeyFile(_) => "key",
                Credential::PasswordPrompt => "password",
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled("● ", Style::default().fg(Color::Green)),
                    Span::styled(p.host.clone(), Style::default().add_modifier(Modifier::BOLD)),
                ]),
                Line::from(vec![
                    Span::raw("  User: "),
                    Span::styled(p.username.clone(), Style::default().fg(Color::Cyan)),
                    Span::raw("  Auth: "),
                    Span::styled(auth, Style::default().fg(Color::Cyan)),
                ]),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(pane_block(
            format!("Connections ({})", profiles.len()),
            focused,
        ))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(
        list,
        area,
        &mut ListState::default().with_selected(clamp_selected(selected, profiles.len())),
    );
}

pub fn draw_snippet_list(
    area: Rect,
    snippets: &[CommandSnippet],
    selected: usize,
    focused: bool,
    frame: &mut ratatui::Frame<'_>,
) {
    let items: Vec<ListItem> = snippets
        .iter()
        .map(|s| {
            let mut lines = vec![Line::from(vec![
                Span::styled(s.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw("  "),
                Span::styled(s.command.clone(), Style::default().fg(Color::Yellow)),
            ])];
            if !s.description.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("  {}", s.description),
                    Style::default().fg(Color::Gray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(pane_block(format!("Commands ({})", snippets.len()), focused))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(
        list,
        area,
        &mut ListState::default().with_selected(clamp_selected(selected, snippets.len())),
    );
}
