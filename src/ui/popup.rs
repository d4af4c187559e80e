use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

fn dismiss_hint() -> Line<'static> {
    Line::from(Span::styled(
        "Press Enter or Esc to dismiss",
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    ))
}

fn draw_message_popup(
    area: Rect,
    title: &str,
    message: &str,
    color: Color,
    frame: &mut ratatui::Frame<'_>,
) {
    let popup_w = area.width.saturating_sub(4);
    let inner_w = popup_w.saturating_sub(2).max(1);
    let estimated_lines: u16 = message
        .lines()
        .map(|l| {
            let len = l.chars().count() as u16;
            if len == 0 { 1 } else { len.div_ceil(inner_w) }
        })
        .sum();
    let content_h = estimated_lines.max(1) + 4; // title + message + hint
    let popup = centered(area, popup_w, content_h.min(area.height.saturating_sub(2)));

    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(Span::styled(
            title.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
    let body = Paragraph::new(vec![
        Line::from(Span::styled(message.to_string(), Style::default().fg(color))),
        Line::from(""),
        dismiss_hint(),
    ])
    .wrap(Wrap { trim: true })
    .block(block);
    frame.render_widget(body, popup);
}

pub fn draw_error_popup(area: Rect, message: &str, frame: &mut ratatui::Frame<'_>) {
    draw_message_popup(area, "Error", message, Color::Red, frame);
}

pub fn draw_info_popup(area: Rect, message: &str, frame: &mut ratatui::Frame<'_>) {
    draw_message_popup(area, "Info", message, Color::Green, frame);
}

/// Shown while launch tasks are still connecting.
pub fn draw_connecting_popup(area: Rect, labels: &[String], frame: &mut ratatui::Frame<'_>) {
    let popup = centered(area, 50, labels.len() as u16 + 2);
    frame.render_widget(Clear, popup);
    let lines: Vec<Line> = labels
        .iter()
        .map(|l| {
            Line::from(vec![
                Span::styled("⟳ ", Style::default().fg(Color::Yellow)),
                Span::raw(format!("Connecting to {l}...")),
            ])
        })
        .collect();
    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Connecting"),
    );
    frame.render_widget(body, popup);
}

pub fn draw_delete_confirmation_popup(
    area: Rect,
    what: &str,
    name: &str,
    frame: &mut ratatui::Frame<'_>,
) {
    let popup = centered(area, area.width.saturating_sub(10).max(50), 7);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(Span::styled(
            format!("Delete {what}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    let body = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("Delete this {}?", what.to_lowercase()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            name.to_string(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "Y",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" - Delete   "),
            Span::styled(
                "N/Esc",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" - Cancel"),
        ]),
    ])
    .alignment(Alignment::Center)
    .block(block);
    frame.render_widget(body, popup);
}
