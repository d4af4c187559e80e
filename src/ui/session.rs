use std::collections::VecDeque;

use chrono::{DateTime, Local};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Tabs};
use tui_textarea::TextArea;

use crate::history::{CommandHistory, HistoryStep};
use crate::session::{CloseReason, SessionId};

/// Plain-text scrollback for one session.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    limit: usize,
    pending_cr: bool,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            lines: VecDeque::from([String::new()]),
            limit: limit.max(1),
            pending_cr: false,
        }
    }

    /// Append stripped output. A bare carriage return rewrites the current line.
    pub fn push_str(&mut self, text: &str) {
        for ch in text.chars() {
            if self.pending_cr {
                self.pending_cr = false;
                if ch != '\n' {
                    self.current().clear();
                }
            }
            match ch {
                '\n' => self.new_line(),
                '\r' => self.pending_cr = true,
                '\x08' => {
                    self.current().pop();
                }
                '\t' => self.current().push_str("    "),
                c if c.is_control() => {}
                c => self.current().push(c),
            }
        }
    }

    fn current(&mut self) -> &mut String {
        if self.lines.is_empty() {
            self.lines.push_back(String::new());
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }

    fn new_line(&mut self) {
        self.lines.push_back(String::new());
        while self.lines.len() > self.limit {
            self.lines.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn text(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }
}

#[derive(Debug, Clone)]
pub struct LoggedCommand {
    pub at: DateTime<Local>,
    pub command: String,
}

/// Everything shown in one session tab.
pub struct SessionView {
    pub id: SessionId,
    pub title: String,
    pub output: OutputBuffer,
    pub command_log: Vec<LoggedCommand>,
    pub history: CommandHistory,
    pub input: TextArea<'static>,
    pub closed: Option<CloseReason>,
    /// Lines scrolled back from the bottom
    pub scroll: usize,
}

pub fn create_command_input() -> TextArea<'static> {
    let mut input = TextArea::default();
    input.set_placeholder_text("Type a command and press Enter");
    input.set_cursor_line_style(Style::default());
    input
}

impl SessionView {
    pub fn new(id: SessionId, title: String, scrollback: usize) -> Self {
        Self {
            id,
            title,
            output: OutputBuffer::new(scrollback),
            command_log: Vec::new(),
            history: CommandHistory::new(),
            input: create_command_input(),
            closed: None,
            scroll: 0,
        }
    }

    pub fn input_text(&self) -> String {
        self.input.lines().join("\n")
    }

    pub fn set_input(&mut self, text: &str) {
        self.input = create_command_input();
        self.input.insert_str(text);
    }

    pub fn apply_history(&mut self, step: HistoryStep) {
        match step {
            HistoryStep::Show(text) => self.set_input(&text),
            HistoryStep::Clear => self.set_input(""),
            HistoryStep::Unchanged => {}
        }
    }

    pub fn log_command(&mut self, command: &str) {
        self.command_log.push(LoggedCommand {
            at: Local::now(),
            command: command.to_string(),
        });
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.output.len().saturating_sub(1);
        self.scroll = (self.scroll + lines).min(max);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }
}

pub fn draw_sessions(
    area: Rect,
    views: &[SessionView],
    active: usize,
    focused: bool,
    frame: &mut ratatui::Frame<'_>,
) {
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let Some(view) = views.get(active) else {
        let placeholder = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "No open sessions. Select a connection and press Enter.",
                Style::default().fg(Color::Gray),
            )),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title("Sessions"),
        );
        frame.render_widget(placeholder, area);
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // tabs
            Constraint::Min(3),    // output
            Constraint::Length(6), // command log
            Constraint::Length(3), // input
        ])
        .split(area);

    let titles: Vec<Line> = views
        .iter()
        .map(|v| {
            if v.closed.is_some() {
                Line::from(Span::styled(
                    format!("{} (closed)", v.title),
                    Style::default().fg(Color::DarkGray),
                ))
            } else {
                Line::from(v.title.clone())
            }
        })
        .collect();
    let tabs = Tabs::new(titles)
        .select(active)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(format!("Sessions ({})", views.len())),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, layout[0]);

    draw_output(layout[1], view, border, frame);
    draw_command_log(layout[2], view, frame);

    let mut input = view.input.clone();
    let title = match &view.closed {
        Some(_) => "Input (session closed)",
        None => "Input",
    };
    let mut input_block = Block::default().borders(Borders::ALL).title(title);
    if focused {
        input_block = input_block.border_style(Style::default().fg(Color::Cyan));
    } else {
        input.set_cursor_style(Style::default().bg(Color::Reset));
    }
    input.set_block(input_block);
    frame.render_widget(&input, layout[3]);
}

fn draw_output(area: Rect, view: &SessionView, border: Style, frame: &mut ratatui::Frame<'_>) {
    let height = area.height.saturating_sub(2) as usize;
    let total = view.output.len();
    let end = total.saturating_sub(view.scroll);
    let start = end.saturating_sub(height);

    let mut lines: Vec<Line> = view
        .output
        .lines()
        .skip(start)
        .take(end - start)
        .map(|l| Line::from(l.to_string()))
        .collect();

    if let Some(reason) = &view.closed
        && view.scroll == 0
    {
        let message = match reason {
            CloseReason::Eof => "[connection closed by remote host]".to_string(),
            CloseReason::Error(e) => format!("[connection lost: {e}]"),
        };
        lines.push(Line::from(Span::styled(
            message,
            Style::default().fg(Color::Yellow),
        )));
    }

    let title = if view.scroll > 0 {
        format!("Output [{} lines up]", view.scroll)
    } else {
        "Output".to_string()
    };
    let output = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title),
    );
    frame.render_widget(output, area);
}

fn draw_command_log(area: Rect, view: &SessionView, frame: &mut ratatui::Frame<'_>) {
    let height = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = view
        .command_log
        .iter()
        .rev()
        .take(height)
        .rev()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    entry.at.format("%H:%M:%S ").to_string(),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(entry.command.clone(), Style::default().fg(Color::Cyan)),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Command Log"),
    );
    frame.render_widget(list, area);
}
