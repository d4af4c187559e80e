use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tui_textarea::TextArea;

#[derive(Clone, Debug)]
pub struct FormField {
    pub label: &'static str,
    pub input: TextArea<'static>,
    pub required: bool,
}

/// Modal form of single-line fields.
#[derive(Clone, Debug)]
pub struct PromptForm {
    pub title: String,
    pub fields: Vec<FormField>,
    pub focus: usize,
    pub error: Option<String>,
}

fn field_textarea(placeholder: &str) -> TextArea<'static> {
    let mut input = TextArea::default();
    input.set_placeholder_text(placeholder.to_string());
    input.set_cursor_line_style(Style::default());
    input
}

impl PromptForm {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
            focus: 0,
            error: None,
        }
    }

    pub fn field(mut self, label: &'static str, placeholder: &str, required: bool) -> Self {
        self.fields.push(FormField {
            label,
            input: field_textarea(placeholder),
            required,
        });
        self
    }

    /// A masked field for passwords and passphrases.
    pub fn secret(mut self, label: &'static str, placeholder: &str, required: bool) -> Self {
        let mut input = field_textarea(placeholder);
        input.set_mask_char('*');
        self.fields.push(FormField {
            label,
            input,
            required,
        });
        self
    }

    /// Prefill the most recently added field.
    pub fn prefill(mut self, value: impl Into<String>) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.input.insert_str(value.into());
        }
        self
    }

    pub fn next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn focused_textarea_mut(&mut self) -> Option<&mut TextArea<'static>> {
        self.fields.get_mut(self.focus).map(|f| &mut f.input)
    }

    /// Field text with any line breaks removed; every prompt field is a single line.
    pub fn value(&self, index: usize) -> String {
        self.fields
            .get(index)
            .map(|f| f.input.lines().concat())
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), String> {
        for (i, field) in self.fields.iter().enumerate() {
            if field.required && self.value(i).trim().is_empty() {
                return Err(format!("{} is required", field.label));
            }
        }
        Ok(())
    }
}

pub fn draw_prompt_form(area: Rect, form: &PromptForm, frame: &mut ratatui::Frame<'_>) {
    let field_rows = form.fields.len() as u16 * 3;
    let popup_w = area.width.saturating_sub(10).clamp(20, 80);
    let popup_h = (field_rows + 4).min(area.height.saturating_sub(2));
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(popup_w)) / 2,
        y: area.y + (area.height.saturating_sub(popup_h)) / 2,
        width: popup_w,
        height: popup_h,
    };

    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(Span::styled(
            form.title.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )));
    frame.render_widget(block, popup);

    let mut constraints: Vec<Constraint> = form.fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Length(1)); // error
    constraints.push(Constraint::Length(1)); // hint
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(popup.inner(Margin::new(1, 1)));

    for (idx, field) in form.fields.iter().enumerate() {
        let mut widget = field.input.clone();
        let label = if field.required {
            field.label.to_string()
        } else {
            format!("{} (optional)", field.label)
        };
        let mut field_block = Block::default().borders(Borders::ALL).title(label);
        if idx == form.focus {
            field_block = field_block.border_style(Style::default().fg(Color::Cyan));
        } else {
            // Hide cursor when not focused
            widget.set_cursor_style(Style::default().bg(Color::Reset));
        }
        widget.set_block(field_block);
        frame.render_widget(&widget, layout[idx]);
    }

    let n = form.fields.len();
    if let Some(err) = &form.error {
        frame.render_widget(
            Paragraph::new(Span::styled(err.clone(), Style::default().fg(Color::Red))),
            layout[n],
        );
    }
    frame.render_widget(
        Paragraph::new(Span::styled(
            "Enter: Submit   Tab/↓: Next   Shift+Tab/↑: Previous   Esc: Cancel",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::DIM),
        )),
        layout[n + 1],
    );
}
