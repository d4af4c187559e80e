use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tui_textarea::TextArea;

use crate::error::Result;
use crate::keygen::{GeneratedKey, KeyAlgorithm, KeySpec};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyGenField {
    Algorithm,
    Bits,
    Passphrase,
}

/// Selections on the key generation screen.
pub struct KeyGenState {
    pub algorithm: usize,
    pub bits: usize,
    pub passphrase: TextArea<'static>,
    pub focus: KeyGenField,
    pub generated: Option<GeneratedKey>,
}

impl Default for KeyGenState {
    fn default() -> Self {
        let mut passphrase = TextArea::default();
        passphrase.set_placeholder_text("Leave empty for an unencrypted key");
        passphrase.set_mask_char('*');
        passphrase.set_cursor_line_style(Style::default());

        let mut state = Self {
            algorithm: 0,
            bits: 0,
            passphrase,
            focus: KeyGenField::Algorithm,
            generated: None,
        };
        state.reset_bits();
        state
    }
}

impl KeyGenState {
    pub fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::ALL[self.algorithm % KeyAlgorithm::ALL.len()]
    }

    pub fn bits(&self) -> Option<u32> {
        self.algorithm().allowed_bits().get(self.bits).copied()
    }

    pub fn spec(&self) -> Result<KeySpec> {
        KeySpec::new(self.algorithm(), self.bits())
    }

    pub fn passphrase(&self) -> String {
        self.passphrase.lines().concat()
    }

    fn reset_bits(&mut self) {
        let algorithm = self.algorithm();
        self.bits = algorithm
            .default_bits()
            .and_then(|d| algorithm.allowed_bits().iter().position(|b| *b == d))
            .unwrap_or(0);
    }

    pub fn next_field(&mut self) {
        self.focus = match self.focus {
            KeyGenField::Algorithm => KeyGenField::Bits,
            KeyGenField::Bits => KeyGenField::Passphrase,
            KeyGenField::Passphrase => KeyGenField::Algorithm,
        };
    }

    pub fn prev_field(&mut self) {
        self.focus = match self.focus {
            KeyGenField::Algorithm => KeyGenField::Passphrase,
            KeyGenField::Bits => KeyGenField::Algorithm,
            KeyGenField::Passphrase => KeyGenField::Bits,
        };
    }

    /// Step the focused selector; `forward` moves right.
    pub fn cycle(&mut self, forward: bool) {
        match self.focus {
            KeyGenField::Algorithm => {
                let n = KeyAlgorithm::ALL.len();
                self.algorithm = if forward {
                    (self.algorithm + 1) % n
                } else {
                    (self.algorithm + n - 1) % n
                };
                self.reset_bits();
            }
            KeyGenField::Bits => {
                let n = self.algorithm().allowed_bits().len();
                if n > 0 {
                    self.bits = if forward {
                        (self.bits + 1) % n
                    } else {
                        (self.bits + n - 1) % n
                    };
                }
            }
            KeyGenField::Passphrase => {}
        }
    }
}

fn selector_line<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let style = if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(format!("{label:<12}")),
        Span::styled(format!("◀ {value} ▶"), style),
    ])
}

pub fn draw_keygen(area: Rect, state: &KeyGenState, frame: &mut ratatui::Frame<'_>) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // selectors
            Constraint::Length(3), // passphrase
            Constraint::Min(4),    // private key
            Constraint::Length(5), // public key
            Constraint::Length(1), // hint
        ])
        .split(area);

    let bits = match state.bits() {
        Some(b) => format!("{b} bits"),
        None => "fixed".to_string(),
    };
    let selectors = Paragraph::new(vec![
        selector_line(
            "Algorithm",
            state.algorithm().to_string(),
            state.focus == KeyGenField::Algorithm,
        ),
        selector_line("Key size", bits, state.focus == KeyGenField::Bits),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Generate SSH Key"),
    );
    frame.render_widget(selectors, layout[0]);

    let mut passphrase = state.passphrase.clone();
    let mut block = Block::default().borders(Borders::ALL).title("Passphrase");
    if state.focus == KeyGenField::Passphrase {
        block = block.border_style(Style::default().fg(Color::Cyan));
    } else {
        passphrase.set_cursor_style(Style::default().bg(Color::Reset));
    }
    passphrase.set_block(block);
    frame.render_widget(&passphrase, layout[1]);

    let (private, public) = match &state.generated {
        Some(key) => (key.private_key.clone(), key.public_key.clone()),
        None => (String::new(), String::new()),
    };
    frame.render_widget(
        Paragraph::new(private)
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL).title("Private Key")),
        layout[2],
    );
    frame.render_widget(
        Paragraph::new(public)
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(Color::Green))
            .block(Block::default().borders(Borders::ALL).title("Public Key")),
        layout[3],
    );

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "Tab: Next Field   ←/→: Change   Enter: Generate   Ctrl+S: Save   Esc/F2: Back",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::DIM),
        ))),
        layout[4],
    );
}
