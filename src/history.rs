/// What the input line should show after a history key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryStep {
    /// Replace the input with this entry.
    Show(String),
    /// Clear the input; browsing has ended.
    Clear,
    /// Leave the input as it is.
    Unchanged,
}

/// Submitted commands for one input line, navigable with up/down.
#[derive(Debug, Clone, Default)]
pub struct CommandHistory {
    entries: Vec<String>,
    /// `None` while not browsing.
    cursor: Option<usize>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Record a submitted line. Empty lines are not kept; browsing always stops.
    pub fn on_submit(&mut self, text: &str) {
        if !text.is_empty() {
            self.entries.push(text.to_string());
        }
        self.cursor = None;
    }

    /// Move towards older entries.
    pub fn navigate_up(&mut self) -> HistoryStep {
        if self.entries.is_empty() {
            return HistoryStep::Unchanged;
        }
        let cursor = match self.cursor {
            None => self.entries.len() - 1,
            Some(c) => c.saturating_sub(1),
        };
        self.cursor = Some(cursor);
        HistoryStep::Show(self.entries[cursor].clone())
    }

    /// Move towards newer entries; past the newest the input is cleared.
    pub fn navigate_down(&mut self) -> HistoryStep {
        let next = match self.cursor {
            None => 0,
            Some(c) => c + 1,
        };
        if next < self.entries.len() {
            self.cursor = Some(next);
            HistoryStep::Show(self.entries[next].clone())
        } else {
            self.cursor = None;
            HistoryStep::Clear
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(entries: &[&str]) -> CommandHistory {
        let mut h = CommandHistory::new();
        for e in entries {
            h.on_submit(e);
        }
        h
    }

    #[test]
    fn test_up_up_down_down() {
        let mut h = history(&["ls", "pwd", "whoami"]);
        assert_eq!(h.cursor(), None);

        assert_eq!(h.navigate_up(), HistoryStep::Show("whoami".into()));
        assert_eq!(h.navigate_up(), HistoryStep::Show("pwd".into()));
        assert_eq!(h.navigate_down(), HistoryStep::Show("whoami".into()));
        assert_eq!(h.navigate_down(), HistoryStep::Clear);
        assert_eq!(h.cursor(), None);
    }

    #[test]
    fn test_up_stops_at_oldest() {
        let mut h = history(&["ls", "pwd"]);
        h.navigate_up();
        h.navigate_up();
        assert_eq!(h.navigate_up(), HistoryStep::Show("ls".into()));
        assert_eq!(h.cursor(), Some(0));
    }

    #[test]
    fn test_empty_history() {
        let mut h = CommandHistory::new();
        assert_eq!(h.navigate_up(), HistoryStep::Unchanged);
        assert_eq!(h.navigate_down(), HistoryStep::Clear);
        assert_eq!(h.cursor(), None);
    }

    #[test]
    fn test_down_without_browsing_starts_at_oldest() {
        let mut h = history(&["ls", "pwd"]);
        assert_eq!(h.navigate_down(), HistoryStep::Show("ls".into()));
    }

    #[test]
    fn test_submit_resets_cursor_and_skips_empty() {
        let mut h = history(&["ls"]);
        h.navigate_up();
        h.on_submit("");
        assert_eq!(h.cursor(), None);
        assert_eq!(h.entries(), &["ls".to_string()]);

        h.on_submit("uptime");
        assert_eq!(h.navigate_up(), HistoryStep::Show("uptime".into()));
    }
}
