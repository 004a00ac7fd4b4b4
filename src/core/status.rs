//! The single redrawn status line shown under the log while watching.

use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::{IsTerminal, Write, stdout};

use crate::logger::Log;

/// Redraws one line in place on a terminal. Does nothing when stdout is not a
/// terminal or output goes to a log file.
pub struct StatusLine {
    enabled: bool,
    visible: bool,
    last: Option<String>,
}

impl StatusLine {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            visible: false,
            last: None,
        }
    }

    /// Enabled only for an interactive stdout with logging on.
    pub fn for_terminal() -> Self {
        Self::new(stdout().is_terminal() && Log::is_enabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Text most recently drawn.
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    pub fn draw(&mut self, text: &str) {
        if !self.enabled {
            return;
        }
        if self.visible && self.last.as_deref() == Some(text) {
            return;
        }

        let mut out = stdout();
        let drawn = execute!(
            out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(format!("┃ {text}"))
        )
        .and_then(|_| out.flush());

        if drawn.is_ok() {
            self.visible = true;
            self.last = Some(text.to_string());
        }
    }

    /// Remove the line so regular log output can take its place.
    pub fn clear(&mut self) {
        if !self.enabled || !self.visible {
            return;
        }
        let mut out = stdout();
        let _ = execute!(out, MoveToColumn(0), Clear(ClearType::CurrentLine));
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_line_never_draws() {
        let mut line = StatusLine::new(false);
        line.draw("Starts in 00h:10m:00s | night 12%");
        assert_eq!(line.last(), None);
        line.clear();
        assert!(!line.is_enabled());
    }
}
