//! Display sink for the interaction states
//!
//! States only ever replace or append text; how it is drawn is up to the
//! implementation.

use std::io::{self, Stdout, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use tracing::warn;

/// Write-only text target owned by the active state
pub trait Display {
    /// Replace everything on screen with `text`
    fn show(&mut self, text: &str);

    /// Add `text` below what is already shown
    fn append(&mut self, text: &str);

    fn clear(&mut self) {
        self.show("");
    }
}

/// Green-on-black full screen terminal renderer
pub struct TerminalDisplay {
    out: Stdout,
    lines: Vec<String>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            lines: Vec::new(),
        }
    }

    fn render(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            Clear(ClearType::All),
            MoveTo(0, 0),
            SetForegroundColor(Color::Green)
        )?;
        for line in &self.lines {
            // Raw mode needs an explicit carriage return
            queue!(self.out, Print(line), Print("\r\n"))?;
        }
        queue!(self.out, ResetColor)?;
        self.out.flush()
    }

    fn redraw(&mut self) {
        if let Err(e) = self.render() {
            warn!(?e, "failed to draw display");
        }
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TerminalDisplay {
    fn show(&mut self, text: &str) {
        self.lines = split_lines(text);
        self.redraw();
    }

    fn append(&mut self, text: &str) {
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.extend(split_lines(text));
        }
        self.redraw();
    }
}

fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(str::to_string).collect()
}
