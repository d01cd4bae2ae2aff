//! Plain stdout/stderr UI.

use super::{OutputMode, UserInterface};

/// Results go to stdout, diagnostics to stderr.
pub struct ConsoleUI {
    mode: OutputMode,
}

impl ConsoleUI {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }
}

impl UserInterface for ConsoleUI {
    fn output(&mut self, text: &str) {
        println!("{}", text.trim_end_matches('\n'));
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            eprintln!("{}", msg);
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            eprintln!("✓ {}", msg);
        }
    }

    fn error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }
}
