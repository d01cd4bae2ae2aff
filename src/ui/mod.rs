//! Terminal output.
//!
//! - [`UserInterface`] trait for UI abstraction
//! - [`ConsoleUI`] writes to stdout/stderr
//! - [`MockUI`] captures output for tests

pub mod console;
pub mod mock;

pub use console::ConsoleUI;
pub use mock::MockUI;

/// Output verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Show status messages and results.
    #[default]
    Normal,
    /// Show results and errors only.
    Quiet,
}

impl OutputMode {
    /// Check if this mode shows status messages.
    pub fn shows_status(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// Abstraction over where command output goes.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Command result (documents, listings). Always shown.
    fn output(&mut self, text: &str);

    /// Informational status line.
    fn message(&mut self, msg: &str);

    /// Success status line.
    fn success(&mut self, msg: &str);

    /// Error line. Always shown.
    fn error(&mut self, msg: &str);
}
