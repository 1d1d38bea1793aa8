//! Colored status lines on stderr.

use console::{Style, Term};

/// Status line printer for CLI commands.
pub(crate) struct Output {
    term: Term,
    success: Style,
    warning: Style,
    error: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        self.write(msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.write(&self.success.apply_to(msg).to_string());
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.write(&self.warning.apply_to(msg).to_string());
    }

    pub(crate) fn error(&self, msg: &str) {
        self.write(&self.error.apply_to(msg).to_string());
    }

    /// Write one line, ignoring a closed stderr.
    fn write(&self, line: &str) {
        let _ = self.term.write_line(line);
    }
}
