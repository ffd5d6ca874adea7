//! Colored terminal output for build progress.

use std::fmt::Display;
use std::path::Path;

use console::{Style, Term};

/// Build reporter writing to stderr.
pub(crate) struct Output {
    term: Term,
    label: Style,
    notice: Style,
    done: Style,
    failure: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            label: Style::new().cyan().bold(),
            notice: Style::new().yellow(),
            done: Style::new().green(),
            failure: Style::new().red(),
        }
    }

    /// Print the source and output directories of a build.
    pub(crate) fn build_paths(&self, input: &Path, output: &Path) {
        self.line(format!("{} {}", self.label.apply_to("Source:"), input.display()));
        self.line(format!("{} {}", self.label.apply_to("Output:"), output.display()));
    }

    /// Note that failing macros are annotated rather than fatal.
    pub(crate) fn keep_going(&self) {
        self.line(
            self.notice
                .apply_to("Keep-going mode: failing macros are annotated in the output")
                .to_string(),
        );
    }

    /// Print the counts of a finished build.
    pub(crate) fn finished(&self, directories: usize, expanded: usize, copied: usize, output: &Path) {
        let msg = format!(
            "Built {} ({directories} directories, {expanded} expanded, {copied} copied)",
            output.display()
        );
        self.line(self.done.apply_to(msg).to_string());
    }

    /// Print a fatal error.
    pub(crate) fn error(&self, err: &dyn Display) {
        self.line(self.failure.apply_to(format!("Error: {err}")).to_string());
    }

    fn line(&self, text: String) {
        let _ = self.term.write_line(&text);
    }
}
