//! Accumulating report sink for a run.
//!
//! Recoverable issues (parse errors, duplicate ids, length violations) are
//! collected here instead of aborting the run, so every problem in a content
//! directory surfaces in one pass. The engine never stops because the
//! reporter holds errors; whether to proceed to the write phase is the
//! caller's decision.

/// Collects warnings and errors during the check phase.
#[derive(Debug, Default)]
pub struct Reporter {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Drain everything to the console: warnings to stdout, errors to stderr.
    pub fn print(&self) {
        for warning in &self.warnings {
            println!("warning: {}", warning);
        }
        for error in &self.errors {
            eprintln!("error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reporter_has_no_errors() {
        let reporter = Reporter::new();
        assert!(!reporter.has_errors());
        assert!(reporter.warnings().is_empty());
    }

    #[test]
    fn test_collects_in_order() {
        let mut reporter = Reporter::new();
        reporter.add_error("first");
        reporter.add_error("second");
        reporter.add_warning("soft");
        assert!(reporter.has_errors());
        assert_eq!(reporter.errors(), &["first", "second"]);
        assert_eq!(reporter.warnings(), &["soft"]);
    }
}
