//! Issue collection for a sensitivity study run.
//!
//! Pipeline stages record recoverable problems here (a corrected permanent
//! limit, a branch without limits, an unconverged case) instead of failing.
//! The collected issues come back with the pipeline output and are logged at
//! the end of a run.
//!
//! # Example
//!
//! ```
//! use gridsens_core::diagnostics::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("limits", "branch has no current limits", "L1");
//! diag.add_error("structure", "Network has no generators");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert!(diag.has_errors());
//! assert_eq!(diag.summary(), "1 warning, 1 error");
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Value corrected or element skipped, run continued
    Warning,
    /// The network or a case is unusable as given
    Error,
}

#[derive(Debug, Clone)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Stage that raised the issue ("limits", "load_flow", "structure", ...)
    pub category: String,
    pub message: String,
    /// Element or case id the issue refers to
    pub entity: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, severity: Severity, category: &str, message: &str, entity: Option<&str>) {
        self.issues.push(DiagnosticIssue {
            severity,
            category: category.to_string(),
            message: message.to_string(),
            entity: entity.map(str::to_string),
        });
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.push(Severity::Warning, category, message, None);
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.push(Severity::Warning, category, message, Some(entity));
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.push(Severity::Error, category, message, None);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// "2 warnings, 1 error", or "No issues".
    pub fn summary(&self) -> String {
        fn plural(n: usize, word: &str) -> String {
            format!("{} {}{}", n, word, if n == 1 { "" } else { "s" })
        }
        match (self.warning_count(), self.errors().count()) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => plural(w, "warning"),
            (0, e) => plural(e, "error"),
            (w, e) => format!("{}, {}", plural(w, "warning"), plural(e, "error")),
        }
    }
}
