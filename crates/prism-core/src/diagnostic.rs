//! The diagnostic model shared by every parser and analyzer.
//!
//! A [`Diagnostic`] represents a single reported issue: a severity, a stable
//! [`DiagnosticCode`], a message, an optional primary span (absent for
//! document-level issues), secondary labels and ordered fix suggestions.
//!
//! Diagnostics are built once through the builder methods and never mutated
//! afterwards; transformations such as [`Diagnostic::promoted`] return a new
//! value.

mod code;
mod collector;
mod label;
mod severity;

use std::fmt;

use serde::Serialize;

pub use code::DiagnosticCode;
pub use collector::DiagnosticCollector;
pub use label::Label;
pub use severity::Severity;

use crate::span::Span;

/// A single reported issue with its source location.
///
/// # Example
///
/// ```text
/// error[UNDEFINED_REFERENCE]: use of undeclared identifier `foo`
///   --> shader.frag:4:12
///    |
///  4 |     color = foo * 2.0;
///    |             ^^^
///    = help: declare `foo` before using it
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    severity: Severity,
    code: DiagnosticCode,
    message: String,
    span: Option<Span>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<Label>,
    suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    ///
    /// # Example
    ///
    /// ```
    /// # use prism_core::{Diagnostic, DiagnosticCode, LineIndex};
    /// let index = LineIndex::new("x = foo;");
    /// let diag = Diagnostic::error(DiagnosticCode::UndefinedReference, "use of undeclared identifier `foo`")
    ///     .with_span(index.span(4..7))
    ///     .with_suggestion("declare `foo` before using it");
    /// assert!(diag.severity().is_error());
    /// ```
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Create an info diagnostic.
    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    /// Create a diagnostic with an explicit severity.
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            span: None,
            labels: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> DiagnosticCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The primary location; `None` for document-level issues.
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Set the primary span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Add a secondary label pointing at related source.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::new(span, message));
        self
    }

    /// Append a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// A copy with warnings raised to errors, used by strict mode.
    pub fn promoted(&self) -> Self {
        let mut promoted = self.clone();
        if promoted.severity.is_warning() {
            promoted.severity = Severity::Error;
        }
        promoted
    }

    /// Every span this diagnostic refers to, primary first.
    pub fn spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.span
            .into_iter()
            .chain(self.labels.iter().map(Label::span))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "error[CODE]: message"
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

impl std::error::Error for Diagnostic {}
