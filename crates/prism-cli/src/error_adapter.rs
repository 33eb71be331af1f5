//! Adapters that let miette render validator diagnostics and CLI errors.
//!
//! Every diagnostic in an [`AnalysisResult`] becomes its own reportable,
//! rendered against the document it was found in. Errors that carry no
//! source location are wrapped in [`ErrorAdapter`].

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use prism::{AnalysisResult, Diagnostic, Severity, Span};

use crate::error::CliError;

/// Adapter for a single validator diagnostic.
pub struct DiagnosticAdapter<'a> {
    /// The wrapped diagnostic
    diag: &'a Diagnostic,
    /// Source code for displaying snippets
    src: &'a str,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter.
    pub fn new(diag: &'a Diagnostic, src: &'a str) -> Self {
        Self { diag, src }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.diag.code()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.diag.severity() {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Info => miette::Severity::Advice,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let suggestions = self.diag.suggestions();
        if suggestions.is_empty() {
            return None;
        }
        Some(Box::new(suggestions.join("\n")))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.diag
            .span()
            .map(|_| &self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let primary = self.diag.span()?;

        let secondary = self.diag.labels().iter().map(|label| {
            LabeledSpan::new_with_span(Some(label.message().to_string()), span_to_miette(label.span()))
        });
        Some(Box::new(
            std::iter::once(LabeledSpan::new_primary_with_span(None, span_to_miette(primary)))
                .chain(secondary),
        ))
    }
}

/// Adapter for errors without source information.
pub struct ErrorAdapter<'a>(pub &'a CliError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            CliError::Io(_) | CliError::Read { .. } => "prism::io",
            CliError::ConfigParse(_) | CliError::MissingConfig(_) => "prism::config",
            CliError::UnknownFormat(_) => "prism::format",
            CliError::Render(_) | CliError::Json(_) => "prism::output",
            CliError::Validator(_) => "prism::internal",
            CliError::Invalid { .. } => "prism::invalid",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            CliError::UnknownFormat(_) => {
                Some(Box::new("use one of `glsl`, `isf`, `madmapper`") as Box<dyn fmt::Display>)
            }
            _ => None,
        }
    }
}

/// Convert a [`SourceSpan`] from a validator [`Span`].
fn span_to_miette(span: Span) -> SourceSpan {
    SourceSpan::new(span.start().offset.into(), span.len())
}

/// One reportable per diagnostic in `result`, in result order.
pub fn to_reportables<'a>(result: &'a AnalysisResult, src: &'a str) -> Vec<DiagnosticAdapter<'a>> {
    result
        .diagnostics
        .iter()
        .map(|diag| DiagnosticAdapter::new(diag, src))
        .collect()
}

#[cfg(test)]
mod tests {
    use prism::{DiagnosticCode, span::LineIndex};

    use super::*;

    #[test]
    fn test_primary_span_comes_first() {
        let index = LineIndex::new("float x; float x;");
        let diag = Diagnostic::error(DiagnosticCode::Redefinition, "`x` is declared twice")
            .with_span(index.span(15..16))
            .with_label(index.span(6..7), "first declared here");

        let adapter = DiagnosticAdapter::new(&diag, "float x; float x;");

        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].primary());
        assert_eq!(labels[0].offset(), 15);
        assert!(!labels[1].primary());
        assert_eq!(labels[1].label(), Some("first declared here"));
    }

    #[test]
    fn test_document_level_diagnostic_has_no_snippet() {
        let diag = Diagnostic::warning(DiagnosticCode::MissingVersion, "no `#version` directive")
            .with_suggestion("add `#version 110` as the first line");

        let adapter = DiagnosticAdapter::new(&diag, "void main() {}");

        assert!(adapter.labels().is_none());
        assert!(adapter.source_code().is_none());
        assert_eq!(adapter.severity(), Some(miette::Severity::Warning));
        assert_eq!(adapter.code().unwrap().to_string(), "MISSING_VERSION");
        assert_eq!(adapter.help().unwrap().to_string(), "add `#version 110` as the first line");
    }

    #[test]
    fn test_error_adapter_code() {
        let err = CliError::UnknownFormat("shader.txt".to_string());
        let adapter = ErrorAdapter(&err);

        assert_eq!(adapter.code().unwrap().to_string(), "prism::format");
        assert!(adapter.help().is_some());
    }
}
