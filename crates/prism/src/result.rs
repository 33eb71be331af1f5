//! The serializable outcome of one validation.

use std::{cmp::Ordering, collections::HashSet};

use serde::Serialize;

use prism_core::{Diagnostic, DocumentMetadata, Severity};

use crate::analysis::Pass;

/// Everything the validator reports about one document.
///
/// Contains no timing data, so validating the same document twice yields an
/// identical serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// True iff no error-severity diagnostic was found.
    pub is_valid: bool,
    /// Ordered by span (document-level first), then severity, code and message.
    pub diagnostics: Vec<Diagnostic>,
    pub metrics: Metrics,
    pub metadata: DocumentMetadata,
    pub summary: Summary,
}

impl AnalysisResult {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity().is_error())
    }
}

/// Static measurements of the program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    /// One plus every decision point in the program.
    pub cyclomatic_complexity: u32,
    /// Weighted operation count with loop bodies scaled by their trip count.
    pub instruction_estimate: u64,
    pub texture_lookup_count: u32,
    /// Distinct uniform names, host-provided uniforms included.
    pub uniform_count: u32,
    pub max_nesting_depth: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    /// Passes that ran to completion, in pipeline order.
    pub passes: Vec<Pass>,
}

impl Summary {
    pub fn new(diagnostics: &[Diagnostic], passes: Vec<Pass>) -> Self {
        let count = |severity: Severity| {
            diagnostics
                .iter()
                .filter(|d| d.severity() == severity)
                .count()
        };
        Self {
            errors: count(Severity::Error),
            warnings: count(Severity::Warning),
            infos: count(Severity::Info),
            passes,
        }
    }
}

/// The canonical diagnostic order. Codes compare alphabetically.
pub(crate) fn compare(a: &Diagnostic, b: &Diagnostic) -> Ordering {
    let position = |d: &Diagnostic| d.span().map(|span| (span.start().offset, span.end().offset));
    position(a)
        .cmp(&position(b))
        .then(a.severity().cmp(&b.severity()))
        .then_with(|| a.code().as_str().cmp(b.code().as_str()))
        .then_with(|| a.message().cmp(b.message()))
}

/// Drop exact duplicates, keeping the first, and sort.
pub(crate) fn merge(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Diagnostic> = diagnostics
        .into_iter()
        .filter(|diagnostic| seen.insert(diagnostic.clone()))
        .collect();
    merged.sort_by(compare);
    merged
}

#[cfg(test)]
mod tests {
    use prism_core::{DiagnosticCode, LineIndex};

    use super::*;

    #[test]
    fn test_merge_orders_by_span_then_severity() {
        let index = LineIndex::new("float a; float b;");
        let late_error = Diagnostic::error(DiagnosticCode::TypeMismatch, "late").with_span(index.span(15..16));
        let early_info = Diagnostic::info(DiagnosticCode::DeadStore, "early").with_span(index.span(6..7));
        let early_warning =
            Diagnostic::warning(DiagnosticCode::UnreachableCode, "early").with_span(index.span(6..7));
        let early_error = Diagnostic::error(DiagnosticCode::UndefinedReference, "early").with_span(index.span(6..7));
        let document = Diagnostic::error(DiagnosticCode::MissingEntryPoint, "no main");

        let merged = merge(vec![
            late_error.clone(),
            early_info.clone(),
            early_warning.clone(),
            document.clone(),
            early_error.clone(),
        ]);

        assert_eq!(merged, [document, early_error, early_warning, early_info, late_error]);
    }

    #[test]
    fn test_merge_drops_identical_diagnostics() {
        let index = LineIndex::new("/* open");
        let comment = Diagnostic::error(DiagnosticCode::UnterminatedComment, "block comment is never closed")
            .with_span(index.span(0..7));

        let merged = merge(vec![comment.clone(), comment.clone()]);
        assert_eq!(merged, [comment]);
    }

    #[test]
    fn test_equal_spans_order_by_code() {
        let index = LineIndex::new("x");
        let b = Diagnostic::error(DiagnosticCode::UseBeforeInit, "m").with_span(index.span(0..1));
        let a = Diagnostic::error(DiagnosticCode::UndefinedReference, "m").with_span(index.span(0..1));

        let merged = merge(vec![b.clone(), a.clone()]);
        assert_eq!(merged, [a, b]);
    }

    #[test]
    fn test_summary_counts() {
        let diagnostics = [
            Diagnostic::error(DiagnosticCode::SyntaxError, "a"),
            Diagnostic::warning(DiagnosticCode::InfiniteLoop, "b"),
            Diagnostic::warning(DiagnosticCode::DeadStore, "c"),
        ];
        let summary = Summary::new(&diagnostics, vec![Pass::Syntax]);

        assert_eq!((summary.errors, summary.warnings, summary.infos), (1, 2, 0));
        assert_eq!(summary.passes, [Pass::Syntax]);
    }
}
