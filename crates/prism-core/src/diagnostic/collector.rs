//! Collector for accumulating diagnostics during a processing phase.
//!
//! The [`DiagnosticCollector`] lets a phase report every problem it finds
//! instead of stopping at the first one.

use crate::diagnostic::Diagnostic;

/// A collector for accumulating diagnostics during a processing phase.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    has_errors: bool,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a diagnostic to this collector.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity().is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Emit every diagnostic from an iterator.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.emit(diagnostic);
        }
    }

    /// Whether any error-severity diagnostic was emitted.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Finish collection, returning every diagnostic in emission order.
    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;

    #[test]
    fn test_collector_new_is_empty() {
        let collector = DiagnosticCollector::new();

        assert!(collector.is_empty());
        assert!(!collector.has_errors());
        assert!(collector.finish().is_empty());
    }

    #[test]
    fn test_collector_tracks_errors() {
        let mut collector = DiagnosticCollector::new();

        collector.emit(Diagnostic::warning(DiagnosticCode::UnknownDirective, "w"));
        assert!(!collector.has_errors());

        collector.emit(Diagnostic::error(DiagnosticCode::SyntaxError, "e"));
        assert!(collector.has_errors());
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_collector_preserves_order() {
        let mut collector = DiagnosticCollector::new();

        collector.extend([
            Diagnostic::error(DiagnosticCode::SyntaxError, "first"),
            Diagnostic::info(DiagnosticCode::DeadStore, "second"),
        ]);

        let diagnostics = collector.finish();
        assert_eq!(diagnostics[0].message(), "first");
        assert_eq!(diagnostics[1].message(), "second");
    }
}
