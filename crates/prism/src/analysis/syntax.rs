//! Structural re-validation of what the parser recorded.
//!
//! The parser recovers from broken input and keeps going; this pass re-checks
//! the delimiter, comment and terminator summaries it left on each stage so
//! the result does not depend on how recovery went. Reports shared with the
//! parser come from [`prism_parser::report`] and collapse with the parser's
//! copies when the validator merges.

use log::trace;

use prism_core::{
    Diagnostic, DiagnosticCollector,
    ast::{CommentKind, Declaration, Delimiter, Stage, Stmt, Visitor, visit},
};
use prism_parser::report;

use super::{AnalysisContext, Analyzer, Pass};

pub struct SyntaxChecker;

impl Analyzer for SyntaxChecker {
    fn pass(&self) -> Pass {
        Pass::Syntax
    }

    fn analyze(&self, context: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = DiagnosticCollector::new();
        for stage in &context.program.stages {
            check_delimiters(&stage.delimiters, &mut diagnostics);
            check_comments(stage, &mut diagnostics);
            let mut terminators = Terminators {
                diagnostics: &mut diagnostics,
            };
            terminators.visit_stage(stage);
            trace!(label = stage.label.as_str(); "Checked stage structure");
        }
        diagnostics.finish()
    }
}

fn check_delimiters(delimiters: &[Delimiter], diagnostics: &mut DiagnosticCollector) {
    let mut open: Vec<&Delimiter> = Vec::new();
    for delimiter in delimiters {
        if delimiter.is_open {
            open.push(delimiter);
            continue;
        }
        match open.last() {
            None => diagnostics.emit(report::unmatched_delimiter(delimiter.kind, delimiter.span)),
            Some(top) if top.kind == delimiter.kind => {
                open.pop();
            }
            Some(top) => {
                diagnostics.emit(report::mismatched_delimiter(
                    top.kind,
                    top.span,
                    delimiter.kind,
                    delimiter.span,
                ));
                // A matching opener further down means the top one was never closed.
                if let Some(position) = open.iter().rposition(|d| d.kind == delimiter.kind) {
                    open.truncate(position);
                } else {
                    open.pop();
                }
            }
        }
    }
    for delimiter in open {
        diagnostics.emit(report::unclosed_delimiter(delimiter.kind, delimiter.span));
    }
}

fn check_comments(stage: &Stage, diagnostics: &mut DiagnosticCollector) {
    for comment in &stage.comments {
        if comment.kind == (CommentKind::Block { terminated: false }) {
            diagnostics.emit(report::unterminated_comment(comment.span));
        }
    }
}

struct Terminators<'d> {
    diagnostics: &'d mut DiagnosticCollector,
}

impl Visitor for Terminators<'_> {
    fn visit_declaration(&mut self, declaration: &Declaration) {
        if let Some(last) = declaration.missing_terminator {
            self.diagnostics.emit(report::missing_terminator(last));
        }
        visit::walk_declaration(self, declaration);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Some(last) = stmt.missing_terminator {
            self.diagnostics.emit(report::missing_terminator(last));
        }
        visit::walk_stmt(self, stmt);
    }
}

#[cfg(test)]
mod tests {
    use prism_core::DiagnosticCode;

    use super::*;
    use crate::analysis::test_support::{codes, run, spanned};

    #[test]
    fn test_balanced_program_is_clean() {
        let diagnostics = run(
            &SyntaxChecker,
            "/* header */\nvoid main() { float a[2]; a[0] = (1.0); }\n",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_unclosed_brace() {
        let source = "void main() {\n  float x = 1.0;\n";
        let diagnostics = run(&SyntaxChecker, source);

        assert_eq!(spanned(source, &diagnostics, DiagnosticCode::UnbalancedDelimiter), ["{"]);
        assert_eq!(diagnostics[0].message(), "unclosed `{`");
    }

    #[test]
    fn test_mismatched_closer_points_at_the_closer() {
        let source = "void main() { float x = (1.0]; }";
        let diagnostics = run(&SyntaxChecker, source);

        let mismatched: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.message().starts_with("mismatched"))
            .collect();
        assert_eq!(mismatched.len(), 1);
        assert_eq!(&source[mismatched[0].span().unwrap().range()], "]");
        assert_eq!(&source[mismatched[0].labels()[0].span().range()], "(");
    }

    #[test]
    fn test_stray_closer() {
        let source = "void main() { }\n}";
        let diagnostics = run(&SyntaxChecker, source);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message(), "unmatched closing `}`");
    }

    #[test]
    fn test_unterminated_comment() {
        let diagnostics = run(&SyntaxChecker, "void main() {}\n/* trailing");
        assert_eq!(codes(&diagnostics), [DiagnosticCode::UnterminatedComment]);
    }

    #[test]
    fn test_missing_terminator_matches_parser_report() {
        let source = "void main() {\n  float x = 1.0\n  x = 2.0;\n}";
        let output = prism_parser::parser_for(prism_core::ShaderFormat::CoreLanguage)
            .parse(source, &prism_parser::ParseOptions::default());
        let diagnostics = run(&SyntaxChecker, source);

        assert_eq!(spanned(source, &diagnostics, DiagnosticCode::MissingTerminator), ["1.0"]);
        let from_parser: Vec<_> = output
            .diagnostics
            .iter()
            .filter(|d| d.code() == DiagnosticCode::MissingTerminator)
            .collect();
        assert_eq!(from_parser, diagnostics.iter().collect::<Vec<_>>());
    }
}
