//! Diagnostics that both the parser and the syntax checker produce.
//!
//! Building them in one place keeps the two reports byte-identical, so the
//! orchestrator's de-duplication collapses them into one.

use prism_core::{Diagnostic, DiagnosticCode, Span, ast::DelimiterKind};

pub fn unterminated_comment(span: Span) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::UnterminatedComment,
        "block comment is never closed",
    )
    .with_span(span)
    .with_suggestion("add `*/` to close the comment")
}

/// `last` is the final token of the statement or declaration.
pub fn missing_terminator(last: Span) -> Diagnostic {
    Diagnostic::error(DiagnosticCode::MissingTerminator, "expected `;` after this")
        .with_span(last)
        .with_suggestion("add `;`")
}

pub fn unclosed_delimiter(kind: DelimiterKind, open: Span) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::UnbalancedDelimiter,
        format!("unclosed `{}`", kind.open_char()),
    )
    .with_span(open)
    .with_suggestion(format!("add a matching `{}`", kind.close_char()))
}

pub fn unmatched_delimiter(kind: DelimiterKind, close: Span) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::UnbalancedDelimiter,
        format!("unmatched closing `{}`", kind.close_char()),
    )
    .with_span(close)
}

pub fn mismatched_delimiter(
    open_kind: DelimiterKind,
    open: Span,
    close_kind: DelimiterKind,
    close: Span,
) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::UnbalancedDelimiter,
        format!(
            "mismatched closing `{}`; expected `{}`",
            close_kind.close_char(),
            open_kind.close_char()
        ),
    )
    .with_span(close)
    .with_label(open, format!("`{}` opened here", open_kind.open_char()))
}
