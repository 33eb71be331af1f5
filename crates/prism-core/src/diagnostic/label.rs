//! Secondary source locations attached to a diagnostic.

use serde::Serialize;

use crate::span::Span;

/// A note pointing at a related location, such as "first declared here".
///
/// The main location of a diagnostic is its own span; labels only add context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Label {
    span: Span,
    message: String,
}

impl Label {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }

    /// Get the span this label applies to.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Get the label message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
