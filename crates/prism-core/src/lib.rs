//! Core types for the Prism shader validator.
//!
//! This crate holds the vocabulary every other Prism crate speaks:
//!
//! - [`span`]: source positions, spans and the [`LineIndex`] that resolves them
//! - [`diagnostic`]: severities, stable codes and the [`Diagnostic`] builder
//! - [`ast`]: the dialect-neutral [`Program`](ast::Program) and its [`Visitor`](ast::Visitor)
//! - [`metadata`]: dialect-specific facts returned to callers
//! - [`format`]: the closed set of supported dialects

pub mod ast;
pub mod diagnostic;
pub mod format;
pub mod metadata;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticCollector, Label, Severity};
pub use format::{ShaderFormat, UnknownFormat};
pub use metadata::DocumentMetadata;
pub use span::{LineIndex, Position, Span, Spanned};
