//! Error types for Prism operations.
//!
//! Problems in a submitted shader are never errors: they are diagnostics in
//! the [`AnalysisResult`](crate::AnalysisResult). [`PrismError`] covers the two
//! remaining cases, a configuration the validator cannot be built from and
//! an internal invariant violation that aborts a single validation.

use std::ops::Range;

use thiserror::Error;

use prism_core::DiagnosticCode;

/// The main error type for Prism operations.
#[derive(Debug, Error)]
pub enum PrismError {
    #[error("invalid naming pattern `{pattern}`: {source}")]
    InvalidNamingPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("the worker pool needs at least one thread")]
    ZeroPoolSize,

    #[error("failed to build the worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    #[error("{code} diagnostic points at {range:?}, outside the {len}-byte document")]
    SpanOutOfBounds {
        code: DiagnosticCode,
        range: Range<usize>,
        len: usize,
    },

    #[error("the {pass} pass panicked: {message}")]
    PassPanicked { pass: String, message: String },
}

impl PrismError {
    /// Whether this error is an internal defect rather than a configuration problem.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            PrismError::SpanOutOfBounds { .. } | PrismError::PassPanicked { .. }
        )
    }
}
