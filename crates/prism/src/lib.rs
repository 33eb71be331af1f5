//! Prism - static validation for GLSL, ISF and MadMapper shaders.
//!
//! A [`Validator`] parses a [`ShaderDocument`] with the front end for its
//! dialect, runs the analyzer pipeline over the resulting program and returns
//! one [`AnalysisResult`]: every diagnostic in a stable order, static metrics
//! and the metadata the dialect declares.
//!
//! Problems in the shader are always diagnostics. [`PrismError`] is reserved
//! for configuration mistakes and internal defects.

pub mod analysis;
pub mod config;

mod document;
mod error;
mod result;

pub use prism_core::{
    Diagnostic, DiagnosticCode, Label, Severity, ShaderFormat, Span, ast, diagnostic, metadata, span,
};

pub use analysis::Pass;
pub use document::{AnalysisDepth, ShaderDocument, ValidationOptions};
pub use error::PrismError;
pub use result::{AnalysisResult, Metrics, Summary};

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    time::Instant,
};

use log::{debug, info, warn};
use rayon::prelude::*;
use regex::Regex;

use prism_core::DocumentMetadata;
use prism_parser::{ParseOptions, parser_for};

use analysis::{AnalysisContext, measure};
use config::AppConfig;

/// Stack reserved for each worker; analyzers recurse over expression trees
/// up to `limits.max_expression_height` levels.
const WORKER_STACK_BYTES: usize = 64 * 1024 * 1024;

/// Validates shader documents.
///
/// Built once from an [`AppConfig`]; every call to [`validate`](Self::validate)
/// is independent, so one validator can serve many threads.
///
/// # Examples
///
/// ```rust
/// use prism::{ShaderDocument, Validator, config::AppConfig};
///
/// let validator = Validator::new(AppConfig::default())?;
/// let document = ShaderDocument::new(
///     "glsl",
///     "#version 330\nout vec4 color;\nvoid main() { color = vec4(1.0); }",
/// );
///
/// let result = validator.validate(&document)?;
/// assert!(result.is_valid);
/// # Ok::<(), prism::PrismError>(())
/// ```
pub struct Validator {
    config: AppConfig,
    naming: Regex,
    pool: rayon::ThreadPool,
}

impl Validator {
    /// Create a validator with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Enabled passes, quality settings and resource limits
    ///
    /// # Errors
    ///
    /// Returns `PrismError` when the naming pattern is not a valid regular
    /// expression or the batch worker pool cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, PrismError> {
        let pattern = config.analysis().naming_pattern();
        let naming = Regex::new(pattern).map_err(|source| PrismError::InvalidNamingPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let threads = config.limits().max_concurrent();
        if threads == 0 {
            return Err(PrismError::ZeroPoolSize);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("prism-worker-{index}"))
            .stack_size(WORKER_STACK_BYTES)
            .build()?;

        debug!(threads = threads; "Validator ready");
        Ok(Self { config, naming, pool })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Validate one document.
    ///
    /// Work happens in a fixed order: size limit, empty check, format lookup,
    /// parsing, then each requested pass. The time budget is checked before
    /// every pass; when it runs out the remaining passes are skipped and a
    /// `VALIDATION_TIMEOUT` error joins the diagnostics already found.
    ///
    /// # Arguments
    ///
    /// * `document` - The shader text with its format tag and options
    ///
    /// # Errors
    ///
    /// Returns `PrismError` only for internal defects: a pass that panicked or
    /// a diagnostic pointing outside the document.
    pub fn validate(&self, document: &ShaderDocument) -> Result<AnalysisResult, PrismError> {
        self.pool.install(|| self.validate_on_worker(document))
    }

    /// The pipeline behind [`validate`](Self::validate), run on a pool thread.
    fn validate_on_worker(&self, document: &ShaderDocument) -> Result<AnalysisResult, PrismError> {
        let started = Instant::now();
        let deadline = started.checked_add(self.config.limits().timeout());
        let source = document.source();
        let options = document.options();

        let limit = self.config.limits().max_source_bytes();
        if source.len() > limit {
            return Ok(rejected(
                Diagnostic::error(
                    DiagnosticCode::SourceTooLarge,
                    format!("the source is {} bytes, above the limit of {limit}", source.len()),
                )
                .with_suggestion("split the shader or raise `limits.max_source_bytes`"),
            ));
        }
        if source.trim().is_empty() {
            return Ok(rejected(Diagnostic::error(
                DiagnosticCode::EmptySource,
                "the shader source is empty",
            )));
        }
        let format: ShaderFormat = match document.format().parse() {
            Ok(format) => format,
            Err(err) => {
                let known = ShaderFormat::ALL.map(|format| format!("`{format}`")).join(", ");
                return Ok(rejected(
                    Diagnostic::error(DiagnosticCode::UnsupportedFormat, err.to_string())
                        .with_suggestion(format!("use one of {known}")),
                ));
            }
        };

        let parse_options = ParseOptions {
            max_nesting_depth: self.config.limits().max_nesting_depth(),
            max_expression_height: self.config.limits().max_expression_height(),
        };
        let output = guarded("parse", || parser_for(format).parse(source, &parse_options))?;
        let mut diagnostics = output.diagnostics;

        let analysis = self.config.analysis();
        let context = AnalysisContext {
            program: &output.program,
            format,
            declared_version: document.declared_version(),
            complexity_threshold: analysis.complexity_threshold(),
            naming_pattern: &self.naming,
        };

        let mut passes = Vec::new();
        for pass in Pass::ALL {
            if !analysis.is_enabled(pass) || !options.requests(pass) {
                continue;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                let budget = self.config.limits().timeout_ms();
                warn!(pass = pass.name(), budget_ms = budget; "Validation budget exhausted");
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::ValidationTimeout,
                        format!("validation exceeded its {budget} ms budget before the {pass} pass"),
                    )
                    .with_suggestion("raise `limits.timeout_ms` or validate a smaller shader"),
                );
                break;
            }

            let found = guarded(pass.name(), || pass.analyzer().analyze(&context))?;
            debug!(pass = pass.name(), diagnostics = found.len(); "Pass finished");
            diagnostics.extend(found);
            passes.push(pass);
        }

        let metrics = measure(&output.program);
        if options.strict_mode {
            diagnostics = diagnostics.iter().map(Diagnostic::promoted).collect();
        }
        let mut diagnostics = result::merge(diagnostics);
        let is_valid = !diagnostics.iter().any(|d| d.severity().is_error());
        if !options.include_warnings {
            diagnostics.retain(|d| d.severity().is_error());
        }
        check_spans(&diagnostics, source.len())?;

        let summary = Summary::new(&diagnostics, passes);
        info!(
            format = format.name(),
            errors = summary.errors,
            valid = is_valid;
            "Validated document"
        );
        Ok(AnalysisResult {
            is_valid,
            diagnostics,
            metrics,
            metadata: output.metadata,
            summary,
        })
    }

    /// Validate many documents on the worker pool.
    ///
    /// Results come back in input order, one per document. A failure in one
    /// document never affects another.
    ///
    /// # Arguments
    ///
    /// * `documents` - The documents to validate
    pub fn validate_batch(&self, documents: &[ShaderDocument]) -> Vec<Result<AnalysisResult, PrismError>> {
        info!(documents = documents.len(); "Validating batch");
        self.pool
            .install(|| documents.par_iter().map(|document| self.validate_on_worker(document)).collect())
    }
}

/// The result for a document that never reached a parser.
fn rejected(diagnostic: Diagnostic) -> AnalysisResult {
    let diagnostics = vec![diagnostic];
    AnalysisResult {
        is_valid: false,
        summary: Summary::new(&diagnostics, Vec::new()),
        diagnostics,
        metrics: Metrics::default(),
        metadata: DocumentMetadata::None,
    }
}

/// Run one stage of the pipeline, turning a panic into an error for this
/// document only.
fn guarded<T>(stage: &str, work: impl FnOnce() -> T) -> Result<T, PrismError> {
    panic::catch_unwind(AssertUnwindSafe(work)).map_err(|payload| PrismError::PassPanicked {
        pass: stage.to_string(),
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Every span a diagnostic carries must lie inside the document.
fn check_spans(diagnostics: &[Diagnostic], len: usize) -> Result<(), PrismError> {
    for diagnostic in diagnostics {
        for span in diagnostic.spans() {
            let range = span.range();
            if range.start > range.end || range.end > len {
                return Err(PrismError::SpanOutOfBounds {
                    code: diagnostic.code(),
                    range,
                    len,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use prism_core::LineIndex;

    use super::*;
    use crate::config::{AnalysisConfig, LimitsConfig};

    #[test]
    fn test_invalid_naming_pattern() {
        let config = AppConfig::new(AnalysisConfig::new(Pass::ALL.to_vec(), 10, "("), LimitsConfig::default());

        let err = Validator::new(config).err().unwrap();
        assert!(matches!(err, PrismError::InvalidNamingPattern { .. }));
        assert!(!err.is_invariant_violation());
    }

    #[test]
    fn test_zero_pool_size() {
        let config = AppConfig::new(AnalysisConfig::default(), LimitsConfig::new(1000, 0, 1024));

        assert!(matches!(Validator::new(config), Err(PrismError::ZeroPoolSize)));
    }

    #[test]
    fn test_guarded_reports_panics() {
        let err = guarded("flow", || -> u32 { panic!("boom") }).unwrap_err();

        assert!(err.is_invariant_violation());
        assert_eq!(err.to_string(), "the flow pass panicked: boom");
    }

    #[test]
    fn test_check_spans_rejects_out_of_bounds() {
        let index = LineIndex::new("void main() {}");
        let inside = Diagnostic::error(DiagnosticCode::SyntaxError, "a").with_span(index.span(0..4));
        let outside = Diagnostic::error(DiagnosticCode::SyntaxError, "b").with_span(index.span(0..14));

        assert!(check_spans(&[inside.clone()], 14).is_ok());
        assert!(matches!(
            check_spans(&[inside, outside], 10),
            Err(PrismError::SpanOutOfBounds { len: 10, .. })
        ));
    }

    #[test]
    fn test_disabled_pass_never_runs() {
        let config = AppConfig::new(
            AnalysisConfig::new(vec![Pass::Syntax, Pass::Semantic], 10, "^[a-z_][a-zA-Z0-9_]*$"),
            LimitsConfig::default(),
        );
        let validator = Validator::new(config).unwrap();
        let result = validator
            .validate(&ShaderDocument::new("glsl", "void main() { return; float x = 1.0; }"))
            .unwrap();

        assert_eq!(result.summary.passes, [Pass::Syntax, Pass::Semantic]);
        assert!(result.diagnostics.is_empty());
    }
}
