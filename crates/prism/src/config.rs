//! Configuration types for the Prism validator.
//!
//! All types implement [`serde::Deserialize`] so a host can load them from
//! TOML or JSON. Every field has a default, so a partial file is enough.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining analysis and limit settings.
//! - [`AnalysisConfig`] - Which passes may run and how the quality pass judges code.
//! - [`LimitsConfig`] - Per-document resource bounds and the batch pool size.
//!
//! # Example
//!
//! ```
//! # use prism::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.analysis().complexity_threshold(), 10);
//! assert_eq!(config.limits().max_concurrent(), 4);
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::analysis::Pass;

/// Top-level configuration, constructed once and handed to
/// [`Validator::new`](crate::Validator::new).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Analysis configuration section.
    #[serde(default)]
    analysis: AnalysisConfig,

    /// Resource limit section.
    #[serde(default)]
    limits: LimitsConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    ///
    /// # Arguments
    ///
    /// * `analysis` - Enabled passes and quality settings.
    /// * `limits` - Time, size and concurrency bounds.
    pub fn new(analysis: AnalysisConfig, limits: LimitsConfig) -> Self {
        Self { analysis, limits }
    }

    /// Returns the analysis configuration.
    pub fn analysis(&self) -> &AnalysisConfig {
        &self.analysis
    }

    /// Returns the limits configuration.
    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }
}

/// The `[analysis]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Passes a document may request. A pass missing here never runs.
    enabled: Vec<Pass>,

    /// Per-function cyclomatic complexity above which `HIGH_COMPLEXITY` fires.
    complexity_threshold: u32,

    /// Regular expression that local, parameter and function names must match.
    naming_pattern: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: Pass::ALL.to_vec(),
            complexity_threshold: 10,
            naming_pattern: "^[a-z_][a-zA-Z0-9_]*$".to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn new(enabled: Vec<Pass>, complexity_threshold: u32, naming_pattern: impl Into<String>) -> Self {
        Self {
            enabled,
            complexity_threshold,
            naming_pattern: naming_pattern.into(),
        }
    }

    pub fn enabled(&self) -> &[Pass] {
        &self.enabled
    }

    pub fn is_enabled(&self, pass: Pass) -> bool {
        self.enabled.contains(&pass)
    }

    pub fn complexity_threshold(&self) -> u32 {
        self.complexity_threshold
    }

    pub fn naming_pattern(&self) -> &str {
        &self.naming_pattern
    }
}

/// The `[limits]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Wall-clock budget for the whole pipeline of one document.
    timeout_ms: u64,

    /// Worker threads used by [`Validator::validate_batch`](crate::Validator::validate_batch).
    max_concurrent: usize,

    /// Documents larger than this are rejected with `SOURCE_TOO_LARGE`.
    max_source_bytes: usize,

    /// How deeply statements and expressions may nest.
    max_nesting_depth: usize,

    /// How many levels one expression may have, operator chains included.
    max_expression_height: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_concurrent: 4,
            max_source_bytes: 1024 * 1024,
            max_nesting_depth: 64,
            max_expression_height: 1024,
        }
    }
}

impl LimitsConfig {
    pub fn new(timeout_ms: u64, max_concurrent: usize, max_source_bytes: usize) -> Self {
        Self {
            timeout_ms,
            max_concurrent,
            max_source_bytes,
            ..Self::default()
        }
    }

    /// Returns a copy with a different nesting limit.
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Returns a copy with a different expression height limit.
    pub fn with_max_expression_height(mut self, height: usize) -> Self {
        self.max_expression_height = height;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn max_source_bytes(&self) -> usize {
        self.max_source_bytes
    }

    pub fn max_nesting_depth(&self) -> usize {
        self.max_nesting_depth
    }

    pub fn max_expression_height(&self) -> usize {
        self.max_expression_height
    }
}
