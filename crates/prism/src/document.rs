//! The unit of validation.

use serde::{Deserialize, Serialize};

use crate::analysis::Pass;

/// One shader submitted for validation.
///
/// The format is kept as the tag the caller sent, so an unknown dialect
/// reaches the validator and is reported as `UNSUPPORTED_FORMAT`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShaderDocument {
    format: String,
    source: String,
    #[serde(default)]
    declared_version: Option<String>,
    #[serde(default)]
    options: ValidationOptions,
}

impl ShaderDocument {
    /// A document with default options.
    ///
    /// # Arguments
    ///
    /// * `format` - A dialect tag such as `glsl`, `isf` or `madmapper`
    /// * `source` - The complete document text
    pub fn new(format: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            source: source.into(),
            declared_version: None,
            options: ValidationOptions::default(),
        }
    }

    /// The language version to assume when the source carries no `#version`,
    /// e.g. `330` or `300 es`.
    pub fn with_declared_version(mut self, version: impl Into<String>) -> Self {
        self.declared_version = Some(version.into());
        self
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn declared_version(&self) -> Option<&str> {
        self.declared_version.as_deref()
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }
}

/// How far analysis goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    /// Syntax and semantic checks.
    Basic,
    /// Adds control/data flow and portability.
    Standard,
    /// Every pass.
    #[default]
    Full,
}

impl AnalysisDepth {
    /// The passes this depth runs, in pipeline order.
    pub fn passes(&self) -> &'static [Pass] {
        match self {
            AnalysisDepth::Basic => &[Pass::Syntax, Pass::Semantic],
            AnalysisDepth::Standard => &[Pass::Syntax, Pass::Semantic, Pass::Flow, Pass::Portability],
            AnalysisDepth::Full => &Pass::ALL,
        }
    }
}

/// Per-document switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Report every warning as an error.
    pub strict_mode: bool,
    /// When false, warnings and notes are left out of the result. They still
    /// count toward validity in strict mode.
    pub include_warnings: bool,
    pub analysis_depth: AnalysisDepth,
    /// Restricts the passes further; `None` runs everything the depth allows.
    pub analyzers: Option<Vec<Pass>>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            include_warnings: true,
            analysis_depth: AnalysisDepth::Full,
            analyzers: None,
        }
    }
}

impl ValidationOptions {
    /// Whether `pass` is requested by these options.
    pub fn requests(&self, pass: Pass) -> bool {
        self.analysis_depth.passes().contains(&pass)
            && self
                .analyzers
                .as_ref()
                .is_none_or(|subset| subset.contains(&pass))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_passes_nest() {
        assert_eq!(AnalysisDepth::Basic.passes(), [Pass::Syntax, Pass::Semantic]);
        assert!(AnalysisDepth::Standard.passes().contains(&Pass::Portability));
        assert!(!AnalysisDepth::Standard.passes().contains(&Pass::Quality));
        assert_eq!(AnalysisDepth::Full.passes(), Pass::ALL);
    }

    #[test]
    fn test_requests_intersects_depth_and_subset() {
        let options = ValidationOptions {
            analysis_depth: AnalysisDepth::Standard,
            analyzers: Some(vec![Pass::Flow, Pass::Quality]),
            ..ValidationOptions::default()
        };

        assert!(options.requests(Pass::Flow));
        assert!(!options.requests(Pass::Quality));
        assert!(!options.requests(Pass::Syntax));
    }

    #[test]
    fn test_document_deserializes_with_defaults() {
        let document: ShaderDocument =
            serde_json::from_str(r#"{"format": "glsl", "source": "void main() {}"}"#).unwrap();

        assert_eq!(document.format(), "glsl");
        assert_eq!(document.declared_version(), None);
        assert!(document.options().include_warnings);
        assert_eq!(document.options().analysis_depth, AnalysisDepth::Full);
    }
}
