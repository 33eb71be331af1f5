//! # Prism Parser
//!
//! Front ends for the Prism shader validator. Each supported dialect turns
//! source text into the shared [`Program`](prism_core::ast::Program)
//! representation plus the diagnostics found while parsing.
//!
//! The interactive JSON and annotated mapping dialects extract embedded
//! code and delegate it to the core-language front end, translating every
//! span back into the submitted document.
//!
//! ## Usage
//!
//! ```
//! use prism_core::ShaderFormat;
//! use prism_parser::{ParseOptions, parser_for};
//!
//! let output = parser_for(ShaderFormat::CoreLanguage)
//!     .parse("void main() { gl_FragColor = vec4(1.0); }", &ParseOptions::default());
//!
//! assert!(output.diagnostics.is_empty());
//! assert_eq!(output.program.stages.len(), 1);
//! ```

mod annotated;
mod directive;
mod glsl;
mod isf;
mod lexer;
mod parser;
#[cfg(test)]
mod parser_tests;
pub mod report;
mod source_map;
mod tag;
mod tokens;

pub use annotated::AnnotatedMappingParser;
pub use glsl::CoreLanguageParser;
pub use isf::InteractiveJsonParser;

use prism_core::{Diagnostic, DocumentMetadata, ShaderFormat, ast::Program};

/// Options that apply to every dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// How deeply statements and expressions may nest before the parser
    /// gives up on the construct.
    pub max_nesting_depth: usize,
    /// How many levels a single expression tree may have, including
    /// operator chains such as `a + b + c`.
    pub max_expression_height: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: 64,
            max_expression_height: 1024,
        }
    }
}

/// What a dialect parser returns: a best-effort program, never a failure.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    /// The parsed program. Regions that could not be parsed are present as
    /// `Unparsed` placeholders.
    pub program: Program,
    /// Parse-time diagnostics in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
    pub metadata: DocumentMetadata,
}

/// The capability every dialect front end provides.
pub trait ShaderParser: Send + Sync {
    fn format(&self) -> ShaderFormat;

    /// The canonical format tag, e.g. `glsl`.
    fn format_name(&self) -> &'static str {
        self.format().name()
    }

    /// Parse a whole document.
    ///
    /// Malformed input yields diagnostics and a partial program; this never
    /// panics on user input.
    fn parse(&self, source: &str, options: &ParseOptions) -> ParseOutput;
}

/// The front end registered for a format.
pub fn parser_for(format: ShaderFormat) -> &'static dyn ShaderParser {
    match format {
        ShaderFormat::CoreLanguage => &CoreLanguageParser,
        ShaderFormat::InteractiveJson => &InteractiveJsonParser,
        ShaderFormat::AnnotatedMapping => &AnnotatedMappingParser,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_for_every_format() {
        for format in ShaderFormat::ALL {
            let parser = parser_for(format);
            assert_eq!(parser.format(), format);
            assert_eq!(parser.format_name(), format.name());
        }
    }
}
