//! Command-line argument definitions for the Prism CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the shaders to validate, the options each
//! validation runs with, the output mode, configuration file selection and
//! logging verbosity.

use clap::{Parser, ValueEnum};

use prism::{AnalysisDepth, ValidationOptions};

/// Command-line arguments for the Prism shader validator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Shader files to validate; standard input is read when none are given
    #[arg(help = "Paths to the shader files")]
    pub files: Vec<String>,

    /// Shader format (glsl, isf, madmapper); inferred from the file extension when omitted
    #[arg(short, long)]
    pub format: Option<String>,

    /// Print the results as JSON instead of rendered diagnostics
    #[arg(long)]
    pub json: bool,

    /// Treat every warning as an error
    #[arg(long)]
    pub strict: bool,

    /// Leave warnings and notes out of the report
    #[arg(long)]
    pub no_warnings: bool,

    /// How far analysis goes
    #[arg(long, value_enum, default_value_t = Depth::Full)]
    pub depth: Depth,

    /// GLSL version to assume, e.g. "330" or "300 es"
    #[arg(long)]
    pub version_override: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Args {
    /// The validation options these flags select.
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            strict_mode: self.strict,
            include_warnings: !self.no_warnings,
            analysis_depth: self.depth.into(),
            analyzers: None,
        }
    }
}

/// Analysis depth as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Depth {
    Basic,
    Standard,
    Full,
}

impl From<Depth> for AnalysisDepth {
    fn from(depth: Depth) -> Self {
        match depth {
            Depth::Basic => AnalysisDepth::Basic,
            Depth::Standard => AnalysisDepth::Standard,
            Depth::Full => AnalysisDepth::Full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["prism", "a.frag"]);

        assert_eq!(args.files, ["a.frag"]);
        assert_eq!(args.log_level, "warn");
        assert_eq!(args.depth, Depth::Full);
        assert_eq!(args.validation_options(), ValidationOptions::default());
    }

    #[test]
    fn test_flags_select_options() {
        let args = Args::parse_from(["prism", "--strict", "--no-warnings", "--depth", "basic", "a.glsl"]);
        let options = args.validation_options();

        assert!(options.strict_mode);
        assert!(!options.include_warnings);
        assert_eq!(options.analysis_depth, AnalysisDepth::Basic);
    }
}
