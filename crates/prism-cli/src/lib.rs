//! Prism CLI library
//!
//! This module contains the core CLI logic for the Prism shader validator.

pub mod error_adapter;

mod args;
mod config;
mod error;

pub use args::{Args, Depth};
pub use error::CliError;

use std::{
    fmt::Write as _,
    fs,
    io::{self, Write as _},
    path::Path,
};

use log::{debug, info};
use miette::GraphicalReportHandler;
use serde::Serialize;

use prism::{AnalysisResult, ShaderDocument, Validator};

use error_adapter::to_reportables;

/// Label used for a document read from standard input.
const STDIN_NAME: &str = "<stdin>";

/// Format assumed for standard input when `--format` is absent.
const STDIN_FORMAT: &str = "glsl";

/// A document and where it came from.
struct Input {
    name: String,
    document: ShaderDocument,
}

/// One entry of the `--json` report.
#[derive(Serialize)]
struct FileReport<'a> {
    file: &'a str,
    #[serde(flatten)]
    result: &'a AnalysisResult,
}

/// Run the Prism CLI application
///
/// Validates every input file (or standard input) and writes the report to
/// standard output, either as rendered diagnostics or as JSON.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `CliError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Inputs whose format cannot be determined
/// - Internal validator failures
/// - Any document that fails validation, after its report was written
pub fn run(args: &Args) -> Result<(), CliError> {
    info!(files = args.files.len(), json = args.json; "Validating shaders");

    let app_config = config::load_config(args.config.as_ref())?;
    let validator = Validator::new(app_config)?;

    let inputs = read_inputs(args)?;
    let documents: Vec<_> = inputs.iter().map(|input| input.document.clone()).collect();
    let results = validator
        .validate_batch(&documents)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let report = if args.json {
        render_json(&inputs, &results)?
    } else {
        render_text(&inputs, &results)?
    };
    io::stdout().lock().write_all(report.as_bytes())?;

    let invalid = results.iter().filter(|result| !result.is_valid).count();
    if invalid > 0 {
        return Err(CliError::Invalid {
            invalid,
            total: results.len(),
        });
    }

    info!(documents = results.len(); "All documents are valid");
    Ok(())
}

/// Infer the shader format from a file name.
///
/// Returns `None` when the extension is not one Prism recognizes.
pub fn infer_format(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    if name.ends_with(".fs.json") {
        return Some("isf");
    }

    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "glsl" | "frag" | "vert" | "fs" | "vs" => Some("glsl"),
        "isf" | "json" => Some("isf"),
        "mad" | "madmapper" => Some("madmapper"),
        _ => None,
    }
}

fn read_inputs(args: &Args) -> Result<Vec<Input>, CliError> {
    let options = args.validation_options();
    let build = |name: String, format: &str, source: String| {
        let mut document = ShaderDocument::new(format, source).with_options(options.clone());
        if let Some(version) = &args.version_override {
            document = document.with_declared_version(version.as_str());
        }
        Input { name, document }
    };

    if args.files.is_empty() {
        let source = io::read_to_string(io::stdin())?;
        let format = args.format.as_deref().unwrap_or(STDIN_FORMAT);
        debug!(format = format; "Read standard input");
        return Ok(vec![build(STDIN_NAME.to_string(), format, source)]);
    }

    args.files
        .iter()
        .map(|file| -> Result<Input, CliError> {
            let path = Path::new(file);
            let format = match args.format.as_deref() {
                Some(format) => format,
                None => infer_format(path).ok_or_else(|| CliError::UnknownFormat(file.clone()))?,
            };
            let source = fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            debug!(path = file.as_str(), format = format; "Read shader");
            Ok(build(file.clone(), format, source))
        })
        .collect()
}

fn render_json(inputs: &[Input], results: &[AnalysisResult]) -> Result<String, CliError> {
    let reports: Vec<_> = inputs
        .iter()
        .zip(results)
        .map(|(input, result)| FileReport {
            file: &input.name,
            result,
        })
        .collect();

    let mut json = serde_json::to_string_pretty(&reports)?;
    json.push('\n');
    Ok(json)
}

fn render_text(inputs: &[Input], results: &[AnalysisResult]) -> Result<String, CliError> {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();

    for (input, result) in inputs.iter().zip(results) {
        let summary = &result.summary;
        writeln!(
            out,
            "{}: {} ({} errors, {} warnings, {} notes)",
            input.name,
            if result.is_valid { "valid" } else { "invalid" },
            summary.errors,
            summary.warnings,
            summary.infos,
        )?;

        for reportable in to_reportables(result, input.document.source()) {
            handler.render_report(&mut out, &reportable)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_format() {
        let cases = [
            ("shader.frag", Some("glsl")),
            ("dir/shader.VERT", Some("glsl")),
            ("effect.fs", Some("glsl")),
            ("effect.fs.json", Some("isf")),
            ("effect.isf", Some("isf")),
            ("plasma.mad", Some("madmapper")),
            ("notes.txt", None),
            ("Makefile", None),
        ];

        for (file, expected) in cases {
            assert_eq!(infer_format(Path::new(file)), expected, "{file}");
        }
    }

    #[test]
    fn test_json_report_names_each_file() {
        let validator = Validator::new(prism::config::AppConfig::default()).unwrap();
        let inputs = vec![Input {
            name: "a.frag".to_string(),
            document: ShaderDocument::new("glsl", "void main() {}"),
        }];
        let results = vec![validator.validate(&inputs[0].document).unwrap()];

        let json = render_json(&inputs, &results).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["file"], "a.frag");
        assert_eq!(value[0]["is_valid"], true);
        assert!(value[0]["diagnostics"].is_array());
    }
}
