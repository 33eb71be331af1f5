//! Errors raised by the command-line front end.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

use prism::PrismError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read `{}`: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse TOML configuration: {0}")]
    ConfigParse(String),

    #[error("Missing configuration file: {}", .0.display())]
    MissingConfig(PathBuf),

    #[error("Cannot infer the shader format of `{0}`; pass --format")]
    UnknownFormat(String),

    #[error("Failed to render the report")]
    Render(#[from] fmt::Error),

    #[error("Failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Validator(#[from] PrismError),

    #[error("{invalid} of {total} document(s) failed validation")]
    Invalid { invalid: usize, total: usize },
}
