//! Dialect-specific facts extracted while parsing.
//!
//! Metadata is returned to the caller alongside the diagnostics. It is purely
//! descriptive; nothing in the analysis pipeline depends on it.

use serde::Serialize;

use crate::ast::StageKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "dialect", rename_all = "snake_case")]
pub enum DocumentMetadata {
    /// The document never reached a parser.
    #[default]
    None,
    Core(CoreMetadata),
    Interactive(InteractiveMetadata),
    Annotated(AnnotatedMetadata),
}

/// Facts about a plain core-language document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoreMetadata {
    /// The `#version` directive as written, e.g. `330 core`.
    pub version: Option<String>,
    pub extensions: Vec<String>,
    pub uniforms: Vec<UniformInfo>,
    pub functions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniformInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Header of an interactive JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InteractiveMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub credit: Option<String>,
    pub categories: Vec<String>,
    pub inputs: Vec<ParameterInfo>,
    pub passes: Vec<PassInfo>,
}

/// A user-facing parameter declared by the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub default: Option<ParamValue>,
    pub min: Option<ParamValue>,
    pub max: Option<ParamValue>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Bool(bool),
    Vector(Vec<f64>),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassInfo {
    pub target: Option<String>,
    pub persistent: bool,
    pub float: bool,
}

/// Header of an annotated mapping document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnotatedMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub categories: Vec<String>,
    pub params: Vec<ParameterInfo>,
    pub inputs: Vec<PortInfo>,
    pub outputs: Vec<PortInfo>,
    pub stages: Vec<StageKind>,
}

/// An `@input` or `@output` annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
}
