//! The closed set of supported dialects.

use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

/// A shader source dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderFormat {
    /// Plain GLSL.
    CoreLanguage,
    /// ISF: a JSON document embedding GLSL code strings.
    InteractiveJson,
    /// MadMapper materials: GLSL annotated with `@tags` in line comments.
    AnnotatedMapping,
}

impl ShaderFormat {
    pub const ALL: [ShaderFormat; 3] = [
        ShaderFormat::CoreLanguage,
        ShaderFormat::InteractiveJson,
        ShaderFormat::AnnotatedMapping,
    ];

    /// Canonical format tag.
    pub fn name(&self) -> &'static str {
        match self {
            ShaderFormat::CoreLanguage => "glsl",
            ShaderFormat::InteractiveJson => "isf",
            ShaderFormat::AnnotatedMapping => "madmapper",
        }
    }

    /// Every tag accepted for this format, canonical name first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ShaderFormat::CoreLanguage => &["glsl", "core", "core_language"],
            ShaderFormat::InteractiveJson => &["isf", "json", "interactive_json"],
            ShaderFormat::AnnotatedMapping => &["madmapper", "mad", "annotated", "annotated_mapping"],
        }
    }
}

impl fmt::Display for ShaderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown shader format `{0}`")]
pub struct UnknownFormat(pub String);

impl FromStr for ShaderFormat {
    type Err = UnknownFormat;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let normalized = tag.trim().to_ascii_lowercase().replace('-', "_");
        ShaderFormat::ALL
            .into_iter()
            .find(|format| format.aliases().contains(&normalized.as_str()))
            .ok_or_else(|| UnknownFormat(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str_accepts_aliases() {
        assert_eq!("glsl".parse(), Ok(ShaderFormat::CoreLanguage));
        assert_eq!("ISF".parse(), Ok(ShaderFormat::InteractiveJson));
        assert_eq!("annotated-mapping".parse(), Ok(ShaderFormat::AnnotatedMapping));
    }

    #[test]
    fn test_format_from_str_rejects_unknown() {
        let err = "hlsl".parse::<ShaderFormat>().unwrap_err();
        assert_eq!(err.to_string(), "unknown shader format `hlsl`");
    }

    #[test]
    fn test_format_name_round_trips() {
        for format in ShaderFormat::ALL {
            assert_eq!(format.name().parse(), Ok(format));
        }
    }
}
