//! `@tag` annotations inside line comments of annotated mapping documents.

use std::ops::Range;

use winnow::{
    Parser as _,
    ascii::{space0, space1},
    combinator::{alt, cut_err, delimited},
    error::{AddContext, ContextError, ErrMode, ModalResult, StrContext},
    stream::{LocatingSlice, Location, Stream},
    token::{take_till, take_while},
};

use prism_core::metadata::ParamValue;

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<StrContext>>;

pub const PARAM_TYPES: &[&str] = &[
    "float", "int", "bool", "color", "vec2", "vec3", "vec4", "texture", "enum",
];

pub const PORT_TYPES: &[&str] = &[
    "float",
    "int",
    "bool",
    "color",
    "vec2",
    "vec3",
    "vec4",
    "texture",
    "sampler2D",
    "image",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Tag<'a> {
    Name(&'a str),
    Description(&'a str),
    Author(&'a str),
    Version(&'a str),
    Category(&'a str),
    Param(ParamTag<'a>),
    Input(PortTag<'a>),
    Output(PortTag<'a>),
    Unknown { name: &'a str, range: Range<usize> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamTag<'a> {
    pub name: &'a str,
    pub kind: &'a str,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// The `default:` text as written; its meaning depends on `kind`.
    pub default: Option<&'a str>,
    pub label: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortTag<'a> {
    pub name: &'a str,
    pub kind: &'a str,
    pub description: Option<&'a str>,
}

/// A malformed tag, with a range relative to the tag text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagError {
    pub message: String,
    pub range: Range<usize>,
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn expected(input: &Input<'_>, label: &'static str) -> ErrMode<ContextError<StrContext>> {
    ErrMode::Cut(ContextError::new().add_context(
        input,
        &input.checkpoint(),
        StrContext::Label(label),
    ))
}

fn word<'a>(input: &mut Input<'a>) -> IResult<(&'a str, Range<usize>)> {
    take_while(1.., is_ident).with_span().parse_next(input)
}

fn quoted<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    delimited('"', take_till(0.., '"'), cut_err('"'))
        .context(StrContext::Label("closing `\"`"))
        .parse_next(input)
}

fn number(input: &mut Input<'_>) -> IResult<f64> {
    take_till(1.., char::is_whitespace)
        .parse_to::<f64>()
        .parse_next(input)
}

/// A default is either one word or a parenthesized component list such as
/// `vec3(1.0, 0.5, 0.0)`.
fn default_text<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    alt((
        (
            take_while(0.., is_ident),
            '(',
            take_till(0.., ')'),
            cut_err(')').context(StrContext::Label("`)` closing the default")),
        )
            .take(),
        take_till(1.., char::is_whitespace),
    ))
    .parse_next(input)
}

/// Free text after the tag name.
fn text<'a>(input: &mut Input<'a>) -> &'a str {
    input.finish().trim()
}

/// `name type` followed by the remainder of the tag.
fn name_and_type<'a>(
    input: &mut Input<'a>,
    what: &'static str,
) -> IResult<((&'a str, Range<usize>), (&'a str, Range<usize>))> {
    let name = cut_err((space1, word).map(|(_, name)| name))
        .context(StrContext::Label(what))
        .parse_next(input)?;
    let kind = cut_err((space1, word).map(|(_, kind)| kind))
        .context(StrContext::Label("a type after the name"))
        .parse_next(input)?;
    Ok((name, kind))
}

fn param<'a>(input: &mut Input<'a>) -> IResult<(ParamTag<'a>, Range<usize>)> {
    let ((name, _), (kind, kind_range)) = name_and_type(input, "a parameter name")?;
    let mut tag = ParamTag {
        name,
        kind,
        ..ParamTag::default()
    };

    loop {
        space0.parse_next(input)?;
        if input.is_empty() {
            break;
        }
        let (key, _) = cut_err(word)
            .context(StrContext::Label("a `key:value` option"))
            .parse_next(input)?;
        cut_err((':', space0))
            .context(StrContext::Label("`:` after the option name"))
            .parse_next(input)?;
        match key {
            "min" => {
                tag.min = Some(
                    cut_err(number)
                        .context(StrContext::Label("a number after `min:`"))
                        .parse_next(input)?,
                );
            }
            "max" => {
                tag.max = Some(
                    cut_err(number)
                        .context(StrContext::Label("a number after `max:`"))
                        .parse_next(input)?,
                );
            }
            "default" => {
                tag.default = Some(
                    cut_err(default_text)
                        .context(StrContext::Label("a value after `default:`"))
                        .parse_next(input)?,
                );
            }
            "label" => {
                tag.label = Some(
                    cut_err(quoted)
                        .context(StrContext::Label("a quoted label"))
                        .parse_next(input)?,
                );
            }
            "desc" | "group" => {
                cut_err(quoted)
                    .context(StrContext::Label("a quoted string"))
                    .parse_next(input)?;
            }
            "values" => {
                cut_err(delimited('[', take_till(0.., ']'), ']'))
                    .context(StrContext::Label("a `[...]` list of values"))
                    .parse_next(input)?;
            }
            _ => {
                return Err(expected(
                    input,
                    "`min`, `max`, `default`, `label`, `desc`, `group` or `values`",
                ));
            }
        }
    }
    Ok((tag, kind_range))
}

fn port<'a>(input: &mut Input<'a>) -> IResult<(PortTag<'a>, Range<usize>)> {
    let ((name, _), (kind, kind_range)) = name_and_type(input, "a port name")?;
    let description = Some(text(input)).filter(|d| !d.is_empty());
    Ok((
        PortTag {
            name,
            kind,
            description,
        },
        kind_range,
    ))
}

fn unknown_type(kind: &str, range: Range<usize>, allowed: &[&str]) -> TagError {
    TagError {
        message: format!(
            "unknown type `{kind}`, expected one of: {}",
            allowed.join(", ")
        ),
        range,
    }
}

/// Parse one tag; `line` starts at the `@`.
pub fn parse_tag(line: &str) -> Result<Tag<'_>, TagError> {
    let mut input = LocatingSlice::new(line);
    let _: IResult<char> = '@'.parse_next(&mut input);
    let Ok((name, name_range)) = word.parse_next(&mut input) else {
        return Err(TagError {
            message: "expected a tag name after `@`".to_string(),
            range: 0..1,
        });
    };

    let parsed = match name {
        "name" | "description" | "author" | "version" | "category" => {
            let value = text(&mut input);
            if value.is_empty() {
                return Err(TagError {
                    message: format!("`@{name}` needs a value"),
                    range: name_range.start.saturating_sub(1)..name_range.end,
                });
            }
            return Ok(match name {
                "name" => Tag::Name(value),
                "description" => Tag::Description(value),
                "author" => Tag::Author(value),
                "version" => Tag::Version(value),
                _ => Tag::Category(value),
            });
        }
        "param" => param(&mut input).map(|(tag, range)| {
            if PARAM_TYPES.contains(&tag.kind) {
                Ok(Tag::Param(tag))
            } else {
                Err(unknown_type(tag.kind, range, PARAM_TYPES))
            }
        }),
        "input" | "output" => port(&mut input).map(|(tag, range)| {
            if !PORT_TYPES.contains(&tag.kind) {
                Err(unknown_type(tag.kind, range, PORT_TYPES))
            } else if name == "input" {
                Ok(Tag::Input(tag))
            } else {
                Ok(Tag::Output(tag))
            }
        }),
        _ => {
            return Ok(Tag::Unknown {
                name,
                range: name_range.start.saturating_sub(1)..name_range.end,
            });
        }
    };

    match parsed {
        Ok(tag) => tag,
        Err(err) => {
            let position = input.current_token_start();
            let expected = match &err {
                ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => {
                    ctx.context().find_map(|c| match c {
                        StrContext::Label(label) => Some(*label),
                        _ => None,
                    })
                }
                ErrMode::Incomplete(_) => None,
            };
            let written = line.trim_end().len();
            // A tag cut short is blamed as a whole.
            let range = if position >= written {
                0..written
            } else {
                position..written
            };
            Err(TagError {
                message: match expected {
                    Some(expected) => format!("malformed `@{name}` tag: expected {expected}"),
                    None => format!("malformed `@{name}` tag"),
                },
                range,
            })
        }
    }
}

/// Interpret a `default:` value for a parameter of type `kind`.
pub fn default_value(kind: &str, text: &str) -> Option<ParamValue> {
    match kind {
        "float" | "int" | "enum" => text.parse().ok().map(ParamValue::Number),
        "bool" => match text {
            "true" | "1" => Some(ParamValue::Bool(true)),
            "false" | "0" => Some(ParamValue::Bool(false)),
            _ => None,
        },
        "vec2" | "vec3" | "vec4" | "color" => {
            let inner = match text.find('(') {
                Some(open) => text[open + 1..].strip_suffix(')')?,
                None => text,
            };
            let components = inner
                .split(',')
                .map(|c| c.trim().parse::<f64>().ok())
                .collect::<Option<Vec<_>>>()?;
            let expected: &[usize] = match kind {
                "vec2" => &[2],
                "vec3" => &[3],
                "vec4" => &[4],
                _ => &[3, 4],
            };
            expected
                .contains(&components.len())
                .then_some(ParamValue::Vector(components))
        }
        _ => Some(ParamValue::Text(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptive_tags() {
        assert_eq!(
            parse_tag("@name  Plasma Waves "),
            Ok(Tag::Name("Plasma Waves"))
        );
        assert_eq!(
            parse_tag("@category Generator"),
            Ok(Tag::Category("Generator"))
        );
        let err = parse_tag("@author").unwrap_err();
        assert_eq!(err.range, 0..7);
    }

    #[test]
    fn test_param_tag() {
        let tag =
            parse_tag(r#"@param speed float min:0 max:10.5 default:1 label:"Speed""#).unwrap();

        assert_eq!(
            tag,
            Tag::Param(ParamTag {
                name: "speed",
                kind: "float",
                min: Some(0.0),
                max: Some(10.5),
                default: Some("1"),
                label: Some("Speed"),
            })
        );
    }

    #[test]
    fn test_param_vector_default() {
        let Ok(Tag::Param(tag)) = parse_tag("@param tint color default:vec4(1.0, 0.5, 0.0, 1.0)")
        else {
            panic!("expected a param tag");
        };

        assert_eq!(tag.default, Some("vec4(1.0, 0.5, 0.0, 1.0)"));
        assert_eq!(
            default_value(tag.kind, tag.default.unwrap()),
            Some(ParamValue::Vector(vec![1.0, 0.5, 0.0, 1.0]))
        );
    }

    #[test]
    fn test_malformed_param_tags() {
        let err = parse_tag("@param").unwrap_err();
        assert!(err.message.contains("parameter name"), "{}", err.message);
        assert_eq!(err.range, 0..6);

        let err = parse_tag("@param speed  ").unwrap_err();
        assert!(err.message.contains("type"), "{}", err.message);
        assert_eq!(err.range, 0..12);

        let err = parse_tag("@param speed float min:fast").unwrap_err();
        assert!(err.message.contains("min:"), "{}", err.message);
        assert_eq!(err.range, 23..27);

        let err = parse_tag("@param speed double").unwrap_err();
        assert!(err.message.contains("unknown type `double`"));
        assert_eq!(err.range, 13..19);
    }

    #[test]
    fn test_port_tags() {
        assert_eq!(
            parse_tag("@input source texture the incoming frame"),
            Ok(Tag::Input(PortTag {
                name: "source",
                kind: "texture",
                description: Some("the incoming frame"),
            }))
        );
        assert!(matches!(
            parse_tag("@output result vec4"),
            Ok(Tag::Output(PortTag {
                description: None,
                ..
            }))
        ));
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            parse_tag("@license MIT"),
            Ok(Tag::Unknown {
                name: "license",
                range: 0..8
            })
        );
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_value("bool", "true"), Some(ParamValue::Bool(true)));
        assert_eq!(default_value("int", "three"), None);
        assert_eq!(default_value("vec2", "(1, 2, 3)"), None);
        assert_eq!(
            default_value("color", "1,1,1"),
            Some(ParamValue::Vector(vec![1.0, 1.0, 1.0]))
        );
    }
}
