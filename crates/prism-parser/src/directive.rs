//! Preprocessor directive lines.
//!
//! Directives are recorded, never evaluated: `#version` and `#extension`
//! feed the portability checks, `#define` makes macro names resolvable, and
//! conditionals are accepted as written.

use std::ops::Range;

use winnow::{
    Parser as _,
    ascii::{digit1, space0, space1},
    combinator::{cut_err, delimited, opt, separated},
    error::{AddContext, ContextError, ErrMode, ModalResult, StrContext},
    stream::{LocatingSlice, Location, Stream},
    token::take_while,
};

use prism_core::{
    DiagnosticCode,
    ast::{ExtensionBehavior, Profile},
};

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<StrContext>>;

/// A parsed directive line, without the leading `#`.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive<'a> {
    Version {
        number: u32,
        profile: Option<Profile>,
    },
    Extension {
        name: &'a str,
        name_range: Range<usize>,
        behavior: ExtensionBehavior,
    },
    Define {
        name: &'a str,
        name_range: Range<usize>,
        params: Option<Vec<&'a str>>,
    },
    /// Conditionals, `#undef`, `#pragma`, `#line` and `#error`.
    Recorded(&'a str),
    /// A lone `#`.
    Null,
}

/// A malformed directive, with a range relative to the directive text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveError {
    pub code: DiagnosticCode,
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

fn name<'a>(input: &mut Input<'a>) -> IResult<(&'a str, Range<usize>)> {
    take_while(1.., is_ident)
        .verify(|s: &str| !s.starts_with(|c: char| c.is_ascii_digit()))
        .with_span()
        .parse_next(input)
}

fn version<'a>(input: &mut Input<'a>) -> IResult<Directive<'a>> {
    space1.parse_next(input)?;
    let number = cut_err(digit1.parse_to::<u32>())
        .context(StrContext::Label("version number"))
        .parse_next(input)?;
    space0.parse_next(input)?;
    let profile = match opt(take_while(1.., is_ident)).parse_next(input)? {
        None => None,
        Some("core") => Some(Profile::Core),
        Some("compatibility") => Some(Profile::Compatibility),
        Some("es") => Some(Profile::Es),
        Some(_) => return Err(expected(input, "`core`, `compatibility` or `es` profile")),
    };
    Ok(Directive::Version { number, profile })
}

fn extension<'a>(input: &mut Input<'a>) -> IResult<Directive<'a>> {
    space1.parse_next(input)?;
    let (name, name_range) = cut_err(name)
        .context(StrContext::Label("extension name"))
        .parse_next(input)?;
    cut_err(delimited(space0, ':', space0))
        .context(StrContext::Label("`:` after the extension name"))
        .parse_next(input)?;
    let behavior = cut_err(take_while(1.., is_ident).verify_map(ExtensionBehavior::from_keyword))
        .context(StrContext::Label(
            "`require`, `enable`, `warn` or `disable`",
        ))
        .parse_next(input)?;
    Ok(Directive::Extension {
        name,
        name_range,
        behavior,
    })
}

fn define<'a>(input: &mut Input<'a>) -> IResult<Directive<'a>> {
    space1.parse_next(input)?;
    let (name, name_range) = cut_err(name)
        .context(StrContext::Label("macro name"))
        .parse_next(input)?;
    // A function-like macro has its `(` immediately after the name.
    let params = opt(delimited(
        '(',
        separated(
            0..,
            delimited(space0, take_while(1.., is_ident), space0),
            ',',
        ),
        cut_err((space0, ')')).context(StrContext::Label("`)` closing the macro parameters")),
    ))
    .parse_next(input)?;
    Ok(Directive::Define {
        name,
        name_range,
        params,
    })
}

/// Text after the directive body may only be a comment.
fn trailing(input: &mut Input<'_>) -> IResult<()> {
    space0.parse_next(input)?;
    let rest: &str = **input;
    if rest.is_empty() || rest.starts_with("//") || rest.starts_with("/*") {
        Ok(())
    } else {
        Err(expected(input, "end of directive"))
    }
}

/// Parse the text of one directive line (everything after `#`).
pub fn parse_directive(text: &str) -> Result<Directive<'_>, DirectiveError> {
    let mut input = LocatingSlice::new(text);
    let _: IResult<&str> = space0.parse_next(&mut input);
    if input.trim().is_empty() {
        return Ok(Directive::Null);
    }

    let (keyword, keyword_range) = match name.parse_next(&mut input) {
        Ok(found) => found,
        Err(_) => {
            let start = input.current_token_start();
            return Err(DirectiveError {
                code: DiagnosticCode::UnknownDirective,
                message: "unrecognized preprocessor directive".to_string(),
                range: start..text.len(),
            });
        }
    };

    let parsed = match keyword {
        "version" => version(&mut input).and_then(|d| trailing(&mut input).map(|()| d)),
        "extension" => extension(&mut input).and_then(|d| trailing(&mut input).map(|()| d)),
        "define" => define(&mut input),
        "undef" | "if" | "ifdef" | "ifndef" | "elif" | "else" | "endif" | "pragma" | "line"
        | "error" => return Ok(Directive::Recorded(keyword)),
        _ => {
            return Err(DirectiveError {
                code: DiagnosticCode::UnknownDirective,
                message: format!("unknown preprocessor directive `#{keyword}`"),
                range: keyword_range,
            });
        }
    };

    parsed.map_err(|err| {
        let position = input.current_token_start();
        let expected = match &err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx.context().find_map(|c| match c {
                StrContext::Label(label) => Some(*label),
                _ => None,
            }),
            ErrMode::Incomplete(_) => None,
        };
        let end = text.trim_end().len().max(position + 1).min(text.len());
        DirectiveError {
            code: DiagnosticCode::SyntaxError,
            message: match expected {
                Some(expected) => format!("malformed `#{keyword}` directive: expected {expected}"),
                None => format!("malformed `#{keyword}` directive"),
            },
            range: position.min(text.len().saturating_sub(1))..end,
        }
    })
}
