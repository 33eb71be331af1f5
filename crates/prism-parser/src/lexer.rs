//! Lexical analyzer for the core shading language.
//!
//! [`tokenize`] converts one code fragment into [`PositionedToken`]s whose
//! spans are already in document coordinates. Lexing never fails as a whole:
//! an unexpected character produces an `INVALID_TOKEN` diagnostic covering
//! exactly that character, and the lexer resumes with the next one.

use winnow::{
    Parser as _,
    ascii::digit1,
    combinator::{alt, cut_err, opt, preceded, terminated},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{literal, one_of, rest, take_until, take_while},
};

use prism_core::{Diagnostic, DiagnosticCode, DiagnosticCollector, ast::Type};

use crate::{
    report,
    source_map::SourceMap,
    tokens::{Keyword, PositionedToken, Punct, Token},
};

/// Diagnostic details attached to winnow errors via `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LexerDiagnostic {
    code: DiagnosticCode,
    message: &'static str,
    help: Option<&'static str>,
    /// The error span covers from `start` to the error position.
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<LexerDiagnostic>>;

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn invalid_number(
    input: &Input<'_>,
    start: usize,
    message: &'static str,
) -> ErrMode<ContextError<LexerDiagnostic>> {
    ErrMode::Cut(ContextError::new().add_context(
        input,
        &input.checkpoint(),
        LexerDiagnostic {
            code: DiagnosticCode::InvalidNumber,
            message,
            help: None,
            start,
        },
    ))
}

/// Stands in for a literal the lexer rejected so the parser still sees an
/// operand. Out-of-range values saturate to the type's maximum.
fn placeholder_literal(text: &str) -> Token<'static> {
    let text = text.to_ascii_lowercase();
    let hex = text.starts_with("0x");
    if text.ends_with('u') {
        Token::UintLiteral(u64::MAX)
    } else if !hex && (text.contains(['.', 'e']) || text.ends_with('f')) {
        Token::FloatLiteral(f64::MAX)
    } else {
        Token::IntLiteral(i64::MAX)
    }
}

fn line_comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded("//", take_while(0.., |c| c != '\n'))
        .map(Token::LineComment)
        .parse_next(input)
}

/// `/* ... */`. An unterminated comment runs to the end of the input and is
/// still returned as a token; the caller reports it.
fn block_comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    "/*".parse_next(input)?;
    match opt(terminated(take_until(0.., "*/"), "*/")).parse_next(input)? {
        Some(text) => Ok(Token::BlockComment {
            text,
            terminated: true,
        }),
        None => {
            let text = rest.parse_next(input)?;
            Ok(Token::BlockComment {
                text,
                terminated: false,
            })
        }
    }
}

/// The rest of a logical line, following backslash continuations.
fn logical_line(input: &mut Input<'_>) -> IResult<()> {
    loop {
        take_while(0.., |c: char| c != '\n' && c != '\\').parse_next(input)?;
        if opt(("\\", opt('\r'), '\n')).parse_next(input)?.is_some() {
            continue;
        }
        if opt('\\').parse_next(input)?.is_some() {
            continue;
        }
        return Ok(());
    }
}

fn directive<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded('#', logical_line.take())
        .map(Token::Directive)
        .parse_next(input)
}

fn hex_literal<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let start = input.current_token_start();
    let digits = preceded(
        alt(("0x", "0X")),
        cut_err(
            take_while(1.., |c: char| c.is_ascii_hexdigit()).context(LexerDiagnostic {
                code: DiagnosticCode::InvalidNumber,
                message: "hexadecimal literal has no digits",
                help: Some("write at least one hex digit after `0x`"),
                start,
            }),
        ),
    )
    .parse_next(input)?;
    let unsigned = opt(one_of(['u', 'U'])).parse_next(input)?.is_some();

    let value = u64::from_str_radix(digits, 16)
        .map_err(|_| invalid_number(input, start, "hexadecimal literal is out of range"))?;
    if unsigned {
        Ok(Token::UintLiteral(value))
    } else {
        i64::try_from(value)
            .map(Token::IntLiteral)
            .map_err(|_| invalid_number(input, start, "hexadecimal literal is out of range"))
    }
}

fn exponent(input: &mut Input<'_>) -> IResult<()> {
    let start = input.current_token_start();
    (
        one_of(['e', 'E']),
        opt(one_of(['+', '-'])),
        cut_err(digit1.context(LexerDiagnostic {
            code: DiagnosticCode::InvalidNumber,
            message: "exponent has no digits",
            help: Some("write the exponent as in `1.0e-3`"),
            start,
        })),
    )
        .void()
        .parse_next(input)
}

/// Decimal and octal integers, and floats in every written form:
/// `1.0`, `.5`, `1.`, `1e3`, with optional `f`/`lf` suffix.
fn decimal_literal<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let start = input.current_token_start();
    let lexeme: &str = (
        alt((
            (digit1, opt(('.', opt(digit1)))).void(),
            ('.', digit1).void(),
        )),
        opt(exponent),
    )
        .take()
        .parse_next(input)?;
    let suffix = opt(alt(("lf", "LF", "f", "F", "u", "U"))).parse_next(input)?;

    if opt(take_while(1.., is_ident_continue))
        .parse_next(input)?
        .is_some()
    {
        return Err(invalid_number(
            input,
            start,
            "numeric literal is followed by letters",
        ));
    }

    let is_float =
        lexeme.contains(['.', 'e', 'E']) || matches!(suffix, Some("f" | "F" | "lf" | "LF"));
    if is_float {
        if matches!(suffix, Some("u" | "U")) {
            return Err(invalid_number(
                input,
                start,
                "floating-point literal cannot be unsigned",
            ));
        }
        return lexeme
            .parse::<f64>()
            .map(Token::FloatLiteral)
            .map_err(|_| invalid_number(input, start, "malformed floating-point literal"));
    }

    let (digits, radix) = if lexeme.len() > 1 && lexeme.starts_with('0') {
        (&lexeme[1..], 8)
    } else {
        (lexeme, 10)
    };
    let value = u64::from_str_radix(digits, radix).map_err(|_| {
        let message = if radix == 8 {
            "octal literal contains a digit above 7"
        } else {
            "integer literal is out of range"
        };
        invalid_number(input, start, message)
    })?;

    if matches!(suffix, Some("u" | "U")) {
        Ok(Token::UintLiteral(value))
    } else {
        i64::try_from(value)
            .map(Token::IntLiteral)
            .map_err(|_| invalid_number(input, start, "integer literal is out of range"))
    }
}

fn number_literal<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((hex_literal, decimal_literal)).parse_next(input)
}

/// Identifiers, keywords, boolean literals and type names.
fn word<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., is_ident_continue)
        .verify(|s: &str| s.starts_with(is_ident_start))
        .map(|word: &'a str| match word {
            "true" => Token::BoolLiteral(true),
            "false" => Token::BoolLiteral(false),
            _ => {
                if let Some(keyword) = Keyword::from_word(word) {
                    Token::Keyword(keyword)
                } else if Type::from_keyword(word).is_some() {
                    Token::TypeName(word)
                } else {
                    Token::Identifier(word)
                }
            }
        })
        .parse_next(input)
}

/// Three- and two-character operators, longest first.
fn multi_char_operator<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        alt((
            literal("<<=").value(Punct::ShlAssign),
            literal(">>=").value(Punct::ShrAssign),
            literal("<<").value(Punct::Shl),
            literal(">>").value(Punct::Shr),
            literal("<=").value(Punct::Le),
            literal(">=").value(Punct::Ge),
            literal("==").value(Punct::EqEq),
            literal("!=").value(Punct::Ne),
        )),
        alt((
            literal("&&").value(Punct::AndAnd),
            literal("||").value(Punct::OrOr),
            literal("^^").value(Punct::XorXor),
            literal("++").value(Punct::PlusPlus),
            literal("--").value(Punct::MinusMinus),
        )),
        alt((
            literal("+=").value(Punct::PlusAssign),
            literal("-=").value(Punct::MinusAssign),
            literal("*=").value(Punct::StarAssign),
            literal("/=").value(Punct::SlashAssign),
            literal("%=").value(Punct::PercentAssign),
            literal("&=").value(Punct::AmpAssign),
            literal("|=").value(Punct::PipeAssign),
            literal("^=").value(Punct::CaretAssign),
        )),
    ))
    .map(Token::Punct)
    .parse_next(input)
}

fn single_char_token<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        alt((
            alt((
                '('.value(Punct::LeftParen),
                ')'.value(Punct::RightParen),
                '['.value(Punct::LeftBracket),
                ']'.value(Punct::RightBracket),
                '{'.value(Punct::LeftBrace),
                '}'.value(Punct::RightBrace),
            )),
            alt((
                '.'.value(Punct::Dot),
                ','.value(Punct::Comma),
                ':'.value(Punct::Colon),
                ';'.value(Punct::Semicolon),
                '?'.value(Punct::Question),
            )),
        )),
        alt((
            alt((
                '+'.value(Punct::Plus),
                '-'.value(Punct::Minus),
                '*'.value(Punct::Star),
                '/'.value(Punct::Slash),
                '%'.value(Punct::Percent),
                '<'.value(Punct::Lt),
                '>'.value(Punct::Gt),
            )),
            alt((
                '&'.value(Punct::Amp),
                '|'.value(Punct::Pipe),
                '^'.value(Punct::Caret),
                '!'.value(Punct::Bang),
                '~'.value(Punct::Tilde),
                '='.value(Punct::Assign),
            )),
        )),
    ))
    .map(Token::Punct)
    .parse_next(input)
}

fn whitespace<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., |c: char| c.is_whitespace() && c != '\n')
        .value(Token::Whitespace)
        .parse_next(input)
}

fn newline<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    '\n'.value(Token::Newline).parse_next(input)
}

/// One token with its fragment-local byte range.
fn token<'a>(input: &mut Input<'a>) -> IResult<(Token<'a>, std::ops::Range<usize>)> {
    let start = input.current_token_start();

    let token = alt((
        line_comment,  // before `/`
        block_comment, // before `/`
        directive,
        number_literal, // before `.`
        word,
        multi_char_operator, // before single characters
        single_char_token,
        newline, // before whitespace
        whitespace,
    ))
    .parse_next(input)?;

    let end = input.current_token_start();
    Ok((token, start..end))
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a, 'm> {
    map: &'m SourceMap<'m>,
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: DiagnosticCollector,
}

impl<'a, 'm> Lexer<'a, 'm> {
    fn new(map: &'m SourceMap<'m>) -> Self {
        Self {
            map,
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    fn tokenize(&mut self, mut input: Input<'a>) {
        // A byte order mark is only meaningful at the very start of the document.
        if self.map.offset(0) == 0 && input.starts_with('\u{feff}') {
            input.next_token();
        }

        while !input.is_empty() {
            let remaining: &'a str = *input;
            let error_start = input.current_token_start();
            match token(&mut input) {
                Ok((token, range)) => {
                    let span = self.map.span(range.clone());
                    if let Token::BlockComment {
                        terminated: false, ..
                    } = token
                    {
                        self.diagnostics.emit(report::unterminated_comment(span));
                    }
                    self.tokens.push(PositionedToken::new(token, span, range));
                }
                Err(ErrMode::Backtrack(_)) | Err(ErrMode::Incomplete(_)) => {
                    // Nothing matched: report exactly one character and skip it.
                    let ch = input.next_token();
                    let end = input.current_token_start();
                    let message = match ch {
                        Some(ch) => format!("unexpected character `{}`", ch.escape_debug()),
                        None => "unexpected character".to_string(),
                    };
                    self.diagnostics.emit(
                        Diagnostic::error(DiagnosticCode::InvalidToken, message)
                            .with_span(self.map.span(error_start..end)),
                    );
                }
                Err(ErrMode::Cut(err)) => {
                    let error_pos = input.current_token_start();
                    let diagnostic = self.convert_error(err, error_start, error_pos);
                    let is_number = diagnostic.code() == DiagnosticCode::InvalidNumber;
                    self.diagnostics.emit(diagnostic);
                    // A malformed number is skipped whole, up to the next separator.
                    let _: IResult<&str> =
                        take_while(0.., is_ident_continue).parse_next(&mut input);
                    if input.current_token_start() == error_start {
                        input.next_token();
                    }
                    if is_number {
                        let range = error_start..input.current_token_start();
                        let text = &remaining[..range.len()];
                        let span = self.map.span(range.clone());
                        self.tokens.push(PositionedToken::new(
                            placeholder_literal(text),
                            span,
                            range,
                        ));
                    }
                }
            }
        }
    }

    fn convert_error(
        &self,
        err: ContextError<LexerDiagnostic>,
        token_start: usize,
        error_pos: usize,
    ) -> Diagnostic {
        match err.context().next() {
            Some(LexerDiagnostic {
                code,
                message,
                help,
                start,
            }) => {
                let end = error_pos.max(start + 1);
                let mut diagnostic =
                    Diagnostic::error(*code, *message).with_span(self.map.span(*start..end));
                if let Some(help) = help {
                    diagnostic = diagnostic.with_suggestion(*help);
                }
                diagnostic
            }
            None => Diagnostic::error(DiagnosticCode::InvalidToken, "invalid token")
                .with_span(self.map.span(token_start..error_pos.max(token_start + 1))),
        }
    }
}

/// Tokenize one code fragment, recovering from every lexical error.
///
/// Trivia (whitespace, comments, directives) is kept in the stream; the
/// parser filters it.
pub fn tokenize<'a>(
    text: &'a str,
    map: &SourceMap<'_>,
) -> (Vec<PositionedToken<'a>>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(map);
    lexer.tokenize(LocatingSlice::new(text));
    (lexer.tokens, lexer.diagnostics.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::LineIndex;

    fn lex(text: &str) -> (Vec<Token<'_>>, Vec<Diagnostic>) {
        let index = LineIndex::new(text);
        let map = SourceMap::identity(&index);
        let (tokens, diagnostics) = tokenize(text, &map);
        (
            tokens
                .into_iter()
                .map(|t| t.token)
                .filter(|t| !matches!(t, Token::Whitespace | Token::Newline))
                .collect(),
            diagnostics,
        )
    }

    fn single(text: &str) -> Token<'_> {
        let (tokens, diagnostics) = lex(text);
        assert!(
            diagnostics.is_empty(),
            "unexpected diagnostics: {diagnostics:?}"
        );
        assert_eq!(
            tokens.len(),
            1,
            "expected one token for {text:?}: {tokens:?}"
        );
        tokens.into_iter().next().unwrap()
    }

    #[test]
    fn test_words() {
        assert_eq!(single("color"), Token::Identifier("color"));
        assert_eq!(single("_tmp1"), Token::Identifier("_tmp1"));
        assert_eq!(single("vec3"), Token::TypeName("vec3"));
        assert_eq!(single("sampler2D"), Token::TypeName("sampler2D"));
        assert_eq!(single("uniform"), Token::Keyword(Keyword::Uniform));
        assert_eq!(single("true"), Token::BoolLiteral(true));
        assert_eq!(single("iffy"), Token::Identifier("iffy"));
        assert_eq!(single("texture2D"), Token::Identifier("texture2D"));
    }

    #[test]
    fn test_integer_literals() {
        assert_eq!(single("42"), Token::IntLiteral(42));
        assert_eq!(single("0"), Token::IntLiteral(0));
        assert_eq!(single("017"), Token::IntLiteral(15));
        assert_eq!(single("0x1F"), Token::IntLiteral(31));
        assert_eq!(single("7u"), Token::UintLiteral(7));
        assert_eq!(single("0xFFu"), Token::UintLiteral(255));
    }

    #[test]
    fn test_float_literals() {
        assert_eq!(single("1.0"), Token::FloatLiteral(1.0));
        assert_eq!(single(".5"), Token::FloatLiteral(0.5));
        assert_eq!(single("2."), Token::FloatLiteral(2.0));
        assert_eq!(single("1e3"), Token::FloatLiteral(1000.0));
        assert_eq!(single("2.5e-1"), Token::FloatLiteral(0.25));
        assert_eq!(single("1.5f"), Token::FloatLiteral(1.5));
        assert_eq!(single("3lf"), Token::FloatLiteral(3.0));
    }

    #[test]
    fn test_invalid_numbers() {
        for text in ["0x", "1e", "09", "1.0u", "12abc"] {
            let (_, diagnostics) = lex(text);
            assert_eq!(diagnostics.len(), 1, "for {text:?}: {diagnostics:?}");
            assert_eq!(diagnostics[0].code(), DiagnosticCode::InvalidNumber);
        }
    }

    #[test]
    fn test_invalid_numbers_still_yield_a_literal() {
        let cases = [
            ("99999999999999999999", Token::IntLiteral(i64::MAX)),
            ("0x", Token::IntLiteral(i64::MAX)),
            ("1e", Token::FloatLiteral(f64::MAX)),
            ("1.0u", Token::UintLiteral(u64::MAX)),
        ];
        for (text, expected) in cases {
            let (tokens, diagnostics) = lex(text);
            assert_eq!(diagnostics.len(), 1, "for {text:?}: {diagnostics:?}");
            assert_eq!(tokens, [expected], "for {text:?}");
        }
    }

    #[test]
    fn test_leading_byte_order_mark_is_skipped() {
        let (tokens, diagnostics) = lex("\u{feff}void main");

        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(tokens, [Token::TypeName("void"), Token::Identifier("main")]);
    }

    #[test]
    fn test_operators_longest_match() {
        let (tokens, _) = lex("a <<= b >> c++ && !d");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("a"),
                Token::Punct(Punct::ShlAssign),
                Token::Identifier("b"),
                Token::Punct(Punct::Shr),
                Token::Identifier("c"),
                Token::Punct(Punct::PlusPlus),
                Token::Punct(Punct::AndAnd),
                Token::Punct(Punct::Bang),
                Token::Identifier("d"),
            ]
        );
    }

    #[test]
    fn test_member_access_is_not_a_float() {
        let (tokens, _) = lex("v.xy");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("v"),
                Token::Punct(Punct::Dot),
                Token::Identifier("xy"),
            ]
        );
    }

    #[test]
    fn test_comments() {
        let (tokens, diagnostics) = lex("// line\n/* block */ x");
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0], Token::LineComment(" line"));
        assert_eq!(
            tokens[1],
            Token::BlockComment {
                text: " block ",
                terminated: true
            }
        );
        assert_eq!(tokens[2], Token::Identifier("x"));
    }

    #[test]
    fn test_unterminated_comment_still_yields_token() {
        let (tokens, diagnostics) = lex("x /* never closed");
        assert_eq!(tokens.len(), 2);
        assert!(matches!(
            tokens[1],
            Token::BlockComment {
                terminated: false,
                ..
            }
        ));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), DiagnosticCode::UnterminatedComment);
    }

    #[test]
    fn test_directive_with_continuation() {
        let (tokens, _) = lex("#define TWO \\\n  2\nfloat");
        assert_eq!(tokens[0], Token::Directive("define TWO \\\n  2"));
        assert_eq!(tokens[1], Token::TypeName("float"));
    }

    #[test]
    fn test_invalid_character_covers_one_char() {
        let text = "a @ b";
        let index = LineIndex::new(text);
        let map = SourceMap::identity(&index);
        let (tokens, diagnostics) = tokenize(text, &map);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), DiagnosticCode::InvalidToken);
        assert_eq!(diagnostics[0].span().unwrap().range(), 2..3);
        let words: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(t.token, Token::Identifier(_)))
            .collect();
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn test_invalid_multibyte_character() {
        let text = "x é y";
        let index = LineIndex::new(text);
        let map = SourceMap::identity(&index);
        let (_, diagnostics) = tokenize(text, &map);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span().unwrap().range(), 2..4);
    }

    #[test]
    fn test_spans_are_in_document_coordinates() {
        let document = "prefix\nfloat x;";
        let index = LineIndex::new(document);
        let map = SourceMap::shifted(&index, 7);
        let (tokens, _) = tokenize("float x;", &map);
        assert_eq!(tokens[0].span.range(), 7..12);
        assert_eq!(tokens[0].span.start().line, 2);
    }
}
