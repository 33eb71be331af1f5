//! Parser for core-language tokens.
//!
//! This module turns the significant tokens of one stage into declarations.
//! Parsing is error-tolerant: a malformed statement becomes an
//! [`StmtKind::Unparsed`] node after skipping to the next `;` or the
//! enclosing `}`, and a malformed top-level declaration becomes a
//! [`DeclarationKind::Unparsed`] node after skipping a `;`-terminated
//! region or a balanced `{...}` group. Every error reports exactly the
//! token the grammar could not accept.

use std::cell::Cell;

use winnow::{
    Parser as _,
    error::{AddContext, ContextError, ErrMode},
    stream::{Stream, TokenSlice},
    token::any,
};

use prism_core::{
    Diagnostic, DiagnosticCode, DiagnosticCollector, Span, Spanned,
    ast::{
        AssignOp, BinaryOp, Block, Callee, Declaration, DeclarationKind, DelimiterKind, Expr,
        ExprKind, FunctionDecl, InterfaceBlock, Literal, Param, ParamQualifier, Precision,
        PrecisionDecl, Qualifiers, Stmt, StmtKind, StorageQualifier, StructDecl, StructMember,
        SwitchCase, Type, UnaryOp, UnparsedRegion, VariableDecl,
    },
};

use crate::{
    ParseOptions, report,
    tokens::{Keyword, PositionedToken, Punct, Token},
};

/// Context attached to parser errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// What the grammar would have accepted.
    Expected(&'static str),
    /// Remaining token count (`eof_offset()`) at the offending token.
    At(usize),
}

type Input<'t, 's> = TokenSlice<'t, PositionedToken<'s>>;
type IResult<O> = Result<O, ErrMode<ContextError<Context>>>;

/// A Cut error pointing at the token the input is positioned on.
fn expected_at(input: &Input<'_, '_>, expected: &'static str) -> ErrMode<ContextError<Context>> {
    let checkpoint = input.checkpoint();
    ErrMode::Cut(
        ContextError::new()
            .add_context(input, &checkpoint, Context::Expected(expected))
            .add_context(input, &checkpoint, Context::At(input.eof_offset())),
    )
}

fn binary_op(token: &Token<'_>) -> Option<BinaryOp> {
    let Token::Punct(punct) = token else {
        return None;
    };
    Some(match punct {
        Punct::Star => BinaryOp::Mul,
        Punct::Slash => BinaryOp::Div,
        Punct::Percent => BinaryOp::Rem,
        Punct::Plus => BinaryOp::Add,
        Punct::Minus => BinaryOp::Sub,
        Punct::Shl => BinaryOp::Shl,
        Punct::Shr => BinaryOp::Shr,
        Punct::Lt => BinaryOp::Lt,
        Punct::Gt => BinaryOp::Gt,
        Punct::Le => BinaryOp::Le,
        Punct::Ge => BinaryOp::Ge,
        Punct::EqEq => BinaryOp::Eq,
        Punct::Ne => BinaryOp::Ne,
        Punct::Amp => BinaryOp::BitAnd,
        Punct::Caret => BinaryOp::BitXor,
        Punct::Pipe => BinaryOp::BitOr,
        Punct::AndAnd => BinaryOp::And,
        Punct::XorXor => BinaryOp::Xor,
        Punct::OrOr => BinaryOp::Or,
        _ => return None,
    })
}

fn assign_op(token: &Token<'_>) -> Option<AssignOp> {
    let Token::Punct(punct) = token else {
        return None;
    };
    Some(match punct {
        Punct::Assign => AssignOp::Assign,
        Punct::PlusAssign => AssignOp::Add,
        Punct::MinusAssign => AssignOp::Sub,
        Punct::StarAssign => AssignOp::Mul,
        Punct::SlashAssign => AssignOp::Div,
        Punct::PercentAssign => AssignOp::Rem,
        Punct::ShlAssign => AssignOp::Shl,
        Punct::ShrAssign => AssignOp::Shr,
        Punct::AmpAssign => AssignOp::BitAnd,
        Punct::CaretAssign => AssignOp::BitXor,
        Punct::PipeAssign => AssignOp::BitOr,
        _ => return None,
    })
}

fn prefix_op(token: &Token<'_>) -> Option<UnaryOp> {
    match token {
        Token::Punct(Punct::Plus) => Some(UnaryOp::Plus),
        Token::Punct(Punct::Minus) => Some(UnaryOp::Neg),
        Token::Punct(Punct::Bang) => Some(UnaryOp::Not),
        Token::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
        Token::Punct(Punct::PlusPlus) => Some(UnaryOp::PreInc),
        Token::Punct(Punct::MinusMinus) => Some(UnaryOp::PreDec),
        _ => None,
    }
}

/// The array length when it is written as a non-negative integer literal.
fn literal_length(expr: &Expr) -> Option<usize> {
    match expr.kind {
        ExprKind::Literal(Literal::Int(n)) => usize::try_from(n).ok(),
        ExprKind::Literal(Literal::Uint(n)) => usize::try_from(n).ok(),
        _ => None,
    }
}

/// Where error recovery stops skipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    /// Inside a block: stop before the enclosing `}`.
    Statement,
    /// At global scope: a stray `}` is skipped along with the region.
    TopLevel,
}

/// Recursive-descent parser over the significant tokens of one stage.
pub(crate) struct Parser<'t, 's> {
    tokens: &'t [PositionedToken<'s>],
    /// Span reported for errors at the end of input.
    end: Span,
    /// Limit on nested statements and expressions.
    max_depth: usize,
    /// Limit on the height of one expression tree.
    max_height: usize,
    depth: Cell<usize>,
}

impl<'t, 's> Parser<'t, 's> {
    pub(crate) fn new(
        tokens: &'t [PositionedToken<'s>],
        end: Span,
        options: &ParseOptions,
    ) -> Self {
        Self {
            tokens,
            end,
            max_depth: options.max_nesting_depth,
            max_height: options.max_expression_height,
            depth: Cell::new(0),
        }
    }

    /// Run `f` one nesting level deeper, failing once the limit is reached.
    fn nested<O>(
        &self,
        input: &mut Input<'t, 's>,
        f: impl FnOnce(&mut Input<'t, 's>) -> IResult<O>,
    ) -> IResult<O> {
        let depth = self.depth.get();
        if depth >= self.max_depth {
            return Err(expected_at(input, "less deeply nested code"));
        }
        self.depth.set(depth + 1);
        let result = f(input);
        self.depth.set(depth);
        result
    }

    /// Build an expression node, failing on the operator at `at` (a remaining
    /// token count) when the tree grows past the height limit.
    fn node(&self, input: &Input<'t, 's>, at: usize, kind: ExprKind, span: Span) -> IResult<Expr> {
        let expr = Expr::new(kind, span);
        if expr.height() > self.max_height {
            let checkpoint = input.checkpoint();
            return Err(ErrMode::Cut(
                ContextError::new()
                    .add_context(
                        input,
                        &checkpoint,
                        Context::Expected("a shorter expression"),
                    )
                    .add_context(input, &checkpoint, Context::At(at)),
            ));
        }
        Ok(expr)
    }

    /// Parse every top-level declaration, recovering from errors.
    pub(crate) fn parse(&self, diagnostics: &mut DiagnosticCollector) -> Vec<Declaration> {
        let mut input = TokenSlice::new(self.tokens);
        self.translation_unit(&mut input, diagnostics)
    }

    // Token helpers

    fn index(&self, input: &Input<'t, 's>) -> usize {
        self.tokens.len() - input.eof_offset()
    }

    fn peek(&self, input: &Input<'t, 's>) -> Option<&'t PositionedToken<'s>> {
        self.tokens.get(self.index(input))
    }

    fn peek_nth(&self, input: &Input<'t, 's>, n: usize) -> Option<&'t PositionedToken<'s>> {
        self.tokens.get(self.index(input) + n)
    }

    fn peek_token(&self, input: &Input<'t, 's>) -> Option<&'t Token<'s>> {
        self.peek(input).map(|t| &t.token)
    }

    fn at_punct(&self, input: &Input<'t, 's>, punct: Punct) -> bool {
        self.peek(input).is_some_and(|t| t.is_punct(punct))
    }

    fn at_keyword(&self, input: &Input<'t, 's>, keyword: Keyword) -> bool {
        self.peek(input).is_some_and(|t| t.is_keyword(keyword))
    }

    fn bump(&self, input: &mut Input<'t, 's>) -> Option<&'t PositionedToken<'s>> {
        input.next_token()
    }

    /// Span of the token about to be consumed.
    fn current_span(&self, input: &Input<'t, 's>) -> Span {
        self.peek(input).map_or(self.end, |t| t.span)
    }

    /// Span of the token consumed last.
    fn prev_span(&self, input: &Input<'t, 's>) -> Span {
        match self.index(input).checked_sub(1) {
            Some(index) => self.tokens[index].span,
            None => self.end,
        }
    }

    fn eat_punct(&self, input: &mut Input<'t, 's>, punct: Punct) -> Option<Span> {
        if self.at_punct(input, punct) {
            self.bump(input).map(|t| t.span)
        } else {
            None
        }
    }

    fn eat_keyword(&self, input: &mut Input<'t, 's>, keyword: Keyword) -> Option<Span> {
        if self.at_keyword(input, keyword) {
            self.bump(input).map(|t| t.span)
        } else {
            None
        }
    }

    fn expect_punct(
        &self,
        input: &mut Input<'t, 's>,
        punct: Punct,
        expected: &'static str,
    ) -> IResult<Span> {
        self.eat_punct(input, punct)
            .ok_or_else(|| expected_at(input, expected))
    }

    fn identifier(&self, input: &mut Input<'t, 's>) -> IResult<Spanned<String>> {
        any.verify_map(|token: &'t PositionedToken<'s>| match token.token {
            Token::Identifier(name) => Some(Spanned::new(name.to_string(), token.span)),
            _ => None,
        })
        .parse_next(input)
        .map_err(|_: ErrMode<ContextError<Context>>| expected_at(input, "identifier"))
    }

    /// Convert a parser error into a diagnostic on the offending token.
    pub(crate) fn convert_error(&self, error: ErrMode<ContextError<Context>>) -> Diagnostic {
        let context = match error {
            ErrMode::Backtrack(e) | ErrMode::Cut(e) => e,
            ErrMode::Incomplete(_) => ContextError::new(),
        };
        let expected = context
            .context()
            .find_map(|ctx| match ctx {
                Context::Expected(expected) => Some(*expected),
                Context::At(_) => None,
            })
            .unwrap_or("valid syntax");
        let offending = context
            .context()
            .find_map(|ctx| match ctx {
                Context::At(remaining) => Some(*remaining),
                Context::Expected(_) => None,
            })
            .and_then(|remaining| self.tokens.get(self.tokens.len().checked_sub(remaining)?));

        match offending {
            Some(token) => Diagnostic::error(
                DiagnosticCode::SyntaxError,
                format!("expected {expected}, found {}", token.token),
            )
            .with_span(token.span),
            None => Diagnostic::error(
                DiagnosticCode::UnexpectedEof,
                format!("expected {expected}, found end of input"),
            )
            .with_span(self.end),
        }
    }

    /// Skip a malformed region and return its span.
    fn skip_region(&self, input: &mut Input<'t, 's>, recovery: Recovery) -> Span {
        let start = self.current_span(input);
        let first = self.index(input);
        let mut depth = 0usize;
        while let Some(token) = self.peek(input) {
            match token.token {
                Token::Punct(Punct::LeftBrace) => depth += 1,
                Token::Punct(Punct::RightBrace) if depth == 0 => {
                    if recovery == Recovery::TopLevel {
                        self.bump(input);
                    }
                    break;
                }
                Token::Punct(Punct::RightBrace) => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump(input);
                        break;
                    }
                }
                Token::Punct(Punct::Semicolon) if depth == 0 => {
                    self.bump(input);
                    break;
                }
                _ => {}
            }
            self.bump(input);
        }
        if self.index(input) == first {
            // Nothing skipped: an empty region right after the last token.
            let end = self.prev_span(input).end();
            return Span::new(end, end);
        }
        start.union(self.prev_span(input))
    }

    /// Consume the `;` ending a statement or declaration.
    ///
    /// When the `;` is missing but the next token starts a new line, closes
    /// the block, or the input ends, the omission is reported and parsing
    /// continues as if it were there. Returns the span of the last token in
    /// that case.
    fn terminator(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Option<Span>> {
        if self.eat_punct(input, Punct::Semicolon).is_some() {
            return Ok(None);
        }
        let last = self.prev_span(input);
        let recoverable = match self.peek(input) {
            None => true,
            Some(next) => {
                next.is_punct(Punct::RightBrace) || next.span.start().line > last.end().line
            }
        };
        if recoverable {
            diagnostics.emit(report::missing_terminator(last));
            Ok(Some(last))
        } else {
            Err(expected_at(input, "`;`"))
        }
    }

    // Declarations

    fn translation_unit(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        while input.eof_offset() > 0 {
            if self.eat_punct(input, Punct::Semicolon).is_some() {
                continue;
            }
            let checkpoint = input.checkpoint();
            match self.external_declaration(input, diagnostics) {
                Ok(mut parsed) => declarations.append(&mut parsed),
                Err(err) => {
                    diagnostics.emit(self.convert_error(err));
                    input.reset(&checkpoint);
                    let span = self.skip_region(input, Recovery::TopLevel);
                    declarations.push(Declaration::new(
                        DeclarationKind::Unparsed(UnparsedRegion { span }),
                        span,
                    ));
                }
            }
        }
        declarations
    }

    fn external_declaration(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Vec<Declaration>> {
        let start = self.current_span(input);
        if self.at_keyword(input, Keyword::Precision) {
            return self
                .precision_declaration(input, diagnostics)
                .map(|d| vec![d]);
        }

        let qualifiers = self.qualifiers(input)?;
        if self.at_keyword(input, Keyword::Struct) {
            return self.struct_declaration(input, qualifiers, start, diagnostics);
        }
        if qualifiers.storage != StorageQualifier::None
            && matches!(self.peek_token(input), Some(Token::Identifier(_)))
            && self
                .peek_nth(input, 1)
                .is_some_and(|t| t.is_punct(Punct::LeftBrace))
        {
            return self
                .interface_block(input, qualifiers, start, diagnostics)
                .map(|d| vec![d]);
        }

        let ty = self.type_specifier(input)?;
        let name = self.identifier(input)?;
        if self.at_punct(input, Punct::LeftParen) {
            return self
                .function(input, ty, name, start, diagnostics)
                .map(|d| vec![d]);
        }

        let variables = self.declarators(input, &qualifiers, &ty, name, start)?;
        let missing = self.terminator(input, diagnostics)?;
        let span = start.union(self.prev_span(input));
        Ok(variables
            .into_iter()
            .map(|variable| {
                let mut declaration = Declaration::new(DeclarationKind::Variable(variable), span);
                declaration.missing_terminator = missing;
                declaration
            })
            .collect())
    }

    fn precision_declaration(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Declaration> {
        let start = self.current_span(input);
        self.bump(input);
        let precision = match self.peek_token(input) {
            Some(Token::Keyword(keyword @ (Keyword::Lowp | Keyword::Mediump | Keyword::Highp))) => {
                Precision::from_keyword(keyword.as_str())
            }
            _ => None,
        }
        .ok_or_else(|| expected_at(input, "`lowp`, `mediump` or `highp`"))?;
        self.bump(input);
        let ty = self.type_specifier(input)?;
        let missing = self.terminator(input, diagnostics)?;
        let span = start.union(self.prev_span(input));
        let mut declaration = Declaration::new(
            DeclarationKind::Precision(PrecisionDecl {
                precision,
                ty,
                span,
            }),
            span,
        );
        declaration.missing_terminator = missing;
        Ok(declaration)
    }

    fn qualifiers(&self, input: &mut Input<'t, 's>) -> IResult<Qualifiers> {
        let mut qualifiers = Qualifiers::default();
        while let Some(Token::Keyword(keyword)) = self.peek_token(input) {
            match keyword {
                Keyword::Layout => {
                    self.bump(input);
                    qualifiers.layout.extend(self.layout_qualifier(input)?);
                    continue;
                }
                Keyword::Lowp | Keyword::Mediump | Keyword::Highp => {
                    qualifiers.precision = Precision::from_keyword(keyword.as_str());
                }
                Keyword::Flat | Keyword::Smooth | Keyword::NoPerspective | Keyword::Centroid => {
                    qualifiers.interpolation = Some(keyword.as_str().to_string());
                }
                Keyword::Invariant => qualifiers.invariant = true,
                Keyword::Const
                | Keyword::Uniform
                | Keyword::Attribute
                | Keyword::Varying
                | Keyword::In
                | Keyword::Out
                | Keyword::Buffer
                | Keyword::Shared => {
                    qualifiers.storage =
                        StorageQualifier::from_keyword(keyword.as_str()).unwrap_or_default();
                }
                _ => break,
            }
            self.bump(input);
        }
        Ok(qualifiers)
    }

    /// `layout(location = 0, std140)`; returns the identifiers.
    fn layout_qualifier(&self, input: &mut Input<'t, 's>) -> IResult<Vec<String>> {
        self.expect_punct(input, Punct::LeftParen, "`(` after `layout`")?;
        let mut names = Vec::new();
        loop {
            let name = match self.peek_token(input) {
                Some(Token::Identifier(name)) => name.to_string(),
                Some(Token::Keyword(Keyword::Shared)) => "shared".to_string(),
                _ => return Err(expected_at(input, "layout qualifier name")),
            };
            self.bump(input);
            names.push(name);
            if self.eat_punct(input, Punct::Assign).is_some() {
                self.conditional(input)?;
            }
            if self.eat_punct(input, Punct::Comma).is_none() {
                break;
            }
        }
        self.expect_punct(input, Punct::RightParen, "`)` or `,`")?;
        Ok(names)
    }

    /// A type name, optionally followed by array dimensions.
    fn type_specifier(&self, input: &mut Input<'t, 's>) -> IResult<Spanned<Type>> {
        let start = self.current_span(input);
        let ty = any
            .verify_map(|token: &'t PositionedToken<'s>| match token.token {
                Token::TypeName(name) => Type::from_keyword(name),
                Token::Identifier(name) => Some(Type::Struct(name.to_string())),
                _ => None,
            })
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError<Context>>| expected_at(input, "type"))?;
        let (ty, _) = self.array_suffix(input, ty)?;
        Ok(Spanned::new(ty, start.union(self.prev_span(input))))
    }

    /// Zero or more `[N]` / `[]` suffixes. Returns the array type and the
    /// outermost length expression as written.
    fn array_suffix(&self, input: &mut Input<'t, 's>, ty: Type) -> IResult<(Type, Option<Expr>)> {
        let mut ty = ty;
        let mut size = None;
        while self.eat_punct(input, Punct::LeftBracket).is_some() {
            if self.eat_punct(input, Punct::RightBracket).is_some() {
                ty = Type::Array(Box::new(ty), None);
                continue;
            }
            let length = self.conditional(input)?;
            self.expect_punct(input, Punct::RightBracket, "`]`")?;
            ty = Type::Array(Box::new(ty), literal_length(&length));
            size = Some(length);
        }
        Ok((ty, size))
    }

    /// `name [N] = init, name2, ...` after the type. The first declarator's
    /// span starts at `start`.
    fn declarators(
        &self,
        input: &mut Input<'t, 's>,
        qualifiers: &Qualifiers,
        ty: &Spanned<Type>,
        first: Spanned<String>,
        start: Span,
    ) -> IResult<Vec<VariableDecl>> {
        let mut variables = Vec::new();
        let mut name = first;
        let mut span_start = start;
        loop {
            let (declared, array_size) = self.array_suffix(input, ty.inner().clone())?;
            let initializer = match self.eat_punct(input, Punct::Assign) {
                Some(_) => Some(self.assignment(input)?),
                None => None,
            };
            let span = span_start.union(self.prev_span(input));
            variables.push(VariableDecl {
                qualifiers: qualifiers.clone(),
                ty: Spanned::new(declared, ty.span()),
                name,
                array_size,
                initializer,
                span,
            });
            if self.eat_punct(input, Punct::Comma).is_none() {
                break;
            }
            name = self.identifier(input)?;
            span_start = name.span();
        }
        Ok(variables)
    }

    fn function(
        &self,
        input: &mut Input<'t, 's>,
        return_type: Spanned<Type>,
        name: Spanned<String>,
        start: Span,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Declaration> {
        let params = self.parameters(input)?;
        let (body, missing) = if self.at_punct(input, Punct::LeftBrace) {
            (Some(self.block(input, diagnostics)?), None)
        } else {
            (None, self.terminator(input, diagnostics)?)
        };
        let span = start.union(self.prev_span(input));
        let mut declaration = Declaration::new(
            DeclarationKind::Function(FunctionDecl {
                return_type,
                name,
                params,
                body,
                span,
            }),
            span,
        );
        declaration.missing_terminator = missing;
        Ok(declaration)
    }

    /// `( params )`, accepting `()` and `(void)`.
    fn parameters(&self, input: &mut Input<'t, 's>) -> IResult<Vec<Param>> {
        self.expect_punct(input, Punct::LeftParen, "`(`")?;
        if self.eat_punct(input, Punct::RightParen).is_some() {
            return Ok(Vec::new());
        }
        if matches!(self.peek_token(input), Some(Token::TypeName("void")))
            && self
                .peek_nth(input, 1)
                .is_some_and(|t| t.is_punct(Punct::RightParen))
        {
            self.bump(input);
            self.bump(input);
            return Ok(Vec::new());
        }

        let mut params = Vec::new();
        loop {
            params.push(self.parameter(input)?);
            if self.eat_punct(input, Punct::Comma).is_none() {
                break;
            }
        }
        self.expect_punct(input, Punct::RightParen, "`)` or `,`")?;
        Ok(params)
    }

    fn parameter(&self, input: &mut Input<'t, 's>) -> IResult<Param> {
        let start = self.current_span(input);
        let mut qualifier = ParamQualifier::In;
        let mut is_const = false;
        while let Some(Token::Keyword(keyword)) = self.peek_token(input) {
            match keyword {
                Keyword::Const => is_const = true,
                Keyword::In => qualifier = ParamQualifier::In,
                Keyword::Out => qualifier = ParamQualifier::Out,
                Keyword::InOut => qualifier = ParamQualifier::InOut,
                Keyword::Lowp | Keyword::Mediump | Keyword::Highp => {}
                _ => break,
            }
            self.bump(input);
        }
        let ty = self.type_specifier(input)?;
        let (ty, name) = match self.peek_token(input) {
            Some(Token::Identifier(_)) => {
                let name = self.identifier(input)?;
                let (declared, _) = self.array_suffix(input, ty.inner().clone())?;
                (Spanned::new(declared, ty.span()), Some(name))
            }
            _ => (ty, None),
        };
        Ok(Param {
            qualifier,
            is_const,
            ty,
            name,
            span: start.union(self.prev_span(input)),
        })
    }

    /// `{ type name; ... }` of a struct or interface block.
    fn member_list(&self, input: &mut Input<'t, 's>) -> IResult<Vec<StructMember>> {
        self.expect_punct(input, Punct::LeftBrace, "`{`")?;
        let mut members = Vec::new();
        while self.eat_punct(input, Punct::RightBrace).is_none() {
            let start = self.current_span(input);
            self.qualifiers(input)?;
            let ty = self.type_specifier(input)?;
            loop {
                let name = self.identifier(input)?;
                let (declared, _) = self.array_suffix(input, ty.inner().clone())?;
                members.push(StructMember {
                    ty: Spanned::new(declared, ty.span()),
                    name,
                    span: start.union(self.prev_span(input)),
                });
                if self.eat_punct(input, Punct::Comma).is_none() {
                    break;
                }
            }
            self.expect_punct(input, Punct::Semicolon, "`;` after struct member")?;
        }
        Ok(members)
    }

    fn struct_declaration(
        &self,
        input: &mut Input<'t, 's>,
        qualifiers: Qualifiers,
        start: Span,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Vec<Declaration>> {
        self.bump(input);
        let name = self.identifier(input)?;
        let members = self.member_list(input)?;
        let struct_span = start.union(self.prev_span(input));

        let variables = if matches!(self.peek_token(input), Some(Token::Identifier(_))) {
            let ty = Spanned::new(Type::Struct(name.inner().clone()), name.span());
            let first = self.identifier(input)?;
            let first_span = first.span();
            self.declarators(input, &qualifiers, &ty, first, first_span)?
        } else {
            Vec::new()
        };
        let missing = self.terminator(input, diagnostics)?;
        let span = start.union(self.prev_span(input));

        let mut declaration = Declaration::new(
            DeclarationKind::Struct(StructDecl {
                name,
                members,
                span: struct_span,
            }),
            span,
        );
        declaration.missing_terminator = missing;
        let mut declarations = vec![declaration];
        declarations.extend(
            variables
                .into_iter()
                .map(|variable| Declaration::new(DeclarationKind::Variable(variable), span)),
        );
        Ok(declarations)
    }

    fn interface_block(
        &self,
        input: &mut Input<'t, 's>,
        qualifiers: Qualifiers,
        start: Span,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Declaration> {
        let block_name = self.identifier(input)?;
        let members = self.member_list(input)?;
        let instance = match self.peek_token(input) {
            Some(Token::Identifier(_)) => {
                let instance = self.identifier(input)?;
                self.array_suffix(input, Type::Void)?;
                Some(instance)
            }
            _ => None,
        };
        let missing = self.terminator(input, diagnostics)?;
        let span = start.union(self.prev_span(input));
        let mut declaration = Declaration::new(
            DeclarationKind::InterfaceBlock(InterfaceBlock {
                qualifiers,
                block_name,
                members,
                instance,
                span,
            }),
            span,
        );
        declaration.missing_terminator = missing;
        Ok(declaration)
    }

    // Statements

    fn block(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Block> {
        let open = self.expect_punct(input, Punct::LeftBrace, "`{`")?;
        let mut statements = Vec::new();
        loop {
            match self.peek(input) {
                None => {
                    diagnostics.emit(report::unclosed_delimiter(DelimiterKind::Brace, open));
                    break;
                }
                Some(token) if token.is_punct(Punct::RightBrace) => {
                    self.bump(input);
                    break;
                }
                Some(_) => statements.push(self.statement_recovering(input, diagnostics)),
            }
        }
        Ok(Block {
            statements,
            span: open.union(self.prev_span(input)),
        })
    }

    fn statement_recovering(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> Stmt {
        let checkpoint = input.checkpoint();
        match self.statement(input, diagnostics) {
            Ok(stmt) => stmt,
            Err(err) => {
                diagnostics.emit(self.convert_error(err));
                input.reset(&checkpoint);
                let span = self.skip_region(input, Recovery::Statement);
                Stmt::new(StmtKind::Unparsed(UnparsedRegion { span }), span)
            }
        }
    }

    fn statement(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Stmt> {
        self.nested(input, |input| self.statement_inner(input, diagnostics))
    }

    fn statement_inner(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Stmt> {
        let start = self.current_span(input);
        let Some(token) = self.peek(input) else {
            return Err(expected_at(input, "statement"));
        };

        match token.token {
            Token::Punct(Punct::LeftBrace) => {
                let block = self.block(input, diagnostics)?;
                let span = block.span;
                Ok(Stmt::new(StmtKind::Block { block }, span))
            }
            Token::Punct(Punct::Semicolon) => {
                self.bump(input);
                Ok(Stmt::new(StmtKind::Empty, start))
            }
            Token::Keyword(Keyword::If) => self.if_statement(input, diagnostics),
            Token::Keyword(Keyword::For) => self.for_statement(input, diagnostics),
            Token::Keyword(Keyword::While) => self.while_statement(input, diagnostics),
            Token::Keyword(Keyword::Do) => self.do_while_statement(input, diagnostics),
            Token::Keyword(Keyword::Switch) => self.switch_statement(input, diagnostics),
            Token::Keyword(Keyword::Return) => {
                self.bump(input);
                let value = if self.at_punct(input, Punct::Semicolon)
                    || self.at_punct(input, Punct::RightBrace)
                    || input.eof_offset() == 0
                {
                    None
                } else {
                    Some(self.expression(input)?)
                };
                self.finish_statement(input, diagnostics, StmtKind::Return(value), start)
            }
            Token::Keyword(Keyword::Break) => {
                self.bump(input);
                self.finish_statement(input, diagnostics, StmtKind::Break, start)
            }
            Token::Keyword(Keyword::Continue) => {
                self.bump(input);
                self.finish_statement(input, diagnostics, StmtKind::Continue, start)
            }
            Token::Keyword(Keyword::Discard) => {
                self.bump(input);
                self.finish_statement(input, diagnostics, StmtKind::Discard, start)
            }
            _ if self.at_declaration(input) => {
                let variables = self.local_declaration(input)?;
                self.finish_statement(
                    input,
                    diagnostics,
                    StmtKind::Declaration { variables },
                    start,
                )
            }
            _ => {
                let expr = self.expression(input)?;
                self.finish_statement(input, diagnostics, StmtKind::Expression { expr }, start)
            }
        }
    }

    fn finish_statement(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
        kind: StmtKind,
        start: Span,
    ) -> IResult<Stmt> {
        let missing = self.terminator(input, diagnostics)?;
        let mut stmt = Stmt::new(kind, start.union(self.prev_span(input)));
        stmt.missing_terminator = missing;
        Ok(stmt)
    }

    /// Whether the next tokens start a local variable declaration.
    fn at_declaration(&self, input: &Input<'t, 's>) -> bool {
        match self.peek_token(input) {
            Some(Token::TypeName(_)) => !self
                .peek_nth(input, 1)
                .is_some_and(|t| t.is_punct(Punct::LeftParen)),
            Some(Token::Keyword(keyword)) => keyword.is_qualifier(),
            // `Light light;`
            Some(Token::Identifier(_)) => matches!(
                self.peek_nth(input, 1).map(|t| &t.token),
                Some(Token::Identifier(_))
            ),
            _ => false,
        }
    }

    fn local_declaration(&self, input: &mut Input<'t, 's>) -> IResult<Vec<VariableDecl>> {
        let start = self.current_span(input);
        let qualifiers = self.qualifiers(input)?;
        let ty = self.type_specifier(input)?;
        let name = self.identifier(input)?;
        self.declarators(input, &qualifiers, &ty, name, start)
    }

    /// `( expression )` after `if`, `while` and `switch`.
    fn condition(&self, input: &mut Input<'t, 's>, keyword: &'static str) -> IResult<Expr> {
        self.expect_punct(input, Punct::LeftParen, keyword)?;
        let condition = self.expression(input)?;
        self.expect_punct(input, Punct::RightParen, "`)`")?;
        Ok(condition)
    }

    fn if_statement(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Stmt> {
        let start = self.current_span(input);
        self.bump(input);
        let condition = self.condition(input, "`(` after `if`")?;
        let then_branch = Box::new(self.statement_recovering(input, diagnostics));
        let else_branch = match self.eat_keyword(input, Keyword::Else) {
            Some(_) => Some(Box::new(self.statement_recovering(input, diagnostics))),
            None => None,
        };
        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            start.union(self.prev_span(input)),
        ))
    }

    fn for_statement(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Stmt> {
        let start = self.current_span(input);
        self.bump(input);
        self.expect_punct(input, Punct::LeftParen, "`(` after `for`")?;

        let init_start = self.current_span(input);
        let init = if self.eat_punct(input, Punct::Semicolon).is_some() {
            None
        } else {
            let kind = if self.at_declaration(input) {
                StmtKind::Declaration {
                    variables: self.local_declaration(input)?,
                }
            } else {
                StmtKind::Expression {
                    expr: self.expression(input)?,
                }
            };
            let semicolon = self.expect_punct(input, Punct::Semicolon, "`;`")?;
            Some(Box::new(Stmt::new(kind, init_start.union(semicolon))))
        };

        let condition = if self.at_punct(input, Punct::Semicolon) {
            None
        } else {
            Some(self.expression(input)?)
        };
        self.expect_punct(input, Punct::Semicolon, "`;`")?;

        let step = if self.at_punct(input, Punct::RightParen) {
            None
        } else {
            Some(self.expression(input)?)
        };
        self.expect_punct(input, Punct::RightParen, "`)`")?;

        let body = Box::new(self.statement_recovering(input, diagnostics));
        Ok(Stmt::new(
            StmtKind::For {
                init,
                condition,
                step,
                body,
            },
            start.union(self.prev_span(input)),
        ))
    }

    fn while_statement(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Stmt> {
        let start = self.current_span(input);
        self.bump(input);
        let condition = self.condition(input, "`(` after `while`")?;
        let body = Box::new(self.statement_recovering(input, diagnostics));
        Ok(Stmt::new(
            StmtKind::While { condition, body },
            start.union(self.prev_span(input)),
        ))
    }

    fn do_while_statement(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Stmt> {
        let start = self.current_span(input);
        self.bump(input);
        let body = Box::new(self.statement_recovering(input, diagnostics));
        if self.eat_keyword(input, Keyword::While).is_none() {
            return Err(expected_at(input, "`while` after the loop body"));
        }
        let condition = self.condition(input, "`(` after `while`")?;
        self.finish_statement(
            input,
            diagnostics,
            StmtKind::DoWhile { body, condition },
            start,
        )
    }

    fn switch_statement(
        &self,
        input: &mut Input<'t, 's>,
        diagnostics: &mut DiagnosticCollector,
    ) -> IResult<Stmt> {
        let start = self.current_span(input);
        self.bump(input);
        let selector = self.condition(input, "`(` after `switch`")?;
        let open = self.expect_punct(input, Punct::LeftBrace, "`{`")?;

        let mut cases: Vec<SwitchCase> = Vec::new();
        loop {
            let Some(token) = self.peek(input) else {
                diagnostics.emit(report::unclosed_delimiter(DelimiterKind::Brace, open));
                break;
            };
            match token.token {
                Token::Punct(Punct::RightBrace) => {
                    self.bump(input);
                    break;
                }
                Token::Keyword(Keyword::Case) => {
                    let case_start = token.span;
                    self.bump(input);
                    let label = self.conditional(input)?;
                    self.expect_punct(input, Punct::Colon, "`:` after the case label")?;
                    cases.push(SwitchCase {
                        label: Some(label),
                        body: Vec::new(),
                        span: case_start.union(self.prev_span(input)),
                    });
                }
                Token::Keyword(Keyword::Default) => {
                    let case_start = token.span;
                    self.bump(input);
                    self.expect_punct(input, Punct::Colon, "`:` after `default`")?;
                    cases.push(SwitchCase {
                        label: None,
                        body: Vec::new(),
                        span: case_start.union(self.prev_span(input)),
                    });
                }
                _ => {
                    let Some(case) = cases.last_mut() else {
                        return Err(expected_at(input, "`case` or `default`"));
                    };
                    let stmt = self.statement_recovering(input, diagnostics);
                    case.span = case.span.union(stmt.span);
                    case.body.push(stmt);
                }
            }
        }

        Ok(Stmt::new(
            StmtKind::Switch { selector, cases },
            start.union(self.prev_span(input)),
        ))
    }

    // Expressions

    /// Comma-separated sequence of assignments.
    pub(crate) fn expression(&self, input: &mut Input<'t, 's>) -> IResult<Expr> {
        let first = self.assignment(input)?;
        if !self.at_punct(input, Punct::Comma) {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat_punct(input, Punct::Comma).is_some() {
            exprs.push(self.assignment(input)?);
        }
        let span = exprs[0].span.union(self.prev_span(input));
        Ok(Expr::new(ExprKind::Sequence(exprs), span))
    }

    /// Assignment is right-associative: `a = b = c` is `a = (b = c)`.
    fn assignment(&self, input: &mut Input<'t, 's>) -> IResult<Expr> {
        let target = self.conditional(input)?;
        let Some(op) = self.peek_token(input).and_then(assign_op) else {
            return Ok(target);
        };
        let at = input.eof_offset();
        self.bump(input);
        let value = self.nested(input, |input| self.assignment(input))?;
        let span = target.span.union(value.span);
        self.node(
            input,
            at,
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        )
    }

    fn conditional(&self, input: &mut Input<'t, 's>) -> IResult<Expr> {
        let condition = self.binary(input, 1)?;
        let at = input.eof_offset();
        if self.eat_punct(input, Punct::Question).is_none() {
            return Ok(condition);
        }
        let (then_branch, else_branch) = self.nested(input, |input| {
            let then_branch = self.expression(input)?;
            self.expect_punct(input, Punct::Colon, "`:` in conditional expression")?;
            Ok((then_branch, self.assignment(input)?))
        })?;
        let span = condition.span.union(else_branch.span);
        self.node(
            input,
            at,
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        )
    }

    /// Precedence climbing over the binary operators.
    fn binary(&self, input: &mut Input<'t, 's>, min_precedence: u8) -> IResult<Expr> {
        let mut lhs = self.unary(input)?;
        while let Some(op) = self.peek_token(input).and_then(binary_op) {
            if op.precedence() < min_precedence {
                break;
            }
            let at = input.eof_offset();
            self.bump(input);
            let rhs = self.binary(input, op.precedence() + 1)?;
            let span = lhs.span.union(rhs.span);
            lhs = self.node(
                input,
                at,
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            )?;
        }
        Ok(lhs)
    }

    fn unary(&self, input: &mut Input<'t, 's>) -> IResult<Expr> {
        self.nested(input, |input| self.unary_inner(input))
    }

    fn unary_inner(&self, input: &mut Input<'t, 's>) -> IResult<Expr> {
        let Some(op) = self.peek_token(input).and_then(prefix_op) else {
            return self.postfix(input);
        };
        let start = self.current_span(input);
        self.bump(input);
        let operand = self.unary(input)?;
        let span = start.union(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn postfix(&self, input: &mut Input<'t, 's>) -> IResult<Expr> {
        let mut expr = self.primary(input)?;
        loop {
            let Some(Token::Punct(punct)) = self.peek_token(input) else {
                break;
            };
            let at = input.eof_offset();
            let (kind, span) = match punct {
                Punct::LeftBracket => {
                    self.bump(input);
                    let index = self.expression(input)?;
                    let close = self.expect_punct(input, Punct::RightBracket, "`]`")?;
                    let span = expr.span.union(close);
                    (
                        ExprKind::Index {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    )
                }
                Punct::Dot => {
                    self.bump(input);
                    let member = self.identifier(input)?;
                    if self.at_punct(input, Punct::LeftParen) {
                        // `array.length()`
                        let (mut args, close) = self.arguments(input)?;
                        let span = expr.span.union(close);
                        args.insert(0, expr);
                        let callee = member.map(|name| Callee::Function(name.clone()));
                        (ExprKind::Call { callee, args }, span)
                    } else {
                        let span = expr.span.union(member.span());
                        (
                            ExprKind::Member {
                                base: Box::new(expr),
                                member,
                            },
                            span,
                        )
                    }
                }
                Punct::PlusPlus | Punct::MinusMinus => {
                    let op = if *punct == Punct::PlusPlus {
                        UnaryOp::PostInc
                    } else {
                        UnaryOp::PostDec
                    };
                    let close = self.current_span(input);
                    self.bump(input);
                    let span = expr.span.union(close);
                    (
                        ExprKind::Unary {
                            op,
                            operand: Box::new(expr),
                        },
                        span,
                    )
                }
                _ => break,
            };
            expr = self.node(input, at, kind, span)?;
        }
        Ok(expr)
    }

    /// `( args )` of a call; returns the arguments and the `)` span.
    fn arguments(&self, input: &mut Input<'t, 's>) -> IResult<(Vec<Expr>, Span)> {
        self.expect_punct(input, Punct::LeftParen, "`(`")?;
        if let Some(close) = self.eat_punct(input, Punct::RightParen) {
            return Ok((Vec::new(), close));
        }
        if matches!(self.peek_token(input), Some(Token::TypeName("void")))
            && self
                .peek_nth(input, 1)
                .is_some_and(|t| t.is_punct(Punct::RightParen))
        {
            self.bump(input);
            let close = self.current_span(input);
            self.bump(input);
            return Ok((Vec::new(), close));
        }

        let mut args = Vec::new();
        loop {
            args.push(self.assignment(input)?);
            if self.eat_punct(input, Punct::Comma).is_none() {
                break;
            }
        }
        let close = self.expect_punct(input, Punct::RightParen, "`)` or `,`")?;
        Ok((args, close))
    }

    fn primary(&self, input: &mut Input<'t, 's>) -> IResult<Expr> {
        let Some(token) = self.peek(input) else {
            return Err(expected_at(input, "expression"));
        };
        let span = token.span;

        let literal = match token.token {
            Token::IntLiteral(value) => Some(Literal::Int(value)),
            Token::UintLiteral(value) => Some(Literal::Uint(value)),
            Token::FloatLiteral(value) => Some(Literal::Float(value)),
            Token::BoolLiteral(value) => Some(Literal::Bool(value)),
            _ => None,
        };
        if let Some(literal) = literal {
            self.bump(input);
            return Ok(Expr::new(ExprKind::Literal(literal), span));
        }

        match token.token {
            Token::Identifier(name) => {
                self.bump(input);
                if self.at_punct(input, Punct::LeftParen) {
                    let (args, close) = self.arguments(input)?;
                    let callee = Spanned::new(Callee::Function(name.to_string()), span);
                    return Ok(Expr::new(
                        ExprKind::Call { callee, args },
                        span.union(close),
                    ));
                }
                Ok(Expr::new(ExprKind::Identifier(name.to_string()), span))
            }
            Token::TypeName(_) => {
                // Constructor: `vec3(1.0)` or `float[2](a, b)`.
                let ty = self.type_specifier(input)?;
                if !self.at_punct(input, Punct::LeftParen) {
                    return Err(expected_at(input, "`(` after the type name"));
                }
                let (args, close) = self.arguments(input)?;
                let callee = ty.map(|ty| Callee::Constructor(ty.clone()));
                Ok(Expr::new(
                    ExprKind::Call { callee, args },
                    span.union(close),
                ))
            }
            Token::Punct(Punct::LeftParen) => {
                self.bump(input);
                let inner = self.expression(input)?;
                let close = self.expect_punct(input, Punct::RightParen, "`)`")?;
                Ok(Expr::new(inner.kind, span.union(close)))
            }
            _ => Err(expected_at(input, "expression")),
        }
    }
}
