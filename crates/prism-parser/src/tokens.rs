//! Tokens of the core shading language.

use std::{fmt, ops::Range};

use prism_core::Span;

/// Reserved words that drive the grammar.
///
/// Type names such as `vec3` are not keywords here; they are lexed as
/// [`Token::TypeName`] so the parser can treat them uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Discard,
    Struct,
    Precision,
    Layout,
    Const,
    Uniform,
    Attribute,
    Varying,
    In,
    Out,
    InOut,
    Buffer,
    Shared,
    Lowp,
    Mediump,
    Highp,
    Flat,
    Smooth,
    NoPerspective,
    Centroid,
    Invariant,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "if" => Self::If,
            "else" => Self::Else,
            "for" => Self::For,
            "while" => Self::While,
            "do" => Self::Do,
            "switch" => Self::Switch,
            "case" => Self::Case,
            "default" => Self::Default,
            "break" => Self::Break,
            "continue" => Self::Continue,
            "return" => Self::Return,
            "discard" => Self::Discard,
            "struct" => Self::Struct,
            "precision" => Self::Precision,
            "layout" => Self::Layout,
            "const" => Self::Const,
            "uniform" => Self::Uniform,
            "attribute" => Self::Attribute,
            "varying" => Self::Varying,
            "in" => Self::In,
            "out" => Self::Out,
            "inout" => Self::InOut,
            "buffer" => Self::Buffer,
            "shared" => Self::Shared,
            "lowp" => Self::Lowp,
            "mediump" => Self::Mediump,
            "highp" => Self::Highp,
            "flat" => Self::Flat,
            "smooth" => Self::Smooth,
            "noperspective" => Self::NoPerspective,
            "centroid" => Self::Centroid,
            "invariant" => Self::Invariant,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Else => "else",
            Self::For => "for",
            Self::While => "while",
            Self::Do => "do",
            Self::Switch => "switch",
            Self::Case => "case",
            Self::Default => "default",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Return => "return",
            Self::Discard => "discard",
            Self::Struct => "struct",
            Self::Precision => "precision",
            Self::Layout => "layout",
            Self::Const => "const",
            Self::Uniform => "uniform",
            Self::Attribute => "attribute",
            Self::Varying => "varying",
            Self::In => "in",
            Self::Out => "out",
            Self::InOut => "inout",
            Self::Buffer => "buffer",
            Self::Shared => "shared",
            Self::Lowp => "lowp",
            Self::Mediump => "mediump",
            Self::Highp => "highp",
            Self::Flat => "flat",
            Self::Smooth => "smooth",
            Self::NoPerspective => "noperspective",
            Self::Centroid => "centroid",
            Self::Invariant => "invariant",
        }
    }

    /// Keywords that may start a declaration's qualifier list.
    pub fn is_qualifier(&self) -> bool {
        matches!(
            self,
            Self::Const
                | Self::Uniform
                | Self::Attribute
                | Self::Varying
                | Self::In
                | Self::Out
                | Self::InOut
                | Self::Buffer
                | Self::Shared
                | Self::Lowp
                | Self::Mediump
                | Self::Highp
                | Self::Flat
                | Self::Smooth
                | Self::NoPerspective
                | Self::Centroid
                | Self::Invariant
                | Self::Layout
        )
    }
}

/// Operators and punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    Ne,
    AndAnd,
    OrOr,
    XorXor,
    Amp,
    Pipe,
    Caret,
    Bang,
    Tilde,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    ShlAssign,
    ShrAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    Shl,
    Shr,
    PlusPlus,
    MinusMinus,
}

impl Punct {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::LeftBracket => "[",
            Self::RightBracket => "]",
            Self::LeftBrace => "{",
            Self::RightBrace => "}",
            Self::Dot => ".",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Question => "?",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::EqEq => "==",
            Self::Ne => "!=",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::XorXor => "^^",
            Self::Amp => "&",
            Self::Pipe => "|",
            Self::Caret => "^",
            Self::Bang => "!",
            Self::Tilde => "~",
            Self::Assign => "=",
            Self::PlusAssign => "+=",
            Self::MinusAssign => "-=",
            Self::StarAssign => "*=",
            Self::SlashAssign => "/=",
            Self::PercentAssign => "%=",
            Self::ShlAssign => "<<=",
            Self::ShrAssign => ">>=",
            Self::AmpAssign => "&=",
            Self::PipeAssign => "|=",
            Self::CaretAssign => "^=",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::PlusPlus => "++",
            Self::MinusMinus => "--",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    Identifier(&'src str),
    /// A built-in type keyword such as `float` or `sampler2D`.
    TypeName(&'src str),
    Keyword(Keyword),

    IntLiteral(i64),
    UintLiteral(u64),
    FloatLiteral(f64),
    BoolLiteral(bool),

    Punct(Punct),

    /// Everything after `#` up to the end of the logical line.
    Directive(&'src str),
    LineComment(&'src str),
    BlockComment {
        text: &'src str,
        terminated: bool,
    },

    Whitespace,
    Newline,
}

impl Token<'_> {
    pub fn is_punct(&self, punct: Punct) -> bool {
        matches!(self, Token::Punct(p) if *p == punct)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Token::Keyword(k) if *k == keyword)
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "identifier `{name}`"),
            Token::TypeName(name) => write!(f, "type `{name}`"),
            Token::Keyword(keyword) => write!(f, "keyword `{}`", keyword.as_str()),
            Token::IntLiteral(value) => write!(f, "integer `{value}`"),
            Token::UintLiteral(value) => write!(f, "integer `{value}u`"),
            Token::FloatLiteral(value) => write!(f, "number `{value}`"),
            Token::BoolLiteral(value) => write!(f, "`{value}`"),
            Token::Punct(punct) => write!(f, "`{}`", punct.as_str()),
            Token::Directive(_) => write!(f, "preprocessor directive"),
            Token::LineComment(_) | Token::BlockComment { .. } => write!(f, "comment"),
            Token::Whitespace => write!(f, "whitespace"),
            Token::Newline => write!(f, "newline"),
        }
    }
}

/// A token with its span in document coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
    /// Byte range within the lexed fragment.
    pub local: Range<usize>,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span, local: Range<usize>) -> Self {
        Self { token, span, local }
    }
}

impl<'src> std::ops::Deref for PositionedToken<'src> {
    type Target = Token<'src>;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl fmt::Display for PositionedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.token.fmt(f)
    }
}
