//! Statement nodes.

use crate::{
    ast::{decl::VariableDecl, expr::Expr, UnparsedRegion},
    span::Span,
};

/// A `{ ... }` sequence of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    /// Where the parser expected a `;` that was not there.
    pub missing_terminator: Option<Span>,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self {
            kind,
            span,
            missing_terminator: None,
        }
    }

    /// Whether control never continues to the next statement in the same block.
    pub fn is_jump(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::Return(_) | StmtKind::Break | StmtKind::Continue | StmtKind::Discard
        )
    }

    pub fn is_unparsed(&self) -> bool {
        matches!(self.kind, StmtKind::Unparsed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Local variable declarations; one entry per declarator.
    Declaration { variables: Vec<VariableDecl> },
    Expression { expr: Expr },
    Block { block: Block },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },
    Switch {
        selector: Expr,
        cases: Vec<SwitchCase>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Discard,
    Empty,
    Unparsed(UnparsedRegion),
}

/// One `case`/`default` label and the statements following it.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub label: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}
