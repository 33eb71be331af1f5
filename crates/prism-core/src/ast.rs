//! The dialect-neutral program representation.
//!
//! Every dialect parser produces a [`Program`]; every analyzer reads one.
//! The tree is built once and never mutated afterwards: analyzers report
//! findings as diagnostics and keep any derived facts (resolved types,
//! control-flow graphs) in their own tables.
//!
//! Every node carries a [`Span`] in the coordinates of the submitted document,
//! and a child's span lies within its parent's.

mod decl;
mod expr;
mod program;
mod stmt;
mod types;
pub mod visit;

pub use decl::{
    Declaration, DeclarationKind, FunctionDecl, InterfaceBlock, Param, PrecisionDecl, StructDecl,
    StructMember, VariableDecl,
};
pub use expr::{AssignOp, BinaryOp, Callee, Expr, ExprKind, Literal, UnaryOp};
pub use program::{
    Comment, CommentKind, Delimiter, DelimiterKind, ExtensionBehavior, ExtensionDirective,
    MacroDefinition, PreludeKind, PreludeSymbol, Profile, Program, Stage, StageKind,
    VersionDirective,
};
pub use stmt::{Block, Stmt, StmtKind, SwitchCase};
pub use types::{ParamQualifier, Precision, Qualifiers, ScalarKind, StorageQualifier, Type};
pub use visit::Visitor;

use crate::span::Span;

/// Source the parser skipped while recovering from a syntax error.
///
/// The region keeps later line/column reporting aligned; analyzers pass over
/// it without reporting anything, since the parser already did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnparsedRegion {
    pub span: Span,
}
