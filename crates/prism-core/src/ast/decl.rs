//! Declaration nodes.

use crate::{
    ast::{
        expr::Expr,
        stmt::Block,
        types::{ParamQualifier, Precision, Qualifiers, Type},
        UnparsedRegion,
    },
    span::{Span, Spanned},
};

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub span: Span,
    /// Where the parser expected a `;` that was not there.
    pub missing_terminator: Option<Span>,
}

impl Declaration {
    pub fn new(kind: DeclarationKind, span: Span) -> Self {
        Self {
            kind,
            span,
            missing_terminator: None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match &self.kind {
            DeclarationKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableDecl> {
        match &self.kind {
            DeclarationKind::Variable(variable) => Some(variable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationKind {
    Variable(VariableDecl),
    Function(FunctionDecl),
    Struct(StructDecl),
    /// `uniform Name { ... } instance;`
    InterfaceBlock(InterfaceBlock),
    /// `precision mediump float;`
    Precision(PrecisionDecl),
    Unparsed(UnparsedRegion),
}

/// One declarator of a variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub qualifiers: Qualifiers,
    /// The declared type, arrays included.
    pub ty: Spanned<Type>,
    pub name: Spanned<String>,
    /// The array length expression as written, when present.
    pub array_size: Option<Expr>,
    pub initializer: Option<Expr>,
    pub span: Span,
}

impl VariableDecl {
    pub fn is_uniform(&self) -> bool {
        self.qualifiers.storage == crate::ast::types::StorageQualifier::Uniform
    }

    pub fn is_const(&self) -> bool {
        self.qualifiers.storage == crate::ast::types::StorageQualifier::Const
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub return_type: Spanned<Type>,
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    /// `None` for a prototype.
    pub body: Option<Block>,
    pub span: Span,
}

impl FunctionDecl {
    pub fn is_definition(&self) -> bool {
        self.body.is_some()
    }

    /// Parameter types, used to tell overloads apart.
    pub fn signature(&self) -> Vec<Type> {
        self.params.iter().map(|p| p.ty.inner().clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub qualifier: ParamQualifier,
    pub is_const: bool,
    pub ty: Spanned<Type>,
    /// Prototypes may omit parameter names.
    pub name: Option<Spanned<String>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: Spanned<String>,
    pub members: Vec<StructMember>,
    pub span: Span,
}

impl StructDecl {
    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name.inner() == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub ty: Spanned<Type>,
    pub name: Spanned<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceBlock {
    pub qualifiers: Qualifiers,
    pub block_name: Spanned<String>,
    pub members: Vec<StructMember>,
    /// Without an instance name the members are visible as globals.
    pub instance: Option<Spanned<String>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrecisionDecl {
    pub precision: Precision,
    pub ty: Spanned<Type>,
    pub span: Span,
}
