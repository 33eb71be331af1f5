//! The root of the program representation.
//!
//! A [`Program`] is a list of [`Stage`]s, each an independent compilation
//! unit. The core language yields a single stage; the delegating dialects yield
//! one stage per embedded code string or stage section.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    ast::{
        decl::{Declaration, DeclarationKind, FunctionDecl, VariableDecl},
        types::{StorageQualifier, Type},
    },
    span::{Span, Spanned},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub stages: Vec<Stage>,
    /// Symbols provided by the host environment rather than declared in source.
    pub prelude: Vec<PreludeSymbol>,
}

impl Program {
    /// Stages that are compiled on their own, excluding shared preambles.
    pub fn executable_stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages
            .iter()
            .filter(|stage| stage.kind != StageKind::Common)
    }

    /// The shared preamble, if the dialect has one.
    pub fn common_stage(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|stage| stage.kind == StageKind::Common)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// A core-language document whose pipeline stage is not stated.
    Generic,
    Vertex,
    Fragment,
    Geometry,
    Compute,
    /// Code shared by every other stage.
    Common,
}

impl StageKind {
    /// The marker naming this stage in annotated and JSON documents.
    pub fn marker(&self) -> &'static str {
        match self {
            StageKind::Generic => "SHADER",
            StageKind::Vertex => "VERTEX_SHADER",
            StageKind::Fragment => "FRAGMENT_SHADER",
            StageKind::Geometry => "GEOMETRY_SHADER",
            StageKind::Compute => "COMPUTE_SHADER",
            StageKind::Common => "COMMON",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "VERTEX_SHADER" => Some(StageKind::Vertex),
            "FRAGMENT_SHADER" => Some(StageKind::Fragment),
            "GEOMETRY_SHADER" => Some(StageKind::Geometry),
            "COMPUTE_SHADER" => Some(StageKind::Compute),
            _ => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Generic => "shader",
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
            StageKind::Geometry => "geometry",
            StageKind::Compute => "compute",
            StageKind::Common => "common",
        };
        f.write_str(name)
    }
}

/// One compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub kind: StageKind,
    /// Human-readable origin, e.g. `FRAGMENT_SHADER` or `PASSES[1].FRAGMENT_SHADER`.
    pub label: String,
    pub span: Span,
    pub version: Option<VersionDirective>,
    pub extensions: Vec<ExtensionDirective>,
    pub macros: Vec<MacroDefinition>,
    /// Declaration arena in source order.
    pub declarations: Vec<Declaration>,
    /// Function name to indices into `declarations`, one per overload or prototype.
    pub functions: IndexMap<String, Vec<usize>>,
    pub delimiters: Vec<Delimiter>,
    pub comments: Vec<Comment>,
}

impl Stage {
    pub fn new(kind: StageKind, label: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            label: label.into(),
            span,
            version: None,
            extensions: Vec::new(),
            macros: Vec::new(),
            declarations: Vec::new(),
            functions: IndexMap::new(),
            delimiters: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Append a declaration, indexing it when it is a function.
    pub fn push_declaration(&mut self, declaration: Declaration) {
        let index = self.declarations.len();
        if let DeclarationKind::Function(function) = &declaration.kind {
            self.functions
                .entry(function.name.inner().clone())
                .or_default()
                .push(index);
        }
        self.declarations.push(declaration);
    }

    /// Every declaration of the named function, prototypes included.
    pub fn function(&self, name: &str) -> impl Iterator<Item = &FunctionDecl> {
        self.functions
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|&index| self.declarations.get(index))
            .filter_map(Declaration::as_function)
    }

    /// Function definitions (with bodies) in source order.
    pub fn function_definitions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.declarations
            .iter()
            .filter_map(Declaration::as_function)
            .filter(|f| f.is_definition())
    }

    /// Global variable declarations in source order.
    pub fn globals(&self) -> impl Iterator<Item = &VariableDecl> {
        self.declarations.iter().filter_map(Declaration::as_variable)
    }

    /// Uniform variables declared at global scope.
    pub fn uniforms(&self) -> impl Iterator<Item = &VariableDecl> {
        self.globals().filter(|v| v.is_uniform())
    }

    /// Names of every uniform, including members of unnamed uniform blocks
    /// and the instance names of named ones.
    pub fn uniform_names(&self) -> Vec<&Spanned<String>> {
        let mut names = Vec::new();
        for declaration in &self.declarations {
            match &declaration.kind {
                DeclarationKind::Variable(variable) if variable.is_uniform() => {
                    names.push(&variable.name);
                }
                DeclarationKind::InterfaceBlock(block)
                    if block.qualifiers.storage == StorageQualifier::Uniform =>
                {
                    match &block.instance {
                        Some(instance) => names.push(instance),
                        None => names.extend(block.members.iter().map(|m| &m.name)),
                    }
                }
                _ => {}
            }
        }
        names
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| ext.name.inner() == name && ext.behavior != ExtensionBehavior::Disable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Core,
    Compatibility,
    Es,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Core => "core",
            Profile::Compatibility => "compatibility",
            Profile::Es => "es",
        }
    }
}

/// `#version 330 core`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionDirective {
    pub number: u32,
    pub profile: Option<Profile>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionBehavior {
    Require,
    Enable,
    Warn,
    Disable,
}

impl ExtensionBehavior {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "require" => Some(Self::Require),
            "enable" => Some(Self::Enable),
            "warn" => Some(Self::Warn),
            "disable" => Some(Self::Disable),
            _ => None,
        }
    }
}

/// `#extension GL_OES_standard_derivatives : enable`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDirective {
    pub name: Spanned<String>,
    pub behavior: ExtensionBehavior,
    pub span: Span,
}

/// `#define NAME ...` or `#define NAME(a, b) ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: Spanned<String>,
    /// Parameter names of a function-like macro.
    pub params: Option<Vec<String>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelimiterKind {
    Paren,
    Bracket,
    Brace,
}

impl DelimiterKind {
    pub fn open_char(&self) -> char {
        match self {
            DelimiterKind::Paren => '(',
            DelimiterKind::Bracket => '[',
            DelimiterKind::Brace => '{',
        }
    }

    pub fn close_char(&self) -> char {
        match self {
            DelimiterKind::Paren => ')',
            DelimiterKind::Bracket => ']',
            DelimiterKind::Brace => '}',
        }
    }
}

/// One bracket token, recorded in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter {
    pub kind: DelimiterKind,
    pub is_open: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block { terminated: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub kind: CommentKind,
    pub span: Span,
}

/// A name the host defines for the shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreludeSymbol {
    pub name: String,
    pub kind: PreludeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreludeKind {
    Variable { ty: Type, uniform: bool },
    Function { arity: usize, returns: Type },
}

impl PreludeSymbol {
    pub fn uniform(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            kind: PreludeKind::Variable { ty, uniform: true },
        }
    }

    pub fn variable(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            kind: PreludeKind::Variable { ty, uniform: false },
        }
    }

    pub fn function(name: impl Into<String>, arity: usize, returns: Type) -> Self {
        Self {
            name: name.into(),
            kind: PreludeKind::Function { arity, returns },
        }
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self.kind, PreludeKind::Variable { uniform: true, .. })
    }
}
