//! Name resolution and type checking.
//!
//! Each stage is checked with a stack of scopes: the global scope first, one
//! scope per function (parameters and top-level body statements share it)
//! and one per nested block. Built-ins and host-provided symbols sit below
//! the global scope, so a user declaration may shadow them. Globals of a
//! shared `Common` stage are visible in every other stage.
//!
//! Types resolved here stay in this pass. An expression whose type cannot be
//! told (an undefined name, a macro) yields `None`, and checks that depend on
//! it are skipped instead of cascading.

use std::collections::{HashMap, HashSet};

use log::trace;

use prism_core::{
    Diagnostic, DiagnosticCode, DiagnosticCollector, Span, Spanned,
    ast::{
        BinaryOp, Callee, DeclarationKind, Expr, ExprKind, FunctionDecl, InterfaceBlock,
        PreludeKind, Program, ScalarKind, Stage, StageKind, Stmt, StmtKind, StorageQualifier,
        StructDecl, StructMember, Type, UnaryOp, VariableDecl,
    },
};

use super::{AnalysisContext, Analyzer, Pass, builtins, contains_unparsed};

pub struct SemanticChecker;

impl Analyzer for SemanticChecker {
    fn pass(&self) -> Pass {
        Pass::Semantic
    }

    fn analyze(&self, context: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let program = context.program;
        let common = program.common_stage();
        let mut diagnostics = DiagnosticCollector::new();
        for stage in &program.stages {
            let shared = common.filter(|_| stage.kind != StageKind::Common);
            let mut checker = StageChecker::new(program, stage, shared, &mut diagnostics);
            checker.check();
        }
        diagnostics.finish()
    }
}

#[derive(Debug, Clone)]
struct Symbol {
    ty: Option<Type>,
    /// Declaration site; `None` for symbols that come from outside the source.
    span: Option<Span>,
    /// Why the symbol may not be assigned, if it may not.
    read_only: Option<&'static str>,
}

#[derive(Debug, Clone)]
struct StructInfo {
    members: Vec<(String, Type)>,
    span: Span,
}

struct CurrentFunction<'a> {
    name: &'a str,
    return_type: Type,
}

struct StageChecker<'a, 'd> {
    program: &'a Program,
    stage: &'a Stage,
    common: Option<&'a Stage>,
    scopes: Vec<HashMap<String, Symbol>>,
    structs: HashMap<String, StructInfo>,
    macros: HashSet<&'a str>,
    function: Option<CurrentFunction<'a>>,
    /// Set after error recovery, when a missing name may have been declared
    /// inside the region the parser skipped.
    recovering: bool,
    stage_recovering: bool,
    diagnostics: &'d mut DiagnosticCollector,
}

fn read_only_reason(storage: StorageQualifier) -> Option<&'static str> {
    match storage {
        StorageQualifier::Const => Some("a constant"),
        StorageQualifier::Uniform => Some("a uniform"),
        StorageQualifier::Attribute => Some("a vertex attribute"),
        StorageQualifier::In => Some("a shader input"),
        _ => None,
    }
}

/// The array's innermost element type.
fn base_type(ty: &Type) -> &Type {
    match ty {
        Type::Array(inner, _) => base_type(inner),
        other => other,
    }
}


fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn given(count: usize) -> String {
    if count == 1 {
        "1 was given".to_string()
    } else {
        format!("{count} were given")
    }
}

/// `1 argument`, `1 or 2 arguments`, `2, 3 or 4 arguments`.
fn describe_arities(arities: &[usize]) -> String {
    match arities {
        [] => "no arguments".to_string(),
        [single] => plural(*single, "argument"),
        [init @ .., last] => {
            let init: Vec<String> = init.iter().map(usize::to_string).collect();
            format!("{} or {last} arguments", init.join(", "))
        }
    }
}

/// Whether a value of type `from` may be stored in `to`. Integer and float
/// components convert implicitly in both directions.
fn assignable(from: &Type, to: &Type) -> bool {
    if from == to {
        return true;
    }
    match (from, to) {
        (Type::Scalar(a), Type::Scalar(b)) => a.is_numeric() && b.is_numeric(),
        (Type::Vector(a, m), Type::Vector(b, n)) => m == n && a.is_numeric() && b.is_numeric(),
        (Type::Array(a, m), Type::Array(b, n)) => {
            assignable(a, b) && (m.is_none() || n.is_none() || m == n)
        }
        _ => false,
    }
}

fn promote(a: ScalarKind, b: ScalarKind) -> ScalarKind {
    use ScalarKind::*;
    match (a, b) {
        (Double, _) | (_, Double) => Double,
        (Float, _) | (_, Float) => Float,
        (Uint, _) | (_, Uint) => Uint,
        _ => Int,
    }
}

fn is_bool_kind(ty: &Type) -> bool {
    ty.scalar_kind() == Some(ScalarKind::Bool)
}

/// Result type of `l op r` for the arithmetic operators.
fn arithmetic(op: BinaryOp, l: &Type, r: &Type) -> Result<Type, String> {
    let symbol = op.symbol();
    if is_bool_kind(l) || is_bool_kind(r) {
        return Err(format!("boolean used in arithmetic: `{l}` {symbol} `{r}`"));
    }
    let (Some(lk), Some(rk)) = (l.scalar_kind(), r.scalar_kind()) else {
        return Err(format!("`{symbol}` cannot be applied to `{l}` and `{r}`"));
    };
    let kind = promote(lk, rk);
    let mismatch = || Err(format!("size mismatch: `{l}` {symbol} `{r}`"));

    match (l, r) {
        (Type::Scalar(_), Type::Scalar(_)) => Ok(Type::Scalar(kind)),
        (Type::Scalar(_), Type::Vector(_, n)) | (Type::Vector(_, n), Type::Scalar(_)) => {
            Ok(Type::Vector(kind, *n))
        }
        (Type::Vector(_, a), Type::Vector(_, b)) if a == b => Ok(Type::Vector(kind, *a)),
        (Type::Vector(..), Type::Vector(..)) => mismatch(),
        (Type::Scalar(_), matrix @ Type::Matrix { .. }) | (matrix @ Type::Matrix { .. }, Type::Scalar(_)) => {
            Ok(matrix.clone())
        }
        (
            Type::Matrix { columns, rows },
            Type::Matrix {
                columns: rhs_columns,
                rows: rhs_rows,
            },
        ) => {
            if op == BinaryOp::Mul {
                if columns == rhs_rows {
                    Ok(Type::Matrix {
                        columns: *rhs_columns,
                        rows: *rows,
                    })
                } else {
                    mismatch()
                }
            } else if l == r {
                Ok(l.clone())
            } else {
                mismatch()
            }
        }
        (Type::Matrix { columns, rows }, Type::Vector(_, n)) if op == BinaryOp::Mul && n == columns => {
            Ok(Type::vec(*rows))
        }
        (Type::Vector(_, n), Type::Matrix { columns, rows }) if op == BinaryOp::Mul && n == rows => {
            Ok(Type::vec(*columns))
        }
        _ => mismatch(),
    }
}

/// Result type of a bitwise, shift or `%` operation.
fn integer_op(op: BinaryOp, l: &Type, r: &Type) -> Result<Type, String> {
    let integer = |ty: &Type| ty.scalar_kind().is_some_and(|kind| kind.is_integer());
    if !integer(l) || !integer(r) || l.is_matrix() || r.is_matrix() {
        return Err(format!(
            "`{}` needs integer operands, found `{l}` and `{r}`",
            op.symbol()
        ));
    }
    if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
        return Ok(l.clone());
    }
    arithmetic(op, l, r)
}

fn binary_result(op: BinaryOp, l: &Type, r: &Type) -> Result<Type, String> {
    let symbol = op.symbol();
    match op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
            if l.is_bool() && r.is_bool() {
                Ok(Type::BOOL)
            } else {
                Err(format!("operands of `{symbol}` must be `bool`, found `{l}` and `{r}`"))
            }
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            if assignable(l, r) || assignable(r, l) {
                Ok(Type::BOOL)
            } else {
                Err(format!("cannot compare `{l}` with `{r}`"))
            }
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            if l.is_scalar() && r.is_scalar() && l.is_numeric() && r.is_numeric() {
                Ok(Type::BOOL)
            } else {
                Err(format!(
                    "`{symbol}` needs scalar numeric operands, found `{l}` and `{r}`"
                ))
            }
        }
        BinaryOp::Rem
        | BinaryOp::Shl
        | BinaryOp::Shr
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor => integer_op(op, l, r),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => arithmetic(op, l, r),
    }
}

/// Result type of a swizzle such as `.xyz` on a value with `size` components.
fn swizzle(kind: ScalarKind, size: u8, selection: &str) -> Result<Type, String> {
    const SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];
    let Some(set) = selection
        .chars()
        .next()
        .and_then(|first| SETS.iter().find(|set| set.contains(first)))
    else {
        return Err(format!("no member `{selection}`"));
    };
    if selection.chars().count() > 4 {
        return Err(format!("swizzle `.{selection}` selects more than four components"));
    }
    for component in selection.chars() {
        let Some(index) = set.find(component) else {
            return Err(if SETS.iter().any(|other| other.contains(component)) {
                format!("swizzle `.{selection}` mixes component sets")
            } else {
                format!("no member `{selection}`")
            });
        };
        if index >= usize::from(size) {
            return Err(format!(
                "swizzle `.{selection}` selects `{component}`, but the value has {}",
                plural(usize::from(size), "component")
            ));
        }
    }
    match selection.len() {
        1 => Ok(Type::Scalar(kind)),
        len => Ok(Type::Vector(kind, len as u8)),
    }
}

impl<'a, 'd> StageChecker<'a, 'd> {
    fn new(
        program: &'a Program,
        stage: &'a Stage,
        common: Option<&'a Stage>,
        diagnostics: &'d mut DiagnosticCollector,
    ) -> Self {
        let unparsed = |stage: &Stage| {
            stage
                .declarations
                .iter()
                .any(|d| matches!(d.kind, DeclarationKind::Unparsed(_)))
        };
        let stage_recovering = unparsed(stage) || common.is_some_and(unparsed);
        Self {
            program,
            stage,
            common,
            scopes: vec![HashMap::new()],
            structs: HashMap::new(),
            macros: HashSet::new(),
            function: None,
            recovering: stage_recovering,
            stage_recovering,
            diagnostics,
        }
    }

    fn check(&mut self) {
        if let Some(common) = self.common {
            self.import(common);
        }
        let stage = self.stage;
        self.macros
            .extend(stage.macros.iter().map(|m| m.name.inner().as_str()));

        for declaration in &stage.declarations {
            match &declaration.kind {
                DeclarationKind::Variable(variable) => self.declare_variable(variable),
                DeclarationKind::Function(function) => self.check_function(function),
                DeclarationKind::Struct(decl) => self.declare_struct(decl),
                DeclarationKind::InterfaceBlock(block) => self.declare_block(block),
                DeclarationKind::Precision(_) | DeclarationKind::Unparsed(_) => {}
            }
        }

        if self.stage.kind != StageKind::Common && !self.stage_recovering && !self.defines_main() {
            self.diagnostics.emit(
                Diagnostic::error(
                    DiagnosticCode::MissingEntryPoint,
                    format!("stage `{}` has no `main` function", self.stage.label),
                )
                .with_suggestion("add `void main() { ... }`"),
            );
        }
        trace!(label = self.stage.label.as_str(); "Checked stage semantics");
    }

    fn defines_main(&self) -> bool {
        let defines = |stage: &Stage| stage.function("main").any(FunctionDecl::is_definition);
        defines(self.stage) || self.common.is_some_and(defines)
    }

    /// Bring the shared stage's globals into scope without re-checking them.
    fn import(&mut self, common: &'a Stage) {
        self.macros
            .extend(common.macros.iter().map(|m| m.name.inner().as_str()));
        for declaration in &common.declarations {
            match &declaration.kind {
                DeclarationKind::Variable(variable) => {
                    let symbol = self.variable_symbol(variable);
                    self.scopes[0].insert(variable.name.inner().clone(), symbol);
                }
                DeclarationKind::Struct(decl) => {
                    self.structs.insert(decl.name.inner().clone(), struct_info(decl));
                }
                DeclarationKind::InterfaceBlock(block) => {
                    self.structs.insert(
                        block.block_name.inner().clone(),
                        StructInfo {
                            members: members(&block.members),
                            span: block.block_name.span(),
                        },
                    );
                    for (name, symbol) in block_symbols(block) {
                        self.scopes[0].insert(name, symbol);
                    }
                }
                _ => {}
            }
        }
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.emit(diagnostic);
    }

    fn type_mismatch(&mut self, message: impl Into<String>, span: Span) {
        self.emit(Diagnostic::error(DiagnosticCode::TypeMismatch, message).with_span(span));
    }

    fn undefined(&mut self, message: String, name: &str, span: Span) {
        if self.recovering {
            return;
        }
        self.emit(
            Diagnostic::error(DiagnosticCode::UndefinedReference, message)
                .with_span(span)
                .with_suggestion(format!("declare `{name}` before using it")),
        );
    }

    // =========================================================================
    // Scopes
    // =========================================================================

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn prelude(&self, name: &str) -> Option<&'a PreludeKind> {
        self.program
            .prelude
            .iter()
            .find(|symbol| symbol.name == name)
            .map(|symbol| &symbol.kind)
    }

    fn user_functions(&self, name: &str) -> Vec<&'a FunctionDecl> {
        let mut functions: Vec<_> = self.stage.function(name).collect();
        if let Some(common) = self.common {
            functions.extend(common.function(name));
        }
        functions
    }

    /// Check a declared name and add it to the innermost scope.
    fn declare(&mut self, name: &Spanned<String>, ty: Option<Type>, read_only: Option<&'static str>) {
        let span = name.span();
        if name.starts_with("gl_") {
            self.emit(
                Diagnostic::error(
                    DiagnosticCode::ReservedIdentifier,
                    format!("`{name}` uses the reserved `gl_` prefix"),
                )
                .with_span(span)
                .with_suggestion("rename it without the `gl_` prefix"),
            );
        }

        let previous = self
            .scopes
            .last()
            .and_then(|scope| scope.get(name.inner()))
            .map(|symbol| symbol.span);
        match previous {
            Some(previous) => {
                let mut diagnostic = Diagnostic::error(
                    DiagnosticCode::Redefinition,
                    format!("`{name}` is already declared in this scope"),
                )
                .with_span(span)
                .with_suggestion("rename one of the declarations");
                if let Some(previous) = previous {
                    diagnostic = diagnostic.with_label(previous, "first declared here");
                }
                self.emit(diagnostic);
            }
            None => {
                let shadowed = if builtins::function(name).is_some() {
                    Some("a built-in function")
                } else if self.prelude(name).is_some() {
                    Some("a name the host provides")
                } else {
                    None
                };
                if let Some(shadowed) = shadowed {
                    self.emit(
                        Diagnostic::warning(
                            DiagnosticCode::BuiltinShadowing,
                            format!("`{name}` shadows {shadowed}"),
                        )
                        .with_span(span)
                        .with_suggestion("choose a different name"),
                    );
                }
            }
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.inner().clone(),
                Symbol {
                    ty,
                    span: Some(span),
                    read_only,
                },
            );
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Report a named type that no struct declares. Returns the type when it is usable.
    fn check_type(&mut self, ty: &Spanned<Type>) -> Option<Type> {
        if let Type::Struct(name) = base_type(ty.inner())
            && !self.structs.contains_key(name)
        {
            if !self.recovering {
                self.emit(
                    Diagnostic::error(
                        DiagnosticCode::UndefinedReference,
                        format!("unknown type `{name}`"),
                    )
                    .with_span(ty.span())
                    .with_suggestion(format!("declare `struct {name}` before using it")),
                );
            }
            return None;
        }
        Some(ty.inner().clone())
    }

    fn variable_symbol(&self, variable: &VariableDecl) -> Symbol {
        Symbol {
            ty: Some(variable.ty.inner().clone()),
            span: Some(variable.name.span()),
            read_only: read_only_reason(variable.qualifiers.storage),
        }
    }

    fn declare_variable(&mut self, variable: &'a VariableDecl) {
        let ty = self.check_type(&variable.ty);
        if let Some(size) = &variable.array_size {
            self.infer(size);
        }
        if let Some(init) = &variable.initializer {
            let value = self.infer(init);
            if let (Some(value), Some(declared)) = (&value, &ty)
                && !assignable(value, declared)
            {
                self.type_mismatch(
                    format!(
                        "cannot initialize `{}` of type `{declared}` with a value of type `{value}`",
                        variable.name
                    ),
                    init.span,
                );
            }
        }
        self.declare(&variable.name, ty, read_only_reason(variable.qualifiers.storage));
    }

    fn declare_struct(&mut self, decl: &'a StructDecl) {
        let name = &decl.name;
        if name.starts_with("gl_") {
            self.emit(
                Diagnostic::error(
                    DiagnosticCode::ReservedIdentifier,
                    format!("`{name}` uses the reserved `gl_` prefix"),
                )
                .with_span(name.span()),
            );
        }
        if let Some(previous) = self.structs.get(name.inner()) {
            let previous = previous.span;
            self.emit(
                Diagnostic::error(
                    DiagnosticCode::Redefinition,
                    format!("struct `{name}` is already declared"),
                )
                .with_span(name.span())
                .with_label(previous, "first declared here"),
            );
        }
        self.check_members(&decl.members);
        self.structs.insert(name.inner().clone(), struct_info(decl));
    }

    fn check_members(&mut self, members: &'a [StructMember]) {
        let mut seen: HashMap<&str, Span> = HashMap::new();
        for member in members {
            self.check_type(&member.ty);
            if let Some(previous) = seen.insert(member.name.inner(), member.name.span()) {
                self.emit(
                    Diagnostic::error(
                        DiagnosticCode::Redefinition,
                        format!("member `{}` is declared twice", member.name),
                    )
                    .with_span(member.name.span())
                    .with_label(previous, "first declared here"),
                );
            }
        }
    }

    fn declare_block(&mut self, block: &'a InterfaceBlock) {
        self.check_members(&block.members);
        self.structs.insert(
            block.block_name.inner().clone(),
            StructInfo {
                members: members(&block.members),
                span: block.block_name.span(),
            },
        );
        let read_only = read_only_reason(block.qualifiers.storage);
        match &block.instance {
            Some(instance) => {
                self.declare(instance, Some(Type::Struct(block.block_name.inner().clone())), read_only)
            }
            None => {
                for member in &block.members {
                    self.declare(&member.name, Some(member.ty.inner().clone()), read_only);
                }
            }
        }
    }

    fn check_function(&mut self, function: &'a FunctionDecl) {
        let name = &function.name;
        let arity = function.params.len();
        if name.starts_with("gl_") {
            self.emit(
                Diagnostic::error(
                    DiagnosticCode::ReservedIdentifier,
                    format!("`{name}` uses the reserved `gl_` prefix"),
                )
                .with_span(name.span()),
            );
        }
        if let Some(builtin) = builtins::function(name) {
            let diagnostic = if builtin.accepts(arity) {
                Diagnostic::error(
                    DiagnosticCode::BuiltinRedefinition,
                    format!("`{name}` redefines a built-in function with the same number of parameters"),
                )
            } else {
                Diagnostic::warning(
                    DiagnosticCode::BuiltinShadowing,
                    format!("`{name}` overloads a built-in function"),
                )
            };
            self.emit(
                diagnostic
                    .with_span(name.span())
                    .with_suggestion("choose a name that is not a built-in"),
            );
        }
        if name.inner() == "main" && (!function.return_type.is_void() || arity != 0) {
            self.type_mismatch("`main` must be declared as `void main()`", function.span);
        }
        self.check_earlier_declarations(function);

        self.check_type(&function.return_type);
        for param in &function.params {
            self.check_type(&param.ty);
        }

        let Some(body) = &function.body else {
            return;
        };
        self.recovering = self.stage_recovering || contains_unparsed(body);
        self.function = Some(CurrentFunction {
            name: name.inner(),
            return_type: function.return_type.inner().clone(),
        });
        self.push_scope();
        for param in &function.params {
            if let Some(param_name) = &param.name {
                let read_only = param.is_const.then_some("a constant parameter");
                self.declare(param_name, Some(param.ty.inner().clone()), read_only);
            }
        }
        for stmt in &body.statements {
            self.check_stmt(stmt);
        }
        self.pop_scope();
        self.function = None;
        self.recovering = self.stage_recovering;
    }

    /// Compare a function against earlier declarations of the same name.
    fn check_earlier_declarations(&mut self, function: &'a FunctionDecl) {
        let signature = function.signature();
        let stage = self.stage;
        let earlier = stage
            .function(&function.name)
            .take_while(|other| !std::ptr::eq(*other, function))
            .find(|other| other.signature() == signature);
        let Some(earlier) = earlier else {
            return;
        };
        let name = &function.name;
        if earlier.is_definition() && function.is_definition() {
            self.emit(
                Diagnostic::error(
                    DiagnosticCode::Redefinition,
                    format!("function `{name}` is already defined with these parameters"),
                )
                .with_span(name.span())
                .with_label(earlier.name.span(), "first defined here"),
            );
        } else if earlier.return_type.inner() != function.return_type.inner() {
            self.emit(
                Diagnostic::error(
                    DiagnosticCode::Redefinition,
                    format!(
                        "`{name}` was declared returning `{}`, not `{}`",
                        earlier.return_type, function.return_type
                    ),
                )
                .with_span(function.return_type.span())
                .with_label(earlier.return_type.span(), "first declared here"),
            );
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn check_condition(&mut self, condition: &Expr) {
        if let Some(ty) = self.infer(condition)
            && !ty.is_bool()
        {
            self.type_mismatch(format!("condition must be `bool`, found `{ty}`"), condition.span);
        }
    }

    fn check_return(&mut self, value: Option<&Expr>, span: Span) {
        let found = value.map(|value| (self.infer(value), value.span));
        let Some(function) = &self.function else {
            return;
        };
        let name = function.name;
        let expected = function.return_type.clone();
        match found {
            Some((_, value_span)) if expected.is_void() => {
                self.type_mismatch(format!("void function `{name}` cannot return a value"), value_span);
            }
            Some((Some(ty), value_span)) if !assignable(&ty, &expected) => {
                self.type_mismatch(
                    format!("`{name}` returns `{expected}`, but this value is `{ty}`"),
                    value_span,
                );
            }
            None if !expected.is_void() => {
                self.type_mismatch(format!("`{name}` must return a value of type `{expected}`"), span);
            }
            _ => {}
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn infer(&mut self, expr: &Expr) -> Option<Type> {
        match &expr.kind {
            ExprKind::Literal(literal) => Some(literal.ty()),
            ExprKind::Identifier(name) => self.resolve(name, expr.span),
            ExprKind::Unary { op, operand } => self.unary(*op, operand, expr.span),
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.infer(lhs);
                let r = self.infer(rhs);
                match binary_result(*op, &l?, &r?) {
                    Ok(ty) => Some(ty),
                    Err(message) => {
                        self.type_mismatch(message, expr.span);
                        None
                    }
                }
            }
            ExprKind::Assign { op, target, value } => {
                let target_ty = self.infer(target);
                let value_ty = self.infer(value);
                self.check_writable(target);
                let (target_ty, value_ty) = (target_ty?, value_ty?);
                match op.binary_op() {
                    None if !assignable(&value_ty, &target_ty) => self.type_mismatch(
                        format!("cannot assign `{value_ty}` to `{target_ty}`"),
                        value.span,
                    ),
                    None => {}
                    Some(binary) => match binary_result(binary, &target_ty, &value_ty) {
                        Ok(result) if assignable(&result, &target_ty) => {}
                        Ok(result) => self.type_mismatch(
                            format!("`{}=` produces `{result}`, which does not fit `{target_ty}`", binary.symbol()),
                            expr.span,
                        ),
                        Err(message) => self.type_mismatch(message, expr.span),
                    },
                }
                Some(target_ty)
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_condition(condition);
                let then_ty = self.infer(then_branch);
                let else_ty = self.infer(else_branch);
                let (then_ty, else_ty) = (then_ty?, else_ty?);
                if assignable(&else_ty, &then_ty) || assignable(&then_ty, &else_ty) {
                    Some(then_ty)
                } else {
                    self.type_mismatch(
                        format!("branches of `?:` have different types `{then_ty}` and `{else_ty}`"),
                        expr.span,
                    );
                    None
                }
            }
            ExprKind::Call { callee, args } => {
                let arg_types: Vec<Option<Type>> = args.iter().map(|arg| self.infer(arg)).collect();
                match callee.inner() {
                    Callee::Constructor(ty) => {
                        self.check_constructor(ty, &arg_types, callee.span());
                        Some(ty.clone())
                    }
                    Callee::Function(name) => self.call(name, callee.span(), &arg_types),
                }
            }
            ExprKind::Member { base, member } => {
                let base_ty = self.infer(base)?;
                self.member(&base_ty, member)
            }
            ExprKind::Index { base, index } => {
                let base_ty = self.infer(base);
                if let Some(index_ty) = self.infer(index)
                    && !(index_ty.is_scalar() && index_ty.scalar_kind().is_some_and(|k| k.is_integer()))
                {
                    self.type_mismatch(format!("index must be an integer, found `{index_ty}`"), index.span);
                }
                match base_ty? {
                    Type::Array(inner, _) => Some(*inner),
                    Type::Vector(kind, _) => Some(Type::Scalar(kind)),
                    Type::Matrix { rows, .. } => Some(Type::vec(rows)),
                    other => {
                        self.type_mismatch(format!("a value of type `{other}` cannot be indexed"), base.span);
                        None
                    }
                }
            }
            ExprKind::Sequence(exprs) => exprs.iter().map(|expr| self.infer(expr)).last().flatten(),
        }
    }

    fn resolve(&mut self, name: &str, span: Span) -> Option<Type> {
        if let Some(symbol) = self.lookup(name) {
            return symbol.ty.clone();
        }
        if let Some(variable) = builtins::variable(name) {
            return variable.ty;
        }
        match self.prelude(name) {
            Some(PreludeKind::Variable { ty, .. }) => return Some(ty.clone()),
            Some(PreludeKind::Function { .. }) => return None,
            None => {}
        }
        if self.macros.contains(name) || builtins::function(name).is_some() {
            return None;
        }
        if !self.user_functions(name).is_empty() || self.structs.contains_key(name) {
            return None;
        }
        self.undefined(format!("use of undeclared identifier `{name}`"), name, span);
        None
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> Option<Type> {
        let ty = self.infer(operand);
        if op.is_update() {
            self.check_writable(operand);
        }
        let ty = ty?;
        let ok = match op {
            UnaryOp::Not => ty.is_bool(),
            UnaryOp::BitNot => ty.scalar_kind().is_some_and(|kind| kind.is_integer()),
            UnaryOp::Plus | UnaryOp::Neg => ty.is_numeric(),
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                ty.is_numeric()
            }
        };
        if ok {
            Some(ty)
        } else {
            let expected = match op {
                UnaryOp::Not => "a `bool`",
                UnaryOp::BitNot => "an integer",
                _ => "a numeric",
            };
            self.type_mismatch(format!("this operator needs {expected} operand, found `{ty}`"), span);
            None
        }
    }

    fn check_writable(&mut self, target: &Expr) {
        let Some(root) = target.root_identifier() else {
            self.emit(
                Diagnostic::error(
                    DiagnosticCode::ReadOnlyAssignment,
                    "the left side of this assignment is not a variable",
                )
                .with_span(target.span),
            );
            return;
        };
        let reason = if let Some(symbol) = self.lookup(root) {
            symbol.read_only
        } else if let Some(variable) = builtins::variable(root) {
            (!variable.writable).then_some("a built-in input")
        } else if self.prelude(root).is_some() {
            Some("provided by the host")
        } else {
            None
        };
        if let Some(reason) = reason {
            self.emit(
                Diagnostic::error(
                    DiagnosticCode::ReadOnlyAssignment,
                    format!("cannot assign to `{root}`, which is {reason}"),
                )
                .with_span(target.span)
                .with_suggestion(format!("copy `{root}` into a local variable and modify the copy")),
            );
        }
    }

    fn arity_mismatch(&mut self, message: String, span: Span, declared: Option<Span>) {
        let mut diagnostic = Diagnostic::error(DiagnosticCode::ArityMismatch, message).with_span(span);
        if let Some(declared) = declared {
            diagnostic = diagnostic.with_label(declared, "declared here");
        }
        self.emit(diagnostic);
    }

    fn call(&mut self, name: &str, span: Span, args: &[Option<Type>]) -> Option<Type> {
        let count = args.len();

        if let Some(info) = self.structs.get(name) {
            let expected = info.members.len();
            let declared = info.span;
            if expected != count {
                self.arity_mismatch(
                    format!(
                        "`{name}` has {} but {}",
                        plural(expected, "member"),
                        given(count)
                    ),
                    span,
                    Some(declared),
                );
            }
            return Some(Type::Struct(name.to_string()));
        }

        let overloads = self.user_functions(name);
        if !overloads.is_empty() {
            let candidates: Vec<_> = overloads.iter().filter(|f| f.params.len() == count).collect();
            let Some(first) = candidates.first() else {
                let mut arities: Vec<usize> = overloads.iter().map(|f| f.params.len()).collect();
                arities.sort_unstable();
                arities.dedup();
                self.arity_mismatch(
                    format!(
                        "`{name}` takes {} but {}",
                        describe_arities(&arities),
                        given(count)
                    ),
                    span,
                    Some(overloads[0].name.span()),
                );
                return Some(overloads[0].return_type.inner().clone());
            };
            let best = candidates
                .iter()
                .find(|f| {
                    f.params
                        .iter()
                        .zip(args)
                        .all(|(param, arg)| arg.as_ref().is_none_or(|arg| assignable(arg, &param.ty)))
                })
                .unwrap_or(first);
            return Some(best.return_type.inner().clone());
        }

        if let Some(builtin) = builtins::function(name) {
            if !builtin.accepts(count) {
                self.arity_mismatch(
                    format!(
                        "`{name}` takes {} but {}",
                        describe_arities(builtin.arities),
                        given(count)
                    ),
                    span,
                    None,
                );
                return None;
            }
            return builtin.result(args);
        }

        match self.prelude(name) {
            Some(PreludeKind::Function { arity, returns }) => {
                if *arity != count {
                    self.arity_mismatch(
                        format!(
                            "`{name}` takes {} but {}",
                            plural(*arity, "argument"),
                            given(count)
                        ),
                        span,
                        None,
                    );
                }
                return Some(returns.clone());
            }
            Some(PreludeKind::Variable { .. }) => {
                self.type_mismatch(format!("`{name}` is not a function"), span);
                return None;
            }
            None => {}
        }

        if self.macros.contains(name) {
            return None;
        }
        self.undefined(format!("call to undeclared function `{name}`"), name, span);
        None
    }

    fn check_constructor(&mut self, ty: &Type, args: &[Option<Type>], span: Span) {
        let count = args.len();
        match ty {
            Type::Scalar(_) if count != 1 => {
                self.arity_mismatch(
                    format!("`{ty}` constructor takes 1 argument but {}", given(count)),
                    span,
                    None,
                );
            }
            Type::Vector(..) | Type::Matrix { .. } => {
                if count == 0 {
                    self.arity_mismatch(format!("`{ty}` constructor needs at least one argument"), span, None);
                    return;
                }
                if count == 1 {
                    return;
                }
                let mut counts = Vec::with_capacity(count);
                for arg in args {
                    let Some(arg) = arg else { return };
                    match arg.component_count() {
                        Some(components) => counts.push(usize::from(components)),
                        None => {
                            self.type_mismatch(format!("a `{arg}` cannot build a `{ty}`"), span);
                            return;
                        }
                    }
                }
                let needed = ty.component_count().map_or(0, usize::from);
                let supplied: usize = counts.iter().sum();
                let without_last = supplied - counts.last().copied().unwrap_or(0);
                if supplied < needed {
                    self.type_mismatch(
                        format!(
                            "`{ty}` needs {} but the arguments supply {supplied}",
                            plural(needed, "component")
                        ),
                        span,
                    );
                } else if without_last >= needed {
                    self.type_mismatch(format!("too many arguments for a `{ty}` constructor"), span);
                }
            }
            Type::Array(element, length) => {
                if let Some(length) = length
                    && *length != count
                {
                    self.arity_mismatch(
                        format!("`{ty}` constructor takes {} but {}", plural(*length, "element"), given(count)),
                        span,
                        None,
                    );
                }
                for arg in args.iter().flatten() {
                    if !assignable(arg, element) {
                        self.type_mismatch(format!("a `{arg}` cannot be an element of `{ty}`"), span);
                    }
                }
            }
            _ => {}
        }
    }

    fn member(&mut self, base: &Type, member: &Spanned<String>) -> Option<Type> {
        let span = member.span();
        match base {
            Type::Scalar(kind) | Type::Vector(kind, _) => {
                let size = base.component_count().unwrap_or(1);
                match swizzle(*kind, size, member) {
                    Ok(ty) => Some(ty),
                    Err(reason) => {
                        self.emit(
                            Diagnostic::error(
                                DiagnosticCode::InvalidSwizzle,
                                format!("invalid swizzle on `{base}`: {reason}"),
                            )
                            .with_span(span),
                        );
                        None
                    }
                }
            }
            Type::Struct(name) => {
                let info = self.structs.get(name)?;
                if let Some((_, ty)) = info.members.iter().find(|(m, _)| m == member.inner()) {
                    return Some(ty.clone());
                }
                let declared = info.span;
                self.emit(
                    Diagnostic::error(
                        DiagnosticCode::UnknownMember,
                        format!("`{name}` has no member `{member}`"),
                    )
                    .with_span(span)
                    .with_label(declared, "struct declared here"),
                );
                None
            }
            other => {
                self.emit(
                    Diagnostic::error(
                        DiagnosticCode::UnknownMember,
                        format!("`{other}` has no member `{member}`"),
                    )
                    .with_span(span),
                );
                None
            }
        }
    }
}

fn members(members: &[StructMember]) -> Vec<(String, Type)> {
    members
        .iter()
        .map(|m| (m.name.inner().clone(), m.ty.inner().clone()))
        .collect()
}

fn struct_info(decl: &StructDecl) -> StructInfo {
    StructInfo {
        members: members(&decl.members),
        span: decl.name.span(),
    }
}

fn block_symbols(block: &InterfaceBlock) -> Vec<(String, Symbol)> {
    let read_only = read_only_reason(block.qualifiers.storage);
    match &block.instance {
        Some(instance) => vec![(
            instance.inner().clone(),
            Symbol {
                ty: Some(Type::Struct(block.block_name.inner().clone())),
                span: Some(instance.span()),
                read_only,
            },
        )],
        None => block
            .members
            .iter()
            .map(|member| {
                (
                    member.name.inner().clone(),
                    Symbol {
                        ty: Some(member.ty.inner().clone()),
                        span: Some(member.name.span()),
                        read_only,
                    },
                )
            })
            .collect(),
    }
}

impl<'a> StageChecker<'a, '_> {
    fn check_stmt(&mut self, stmt: &'a Stmt) {
        match &stmt.kind {
            StmtKind::Declaration { variables } => {
                for variable in variables {
                    self.declare_variable(variable);
                }
            }
            StmtKind::Block { block } => {
                self.push_scope();
                for inner in &block.statements {
                    self.check_stmt(inner);
                }
                self.pop_scope();
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_condition(condition);
                self.check_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch);
                }
            }
            StmtKind::For {
                init,
                condition,
                step,
                body,
            } => {
                self.push_scope();
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(condition) = condition {
                    self.check_condition(condition);
                }
                if let Some(step) = step {
                    self.infer(step);
                }
                self.check_stmt(body);
                self.pop_scope();
            }
            StmtKind::While { condition, body } => {
                self.check_condition(condition);
                self.check_stmt(body);
            }
            StmtKind::DoWhile { body, condition } => {
                self.check_stmt(body);
                self.check_condition(condition);
            }
            StmtKind::Switch { selector, cases } => {
                if let Some(ty) = self.infer(selector)
                    && !(ty.is_scalar() && ty.scalar_kind().is_some_and(|k| k.is_integer()))
                {
                    self.type_mismatch(
                        format!("switch selector must be an integer, found `{ty}`"),
                        selector.span,
                    );
                }
                self.push_scope();
                for case in cases {
                    if let Some(label) = &case.label {
                        self.infer(label);
                    }
                    for inner in &case.body {
                        self.check_stmt(inner);
                    }
                }
                self.pop_scope();
            }
            StmtKind::Return(value) => self.check_return(value.as_ref(), stmt.span),
            StmtKind::Expression { expr } => {
                self.infer(expr);
            }
            StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Discard
            | StmtKind::Empty
            | StmtKind::Unparsed(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use prism_core::ShaderFormat;

    use super::*;
    use crate::analysis::test_support::{codes, run, run_as, spanned};

    fn check(source: &str) -> Vec<Diagnostic> {
        run(&SemanticChecker, source)
    }

    #[test]
    fn test_well_typed_program_is_clean() {
        let source = "\
struct Light { vec3 color; float power; };
uniform Light light;
uniform sampler2D tex;
float shade(vec3 n, vec3 l) { return max(dot(n, l), 0.0); }
void main() {
    vec2 uv = gl_FragCoord.xy / 512.0;
    vec3 c = texture2D(tex, uv).rgb * light.color;
    mat3 m = mat3(1.0);
    vec3 v = m * c;
    int count = 3;
    float f = float(count) + 1;
    for (int i = 0; i < count; i++) { f += shade(v, vec3(0.0, 1.0, 0.0)); }
    gl_FragColor = vec4(v * f, 1.0);
}
";
        let diagnostics = check(source);
        assert!(diagnostics.is_empty(), "{diagnostics:#?}");
    }

    #[test]
    fn test_undefined_reference_points_at_use() {
        let source = "void main() { float x = foo + 1.0; gl_FragColor = vec4(x); }";
        let diagnostics = check(source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::UndefinedReference]);
        assert_eq!(spanned(source, &diagnostics, DiagnosticCode::UndefinedReference), ["foo"]);
    }

    #[test]
    fn test_variable_must_be_declared_before_use() {
        let source = "void main() { x = 1.0; float x; }";
        assert_eq!(codes(&check(source)), [DiagnosticCode::UndefinedReference]);
    }

    #[test]
    fn test_functions_resolve_in_any_order() {
        let source = "void main() { gl_FragColor = vec4(helper(1.0)); }\nfloat helper(float x) { return x; }";
        assert!(check(source).is_empty());
    }

    #[test]
    fn test_arity_mismatch() {
        let source = "\
float f(float a, float b) { return a + b; }
void main() { float x = f(1.0); float y = clamp(x, 0.0); }";
        let diagnostics = check(source);

        assert_eq!(
            codes(&diagnostics),
            [DiagnosticCode::ArityMismatch, DiagnosticCode::ArityMismatch]
        );
        assert_eq!(diagnostics[0].message(), "`f` takes 2 arguments but 1 was given");
        assert_eq!(diagnostics[0].labels().len(), 1);
        assert_eq!(diagnostics[1].message(), "`clamp` takes 3 arguments but 2 were given");
    }

    #[test]
    fn test_struct_constructor_arity() {
        let source = "struct P { float a; float b; };\nvoid main() { P p = P(1.0); }";
        let diagnostics = check(source);
        assert_eq!(codes(&diagnostics), [DiagnosticCode::ArityMismatch]);
        assert_eq!(diagnostics[0].message(), "`P` has 2 members but 1 was given");
    }

    #[test]
    fn test_type_mismatches() {
        let source = "\
void main() {
    bool b = true;
    float x = b + 1.0;
    vec3 v = vec3(1.0) + vec2(1.0);
    if (x) { }
    float y = 1.0 % 2.0;
    vec4 w = vec4(1.0, 2.0);
}";
        let diagnostics = check(source);
        assert_eq!(codes(&diagnostics), [DiagnosticCode::TypeMismatch; 5]);
        assert_eq!(diagnostics[0].message(), "boolean used in arithmetic: `bool` + `float`");
        assert_eq!(diagnostics[2].message(), "condition must be `bool`, found `float`");
    }

    #[test]
    fn test_int_and_float_convert_both_ways() {
        let source = "void main() { float a = 1; int b = 2.0; a = b; b += 1.5; }";
        assert!(check(source).is_empty());
    }

    #[test]
    fn test_return_checks() {
        let source = "\
float f() { return; }
void g() { return 1.0; }
vec3 h() { return 1.0 > 0.0; }
void main() {}";
        let diagnostics = check(source);
        assert_eq!(codes(&diagnostics), [DiagnosticCode::TypeMismatch; 3]);
        assert_eq!(diagnostics[0].message(), "`f` must return a value of type `float`");
        assert_eq!(diagnostics[1].message(), "void function `g` cannot return a value");
    }

    #[test]
    fn test_redefinition_labels_first_declaration() {
        let source = "void main() { float x = 1.0; float x = 2.0; }";
        let diagnostics = check(source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::Redefinition]);
        let label = &diagnostics[0].labels()[0];
        assert_eq!(label.span().start().offset, source.find("x =").unwrap());
    }

    #[test]
    fn test_inner_scope_may_shadow() {
        let source = "void main() { float x = 1.0; { float x = 2.0; x += 1.0; } }";
        assert!(check(source).is_empty());
    }

    #[test]
    fn test_builtin_names() {
        let source = "\
float mix(float a, float b, float t) { return a; }
float max(float a) { return a; }
void main() { float step = 1.0; float gl_thing = step; }";
        let diagnostics = check(source);

        assert_eq!(
            codes(&diagnostics),
            [
                DiagnosticCode::BuiltinRedefinition,
                DiagnosticCode::BuiltinShadowing,
                DiagnosticCode::BuiltinShadowing,
                DiagnosticCode::ReservedIdentifier,
            ]
        );
        assert!(diagnostics[1].severity().is_warning());
    }

    #[test]
    fn test_swizzles() {
        let source = "\
void main() {
    vec3 v = vec3(1.0);
    vec2 a = v.xy;
    float b = v.b;
    vec4 c = v.xyzw;
    vec2 d = v.xg;
    float e = 1.0;
    vec2 f = e.xx;
}";
        let diagnostics = check(source);
        assert_eq!(codes(&diagnostics), [DiagnosticCode::InvalidSwizzle; 2]);
        assert_eq!(spanned(source, &diagnostics, DiagnosticCode::InvalidSwizzle), ["xyzw", "xg"]);
    }

    #[test]
    fn test_unknown_member() {
        let source = "struct L { vec3 color; };\nvoid main() { L l; vec3 c = l.colr; mat2 m; float x = m.x; }";
        let diagnostics = check(source);
        assert_eq!(codes(&diagnostics), [DiagnosticCode::UnknownMember; 2]);
        assert_eq!(diagnostics[0].message(), "`L` has no member `colr`");
    }

    #[test]
    fn test_read_only_assignment() {
        let source = "\
uniform float speed;
const float K = 1.0;
void main() { speed = 2.0; K++; gl_FragCoord.x = 1.0; float ok = 1.0; ok = speed; }";
        let diagnostics = check(source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::ReadOnlyAssignment; 3]);
        assert_eq!(diagnostics[0].message(), "cannot assign to `speed`, which is a uniform");
    }

    #[test]
    fn test_missing_entry_point_has_no_span() {
        let diagnostics = check("float helper() { return 1.0; }");
        assert_eq!(codes(&diagnostics), [DiagnosticCode::MissingEntryPoint]);
        assert!(diagnostics[0].span().is_none());
    }

    #[test]
    fn test_macros_resolve() {
        let source = "#define SCALE 2.0\n#define TWICE(x) ((x) * SCALE)\nvoid main() { float y = TWICE(1.0) + SCALE; }";
        assert!(check(source).is_empty());
    }

    #[test]
    fn test_isf_host_names_resolve() {
        let source = r#"{"NAME": "T", "DESCRIPTION": "d", "CREDIT": "c", "CATEGORIES": ["Filter"],
"INPUTS": [{"NAME": "inputImage", "TYPE": "image"}, {"NAME": "amount", "TYPE": "float"}],
"PASSES": [{}],
"FRAGMENT_SHADER": "void main() { vec4 c = IMG_NORM_PIXEL(inputImage, isf_FragNormCoord); gl_FragColor = c * amount * TIME; }"}"#;
        let diagnostics = run_as(&SemanticChecker, ShaderFormat::InteractiveJson, source);
        assert!(diagnostics.is_empty(), "{diagnostics:#?}");
    }

    #[test]
    fn test_isf_host_names_are_read_only() {
        let source = r#"{"NAME": "T", "DESCRIPTION": "d", "CREDIT": "c", "CATEGORIES": ["Filter"],
"PASSES": [{}],
"FRAGMENT_SHADER": "void main() { TIME = 1.0; gl_FragColor = vec4(IMG_SIZE()); }"}"#;
        let diagnostics = run_as(&SemanticChecker, ShaderFormat::InteractiveJson, source);
        assert_eq!(
            codes(&diagnostics),
            [DiagnosticCode::ReadOnlyAssignment, DiagnosticCode::ArityMismatch]
        );
    }

    #[test]
    fn test_common_code_is_shared() {
        let source = "\
float helper(float x) { return x * 2.0; }
uniform float level;
// FRAGMENT_SHADER
void main() { gl_FragColor = vec4(helper(level)); }
";
        let diagnostics = run_as(&SemanticChecker, ShaderFormat::AnnotatedMapping, source);
        assert!(diagnostics.is_empty(), "{diagnostics:#?}");
    }

    #[test]
    fn test_recovery_suppresses_undefined_names() {
        let source = "void main() { float x = ; float y = z; }";
        let diagnostics = check(source);
        assert!(
            !codes(&diagnostics).contains(&DiagnosticCode::UndefinedReference),
            "{diagnostics:#?}"
        );
    }

    #[test]
    fn test_describe_arities() {
        assert_eq!(describe_arities(&[1]), "1 argument");
        assert_eq!(describe_arities(&[1, 2]), "1 or 2 arguments");
        assert_eq!(describe_arities(&[2, 3, 4]), "2, 3 or 4 arguments");
    }

    #[test]
    fn test_matrix_products() {
        let m = Type::Matrix { columns: 3, rows: 2 };
        assert_eq!(binary_result(BinaryOp::Mul, &m, &Type::vec(3)), Ok(Type::vec(2)));
        assert_eq!(binary_result(BinaryOp::Mul, &Type::vec(2), &m), Ok(Type::vec(3)));
        assert!(binary_result(BinaryOp::Mul, &m, &Type::vec(2)).is_err());
        assert_eq!(
            binary_result(BinaryOp::Mul, &Type::mat(3), &m),
            Err("size mismatch: `mat3` * `mat3x2`".to_string())
        );
    }
}
