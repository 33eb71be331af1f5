//! Unit tests for the core-language grammar.
//!
//! These tests run source through the lexer and parser and check the tree
//! shape, the recovery placeholders and the exact spans of syntax errors.

use prism_core::{
    Diagnostic, DiagnosticCode, LineIndex,
    ast::{
        BinaryOp, Callee, Declaration, DeclarationKind, ExprKind, FunctionDecl, Literal,
        ParamQualifier, StmtKind, StorageQualifier, Type, UnaryOp,
    },
};

use crate::{ParseOptions, glsl::parse_stage, source_map::SourceMap};
use prism_core::ast::StageKind;

/// Parse a source string, returning the declarations and diagnostics.
fn parse_source(source: &str) -> (Vec<Declaration>, Vec<Diagnostic>) {
    let index = LineIndex::new(source);
    let map = SourceMap::identity(&index);
    let (stage, diagnostics) = parse_stage(
        source,
        &map,
        StageKind::Generic,
        "SHADER",
        index.full_span(),
        &ParseOptions::default(),
    );
    (stage.declarations, diagnostics)
}

/// Parse a source string and assert that no diagnostic was produced.
fn assert_parses_successfully(source: &str) -> Vec<Declaration> {
    let (declarations, diagnostics) = parse_source(source);
    assert!(
        diagnostics.is_empty(),
        "Expected parsing to succeed, but got: {diagnostics:#?}"
    );
    declarations
}

/// Parse a source string and return its only diagnostic.
fn single_error(source: &str) -> Diagnostic {
    let (_, diagnostics) = parse_source(source);
    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    diagnostics.into_iter().next().unwrap()
}

/// The source text covered by a diagnostic's primary span.
fn error_text<'a>(source: &'a str, diagnostic: &Diagnostic) -> &'a str {
    &source[diagnostic.span().expect("diagnostic has a span").range()]
}

fn function(declaration: &Declaration) -> &FunctionDecl {
    declaration.as_function().expect("expected a function")
}

/// The statements of the only function in `source`.
fn body_of(source: &str) -> Vec<StmtKind> {
    let declarations = assert_parses_successfully(source);
    let body = function(&declarations[0])
        .body
        .clone()
        .expect("function body");
    body.statements.into_iter().map(|s| s.kind).collect()
}

// Declarations

#[test]
fn test_global_declarations() {
    let declarations = assert_parses_successfully(
        "uniform vec2 resolution;\nconst float PI = 3.14159;\nin vec3 normal;\nfloat a, b = 1.0;",
    );

    assert_eq!(declarations.len(), 5);
    let uniform = declarations[0].as_variable().unwrap();
    assert_eq!(uniform.qualifiers.storage, StorageQualifier::Uniform);
    assert_eq!(*uniform.ty.inner(), Type::vec(2));
    assert_eq!(uniform.name.inner(), "resolution");

    let pi = declarations[1].as_variable().unwrap();
    assert!(pi.is_const());
    assert!(matches!(
        pi.initializer.as_ref().unwrap().kind,
        ExprKind::Literal(Literal::Float(_))
    ));

    assert_eq!(
        declarations[2].as_variable().unwrap().qualifiers.storage,
        StorageQualifier::In
    );
    assert_eq!(declarations[3].as_variable().unwrap().name.inner(), "a");
    assert_eq!(declarations[4].as_variable().unwrap().name.inner(), "b");
    assert!(declarations[4].as_variable().unwrap().initializer.is_some());
}

#[test]
fn test_qualifier_combinations() {
    let source = "layout(location = 0) out highp vec4 fragColor;\nflat varying int id;";
    let declarations = assert_parses_successfully(source);

    let out = declarations[0].as_variable().unwrap();
    assert_eq!(out.qualifiers.storage, StorageQualifier::Out);
    assert_eq!(out.qualifiers.layout, ["location"]);
    assert!(out.qualifiers.precision.is_some());
    assert_eq!(out.span.range(), 0..source.find(';').unwrap());

    let id = declarations[1].as_variable().unwrap();
    assert_eq!(id.qualifiers.interpolation.as_deref(), Some("flat"));
    assert_eq!(id.qualifiers.storage, StorageQualifier::Varying);
}

#[test]
fn test_array_declarations() {
    let declarations = assert_parses_successfully("float weights[5];\nvec3 points[N];");

    let weights = declarations[0].as_variable().unwrap();
    assert_eq!(
        *weights.ty.inner(),
        Type::Array(Box::new(Type::FLOAT), Some(5))
    );
    let points = declarations[1].as_variable().unwrap();
    assert_eq!(
        *points.ty.inner(),
        Type::Array(Box::new(Type::vec(3)), None)
    );
    assert!(points.array_size.is_some());
}

#[test]
fn test_precision_declaration() {
    let declarations = assert_parses_successfully("precision mediump float;");

    assert!(matches!(
        declarations[0].kind,
        DeclarationKind::Precision(_)
    ));
}

#[test]
fn test_function_definitions_and_prototypes() {
    let declarations = assert_parses_successfully(
        "float shade(in vec3 n, out float k, inout vec2 uv);\n\
         void main(void) {}\n\
         vec4 tint(vec4 c, float) ;",
    );

    let shade = function(&declarations[0]);
    assert!(!shade.is_definition());
    assert_eq!(shade.params.len(), 3);
    assert_eq!(shade.params[1].qualifier, ParamQualifier::Out);
    assert_eq!(shade.params[2].qualifier, ParamQualifier::InOut);

    let main = function(&declarations[1]);
    assert!(main.is_definition());
    assert!(main.params.is_empty());
    assert_eq!(*main.return_type.inner(), Type::Void);

    let tint = function(&declarations[2]);
    assert!(tint.params[1].name.is_none());
}

#[test]
fn test_struct_and_interface_block() {
    let declarations = assert_parses_successfully(
        "struct Light { vec3 position; float intensity, radius; } sun;\n\
         uniform Globals { mat4 view; float time; };\n\
         Light lamp;",
    );

    let DeclarationKind::Struct(light) = &declarations[0].kind else {
        panic!("expected struct");
    };
    assert_eq!(light.members.len(), 3);
    assert!(light.member("radius").is_some());

    let sun = declarations[1].as_variable().unwrap();
    assert_eq!(*sun.ty.inner(), Type::Struct("Light".to_string()));

    let DeclarationKind::InterfaceBlock(block) = &declarations[2].kind else {
        panic!("expected interface block");
    };
    assert_eq!(block.block_name.inner(), "Globals");
    assert!(block.instance.is_none());
    assert_eq!(block.members.len(), 2);

    let lamp = declarations[3].as_variable().unwrap();
    assert_eq!(*lamp.ty.inner(), Type::Struct("Light".to_string()));
}

// Statements

#[test]
fn test_control_flow_statements() {
    let body = body_of(
        "void main() {
            int total = 0;
            for (int i = 0; i < 4; i++) { total += i; }
            while (total > 0) total--;
            do { total++; } while (total < 3);
            if (total == 3) return; else discard;
        }",
    );

    assert!(matches!(body[0], StmtKind::Declaration { .. }));
    let StmtKind::For {
        init,
        condition,
        step,
        ..
    } = &body[1]
    else {
        panic!("expected for loop");
    };
    assert!(matches!(
        init.as_deref().map(|s| &s.kind),
        Some(StmtKind::Declaration { .. })
    ));
    assert!(condition.is_some());
    assert!(step.is_some());
    assert!(matches!(body[2], StmtKind::While { .. }));
    assert!(matches!(body[3], StmtKind::DoWhile { .. }));
    let StmtKind::If { else_branch, .. } = &body[4] else {
        panic!("expected if");
    };
    assert!(matches!(
        else_branch.as_deref().map(|s| &s.kind),
        Some(StmtKind::Discard)
    ));
}

#[test]
fn test_empty_for_clauses() {
    let body = body_of("void main() { for (;;) { break; } }");

    let StmtKind::For {
        init,
        condition,
        step,
        ..
    } = &body[0]
    else {
        panic!("expected for loop");
    };
    assert!(init.is_none() && condition.is_none() && step.is_none());
}

#[test]
fn test_switch_statement() {
    let body = body_of(
        "void main() {
            int mode = 1;
            switch (mode) {
                case 0:
                case 1: mode = 2; break;
                default: mode = 0;
            }
        }",
    );

    let StmtKind::Switch { cases, .. } = &body[1] else {
        panic!("expected switch");
    };
    assert_eq!(cases.len(), 3);
    assert!(cases[0].body.is_empty());
    assert_eq!(cases[1].body.len(), 2);
    assert!(cases[2].label.is_none());
}

#[test]
fn test_struct_typed_local() {
    let body = body_of("void main() { Light l; l.position = vec3(0.0); }");

    assert!(matches!(body[0], StmtKind::Declaration { .. }));
    assert!(matches!(body[1], StmtKind::Expression { .. }));
}

// Expressions

fn expression_of(source: &str) -> ExprKind {
    let body = body_of(&format!("void main() {{ {source}; }}"));
    match body.into_iter().next() {
        Some(StmtKind::Expression { expr }) => expr.kind,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

#[test]
fn test_binary_precedence() {
    let ExprKind::Binary { op, lhs, rhs } = expression_of("a + b * c") else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Add);
    assert!(matches!(lhs.kind, ExprKind::Identifier(_)));
    assert!(matches!(
        rhs.kind,
        ExprKind::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));

    let ExprKind::Binary { op, lhs, .. } = expression_of("a - b - c") else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Sub);
    assert!(matches!(
        lhs.kind,
        ExprKind::Binary {
            op: BinaryOp::Sub,
            ..
        }
    ));

    let ExprKind::Binary { op, .. } = expression_of("a || b && c") else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Or);
}

#[test]
fn test_assignment_is_right_associative() {
    let ExprKind::Assign { value, .. } = expression_of("a = b += 2") else {
        panic!("expected assignment");
    };
    assert!(matches!(value.kind, ExprKind::Assign { .. }));
}

#[test]
fn test_ternary_and_unary() {
    let ExprKind::Ternary { condition, .. } = expression_of("x > 0.0 ? -x : !flag ? 1.0 : 2.0")
    else {
        panic!("expected ternary");
    };
    assert!(matches!(
        condition.kind,
        ExprKind::Binary {
            op: BinaryOp::Gt,
            ..
        }
    ));

    let ExprKind::Unary { op, .. } = expression_of("i++") else {
        panic!("expected unary");
    };
    assert_eq!(op, UnaryOp::PostInc);
}

#[test]
fn test_calls_constructors_and_members() {
    let ExprKind::Call { callee, args } = expression_of("texture(tex, uv.xy * 2.0)") else {
        panic!("expected call");
    };
    assert_eq!(*callee.inner(), Callee::Function("texture".to_string()));
    assert_eq!(args.len(), 2);

    let ExprKind::Call { callee, args } = expression_of("vec4(color.rgb, 1.0)") else {
        panic!("expected constructor");
    };
    assert_eq!(*callee.inner(), Callee::Constructor(Type::vec(4)));
    assert!(matches!(args[0].kind, ExprKind::Member { .. }));

    let ExprKind::Index { base, .. } = expression_of("m[1][2]") else {
        panic!("expected index");
    };
    assert!(matches!(base.kind, ExprKind::Index { .. }));

    let ExprKind::Call { callee, args } = expression_of("values.length()") else {
        panic!("expected method call");
    };
    assert_eq!(*callee.inner(), Callee::Function("length".to_string()));
    assert_eq!(args.len(), 1);
}

#[test]
fn test_parenthesized_span_includes_parens() {
    let source = "void main() { x = (a + b); }";
    let declarations = assert_parses_successfully(source);
    let body = function(&declarations[0]).body.as_ref().unwrap();
    let StmtKind::Expression { expr } = &body.statements[0].kind else {
        panic!("expected expression");
    };
    let ExprKind::Assign { value, .. } = &expr.kind else {
        panic!("expected assignment");
    };

    assert_eq!(&source[value.span.range()], "(a + b)");
}

// Errors and recovery

#[test]
fn test_error_reports_offending_token() {
    let source = "void main() { float x = 1.0 2.0; }";
    let diagnostic = single_error(source);

    assert_eq!(diagnostic.code(), DiagnosticCode::SyntaxError);
    assert_eq!(error_text(source, &diagnostic), "2.0");
    assert!(
        diagnostic.message().contains("expected `;`"),
        "{}",
        diagnostic.message()
    );
}

#[test]
fn test_statement_recovery_leaves_placeholder() {
    let source = "void main() {\n  x = = 2;\n  y = 3;\n}";
    let (declarations, diagnostics) = parse_source(source);

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(error_text(source, &diagnostics[0]), "=");
    assert_eq!(diagnostics[0].span().unwrap().start().line, 2);

    let body = function(&declarations[0]).body.as_ref().unwrap();
    assert_eq!(body.statements.len(), 2);
    assert!(body.statements[0].is_unparsed());
    assert!(matches!(
        body.statements[1].kind,
        StmtKind::Expression { .. }
    ));
}

#[test]
fn test_top_level_recovery_keeps_later_declarations() {
    let source = "float = 1.0;\nvoid helper() { return; }\n}\nvoid main() {}";
    let (declarations, diagnostics) = parse_source(source);

    assert_eq!(diagnostics.len(), 2, "{diagnostics:#?}");
    assert!(matches!(declarations[0].kind, DeclarationKind::Unparsed(_)));
    assert_eq!(function(&declarations[1]).name.inner(), "helper");
    assert!(matches!(declarations[2].kind, DeclarationKind::Unparsed(_)));
    assert_eq!(function(&declarations[3]).name.inner(), "main");
}

#[test]
fn test_missing_terminator_on_next_line() {
    let source = "void main() {\n  float x = 1.0\n  x = 2.0;\n}";
    let (declarations, diagnostics) = parse_source(source);

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code(), DiagnosticCode::MissingTerminator);
    assert_eq!(error_text(source, &diagnostics[0]), "1.0");

    let body = function(&declarations[0]).body.as_ref().unwrap();
    assert_eq!(body.statements.len(), 2);
    assert!(body.statements[0].missing_terminator.is_some());
}

#[test]
fn test_missing_terminator_before_closing_brace() {
    let source = "void main() { return }";
    let diagnostic = single_error(source);

    assert_eq!(diagnostic.code(), DiagnosticCode::MissingTerminator);
    assert_eq!(error_text(source, &diagnostic), "return");
}

#[test]
fn test_unexpected_eof() {
    let source = "void main() { float x = ";
    let (_, diagnostics) = parse_source(source);

    let codes: Vec<_> = diagnostics.iter().map(|d| d.code()).collect();
    assert!(codes.contains(&DiagnosticCode::UnexpectedEof), "{codes:?}");
    assert!(
        codes.contains(&DiagnosticCode::UnbalancedDelimiter),
        "{codes:?}"
    );
}

#[test]
fn test_unclosed_function_body() {
    let source = "void main() {\n  float x = 1.0;\n";
    let diagnostic = single_error(source);

    assert_eq!(diagnostic.code(), DiagnosticCode::UnbalancedDelimiter);
    assert_eq!(error_text(source, &diagnostic), "{");
}

#[test]
fn test_nesting_limit() {
    let source = format!(
        "void main() {{ x = {}1{}; }}",
        "(".repeat(500),
        ")".repeat(500)
    );
    let (declarations, diagnostics) = parse_source(&source);

    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    assert!(diagnostics[0].message().contains("nested"));
    let body = function(&declarations[0]).body.as_ref().unwrap();
    assert!(body.statements[0].is_unparsed());
}

#[test]
fn test_malformed_integer_is_reported_once() {
    for source in [
        "void main() { int y = 99999999999999999999; }",
        "void main() { int z = 0x; }",
    ] {
        let diagnostic = single_error(source);
        assert_eq!(diagnostic.code(), DiagnosticCode::InvalidNumber, "{source}");
    }
}

#[test]
fn test_operator_chain_height_limit() {
    let source = format!("void main() {{ x = {}; }}", vec!["a"; 2000].join(" + "));
    let diagnostic = single_error(&source);

    assert!(diagnostic.message().contains("shorter expression"));
    assert_eq!(error_text(&source, &diagnostic), "+");
}

#[test]
fn test_member_chain_height_limit() {
    let source = format!("void main() {{ x = v{}; }}", ".x".repeat(2000));
    let diagnostic = single_error(&source);

    assert_eq!(error_text(&source, &diagnostic), ".");
}

#[test]
fn test_right_nested_chains_hit_nesting_limit() {
    for source in [
        format!("void main() {{ {}1; }}", "x = ".repeat(500)),
        format!("void main() {{ x = {}1.0; }}", "c ? 0.0 : ".repeat(500)),
    ] {
        let diagnostic = single_error(&source);
        assert!(diagnostic.message().contains("nested"), "{diagnostic:?}");
    }
}

#[test]
fn test_never_panics_on_garbage() {
    for source in [
        "",
        ";;;",
        "}}}",
        "{{{",
        "void",
        "void main(",
        "struct { }",
        "uniform uniform;",
        "layout(",
        "float x[",
        "switch",
        "void main() { switch (x) { mode = 1; } }",
        "void main() { if }",
        "void main() { do x++; }",
        "precision float;",
    ] {
        let _ = parse_source(source);
    }
}
