//! Integration tests for the Validator API
//!
//! These tests drive whole documents through the public entry points and
//! check the guarantees every result makes.

use prism::{
    AnalysisDepth, AnalysisResult, Diagnostic, DiagnosticCode, Pass, PrismError, ShaderDocument,
    ValidationOptions, Validator,
    config::{AnalysisConfig, AppConfig, LimitsConfig},
};

fn validator() -> Validator {
    Validator::new(AppConfig::default()).expect("default configuration is valid")
}

fn validate(format: &str, source: &str) -> AnalysisResult {
    validator()
        .validate(&ShaderDocument::new(format, source))
        .expect("validation succeeds")
}

fn json_document(code: &str) -> String {
    let code = serde_json::to_string(code).expect("code serializes");
    format!(
        r#"{{"NAME": "Test", "DESCRIPTION": "d", "CREDIT": "c", "CATEGORIES": ["Generator"],
  "PASSES": [{{}}], "FRAGMENT_SHADER": {code}}}"#
    )
}

fn annotated_document(code: &str) -> String {
    format!("// @name Test\n// FRAGMENT_SHADER\n{code}")
}

fn count(result: &AnalysisResult, code: DiagnosticCode) -> usize {
    result.diagnostics.iter().filter(|d| d.code() == code).count()
}

fn spanned<'a>(document: &'a str, result: &AnalysisResult, code: DiagnosticCode) -> Vec<&'a str> {
    result
        .diagnostics
        .iter()
        .filter(|d| d.code() == code)
        .filter_map(Diagnostic::span)
        .map(|span| &document[span.range()])
        .collect()
}

#[test]
fn test_empty_main_is_valid_in_every_dialect() {
    let code = "void main() {}\n";
    let documents = [
        ("glsl", code.to_string()),
        ("isf", json_document(code)),
        ("madmapper", annotated_document(code)),
    ];

    for (format, document) in &documents {
        let result = validate(format, document);
        assert!(
            result.is_valid,
            "{format} document should be valid: {:?}",
            result.diagnostics
        );
        assert_eq!(result.summary.errors, 0);
        assert_eq!(result.summary.passes, Pass::ALL);
    }
}

#[test]
fn test_versioned_program_is_clean() {
    let source = "#version 330\nout vec4 color;\nvoid main() { color = vec4(1.0); }\n";
    let result = validate("glsl", source);

    assert!(result.is_valid);
    assert!(
        result.diagnostics.iter().all(|d| d.severity().is_info()),
        "unexpected findings: {:?}",
        result.diagnostics
    );
}

#[test]
fn test_validation_is_deterministic() {
    let document = ShaderDocument::new(
        "glsl",
        "#version 120\nuniform sampler2D tex;\nvoid main() { float a = foo; return; a = 1.0; }\n",
    );
    let validator = validator();

    let first = validator.validate(&document).unwrap();
    let second = validator.validate(&document).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_spans_point_at_the_same_code_in_every_dialect() {
    let code = "void main() { float x = ; }";
    let documents = [
        ("glsl", code.to_string()),
        ("isf", json_document(code)),
        ("madmapper", annotated_document(code)),
    ];

    let mut found = Vec::new();
    for (format, document) in &documents {
        let result = validate(format, document);
        assert!(!result.is_valid, "{format} should report the missing operand");

        let errors: Vec<_> = result
            .errors()
            .map(|d| {
                let span = d.span().expect("syntax errors carry a span");
                assert!(span.range().end <= document.len());
                (d.code(), d.message().to_string(), document[span.range()].to_string())
            })
            .collect();
        found.push(errors);
    }

    assert_eq!(found[0], found[1]);
    assert_eq!(found[0], found[2]);
}

#[test]
fn test_statement_after_return_is_unreachable() {
    let source = "int f() { int x; return 1; x = 2; }\nvoid main() {}\n";
    let result = validate("glsl", source);

    assert_eq!(count(&result, DiagnosticCode::UnreachableCode), 1);
    assert_eq!(spanned(source, &result, DiagnosticCode::UnreachableCode), ["x = 2;"]);
}

#[test]
fn test_undefined_name_is_reported_once() {
    let source = "void main() { float a = foo; }";
    let result = validate("glsl", source);

    assert!(!result.is_valid);
    assert_eq!(count(&result, DiagnosticCode::UndefinedReference), 1);
    assert_eq!(spanned(source, &result, DiagnosticCode::UndefinedReference), ["foo"]);
}

#[test]
fn test_newer_builtin_needs_newer_version() {
    let source =
        "#version 120\nuniform sampler2D tex;\nvoid main() { gl_FragColor = texture(tex, vec2(0.5)); }\n";
    let result = validate("glsl", source);

    assert_eq!(count(&result, DiagnosticCode::VersionIncompatible), 1);
    assert_eq!(spanned(source, &result, DiagnosticCode::VersionIncompatible), ["texture"]);

    let message = result
        .diagnostics
        .iter()
        .find(|d| d.code() == DiagnosticCode::VersionIncompatible)
        .map(Diagnostic::message)
        .unwrap();
    assert!(message.contains("130"), "minimum version missing: {message}");
    assert!(message.contains("120"), "declared version missing: {message}");
}

#[test]
fn test_batch_keeps_input_order() {
    let documents = [
        ShaderDocument::new("glsl", "void main() {}"),
        ShaderDocument::new("glsl", "void main() { float x = ; }"),
        ShaderDocument::new("isf", "{ not json"),
    ];
    let results = validator().validate_batch(&documents);

    assert_eq!(results.len(), 3);
    let validity: Vec<_> = results
        .iter()
        .map(|result| result.as_ref().expect("no internal failure").is_valid)
        .collect();
    assert_eq!(validity, [true, false, false]);
}

#[test]
fn test_leading_byte_order_mark_is_ignored() {
    let result = validate("glsl", "\u{feff}void main() {}\n");

    assert!(result.is_valid, "{:?}", result.diagnostics);
    assert_eq!(count(&result, DiagnosticCode::InvalidToken), 0);
}

#[test]
fn test_out_of_range_literal_is_one_diagnostic() {
    let result = validate("glsl", "void main() { int y = 99999999999999999999; }\n");

    assert_eq!(result.summary.errors, 1, "{:?}", result.diagnostics);
    assert_eq!(count(&result, DiagnosticCode::InvalidNumber), 1);
}

#[test]
fn test_long_operator_chain_is_rejected_without_aborting() {
    let terms = vec!["1.0"; 50_000].join(" + ");
    let source = format!("void main() {{ float x = {terms}; }}\n");
    let documents = [
        ShaderDocument::new("glsl", source.as_str()),
        ShaderDocument::new("glsl", "void main() {}"),
    ];
    let results = validator().validate_batch(&documents);

    let long = results[0].as_ref().expect("no internal failure");
    assert!(!long.is_valid);
    assert_eq!(count(long, DiagnosticCode::SyntaxError), 1, "{:?}", long.diagnostics);
    assert!(
        long.errors()
            .any(|d| d.message().contains("shorter expression")),
        "{:?}",
        long.diagnostics
    );
    assert_eq!(spanned(&source, long, DiagnosticCode::SyntaxError), ["+"]);

    assert!(results[1].as_ref().expect("no internal failure").is_valid);
}

#[test]
fn test_long_assignment_chain_is_rejected_without_aborting() {
    let source = format!("void main() {{ float x; {}1.0; }}\n", "x = ".repeat(20_000));
    let result = validate("glsl", &source);

    assert!(!result.is_valid);
    assert_eq!(count(&result, DiagnosticCode::SyntaxError), 1, "{:?}", result.diagnostics);
}

#[test]
fn test_long_member_chain_is_rejected_without_aborting() {
    let source = format!("void main() {{ vec2 v; float x = v{}; }}\n", ".x".repeat(20_000));
    let result = validate("glsl", &source);

    assert!(!result.is_valid);
    assert_eq!(count(&result, DiagnosticCode::SyntaxError), 1, "{:?}", result.diagnostics);
}

#[test]
fn test_chain_within_height_limit_is_accepted() {
    let terms = vec!["1.0"; 500].join(" + ");
    let source = format!("#version 330\nout vec4 color;\nvoid main() {{ color = vec4({terms}); }}\n");
    let result = validate("glsl", &source);

    assert_eq!(count(&result, DiagnosticCode::SyntaxError), 0, "{:?}", result.diagnostics);
}

#[test]
fn test_diagnostics_are_ordered() {
    let source = "void helper() { return; int y = 1; }\nvoid main() { float a = foo; float b = bar; }\n";
    let result = validate("glsl", source);

    assert!(result.diagnostics.len() >= 3);
    let keys: Vec<_> = result
        .diagnostics
        .iter()
        .map(|d| d.span().map(|span| span.start().offset))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted, "diagnostics out of order: {:?}", result.diagnostics);

    // The missing version has no span and sorts ahead of everything.
    assert_eq!(result.diagnostics[0].code(), DiagnosticCode::MissingVersion);
}

#[test]
fn test_zero_timeout_stops_before_first_pass() {
    let config = AppConfig::new(AnalysisConfig::default(), LimitsConfig::new(0, 1, 1024 * 1024));
    let validator = Validator::new(config).unwrap();
    let result = validator
        .validate(&ShaderDocument::new("glsl", "void main() {}"))
        .unwrap();

    assert!(!result.is_valid);
    assert!(result.summary.passes.is_empty());
    assert_eq!(count(&result, DiagnosticCode::ValidationTimeout), 1);
}

#[test]
fn test_strict_mode_promotes_warnings() {
    let options = ValidationOptions {
        strict_mode: true,
        ..ValidationOptions::default()
    };
    let document = ShaderDocument::new("glsl", "void main() {}").with_options(options);
    let result = validator().validate(&document).unwrap();

    assert!(!result.is_valid);
    assert_eq!(result.summary.warnings, 0);
    assert!(result.diagnostics.iter().all(|d| !d.severity().is_warning()));
    assert_eq!(count(&result, DiagnosticCode::MissingVersion), 1);
}

#[test]
fn test_excluded_warnings_do_not_change_validity() {
    let options = ValidationOptions {
        include_warnings: false,
        ..ValidationOptions::default()
    };
    let document = ShaderDocument::new("glsl", "void main() {}").with_options(options);
    let result = validator().validate(&document).unwrap();

    assert!(result.is_valid);
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.summary.warnings, 0);
}

#[test]
fn test_basic_depth_skips_flow() {
    let options = ValidationOptions {
        analysis_depth: AnalysisDepth::Basic,
        ..ValidationOptions::default()
    };
    let document =
        ShaderDocument::new("glsl", "void main() { return; float x = 1.0; }").with_options(options);
    let result = validator().validate(&document).unwrap();

    assert_eq!(result.summary.passes, [Pass::Syntax, Pass::Semantic]);
    assert_eq!(count(&result, DiagnosticCode::UnreachableCode), 0);
    assert_eq!(count(&result, DiagnosticCode::MissingVersion), 0);
}

#[test]
fn test_unsupported_format() {
    let result = validate("hlsl", "void main() {}");

    assert!(!result.is_valid);
    assert_eq!(result.diagnostics.len(), 1);
    let diagnostic = &result.diagnostics[0];
    assert_eq!(diagnostic.code(), DiagnosticCode::UnsupportedFormat);
    assert!(diagnostic.span().is_none());
    assert!(diagnostic.message().contains("hlsl"));
}

#[test]
fn test_empty_source() {
    let result = validate("glsl", "  \n\t\n");

    assert!(!result.is_valid);
    assert_eq!(count(&result, DiagnosticCode::EmptySource), 1);
    assert!(result.summary.passes.is_empty());
}

#[test]
fn test_source_above_limit() {
    let config = AppConfig::new(AnalysisConfig::default(), LimitsConfig::new(30_000, 1, 16));
    let validator = Validator::new(config).unwrap();
    let result = validator
        .validate(&ShaderDocument::new("glsl", "void main() { float a = 1.0; }"))
        .unwrap();

    assert!(!result.is_valid);
    assert_eq!(count(&result, DiagnosticCode::SourceTooLarge), 1);
}

#[test]
fn test_declared_version_overrides_missing_directive() {
    let document = ShaderDocument::new("glsl", "out vec4 color;\nvoid main() { color = vec4(1.0); }")
        .with_declared_version("330");
    let result = validator().validate(&document).unwrap();

    assert!(result.is_valid);
    assert_eq!(count(&result, DiagnosticCode::MissingVersion), 0);
}

#[test]
fn test_requested_version_conflicts_with_directive() {
    let document = ShaderDocument::new("glsl", "#version 120\nvoid main() { gl_FragColor = vec4(1.0); }")
        .with_declared_version("330 compatibility");
    let result = validator().validate(&document).unwrap();

    assert!(result.is_valid);
    assert_eq!(count(&result, DiagnosticCode::VersionConflict), 1);
    assert_eq!(count(&result, DiagnosticCode::VersionIncompatible), 0);
}

#[test]
fn test_metrics_are_reported() {
    let source = "#version 330\nuniform sampler2D tex;\nuniform float gain;\nout vec4 color;\n\
                  void main() {\n  vec4 sum = vec4(0.0);\n  for (int i = 0; i < 4; i++) {\n    \
                  if (gain > 0.5) { sum += texture(tex, vec2(0.5)); }\n  }\n  color = sum;\n}\n";
    let result = validate("glsl", source);

    assert_eq!(result.metrics.cyclomatic_complexity, 3);
    assert_eq!(result.metrics.texture_lookup_count, 1);
    assert_eq!(result.metrics.uniform_count, 2);
    assert_eq!(result.metrics.max_nesting_depth, 2);
    assert!(result.metrics.instruction_estimate > 4);
}

#[test]
fn test_bad_configuration_is_an_error() {
    let config = AppConfig::new(
        AnalysisConfig::new(Pass::ALL.to_vec(), 10, "[unclosed"),
        LimitsConfig::default(),
    );

    let err = Validator::new(config).err().expect("pattern is rejected");
    assert!(matches!(err, PrismError::InvalidNamingPattern { .. }));
}

mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn token_strategy() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "#version 330\n", "#version 100\n", "void", "float", "int", "vec4", "main", "x", "(", ")",
            "{", "}", ";", "=", "+", "/", "0", "1.0", "return", "if", "for", "while", "discard",
            "break", "texture", "gl_FragColor", "uniform", "out", ",", "\n",
        ])
    }

    fn shader_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::collection::vec(token_strategy(), 0..60).prop_map(|tokens| tokens.join(" ")),
            "\\PC{0,200}",
        ]
    }

    fn document_strategy() -> impl Strategy<Value = ShaderDocument> {
        let format = prop::sample::select(vec!["glsl", "isf", "madmapper"]);
        (format, shader_strategy()).prop_map(|(format, code)| match format {
            "isf" => ShaderDocument::new(format, json_document(&code)),
            "madmapper" => ShaderDocument::new(format, annotated_document(&code)),
            _ => ShaderDocument::new(format, code),
        })
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Any input produces a result whose spans stay inside the document.
    fn check_never_fails(document: ShaderDocument) -> Result<(), TestCaseError> {
        let result = match validator().validate(&document) {
            Ok(result) => result,
            Err(err) => return Err(TestCaseError::fail(format!("internal failure: {err}"))),
        };

        let errors = result.errors().count();
        prop_assert_eq!(result.is_valid, errors == 0);
        prop_assert_eq!(result.summary.errors, errors);
        for span in result.diagnostics.iter().flat_map(Diagnostic::spans) {
            prop_assert!(span.range().end <= document.source().len());
        }
        Ok(())
    }

    /// Validating twice yields byte-identical serializations.
    fn check_idempotent(document: ShaderDocument) -> Result<(), TestCaseError> {
        let validator = validator();
        let first = serde_json::to_string(&validator.validate(&document).unwrap()).unwrap();
        let second = serde_json::to_string(&validator.validate(&document).unwrap()).unwrap();

        prop_assert_eq!(first, second);
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn never_fails(document in document_strategy()) {
            check_never_fails(document)?;
        }

        #[test]
        fn idempotent(document in document_strategy()) {
            check_idempotent(document)?;
        }
    }
}
