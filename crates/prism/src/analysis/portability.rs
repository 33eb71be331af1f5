//! Version and platform compatibility.
//!
//! Each stage is checked against the version it will be compiled with: its
//! own `#version`, the shared preamble's, the caller's declared version, or,
//! failing all of those, the smallest desktop version covering every feature
//! the code uses. Guessed versions are reported once per document and are
//! never used to flag incompatibilities.

use std::collections::HashSet;

use log::trace;

use prism_core::{
    Diagnostic, DiagnosticCode, DiagnosticCollector, ShaderFormat, Span,
    ast::{
        Callee, Declaration, DeclarationKind, Expr, ExprKind, FunctionDecl, Literal, Profile,
        ScalarKind, Stage, StageKind, Stmt, StmtKind, StorageQualifier, Type, UnaryOp,
        VariableDecl, Visitor,
        visit::{walk_declaration, walk_expr, walk_function, walk_stmt, walk_variable},
    },
};

use super::{
    AnalysisContext, Analyzer, Pass,
    capabilities::{self, Capability, GlslVersion, Support},
};

pub struct PortabilityChecker;

impl Analyzer for PortabilityChecker {
    fn pass(&self) -> Pass {
        Pass::Portability
    }

    fn analyze(&self, context: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let program = context.program;
        let common = program.common_stage();
        let mut diagnostics = DiagnosticCollector::new();

        let declared = context.declared_version.and_then(|text| {
            let version = GlslVersion::parse(text);
            if version.is_none() {
                diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticCode::UnsupportedVersion,
                        format!("requested version `{text}` is not a GLSL version"),
                    )
                    .with_suggestion("use a version such as `330`, `450` or `300 es`"),
                );
            }
            version
        });

        let mut unversioned = Vec::new();
        for stage in &program.stages {
            let shared = common.filter(|_| stage.kind != StageKind::Common);
            vendor_extensions(stage, &mut diagnostics);
            let features = Features::collect(stage, shared);

            let own = match &stage.version {
                Some(directive) => match GlslVersion::from_directive(directive) {
                    Some(version) => Some(version),
                    None => {
                        let written = match directive.profile {
                            Some(profile) => format!("{} {}", directive.number, profile.as_str()),
                            None => directive.number.to_string(),
                        };
                        diagnostics.emit(
                            Diagnostic::error(
                                DiagnosticCode::UnsupportedVersion,
                                format!("`#version {written}` is not a GLSL version"),
                            )
                            .with_span(directive.span)
                            .with_suggestion("use a version such as `330`, `450` or `300 es`"),
                        );
                        continue;
                    }
                },
                None => None,
            };

            if let (Some(version), Some(requested), Some(directive)) = (own, declared, &stage.version)
                && version != requested
            {
                diagnostics.emit(
                    Diagnostic::warning(
                        DiagnosticCode::VersionConflict,
                        format!("the shader declares GLSL {version}, but {requested} was requested"),
                    )
                    .with_span(directive.span)
                    .with_suggestion(format!("change the directive to `#version {requested}`")),
                );
            }

            let inherited = own.or_else(|| {
                shared
                    .and_then(|common| common.version.as_ref())
                    .and_then(GlslVersion::from_directive)
            });
            let Some(version) = inherited.or(declared) else {
                unversioned.push(features);
                continue;
            };

            let version = if version.number == 140 && enables(stage, shared, "GL_ARB_compatibility") {
                version.with_profile(Profile::Compatibility)
            } else {
                version
            };
            check_features(&features, version, stage, shared, &mut diagnostics);
            missing_precision(stage, shared, version, &mut diagnostics);
            trace!(
                label = stage.label.as_str(),
                version:% = version,
                features = features.used.len();
                "Checked stage portability"
            );
        }

        if !unversioned.is_empty() {
            let minimum = unversioned
                .iter()
                .flat_map(|features| features.used.iter())
                .filter_map(|(capability, _)| capability.desktop)
                .max()
                .unwrap_or(110)
                .max(110);
            diagnostics.emit(inferred_version(context.format, minimum));
        }

        diagnostics.finish()
    }
}

fn inferred_version(format: ShaderFormat, minimum: u32) -> Diagnostic {
    match format {
        ShaderFormat::CoreLanguage => Diagnostic::warning(
            DiagnosticCode::MissingVersion,
            format!("no `#version` directive; the code needs at least GLSL {minimum}"),
        )
        .with_suggestion(format!("add `#version {minimum}` as the first line")),
        ShaderFormat::InteractiveJson | ShaderFormat::AnnotatedMapping => Diagnostic::info(
            DiagnosticCode::VersionInferred,
            format!("no `#version` directive; assuming GLSL {minimum} from the features used"),
        ),
    }
}

fn enables(stage: &Stage, shared: Option<&Stage>, extension: &str) -> bool {
    stage.has_extension(extension) || shared.is_some_and(|common| common.has_extension(extension))
}

fn vendor_extensions(stage: &Stage, diagnostics: &mut DiagnosticCollector) {
    for extension in &stage.extensions {
        let name = extension.name.inner();
        if !capabilities::is_vendor_extension(name) {
            continue;
        }
        let suggestion = match capabilities::portable_equivalent(name) {
            Some(portable) => format!("use `{portable}` instead"),
            None => format!("guard the code that needs it with `#ifdef {name}`"),
        };
        diagnostics.emit(
            Diagnostic::warning(
                DiagnosticCode::NonPortableExtension,
                format!("`{name}` is a vendor extension and may be missing on other GPUs"),
            )
            .with_span(extension.name.span())
            .with_suggestion(suggestion),
        );
    }
}

fn check_features(
    features: &Features,
    version: GlslVersion,
    stage: &Stage,
    shared: Option<&Stage>,
    diagnostics: &mut DiagnosticCollector,
) {
    for (capability, span) in &features.used {
        let name = capability.name;
        let diagnostic = match capability.support(version) {
            Support::Available => continue,
            Support::Requires(minimum) => {
                if capability
                    .extension
                    .is_some_and(|extension| enables(stage, shared, extension))
                {
                    continue;
                }
                let mut diagnostic = Diagnostic::error(
                    DiagnosticCode::VersionIncompatible,
                    format!("`{name}` requires GLSL {minimum}, but the shader declares {version}"),
                )
                .with_suggestion(format!("declare `#version {minimum}` or later"));
                if let Some(extension) = capability.extension {
                    diagnostic = diagnostic.with_suggestion(format!("or enable `{extension}`"));
                }
                diagnostic
            }
            Support::Removed { since } => Diagnostic::error(
                DiagnosticCode::VersionIncompatible,
                format!("`{name}` was removed in GLSL {since} and is not available in {version}"),
            ),
            Support::Missing => Diagnostic::error(
                DiagnosticCode::VersionIncompatible,
                format!("`{name}` is not available in GLSL {version}"),
            ),
            Support::Deprecated { since } => Diagnostic::warning(
                DiagnosticCode::DeprecatedFeature,
                format!("`{name}` is deprecated since GLSL {since}"),
            ),
        };
        let diagnostic = match capability.replacement {
            Some(replacement) => diagnostic.with_suggestion(format!("use {replacement} instead")),
            None => diagnostic,
        };
        diagnostics.emit(diagnostic.with_span(*span));
    }
}

/// ES fragment code must choose a default float precision.
fn missing_precision(
    stage: &Stage,
    shared: Option<&Stage>,
    version: GlslVersion,
    diagnostics: &mut DiagnosticCollector,
) {
    if !version.is_es() || !matches!(stage.kind, StageKind::Fragment | StageKind::Generic) {
        return;
    }
    let declares_float = |stage: &Stage| {
        stage.declarations.iter().any(|declaration| {
            matches!(&declaration.kind, DeclarationKind::Precision(precision) if *precision.ty.inner() == Type::FLOAT)
        })
    };
    if declares_float(stage) || shared.is_some_and(declares_float) {
        return;
    }

    let diagnostic = Diagnostic::warning(
        DiagnosticCode::MissingPrecision,
        format!("{} code in GLSL {version} has no default float precision", stage.kind),
    )
    .with_suggestion("add `precision mediump float;` before the first declaration");
    diagnostics.emit(match &stage.version {
        Some(directive) => diagnostic.with_span(directive.span),
        None => diagnostic,
    });
}

/// The versioned features a stage uses, each with its first occurrence.
struct Features<'a> {
    used: Vec<(&'static Capability, Span)>,
    seen: HashSet<&'static str>,
    /// Functions the shader defines itself, which hide built-ins of the same name.
    user_functions: HashSet<&'a str>,
}

impl<'a> Features<'a> {
    fn collect(stage: &'a Stage, shared: Option<&'a Stage>) -> Self {
        let user_functions = stage
            .functions
            .keys()
            .chain(shared.into_iter().flat_map(|common| common.functions.keys()))
            .map(String::as_str)
            .collect();
        let mut features = Self {
            used: Vec::new(),
            seen: HashSet::new(),
            user_functions,
        };
        features.visit_stage(stage);
        features
    }

    fn record(&mut self, name: &str, span: Span) {
        if let Some(capability) = capabilities::lookup(name)
            && self.seen.insert(capability.name)
        {
            self.used.push((capability, span));
        }
    }

    fn record_type(&mut self, ty: &Type, span: Span) {
        match ty {
            Type::Array(inner, _) => self.record_type(inner, span),
            _ => match ty.scalar_kind() {
                Some(ScalarKind::Uint) => self.record("uint", span),
                Some(ScalarKind::Double) => self.record("double", span),
                _ => {}
            },
        }
    }

    fn record_global(&mut self, variable: &VariableDecl) {
        let span = variable.span;
        match variable.qualifiers.storage {
            StorageQualifier::In => self.record("in", span),
            StorageQualifier::Out => self.record("out", span),
            StorageQualifier::Attribute => self.record("attribute", span),
            StorageQualifier::Varying => self.record("varying", span),
            _ => {}
        }
        let layout = &variable.qualifiers.layout;
        if layout.iter().any(|name| name == "location") {
            self.record("layout(location)", span);
        } else if !layout.is_empty() {
            self.record("layout", span);
        }
    }
}

impl Visitor for Features<'_> {
    fn visit_declaration(&mut self, declaration: &Declaration) {
        match &declaration.kind {
            DeclarationKind::Variable(variable) => self.record_global(variable),
            DeclarationKind::Struct(decl) => {
                for member in &decl.members {
                    self.record_type(member.ty.inner(), member.ty.span());
                }
            }
            DeclarationKind::InterfaceBlock(block) => {
                self.record("uniform block", block.span);
                for member in &block.members {
                    self.record_type(member.ty.inner(), member.ty.span());
                }
            }
            _ => {}
        }
        walk_declaration(self, declaration);
    }

    fn visit_variable(&mut self, variable: &VariableDecl) {
        self.record_type(variable.ty.inner(), variable.ty.span());
        walk_variable(self, variable);
    }

    fn visit_function(&mut self, function: &FunctionDecl) {
        self.record_type(function.return_type.inner(), function.return_type.span());
        for param in &function.params {
            self.record_type(param.ty.inner(), param.ty.span());
        }
        walk_function(self, function);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let StmtKind::Switch { .. } = stmt.kind {
            self.record("switch", stmt.span);
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(Literal::Uint(_)) => self.record("uint", expr.span),
            ExprKind::Identifier(name) if name.starts_with("gl_") => self.record(name, expr.span),
            ExprKind::Call { callee, .. } => match callee.inner() {
                Callee::Function(name) if !self.user_functions.contains(name.as_str()) => {
                    self.record(name, callee.span());
                }
                Callee::Constructor(ty) => self.record_type(ty, callee.span()),
                Callee::Function(_) => {}
            },
            ExprKind::Binary { op, .. } if op.is_bitwise() || op.symbol() == "%" => {
                self.record(op.symbol(), expr.span);
            }
            ExprKind::Assign { op, .. } => {
                if let Some(op) = op.binary_op()
                    && (op.is_bitwise() || op.symbol() == "%")
                {
                    self.record(op.symbol(), expr.span);
                }
            }
            ExprKind::Unary { op: UnaryOp::BitNot, .. } => {
                self.record("~", expr.span);
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use prism_core::{DiagnosticCode, ShaderFormat};

    use super::*;
    use crate::analysis::test_support::{codes, run, run_as, spanned};

    fn check(source: &str) -> Vec<Diagnostic> {
        run(&PortabilityChecker, source)
    }

    #[test]
    fn test_function_newer_than_declared_version() {
        let source = "#version 120\nuniform sampler2D tex;\nvoid main() { gl_FragColor = texture(tex, vec2(0.5)); }";
        let diagnostics = check(source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::VersionIncompatible]);
        assert_eq!(
            diagnostics[0].message(),
            "`texture` requires GLSL 130, but the shader declares 120"
        );
        assert_eq!(spanned(source, &diagnostics, DiagnosticCode::VersionIncompatible), ["texture"]);
        assert_eq!(diagnostics[0].suggestions(), ["declare `#version 130` or later"]);
    }

    #[test]
    fn test_each_feature_reported_once_per_stage() {
        let source = "#version 120\nuniform sampler2D t;\nvoid main() { vec4 a = texture(t, vec2(0.0)); gl_FragColor = a + texture(t, vec2(1.0)); }";
        let diagnostics = check(source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::VersionIncompatible]);
    }

    #[test]
    fn test_removed_in_core_profile() {
        let source = "#version 330\nvoid main() { gl_FragColor = vec4(1.0); }";
        let diagnostics = check(source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::VersionIncompatible]);
        assert_eq!(
            diagnostics[0].message(),
            "`gl_FragColor` was removed in GLSL 140 and is not available in 330 core"
        );
        assert_eq!(diagnostics[0].suggestions(), ["use an `out vec4` variable instead"]);
    }

    #[test]
    fn test_compatibility_profile_only_deprecates() {
        let source = "#version 330 compatibility\nuniform sampler2D t;\nvoid main() { gl_FragColor = texture2D(t, vec2(0.0)); }";
        let diagnostics = check(source);

        assert_eq!(
            codes(&diagnostics),
            [DiagnosticCode::DeprecatedFeature, DiagnosticCode::DeprecatedFeature]
        );
    }

    #[test]
    fn test_enabling_extension_lifts_the_requirement() {
        let with = "#version 100\n#extension GL_OES_standard_derivatives : enable\nprecision mediump float;\nvoid main() { gl_FragColor = vec4(fwidth(1.0)); }";
        let without = "#version 100\nprecision mediump float;\nvoid main() { gl_FragColor = vec4(fwidth(1.0)); }";

        assert!(check(with).is_empty());
        let diagnostics = check(without);
        assert_eq!(codes(&diagnostics), [DiagnosticCode::VersionIncompatible]);
        assert_eq!(
            diagnostics[0].suggestions(),
            ["declare `#version 300 es` or later", "or enable `GL_OES_standard_derivatives`"]
        );
    }

    #[test]
    fn test_language_constructs() {
        let source = "#version 120\nin vec2 uv;\nvoid main() { uint n = 3u; switch (int(n)) { default: break; } int m = 5 % 2; }";
        let diagnostics = check(source);

        let names: Vec<&str> = diagnostics
            .iter()
            .filter_map(|d| d.message().split('`').nth(1))
            .collect();
        assert_eq!(names, ["in", "uint", "switch", "%"]);
    }

    #[test]
    fn test_user_function_hides_builtin() {
        let source = "#version 120\nfloat round(float x) { return floor(x + 0.5); }\nvoid main() { gl_FragColor = vec4(round(0.4)); }";
        assert!(check(source).is_empty());
    }

    #[test]
    fn test_missing_version_is_inferred_once() {
        let source = "uniform sampler2D t;\nin vec2 uv;\nvoid main() { gl_FragColor = texture(t, uv) * inverse(mat2(1.0))[0].x; }";
        let diagnostics = check(source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::MissingVersion]);
        assert!(diagnostics[0].span().is_none());
        assert_eq!(
            diagnostics[0].message(),
            "no `#version` directive; the code needs at least GLSL 140"
        );
    }

    #[test]
    fn test_interactive_json_version_is_info() {
        let source = r#"{"PASSES": [{}], "FRAGMENT_SHADER": "void main() { gl_FragColor = vec4(TIME); }"}"#;
        let diagnostics = run_as(&PortabilityChecker, ShaderFormat::InteractiveJson, source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::VersionInferred]);
        assert!(diagnostics[0].severity().is_info());
        assert!(diagnostics[0].message().contains("GLSL 110"));
    }

    #[test]
    fn test_unsupported_version() {
        let source = "#version 200\nvoid main() { gl_FragColor = texture(t, uv); }";
        let diagnostics = check(source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::UnsupportedVersion]);
        assert_eq!(spanned(source, &diagnostics, DiagnosticCode::UnsupportedVersion), ["#version 200"]);
    }

    #[test]
    fn test_vendor_extension_with_equivalent() {
        let source = "#version 450\n#extension GL_NV_gpu_shader5 : enable\nvoid main() {}";
        let diagnostics = check(source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::NonPortableExtension]);
        assert_eq!(spanned(source, &diagnostics, DiagnosticCode::NonPortableExtension), ["GL_NV_gpu_shader5"]);
        assert_eq!(diagnostics[0].suggestions(), ["use `GL_ARB_gpu_shader5` instead"]);
    }

    #[test]
    fn test_es_fragment_needs_precision() {
        let missing = "#version 300 es\nout vec4 color;\nvoid main() { color = vec4(1.0); }";
        let present = "#version 300 es\nprecision highp float;\nout vec4 color;\nvoid main() { color = vec4(1.0); }";

        let diagnostics = check(missing);
        assert_eq!(codes(&diagnostics), [DiagnosticCode::MissingPrecision]);
        assert_eq!(spanned(missing, &diagnostics, DiagnosticCode::MissingPrecision), ["#version 300 es"]);
        assert!(check(present).is_empty());
    }

    #[test]
    fn test_annotated_stages_inherit_common_version() {
        let source = "#version 120\n// VERTEX_SHADER\nvoid main() { gl_Position = vec4(0.0); }\n// FRAGMENT_SHADER\nvoid main() { gl_FragColor = vec4(round(0.5)); }\n";
        let diagnostics = run_as(&PortabilityChecker, ShaderFormat::AnnotatedMapping, source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::VersionIncompatible]);
        assert!(diagnostics[0].message().starts_with("`round` requires GLSL 130"));
    }
}
