//! Complexity, naming and the static metrics of a program.

use std::collections::HashSet;

use log::trace;

use prism_core::{
    Diagnostic, DiagnosticCode, DiagnosticCollector, Spanned,
    ast::{
        AssignOp, BinaryOp, Block, Callee, Expr, ExprKind, FunctionDecl, Literal, Program, Stmt,
        StmtKind, UnaryOp, VariableDecl, Visitor,
        visit::{walk_expr, walk_stmt},
    },
};

use super::{AnalysisContext, Analyzer, Pass, builtins};
use crate::result::Metrics;

/// Loops without literal bounds are assumed to run this many times.
const UNKNOWN_TRIP_COUNT: u64 = 8;
/// Literal bounds beyond this are clamped.
const MAX_TRIP_COUNT: u64 = 256;

pub struct QualityChecker;

impl Analyzer for QualityChecker {
    fn pass(&self) -> Pass {
        Pass::Quality
    }

    fn analyze(&self, context: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = DiagnosticCollector::new();
        let mut naming = Naming {
            pattern: context.naming_pattern,
            diagnostics: &mut diagnostics,
        };

        for stage in &context.program.stages {
            for function in stage.function_definitions() {
                let Some(body) = &function.body else {
                    continue;
                };
                let complexity = 1 + Counter::over(body).decisions;
                trace!(function = function.name.as_str(), complexity = complexity; "Measured function");
                if complexity > context.complexity_threshold {
                    naming.diagnostics.emit(
                        Diagnostic::warning(
                            DiagnosticCode::HighComplexity,
                            format!(
                                "`{}` has a cyclomatic complexity of {complexity}, above the limit of {}",
                                function.name, context.complexity_threshold
                            ),
                        )
                        .with_span(function.name.span())
                        .with_suggestion("split it into smaller functions"),
                    );
                }
                naming.check_function(function);
                naming.visit_block(body);
            }
        }
        diagnostics.finish()
    }
}

/// Reports declared names that do not match the configured pattern.
struct Naming<'a, 'd> {
    pattern: &'a regex::Regex,
    diagnostics: &'d mut DiagnosticCollector,
}

impl Naming<'_, '_> {
    fn check(&mut self, name: &Spanned<String>, kind: &str, is_const: bool) {
        if name.starts_with("gl_") || self.pattern.is_match(name) || (is_const && is_screaming_snake(name)) {
            return;
        }
        self.diagnostics.emit(
            Diagnostic::info(
                DiagnosticCode::NamingConvention,
                format!("{kind} `{name}` does not match the naming pattern `{}`", self.pattern.as_str()),
            )
            .with_span(name.span()),
        );
    }

    fn check_function(&mut self, function: &FunctionDecl) {
        if function.name.inner() != "main" {
            self.check(&function.name, "function", false);
        }
        for param in &function.params {
            if let Some(name) = &param.name {
                self.check(name, "parameter", param.is_const);
            }
        }
    }

    fn check_local(&mut self, variable: &VariableDecl) {
        self.check(&variable.name, "variable", variable.is_const());
    }
}

impl Visitor for Naming<'_, '_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let StmtKind::Declaration { variables } = &stmt.kind {
            for variable in variables {
                self.check_local(variable);
            }
        }
        walk_stmt(self, stmt);
    }
}

fn is_screaming_snake(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Decision points, texture lookups and nesting of a subtree.
#[derive(Debug, Default)]
struct Counter {
    decisions: u32,
    texture_lookups: u32,
    depth: u32,
    max_depth: u32,
}

impl Counter {
    fn over(block: &Block) -> Self {
        let mut counter = Self::default();
        counter.visit_block(block);
        counter
    }
}

impl Visitor for Counter {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        let nests = match &stmt.kind {
            StmtKind::If { .. }
            | StmtKind::For { .. }
            | StmtKind::While { .. }
            | StmtKind::DoWhile { .. } => {
                self.decisions += 1;
                true
            }
            StmtKind::Switch { cases, .. } => {
                self.decisions += cases.iter().filter(|case| case.label.is_some()).count() as u32;
                true
            }
            _ => false,
        };
        if nests {
            self.depth += 1;
            self.max_depth = self.max_depth.max(self.depth);
            walk_stmt(self, stmt);
            self.depth -= 1;
        } else {
            walk_stmt(self, stmt);
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ternary { .. }
            | ExprKind::Binary {
                op: BinaryOp::And | BinaryOp::Or,
                ..
            } => self.decisions += 1,
            ExprKind::Call { callee, .. } => {
                if let Callee::Function(name) = callee.inner()
                    && builtins::is_texture_lookup(name)
                {
                    self.texture_lookups += 1;
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

/// Static metrics over every stage of the program.
pub fn measure(program: &Program) -> Metrics {
    let mut counter = Counter::default();
    let mut instructions: u64 = 0;
    for stage in &program.stages {
        for function in stage.function_definitions() {
            if let Some(body) = &function.body {
                counter.visit_block(body);
                instructions = instructions.saturating_add(block_cost(body));
            }
        }
    }

    let uniforms: HashSet<&str> = program
        .stages
        .iter()
        .flat_map(|stage| stage.uniform_names())
        .map(|name| name.inner().as_str())
        .chain(
            program
                .prelude
                .iter()
                .filter(|symbol| symbol.is_uniform())
                .map(|symbol| symbol.name.as_str()),
        )
        .collect();

    Metrics {
        cyclomatic_complexity: counter.decisions.saturating_add(1),
        instruction_estimate: instructions,
        texture_lookup_count: counter.texture_lookups,
        uniform_count: uniforms.len() as u32,
        max_nesting_depth: counter.max_depth,
    }
}

fn block_cost(block: &Block) -> u64 {
    block
        .statements
        .iter()
        .fold(0, |total: u64, stmt| total.saturating_add(stmt_cost(stmt)))
}

fn stmt_cost(stmt: &Stmt) -> u64 {
    let optional = |expr: Option<&Expr>| expr.map_or(0, expr_cost);
    match &stmt.kind {
        StmtKind::Declaration { variables } => variables
            .iter()
            .filter_map(|variable| variable.initializer.as_ref())
            .fold(0, |total: u64, init| total.saturating_add(expr_cost(init).max(1))),
        StmtKind::Expression { expr } => expr_cost(expr),
        StmtKind::Block { block } => block_cost(block),
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let branches = stmt_cost(then_branch).max(else_branch.as_deref().map_or(0, stmt_cost));
            expr_cost(condition).saturating_add(1).saturating_add(branches)
        }
        StmtKind::For {
            init,
            condition,
            step,
            body,
        } => {
            let iteration = optional(condition.as_ref())
                .saturating_add(optional(step.as_ref()))
                .saturating_add(stmt_cost(body))
                .saturating_add(1);
            let trips = trip_count(init.as_deref(), condition.as_ref(), step.as_ref())
                .unwrap_or(UNKNOWN_TRIP_COUNT);
            init.as_deref()
                .map_or(0, stmt_cost)
                .saturating_add(iteration.saturating_mul(trips))
        }
        StmtKind::While { condition, body } | StmtKind::DoWhile { body, condition } => expr_cost(condition)
            .saturating_add(stmt_cost(body))
            .saturating_add(1)
            .saturating_mul(UNKNOWN_TRIP_COUNT),
        StmtKind::Switch { selector, cases } => {
            let widest = cases
                .iter()
                .map(|case| {
                    case.body
                        .iter()
                        .fold(0, |total: u64, stmt| total.saturating_add(stmt_cost(stmt)))
                })
                .max()
                .unwrap_or(0);
            expr_cost(selector).saturating_add(1).saturating_add(widest)
        }
        StmtKind::Return(value) => optional(value.as_ref()).saturating_add(1),
        StmtKind::Break | StmtKind::Continue | StmtKind::Discard => 1,
        StmtKind::Empty | StmtKind::Unparsed(_) => 0,
    }
}

fn expr_cost(expr: &Expr) -> u64 {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Identifier(_) => 0,
        ExprKind::Unary { operand, .. } => expr_cost(operand).saturating_add(1),
        ExprKind::Binary { op, lhs, rhs } => expr_cost(lhs)
            .saturating_add(expr_cost(rhs))
            .saturating_add(operator_cost(*op)),
        ExprKind::Assign { op, target, value } => {
            let operation = op.binary_op().map_or(0, operator_cost);
            expr_cost(target)
                .saturating_add(expr_cost(value))
                .saturating_add(operation)
                .saturating_add(1)
        }
        ExprKind::Ternary {
            condition,
            then_branch,
            else_branch,
        } => expr_cost(condition)
            .saturating_add(expr_cost(then_branch).max(expr_cost(else_branch)))
            .saturating_add(1),
        ExprKind::Call { callee, args } => {
            let call = match callee.inner() {
                Callee::Function(name) => match builtins::function(name) {
                    Some(function) => u64::from(function.cost),
                    // Host sampling helpers cost a lookup; user functions a call.
                    None if builtins::is_texture_lookup(name) => 4,
                    None => 2,
                },
                Callee::Constructor(_) => 1,
            };
            args.iter()
                .fold(call, |total, arg| total.saturating_add(expr_cost(arg)))
        }
        ExprKind::Member { base, .. } => expr_cost(base),
        ExprKind::Index { base, index } => expr_cost(base)
            .saturating_add(expr_cost(index))
            .saturating_add(1),
        ExprKind::Sequence(exprs) => exprs
            .iter()
            .fold(0, |total: u64, expr| total.saturating_add(expr_cost(expr))),
    }
}

fn operator_cost(op: BinaryOp) -> u64 {
    match op {
        BinaryOp::Div | BinaryOp::Rem => 4,
        _ => 1,
    }
}

/// Iterations of `for (int i = a; i < b; i++)` and its close relatives, when
/// every bound is a literal.
fn trip_count(init: Option<&Stmt>, condition: Option<&Expr>, step: Option<&Expr>) -> Option<u64> {
    let StmtKind::Declaration { variables } = &init?.kind else {
        return None;
    };
    let [variable] = variables.as_slice() else {
        return None;
    };
    let counter = variable.name.as_str();
    let start = int_literal(variable.initializer.as_ref()?)?;

    let ExprKind::Binary { op, lhs, rhs } = &condition?.kind else {
        return None;
    };
    if lhs.as_identifier() != Some(counter) {
        return None;
    }
    let end = int_literal(rhs)?;
    let stride = stride(step?, counter)?;

    let span = match op {
        BinaryOp::Lt | BinaryOp::Ne if stride > 0 => end - start,
        BinaryOp::Le if stride > 0 => end - start + 1,
        BinaryOp::Gt | BinaryOp::Ne if stride < 0 => start - end,
        BinaryOp::Ge if stride < 0 => start - end + 1,
        _ => return None,
    };
    if span <= 0 {
        return Some(0);
    }
    let stride = stride.unsigned_abs();
    let trips = (span.unsigned_abs()).div_ceil(stride);
    Some(trips.min(MAX_TRIP_COUNT))
}

fn int_literal(expr: &Expr) -> Option<i64> {
    match &expr.kind {
        ExprKind::Literal(Literal::Int(value)) => Some(*value),
        ExprKind::Literal(Literal::Uint(value)) => i64::try_from(*value).ok(),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => int_literal(operand)?.checked_neg(),
        _ => None,
    }
}

/// How much one step moves the counter: `i++`, `--i`, `i += 2`, `i -= 1`.
fn stride(step: &Expr, counter: &str) -> Option<i64> {
    match &step.kind {
        ExprKind::Unary { op, operand } if operand.as_identifier() == Some(counter) => match op {
            UnaryOp::PreInc | UnaryOp::PostInc => Some(1),
            UnaryOp::PreDec | UnaryOp::PostDec => Some(-1),
            _ => None,
        },
        ExprKind::Assign { op, target, value } if target.as_identifier() == Some(counter) => {
            let amount = int_literal(value)?;
            let stride = match op {
                AssignOp::Add => amount,
                AssignOp::Sub => amount.checked_neg()?,
                _ => return None,
            };
            (stride != 0).then_some(stride)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use prism_core::{DiagnosticCode, ShaderFormat};
    use prism_parser::{ParseOptions, parser_for};

    use super::*;
    use crate::analysis::test_support::{codes, run, run_as, spanned};

    fn metrics(format: ShaderFormat, source: &str) -> Metrics {
        let output = parser_for(format).parse(source, &ParseOptions::default());
        measure(&output.program)
    }

    fn glsl_metrics(source: &str) -> Metrics {
        metrics(ShaderFormat::CoreLanguage, source)
    }

    #[test]
    fn test_complexity_counts_every_decision() {
        let source = "float f(float x) {
            if (x > 0.0 && x < 1.0) { return 1.0; }
            for (int i = 0; i < 4; i++) { x += 1.0; }
            while (x > 10.0) { x -= 1.0; }
            switch (int(x)) { case 0: x = 1.0; break; case 1: break; default: break; }
            return x > 2.0 ? x : 0.0;
        }";

        assert_eq!(glsl_metrics(source).cyclomatic_complexity, 8);
    }

    #[test]
    fn test_high_complexity_reported_at_function_name() {
        let branches = (0..11).map(|i| format!("if (x > {i}.0) {{ x += 1.0; }}")).collect::<String>();
        let source = format!("float busy(float x) {{ {branches} return x; }}\nvoid main() {{}}");
        let diagnostics = run(&QualityChecker, &source);

        assert_eq!(codes(&diagnostics), [DiagnosticCode::HighComplexity]);
        assert_eq!(spanned(&source, &diagnostics, DiagnosticCode::HighComplexity), ["busy"]);
        assert!(diagnostics[0].message().contains("complexity of 12"));
    }

    #[test]
    fn test_complexity_at_threshold_is_fine() {
        let branches = (0..9).map(|i| format!("if (x > {i}.0) {{ x += 1.0; }}")).collect::<String>();
        let source = format!("float calm(float x) {{ {branches} return x; }}");

        assert!(run(&QualityChecker, &source).is_empty());
    }

    #[test]
    fn test_naming_convention() {
        let source = "const float MAX_STEPS = 4.0;
            float DoWork(float InValue, const float LIMIT) {
                const int COUNT = 2;
                float BadLocal = InValue;
                float gl_thing = 1.0;
                return BadLocal + LIMIT;
            }";
        let diagnostics = run(&QualityChecker, source);

        assert_eq!(
            spanned(source, &diagnostics, DiagnosticCode::NamingConvention),
            ["DoWork", "InValue", "BadLocal"]
        );
        assert!(diagnostics.iter().all(|d| d.severity().is_info()));
    }

    #[test]
    fn test_literal_loop_scales_by_trip_count() {
        let once = glsl_metrics("void main() { float x = 0.0; x += 1.0; }");
        let looped = glsl_metrics("void main() { float x = 0.0; for (int i = 0; i < 10; i++) { x += 1.0; } }");
        let unknown = glsl_metrics("uniform int n; void main() { float x = 0.0; for (int i = 0; i < n; i++) { x += 1.0; } }");

        // Each iteration: condition 1, step 1, body 2, back edge 1.
        assert_eq!(once.instruction_estimate, 3);
        assert_eq!(looped.instruction_estimate, 1 + 1 + 10 * 5);
        assert_eq!(unknown.instruction_estimate, 1 + 1 + 8 * 5);
    }

    #[test]
    fn test_trip_count_forms() {
        let count = |source: &str| {
            let wrapped = format!("void main() {{ {source} }}");
            let output = parser_for(ShaderFormat::CoreLanguage).parse(&wrapped, &ParseOptions::default());
            let body = output.program.stages[0]
                .function_definitions()
                .next()
                .and_then(|f| f.body.clone())
                .unwrap();
            match &body.statements[0].kind {
                StmtKind::For {
                    init,
                    condition,
                    step,
                    ..
                } => trip_count(init.as_deref(), condition.as_ref(), step.as_ref()),
                other => panic!("expected a for loop, got {other:?}"),
            }
        };

        assert_eq!(count("for (int i = 0; i < 10; i++) {}"), Some(10));
        assert_eq!(count("for (int i = 0; i <= 10; i += 2) {}"), Some(6));
        assert_eq!(count("for (int i = 10; i > 0; --i) {}"), Some(10));
        assert_eq!(count("for (int i = 5; i < 2; i++) {}"), Some(0));
        assert_eq!(count("for (int i = 0; i < 100000; i++) {}"), Some(256));
        assert_eq!(count("for (int i = 0; i < 10; i *= 2) {}"), None);
        assert_eq!(count("for (float t = 0.0; t < 1.0; t += 0.1) {}"), None);
    }

    #[test]
    fn test_texture_lookups_and_uniforms() {
        let source = r#"{"PASSES": [{}], "INPUTS": [{"NAME": "image", "TYPE": "image"}, {"NAME": "level", "TYPE": "float"}], "FRAGMENT_SHADER": "uniform float level; void main() { gl_FragColor = IMG_NORM_PIXEL(image, isf_FragNormCoord) * IMG_THIS_PIXEL(image) * level; }"}"#;
        let metrics = metrics(ShaderFormat::InteractiveJson, source);

        assert_eq!(metrics.texture_lookup_count, 2);
        // `level` is both an input and a declared uniform; it counts once.
        let host = parser_for(ShaderFormat::InteractiveJson)
            .parse(source, &ParseOptions::default())
            .program
            .prelude
            .iter()
            .filter(|symbol| symbol.is_uniform())
            .count() as u32;
        assert_eq!(metrics.uniform_count, host);
    }

    #[test]
    fn test_nesting_depth() {
        let flat = glsl_metrics("void main() { float x = 1.0; }");
        let nested = glsl_metrics(
            "void main() { for (int i = 0; i < 2; i++) { if (i > 0) { while (false) {} } } }",
        );

        assert_eq!(flat.max_nesting_depth, 0);
        assert_eq!(nested.max_nesting_depth, 3);
    }

    #[test]
    fn test_annotated_stages_share_metrics() {
        let source = "// FRAGMENT_SHADER\nuniform sampler2D tex;\nvoid main() { gl_FragColor = texture2D(tex, vec2(0.0)); }\n";
        let diagnostics = run_as(&QualityChecker, ShaderFormat::AnnotatedMapping, source);
        let metrics = metrics(ShaderFormat::AnnotatedMapping, source);

        assert!(diagnostics.is_empty());
        assert_eq!(metrics.texture_lookup_count, 1);
        assert_eq!(metrics.uniform_count, 1);
    }
}
