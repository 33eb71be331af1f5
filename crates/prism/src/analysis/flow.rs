//! Control-flow and dataflow checks over each function body.
//!
//! Every function definition gets a [`Cfg`]. From it this pass reports
//! unreachable statements, loops with no way out and non-void functions that
//! can run off their end. It then runs three dataflow problems over the
//! reachable blocks:
//!
//! - may-be-initialized (forward) for reads of never-assigned locals,
//! - liveness (backward) for stores nobody reads,
//! - constant propagation (forward, in [`constant`]) for zero divisors.
//!
//! Bodies containing code the parser skipped only get the structural checks.

use std::{
    collections::{HashMap, HashSet, hash_map::Entry},
    slice,
};

use log::trace;
use petgraph::graph::NodeIndex;

use prism_core::{
    Diagnostic, DiagnosticCode, DiagnosticCollector, Span,
    ast::{FunctionDecl, ParamQualifier, Stage, StageKind, Stmt, StmtKind},
};

use super::{
    AnalysisContext, Analyzer, Pass,
    cfg::{Access, Cfg, ItemKind, Signatures, VarId},
    constant, contains_unparsed,
};

pub struct FlowChecker;

impl Analyzer for FlowChecker {
    fn pass(&self) -> Pass {
        Pass::Flow
    }

    fn analyze(&self, context: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let program = context.program;
        let common = program.common_stage();
        let mut diagnostics = DiagnosticCollector::new();

        for stage in &program.stages {
            let shared = common.filter(|_| stage.kind != StageKind::Common);
            let stages: Vec<&Stage> = shared.into_iter().chain([stage]).collect();
            let mut divisors = Vec::new();
            let globals = constant::global_constants(&stages, &mut divisors);
            let signatures = Signatures::new(stage, shared);

            let mut functions = 0;
            for function in stage.function_definitions() {
                let Some(body) = &function.body else {
                    continue;
                };
                let cfg = Cfg::build(function, body, &signatures);
                let reachable = cfg.reachable();
                let checker = FunctionFlow {
                    function,
                    cfg: &cfg,
                    reachable: &reachable,
                };

                checker.unreachable_statements(&body.statements, &mut diagnostics);
                checker.infinite_loops(&mut diagnostics);
                if !contains_unparsed(body) {
                    checker.missing_return(&mut diagnostics);
                    checker.uninitialized_reads(&mut diagnostics);
                    checker.dead_stores(&mut diagnostics);
                    divisors.extend(constant::zero_divisors(&cfg, &globals));
                }
                functions += 1;
            }

            for span in divisors {
                diagnostics.emit(
                    Diagnostic::warning(DiagnosticCode::DivByZeroRisk, "division by zero")
                        .with_span(span)
                        .with_suggestion("check the divisor before dividing"),
                );
            }
            trace!(label = stage.label.as_str(), functions = functions; "Checked stage flow");
        }
        diagnostics.finish()
    }
}

struct FunctionFlow<'c, 'a> {
    function: &'a FunctionDecl,
    cfg: &'c Cfg<'a>,
    reachable: &'c HashSet<NodeIndex>,
}

impl FunctionFlow<'_, '_> {
    fn is_reachable(&self, span: Span) -> bool {
        // Statements the builder never saw (none in practice) count as reachable.
        self.cfg
            .statement_block(span)
            .is_none_or(|block| self.reachable.contains(&block))
    }

    /// One report per run of consecutive unreachable statements.
    fn unreachable_statements(&self, statements: &[Stmt], diagnostics: &mut DiagnosticCollector) {
        let mut run: Option<Span> = None;
        let flush = |run: &mut Option<Span>, diagnostics: &mut DiagnosticCollector| {
            if let Some(span) = run.take() {
                diagnostics.emit(
                    Diagnostic::warning(DiagnosticCode::UnreachableCode, "unreachable code")
                        .with_span(span)
                        .with_suggestion("remove it, or the jump that skips it"),
                );
            }
        };

        for stmt in statements {
            match &stmt.kind {
                StmtKind::Empty => continue,
                StmtKind::Unparsed(_) => {
                    flush(&mut run, diagnostics);
                    continue;
                }
                _ => {}
            }
            if !self.is_reachable(stmt.span) {
                run = Some(run.map_or(stmt.span, |span| span.union(stmt.span)));
                continue;
            }
            flush(&mut run, diagnostics);
            self.nested_statements(stmt, diagnostics);
        }
        flush(&mut run, diagnostics);
    }

    fn nested_statements(&self, stmt: &Stmt, diagnostics: &mut DiagnosticCollector) {
        match &stmt.kind {
            StmtKind::Block { block } => self.unreachable_statements(&block.statements, diagnostics),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.unreachable_statements(slice::from_ref(then_branch.as_ref()), diagnostics);
                if let Some(else_branch) = else_branch {
                    self.unreachable_statements(slice::from_ref(else_branch.as_ref()), diagnostics);
                }
            }
            StmtKind::For { body, .. } | StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
                self.unreachable_statements(slice::from_ref(body.as_ref()), diagnostics);
            }
            StmtKind::Switch { cases, .. } => {
                for case in cases {
                    self.unreachable_statements(&case.body, diagnostics);
                }
            }
            _ => {}
        }
    }

    fn infinite_loops(&self, diagnostics: &mut DiagnosticCollector) {
        for info in &self.cfg.loops {
            let exits = info.conditional || info.exits.iter().any(|block| self.reachable.contains(block));
            if !exits && self.is_reachable(info.span) {
                diagnostics.emit(
                    Diagnostic::warning(DiagnosticCode::InfiniteLoop, "this loop never exits")
                        .with_span(info.span)
                        .with_suggestion("add a `break` or a condition that can become false"),
                );
            }
        }
    }

    fn missing_return(&self, diagnostics: &mut DiagnosticCollector) {
        let name = &self.function.name;
        if !self.function.return_type.is_void() && self.reachable.contains(&self.cfg.fall_through) {
            diagnostics.emit(
                Diagnostic::warning(
                    DiagnosticCode::MissingReturn,
                    format!("`{name}` can reach its end without returning a value"),
                )
                .with_span(name.span())
                .with_suggestion(format!(
                    "return a `{}` on every path",
                    self.function.return_type
                )),
            );
        }
    }

    fn uninitialized_reads(&self, diagnostics: &mut DiagnosticCollector) {
        let cfg = self.cfg;
        let order: Vec<NodeIndex> = cfg.postorder().into_iter().rev().collect();
        let initial: Vec<bool> = cfg.variables.iter().map(|v| v.param.is_some()).collect();

        let entry_state = |block: NodeIndex, outputs: &HashMap<NodeIndex, Vec<bool>>| {
            if block == cfg.entry {
                return initial.clone();
            }
            let mut state = vec![false; initial.len()];
            for predecessor in cfg.predecessors(block) {
                if let Some(out) = outputs.get(&predecessor) {
                    for (slot, set) in state.iter_mut().zip(out) {
                        *slot |= *set;
                    }
                }
            }
            state
        };
        let transfer = |block: NodeIndex, state: &mut Vec<bool>, reads: &mut Vec<(VarId, Span)>| {
            for item in cfg.items(block) {
                for &(access, span) in &item.accesses {
                    match access {
                        Access::Read(var) if !state[var] => reads.push((var, span)),
                        Access::Read(_) => {}
                        Access::Write { var, .. } => state[var] = true,
                    }
                }
                if let ItemKind::Declare { var, init: None } = item.kind {
                    state[var] = false;
                }
            }
        };

        let mut outputs: HashMap<NodeIndex, Vec<bool>> = HashMap::new();
        let mut changed = true;
        while changed {
            changed = false;
            for &block in &order {
                let mut state = entry_state(block, &outputs);
                transfer(block, &mut state, &mut Vec::new());
                if outputs.get(&block) != Some(&state) {
                    outputs.insert(block, state);
                    changed = true;
                }
            }
        }

        let mut reads = Vec::new();
        for &block in &order {
            let mut state = entry_state(block, &outputs);
            transfer(block, &mut state, &mut reads);
        }

        let mut earliest: HashMap<VarId, Span> = HashMap::new();
        for (var, span) in reads {
            match earliest.entry(var) {
                Entry::Occupied(mut slot) => {
                    if span < *slot.get() {
                        slot.insert(span);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(span);
                }
            }
        }
        let mut earliest: Vec<_> = earliest.into_iter().collect();
        earliest.sort_by_key(|(_, span)| *span);

        for (var, span) in earliest {
            let variable = &cfg.variables[var];
            diagnostics.emit(
                Diagnostic::error(
                    DiagnosticCode::UseBeforeInit,
                    format!("`{}` is used before it is initialized", variable.name),
                )
                .with_span(span)
                .with_label(variable.span, "declared here")
                .with_suggestion(format!("give `{}` a value where it is declared", variable.name)),
            );
        }
    }

    fn dead_stores(&self, diagnostics: &mut DiagnosticCollector) {
        let cfg = self.cfg;
        let postorder = cfg.postorder();
        let tracked: Vec<bool> = cfg
            .variables
            .iter()
            .map(|v| matches!(v.param, None | Some(ParamQualifier::In)))
            .collect();

        let live_out = |block: NodeIndex, live_in: &HashMap<NodeIndex, Vec<bool>>| {
            let mut live = vec![false; tracked.len()];
            for successor in cfg.successors(block) {
                if let Some(incoming) = live_in.get(&successor) {
                    for (slot, set) in live.iter_mut().zip(incoming) {
                        *slot |= *set;
                    }
                }
            }
            live
        };
        let transfer = |block: NodeIndex, live: &mut Vec<bool>, dead: &mut Vec<(VarId, Span)>| {
            for item in cfg.items(block).iter().rev() {
                for &(access, span) in item.accesses.iter().rev() {
                    match access {
                        Access::Write { var, whole: true } => {
                            if !live[var] && tracked[var] {
                                dead.push((var, span));
                            }
                            live[var] = false;
                        }
                        Access::Write { .. } => {}
                        Access::Read(var) => live[var] = true,
                    }
                }
            }
        };

        let mut live_in: HashMap<NodeIndex, Vec<bool>> = HashMap::new();
        let mut changed = true;
        while changed {
            changed = false;
            for &block in &postorder {
                let mut live = live_out(block, &live_in);
                transfer(block, &mut live, &mut Vec::new());
                if live_in.get(&block) != Some(&live) {
                    live_in.insert(block, live);
                    changed = true;
                }
            }
        }

        let mut dead = Vec::new();
        for &block in &postorder {
            let mut live = live_out(block, &live_in);
            transfer(block, &mut live, &mut dead);
        }
        dead.sort_by_key(|(_, span)| *span);
        dead.dedup();

        for (var, span) in dead {
            diagnostics.emit(
                Diagnostic::info(
                    DiagnosticCode::DeadStore,
                    format!("value assigned to `{}` is never read", cfg.variables[var].name),
                )
                .with_span(span)
                .with_suggestion("remove the assignment"),
            );
        }
    }
}
