//! Control-flow graphs of function bodies.
//!
//! A [`Cfg`] is built once per function definition. Each node is a basic
//! block of straight-line items; each item lists the local variables it
//! reads and writes, in evaluation order. Identifiers are resolved to
//! [`VarId`]s while building, so the dataflow passes never deal with scopes.
//! Globals are not tracked.

use std::collections::{HashMap, HashSet};

use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::{DfsPostOrder, Walker},
};

use prism_core::{
    Span,
    ast::{
        Block, Callee, Expr, ExprKind, FunctionDecl, ParamQualifier, Stage, Stmt,
        StmtKind, VariableDecl,
    },
};

use super::{builtins, constant};

/// Index into [`Cfg::variables`].
pub type VarId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(VarId),
    /// `whole` is false for writes through a member, swizzle or index.
    Write { var: VarId, whole: bool },
}

#[derive(Debug, Clone)]
pub enum ItemKind<'a> {
    Declare {
        var: VarId,
        init: Option<&'a Expr>,
    },
    Eval(&'a Expr),
}

#[derive(Debug, Clone)]
pub struct Item<'a> {
    pub kind: ItemKind<'a>,
    /// Accesses paired with the span of the identifier making them.
    pub accesses: Vec<(Access, Span)>,
}

#[derive(Debug, Clone, Default)]
pub struct BasicBlock<'a> {
    pub items: Vec<Item<'a>>,
}

#[derive(Debug, Clone)]
pub struct Variable<'a> {
    pub name: &'a str,
    pub span: Span,
    /// Set for function parameters.
    pub param: Option<ParamQualifier>,
}

/// A loop statement and the blocks that leave it early.
#[derive(Debug, Clone)]
pub struct LoopInfo {
    pub span: Span,
    /// False when the condition is missing or folds to `true`.
    pub conditional: bool,
    /// Blocks ending in a `break` out of this loop, or a `return`/`discard` inside it.
    pub exits: Vec<NodeIndex>,
}

#[derive(Debug)]
pub struct Cfg<'a> {
    pub graph: DiGraph<BasicBlock<'a>, ()>,
    pub entry: NodeIndex,
    /// The block that runs off the end of the body.
    pub fall_through: NodeIndex,
    pub variables: Vec<Variable<'a>>,
    pub loops: Vec<LoopInfo>,
    /// The block each statement starts in, keyed by statement span.
    statement_blocks: HashMap<Span, NodeIndex>,
    /// The variable each local identifier expression refers to.
    identifiers: HashMap<Span, VarId>,
}

impl<'a> Cfg<'a> {
    pub fn build(function: &'a FunctionDecl, body: &'a Block, signatures: &Signatures<'a>) -> Self {
        let mut graph = DiGraph::new();
        let entry = graph.add_node(BasicBlock::default());
        let exit = graph.add_node(BasicBlock::default());
        let mut builder = Builder {
            graph,
            current: entry,
            exit,
            scopes: vec![HashMap::new()],
            variables: Vec::new(),
            loops: Vec::new(),
            breakable: Vec::new(),
            statement_blocks: HashMap::new(),
            identifiers: HashMap::new(),
            signatures,
        };
        for param in &function.params {
            if let Some(name) = &param.name {
                builder.declare(name, name.span(), Some(param.qualifier));
            }
        }
        for stmt in &body.statements {
            builder.statement(stmt);
        }
        let fall_through = builder.current;
        builder.graph.add_edge(fall_through, exit, ());

        Cfg {
            graph: builder.graph,
            entry,
            fall_through,
            variables: builder.variables,
            loops: builder.loops,
            statement_blocks: builder.statement_blocks,
            identifiers: builder.identifiers,
        }
    }

    /// Blocks reachable from the entry, in postorder.
    pub fn postorder(&self) -> Vec<NodeIndex> {
        DfsPostOrder::new(&self.graph, self.entry)
            .iter(&self.graph)
            .collect()
    }

    pub fn reachable(&self) -> HashSet<NodeIndex> {
        self.postorder().into_iter().collect()
    }

    /// The block the statement with this span starts in.
    pub fn statement_block(&self, span: Span) -> Option<NodeIndex> {
        self.statement_blocks.get(&span).copied()
    }

    pub fn variable_at(&self, identifier: Span) -> Option<VarId> {
        self.identifiers.get(&identifier).copied()
    }

    pub fn predecessors(&self, block: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .neighbors_directed(block, petgraph::Direction::Incoming)
    }

    pub fn successors(&self, block: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(block)
    }

    pub fn items(&self, block: NodeIndex) -> &[Item<'a>] {
        &self.graph[block].items
    }
}

/// Which arguments of a call the callee writes.
pub struct Signatures<'a> {
    stages: Vec<&'a Stage>,
}

impl<'a> Signatures<'a> {
    pub fn new(stage: &'a Stage, common: Option<&'a Stage>) -> Self {
        Self {
            stages: std::iter::once(stage).chain(common).collect(),
        }
    }

    /// Written argument positions, each with whether the old value is read too.
    pub fn outputs(&self, name: &str, arity: usize) -> Vec<(usize, bool)> {
        let mut overloads = self.stages.iter().flat_map(|stage| stage.function(name)).peekable();
        if overloads.peek().is_some() {
            return overloads
                .find(|function| function.params.len() == arity)
                .map(|function| {
                    function
                        .params
                        .iter()
                        .enumerate()
                        .filter(|(_, param)| param.qualifier.writes())
                        .map(|(index, param)| (index, param.qualifier == ParamQualifier::InOut))
                        .collect()
                })
                .unwrap_or_default();
        }
        builtins::function(name)
            .map(|builtin| builtin.outputs.iter().map(|&index| (index, false)).collect())
            .unwrap_or_default()
    }
}

struct Breakable {
    break_target: NodeIndex,
    /// `None` for a `switch`, where `continue` belongs to the enclosing loop.
    continue_target: Option<NodeIndex>,
    loop_index: Option<usize>,
}

struct Builder<'a, 's> {
    graph: DiGraph<BasicBlock<'a>, ()>,
    current: NodeIndex,
    exit: NodeIndex,
    scopes: Vec<HashMap<&'a str, VarId>>,
    variables: Vec<Variable<'a>>,
    loops: Vec<LoopInfo>,
    breakable: Vec<Breakable>,
    statement_blocks: HashMap<Span, NodeIndex>,
    identifiers: HashMap<Span, VarId>,
    signatures: &'s Signatures<'a>,
}

fn always_true(condition: &Expr) -> bool {
    constant::folds_to_true(condition)
}

impl<'a> Builder<'a, '_> {
    fn new_block(&mut self) -> NodeIndex {
        self.graph.add_node(BasicBlock::default())
    }

    fn edge(&mut self, from: NodeIndex, to: NodeIndex) {
        self.graph.add_edge(from, to, ());
    }

    /// Continue in a fresh block with no predecessors.
    fn jump_away(&mut self) {
        self.current = self.new_block();
    }

    fn declare(&mut self, name: &'a str, span: Span, param: Option<ParamQualifier>) -> VarId {
        let id = self.variables.len();
        self.variables.push(Variable { name, span, param });
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, id);
        }
        id
    }

    fn resolve(&self, name: &str) -> Option<VarId> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }

    fn push(&mut self, item: Item<'a>) {
        self.graph[self.current].items.push(item);
    }

    fn eval(&mut self, expr: &'a Expr) {
        let mut accesses = Vec::new();
        self.accesses(expr, &mut accesses);
        self.push(Item {
            kind: ItemKind::Eval(expr),
            accesses,
        });
    }

    fn variable(&mut self, variable: &'a VariableDecl) {
        let mut accesses = Vec::new();
        if let Some(size) = &variable.array_size {
            self.accesses(size, &mut accesses);
        }
        if let Some(init) = &variable.initializer {
            self.accesses(init, &mut accesses);
        }
        let var = self.declare(variable.name.inner(), variable.name.span(), None);
        if variable.initializer.is_some() {
            accesses.push((Access::Write { var, whole: true }, variable.name.span()));
        }
        self.push(Item {
            kind: ItemKind::Declare {
                var,
                init: variable.initializer.as_ref(),
            },
            accesses,
        });
    }

    // =========================================================================
    // Accesses
    // =========================================================================

    fn read(&mut self, name: &str, span: Span, out: &mut Vec<(Access, Span)>) {
        if let Some(var) = self.resolve(name) {
            self.identifiers.insert(span, var);
            out.push((Access::Read(var), span));
        }
    }

    fn accesses(&mut self, expr: &'a Expr, out: &mut Vec<(Access, Span)>) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Identifier(name) => self.read(name, expr.span, out),
            ExprKind::Unary { op, operand } if op.is_update() => {
                self.store(operand, true, out);
            }
            ExprKind::Unary { operand, .. } => self.accesses(operand, out),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.accesses(lhs, out);
                self.accesses(rhs, out);
            }
            ExprKind::Assign { op, target, value } => {
                self.accesses(value, out);
                self.store(target, op.binary_op().is_some(), out);
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.accesses(condition, out);
                self.accesses(then_branch, out);
                self.accesses(else_branch, out);
            }
            ExprKind::Call { callee, args } => {
                let outputs = match callee.inner() {
                    Callee::Function(name) => self.signatures.outputs(name, args.len()),
                    Callee::Constructor(_) => Vec::new(),
                };
                for (index, arg) in args.iter().enumerate() {
                    match outputs.iter().find(|(position, _)| *position == index) {
                        Some(&(_, reads)) => self.store(arg, reads, out),
                        None => self.accesses(arg, out),
                    }
                }
            }
            ExprKind::Member { base, .. } => self.accesses(base, out),
            ExprKind::Index { base, index } => {
                self.accesses(base, out);
                self.accesses(index, out);
            }
            ExprKind::Sequence(exprs) => {
                for expr in exprs {
                    self.accesses(expr, out);
                }
            }
        }
    }

    /// Record a write to `target`, reading the old value first when `reads`.
    fn store(&mut self, target: &'a Expr, reads: bool, out: &mut Vec<(Access, Span)>) {
        match &target.kind {
            ExprKind::Identifier(name) => {
                if let Some(var) = self.resolve(name) {
                    self.identifiers.insert(target.span, var);
                    if reads {
                        out.push((Access::Read(var), target.span));
                    }
                    out.push((Access::Write { var, whole: true }, target.span));
                }
            }
            ExprKind::Member { .. } | ExprKind::Index { .. } => {
                let mut root = target;
                loop {
                    match &root.kind {
                        ExprKind::Member { base, .. } => root = base,
                        ExprKind::Index { base, index } => {
                            self.accesses(index, out);
                            root = base;
                        }
                        _ => break,
                    }
                }
                match &root.kind {
                    ExprKind::Identifier(name) => {
                        if let Some(var) = self.resolve(name) {
                            self.identifiers.insert(root.span, var);
                            if reads {
                                out.push((Access::Read(var), root.span));
                            }
                            out.push((Access::Write { var, whole: false }, root.span));
                        }
                    }
                    _ => self.accesses(root, out),
                }
            }
            _ => self.accesses(target, out),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn statement(&mut self, stmt: &'a Stmt) {
        self.statement_blocks.entry(stmt.span).or_insert(self.current);
        match &stmt.kind {
            StmtKind::Declaration { variables } => {
                for variable in variables {
                    self.variable(variable);
                }
            }
            StmtKind::Expression { expr } => self.eval(expr),
            StmtKind::Block { block } => {
                self.scopes.push(HashMap::new());
                for inner in &block.statements {
                    self.statement(inner);
                }
                self.scopes.pop();
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.eval(condition);
                let branch = self.current;
                let then_block = self.new_block();
                self.edge(branch, then_block);
                self.current = then_block;
                self.statement(then_branch);
                let then_end = self.current;

                let join = match else_branch {
                    Some(else_branch) => {
                        let else_block = self.new_block();
                        self.edge(branch, else_block);
                        self.current = else_block;
                        self.statement(else_branch);
                        let else_end = self.current;
                        let join = self.new_block();
                        self.edge(else_end, join);
                        join
                    }
                    None => {
                        let join = self.new_block();
                        self.edge(branch, join);
                        join
                    }
                };
                self.edge(then_end, join);
                self.current = join;
            }
            StmtKind::While { condition, body } => {
                let header = self.new_block();
                self.edge(self.current, header);
                self.current = header;
                self.eval(condition);
                let body_block = self.new_block();
                let after = self.new_block();
                self.edge(header, body_block);
                let conditional = !always_true(condition);
                if conditional {
                    self.edge(header, after);
                }
                self.loop_body(stmt.span, conditional, body, body_block, header, after);
                self.edge(self.current, header);
                self.current = after;
            }
            StmtKind::DoWhile { body, condition } => {
                let body_block = self.new_block();
                self.edge(self.current, body_block);
                let check = self.new_block();
                let after = self.new_block();
                let conditional = !always_true(condition);
                self.loop_body(stmt.span, conditional, body, body_block, check, after);
                self.edge(self.current, check);
                self.current = check;
                self.eval(condition);
                self.edge(check, body_block);
                if conditional {
                    self.edge(check, after);
                }
                self.current = after;
            }
            StmtKind::For {
                init,
                condition,
                step,
                body,
            } => {
                self.scopes.push(HashMap::new());
                if let Some(init) = init {
                    self.statement(init);
                }
                let header = self.new_block();
                self.edge(self.current, header);
                self.current = header;
                if let Some(condition) = condition {
                    self.eval(condition);
                }
                let body_block = self.new_block();
                let step_block = self.new_block();
                let after = self.new_block();
                self.edge(header, body_block);
                let conditional = condition.as_ref().is_some_and(|c| !always_true(c));
                if conditional {
                    self.edge(header, after);
                }
                self.loop_body(stmt.span, conditional, body, body_block, step_block, after);
                self.edge(self.current, step_block);
                self.current = step_block;
                if let Some(step) = step {
                    self.eval(step);
                }
                self.edge(step_block, header);
                self.current = after;
                self.scopes.pop();
            }
            StmtKind::Switch { selector, cases } => {
                self.eval(selector);
                let dispatch = self.current;
                let after = self.new_block();
                self.breakable.push(Breakable {
                    break_target: after,
                    continue_target: None,
                    loop_index: None,
                });
                self.scopes.push(HashMap::new());

                let mut previous_end = None;
                let mut has_default = false;
                for case in cases {
                    let case_block = self.new_block();
                    self.edge(dispatch, case_block);
                    if let Some(previous) = previous_end {
                        self.edge(previous, case_block);
                    }
                    has_default |= case.label.is_none();
                    self.current = case_block;
                    for inner in &case.body {
                        self.statement(inner);
                    }
                    previous_end = Some(self.current);
                }
                if let Some(previous) = previous_end {
                    self.edge(previous, after);
                }
                if !has_default {
                    self.edge(dispatch, after);
                }

                self.scopes.pop();
                self.breakable.pop();
                self.current = after;
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.eval(value);
                }
                self.leave_function();
            }
            StmtKind::Discard => self.leave_function(),
            StmtKind::Break => {
                if let Some(target) = self.breakable.last() {
                    let (to, loop_index) = (target.break_target, target.loop_index);
                    self.edge(self.current, to);
                    if let Some(index) = loop_index {
                        self.loops[index].exits.push(self.current);
                    }
                }
                self.jump_away();
            }
            StmtKind::Continue => {
                let target = self.breakable.iter().rev().find_map(|b| b.continue_target);
                if let Some(target) = target {
                    self.edge(self.current, target);
                }
                self.jump_away();
            }
            StmtKind::Empty | StmtKind::Unparsed(_) => {}
        }
    }

    fn loop_body(
        &mut self,
        span: Span,
        conditional: bool,
        body: &'a Stmt,
        body_block: NodeIndex,
        continue_target: NodeIndex,
        after: NodeIndex,
    ) {
        let loop_index = self.loops.len();
        self.loops.push(LoopInfo {
            span,
            conditional,
            exits: Vec::new(),
        });
        self.breakable.push(Breakable {
            break_target: after,
            continue_target: Some(continue_target),
            loop_index: Some(loop_index),
        });
        self.current = body_block;
        self.statement(body);
        self.breakable.pop();
    }

    /// `return` or `discard`: every enclosing loop is left too.
    fn leave_function(&mut self) {
        let current = self.current;
        self.edge(current, self.exit);
        let enclosing: Vec<usize> = self.breakable.iter().filter_map(|b| b.loop_index).collect();
        for index in enclosing {
            self.loops[index].exits.push(current);
        }
        self.jump_away();
    }
}

#[cfg(test)]
mod tests {
    use prism_core::{ShaderFormat, ast::Program};
    use prism_parser::{ParseOptions, parser_for};

    use super::*;

    fn program(body: &str) -> Program {
        let source = format!("void f(float p) {{ {body} }}\nvoid main() {{}}");
        parser_for(ShaderFormat::CoreLanguage)
            .parse(&source, &ParseOptions::default())
            .program
    }

    fn with_cfg(body: &str, check: impl FnOnce(&Cfg<'_>)) {
        let program = program(body);
        let stage = &program.stages[0];
        let function = stage.function("f").next().unwrap();
        let signatures = Signatures::new(stage, None);
        let cfg = Cfg::build(function, function.body.as_ref().unwrap(), &signatures);
        check(&cfg);
    }

    #[test]
    fn test_straight_line_falls_through() {
        with_cfg("float x = p; x += 1.0;", |cfg| {
            assert!(cfg.reachable().contains(&cfg.fall_through));
            assert_eq!(cfg.variables.len(), 2);
            let accesses: Vec<_> = cfg.items(cfg.entry).iter().flat_map(|i| &i.accesses).map(|a| a.0).collect();
            assert_eq!(
                accesses,
                [
                    Access::Read(0),
                    Access::Write { var: 1, whole: true },
                    Access::Read(1),
                    Access::Write { var: 1, whole: true },
                ]
            );
        });
    }

    #[test]
    fn test_return_cuts_off_fall_through() {
        with_cfg("if (p > 0.0) { return; } else { return; }", |cfg| {
            assert!(!cfg.reachable().contains(&cfg.fall_through));
        });
    }

    #[test]
    fn test_constant_true_loop_without_break() {
        with_cfg("while (true) { p += 1.0; }", |cfg| {
            assert_eq!(cfg.loops.len(), 1);
            assert!(!cfg.loops[0].conditional);
            assert!(cfg.loops[0].exits.is_empty());
            assert!(!cfg.reachable().contains(&cfg.fall_through));
        });
    }

    #[test]
    fn test_break_in_switch_does_not_leave_loop() {
        with_cfg("for (;;) { switch (1) { case 1: break; } }", |cfg| {
            assert!(cfg.loops[0].exits.is_empty());
        });
    }

    #[test]
    fn test_partial_write() {
        with_cfg("vec3 v; v.x = 1.0;", |cfg| {
            let accesses: Vec<_> = cfg.items(cfg.entry).iter().flat_map(|i| &i.accesses).map(|a| a.0).collect();
            assert_eq!(accesses, [Access::Write { var: 1, whole: false }]);
        });
    }

    #[test]
    fn test_out_argument_is_written() {
        with_cfg("float whole; float fraction = modf(p, whole);", |cfg| {
            let accesses: Vec<_> = cfg.items(cfg.entry).iter().flat_map(|i| &i.accesses).map(|a| a.0).collect();
            assert_eq!(
                accesses,
                [
                    Access::Read(0),
                    Access::Write { var: 1, whole: true },
                    Access::Write { var: 2, whole: true },
                ]
            );
        });
    }
}
