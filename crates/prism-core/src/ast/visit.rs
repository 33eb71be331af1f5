//! Read-only traversal of the program representation.
//!
//! Default method implementations walk into every child, so an implementor
//! overrides only the nodes it cares about and calls the matching `walk_*`
//! function when it still wants the children visited. Placeholder regions
//! left by error recovery are routed to [`Visitor::visit_unparsed`], which
//! does nothing by default.

use crate::ast::{
    Block, Declaration, DeclarationKind, Expr, ExprKind, FunctionDecl, Program, Stage, Stmt,
    StmtKind, UnparsedRegion, VariableDecl,
};

/// Visitor trait for traversing/analyzing AST nodes.
pub trait Visitor {
    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }

    fn visit_stage(&mut self, stage: &Stage) {
        walk_stage(self, stage);
    }

    fn visit_declaration(&mut self, declaration: &Declaration) {
        walk_declaration(self, declaration);
    }

    fn visit_variable(&mut self, variable: &VariableDecl) {
        walk_variable(self, variable);
    }

    fn visit_function(&mut self, function: &FunctionDecl) {
        walk_function(self, function);
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    /// Regions the parser could not understand. Skipped silently.
    fn visit_unparsed(&mut self, _region: &UnparsedRegion) {}
}

pub fn walk_program<V: Visitor + ?Sized>(visitor: &mut V, program: &Program) {
    for stage in &program.stages {
        visitor.visit_stage(stage);
    }
}

pub fn walk_stage<V: Visitor + ?Sized>(visitor: &mut V, stage: &Stage) {
    for declaration in &stage.declarations {
        visitor.visit_declaration(declaration);
    }
}

pub fn walk_declaration<V: Visitor + ?Sized>(visitor: &mut V, declaration: &Declaration) {
    match &declaration.kind {
        DeclarationKind::Variable(variable) => visitor.visit_variable(variable),
        DeclarationKind::Function(function) => visitor.visit_function(function),
        DeclarationKind::Unparsed(region) => visitor.visit_unparsed(region),
        DeclarationKind::Struct(_)
        | DeclarationKind::InterfaceBlock(_)
        | DeclarationKind::Precision(_) => {}
    }
}

pub fn walk_variable<V: Visitor + ?Sized>(visitor: &mut V, variable: &VariableDecl) {
    if let Some(size) = &variable.array_size {
        visitor.visit_expr(size);
    }
    if let Some(init) = &variable.initializer {
        visitor.visit_expr(init);
    }
}

pub fn walk_function<V: Visitor + ?Sized>(visitor: &mut V, function: &FunctionDecl) {
    if let Some(body) = &function.body {
        visitor.visit_block(body);
    }
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &Block) {
    for stmt in &block.statements {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Declaration { variables } => {
            for variable in variables {
                visitor.visit_variable(variable);
            }
        }
        StmtKind::Expression { expr } => visitor.visit_expr(expr),
        StmtKind::Block { block } => visitor.visit_block(block),
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(condition);
            visitor.visit_stmt(then_branch);
            if let Some(else_branch) = else_branch {
                visitor.visit_stmt(else_branch);
            }
        }
        StmtKind::For {
            init,
            condition,
            step,
            body,
        } => {
            if let Some(init) = init {
                visitor.visit_stmt(init);
            }
            if let Some(condition) = condition {
                visitor.visit_expr(condition);
            }
            if let Some(step) = step {
                visitor.visit_expr(step);
            }
            visitor.visit_stmt(body);
        }
        StmtKind::While { condition, body } => {
            visitor.visit_expr(condition);
            visitor.visit_stmt(body);
        }
        StmtKind::DoWhile { body, condition } => {
            visitor.visit_stmt(body);
            visitor.visit_expr(condition);
        }
        StmtKind::Switch { selector, cases } => {
            visitor.visit_expr(selector);
            for case in cases {
                if let Some(label) = &case.label {
                    visitor.visit_expr(label);
                }
                for stmt in &case.body {
                    visitor.visit_stmt(stmt);
                }
            }
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        StmtKind::Unparsed(region) => visitor.visit_unparsed(region),
        StmtKind::Break | StmtKind::Continue | StmtKind::Discard | StmtKind::Empty => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Identifier(_) => {}
        ExprKind::Unary { operand, .. } => visitor.visit_expr(operand),
        ExprKind::Binary { lhs, rhs, .. } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        ExprKind::Assign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        ExprKind::Ternary {
            condition,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(condition);
            visitor.visit_expr(then_branch);
            visitor.visit_expr(else_branch);
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::Member { base, .. } => visitor.visit_expr(base),
        ExprKind::Index { base, index } => {
            visitor.visit_expr(base);
            visitor.visit_expr(index);
        }
        ExprKind::Sequence(exprs) => {
            for expr in exprs {
                visitor.visit_expr(expr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::Literal, span::LineIndex};

    struct Counter {
        exprs: usize,
        unparsed: usize,
    }

    impl Visitor for Counter {
        fn visit_expr(&mut self, expr: &Expr) {
            self.exprs += 1;
            walk_expr(self, expr);
        }

        fn visit_unparsed(&mut self, _region: &UnparsedRegion) {
            self.unparsed += 1;
        }
    }

    #[test]
    fn test_visitor_walks_statements_and_skips_unparsed() {
        let index = LineIndex::new("{ 1 + 2; ??? }");
        let one = Expr::new(ExprKind::Literal(Literal::Int(1)), index.span(2..3));
        let two = Expr::new(ExprKind::Literal(Literal::Int(2)), index.span(6..7));
        let sum = Expr::new(
            ExprKind::Binary {
                op: crate::ast::BinaryOp::Add,
                lhs: Box::new(one),
                rhs: Box::new(two),
            },
            index.span(2..7),
        );
        let block = Block {
            statements: vec![
                Stmt::new(StmtKind::Expression { expr: sum }, index.span(2..8)),
                Stmt::new(
                    StmtKind::Unparsed(UnparsedRegion {
                        span: index.span(9..12),
                    }),
                    index.span(9..12),
                ),
            ],
            span: index.span(0..14),
        };

        let mut counter = Counter {
            exprs: 0,
            unparsed: 0,
        };
        counter.visit_block(&block);

        assert_eq!(counter.exprs, 3);
        assert_eq!(counter.unparsed, 1);
    }
}
