//! Constant propagation over a [`Cfg`].
//!
//! Each local holds a [`Value`] per program point. The lattice is flat:
//! `Undefined` below every constant, `Varying` above them all, and two
//! different constants meet at `Varying`. Consumers are the check for
//! divisors that are provably zero and the loop builder, which folds loop
//! conditions to find loops that can never end.

use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;

use prism_core::{
    Span,
    ast::{BinaryOp, Callee, Expr, ExprKind, Literal, Stage, Type, UnaryOp},
};

use super::cfg::{Access, Cfg, Item, ItemKind, VarId};

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Bool(bool),
    Vector(Vec<f64>),
}

impl Constant {
    fn is_zero(&self) -> bool {
        match self {
            Constant::Int(value) => *value == 0,
            Constant::Float(value) => *value == 0.0,
            Constant::Vector(values) => values.iter().all(|value| *value == 0.0),
            Constant::Bool(_) => false,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Constant::Int(value) => Some(*value as f64),
            Constant::Float(value) => Some(*value),
            _ => None,
        }
    }

    fn components(&self) -> Option<Vec<f64>> {
        match self {
            Constant::Vector(values) => Some(values.clone()),
            other => other.as_float().map(|value| vec![value]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Known(Constant),
    Varying,
}

impl Value {
    pub fn meet(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Undefined, value) | (value, Value::Undefined) => value.clone(),
            (Value::Known(a), Value::Known(b)) if a == b => Value::Known(a.clone()),
            _ => Value::Varying,
        }
    }

    fn known(&self) -> Option<&Constant> {
        match self {
            Value::Known(constant) => Some(constant),
            _ => None,
        }
    }
}

/// Values of `const` globals with constant initializers, by name.
pub type Globals<'a> = HashMap<&'a str, Constant>;

/// Fold the stage's `const` globals, recording zero divisors in their initializers.
pub fn global_constants<'a>(stages: &[&'a Stage], zero_divisors: &mut Vec<Span>) -> Globals<'a> {
    let mut globals = Globals::new();
    for &stage in stages {
        for variable in stage.globals() {
            let Some(init) = &variable.initializer else {
                continue;
            };
            let mut evaluator = Evaluator {
                cfg: None,
                globals: &globals,
                env: &mut [],
                item: None,
                zero_divisors: &mut *zero_divisors,
            };
            let value = evaluator.eval(init);
            if variable.is_const()
                && let Value::Known(constant) = value
            {
                globals.insert(variable.name.inner().as_str(), constant);
            }
        }
    }
    globals
}

/// Whether `condition` folds to `true` from literals alone.
pub fn folds_to_true(condition: &Expr) -> bool {
    let globals = Globals::new();
    let mut zero_divisors = Vec::new();
    let mut evaluator = Evaluator {
        cfg: None,
        globals: &globals,
        env: &mut [],
        item: None,
        zero_divisors: &mut zero_divisors,
    };
    evaluator.eval(condition) == Value::Known(Constant::Bool(true))
}

/// Divisor expressions that are zero on every path reaching them.
pub fn zero_divisors(cfg: &Cfg<'_>, globals: &Globals<'_>) -> Vec<Span> {
    let postorder = cfg.postorder();
    let order: Vec<_> = postorder.iter().rev().copied().collect();
    let reachable: HashSet<_> = postorder.iter().copied().collect();

    let mut initial = vec![Value::Undefined; cfg.variables.len()];
    for (id, variable) in cfg.variables.iter().enumerate() {
        if variable.param.is_some() {
            initial[id] = Value::Varying;
        }
    }

    let mut outputs: HashMap<_, Vec<Value>> = HashMap::new();
    let mut scratch = Vec::new();
    let mut changed = true;
    while changed {
        changed = false;
        for &block in &order {
            let mut env = entry_state(cfg, block, &initial, &outputs, &reachable);
            for item in cfg.items(block) {
                transfer(cfg, globals, item, &mut env, &mut scratch);
            }
            if outputs.get(&block) != Some(&env) {
                outputs.insert(block, env);
                changed = true;
            }
        }
    }

    let mut found = Vec::new();
    for &block in &order {
        let mut env = entry_state(cfg, block, &initial, &outputs, &reachable);
        for item in cfg.items(block) {
            transfer(cfg, globals, item, &mut env, &mut found);
        }
    }
    let mut seen = HashSet::new();
    found.retain(|span| seen.insert(*span));
    found
}

fn entry_state(
    cfg: &Cfg<'_>,
    block: NodeIndex,
    initial: &[Value],
    outputs: &HashMap<NodeIndex, Vec<Value>>,
    reachable: &HashSet<NodeIndex>,
) -> Vec<Value> {
    if block == cfg.entry {
        return initial.to_vec();
    }
    let mut env = vec![Value::Undefined; initial.len()];
    for predecessor in cfg.predecessors(block).filter(|p| reachable.contains(p)) {
        if let Some(out) = outputs.get(&predecessor) {
            for (slot, value) in env.iter_mut().zip(out) {
                *slot = slot.meet(value);
            }
        }
    }
    env
}

fn transfer(cfg: &Cfg<'_>, globals: &Globals<'_>, item: &Item<'_>, env: &mut [Value], zero_divisors: &mut Vec<Span>) {
    let mut evaluator = Evaluator {
        cfg: Some(cfg),
        globals,
        env,
        item: Some(item),
        zero_divisors,
    };
    match &item.kind {
        ItemKind::Declare { var, init } => {
            let value = init.map_or(Value::Undefined, |init| evaluator.eval(init));
            evaluator.env[*var] = value;
        }
        ItemKind::Eval(expr) => {
            evaluator.eval(expr);
        }
    }
}

struct Evaluator<'c, 'e> {
    cfg: Option<&'c Cfg<'c>>,
    globals: &'c Globals<'c>,
    env: &'e mut [Value],
    item: Option<&'c Item<'c>>,
    zero_divisors: &'e mut Vec<Span>,
}

impl Evaluator<'_, '_> {
    fn var(&self, identifier: Span) -> Option<VarId> {
        self.cfg.and_then(|cfg| cfg.variable_at(identifier))
    }

    fn lookup(&self, name: &str, span: Span) -> Value {
        match self.var(span) {
            Some(var) => self.env[var].clone(),
            None => self
                .globals
                .get(name)
                .map_or(Value::Varying, |constant| Value::Known(constant.clone())),
        }
    }

    fn assign(&mut self, target: &Expr, value: Value) {
        match &target.kind {
            ExprKind::Identifier(_) => {
                if let Some(var) = self.var(target.span) {
                    self.env[var] = value;
                }
            }
            ExprKind::Member { base, .. } | ExprKind::Index { base, .. } => {
                self.assign(base, Value::Varying);
            }
            _ => {}
        }
    }

    fn check_divisor(&mut self, op: BinaryOp, divisor: &Value, span: Span) {
        if matches!(op, BinaryOp::Div | BinaryOp::Rem) && divisor.known().is_some_and(Constant::is_zero) {
            self.zero_divisors.push(span);
        }
    }

    fn eval(&mut self, expr: &Expr) -> Value {
        match &expr.kind {
            ExprKind::Literal(literal) => Value::Known(match *literal {
                Literal::Int(value) => Constant::Int(value),
                Literal::Uint(value) => i64::try_from(value).map_or(Constant::Float(value as f64), Constant::Int),
                Literal::Float(value) => Constant::Float(value),
                Literal::Bool(value) => Constant::Bool(value),
            }),
            ExprKind::Identifier(name) => self.lookup(name, expr.span),
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand);
                match (op, value.known()) {
                    (UnaryOp::Plus, _) => value.clone(),
                    (UnaryOp::Neg, Some(Constant::Int(v))) => Value::Known(Constant::Int(v.wrapping_neg())),
                    (UnaryOp::Neg, Some(Constant::Float(v))) => Value::Known(Constant::Float(-v)),
                    (UnaryOp::Neg, Some(Constant::Vector(vs))) => {
                        Value::Known(Constant::Vector(vs.iter().map(|v| -v).collect()))
                    }
                    (UnaryOp::Not, Some(Constant::Bool(v))) => Value::Known(Constant::Bool(!v)),
                    (UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec, Some(constant)) => {
                        let delta = Constant::Int(1);
                        let binary = if matches!(op, UnaryOp::PreInc | UnaryOp::PostInc) {
                            BinaryOp::Add
                        } else {
                            BinaryOp::Sub
                        };
                        let updated = fold(binary, constant, &delta).map_or(Value::Varying, Value::Known);
                        self.assign(operand, updated.clone());
                        if matches!(op, UnaryOp::PreInc | UnaryOp::PreDec) {
                            updated
                        } else {
                            value.clone()
                        }
                    }
                    _ if op.is_update() => {
                        self.assign(operand, Value::Varying);
                        Value::Varying
                    }
                    _ if value == Value::Undefined => Value::Undefined,
                    _ => Value::Varying,
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs);
                let r = self.eval(rhs);
                self.check_divisor(*op, &r, rhs.span);
                combine(*op, &l, &r)
            }
            ExprKind::Assign { op, target, value: operand } => {
                let value = self.eval(operand);
                let result = match op.binary_op() {
                    None => value,
                    Some(binary) => {
                        self.check_divisor(binary, &value, operand.span);
                        let old = self.eval_target(target);
                        combine(binary, &old, &value)
                    }
                };
                self.assign(target, result.clone());
                result
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.eval(condition);
                let then_value = self.eval(then_branch);
                let else_value = self.eval(else_branch);
                match condition.known() {
                    Some(Constant::Bool(true)) => then_value,
                    Some(Constant::Bool(false)) => else_value,
                    _ if then_value == else_value => then_value,
                    _ => Value::Varying,
                }
            }
            ExprKind::Call { callee, args } => {
                let values: Vec<Value> = args.iter().map(|arg| self.eval(arg)).collect();
                self.clobber_outputs(args);
                match callee.inner() {
                    Callee::Constructor(ty) => construct(ty, &values),
                    Callee::Function(_) => Value::Varying,
                }
            }
            ExprKind::Member { base, .. } => {
                self.eval(base);
                Value::Varying
            }
            ExprKind::Index { base, index } => {
                self.eval(base);
                self.eval(index);
                Value::Varying
            }
            ExprKind::Sequence(exprs) => exprs
                .iter()
                .map(|expr| self.eval(expr))
                .last()
                .unwrap_or(Value::Varying),
        }
    }

    /// The current value of an assignment target, without re-checking divisors.
    fn eval_target(&mut self, target: &Expr) -> Value {
        match &target.kind {
            ExprKind::Identifier(name) => self.lookup(name, target.span),
            _ => Value::Varying,
        }
    }

    /// Arguments bound to `out`/`inout` parameters take unknown values.
    fn clobber_outputs(&mut self, args: &[Expr]) {
        let Some(item) = self.item else {
            return;
        };
        for arg in args {
            let written = item
                .accesses
                .iter()
                .any(|(access, span)| matches!(access, Access::Write { .. }) && *span == arg.span);
            if written {
                self.assign(arg, Value::Varying);
            }
        }
    }
}

fn combine(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match (l, r) {
        (Value::Known(a), Value::Known(b)) => fold(op, a, b).map_or(Value::Varying, Value::Known),
        (Value::Undefined, _) | (_, Value::Undefined) => Value::Undefined,
        _ => Value::Varying,
    }
}

fn fold(op: BinaryOp, a: &Constant, b: &Constant) -> Option<Constant> {
    use Constant::*;
    match (a, b) {
        (Int(x), Int(y)) => match op {
            BinaryOp::Add => Some(Int(x.wrapping_add(*y))),
            BinaryOp::Sub => Some(Int(x.wrapping_sub(*y))),
            BinaryOp::Mul => Some(Int(x.wrapping_mul(*y))),
            BinaryOp::Div => x.checked_div(*y).map(Int),
            BinaryOp::Rem => x.checked_rem(*y).map(Int),
            BinaryOp::BitAnd => Some(Int(x & y)),
            BinaryOp::BitOr => Some(Int(x | y)),
            BinaryOp::BitXor => Some(Int(x ^ y)),
            _ => compare(op, *x as f64, *y as f64).map(Bool),
        },
        (Bool(x), Bool(y)) => match op {
            BinaryOp::And => Some(Bool(*x && *y)),
            BinaryOp::Or => Some(Bool(*x || *y)),
            BinaryOp::Xor | BinaryOp::Ne => Some(Bool(x != y)),
            BinaryOp::Eq => Some(Bool(x == y)),
            _ => None,
        },
        (Vector(_), _) | (_, Vector(_)) => {
            let (xs, ys) = (a.components()?, b.components()?);
            let len = xs.len().max(ys.len());
            if (xs.len() != 1 && xs.len() != len) || (ys.len() != 1 && ys.len() != len) {
                return None;
            }
            let at = |values: &[f64], i: usize| if values.len() == 1 { values[0] } else { values[i] };
            (0..len)
                .map(|i| arithmetic(op, at(&xs, i), at(&ys, i)))
                .collect::<Option<Vec<f64>>>()
                .map(Vector)
        }
        _ => {
            let (x, y) = (a.as_float()?, b.as_float()?);
            arithmetic(op, x, y)
                .map(Float)
                .or_else(|| compare(op, x, y).map(Bool))
        }
    }
}

/// Non-finite results are not tracked.
fn arithmetic(op: BinaryOp, x: f64, y: f64) -> Option<f64> {
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div if y != 0.0 => x / y,
        _ => return None,
    };
    result.is_finite().then_some(result)
}

fn compare(op: BinaryOp, x: f64, y: f64) -> Option<bool> {
    match op {
        BinaryOp::Lt => Some(x < y),
        BinaryOp::Gt => Some(x > y),
        BinaryOp::Le => Some(x <= y),
        BinaryOp::Ge => Some(x >= y),
        BinaryOp::Eq => Some(x == y),
        BinaryOp::Ne => Some(x != y),
        _ => None,
    }
}

fn construct(ty: &Type, values: &[Value]) -> Value {
    if values.iter().any(|value| *value == Value::Undefined) {
        return Value::Undefined;
    }
    let constants: Option<Vec<&Constant>> = values.iter().map(Value::known).collect();
    let Some(constants) = constants else {
        return Value::Varying;
    };
    match ty {
        Type::Scalar(kind) => match constants.as_slice() {
            [single] => {
                let Some(value) = single.as_float() else {
                    return Value::Varying;
                };
                if kind.is_integer() {
                    Value::Known(Constant::Int(value as i64))
                } else if kind.is_numeric() {
                    Value::Known(Constant::Float(value))
                } else {
                    Value::Known(Constant::Bool(value != 0.0))
                }
            }
            _ => Value::Varying,
        },
        Type::Vector(kind, size) if kind.is_numeric() => {
            let size = usize::from(*size);
            let components: Option<Vec<f64>> = constants
                .iter()
                .map(|constant| constant.components())
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.concat());
            match components {
                Some(values) if values.len() == 1 => Value::Known(Constant::Vector(vec![values[0]; size])),
                Some(mut values) if values.len() >= size => {
                    values.truncate(size);
                    Value::Known(Constant::Vector(values))
                }
                _ => Value::Varying,
            }
        }
        _ => Value::Varying,
    }
}
