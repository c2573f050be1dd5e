//! Constant folding and scope-aware constant propagation.
//!
//! Tracks, per scope, which plain-name bindings are known to hold a literal
//! value, substitutes those literals at read sites, and folds operators over
//! literal operands.
//!
//! ```lua
//! -- Before:
//! local speed = 4
//! x = x + speed * 2
//!
//! -- After:
//! local speed = 4
//! x = x + 8
//! ```
//!
//! Propagation is invalidated wherever the binding may change behind the
//! map's back: loop-carried writes, writes from any `if` clause, function
//! boundaries (fresh map), and self-updates like `x = x + 1`.

use crate::ast::expression::{BinaryOp, Expression, ExpressionKind, Literal, TableField, UnaryOp};
use crate::ast::statement::Statement;
use crate::ast::{Block, Chunk};
use crate::optimizer::scope::{
    collect_block_writes, collect_expression_reads, collect_statement_writes,
};
use crate::optimizer::Pass;
use rustc_hash::{FxHashMap, FxHashSet};

type ConstMap = FxHashMap<String, Literal>;

pub struct ConstantFoldingPass {
    changed: bool,
}

impl ConstantFoldingPass {
    pub fn new() -> Self {
        ConstantFoldingPass { changed: false }
    }
}

impl Default for ConstantFoldingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for ConstantFoldingPass {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn run(&mut self, chunk: &mut Chunk) -> bool {
        self.changed = false;
        let mut map = ConstMap::default();
        self.simplify_block(&mut chunk.block, &mut map);
        self.changed
    }
}

impl ConstantFoldingPass {
    fn simplify_block(&mut self, block: &mut Block, map: &mut ConstMap) {
        for stmt in &mut block.statements {
            self.simplify_statement(stmt, map);
        }
    }

    fn simplify_statement(&mut self, stmt: &mut Statement, map: &mut ConstMap) {
        match stmt {
            Statement::LocalDecl(decl) => {
                let declared: FxHashSet<String> =
                    decl.names.iter().map(|n| n.node.clone()).collect();

                // A self-referencing initializer is simplified against a map
                // copy with the declared names removed, and disables
                // recording entirely.
                let mut self_ref = false;
                for init in &mut decl.initializers {
                    let mut reads = FxHashSet::default();
                    collect_expression_reads(init, &mut reads);
                    if reads.iter().any(|r| declared.contains(r)) {
                        self_ref = true;
                        let mut reduced = map.clone();
                        for name in &declared {
                            reduced.remove(name);
                        }
                        self.simplify_expression(init, &reduced);
                    } else {
                        self.simplify_expression(init, map);
                    }
                }

                let single = decl.names.len() == 1 && decl.initializers.len() == 1;
                let tail_is_multi = decl
                    .initializers
                    .last()
                    .map(is_multi_value)
                    .unwrap_or(false);

                for (i, name) in decl.names.iter().enumerate() {
                    if i < decl.initializers.len() {
                        match &decl.initializers[i].kind {
                            ExpressionKind::Literal(lit) if single && !self_ref => {
                                map.insert(name.node.clone(), lit.clone());
                            }
                            _ => {
                                map.remove(&name.node);
                            }
                        }
                    } else if tail_is_multi {
                        // The trailing call/vararg may supply this name.
                        map.remove(&name.node);
                    } else {
                        map.insert(name.node.clone(), Literal::Nil);
                    }
                }
            }
            Statement::Assign(assign) => {
                let assigned: FxHashSet<String> = assign
                    .targets
                    .iter()
                    .filter_map(|t| match &t.kind {
                        ExpressionKind::Identifier(name) => Some(name.clone()),
                        _ => None,
                    })
                    .collect();

                for target in &mut assign.targets {
                    match &mut target.kind {
                        ExpressionKind::Identifier(_) => {}
                        ExpressionKind::Member(base, _) => self.simplify_expression(base, map),
                        ExpressionKind::Index(base, index) => {
                            self.simplify_expression(base, map);
                            self.simplify_expression(index, map);
                        }
                        _ => {}
                    }
                }

                let mut self_ref = false;
                for value in &mut assign.values {
                    let mut reads = FxHashSet::default();
                    collect_expression_reads(value, &mut reads);
                    if reads.iter().any(|r| assigned.contains(r)) {
                        self_ref = true;
                        let mut reduced = map.clone();
                        for name in &assigned {
                            reduced.remove(name);
                        }
                        self.simplify_expression(value, &reduced);
                    } else {
                        self.simplify_expression(value, map);
                    }
                }

                let single = assign.targets.len() == 1 && assign.values.len() == 1;
                for target in &assign.targets {
                    if let ExpressionKind::Identifier(name) = &target.kind {
                        match &assign.values[0].kind {
                            ExpressionKind::Literal(lit) if single && !self_ref => {
                                map.insert(name.clone(), lit.clone());
                            }
                            _ => {
                                map.remove(name);
                            }
                        }
                    }
                }
            }
            Statement::Call(expr) => self.simplify_expression(expr, map),
            Statement::Return(ret) => {
                for value in &mut ret.values {
                    self.simplify_expression(value, map);
                }
            }
            Statement::Break(_) => {}
            Statement::If(if_stmt) => {
                let mut written = FxHashSet::default();
                for clause in &if_stmt.clauses {
                    collect_block_writes(&clause.block, &mut written);
                }
                if let Some(else_block) = &if_stmt.else_block {
                    collect_block_writes(else_block, &mut written);
                }

                for clause in &mut if_stmt.clauses {
                    self.simplify_expression(&mut clause.condition, map);
                    let mut clause_map = map.clone();
                    self.simplify_block(&mut clause.block, &mut clause_map);
                }
                if let Some(else_block) = &mut if_stmt.else_block {
                    let mut clause_map = map.clone();
                    self.simplify_block(else_block, &mut clause_map);
                }

                for name in &written {
                    map.remove(name);
                }
            }
            Statement::While(_) | Statement::Repeat(_) => self.simplify_loop(stmt, map),
            Statement::ForNumeric(for_stmt) => {
                // Header expressions evaluate once, before the loop.
                self.simplify_expression(&mut for_stmt.start, map);
                self.simplify_expression(&mut for_stmt.end, map);
                if let Some(step) = &mut for_stmt.step {
                    self.simplify_expression(step, map);
                }

                let mut written = FxHashSet::default();
                written.insert(for_stmt.variable.node.clone());
                collect_block_writes(&for_stmt.body, &mut written);
                for name in &written {
                    map.remove(name);
                }
                let mut body_map = map.clone();
                self.simplify_block(&mut for_stmt.body, &mut body_map);
                for name in &written {
                    map.remove(name);
                }
            }
            Statement::ForGeneric(for_stmt) => {
                for iterator in &mut for_stmt.iterators {
                    self.simplify_expression(iterator, map);
                }

                let mut written = FxHashSet::default();
                for variable in &for_stmt.variables {
                    written.insert(variable.node.clone());
                }
                collect_block_writes(&for_stmt.body, &mut written);
                for name in &written {
                    map.remove(name);
                }
                let mut body_map = map.clone();
                self.simplify_block(&mut for_stmt.body, &mut body_map);
                for name in &written {
                    map.remove(name);
                }
            }
            Statement::FunctionDecl(decl) => {
                if let Some(name) = decl.simple_name() {
                    let name = name.to_string();
                    map.remove(&name);
                }
                // No propagation across a function boundary.
                let mut fresh = ConstMap::default();
                self.simplify_block(&mut decl.body.body, &mut fresh);
            }
            Statement::Do(do_stmt) => {
                let mut written = FxHashSet::default();
                collect_block_writes(&do_stmt.body, &mut written);
                let mut body_map = map.clone();
                self.simplify_block(&mut do_stmt.body, &mut body_map);
                for name in &written {
                    map.remove(name);
                }
            }
        }
    }

    /// `while` and `repeat` share the loop rule: every name the loop may
    /// write is invalidated before and after, and the condition is
    /// simplified against an empty map so stale values never reach the
    /// guard.
    fn simplify_loop(&mut self, stmt: &mut Statement, map: &mut ConstMap) {
        let mut written = FxHashSet::default();
        collect_statement_writes(stmt, &mut written);
        for name in &written {
            map.remove(name);
        }

        let empty = ConstMap::default();
        match stmt {
            Statement::While(while_stmt) => {
                self.simplify_expression(&mut while_stmt.condition, &empty);
                let mut body_map = map.clone();
                self.simplify_block(&mut while_stmt.body, &mut body_map);
            }
            Statement::Repeat(repeat_stmt) => {
                let mut body_map = map.clone();
                self.simplify_block(&mut repeat_stmt.body, &mut body_map);
                self.simplify_expression(&mut repeat_stmt.condition, &empty);
            }
            _ => {}
        }

        for name in &written {
            map.remove(name);
        }
    }

    fn simplify_expression(&mut self, expr: &mut Expression, map: &ConstMap) {
        match &mut expr.kind {
            ExpressionKind::Identifier(name) => {
                if let Some(lit) = map.get(name) {
                    expr.kind = ExpressionKind::Literal(lit.clone());
                    self.changed = true;
                }
            }
            ExpressionKind::Binary(op, left, right) if op.is_short_circuit() => {
                let op = *op;
                self.simplify_expression(left, map);
                // Fold to the taken branch only.
                let take_left = match &left.kind {
                    ExpressionKind::Literal(lit) => Some(match op {
                        BinaryOp::And => !lit.is_truthy(),
                        _ => lit.is_truthy(),
                    }),
                    _ => None,
                };
                match take_left {
                    Some(true) => {
                        let taken = take_expression(left);
                        *expr = taken;
                        self.changed = true;
                    }
                    Some(false) => {
                        self.simplify_expression(right, map);
                        let taken = take_expression(right);
                        *expr = taken;
                        self.changed = true;
                    }
                    None => self.simplify_expression(right, map),
                }
            }
            ExpressionKind::Binary(op, left, right) => {
                let op = *op;
                self.simplify_expression(left, map);
                self.simplify_expression(right, map);
                if let (ExpressionKind::Literal(l), ExpressionKind::Literal(r)) =
                    (&left.kind, &right.kind)
                {
                    if let Some(folded) = fold_binary(op, l, r) {
                        expr.kind = ExpressionKind::Literal(folded);
                        self.changed = true;
                    }
                }
            }
            ExpressionKind::Unary(op, operand) => {
                let op = *op;
                self.simplify_expression(operand, map);
                if let ExpressionKind::Literal(lit) = &operand.kind {
                    if let Some(folded) = fold_unary(op, lit) {
                        expr.kind = ExpressionKind::Literal(folded);
                        self.changed = true;
                    }
                }
            }
            ExpressionKind::Member(base, _) => self.simplify_expression(base, map),
            ExpressionKind::Index(base, index) => {
                self.simplify_expression(base, map);
                self.simplify_expression(index, map);
            }
            ExpressionKind::Call(base, args) => {
                self.simplify_expression(base, map);
                for arg in args {
                    self.simplify_expression(arg, map);
                }
            }
            ExpressionKind::MethodCall(base, _, args) => {
                self.simplify_expression(base, map);
                for arg in args {
                    self.simplify_expression(arg, map);
                }
            }
            ExpressionKind::TableCall(base, table) => {
                self.simplify_expression(base, map);
                self.simplify_expression(table, map);
            }
            ExpressionKind::StringCall(base, _) => self.simplify_expression(base, map),
            ExpressionKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(value) | TableField::Named(_, value) => {
                            self.simplify_expression(value, map)
                        }
                        TableField::Computed(key, value) => {
                            self.simplify_expression(key, map);
                            self.simplify_expression(value, map);
                        }
                    }
                }
            }
            ExpressionKind::Function(body) => {
                let mut fresh = ConstMap::default();
                self.simplify_block(&mut body.body, &mut fresh);
            }
            ExpressionKind::Literal(_) | ExpressionKind::Vararg => {}
        }
    }
}

fn take_expression(slot: &mut Expression) -> Expression {
    std::mem::replace(
        slot,
        Expression::literal(Literal::Nil, crate::span::Span::empty()),
    )
}

fn is_multi_value(expr: &Expression) -> bool {
    matches!(
        expr.kind,
        ExpressionKind::Call(_, _)
            | ExpressionKind::MethodCall(_, _, _)
            | ExpressionKind::TableCall(_, _)
            | ExpressionKind::StringCall(_, _)
            | ExpressionKind::Vararg
    )
}

/// Render a number the way Lua's tostring would, for concat folding. Only
/// exact integers are handled; anything else refuses to fold rather than
/// guessing at float formatting.
fn number_as_concat_string(n: f64) -> Option<String> {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        Some(format!("{}", n as i64))
    } else {
        None
    }
}

fn concat_operand(lit: &Literal) -> Option<String> {
    match lit {
        Literal::String(s) => Some(s.clone()),
        Literal::Number(n) => number_as_concat_string(*n),
        _ => None,
    }
}

fn fold_binary(op: BinaryOp, left: &Literal, right: &Literal) -> Option<Literal> {
    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulo
        | BinaryOp::Power => {
            let (l, r) = match (left, right) {
                (Literal::Number(l), Literal::Number(r)) => (*l, *r),
                _ => return None,
            };
            let result = match op {
                BinaryOp::Add => l + r,
                BinaryOp::Subtract => l - r,
                BinaryOp::Multiply => l * r,
                BinaryOp::Divide => {
                    if r == 0.0 {
                        return None;
                    }
                    l / r
                }
                BinaryOp::Modulo => {
                    if r == 0.0 {
                        return None;
                    }
                    // Lua's % is floored, not truncated.
                    l - (l / r).floor() * r
                }
                BinaryOp::Power => l.powf(r),
                _ => unreachable!(),
            };
            if result.is_finite() {
                Some(Literal::Number(result))
            } else {
                None
            }
        }
        BinaryOp::Concatenate => {
            let l = concat_operand(left)?;
            let r = concat_operand(right)?;
            Some(Literal::String(format!("{l}{r}")))
        }
        BinaryOp::Equal => Some(Literal::Boolean(literal_eq(left, right)?)),
        BinaryOp::NotEqual => Some(Literal::Boolean(!literal_eq(left, right)?)),
        BinaryOp::LessThan
        | BinaryOp::LessThanOrEqual
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterThanOrEqual => {
            let ordering = match (left, right) {
                (Literal::Number(l), Literal::Number(r)) => l.partial_cmp(r)?,
                (Literal::String(l), Literal::String(r)) => l.cmp(r),
                // Comparing mismatched types raises at runtime; never fold.
                _ => return None,
            };
            let result = match op {
                BinaryOp::LessThan => ordering.is_lt(),
                BinaryOp::LessThanOrEqual => ordering.is_le(),
                BinaryOp::GreaterThan => ordering.is_gt(),
                BinaryOp::GreaterThanOrEqual => ordering.is_ge(),
                _ => unreachable!(),
            };
            Some(Literal::Boolean(result))
        }
        // Bitwise results require integer operands and 64-bit wrapping;
        // left to the host.
        BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::ShiftLeft
        | BinaryOp::ShiftRight => None,
        BinaryOp::And | BinaryOp::Or => None,
    }
}

fn literal_eq(left: &Literal, right: &Literal) -> Option<bool> {
    let eq = match (left, right) {
        (Literal::Nil, Literal::Nil) => true,
        (Literal::Boolean(l), Literal::Boolean(r)) => l == r,
        (Literal::Number(l), Literal::Number(r)) => l == r,
        (Literal::String(l), Literal::String(r)) => l == r,
        _ => false,
    };
    Some(eq)
}

fn fold_unary(op: UnaryOp, operand: &Literal) -> Option<Literal> {
    match (op, operand) {
        (UnaryOp::Negate, Literal::Number(n)) => Some(Literal::Number(-n)),
        (UnaryOp::Not, lit) => Some(Literal::Boolean(!lit.is_truthy())),
        // String literals hold one byte per char, so the char count is the
        // Lua byte length.
        (UnaryOp::Length, Literal::String(s)) => {
            Some(Literal::Number(s.chars().count() as f64))
        }
        _ => None,
    }
}
