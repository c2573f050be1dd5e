//! Liveness-based removal of unread local declarations.
//!
//! ```lua
//! -- Before:
//! local unused = 10
//! local kept = print("hi")
//! print(1)
//!
//! -- After:
//! local kept = print("hi")  -- initializer has a side effect
//! print(1)
//! ```
//!
//! One backward walk per block: a "used" name set starts empty at the end of
//! the block; a `local` declaration whose initializers are call-free and
//! whose names are all unused at that point is dropped without contributing
//! reads. Every surviving statement updates the set as
//! `reads ∪ (used − writes)`.

use crate::ast::expression::{Expression, ExpressionKind, TableField};
use crate::ast::statement::Statement;
use crate::ast::{Block, Chunk};
use crate::optimizer::scope::{collect_expression_reads, collect_statement_reads, contains_call};
use crate::optimizer::Pass;
use rustc_hash::FxHashSet;

pub struct DeadLocalPass {
    changed: bool,
}

impl DeadLocalPass {
    pub fn new() -> Self {
        DeadLocalPass { changed: false }
    }
}

impl Default for DeadLocalPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for DeadLocalPass {
    fn name(&self) -> &'static str {
        "dead-locals"
    }

    fn run(&mut self, chunk: &mut Chunk) -> bool {
        self.changed = false;
        self.process_block(&mut chunk.block, FxHashSet::default());
        self.changed
    }
}

impl DeadLocalPass {
    /// `initial_used` seeds the backward walk; a repeat loop's `until`
    /// condition reads body-scope names, so its body starts non-empty.
    fn process_block(&mut self, block: &mut Block, initial_used: FxHashSet<String>) {
        // Children first, so the parent's read sets see the rewritten form.
        for stmt in &mut block.statements {
            self.process_nested(stmt);
        }

        let mut used = initial_used;
        let mut keep = vec![true; block.statements.len()];
        for (i, stmt) in block.statements.iter().enumerate().rev() {
            if let Statement::LocalDecl(decl) = stmt {
                let has_effect = decl.initializers.iter().any(contains_call);
                let any_read = decl.names.iter().any(|n| used.contains(&n.node));
                if !has_effect && !any_read {
                    keep[i] = false;
                    self.changed = true;
                    continue;
                }
            }

            for written in unconditional_writes(stmt) {
                used.remove(&written);
            }
            collect_statement_reads(stmt, &mut used);
        }

        if keep.iter().any(|k| !k) {
            let mut index = 0;
            block.statements.retain(|_| {
                let kept = keep[index];
                index += 1;
                kept
            });
        }
    }

    fn process_nested(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::LocalDecl(decl) => {
                for init in &mut decl.initializers {
                    self.process_expression(init);
                }
            }
            Statement::Assign(assign) => {
                for target in &mut assign.targets {
                    self.process_expression(target);
                }
                for value in &mut assign.values {
                    self.process_expression(value);
                }
            }
            Statement::Call(expr) => self.process_expression(expr),
            Statement::Return(ret) => {
                for value in &mut ret.values {
                    self.process_expression(value);
                }
            }
            Statement::Break(_) => {}
            Statement::If(if_stmt) => {
                for clause in &mut if_stmt.clauses {
                    self.process_expression(&mut clause.condition);
                    self.process_block(&mut clause.block, FxHashSet::default());
                }
                if let Some(else_block) = &mut if_stmt.else_block {
                    self.process_block(else_block, FxHashSet::default());
                }
            }
            Statement::While(while_stmt) => {
                self.process_expression(&mut while_stmt.condition);
                self.process_block(&mut while_stmt.body, FxHashSet::default());
            }
            Statement::Repeat(repeat_stmt) => {
                self.process_expression(&mut repeat_stmt.condition);
                let mut condition_reads = FxHashSet::default();
                collect_expression_reads(&repeat_stmt.condition, &mut condition_reads);
                self.process_block(&mut repeat_stmt.body, condition_reads);
            }
            Statement::ForNumeric(for_stmt) => {
                self.process_expression(&mut for_stmt.start);
                self.process_expression(&mut for_stmt.end);
                if let Some(step) = &mut for_stmt.step {
                    self.process_expression(step);
                }
                self.process_block(&mut for_stmt.body, FxHashSet::default());
            }
            Statement::ForGeneric(for_stmt) => {
                for iterator in &mut for_stmt.iterators {
                    self.process_expression(iterator);
                }
                self.process_block(&mut for_stmt.body, FxHashSet::default());
            }
            Statement::FunctionDecl(decl) => {
                self.process_block(&mut decl.body.body, FxHashSet::default());
            }
            Statement::Do(do_stmt) => {
                self.process_block(&mut do_stmt.body, FxHashSet::default());
            }
        }
    }

    /// Function literal bodies hide whole blocks inside expressions.
    fn process_expression(&mut self, expr: &mut Expression) {
        match &mut expr.kind {
            ExpressionKind::Function(body) => {
                self.process_block(&mut body.body, FxHashSet::default());
            }
            ExpressionKind::Binary(_, left, right) => {
                self.process_expression(left);
                self.process_expression(right);
            }
            ExpressionKind::Unary(_, operand) => self.process_expression(operand),
            ExpressionKind::Member(base, _) => self.process_expression(base),
            ExpressionKind::Index(base, index) => {
                self.process_expression(base);
                self.process_expression(index);
            }
            ExpressionKind::Call(base, args) => {
                self.process_expression(base);
                for arg in args {
                    self.process_expression(arg);
                }
            }
            ExpressionKind::MethodCall(base, _, args) => {
                self.process_expression(base);
                for arg in args {
                    self.process_expression(arg);
                }
            }
            ExpressionKind::TableCall(base, table) => {
                self.process_expression(base);
                self.process_expression(table);
            }
            ExpressionKind::StringCall(base, argument) => {
                self.process_expression(base);
                self.process_expression(argument);
            }
            ExpressionKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(value) | TableField::Named(_, value) => {
                            self.process_expression(value)
                        }
                        TableField::Computed(key, value) => {
                            self.process_expression(key);
                            self.process_expression(value);
                        }
                    }
                }
            }
            ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) | ExpressionKind::Vararg => {
            }
        }
    }
}

/// Names this statement definitely overwrites before any later read.
/// Conditional writes inside nested blocks never qualify.
fn unconditional_writes(stmt: &Statement) -> Vec<String> {
    match stmt {
        Statement::LocalDecl(decl) => decl.names.iter().map(|n| n.node.clone()).collect(),
        Statement::Assign(assign) => assign
            .targets
            .iter()
            .filter_map(|t| match &t.kind {
                ExpressionKind::Identifier(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
