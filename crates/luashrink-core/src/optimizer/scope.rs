//! Scope ancestry and name-reference utilities shared by the passes.
//!
//! The scope tree is rebuilt on demand by the passes that need ancestor
//! queries and discarded afterwards; it is never persisted across passes.

use crate::ast::expression::{Expression, ExpressionKind, TableField};
use crate::ast::statement::{FunctionTarget, Statement};
use crate::ast::Block;
use rustc_hash::FxHashSet;

pub type ScopeId = usize;

/// Parent-linked scope records. Index 0 is always the chunk scope.
#[derive(Debug, Default)]
pub struct ScopeTree {
    parents: Vec<Option<ScopeId>>,
}

impl ScopeTree {
    pub fn new() -> Self {
        ScopeTree {
            parents: vec![None],
        }
    }

    pub fn root(&self) -> ScopeId {
        0
    }

    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = self.parents.len();
        self.parents.push(Some(parent));
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.parents.get(scope).copied().flatten()
    }

    fn depth(&self, mut scope: ScopeId) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.parent(scope) {
            scope = parent;
            depth += 1;
        }
        depth
    }

    /// Lowest common ancestor of two scopes.
    pub fn lca(&self, mut a: ScopeId, mut b: ScopeId) -> ScopeId {
        let mut depth_a = self.depth(a);
        let mut depth_b = self.depth(b);
        while depth_a > depth_b {
            a = self.parent(a).unwrap_or(0);
            depth_a -= 1;
        }
        while depth_b > depth_a {
            b = self.parent(b).unwrap_or(0);
            depth_b -= 1;
        }
        while a != b {
            a = self.parent(a).unwrap_or(0);
            b = self.parent(b).unwrap_or(0);
        }
        a
    }

    /// Lowest common ancestor of a non-empty set of scopes.
    pub fn lca_all<I: IntoIterator<Item = ScopeId>>(&self, scopes: I) -> ScopeId {
        let mut iter = scopes.into_iter();
        let first = match iter.next() {
            Some(s) => s,
            None => return self.root(),
        };
        iter.fold(first, |acc, s| self.lca(acc, s))
    }
}

/// Every identifier read anywhere inside the expression, including nested
/// function bodies.
pub fn collect_expression_reads(expr: &Expression, out: &mut FxHashSet<String>) {
    match &expr.kind {
        ExpressionKind::Identifier(name) => {
            out.insert(name.clone());
        }
        ExpressionKind::Literal(_) | ExpressionKind::Vararg => {}
        ExpressionKind::Binary(_, left, right) => {
            collect_expression_reads(left, out);
            collect_expression_reads(right, out);
        }
        ExpressionKind::Unary(_, operand) => collect_expression_reads(operand, out),
        ExpressionKind::Member(base, _) => collect_expression_reads(base, out),
        ExpressionKind::Index(base, index) => {
            collect_expression_reads(base, out);
            collect_expression_reads(index, out);
        }
        ExpressionKind::Call(base, args) => {
            collect_expression_reads(base, out);
            for arg in args {
                collect_expression_reads(arg, out);
            }
        }
        ExpressionKind::MethodCall(base, _, args) => {
            collect_expression_reads(base, out);
            for arg in args {
                collect_expression_reads(arg, out);
            }
        }
        ExpressionKind::TableCall(base, table) => {
            collect_expression_reads(base, out);
            collect_expression_reads(table, out);
        }
        ExpressionKind::StringCall(base, argument) => {
            collect_expression_reads(base, out);
            collect_expression_reads(argument, out);
        }
        ExpressionKind::Table(fields) => {
            for field in fields {
                match field {
                    TableField::Positional(value) | TableField::Named(_, value) => {
                        collect_expression_reads(value, out)
                    }
                    TableField::Computed(key, value) => {
                        collect_expression_reads(key, out);
                        collect_expression_reads(value, out);
                    }
                }
            }
        }
        ExpressionKind::Function(body) => collect_block_reads(&body.body, out),
    }
}

/// Every identifier read anywhere inside the statement, including nested
/// blocks and function bodies. Plain-identifier assignment targets are
/// writes, not reads; member/index target bases are reads.
pub fn collect_statement_reads(stmt: &Statement, out: &mut FxHashSet<String>) {
    match stmt {
        Statement::LocalDecl(decl) => {
            for init in &decl.initializers {
                collect_expression_reads(init, out);
            }
        }
        Statement::Assign(assign) => {
            for target in &assign.targets {
                match &target.kind {
                    ExpressionKind::Identifier(_) => {}
                    _ => collect_expression_reads(target, out),
                }
            }
            for value in &assign.values {
                collect_expression_reads(value, out);
            }
        }
        Statement::Call(expr) => collect_expression_reads(expr, out),
        Statement::Return(ret) => {
            for value in &ret.values {
                collect_expression_reads(value, out);
            }
        }
        Statement::Break(_) => {}
        Statement::If(if_stmt) => {
            for clause in &if_stmt.clauses {
                collect_expression_reads(&clause.condition, out);
                collect_block_reads(&clause.block, out);
            }
            if let Some(else_block) = &if_stmt.else_block {
                collect_block_reads(else_block, out);
            }
        }
        Statement::While(while_stmt) => {
            collect_expression_reads(&while_stmt.condition, out);
            collect_block_reads(&while_stmt.body, out);
        }
        Statement::Repeat(repeat_stmt) => {
            collect_block_reads(&repeat_stmt.body, out);
            collect_expression_reads(&repeat_stmt.condition, out);
        }
        Statement::ForNumeric(for_stmt) => {
            collect_expression_reads(&for_stmt.start, out);
            collect_expression_reads(&for_stmt.end, out);
            if let Some(step) = &for_stmt.step {
                collect_expression_reads(step, out);
            }
            collect_block_reads(&for_stmt.body, out);
        }
        Statement::ForGeneric(for_stmt) => {
            for iterator in &for_stmt.iterators {
                collect_expression_reads(iterator, out);
            }
            collect_block_reads(&for_stmt.body, out);
        }
        Statement::FunctionDecl(decl) => {
            // `function a.b.c()` reads `a` to write its field.
            match &decl.target {
                FunctionTarget::Name(_) => {}
                FunctionTarget::Path(path) | FunctionTarget::Method(path, _) => {
                    if let Some(head) = path.first() {
                        out.insert(head.node.clone());
                    }
                }
            }
            collect_block_reads(&decl.body.body, out);
        }
        Statement::Do(do_stmt) => collect_block_reads(&do_stmt.body, out),
    }
}

pub fn collect_block_reads(block: &Block, out: &mut FxHashSet<String>) {
    for stmt in &block.statements {
        collect_statement_reads(stmt, out);
    }
}

/// Every name the statement may bind or assign, including declarations,
/// loop variables, and writes inside nested blocks and function bodies.
/// Deliberately over-approximate: used for constant-map invalidation, where
/// extra names only cost optimality.
pub fn collect_statement_writes(stmt: &Statement, out: &mut FxHashSet<String>) {
    match stmt {
        Statement::LocalDecl(decl) => {
            for name in &decl.names {
                out.insert(name.node.clone());
            }
            for init in &decl.initializers {
                collect_expression_writes(init, out);
            }
        }
        Statement::Assign(assign) => {
            for target in &assign.targets {
                if let ExpressionKind::Identifier(name) = &target.kind {
                    out.insert(name.clone());
                }
            }
            for value in &assign.values {
                collect_expression_writes(value, out);
            }
        }
        Statement::Call(expr) => collect_expression_writes(expr, out),
        Statement::Return(ret) => {
            for value in &ret.values {
                collect_expression_writes(value, out);
            }
        }
        Statement::Break(_) => {}
        Statement::If(if_stmt) => {
            for clause in &if_stmt.clauses {
                collect_expression_writes(&clause.condition, out);
                collect_block_writes(&clause.block, out);
            }
            if let Some(else_block) = &if_stmt.else_block {
                collect_block_writes(else_block, out);
            }
        }
        Statement::While(while_stmt) => {
            collect_expression_writes(&while_stmt.condition, out);
            collect_block_writes(&while_stmt.body, out);
        }
        Statement::Repeat(repeat_stmt) => {
            collect_block_writes(&repeat_stmt.body, out);
            collect_expression_writes(&repeat_stmt.condition, out);
        }
        Statement::ForNumeric(for_stmt) => {
            out.insert(for_stmt.variable.node.clone());
            collect_expression_writes(&for_stmt.start, out);
            collect_expression_writes(&for_stmt.end, out);
            if let Some(step) = &for_stmt.step {
                collect_expression_writes(step, out);
            }
            collect_block_writes(&for_stmt.body, out);
        }
        Statement::ForGeneric(for_stmt) => {
            for variable in &for_stmt.variables {
                out.insert(variable.node.clone());
            }
            for iterator in &for_stmt.iterators {
                collect_expression_writes(iterator, out);
            }
            collect_block_writes(&for_stmt.body, out);
        }
        Statement::FunctionDecl(decl) => {
            if let Some(name) = decl.simple_name() {
                out.insert(name.to_string());
            }
            collect_block_writes(&decl.body.body, out);
        }
        Statement::Do(do_stmt) => collect_block_writes(&do_stmt.body, out),
    }
}

/// Writes hidden inside an expression: assignments in nested function
/// literal bodies.
fn collect_expression_writes(expr: &Expression, out: &mut FxHashSet<String>) {
    match &expr.kind {
        ExpressionKind::Function(body) => collect_block_writes(&body.body, out),
        ExpressionKind::Binary(_, left, right) => {
            collect_expression_writes(left, out);
            collect_expression_writes(right, out);
        }
        ExpressionKind::Unary(_, operand) => collect_expression_writes(operand, out),
        ExpressionKind::Member(base, _) => collect_expression_writes(base, out),
        ExpressionKind::Index(base, index) => {
            collect_expression_writes(base, out);
            collect_expression_writes(index, out);
        }
        ExpressionKind::Call(base, args) => {
            collect_expression_writes(base, out);
            for arg in args {
                collect_expression_writes(arg, out);
            }
        }
        ExpressionKind::MethodCall(base, _, args) => {
            collect_expression_writes(base, out);
            for arg in args {
                collect_expression_writes(arg, out);
            }
        }
        ExpressionKind::TableCall(base, table) => {
            collect_expression_writes(base, out);
            collect_expression_writes(table, out);
        }
        ExpressionKind::StringCall(base, argument) => {
            collect_expression_writes(base, out);
            collect_expression_writes(argument, out);
        }
        ExpressionKind::Table(fields) => {
            for field in fields {
                match field {
                    TableField::Positional(value) | TableField::Named(_, value) => {
                        collect_expression_writes(value, out)
                    }
                    TableField::Computed(key, value) => {
                        collect_expression_writes(key, out);
                        collect_expression_writes(value, out);
                    }
                }
            }
        }
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) | ExpressionKind::Vararg => {}
    }
}

pub fn collect_block_writes(block: &Block, out: &mut FxHashSet<String>) {
    for stmt in &block.statements {
        collect_statement_writes(stmt, out);
    }
}

/// Whether the expression contains a call anywhere — the only side-effecting
/// expression form the passes recognize.
pub fn contains_call(expr: &Expression) -> bool {
    match &expr.kind {
        ExpressionKind::Call(_, _)
        | ExpressionKind::MethodCall(_, _, _)
        | ExpressionKind::TableCall(_, _)
        | ExpressionKind::StringCall(_, _) => true,
        ExpressionKind::Binary(_, left, right) => contains_call(left) || contains_call(right),
        ExpressionKind::Unary(_, operand) => contains_call(operand),
        ExpressionKind::Member(base, _) => contains_call(base),
        ExpressionKind::Index(base, index) => contains_call(base) || contains_call(index),
        ExpressionKind::Table(fields) => fields.iter().any(|field| match field {
            TableField::Positional(value) | TableField::Named(_, value) => contains_call(value),
            TableField::Computed(key, value) => contains_call(key) || contains_call(value),
        }),
        // A function literal only has effects when called.
        ExpressionKind::Function(_) => false,
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) | ExpressionKind::Vararg => {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn reads_of(source: &str) -> FxHashSet<String> {
        let chunk = parse(source).expect("parse failed");
        let mut out = FxHashSet::default();
        collect_block_reads(&chunk.block, &mut out);
        out
    }

    #[test]
    fn assignment_target_base_is_a_read() {
        let reads = reads_of("t.x = 1");
        assert!(reads.contains("t"));
    }

    #[test]
    fn plain_assignment_target_is_not_a_read() {
        let reads = reads_of("x = 1");
        assert!(!reads.contains("x"));
    }

    #[test]
    fn reads_cross_function_boundaries() {
        let reads = reads_of("local f = function() return hidden end");
        assert!(reads.contains("hidden"));
    }

    #[test]
    fn lca_walks_parent_links() {
        let mut tree = ScopeTree::new();
        let a = tree.push(tree.root());
        let b = tree.push(a);
        let c = tree.push(a);
        let d = tree.push(tree.root());
        assert_eq!(tree.lca(b, c), a);
        assert_eq!(tree.lca(b, d), tree.root());
        assert_eq!(tree.lca_all([b, c, a]), a);
    }
}
