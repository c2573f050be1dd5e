//! Shared machinery for the literal and expression alias passes.
//!
//! Both passes walk the tree once, scope by scope, serializing every
//! qualifying node to a string key and recording the scope of each
//! occurrence. Selected candidates are declared once at the lowest common
//! ancestor of their occurrence scopes and every occurrence is rewritten to
//! the alias identifier.
//!
//! The scope numbering is preorder over the traversal; the collection walk
//! and the declaration-insertion walk visit blocks in the same order so the
//! ids they assign agree.

use crate::ast::expression::{Expression, ExpressionKind, TableField};
use crate::ast::statement::{LocalDeclaration, Statement};
use crate::ast::{Block, Chunk, Spanned};
use crate::optimizer::scope::{ScopeId, ScopeTree};
use crate::span::Span;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Decides whether a node qualifies for aliasing; returns its serialized
/// key and per-occurrence printed cost.
pub(super) type Keyer<'a> = &'a dyn Fn(&Expression) -> Option<(String, usize)>;

pub(super) struct Candidate {
    pub representative: Expression,
    pub count: usize,
    pub scopes: Vec<ScopeId>,
    pub cost: usize,
}

pub(super) struct AliasWalk {
    pub tree: ScopeTree,
    pub candidates: IndexMap<String, Candidate>,
}

/// Cost of declaring the alias once: `local NAME=VALUE` plus a statement
/// separator. Aliasing pays off only if the declaration plus all the alias
/// reads undercut the repeated value text.
pub(super) fn worth_aliasing(value_cost: usize, count: usize, name_len: usize) -> bool {
    let declaration_cost = "local ".len() + name_len + 1 + value_cost + 1;
    declaration_cost + name_len * count < value_cost * count
}

pub(super) fn collect_occurrences(chunk: &Chunk, keyer: Keyer) -> AliasWalk {
    let mut walk = AliasWalk {
        tree: ScopeTree::new(),
        candidates: IndexMap::new(),
    };
    let root = walk.tree.root();
    collect_block(&chunk.block, root, &mut walk, keyer);
    walk
}

fn collect_block(block: &Block, scope: ScopeId, walk: &mut AliasWalk, keyer: Keyer) {
    for stmt in &block.statements {
        collect_statement(stmt, scope, walk, keyer);
    }
}

fn collect_statement(stmt: &Statement, scope: ScopeId, walk: &mut AliasWalk, keyer: Keyer) {
    match stmt {
        Statement::LocalDecl(decl) => {
            for init in &decl.initializers {
                collect_expression(init, scope, walk, keyer);
            }
        }
        Statement::Assign(assign) => {
            for target in &assign.targets {
                // The target itself cannot become an alias read, but its
                // sub-expressions can.
                collect_children(target, scope, walk, keyer);
            }
            for value in &assign.values {
                collect_expression(value, scope, walk, keyer);
            }
        }
        Statement::Call(expr) => collect_expression(expr, scope, walk, keyer),
        Statement::Return(ret) => {
            for value in &ret.values {
                collect_expression(value, scope, walk, keyer);
            }
        }
        Statement::Break(_) => {}
        Statement::If(if_stmt) => {
            for clause in &if_stmt.clauses {
                collect_expression(&clause.condition, scope, walk, keyer);
                let inner = walk.tree.push(scope);
                collect_block(&clause.block, inner, walk, keyer);
            }
            if let Some(else_block) = &if_stmt.else_block {
                let inner = walk.tree.push(scope);
                collect_block(else_block, inner, walk, keyer);
            }
        }
        Statement::While(while_stmt) => {
            collect_expression(&while_stmt.condition, scope, walk, keyer);
            let inner = walk.tree.push(scope);
            collect_block(&while_stmt.body, inner, walk, keyer);
        }
        Statement::Repeat(repeat_stmt) => {
            // The until condition can see body locals, so it counts as part
            // of the body scope.
            let inner = walk.tree.push(scope);
            collect_block(&repeat_stmt.body, inner, walk, keyer);
            collect_expression(&repeat_stmt.condition, inner, walk, keyer);
        }
        Statement::ForNumeric(for_stmt) => {
            collect_expression(&for_stmt.start, scope, walk, keyer);
            collect_expression(&for_stmt.end, scope, walk, keyer);
            if let Some(step) = &for_stmt.step {
                collect_expression(step, scope, walk, keyer);
            }
            let inner = walk.tree.push(scope);
            collect_block(&for_stmt.body, inner, walk, keyer);
        }
        Statement::ForGeneric(for_stmt) => {
            for iterator in &for_stmt.iterators {
                collect_expression(iterator, scope, walk, keyer);
            }
            let inner = walk.tree.push(scope);
            collect_block(&for_stmt.body, inner, walk, keyer);
        }
        Statement::FunctionDecl(decl) => {
            let inner = walk.tree.push(scope);
            collect_block(&decl.body.body, inner, walk, keyer);
        }
        Statement::Do(do_stmt) => {
            let inner = walk.tree.push(scope);
            collect_block(&do_stmt.body, inner, walk, keyer);
        }
    }
}

fn record(expr: &Expression, key: String, cost: usize, scope: ScopeId, walk: &mut AliasWalk) {
    let candidate = walk.candidates.entry(key).or_insert_with(|| Candidate {
        representative: expr.clone(),
        count: 0,
        scopes: Vec::new(),
        cost,
    });
    candidate.count += 1;
    candidate.scopes.push(scope);
}

fn collect_expression(expr: &Expression, scope: ScopeId, walk: &mut AliasWalk, keyer: Keyer) {
    if let Some((key, cost)) = keyer(expr) {
        // Qualifying nodes are taken whole; their parts are not candidates
        // of their own.
        record(expr, key, cost, scope, walk);
        return;
    }
    collect_children(expr, scope, walk, keyer);
}

fn collect_children(expr: &Expression, scope: ScopeId, walk: &mut AliasWalk, keyer: Keyer) {
    match &expr.kind {
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) | ExpressionKind::Vararg => {}
        ExpressionKind::Binary(_, left, right) => {
            collect_expression(left, scope, walk, keyer);
            collect_expression(right, scope, walk, keyer);
        }
        ExpressionKind::Unary(_, operand) => collect_expression(operand, scope, walk, keyer),
        ExpressionKind::Member(base, _) => collect_expression(base, scope, walk, keyer),
        ExpressionKind::Index(base, index) => {
            collect_expression(base, scope, walk, keyer);
            collect_expression(index, scope, walk, keyer);
        }
        ExpressionKind::Call(base, args) => {
            collect_expression(base, scope, walk, keyer);
            for arg in args {
                collect_expression(arg, scope, walk, keyer);
            }
        }
        ExpressionKind::MethodCall(base, _, args) => {
            collect_expression(base, scope, walk, keyer);
            for arg in args {
                collect_expression(arg, scope, walk, keyer);
            }
        }
        ExpressionKind::TableCall(base, table) => {
            collect_expression(base, scope, walk, keyer);
            collect_children(table, scope, walk, keyer);
        }
        ExpressionKind::StringCall(base, _) => {
            // `f"s"` keeps its string argument: replacing it with an
            // identifier would break the call-sugar syntax.
            collect_expression(base, scope, walk, keyer);
        }
        ExpressionKind::Table(fields) => {
            for field in fields {
                match field {
                    TableField::Positional(value) | TableField::Named(_, value) => {
                        collect_expression(value, scope, walk, keyer)
                    }
                    TableField::Computed(key, value) => {
                        collect_expression(key, scope, walk, keyer);
                        collect_expression(value, scope, walk, keyer);
                    }
                }
            }
        }
        ExpressionKind::Function(body) => {
            let inner = walk.tree.push(scope);
            collect_block(&body.body, inner, walk, keyer);
        }
    }
}

/// Rewrite every occurrence of a selected key to its alias identifier.
/// Mirrors the collection walk's skip rules.
pub(super) fn rewrite_occurrences(
    chunk: &mut Chunk,
    keyer: Keyer,
    replacements: &FxHashMap<String, String>,
) -> bool {
    let mut changed = false;
    rewrite_block(&mut chunk.block, keyer, replacements, &mut changed);
    changed
}

fn rewrite_block(
    block: &mut Block,
    keyer: Keyer,
    replacements: &FxHashMap<String, String>,
    changed: &mut bool,
) {
    for stmt in &mut block.statements {
        rewrite_statement(stmt, keyer, replacements, changed);
    }
}

fn rewrite_statement(
    stmt: &mut Statement,
    keyer: Keyer,
    replacements: &FxHashMap<String, String>,
    changed: &mut bool,
) {
    match stmt {
        Statement::LocalDecl(decl) => {
            for init in &mut decl.initializers {
                rewrite_expression(init, keyer, replacements, changed);
            }
        }
        Statement::Assign(assign) => {
            for target in &mut assign.targets {
                rewrite_children(target, keyer, replacements, changed);
            }
            for value in &mut assign.values {
                rewrite_expression(value, keyer, replacements, changed);
            }
        }
        Statement::Call(expr) => rewrite_expression(expr, keyer, replacements, changed),
        Statement::Return(ret) => {
            for value in &mut ret.values {
                rewrite_expression(value, keyer, replacements, changed);
            }
        }
        Statement::Break(_) => {}
        Statement::If(if_stmt) => {
            for clause in &mut if_stmt.clauses {
                rewrite_expression(&mut clause.condition, keyer, replacements, changed);
                rewrite_block(&mut clause.block, keyer, replacements, changed);
            }
            if let Some(else_block) = &mut if_stmt.else_block {
                rewrite_block(else_block, keyer, replacements, changed);
            }
        }
        Statement::While(while_stmt) => {
            rewrite_expression(&mut while_stmt.condition, keyer, replacements, changed);
            rewrite_block(&mut while_stmt.body, keyer, replacements, changed);
        }
        Statement::Repeat(repeat_stmt) => {
            rewrite_block(&mut repeat_stmt.body, keyer, replacements, changed);
            rewrite_expression(&mut repeat_stmt.condition, keyer, replacements, changed);
        }
        Statement::ForNumeric(for_stmt) => {
            rewrite_expression(&mut for_stmt.start, keyer, replacements, changed);
            rewrite_expression(&mut for_stmt.end, keyer, replacements, changed);
            if let Some(step) = &mut for_stmt.step {
                rewrite_expression(step, keyer, replacements, changed);
            }
            rewrite_block(&mut for_stmt.body, keyer, replacements, changed);
        }
        Statement::ForGeneric(for_stmt) => {
            for iterator in &mut for_stmt.iterators {
                rewrite_expression(iterator, keyer, replacements, changed);
            }
            rewrite_block(&mut for_stmt.body, keyer, replacements, changed);
        }
        Statement::FunctionDecl(decl) => {
            rewrite_block(&mut decl.body.body, keyer, replacements, changed);
        }
        Statement::Do(do_stmt) => rewrite_block(&mut do_stmt.body, keyer, replacements, changed),
    }
}

fn rewrite_expression(
    expr: &mut Expression,
    keyer: Keyer,
    replacements: &FxHashMap<String, String>,
    changed: &mut bool,
) {
    if let Some((key, _)) = keyer(expr) {
        if let Some(alias) = replacements.get(&key) {
            *expr = Expression::identifier(alias.clone(), expr.span);
            *changed = true;
        }
        return;
    }
    rewrite_children(expr, keyer, replacements, changed);
}

fn rewrite_children(
    expr: &mut Expression,
    keyer: Keyer,
    replacements: &FxHashMap<String, String>,
    changed: &mut bool,
) {
    match &mut expr.kind {
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) | ExpressionKind::Vararg => {}
        ExpressionKind::Binary(_, left, right) => {
            rewrite_expression(left, keyer, replacements, changed);
            rewrite_expression(right, keyer, replacements, changed);
        }
        ExpressionKind::Unary(_, operand) => rewrite_expression(operand, keyer, replacements, changed),
        ExpressionKind::Member(base, _) => rewrite_expression(base, keyer, replacements, changed),
        ExpressionKind::Index(base, index) => {
            rewrite_expression(base, keyer, replacements, changed);
            rewrite_expression(index, keyer, replacements, changed);
        }
        ExpressionKind::Call(base, args) => {
            rewrite_expression(base, keyer, replacements, changed);
            for arg in args {
                rewrite_expression(arg, keyer, replacements, changed);
            }
        }
        ExpressionKind::MethodCall(base, _, args) => {
            rewrite_expression(base, keyer, replacements, changed);
            for arg in args {
                rewrite_expression(arg, keyer, replacements, changed);
            }
        }
        ExpressionKind::TableCall(base, table) => {
            rewrite_expression(base, keyer, replacements, changed);
            rewrite_children(table, keyer, replacements, changed);
        }
        ExpressionKind::StringCall(base, _) => {
            rewrite_expression(base, keyer, replacements, changed);
        }
        ExpressionKind::Table(fields) => {
            for field in fields {
                match field {
                    TableField::Positional(value) | TableField::Named(_, value) => {
                        rewrite_expression(value, keyer, replacements, changed)
                    }
                    TableField::Computed(key, value) => {
                        rewrite_expression(key, keyer, replacements, changed);
                        rewrite_expression(value, keyer, replacements, changed);
                    }
                }
            }
        }
        ExpressionKind::Function(body) => {
            rewrite_block(&mut body.body, keyer, replacements, changed);
        }
    }
}

/// Insert alias declarations at the start of their target scopes' blocks.
/// Runs after rewriting, so the declared values keep their original form.
pub(super) fn insert_declarations(
    chunk: &mut Chunk,
    pending: &mut FxHashMap<ScopeId, Vec<(String, Expression)>>,
) {
    let mut counter = 1;
    insert_block(&mut chunk.block, 0, &mut counter, pending);
}

fn next_scope(counter: &mut usize) -> ScopeId {
    let id = *counter;
    *counter += 1;
    id
}

fn insert_block(
    block: &mut Block,
    scope: ScopeId,
    counter: &mut usize,
    pending: &mut FxHashMap<ScopeId, Vec<(String, Expression)>>,
) {
    if let Some(declarations) = pending.remove(&scope) {
        let statements: Vec<Statement> = declarations
            .into_iter()
            .map(|(name, value)| {
                Statement::LocalDecl(LocalDeclaration {
                    names: vec![Spanned::new(name, Span::empty())],
                    initializers: vec![value],
                    span: Span::empty(),
                })
            })
            .collect();
        block.statements.splice(0..0, statements);
    }
    for stmt in &mut block.statements {
        insert_statement(stmt, scope, counter, pending);
    }
}

fn insert_statement(
    stmt: &mut Statement,
    scope: ScopeId,
    counter: &mut usize,
    pending: &mut FxHashMap<ScopeId, Vec<(String, Expression)>>,
) {
    match stmt {
        Statement::LocalDecl(decl) => {
            for init in &mut decl.initializers {
                insert_expression(init, counter, pending);
            }
        }
        Statement::Assign(assign) => {
            for target in &mut assign.targets {
                insert_expression(target, counter, pending);
            }
            for value in &mut assign.values {
                insert_expression(value, counter, pending);
            }
        }
        Statement::Call(expr) => insert_expression(expr, counter, pending),
        Statement::Return(ret) => {
            for value in &mut ret.values {
                insert_expression(value, counter, pending);
            }
        }
        Statement::Break(_) => {}
        Statement::If(if_stmt) => {
            for clause in &mut if_stmt.clauses {
                insert_expression(&mut clause.condition, counter, pending);
                let inner = next_scope(counter);
                insert_block(&mut clause.block, inner, counter, pending);
            }
            if let Some(else_block) = &mut if_stmt.else_block {
                let inner = next_scope(counter);
                insert_block(else_block, inner, counter, pending);
            }
        }
        Statement::While(while_stmt) => {
            insert_expression(&mut while_stmt.condition, counter, pending);
            let inner = next_scope(counter);
            insert_block(&mut while_stmt.body, inner, counter, pending);
        }
        Statement::Repeat(repeat_stmt) => {
            let inner = next_scope(counter);
            insert_block(&mut repeat_stmt.body, inner, counter, pending);
            insert_expression(&mut repeat_stmt.condition, counter, pending);
        }
        Statement::ForNumeric(for_stmt) => {
            insert_expression(&mut for_stmt.start, counter, pending);
            insert_expression(&mut for_stmt.end, counter, pending);
            if let Some(step) = &mut for_stmt.step {
                insert_expression(step, counter, pending);
            }
            let inner = next_scope(counter);
            insert_block(&mut for_stmt.body, inner, counter, pending);
        }
        Statement::ForGeneric(for_stmt) => {
            for iterator in &mut for_stmt.iterators {
                insert_expression(iterator, counter, pending);
            }
            let inner = next_scope(counter);
            insert_block(&mut for_stmt.body, inner, counter, pending);
        }
        Statement::FunctionDecl(decl) => {
            let inner = next_scope(counter);
            insert_block(&mut decl.body.body, inner, counter, pending);
        }
        Statement::Do(do_stmt) => {
            let inner = next_scope(counter);
            insert_block(&mut do_stmt.body, inner, counter, pending);
        }
    }
}

fn insert_expression(
    expr: &mut Expression,
    counter: &mut usize,
    pending: &mut FxHashMap<ScopeId, Vec<(String, Expression)>>,
) {
    match &mut expr.kind {
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) | ExpressionKind::Vararg => {}
        ExpressionKind::Binary(_, left, right) => {
            insert_expression(left, counter, pending);
            insert_expression(right, counter, pending);
        }
        ExpressionKind::Unary(_, operand) => insert_expression(operand, counter, pending),
        ExpressionKind::Member(base, _) => insert_expression(base, counter, pending),
        ExpressionKind::Index(base, index) => {
            insert_expression(base, counter, pending);
            insert_expression(index, counter, pending);
        }
        ExpressionKind::Call(base, args) => {
            insert_expression(base, counter, pending);
            for arg in args {
                insert_expression(arg, counter, pending);
            }
        }
        ExpressionKind::MethodCall(base, _, args) => {
            insert_expression(base, counter, pending);
            for arg in args {
                insert_expression(arg, counter, pending);
            }
        }
        ExpressionKind::TableCall(base, table) => {
            insert_expression(base, counter, pending);
            insert_expression(table, counter, pending);
        }
        ExpressionKind::StringCall(base, argument) => {
            insert_expression(base, counter, pending);
            insert_expression(argument, counter, pending);
        }
        ExpressionKind::Table(fields) => {
            for field in fields {
                match field {
                    TableField::Positional(value) | TableField::Named(_, value) => {
                        insert_expression(value, counter, pending)
                    }
                    TableField::Computed(key, value) => {
                        insert_expression(key, counter, pending);
                        insert_expression(value, counter, pending);
                    }
                }
            }
        }
        ExpressionKind::Function(body) => {
            let inner = next_scope(counter);
            insert_block(&mut body.body, inner, counter, pending);
        }
    }
}
