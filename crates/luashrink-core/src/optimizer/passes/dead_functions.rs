//! Reachability-based removal of unreferenced function declarations.
//!
//! ```lua
//! -- Entry points: TIC
//! function helper() return 1 end   -- removed
//! function used() return 2 end    -- kept: TIC reaches it
//! function TIC() used() end       -- kept: entry point
//! ```
//!
//! Two closures run in order: global `function name()` declarations over the
//! whole chunk, then `local function name()` declarations per block. Each
//! closure seeds a keep set with the explicit keep-list, the host's
//! lifecycle entry points, and every candidate name read or written outside
//! any candidate's own body, then closes it transitively over the
//! candidate-to-candidate reference graph.

use crate::ast::expression::{Expression, ExpressionKind, TableField};
use crate::ast::statement::{FunctionTarget, Statement};
use crate::ast::{Block, Chunk};
use crate::optimizer::scope::collect_block_reads;
use crate::optimizer::Pass;
use rustc_hash::{FxHashMap, FxHashSet};

pub struct DeadFunctionPass {
    keep_list: Vec<String>,
    entry_points: Vec<String>,
    changed: bool,
}

impl DeadFunctionPass {
    pub fn new(keep_list: Vec<String>, entry_points: Vec<String>) -> Self {
        DeadFunctionPass {
            keep_list,
            entry_points,
            changed: false,
        }
    }
}

impl Pass for DeadFunctionPass {
    fn name(&self) -> &'static str {
        "dead-functions"
    }

    fn run(&mut self, chunk: &mut Chunk) -> bool {
        self.changed = false;
        self.eliminate_globals(&mut chunk.block);
        self.eliminate_locals(&mut chunk.block);
        self.changed
    }
}

/// Which declarations a closure treats as removal candidates.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Global,
    Local,
}

fn candidate_name(stmt: &Statement, mode: Mode) -> Option<&str> {
    match stmt {
        Statement::FunctionDecl(decl) => {
            let mode_matches = match mode {
                Mode::Global => !decl.is_local,
                Mode::Local => decl.is_local,
            };
            if mode_matches {
                decl.simple_name()
            } else {
                None
            }
        }
        _ => None,
    }
}

impl DeadFunctionPass {
    fn seed(&self) -> FxHashSet<String> {
        self.keep_list
            .iter()
            .chain(self.entry_points.iter())
            .cloned()
            .collect()
    }

    fn eliminate_globals(&mut self, root: &mut Block) {
        // Candidate groups: a name declared more than once is ambiguous and
        // always kept.
        let mut counts: FxHashMap<String, usize> = FxHashMap::default();
        collect_candidate_counts(root, Mode::Global, &mut counts);
        let candidates: FxHashSet<String> = counts.keys().cloned().collect();
        if candidates.is_empty() {
            return;
        }

        let mut keep = self.seed();
        for (name, count) in &counts {
            if *count > 1 {
                keep.insert(name.clone());
            }
        }

        let mut scanner = RefScanner::new(&candidates, Mode::Global);
        scanner.scan_block(root, 0);
        keep.extend(scanner.reads);
        keep.extend(scanner.writes);

        let mut deps: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();
        collect_dependencies(root, Mode::Global, &candidates, &mut deps);

        close_keep_set(&mut keep, &deps);
        self.remove_global_unkept(root, &candidates, &keep);
    }

    fn remove_global_unkept(
        &mut self,
        block: &mut Block,
        candidates: &FxHashSet<String>,
        keep: &FxHashSet<String>,
    ) {
        let before = block.statements.len();
        block.statements.retain(|stmt| {
            match candidate_name(stmt, Mode::Global) {
                Some(name) => !candidates.contains(name) || keep.contains(name),
                None => true,
            }
        });
        if block.statements.len() != before {
            self.changed = true;
        }
        for stmt in &mut block.statements {
            for nested in nested_blocks_mut(stmt) {
                self.remove_global_unkept(nested, candidates, keep);
            }
        }
    }

    /// Per-block local-function closure; recurses into every nested block
    /// independently after handling the current one.
    fn eliminate_locals(&mut self, block: &mut Block) {
        let mut counts: FxHashMap<String, usize> = FxHashMap::default();
        for stmt in &block.statements {
            if let Some(name) = candidate_name(stmt, Mode::Local) {
                *counts.entry(name.to_string()).or_insert(0) += 1;
            }
        }

        if !counts.is_empty() {
            let candidates: FxHashSet<String> = counts.keys().cloned().collect();
            let mut keep = self.seed();
            for (name, count) in &counts {
                if *count > 1 {
                    keep.insert(name.clone());
                }
            }
            // A candidate name also bound by some other local declaration in
            // this block makes the closure ambiguous; keep it.
            for stmt in &block.statements {
                if let Statement::LocalDecl(decl) = stmt {
                    for name in &decl.names {
                        if candidates.contains(&name.node) {
                            keep.insert(name.node.clone());
                        }
                    }
                }
            }

            let mut scanner = RefScanner::new(&candidates, Mode::Local);
            scanner.scan_block(block, 0);
            keep.extend(scanner.reads);
            keep.extend(scanner.writes);

            let mut deps: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();
            for stmt in &block.statements {
                if let Statement::FunctionDecl(decl) = stmt {
                    if let Some(name) = candidate_name(stmt, Mode::Local) {
                        let mut reads = FxHashSet::default();
                        collect_block_reads(&decl.body.body, &mut reads);
                        reads.retain(|r| candidates.contains(r));
                        deps.entry(name.to_string()).or_default().extend(reads);
                    }
                }
            }

            close_keep_set(&mut keep, &deps);

            let before = block.statements.len();
            block.statements.retain(|stmt| {
                match candidate_name(stmt, Mode::Local) {
                    Some(name) => keep.contains(name),
                    None => true,
                }
            });
            if block.statements.len() != before {
                self.changed = true;
            }
        }

        for stmt in &mut block.statements {
            for nested in nested_blocks_mut(stmt) {
                self.eliminate_locals(nested);
            }
        }
    }
}

/// Transitive closure: anything reachable from the keep set through the
/// candidate dependency graph is kept.
fn close_keep_set(keep: &mut FxHashSet<String>, deps: &FxHashMap<String, FxHashSet<String>>) {
    let mut worklist: Vec<String> = keep.iter().cloned().collect();
    while let Some(name) = worklist.pop() {
        if let Some(children) = deps.get(&name) {
            for child in children {
                if keep.insert(child.clone()) {
                    worklist.push(child.clone());
                }
            }
        }
    }
}

fn collect_candidate_counts(block: &Block, mode: Mode, counts: &mut FxHashMap<String, usize>) {
    for stmt in &block.statements {
        if let Some(name) = candidate_name(stmt, mode) {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
        for nested in nested_blocks(stmt) {
            collect_candidate_counts(nested, mode, counts);
        }
    }
}

fn collect_dependencies(
    block: &Block,
    mode: Mode,
    candidates: &FxHashSet<String>,
    deps: &mut FxHashMap<String, FxHashSet<String>>,
) {
    for stmt in &block.statements {
        if let Statement::FunctionDecl(decl) = stmt {
            if let Some(name) = candidate_name(stmt, mode) {
                let mut reads = FxHashSet::default();
                collect_block_reads(&decl.body.body, &mut reads);
                reads.retain(|r| candidates.contains(r));
                deps.entry(name.to_string()).or_default().extend(reads);
            }
        }
        for nested in nested_blocks(stmt) {
            collect_dependencies(nested, mode, candidates, deps);
        }
    }
}

/// Collects every candidate name read or written outside candidate bodies.
/// Candidate declarations are skipped wherever the mode says they bind: at
/// any depth for globals, only at the scanned block's own level for locals
/// (a deeper same-named local is a different binding).
struct RefScanner<'a> {
    candidates: &'a FxHashSet<String>,
    mode: Mode,
    reads: FxHashSet<String>,
    writes: FxHashSet<String>,
}

impl<'a> RefScanner<'a> {
    fn new(candidates: &'a FxHashSet<String>, mode: Mode) -> Self {
        RefScanner {
            candidates,
            mode,
            reads: FxHashSet::default(),
            writes: FxHashSet::default(),
        }
    }

    fn skips(&self, stmt: &Statement, depth: usize) -> bool {
        match candidate_name(stmt, self.mode) {
            Some(name) => {
                self.candidates.contains(name) && (self.mode == Mode::Global || depth == 0)
            }
            None => false,
        }
    }

    fn scan_block(&mut self, block: &Block, depth: usize) {
        for stmt in &block.statements {
            if self.skips(stmt, depth) {
                continue;
            }
            self.scan_statement(stmt, depth);
        }
    }

    fn scan_statement(&mut self, stmt: &Statement, depth: usize) {
        match stmt {
            Statement::LocalDecl(decl) => {
                for name in &decl.names {
                    self.writes.insert(name.node.clone());
                }
                for init in &decl.initializers {
                    self.scan_expression(init, depth);
                }
            }
            Statement::Assign(assign) => {
                for target in &assign.targets {
                    match &target.kind {
                        ExpressionKind::Identifier(name) => {
                            self.writes.insert(name.clone());
                        }
                        _ => self.scan_expression(target, depth),
                    }
                }
                for value in &assign.values {
                    self.scan_expression(value, depth);
                }
            }
            Statement::Call(expr) => self.scan_expression(expr, depth),
            Statement::Return(ret) => {
                for value in &ret.values {
                    self.scan_expression(value, depth);
                }
            }
            Statement::Break(_) => {}
            Statement::If(if_stmt) => {
                for clause in &if_stmt.clauses {
                    self.scan_expression(&clause.condition, depth);
                    self.scan_block(&clause.block, depth + 1);
                }
                if let Some(else_block) = &if_stmt.else_block {
                    self.scan_block(else_block, depth + 1);
                }
            }
            Statement::While(while_stmt) => {
                self.scan_expression(&while_stmt.condition, depth);
                self.scan_block(&while_stmt.body, depth + 1);
            }
            Statement::Repeat(repeat_stmt) => {
                self.scan_block(&repeat_stmt.body, depth + 1);
                self.scan_expression(&repeat_stmt.condition, depth);
            }
            Statement::ForNumeric(for_stmt) => {
                self.scan_expression(&for_stmt.start, depth);
                self.scan_expression(&for_stmt.end, depth);
                if let Some(step) = &for_stmt.step {
                    self.scan_expression(step, depth);
                }
                self.scan_block(&for_stmt.body, depth + 1);
            }
            Statement::ForGeneric(for_stmt) => {
                for iterator in &for_stmt.iterators {
                    self.scan_expression(iterator, depth);
                }
                self.scan_block(&for_stmt.body, depth + 1);
            }
            Statement::FunctionDecl(decl) => {
                match &decl.target {
                    FunctionTarget::Name(name) => {
                        self.writes.insert(name.node.clone());
                    }
                    FunctionTarget::Path(path) | FunctionTarget::Method(path, _) => {
                        if let Some(head) = path.first() {
                            self.reads.insert(head.node.clone());
                        }
                    }
                }
                self.scan_block(&decl.body.body, depth + 1);
            }
            Statement::Do(do_stmt) => self.scan_block(&do_stmt.body, depth + 1),
        }
    }

    fn scan_expression(&mut self, expr: &Expression, depth: usize) {
        match &expr.kind {
            ExpressionKind::Identifier(name) => {
                self.reads.insert(name.clone());
            }
            ExpressionKind::Literal(_) | ExpressionKind::Vararg => {}
            ExpressionKind::Binary(_, left, right) => {
                self.scan_expression(left, depth);
                self.scan_expression(right, depth);
            }
            ExpressionKind::Unary(_, operand) => self.scan_expression(operand, depth),
            ExpressionKind::Member(base, _) => self.scan_expression(base, depth),
            ExpressionKind::Index(base, index) => {
                self.scan_expression(base, depth);
                self.scan_expression(index, depth);
            }
            ExpressionKind::Call(base, args) => {
                self.scan_expression(base, depth);
                for arg in args {
                    self.scan_expression(arg, depth);
                }
            }
            ExpressionKind::MethodCall(base, _, args) => {
                self.scan_expression(base, depth);
                for arg in args {
                    self.scan_expression(arg, depth);
                }
            }
            ExpressionKind::TableCall(base, table) => {
                self.scan_expression(base, depth);
                self.scan_expression(table, depth);
            }
            ExpressionKind::StringCall(base, argument) => {
                self.scan_expression(base, depth);
                self.scan_expression(argument, depth);
            }
            ExpressionKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(value) | TableField::Named(_, value) => {
                            self.scan_expression(value, depth)
                        }
                        TableField::Computed(key, value) => {
                            self.scan_expression(key, depth);
                            self.scan_expression(value, depth);
                        }
                    }
                }
            }
            ExpressionKind::Function(body) => self.scan_block(&body.body, depth + 1),
        }
    }
}

/// All statement-level blocks directly nested in this statement, including
/// function literal bodies in its expressions.
pub(super) fn nested_blocks(stmt: &Statement) -> Vec<&Block> {
    let mut blocks = Vec::new();
    match stmt {
        Statement::LocalDecl(decl) => {
            for init in &decl.initializers {
                expression_blocks(init, &mut blocks);
            }
        }
        Statement::Assign(assign) => {
            for target in &assign.targets {
                expression_blocks(target, &mut blocks);
            }
            for value in &assign.values {
                expression_blocks(value, &mut blocks);
            }
        }
        Statement::Call(expr) => expression_blocks(expr, &mut blocks),
        Statement::Return(ret) => {
            for value in &ret.values {
                expression_blocks(value, &mut blocks);
            }
        }
        Statement::Break(_) => {}
        Statement::If(if_stmt) => {
            for clause in &if_stmt.clauses {
                expression_blocks(&clause.condition, &mut blocks);
                blocks.push(&clause.block);
            }
            if let Some(else_block) = &if_stmt.else_block {
                blocks.push(else_block);
            }
        }
        Statement::While(while_stmt) => {
            expression_blocks(&while_stmt.condition, &mut blocks);
            blocks.push(&while_stmt.body);
        }
        Statement::Repeat(repeat_stmt) => {
            blocks.push(&repeat_stmt.body);
            expression_blocks(&repeat_stmt.condition, &mut blocks);
        }
        Statement::ForNumeric(for_stmt) => {
            expression_blocks(&for_stmt.start, &mut blocks);
            expression_blocks(&for_stmt.end, &mut blocks);
            if let Some(step) = &for_stmt.step {
                expression_blocks(step, &mut blocks);
            }
            blocks.push(&for_stmt.body);
        }
        Statement::ForGeneric(for_stmt) => {
            for iterator in &for_stmt.iterators {
                expression_blocks(iterator, &mut blocks);
            }
            blocks.push(&for_stmt.body);
        }
        Statement::FunctionDecl(decl) => blocks.push(&decl.body.body),
        Statement::Do(do_stmt) => blocks.push(&do_stmt.body),
    }
    blocks
}

fn expression_blocks<'a>(expr: &'a Expression, out: &mut Vec<&'a Block>) {
    match &expr.kind {
        ExpressionKind::Function(body) => out.push(&body.body),
        ExpressionKind::Binary(_, left, right) => {
            expression_blocks(left, out);
            expression_blocks(right, out);
        }
        ExpressionKind::Unary(_, operand) => expression_blocks(operand, out),
        ExpressionKind::Member(base, _) => expression_blocks(base, out),
        ExpressionKind::Index(base, index) => {
            expression_blocks(base, out);
            expression_blocks(index, out);
        }
        ExpressionKind::Call(base, args) => {
            expression_blocks(base, out);
            for arg in args {
                expression_blocks(arg, out);
            }
        }
        ExpressionKind::MethodCall(base, _, args) => {
            expression_blocks(base, out);
            for arg in args {
                expression_blocks(arg, out);
            }
        }
        ExpressionKind::TableCall(base, table) => {
            expression_blocks(base, out);
            expression_blocks(table, out);
        }
        ExpressionKind::StringCall(base, argument) => {
            expression_blocks(base, out);
            expression_blocks(argument, out);
        }
        ExpressionKind::Table(fields) => {
            for field in fields {
                match field {
                    TableField::Positional(value) | TableField::Named(_, value) => {
                        expression_blocks(value, out)
                    }
                    TableField::Computed(key, value) => {
                        expression_blocks(key, out);
                        expression_blocks(value, out);
                    }
                }
            }
        }
        _ => {}
    }
}

/// Mutable variant of [`nested_blocks`], for the removal walks.
pub(super) fn nested_blocks_mut(stmt: &mut Statement) -> Vec<&mut Block> {
    let mut blocks = Vec::new();
    match stmt {
        Statement::LocalDecl(decl) => {
            for init in &mut decl.initializers {
                expression_blocks_mut(init, &mut blocks);
            }
        }
        Statement::Assign(assign) => {
            for target in &mut assign.targets {
                expression_blocks_mut(target, &mut blocks);
            }
            for value in &mut assign.values {
                expression_blocks_mut(value, &mut blocks);
            }
        }
        Statement::Call(expr) => expression_blocks_mut(expr, &mut blocks),
        Statement::Return(ret) => {
            for value in &mut ret.values {
                expression_blocks_mut(value, &mut blocks);
            }
        }
        Statement::Break(_) => {}
        Statement::If(if_stmt) => {
            for clause in &mut if_stmt.clauses {
                expression_blocks_mut(&mut clause.condition, &mut blocks);
                blocks.push(&mut clause.block);
            }
            if let Some(else_block) = &mut if_stmt.else_block {
                blocks.push(else_block);
            }
        }
        Statement::While(while_stmt) => {
            expression_blocks_mut(&mut while_stmt.condition, &mut blocks);
            blocks.push(&mut while_stmt.body);
        }
        Statement::Repeat(repeat_stmt) => {
            blocks.push(&mut repeat_stmt.body);
            expression_blocks_mut(&mut repeat_stmt.condition, &mut blocks);
        }
        Statement::ForNumeric(for_stmt) => {
            expression_blocks_mut(&mut for_stmt.start, &mut blocks);
            expression_blocks_mut(&mut for_stmt.end, &mut blocks);
            if let Some(step) = &mut for_stmt.step {
                expression_blocks_mut(step, &mut blocks);
            }
            blocks.push(&mut for_stmt.body);
        }
        Statement::ForGeneric(for_stmt) => {
            for iterator in &mut for_stmt.iterators {
                expression_blocks_mut(iterator, &mut blocks);
            }
            blocks.push(&mut for_stmt.body);
        }
        Statement::FunctionDecl(decl) => blocks.push(&mut decl.body.body),
        Statement::Do(do_stmt) => blocks.push(&mut do_stmt.body),
    }
    blocks
}

fn expression_blocks_mut<'a>(expr: &'a mut Expression, out: &mut Vec<&'a mut Block>) {
    match &mut expr.kind {
        ExpressionKind::Function(body) => out.push(&mut body.body),
        ExpressionKind::Binary(_, left, right) => {
            expression_blocks_mut(left, out);
            expression_blocks_mut(right, out);
        }
        ExpressionKind::Unary(_, operand) => expression_blocks_mut(operand, out),
        ExpressionKind::Member(base, _) => expression_blocks_mut(base, out),
        ExpressionKind::Index(base, index) => {
            expression_blocks_mut(base, out);
            expression_blocks_mut(index, out);
        }
        ExpressionKind::Call(base, args) => {
            expression_blocks_mut(base, out);
            for arg in args {
                expression_blocks_mut(arg, out);
            }
        }
        ExpressionKind::MethodCall(base, _, args) => {
            expression_blocks_mut(base, out);
            for arg in args {
                expression_blocks_mut(arg, out);
            }
        }
        ExpressionKind::TableCall(base, table) => {
            expression_blocks_mut(base, out);
            expression_blocks_mut(table, out);
        }
        ExpressionKind::StringCall(base, argument) => {
            expression_blocks_mut(base, out);
            expression_blocks_mut(argument, out);
        }
        ExpressionKind::Table(fields) => {
            for field in fields {
                match field {
                    TableField::Positional(value) | TableField::Named(_, value) => {
                        expression_blocks_mut(value, out)
                    }
                    TableField::Computed(key, value) => {
                        expression_blocks_mut(key, out);
                        expression_blocks_mut(value, out);
                    }
                }
            }
        }
        _ => {}
    }
}
