//! Table-key shortening, in two variants sharing the rewrite logic.
//!
//! The explicit variant renames the keys the caller listed wherever they
//! appear, with no analysis: the caller vouches that all tables carrying
//! those keys are reachable only through renamed accesses.
//!
//! The inferred variant finds locals whose sole initializer is a table
//! constructor and proves the table never escapes: the moment the variable
//! is read bare, indexed inside a nested function body, or indexed with
//! anything but a literal string, the candidate is dropped. Survivors get a
//! private key map applied to the constructor and every later access.

use crate::ast::expression::{Expression, ExpressionKind, Literal, TableField};
use crate::ast::statement::{FunctionTarget, Statement};
use crate::ast::{Block, Chunk};
use crate::optimizer::names::NameGenerator;
use crate::optimizer::Pass;
use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};

pub struct TableKeyRenamePass {
    rename_keys: Vec<String>,
}

impl TableKeyRenamePass {
    pub fn new(rename_keys: Vec<String>) -> Self {
        TableKeyRenamePass { rename_keys }
    }
}

impl Pass for TableKeyRenamePass {
    fn name(&self) -> &'static str {
        "rename-table-keys"
    }

    fn run(&mut self, chunk: &mut Chunk) -> bool {
        let mut changed = false;
        if !self.rename_keys.is_empty() {
            changed |= rename_explicit(chunk, &self.rename_keys);
        }
        changed |= rename_inferred(chunk);
        changed
    }
}

/// Global rename of the caller-supplied keys, everywhere they occur as a
/// constructor key, member name, method name, or literal-string index.
fn rename_explicit(chunk: &mut Chunk, keys: &[String]) -> bool {
    let mut forbidden = FxHashSet::default();
    collect_key_names(&chunk.block, &mut forbidden);
    let mut names = NameGenerator::with_forbidden(forbidden);

    let mut mapping: FxHashMap<String, String> = FxHashMap::default();
    for key in keys {
        let short = names.next_name();
        if *key != short {
            mapping.insert(key.clone(), short);
        }
    }
    if mapping.is_empty() {
        return false;
    }

    let mut rewriter = KeyRewriter {
        mapping: &mapping,
        changed: false,
    };
    rewriter.rewrite_block(&mut chunk.block);
    rewriter.changed
}

/// Every name used anywhere as a table key; generated short keys must not
/// collide with keys that stay.
fn collect_key_names(block: &Block, out: &mut FxHashSet<String>) {
    collect_declared_keys(block, out);
    visit_expressions(block, &mut |expr| match &expr.kind {
        ExpressionKind::Member(_, name) => {
            out.insert(name.node.clone());
        }
        ExpressionKind::MethodCall(_, name, _) => {
            out.insert(name.node.clone());
        }
        ExpressionKind::Index(_, index) => {
            if let ExpressionKind::Literal(Literal::String(key)) = &index.kind {
                out.insert(key.clone());
            }
        }
        ExpressionKind::Table(fields) => {
            for field in fields {
                match field {
                    TableField::Named(name, _) => {
                        out.insert(name.node.clone());
                    }
                    TableField::Computed(key, _) => {
                        if let ExpressionKind::Literal(Literal::String(key)) = &key.kind {
                            out.insert(key.clone());
                        }
                    }
                    TableField::Positional(_) => {}
                }
            }
        }
        _ => {}
    });
}

/// Keys defined by `function t.f()` / `function t:m()` declarations.
fn collect_declared_keys(block: &Block, out: &mut FxHashSet<String>) {
    for stmt in &block.statements {
        if let Statement::FunctionDecl(decl) = stmt {
            match &decl.target {
                FunctionTarget::Path(path) if path.len() > 1 => {
                    if let Some(last) = path.last() {
                        out.insert(last.node.clone());
                    }
                }
                FunctionTarget::Method(_, method) => {
                    out.insert(method.node.clone());
                }
                _ => {}
            }
        }
        for nested in super::dead_functions::nested_blocks(stmt) {
            collect_declared_keys(nested, out);
        }
    }
}

struct KeyRewriter<'a> {
    mapping: &'a FxHashMap<String, String>,
    changed: bool,
}

impl KeyRewriter<'_> {
    fn rewrite_block(&mut self, block: &mut Block) {
        for stmt in &mut block.statements {
            if let Statement::FunctionDecl(decl) = stmt {
                // `function t.old()` and `function t:old()` define the key
                // on the last path segment / the method name.
                match &mut decl.target {
                    FunctionTarget::Path(path) => {
                        if path.len() > 1 {
                            let last = path.last_mut().expect("path is non-empty");
                            self.rewrite_key(&mut last.node);
                        }
                    }
                    FunctionTarget::Method(_, method) => self.rewrite_key(&mut method.node),
                    FunctionTarget::Name(_) => {}
                }
            }
            for_each_block_expression_mut(stmt, &mut |expr| self.rewrite_expression(expr));
            for nested in super::dead_functions::nested_blocks_mut(stmt) {
                self.rewrite_block(nested);
            }
        }
    }

    fn rewrite_expression(&mut self, expr: &mut Expression) {
        match &mut expr.kind {
            ExpressionKind::Member(base, name) => {
                self.rewrite_expression(base);
                self.rewrite_key(&mut name.node);
            }
            ExpressionKind::MethodCall(base, name, args) => {
                self.rewrite_expression(base);
                self.rewrite_key(&mut name.node);
                for arg in args {
                    self.rewrite_expression(arg);
                }
            }
            ExpressionKind::Index(base, index) => {
                self.rewrite_expression(base);
                if let ExpressionKind::Literal(Literal::String(key)) = &mut index.kind {
                    self.rewrite_key(key);
                } else {
                    self.rewrite_expression(index);
                }
            }
            ExpressionKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(value) => self.rewrite_expression(value),
                        TableField::Named(name, value) => {
                            self.rewrite_key(&mut name.node);
                            self.rewrite_expression(value);
                        }
                        TableField::Computed(key, value) => {
                            if let ExpressionKind::Literal(Literal::String(name)) = &mut key.kind {
                                self.rewrite_key(name);
                            } else {
                                self.rewrite_expression(key);
                            }
                            self.rewrite_expression(value);
                        }
                    }
                }
            }
            ExpressionKind::Identifier(_)
            | ExpressionKind::Literal(_)
            | ExpressionKind::Vararg => {}
            ExpressionKind::Binary(_, left, right) => {
                self.rewrite_expression(left);
                self.rewrite_expression(right);
            }
            ExpressionKind::Unary(_, operand) => self.rewrite_expression(operand),
            ExpressionKind::Call(base, args) => {
                self.rewrite_expression(base);
                for arg in args {
                    self.rewrite_expression(arg);
                }
            }
            ExpressionKind::TableCall(base, table) => {
                self.rewrite_expression(base);
                self.rewrite_expression(table);
            }
            ExpressionKind::StringCall(base, argument) => {
                self.rewrite_expression(base);
                self.rewrite_expression(argument);
            }
            ExpressionKind::Function(_) => {}
        }
    }

    fn rewrite_key(&mut self, key: &mut String) {
        if let Some(short) = self.mapping.get(key.as_str()) {
            *key = short.clone();
            self.changed = true;
        }
    }
}

/// Per-local table-key rename backed by escape analysis.
fn rename_inferred(chunk: &mut Chunk) -> bool {
    let mut finder = CandidateFinder {
        bindings: FxHashMap::default(),
    };
    finder.scan_block(&chunk.block, 0);

    let mut analysis = EscapeAnalysis {
        candidates: finder
            .bindings
            .into_iter()
            .filter_map(|(name, state)| match state {
                Binding::Candidate { depth } => Some((
                    name,
                    CandidateState {
                        declaration_depth: depth,
                        keys: IndexSet::default(),
                        disqualified: false,
                    },
                )),
                Binding::Disqualified => None,
            })
            .collect(),
    };
    analysis.scan_block(&chunk.block, 0);

    let mut maps: FxHashMap<String, FxHashMap<String, String>> = FxHashMap::default();
    for (name, state) in &analysis.candidates {
        if state.disqualified || state.keys.is_empty() {
            continue;
        }
        // Keys keep distinct short names; nothing else reaches this table,
        // so collisions with unrelated keys are impossible.
        let mut names = NameGenerator::new();
        let mut mapping = FxHashMap::default();
        for key in &state.keys {
            let short = names.next_name();
            if *key != short {
                mapping.insert(key.clone(), short);
            }
        }
        if !mapping.is_empty() {
            maps.insert(name.clone(), mapping);
        }
    }
    if maps.is_empty() {
        return false;
    }

    let mut rewriter = InferredRewriter {
        maps: &maps,
        changed: false,
    };
    rewriter.rewrite_block(&mut chunk.block);
    rewriter.changed
}

enum Binding {
    Candidate { depth: usize },
    Disqualified,
}

struct CandidateFinder {
    /// Every name bound anywhere; only names bound exactly once, by a
    /// sole-initializer table constructor, survive as candidates.
    bindings: FxHashMap<String, Binding>,
}

impl CandidateFinder {
    fn bind(&mut self, name: &str, binding: Binding) {
        use std::collections::hash_map::Entry;
        match self.bindings.entry(name.to_string()) {
            // Rebinding anywhere makes occurrences of the name ambiguous
            // before variables are renamed apart.
            Entry::Occupied(mut entry) => {
                entry.insert(Binding::Disqualified);
            }
            Entry::Vacant(entry) => {
                entry.insert(binding);
            }
        }
    }

    // Depth counts function bodies only, matching EscapeAnalysis.
    fn scan_block(&mut self, block: &Block, depth: usize) {
        for stmt in &block.statements {
            self.scan_statement(stmt, depth);
        }
    }

    fn scan_statement(&mut self, stmt: &Statement, depth: usize) {
        match stmt {
            Statement::LocalDecl(decl) => {
                let sole_table = decl.names.len() == 1
                    && decl.initializers.len() == 1
                    && matches!(decl.initializers[0].kind, ExpressionKind::Table(_));
                for init in &decl.initializers {
                    self.scan_expression(init, depth);
                }
                for name in &decl.names {
                    let binding = if sole_table {
                        Binding::Candidate { depth }
                    } else {
                        Binding::Disqualified
                    };
                    self.bind(&name.node, binding);
                }
            }
            Statement::Assign(assign) => {
                for target in &assign.targets {
                    if let ExpressionKind::Identifier(name) = &target.kind {
                        self.bind(name, Binding::Disqualified);
                    } else {
                        self.scan_expression(target, depth);
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
                    self.scan_block(&clause.block, depth);
                }
                if let Some(else_block) = &if_stmt.else_block {
                    self.scan_block(else_block, depth);
                }
            }
            Statement::While(while_stmt) => {
                self.scan_expression(&while_stmt.condition, depth);
                self.scan_block(&while_stmt.body, depth);
            }
            Statement::Repeat(repeat_stmt) => {
                self.scan_block(&repeat_stmt.body, depth);
                self.scan_expression(&repeat_stmt.condition, depth);
            }
            Statement::ForNumeric(for_stmt) => {
                self.bind(&for_stmt.variable.node, Binding::Disqualified);
                self.scan_expression(&for_stmt.start, depth);
                self.scan_expression(&for_stmt.end, depth);
                if let Some(step) = &for_stmt.step {
                    self.scan_expression(step, depth);
                }
                self.scan_block(&for_stmt.body, depth);
            }
            Statement::ForGeneric(for_stmt) => {
                for variable in &for_stmt.variables {
                    self.bind(&variable.node, Binding::Disqualified);
                }
                for iterator in &for_stmt.iterators {
                    self.scan_expression(iterator, depth);
                }
                self.scan_block(&for_stmt.body, depth);
            }
            Statement::FunctionDecl(decl) => {
                if decl.is_local {
                    if let Some(name) = decl.simple_name() {
                        let name = name.to_string();
                        self.bind(&name, Binding::Disqualified);
                    }
                }
                for parameter in &decl.body.parameters {
                    self.bind(&parameter.node, Binding::Disqualified);
                }
                self.scan_block(&decl.body.body, depth + 1);
            }
            Statement::Do(do_stmt) => self.scan_block(&do_stmt.body, depth),
        }
    }

    fn scan_expression(&mut self, expr: &Expression, depth: usize) {
        match &expr.kind {
            ExpressionKind::Function(body) => {
                for parameter in &body.parameters {
                    self.bind(&parameter.node, Binding::Disqualified);
                }
                self.scan_block(&body.body, depth + 1);
            }
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
            ExpressionKind::Identifier(_)
            | ExpressionKind::Literal(_)
            | ExpressionKind::Vararg => {}
        }
    }
}

struct CandidateState {
    declaration_depth: usize,
    keys: IndexSet<String>,
    disqualified: bool,
}

struct EscapeAnalysis {
    candidates: FxHashMap<String, CandidateState>,
}

impl EscapeAnalysis {
    fn scan_block(&mut self, block: &Block, function_depth: usize) {
        for stmt in &block.statements {
            self.scan_statement(stmt, function_depth);
        }
    }

    fn scan_statement(&mut self, stmt: &Statement, function_depth: usize) {
        match stmt {
            Statement::LocalDecl(decl) => {
                let candidate_name = if decl.names.len() == 1
                    && self.candidates.contains_key(&decl.names[0].node)
                {
                    Some(decl.names[0].node.clone())
                } else {
                    None
                };
                for (position, init) in decl.initializers.iter().enumerate() {
                    match (&candidate_name, position) {
                        // The candidate's own constructor: record its
                        // literal keys, disqualify on computed ones.
                        (Some(name), 0) => self.scan_constructor(name, init, function_depth),
                        _ => self.scan_expression(init, function_depth),
                    }
                }
            }
            Statement::Assign(assign) => {
                for target in &assign.targets {
                    self.scan_expression(target, function_depth);
                }
                for value in &assign.values {
                    self.scan_expression(value, function_depth);
                }
            }
            Statement::Call(expr) => self.scan_expression(expr, function_depth),
            Statement::Return(ret) => {
                for value in &ret.values {
                    self.scan_expression(value, function_depth);
                }
            }
            Statement::Break(_) => {}
            Statement::If(if_stmt) => {
                for clause in &if_stmt.clauses {
                    self.scan_expression(&clause.condition, function_depth);
                    self.scan_block(&clause.block, function_depth);
                }
                if let Some(else_block) = &if_stmt.else_block {
                    self.scan_block(else_block, function_depth);
                }
            }
            Statement::While(while_stmt) => {
                self.scan_expression(&while_stmt.condition, function_depth);
                self.scan_block(&while_stmt.body, function_depth);
            }
            Statement::Repeat(repeat_stmt) => {
                self.scan_block(&repeat_stmt.body, function_depth);
                self.scan_expression(&repeat_stmt.condition, function_depth);
            }
            Statement::ForNumeric(for_stmt) => {
                self.scan_expression(&for_stmt.start, function_depth);
                self.scan_expression(&for_stmt.end, function_depth);
                if let Some(step) = &for_stmt.step {
                    self.scan_expression(step, function_depth);
                }
                self.scan_block(&for_stmt.body, function_depth);
            }
            Statement::ForGeneric(for_stmt) => {
                for iterator in &for_stmt.iterators {
                    self.scan_expression(iterator, function_depth);
                }
                self.scan_block(&for_stmt.body, function_depth);
            }
            Statement::FunctionDecl(decl) => {
                if let FunctionTarget::Path(path) | FunctionTarget::Method(path, _) = &decl.target
                {
                    if let Some(head) = path.first() {
                        // Defining a field through the candidate counts as
                        // an access; inside a nested function it would, so
                        // treat the head like an index base at this depth.
                        self.disqualify(&head.node);
                    }
                }
                self.scan_block(&decl.body.body, function_depth + 1);
            }
            Statement::Do(do_stmt) => self.scan_block(&do_stmt.body, function_depth),
        }
    }

    fn scan_constructor(&mut self, name: &str, init: &Expression, function_depth: usize) {
        let ExpressionKind::Table(fields) = &init.kind else {
            return;
        };
        for field in fields {
            match field {
                TableField::Positional(value) => self.scan_expression(value, function_depth),
                TableField::Named(key, value) => {
                    self.record_key(name, &key.node);
                    self.scan_expression(value, function_depth);
                }
                TableField::Computed(key, value) => {
                    if let ExpressionKind::Literal(Literal::String(text)) = &key.kind {
                        self.record_key(name, text);
                    } else {
                        // A computed key could collide with a generated
                        // short name at runtime.
                        self.disqualify(name);
                        self.scan_expression(key, function_depth);
                    }
                    self.scan_expression(value, function_depth);
                }
            }
        }
    }

    fn scan_expression(&mut self, expr: &Expression, function_depth: usize) {
        match &expr.kind {
            ExpressionKind::Identifier(name) => {
                // A bare read lets the table escape as a value.
                self.disqualify(name);
            }
            ExpressionKind::Literal(_) | ExpressionKind::Vararg => {}
            ExpressionKind::Member(base, key) => {
                if let Some(name) = self.candidate_base(base, function_depth) {
                    self.record_key(&name, &key.node);
                } else {
                    self.scan_expression(base, function_depth);
                }
            }
            ExpressionKind::MethodCall(base, method, args) => {
                if let Some(name) = self.candidate_base(base, function_depth) {
                    self.record_key(&name, &method.node);
                } else {
                    self.scan_expression(base, function_depth);
                }
                for arg in args {
                    self.scan_expression(arg, function_depth);
                }
            }
            ExpressionKind::Index(base, index) => {
                match (self.candidate_base(base, function_depth), &index.kind) {
                    (Some(name), ExpressionKind::Literal(Literal::String(key))) => {
                        self.record_key(&name, key);
                    }
                    (Some(name), _) => {
                        self.disqualify(&name);
                        self.scan_expression(index, function_depth);
                    }
                    (None, _) => {
                        self.scan_expression(base, function_depth);
                        self.scan_expression(index, function_depth);
                    }
                }
            }
            ExpressionKind::Binary(_, left, right) => {
                self.scan_expression(left, function_depth);
                self.scan_expression(right, function_depth);
            }
            ExpressionKind::Unary(_, operand) => self.scan_expression(operand, function_depth),
            ExpressionKind::Call(base, args) => {
                self.scan_expression(base, function_depth);
                for arg in args {
                    self.scan_expression(arg, function_depth);
                }
            }
            ExpressionKind::TableCall(base, table) => {
                self.scan_expression(base, function_depth);
                self.scan_expression(table, function_depth);
            }
            ExpressionKind::StringCall(base, argument) => {
                self.scan_expression(base, function_depth);
                self.scan_expression(argument, function_depth);
            }
            ExpressionKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(value) | TableField::Named(_, value) => {
                            self.scan_expression(value, function_depth)
                        }
                        TableField::Computed(key, value) => {
                            self.scan_expression(key, function_depth);
                            self.scan_expression(value, function_depth);
                        }
                    }
                }
            }
            ExpressionKind::Function(body) => self.scan_block(&body.body, function_depth + 1),
        }
    }

    /// A candidate identifier used as an access base at its own function
    /// depth. Deeper uses disqualify: a closure can outlive the rewrite's
    /// assumptions about the binding.
    fn candidate_base(&mut self, base: &Expression, function_depth: usize) -> Option<String> {
        let ExpressionKind::Identifier(name) = &base.kind else {
            return None;
        };
        let state = self.candidates.get(name.as_str())?;
        if state.declaration_depth != function_depth {
            let name = name.clone();
            self.disqualify(&name);
            return None;
        }
        Some(name.clone())
    }

    fn record_key(&mut self, name: &str, key: &str) {
        if let Some(state) = self.candidates.get_mut(name) {
            state.keys.insert(key.to_string());
        }
    }

    fn disqualify(&mut self, name: &str) {
        if let Some(state) = self.candidates.get_mut(name) {
            state.disqualified = true;
        }
    }
}

struct InferredRewriter<'a> {
    maps: &'a FxHashMap<String, FxHashMap<String, String>>,
    changed: bool,
}

impl InferredRewriter<'_> {
    fn rewrite_block(&mut self, block: &mut Block) {
        for stmt in &mut block.statements {
            if let Statement::LocalDecl(decl) = stmt {
                if decl.names.len() == 1 {
                    let maps = self.maps;
                    if let Some(mapping) = maps.get(decl.names[0].node.as_str()) {
                        if let Some(init) = decl.initializers.first_mut() {
                            self.rewrite_constructor(init, mapping);
                        }
                    }
                }
            }
            for_each_block_expression_mut(stmt, &mut |expr| self.rewrite_expression(expr));
            for nested in super::dead_functions::nested_blocks_mut(stmt) {
                self.rewrite_block(nested);
            }
        }
    }

    fn rewrite_constructor(&mut self, init: &mut Expression, mapping: &FxHashMap<String, String>) {
        let ExpressionKind::Table(fields) = &mut init.kind else {
            return;
        };
        for field in fields {
            match field {
                TableField::Named(key, _) => {
                    if let Some(short) = mapping.get(key.node.as_str()) {
                        key.node = short.clone();
                        self.changed = true;
                    }
                }
                TableField::Computed(key, _) => {
                    if let ExpressionKind::Literal(Literal::String(text)) = &mut key.kind {
                        if let Some(short) = mapping.get(text.as_str()) {
                            *text = short.clone();
                            self.changed = true;
                        }
                    }
                }
                TableField::Positional(_) => {}
            }
        }
    }

    fn rewrite_expression(&mut self, expr: &mut Expression) {
        match &mut expr.kind {
            ExpressionKind::Member(base, key) => {
                if let Some(short) = self.base_mapping(base).and_then(|m| m.get(key.node.as_str()))
                {
                    key.node = short.clone();
                    self.changed = true;
                }
                self.rewrite_expression(base);
            }
            ExpressionKind::MethodCall(base, method, args) => {
                if let Some(short) = self
                    .base_mapping(base)
                    .and_then(|m| m.get(method.node.as_str()))
                {
                    method.node = short.clone();
                    self.changed = true;
                }
                self.rewrite_expression(base);
                for arg in args {
                    self.rewrite_expression(arg);
                }
            }
            ExpressionKind::Index(base, index) => {
                if let ExpressionKind::Literal(Literal::String(key)) = &mut index.kind {
                    if let Some(short) = self.base_mapping(base).and_then(|m| m.get(key.as_str())) {
                        *key = short.clone();
                        self.changed = true;
                    }
                } else {
                    self.rewrite_expression(index);
                }
                self.rewrite_expression(base);
            }
            ExpressionKind::Identifier(_)
            | ExpressionKind::Literal(_)
            | ExpressionKind::Vararg => {}
            ExpressionKind::Binary(_, left, right) => {
                self.rewrite_expression(left);
                self.rewrite_expression(right);
            }
            ExpressionKind::Unary(_, operand) => self.rewrite_expression(operand),
            ExpressionKind::Call(base, args) => {
                self.rewrite_expression(base);
                for arg in args {
                    self.rewrite_expression(arg);
                }
            }
            ExpressionKind::TableCall(base, table) => {
                self.rewrite_expression(base);
                self.rewrite_expression(table);
            }
            ExpressionKind::StringCall(base, argument) => {
                self.rewrite_expression(base);
                self.rewrite_expression(argument);
            }
            ExpressionKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(value) | TableField::Named(_, value) => {
                            self.rewrite_expression(value)
                        }
                        TableField::Computed(key, value) => {
                            self.rewrite_expression(key);
                            self.rewrite_expression(value);
                        }
                    }
                }
            }
            ExpressionKind::Function(_) => {}
        }
    }

    fn base_mapping(&self, base: &Expression) -> Option<&FxHashMap<String, String>> {
        let ExpressionKind::Identifier(name) = &base.kind else {
            return None;
        };
        self.maps.get(name.as_str())
    }
}

/// Applies `visit` to every top-level expression slot of the statement,
/// without descending into nested blocks.
fn for_each_block_expression_mut(stmt: &mut Statement, visit: &mut impl FnMut(&mut Expression)) {
    match stmt {
        Statement::LocalDecl(decl) => {
            for init in &mut decl.initializers {
                visit(init);
            }
        }
        Statement::Assign(assign) => {
            for target in &mut assign.targets {
                visit(target);
            }
            for value in &mut assign.values {
                visit(value);
            }
        }
        Statement::Call(expr) => visit(expr),
        Statement::Return(ret) => {
            for value in &mut ret.values {
                visit(value);
            }
        }
        Statement::If(if_stmt) => {
            for clause in &mut if_stmt.clauses {
                visit(&mut clause.condition);
            }
        }
        Statement::While(while_stmt) => visit(&mut while_stmt.condition),
        Statement::Repeat(repeat_stmt) => visit(&mut repeat_stmt.condition),
        Statement::ForNumeric(for_stmt) => {
            visit(&mut for_stmt.start);
            visit(&mut for_stmt.end);
            if let Some(step) = &mut for_stmt.step {
                visit(step);
            }
        }
        Statement::ForGeneric(for_stmt) => {
            for iterator in &mut for_stmt.iterators {
                visit(iterator);
            }
        }
        Statement::Break(_) | Statement::FunctionDecl(_) | Statement::Do(_) => {}
    }
}

fn for_each_expression(stmt: &Statement, visit: &mut impl FnMut(&Expression)) {
    fn walk(expr: &Expression, visit: &mut impl FnMut(&Expression)) {
        visit(expr);
        match &expr.kind {
            ExpressionKind::Binary(_, left, right) => {
                walk(left, visit);
                walk(right, visit);
            }
            ExpressionKind::Unary(_, operand) => walk(operand, visit),
            ExpressionKind::Member(base, _) => walk(base, visit),
            ExpressionKind::Index(base, index) => {
                walk(base, visit);
                walk(index, visit);
            }
            ExpressionKind::Call(base, args) => {
                walk(base, visit);
                for arg in args {
                    walk(arg, visit);
                }
            }
            ExpressionKind::MethodCall(base, _, args) => {
                walk(base, visit);
                for arg in args {
                    walk(arg, visit);
                }
            }
            ExpressionKind::TableCall(base, table) => {
                walk(base, visit);
                walk(table, visit);
            }
            ExpressionKind::StringCall(base, argument) => {
                walk(base, visit);
                walk(argument, visit);
            }
            ExpressionKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(value) | TableField::Named(_, value) => {
                            walk(value, visit)
                        }
                        TableField::Computed(key, value) => {
                            walk(key, visit);
                            walk(value, visit);
                        }
                    }
                }
            }
            ExpressionKind::Identifier(_)
            | ExpressionKind::Literal(_)
            | ExpressionKind::Vararg => {}
            ExpressionKind::Function(_) => {}
        }
    }
    for_each_block_expression(stmt, &mut |expr| walk(expr, visit));
}

fn for_each_block_expression(stmt: &Statement, visit: &mut impl FnMut(&Expression)) {
    match stmt {
        Statement::LocalDecl(decl) => {
            for init in &decl.initializers {
                visit(init);
            }
        }
        Statement::Assign(assign) => {
            for target in &assign.targets {
                visit(target);
            }
            for value in &assign.values {
                visit(value);
            }
        }
        Statement::Call(expr) => visit(expr),
        Statement::Return(ret) => {
            for value in &ret.values {
                visit(value);
            }
        }
        Statement::If(if_stmt) => {
            for clause in &if_stmt.clauses {
                visit(&clause.condition);
            }
        }
        Statement::While(while_stmt) => visit(&while_stmt.condition),
        Statement::Repeat(repeat_stmt) => visit(&repeat_stmt.condition),
        Statement::ForNumeric(for_stmt) => {
            visit(&for_stmt.start);
            visit(&for_stmt.end);
            if let Some(step) = &for_stmt.step {
                visit(step);
            }
        }
        Statement::ForGeneric(for_stmt) => {
            for iterator in &for_stmt.iterators {
                visit(iterator);
            }
        }
        Statement::Break(_) | Statement::FunctionDecl(_) | Statement::Do(_) => {}
    }
}

/// Walks every expression in the block, including nested blocks, read-only.
fn visit_expressions(block: &Block, visit: &mut impl FnMut(&Expression)) {
    for stmt in &block.statements {
        for_each_expression(stmt, visit);
        for nested in super::dead_functions::nested_blocks(stmt) {
            visit_expressions(nested, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(source: &str, keys: Vec<String>) -> Chunk {
        let mut chunk = parse(source).expect("parse failed");
        TableKeyRenamePass::new(keys).run(&mut chunk);
        chunk
    }

    fn run_inferred(source: &str) -> Chunk {
        run(source, Vec::new())
    }

    fn constructor_keys(chunk: &Chunk, index: usize) -> Vec<String> {
        let Statement::LocalDecl(decl) = &chunk.block.statements[index] else {
            panic!("expected a local declaration");
        };
        let ExpressionKind::Table(fields) = &decl.initializers[0].kind else {
            panic!("expected a table constructor");
        };
        fields
            .iter()
            .map(|field| match field {
                TableField::Named(name, _) => name.node.clone(),
                other => panic!("expected a named field, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn inferred_candidate_gets_short_keys() {
        let chunk = run_inferred(
            "local cfg={width=10,height=20} print(cfg.width+cfg.height)",
        );
        assert_eq!(constructor_keys(&chunk, 0), vec!["a", "b"]);
        let Statement::Call(call) = &chunk.block.statements[1] else {
            panic!("expected a call");
        };
        let ExpressionKind::Call(_, args) = &call.kind else {
            panic!("expected a call expression");
        };
        let ExpressionKind::Binary(_, left, right) = &args[0].kind else {
            panic!("expected a binary expression");
        };
        let ExpressionKind::Member(_, width) = &left.kind else {
            panic!("expected a member access");
        };
        let ExpressionKind::Member(_, height) = &right.kind else {
            panic!("expected a member access");
        };
        assert_eq!(width.node, "a");
        assert_eq!(height.node, "b");
    }

    #[test]
    fn bare_read_escapes_and_disqualifies() {
        let chunk = run_inferred("local cfg={width=10} register(cfg) print(cfg.width)");
        assert_eq!(constructor_keys(&chunk, 0), vec!["width"]);
    }

    #[test]
    fn non_literal_index_disqualifies() {
        let chunk = run_inferred("local cfg={width=10} local k='width' print(cfg[k])");
        assert_eq!(constructor_keys(&chunk, 0), vec!["width"]);
    }

    #[test]
    fn access_inside_nested_function_disqualifies() {
        let chunk = run_inferred(
            "local cfg={width=10} local function get() return cfg.width end print(get())",
        );
        assert_eq!(constructor_keys(&chunk, 0), vec!["width"]);
    }

    #[test]
    fn literal_string_index_counts_as_a_key() {
        let chunk = run_inferred("local cfg={width=10} print(cfg['width'])");
        assert_eq!(constructor_keys(&chunk, 0), vec!["a"]);
        let Statement::Call(call) = &chunk.block.statements[1] else {
            panic!("expected a call");
        };
        let ExpressionKind::Call(_, args) = &call.kind else {
            panic!("expected a call expression");
        };
        let ExpressionKind::Index(_, index) = &args[0].kind else {
            panic!("expected an index access");
        };
        assert!(matches!(
            &index.kind,
            ExpressionKind::Literal(Literal::String(key)) if key == "a"
        ));
    }

    #[test]
    fn rebinding_the_name_disqualifies() {
        let chunk = run_inferred("local cfg={width=10} print(cfg.width) cfg=other");
        assert_eq!(constructor_keys(&chunk, 0), vec!["width"]);
    }

    #[test]
    fn explicit_keys_rename_without_analysis() {
        let chunk = run(
            "register({position=1}) print(obj.position)",
            vec!["position".to_string()],
        );
        let Statement::Call(call) = &chunk.block.statements[1] else {
            panic!("expected a call");
        };
        let ExpressionKind::Call(_, args) = &call.kind else {
            panic!("expected a call expression");
        };
        let ExpressionKind::Member(_, key) = &args[0].kind else {
            panic!("expected a member access");
        };
        assert_eq!(key.node, "a");
    }

    #[test]
    fn explicit_rename_avoids_existing_keys() {
        // `a` is already in use as a key elsewhere; the generated name
        // must skip it.
        let chunk = run("print(t.a) print(t.position)", vec!["position".to_string()]);
        let Statement::Call(call) = &chunk.block.statements[1] else {
            panic!("expected a call");
        };
        let ExpressionKind::Call(_, args) = &call.kind else {
            panic!("expected a call expression");
        };
        let ExpressionKind::Member(_, key) = &args[0].kind else {
            panic!("expected a member access");
        };
        assert_eq!(key.node, "b");
    }
}
