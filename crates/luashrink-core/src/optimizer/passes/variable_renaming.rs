//! Scope-chain renaming of locals and parameters to short names.
//!
//! Every local binding gets the next name from the deterministic short-name
//! sequence; reads resolve through the scope chain, so a child binding
//! shadows its parent exactly as the original names did. Globals are never
//! touched, and generated names skip every name the program resolves as a
//! global so no read can be captured.
//!
//! Name numbering continues from the enclosing scope's counter, which keeps
//! sibling scopes free to reuse the same short names.

use crate::ast::expression::{Expression, ExpressionKind, TableField};
use crate::ast::statement::{FunctionTarget, Statement};
use crate::ast::{Block, Chunk, Ident};
use crate::optimizer::names::{encode, RESERVED_WORDS};
use crate::optimizer::Pass;
use rustc_hash::{FxHashMap, FxHashSet};

pub struct VariableRenamePass;

impl VariableRenamePass {
    pub fn new() -> Self {
        VariableRenamePass
    }
}

impl Default for VariableRenamePass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for VariableRenamePass {
    fn name(&self) -> &'static str {
        "rename-variables"
    }

    fn run(&mut self, chunk: &mut Chunk) -> bool {
        let mut globals = collect_globals(chunk);
        // The implicit method receiver keeps its name.
        globals.insert("self".to_string());

        let mut renamer = Renamer {
            scopes: vec![FxHashMap::default()],
            next_index: vec![0],
            globals,
            changed: false,
        };
        renamer.rename_block(&mut chunk.block);
        renamer.changed
    }
}

struct Renamer {
    /// Innermost scope last; maps original name to generated name.
    scopes: Vec<FxHashMap<String, String>>,
    /// Next short-name index per scope; children continue from the parent.
    next_index: Vec<usize>,
    globals: FxHashSet<String>,
    changed: bool,
}

impl Renamer {
    fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
        let inherited = self.next_index.last().copied().unwrap_or(0);
        self.next_index.push(inherited);
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
        self.next_index.pop();
    }

    fn lookup(&self, name: &str) -> Option<&String> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn fresh_name(&mut self) -> String {
        loop {
            let index = self.next_index.last_mut().expect("scope stack is never empty");
            let name = encode(*index);
            *index += 1;
            if RESERVED_WORDS.contains(&name.as_str()) || self.globals.contains(&name) {
                continue;
            }
            return name;
        }
    }

    fn declare(&mut self, ident: &mut Ident) {
        let new_name = self.fresh_name();
        if new_name != ident.node {
            self.changed = true;
        }
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .insert(std::mem::replace(&mut ident.node, new_name.clone()), new_name);
    }

    /// The receiver of a method declaration is bound implicitly by the
    /// printed `function t:m` form and must keep its name.
    fn declare_parameters(&mut self, parameters: &mut [Ident]) {
        for parameter in parameters {
            if parameter.node == "self" {
                continue;
            }
            self.declare(parameter);
        }
    }

    fn rename_block(&mut self, block: &mut Block) {
        for stmt in &mut block.statements {
            self.rename_statement(stmt);
        }
    }

    fn rename_statement(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::LocalDecl(decl) => {
                // Initializers resolve in the pre-declaration scope: a
                // local never sees its own new name in its initializer.
                for init in &mut decl.initializers {
                    self.rename_expression(init);
                }
                for name in &mut decl.names {
                    self.declare(name);
                }
            }
            Statement::Assign(assign) => {
                for target in &mut assign.targets {
                    self.rename_expression(target);
                }
                for value in &mut assign.values {
                    self.rename_expression(value);
                }
            }
            Statement::Call(expr) => self.rename_expression(expr),
            Statement::Return(ret) => {
                for value in &mut ret.values {
                    self.rename_expression(value);
                }
            }
            Statement::Break(_) => {}
            Statement::If(if_stmt) => {
                for clause in &mut if_stmt.clauses {
                    self.rename_expression(&mut clause.condition);
                    self.push_scope();
                    self.rename_block(&mut clause.block);
                    self.pop_scope();
                }
                if let Some(else_block) = &mut if_stmt.else_block {
                    self.push_scope();
                    self.rename_block(else_block);
                    self.pop_scope();
                }
            }
            Statement::While(while_stmt) => {
                self.rename_expression(&mut while_stmt.condition);
                self.push_scope();
                self.rename_block(&mut while_stmt.body);
                self.pop_scope();
            }
            Statement::Repeat(repeat_stmt) => {
                // The until condition sees the body's bindings.
                self.push_scope();
                self.rename_block(&mut repeat_stmt.body);
                self.rename_expression(&mut repeat_stmt.condition);
                self.pop_scope();
            }
            Statement::ForNumeric(for_stmt) => {
                self.rename_expression(&mut for_stmt.start);
                self.rename_expression(&mut for_stmt.end);
                if let Some(step) = &mut for_stmt.step {
                    self.rename_expression(step);
                }
                self.push_scope();
                self.declare(&mut for_stmt.variable);
                self.rename_block(&mut for_stmt.body);
                self.pop_scope();
            }
            Statement::ForGeneric(for_stmt) => {
                for iterator in &mut for_stmt.iterators {
                    self.rename_expression(iterator);
                }
                self.push_scope();
                for variable in &mut for_stmt.variables {
                    self.declare(variable);
                }
                self.rename_block(&mut for_stmt.body);
                self.pop_scope();
            }
            Statement::FunctionDecl(decl) => {
                match &mut decl.target {
                    FunctionTarget::Name(name) => {
                        if decl.is_local {
                            // `local function f` binds f before the body,
                            // so recursion resolves to the new name.
                            self.declare(name);
                        }
                    }
                    FunctionTarget::Path(path) | FunctionTarget::Method(path, _) => {
                        if let Some(head) = path.first_mut() {
                            if let Some(new_name) = self.lookup(&head.node) {
                                head.node = new_name.clone();
                                self.changed = true;
                            }
                        }
                    }
                }
                self.push_scope();
                self.declare_parameters(&mut decl.body.parameters);
                self.rename_block(&mut decl.body.body);
                self.pop_scope();
            }
            Statement::Do(do_stmt) => {
                self.push_scope();
                self.rename_block(&mut do_stmt.body);
                self.pop_scope();
            }
        }
    }

    fn rename_expression(&mut self, expr: &mut Expression) {
        match &mut expr.kind {
            ExpressionKind::Identifier(name) => {
                if let Some(new_name) = self.lookup(name) {
                    if *name != *new_name {
                        *name = new_name.clone();
                        self.changed = true;
                    }
                }
            }
            ExpressionKind::Literal(_) | ExpressionKind::Vararg => {}
            ExpressionKind::Binary(_, left, right) => {
                self.rename_expression(left);
                self.rename_expression(right);
            }
            ExpressionKind::Unary(_, operand) => self.rename_expression(operand),
            ExpressionKind::Member(base, _) => self.rename_expression(base),
            ExpressionKind::Index(base, index) => {
                self.rename_expression(base);
                self.rename_expression(index);
            }
            ExpressionKind::Call(base, args) => {
                self.rename_expression(base);
                for arg in args {
                    self.rename_expression(arg);
                }
            }
            ExpressionKind::MethodCall(base, _, args) => {
                self.rename_expression(base);
                for arg in args {
                    self.rename_expression(arg);
                }
            }
            ExpressionKind::TableCall(base, table) => {
                self.rename_expression(base);
                self.rename_expression(table);
            }
            ExpressionKind::StringCall(base, argument) => {
                self.rename_expression(base);
                self.rename_expression(argument);
            }
            ExpressionKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(value) | TableField::Named(_, value) => {
                            self.rename_expression(value)
                        }
                        TableField::Computed(key, value) => {
                            self.rename_expression(key);
                            self.rename_expression(value);
                        }
                    }
                }
            }
            ExpressionKind::Function(body) => {
                self.push_scope();
                self.declare_parameters(&mut body.parameters);
                self.rename_block(&mut body.body);
                self.pop_scope();
            }
        }
    }
}

/// Every identifier the program resolves to no local binding, found by the
/// same scope-chain walk the renamer performs.
fn collect_globals(chunk: &Chunk) -> FxHashSet<String> {
    let mut scanner = GlobalScanner {
        scopes: vec![FxHashSet::default()],
        globals: FxHashSet::default(),
    };
    scanner.scan_block(&chunk.block);
    scanner.globals
}

struct GlobalScanner {
    scopes: Vec<FxHashSet<String>>,
    globals: FxHashSet<String>,
}

impl GlobalScanner {
    fn push_scope(&mut self) {
        self.scopes.push(FxHashSet::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .insert(name.to_string());
    }

    fn reference(&mut self, name: &str) {
        let bound = self.scopes.iter().rev().any(|scope| scope.contains(name));
        if !bound {
            self.globals.insert(name.to_string());
        }
    }

    fn scan_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.scan_statement(stmt);
        }
    }

    fn scan_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::LocalDecl(decl) => {
                for init in &decl.initializers {
                    self.scan_expression(init);
                }
                for name in &decl.names {
                    self.declare(&name.node);
                }
            }
            Statement::Assign(assign) => {
                for target in &assign.targets {
                    self.scan_expression(target);
                }
                for value in &assign.values {
                    self.scan_expression(value);
                }
            }
            Statement::Call(expr) => self.scan_expression(expr),
            Statement::Return(ret) => {
                for value in &ret.values {
                    self.scan_expression(value);
                }
            }
            Statement::Break(_) => {}
            Statement::If(if_stmt) => {
                for clause in &if_stmt.clauses {
                    self.scan_expression(&clause.condition);
                    self.push_scope();
                    self.scan_block(&clause.block);
                    self.pop_scope();
                }
                if let Some(else_block) = &if_stmt.else_block {
                    self.push_scope();
                    self.scan_block(else_block);
                    self.pop_scope();
                }
            }
            Statement::While(while_stmt) => {
                self.scan_expression(&while_stmt.condition);
                self.push_scope();
                self.scan_block(&while_stmt.body);
                self.pop_scope();
            }
            Statement::Repeat(repeat_stmt) => {
                self.push_scope();
                self.scan_block(&repeat_stmt.body);
                self.scan_expression(&repeat_stmt.condition);
                self.pop_scope();
            }
            Statement::ForNumeric(for_stmt) => {
                self.scan_expression(&for_stmt.start);
                self.scan_expression(&for_stmt.end);
                if let Some(step) = &for_stmt.step {
                    self.scan_expression(step);
                }
                self.push_scope();
                self.declare(&for_stmt.variable.node);
                self.scan_block(&for_stmt.body);
                self.pop_scope();
            }
            Statement::ForGeneric(for_stmt) => {
                for iterator in &for_stmt.iterators {
                    self.scan_expression(iterator);
                }
                self.push_scope();
                for variable in &for_stmt.variables {
                    self.declare(&variable.node);
                }
                self.scan_block(&for_stmt.body);
                self.pop_scope();
            }
            Statement::FunctionDecl(decl) => {
                match &decl.target {
                    FunctionTarget::Name(name) => {
                        if decl.is_local {
                            self.declare(&name.node);
                        } else {
                            self.reference(&name.node);
                        }
                    }
                    FunctionTarget::Path(path) | FunctionTarget::Method(path, _) => {
                        if let Some(head) = path.first() {
                            self.reference(&head.node);
                        }
                    }
                }
                self.push_scope();
                for parameter in &decl.body.parameters {
                    self.declare(&parameter.node);
                }
                self.scan_block(&decl.body.body);
                self.pop_scope();
            }
            Statement::Do(do_stmt) => {
                self.push_scope();
                self.scan_block(&do_stmt.body);
                self.pop_scope();
            }
        }
    }

    fn scan_expression(&mut self, expr: &Expression) {
        match &expr.kind {
            ExpressionKind::Identifier(name) => self.reference(name),
            ExpressionKind::Literal(_) | ExpressionKind::Vararg => {}
            ExpressionKind::Binary(_, left, right) => {
                self.scan_expression(left);
                self.scan_expression(right);
            }
            ExpressionKind::Unary(_, operand) => self.scan_expression(operand),
            ExpressionKind::Member(base, _) => self.scan_expression(base),
            ExpressionKind::Index(base, index) => {
                self.scan_expression(base);
                self.scan_expression(index);
            }
            ExpressionKind::Call(base, args) => {
                self.scan_expression(base);
                for arg in args {
                    self.scan_expression(arg);
                }
            }
            ExpressionKind::MethodCall(base, _, args) => {
                self.scan_expression(base);
                for arg in args {
                    self.scan_expression(arg);
                }
            }
            ExpressionKind::TableCall(base, table) => {
                self.scan_expression(base);
                self.scan_expression(table);
            }
            ExpressionKind::StringCall(base, argument) => {
                self.scan_expression(base);
                self.scan_expression(argument);
            }
            ExpressionKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(value) | TableField::Named(_, value) => {
                            self.scan_expression(value)
                        }
                        TableField::Computed(key, value) => {
                            self.scan_expression(key);
                            self.scan_expression(value);
                        }
                    }
                }
            }
            ExpressionKind::Function(body) => {
                self.push_scope();
                for parameter in &body.parameters {
                    self.declare(&parameter.node);
                }
                self.scan_block(&body.body);
                self.pop_scope();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn rename(source: &str) -> Chunk {
        let mut chunk = parse(source).expect("parse failed");
        VariableRenamePass::new().run(&mut chunk);
        chunk
    }

    fn first_local_name(chunk: &Chunk) -> &str {
        match &chunk.block.statements[0] {
            Statement::LocalDecl(decl) => &decl.names[0].node,
            _ => panic!("expected a local declaration"),
        }
    }

    #[test]
    fn locals_get_sequential_short_names() {
        let chunk = rename("local first=1 local second=first");
        assert_eq!(first_local_name(&chunk), "a");
        let Statement::LocalDecl(second) = &chunk.block.statements[1] else {
            panic!("expected a local declaration");
        };
        assert_eq!(second.names[0].node, "b");
        assert!(matches!(
            &second.initializers[0].kind,
            ExpressionKind::Identifier(n) if n == "a"
        ));
    }

    #[test]
    fn globals_are_untouched() {
        let chunk = rename("score=score+1 print(score)");
        let Statement::Assign(assign) = &chunk.block.statements[0] else {
            panic!("expected an assignment");
        };
        assert!(matches!(
            &assign.targets[0].kind,
            ExpressionKind::Identifier(n) if n == "score"
        ));
    }

    #[test]
    fn generated_names_avoid_read_globals() {
        // Global `a` is read inside the function; the parameter must not
        // capture it.
        let chunk = rename("local function f(x) return x+a end");
        let Statement::FunctionDecl(decl) = &chunk.block.statements[0] else {
            panic!("expected a function declaration");
        };
        assert_ne!(decl.body.parameters[0].node, "a");
    }

    #[test]
    fn initializer_resolves_in_the_pre_declaration_scope() {
        // The inner `local x=x` reads the outer x, not itself.
        let chunk = rename("local x=1 do local x=x print(x) end");
        let Statement::Do(do_stmt) = &chunk.block.statements[1] else {
            panic!("expected a do block");
        };
        let Statement::LocalDecl(inner) = &do_stmt.body.statements[0] else {
            panic!("expected a local declaration");
        };
        let ExpressionKind::Identifier(init) = &inner.initializers[0].kind else {
            panic!("expected an identifier initializer");
        };
        assert_eq!(init, "a");
        assert_ne!(inner.names[0].node, "a");
    }

    #[test]
    fn sibling_scopes_reuse_names() {
        let chunk = rename("do local p=1 print(p) end do local q=2 print(q) end");
        let names: Vec<String> = chunk
            .block
            .statements
            .iter()
            .map(|stmt| match stmt {
                Statement::Do(d) => match &d.body.statements[0] {
                    Statement::LocalDecl(decl) => decl.names[0].node.clone(),
                    _ => panic!("expected a local declaration"),
                },
                _ => panic!("expected a do block"),
            })
            .collect();
        assert_eq!(names, vec!["a", "a"]);
    }

    #[test]
    fn local_function_recursion_uses_the_new_name() {
        let chunk = rename("local function loop(n) if n>0 then loop(n-1) end end");
        let Statement::FunctionDecl(decl) = &chunk.block.statements[0] else {
            panic!("expected a function declaration");
        };
        assert_eq!(decl.simple_name(), Some("a"));
        let Statement::If(if_stmt) = &decl.body.body.statements[0] else {
            panic!("expected an if statement");
        };
        let Statement::Call(call) = &if_stmt.clauses[0].block.statements[0] else {
            panic!("expected a call");
        };
        let ExpressionKind::Call(base, _) = &call.kind else {
            panic!("expected a call expression");
        };
        assert!(matches!(&base.kind, ExpressionKind::Identifier(n) if n == "a"));
    }

    #[test]
    fn renaming_twice_is_structurally_stable() {
        let mut chunk = parse("local alpha=1 do local beta=alpha print(beta) end")
            .expect("parse failed");
        VariableRenamePass::new().run(&mut chunk);
        let once = format!("{:?}", chunk.block);
        VariableRenamePass::new().run(&mut chunk);
        let twice = format!("{:?}", chunk.block);
        assert_eq!(once, twice);
    }
}
