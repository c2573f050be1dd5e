//! Statement rendering: the token stream the tight packer consumes, the
//! inline form, and the structural block form used by pretty printing.

use super::{needs_space, CodeGenerator};
use crate::ast::statement::{FunctionDeclaration, FunctionTarget, Statement};
use crate::ast::Block;
use crate::config::LinePacking;

impl CodeGenerator {
    /// Flatten one statement into tokens. Expressions are single tokens;
    /// statement keywords and punctuation are their own tokens so the tight
    /// packer can break lines between them.
    pub(crate) fn statement_tokens(&self, stmt: &Statement) -> Vec<String> {
        let mut tokens = Vec::new();
        self.push_statement_tokens(stmt, &mut tokens);
        tokens
    }

    fn push_statement_tokens(&self, stmt: &Statement, out: &mut Vec<String>) {
        match stmt {
            Statement::LocalDecl(decl) => {
                out.push("local".to_string());
                for (i, name) in decl.names.iter().enumerate() {
                    if i > 0 {
                        out.push(",".to_string());
                    }
                    out.push(name.node.clone());
                }
                if !decl.initializers.is_empty() {
                    out.push("=".to_string());
                    for (i, init) in decl.initializers.iter().enumerate() {
                        if i > 0 {
                            out.push(",".to_string());
                        }
                        out.push(self.expression_text(init));
                    }
                }
            }
            Statement::Assign(assign) => {
                for (i, target) in assign.targets.iter().enumerate() {
                    if i > 0 {
                        out.push(",".to_string());
                    }
                    out.push(self.expression_text(target));
                }
                out.push("=".to_string());
                for (i, value) in assign.values.iter().enumerate() {
                    if i > 0 {
                        out.push(",".to_string());
                    }
                    out.push(self.expression_text(value));
                }
            }
            Statement::Call(expr) => out.push(self.expression_text(expr)),
            Statement::Return(ret) => {
                out.push("return".to_string());
                for (i, value) in ret.values.iter().enumerate() {
                    if i > 0 {
                        out.push(",".to_string());
                    }
                    out.push(self.expression_text(value));
                }
            }
            Statement::Break(_) => out.push("break".to_string()),
            Statement::If(if_stmt) => {
                for (i, clause) in if_stmt.clauses.iter().enumerate() {
                    out.push(if i == 0 { "if" } else { "elseif" }.to_string());
                    out.push(self.expression_text(&clause.condition));
                    out.push("then".to_string());
                    self.push_block_tokens(&clause.block, out);
                }
                if let Some(else_block) = &if_stmt.else_block {
                    out.push("else".to_string());
                    self.push_block_tokens(else_block, out);
                }
                out.push("end".to_string());
            }
            Statement::While(while_stmt) => {
                out.push("while".to_string());
                out.push(self.expression_text(&while_stmt.condition));
                out.push("do".to_string());
                self.push_block_tokens(&while_stmt.body, out);
                out.push("end".to_string());
            }
            Statement::Repeat(repeat_stmt) => {
                out.push("repeat".to_string());
                self.push_block_tokens(&repeat_stmt.body, out);
                out.push("until".to_string());
                out.push(self.expression_text(&repeat_stmt.condition));
            }
            Statement::ForNumeric(for_stmt) => {
                out.push("for".to_string());
                out.push(for_stmt.variable.node.clone());
                out.push("=".to_string());
                out.push(self.expression_text(&for_stmt.start));
                out.push(",".to_string());
                out.push(self.expression_text(&for_stmt.end));
                if let Some(step) = &for_stmt.step {
                    out.push(",".to_string());
                    out.push(self.expression_text(step));
                }
                out.push("do".to_string());
                self.push_block_tokens(&for_stmt.body, out);
                out.push("end".to_string());
            }
            Statement::ForGeneric(for_stmt) => {
                out.push("for".to_string());
                for (i, variable) in for_stmt.variables.iter().enumerate() {
                    if i > 0 {
                        out.push(",".to_string());
                    }
                    out.push(variable.node.clone());
                }
                out.push("in".to_string());
                for (i, iterator) in for_stmt.iterators.iter().enumerate() {
                    if i > 0 {
                        out.push(",".to_string());
                    }
                    out.push(self.expression_text(iterator));
                }
                out.push("do".to_string());
                self.push_block_tokens(&for_stmt.body, out);
                out.push("end".to_string());
            }
            Statement::FunctionDecl(decl) => {
                if decl.is_local {
                    out.push("local".to_string());
                }
                out.push("function".to_string());
                out.push(function_target_text(decl));
                out.push(format!(
                    "({})",
                    self.parameter_text(&declared_parameters(decl), decl.body.is_vararg)
                ));
                self.push_block_tokens(&decl.body.body, out);
                out.push("end".to_string());
            }
            Statement::Do(do_stmt) => {
                out.push("do".to_string());
                self.push_block_tokens(&do_stmt.body, out);
                out.push("end".to_string());
            }
        }
    }

    fn push_block_tokens(&self, block: &Block, out: &mut Vec<String>) {
        for (i, stmt) in block.statements.iter().enumerate() {
            let before = out.len();
            self.push_statement_tokens(stmt, out);
            if i > 0 && out[before].starts_with('(') {
                out.insert(before, ";".to_string());
            }
        }
    }

    /// One statement as a single line of text.
    pub(crate) fn statement_inline(&self, stmt: &Statement) -> String {
        join_tokens(&self.statement_tokens(stmt))
    }

    /// A whole block inline, statements joined by the minimal separator.
    pub(crate) fn block_inline(&self, block: &Block) -> String {
        let mut out = String::new();
        for stmt in &block.statements {
            let text = self.statement_inline(stmt);
            if !out.is_empty() {
                if text.starts_with('(') {
                    out.push(';');
                } else if out.chars().last().is_some_and(|last| needs_space(last, &text)) {
                    out.push(' ');
                }
            }
            out.push_str(&text);
        }
        out
    }

    pub(crate) fn write_statement(&mut self, stmt: &Statement, level: usize, first_in_block: bool) {
        if self.mode == LinePacking::Pretty {
            self.flush_comments_before(stmt.span().start, level);
        }
        if self.mode == LinePacking::SingleLineBlocks {
            let inline = self.guarded_inline(stmt, first_in_block);
            if self.indent_width(level) + inline.len() <= self.max_line_length {
                self.write_line(&inline, level);
                return;
            }
        }
        match stmt {
            Statement::If(if_stmt) => {
                for (i, clause) in if_stmt.clauses.iter().enumerate() {
                    let keyword = if i == 0 { "if" } else { "elseif" };
                    let condition = self.expression_text(&clause.condition);
                    self.write_line(&format!("{} {} then", keyword, condition), level);
                    self.write_block(&clause.block, level + 1);
                }
                if let Some(else_block) = &if_stmt.else_block {
                    self.write_line("else", level);
                    self.write_block(else_block, level + 1);
                }
                self.write_line("end", level);
            }
            Statement::While(while_stmt) => {
                let condition = self.expression_text(&while_stmt.condition);
                self.write_line(&format!("while {} do", condition), level);
                self.write_block(&while_stmt.body, level + 1);
                self.write_line("end", level);
            }
            Statement::Repeat(repeat_stmt) => {
                self.write_line("repeat", level);
                self.write_block(&repeat_stmt.body, level + 1);
                let condition = self.expression_text(&repeat_stmt.condition);
                self.write_line(&format!("until {}", condition), level);
            }
            Statement::ForNumeric(for_stmt) => {
                let mut header = format!(
                    "for {}={},{}",
                    for_stmt.variable.node,
                    self.expression_text(&for_stmt.start),
                    self.expression_text(&for_stmt.end)
                );
                if let Some(step) = &for_stmt.step {
                    header.push(',');
                    header.push_str(&self.expression_text(step));
                }
                header.push_str(" do");
                self.write_line(&header, level);
                self.write_block(&for_stmt.body, level + 1);
                self.write_line("end", level);
            }
            Statement::ForGeneric(for_stmt) => {
                let variables: Vec<&str> =
                    for_stmt.variables.iter().map(|v| v.node.as_str()).collect();
                let header = format!(
                    "for {} in {} do",
                    variables.join(","),
                    self.list_text(&for_stmt.iterators)
                );
                self.write_line(&header, level);
                self.write_block(&for_stmt.body, level + 1);
                self.write_line("end", level);
            }
            Statement::FunctionDecl(decl) => {
                let prefix = if decl.is_local { "local function" } else { "function" };
                let header = format!(
                    "{} {}({})",
                    prefix,
                    function_target_text(decl),
                    self.parameter_text(&declared_parameters(decl), decl.body.is_vararg)
                );
                self.write_line(&header, level);
                self.write_block(&decl.body.body, level + 1);
                self.write_line("end", level);
            }
            Statement::Do(do_stmt) => {
                self.write_line("do", level);
                self.write_block(&do_stmt.body, level + 1);
                self.write_line("end", level);
            }
            _ => {
                let inline = self.guarded_inline(stmt, first_in_block);
                self.write_line(&inline, level);
            }
        }
    }

    /// Newlines are plain whitespace to the grammar, so a line starting
    /// with `(` would chain onto the previous statement's trailing
    /// expression. A statement opening its block is safe: the header before
    /// it ends in a keyword.
    fn guarded_inline(&self, stmt: &Statement, first_in_block: bool) -> String {
        let mut text = self.statement_inline(stmt);
        if !first_in_block && text.starts_with('(') {
            text.insert(0, ';');
        }
        text
    }

    fn write_block(&mut self, block: &Block, level: usize) {
        for (i, stmt) in block.statements.iter().enumerate() {
            self.write_statement(stmt, level, i == 0);
        }
    }
}

fn join_tokens(tokens: &[String]) -> String {
    let mut out = String::new();
    for token in tokens {
        if let Some(last) = out.chars().last() {
            if needs_space(last, token) {
                out.push(' ');
            }
        }
        out.push_str(token);
    }
    out
}

fn function_target_text(decl: &FunctionDeclaration) -> String {
    match &decl.target {
        FunctionTarget::Name(name) => name.node.clone(),
        FunctionTarget::Path(path) => path
            .iter()
            .map(|p| p.node.as_str())
            .collect::<Vec<_>>()
            .join("."),
        FunctionTarget::Method(path, method) => format!(
            "{}:{}",
            path.iter()
                .map(|p| p.node.as_str())
                .collect::<Vec<_>>()
                .join("."),
            method.node
        ),
    }
}

/// Method declarations carry their implicit `self` in the parameter list;
/// the printed parameter list must not repeat it.
fn declared_parameters(decl: &FunctionDeclaration) -> Vec<crate::ast::Ident> {
    let parameters = &decl.body.parameters;
    match &decl.target {
        FunctionTarget::Method(_, _) if parameters.first().is_some_and(|p| p.node == "self") => {
            parameters[1..].to_vec()
        }
        _ => parameters.clone(),
    }
}
