use super::{Parser, ParserError};
use crate::ast::expression::{Expression, ExpressionKind, FunctionBody};
use crate::ast::statement::*;
use crate::ast::Block;
use crate::lexer::TokenKind;

impl Parser {
    pub(super) fn parse_statement(&mut self) -> Result<Statement, ParserError> {
        match &self.current().kind {
            TokenKind::Local => self.parse_local(),
            TokenKind::Function => self.parse_function_declaration(false),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Repeat => self.parse_repeat_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Do => {
                let start = self.current_span();
                self.advance();
                let body = self.parse_block()?;
                self.consume(TokenKind::End, "expected 'end' to close 'do'")?;
                let span = start.combine(&self.previous_span());
                Ok(Statement::Do(DoStatement { body, span }))
            }
            TokenKind::Break => {
                let span = self.current_span();
                self.advance();
                Ok(Statement::Break(span))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_local(&mut self) -> Result<Statement, ParserError> {
        let start = self.current_span();
        self.advance();

        if self.check(&TokenKind::Function) {
            self.advance();
            let name = self.consume_name("expected function name after 'local function'")?;
            let body = self.parse_function_body()?;
            let span = start.combine(&self.previous_span());
            return Ok(Statement::FunctionDecl(FunctionDeclaration {
                target: FunctionTarget::Name(name),
                is_local: true,
                body,
                span,
            }));
        }

        let mut names = vec![self.consume_name("expected variable name after 'local'")?];
        while self.match_token(&TokenKind::Comma) {
            names.push(self.consume_name("expected variable name after ','")?);
        }

        let mut initializers = Vec::new();
        if self.match_token(&TokenKind::Assign) {
            initializers.push(self.parse_expression()?);
            while self.match_token(&TokenKind::Comma) {
                initializers.push(self.parse_expression()?);
            }
        }

        let span = start.combine(&self.previous_span());
        Ok(Statement::LocalDecl(LocalDeclaration {
            names,
            initializers,
            span,
        }))
    }

    fn parse_function_declaration(&mut self, _is_local: bool) -> Result<Statement, ParserError> {
        let start = self.current_span();
        self.advance();

        let mut path = vec![self.consume_name("expected function name")?];
        while self.match_token(&TokenKind::Dot) {
            path.push(self.consume_name("expected name after '.'")?);
        }
        let method = if self.match_token(&TokenKind::Colon) {
            Some(self.consume_name("expected method name after ':'")?)
        } else {
            None
        };

        let mut body = self.parse_function_body()?;
        let target = match method {
            Some(method_name) => {
                // `function a:m()` declares an implicit leading self.
                body.parameters.insert(
                    0,
                    crate::ast::Spanned::new("self".to_string(), method_name.span),
                );
                FunctionTarget::Method(path, method_name)
            }
            None if path.len() == 1 => {
                let name = path.into_iter().next().expect("path has one segment");
                FunctionTarget::Name(name)
            }
            None => FunctionTarget::Path(path),
        };

        let span = start.combine(&self.previous_span());
        Ok(Statement::FunctionDecl(FunctionDeclaration {
            target,
            is_local: false,
            body,
            span,
        }))
    }

    pub(super) fn parse_function_body(&mut self) -> Result<FunctionBody, ParserError> {
        let start = self.current_span();
        self.consume(TokenKind::LeftParen, "expected '(' to open parameter list")?;

        let mut parameters = Vec::new();
        let mut is_vararg = false;
        if !self.check(&TokenKind::RightParen) {
            loop {
                if self.match_token(&TokenKind::Ellipsis) {
                    is_vararg = true;
                    break;
                }
                parameters.push(self.consume_name("expected parameter name")?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' to close parameter list")?;

        let body = self.parse_block()?;
        self.consume(TokenKind::End, "expected 'end' to close function")?;
        let span = start.combine(&self.previous_span());
        Ok(FunctionBody {
            parameters,
            is_vararg,
            body,
            span,
        })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ParserError> {
        let start = self.current_span();
        self.advance();

        let mut clauses = Vec::new();
        loop {
            let clause_start = self.previous_span();
            let condition = self.parse_expression()?;
            self.consume(TokenKind::Then, "expected 'then' after condition")?;
            let block = self.parse_block()?;
            let span = clause_start.combine(&self.previous_span());
            clauses.push(IfClause {
                condition,
                block,
                span,
            });
            if !self.match_token(&TokenKind::ElseIf) {
                break;
            }
        }

        let else_block = if self.match_token(&TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };

        self.consume(TokenKind::End, "expected 'end' to close 'if'")?;
        let span = start.combine(&self.previous_span());
        Ok(Statement::If(IfStatement {
            clauses,
            else_block,
            span,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ParserError> {
        let start = self.current_span();
        self.advance();
        let condition = self.parse_expression()?;
        self.consume(TokenKind::Do, "expected 'do' after 'while' condition")?;
        let body = self.parse_block()?;
        self.consume(TokenKind::End, "expected 'end' to close 'while'")?;
        let span = start.combine(&self.previous_span());
        Ok(Statement::While(WhileStatement {
            condition,
            body,
            span,
        }))
    }

    fn parse_repeat_statement(&mut self) -> Result<Statement, ParserError> {
        let start = self.current_span();
        self.advance();
        let body = self.parse_block()?;
        self.consume(TokenKind::Until, "expected 'until' to close 'repeat'")?;
        let condition = self.parse_expression()?;
        let span = start.combine(&self.previous_span());
        Ok(Statement::Repeat(RepeatStatement {
            body,
            condition,
            span,
        }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, ParserError> {
        let start = self.current_span();
        self.advance();

        let first = self.consume_name("expected loop variable after 'for'")?;

        if self.match_token(&TokenKind::Assign) {
            let start_expr = self.parse_expression()?;
            self.consume(TokenKind::Comma, "expected ',' after numeric 'for' start")?;
            let end_expr = self.parse_expression()?;
            let step = if self.match_token(&TokenKind::Comma) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.consume(TokenKind::Do, "expected 'do' after 'for' header")?;
            let body = self.parse_block()?;
            self.consume(TokenKind::End, "expected 'end' to close 'for'")?;
            let span = start.combine(&self.previous_span());
            return Ok(Statement::ForNumeric(NumericForStatement {
                variable: first,
                start: start_expr,
                end: end_expr,
                step,
                body,
                span,
            }));
        }

        let mut variables = vec![first];
        while self.match_token(&TokenKind::Comma) {
            variables.push(self.consume_name("expected loop variable after ','")?);
        }
        self.consume(TokenKind::In, "expected '=' or 'in' in 'for' header")?;
        let mut iterators = vec![self.parse_expression()?];
        while self.match_token(&TokenKind::Comma) {
            iterators.push(self.parse_expression()?);
        }
        self.consume(TokenKind::Do, "expected 'do' after 'for' header")?;
        let body = self.parse_block()?;
        self.consume(TokenKind::End, "expected 'end' to close 'for'")?;
        let span = start.combine(&self.previous_span());
        Ok(Statement::ForGeneric(GenericForStatement {
            variables,
            iterators,
            body,
            span,
        }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParserError> {
        let start = self.current_span();
        self.advance();

        let mut values = Vec::new();
        if !self.is_at_end() && !self.at_block_end() && !self.check(&TokenKind::Semicolon) {
            values.push(self.parse_expression()?);
            while self.match_token(&TokenKind::Comma) {
                values.push(self.parse_expression()?);
            }
        }

        let span = start.combine(&self.previous_span());
        Ok(Statement::Return(ReturnStatement { values, span }))
    }

    /// Call statements and (possibly multi-target) assignments both start
    /// with a prefix expression.
    fn parse_expression_statement(&mut self) -> Result<Statement, ParserError> {
        let start = self.current_span();
        let first = self.parse_prefix_expression()?;

        if self.check(&TokenKind::Assign) || self.check(&TokenKind::Comma) {
            let mut targets = vec![first];
            while self.match_token(&TokenKind::Comma) {
                targets.push(self.parse_prefix_expression()?);
            }
            for target in &targets {
                if !is_assignable(target) {
                    return Err(ParserError {
                        message: "cannot assign to this expression".to_string(),
                        span: target.span,
                    });
                }
            }
            self.consume(TokenKind::Assign, "expected '=' in assignment")?;
            let mut values = vec![self.parse_expression()?];
            while self.match_token(&TokenKind::Comma) {
                values.push(self.parse_expression()?);
            }
            let span = start.combine(&self.previous_span());
            return Ok(Statement::Assign(Assignment {
                targets,
                values,
                span,
            }));
        }

        match first.kind {
            ExpressionKind::Call(_, _)
            | ExpressionKind::MethodCall(_, _, _)
            | ExpressionKind::TableCall(_, _)
            | ExpressionKind::StringCall(_, _) => Ok(Statement::Call(first)),
            _ => Err(ParserError {
                message: "expression is not a statement".to_string(),
                span: first.span,
            }),
        }
    }

    pub(super) fn at_block_end(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::End | TokenKind::Else | TokenKind::ElseIf | TokenKind::Until
        )
    }
}

fn is_assignable(expr: &Expression) -> bool {
    matches!(
        expr.kind,
        ExpressionKind::Identifier(_) | ExpressionKind::Member(_, _) | ExpressionKind::Index(_, _)
    )
}
