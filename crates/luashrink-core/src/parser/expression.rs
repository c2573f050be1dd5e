use super::{Parser, ParserError};
use crate::ast::expression::*;
use crate::lexer::TokenKind;
use crate::span::Span;

/// Binary operator binding powers, Lua's table. Every left-associative
/// level gets an odd/even pair; right-associative operators (`..`, `^`)
/// carry a right power below their left power so the recursion re-enters at
/// the same level.
fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, u8, u8)> {
    let entry = match kind {
        TokenKind::Or => (BinaryOp::Or, 1, 2),
        TokenKind::And => (BinaryOp::And, 3, 4),
        TokenKind::LessThan => (BinaryOp::LessThan, 5, 6),
        TokenKind::GreaterThan => (BinaryOp::GreaterThan, 5, 6),
        TokenKind::LessThanOrEqual => (BinaryOp::LessThanOrEqual, 5, 6),
        TokenKind::GreaterThanOrEqual => (BinaryOp::GreaterThanOrEqual, 5, 6),
        TokenKind::Equal => (BinaryOp::Equal, 5, 6),
        TokenKind::NotEqual => (BinaryOp::NotEqual, 5, 6),
        TokenKind::Pipe => (BinaryOp::BitOr, 7, 8),
        TokenKind::Tilde => (BinaryOp::BitXor, 9, 10),
        TokenKind::Ampersand => (BinaryOp::BitAnd, 11, 12),
        TokenKind::ShiftLeft => (BinaryOp::ShiftLeft, 13, 14),
        TokenKind::ShiftRight => (BinaryOp::ShiftRight, 13, 14),
        TokenKind::Concat => (BinaryOp::Concatenate, 16, 15),
        TokenKind::Plus => (BinaryOp::Add, 17, 18),
        TokenKind::Minus => (BinaryOp::Subtract, 17, 18),
        TokenKind::Star => (BinaryOp::Multiply, 19, 20),
        TokenKind::Slash => (BinaryOp::Divide, 19, 20),
        TokenKind::Percent => (BinaryOp::Modulo, 19, 20),
        TokenKind::Caret => (BinaryOp::Power, 24, 23),
        _ => return None,
    };
    Some(entry)
}

const UNARY_POWER: u8 = 21;

impl Parser {
    pub(super) fn parse_expression(&mut self) -> Result<Expression, ParserError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_power: u8) -> Result<Expression, ParserError> {
        let mut left = self.parse_unary()?;

        while let Some((op, left_power, right_power)) = binary_op(&self.current().kind) {
            if left_power < min_power {
                break;
            }
            self.advance();
            let right = self.parse_binary(right_power)?;
            let span = left.span.combine(&right.span);
            left = Expression::new(
                ExpressionKind::Binary(op, Box::new(left), Box::new(right)),
                span,
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParserError> {
        let op = match self.current().kind {
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Hash => Some(UnaryOp::Length),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.current_span();
            self.advance();
            let operand = self.parse_binary(UNARY_POWER)?;
            let span = start.combine(&operand.span);
            return Ok(Expression::new(
                ExpressionKind::Unary(op, Box::new(operand)),
                span,
            ));
        }
        self.parse_simple_expression()
    }

    fn parse_simple_expression(&mut self) -> Result<Expression, ParserError> {
        let span = self.current_span();
        match self.current().kind.clone() {
            TokenKind::Nil => {
                self.advance();
                Ok(Expression::literal(Literal::Nil, span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::literal(Literal::Boolean(true), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::literal(Literal::Boolean(false), span))
            }
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expression::literal(Literal::Number(value), span))
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Expression::literal(Literal::String(value), span))
            }
            TokenKind::Ellipsis => {
                self.advance();
                Ok(Expression::new(ExpressionKind::Vararg, span))
            }
            TokenKind::Function => {
                self.advance();
                let body = self.parse_function_body()?;
                let span = span.combine(&self.previous_span());
                Ok(Expression::new(ExpressionKind::Function(body), span))
            }
            TokenKind::LeftBrace => self.parse_table_constructor(),
            _ => self.parse_prefix_expression(),
        }
    }

    /// Prefix expression: a primary (name or parenthesized expression)
    /// followed by any chain of member/index/call suffixes.
    pub(super) fn parse_prefix_expression(&mut self) -> Result<Expression, ParserError> {
        let start = self.current_span();
        let mut expr = match &self.current().kind {
            TokenKind::Name(_) => {
                let name = self.consume_name("expected name")?;
                Expression::identifier(name.node, name.span)
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "expected ')' to close expression")?;
                // Parentheses are not kept as a node; the printer re-derives
                // them from precedence.
                Expression::new(inner.kind, start.combine(&self.previous_span()))
            }
            _ => return Err(self.error_here("expected expression")),
        };

        loop {
            match &self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.consume_name("expected field name after '.'")?;
                    let span = start.combine(&name.span);
                    expr = Expression::new(ExpressionKind::Member(Box::new(expr), name), span);
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.consume(TokenKind::RightBracket, "expected ']' to close index")?;
                    let span = start.combine(&self.previous_span());
                    expr = Expression::new(
                        ExpressionKind::Index(Box::new(expr), Box::new(index)),
                        span,
                    );
                }
                TokenKind::LeftParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RightParen) {
                        args.push(self.parse_expression()?);
                        while self.match_token(&TokenKind::Comma) {
                            args.push(self.parse_expression()?);
                        }
                    }
                    self.consume(TokenKind::RightParen, "expected ')' to close call")?;
                    let span = start.combine(&self.previous_span());
                    expr = Expression::new(ExpressionKind::Call(Box::new(expr), args), span);
                }
                TokenKind::Colon => {
                    self.advance();
                    let method = self.consume_name("expected method name after ':'")?;
                    expr = self.parse_method_call_arguments(expr, method, start)?;
                }
                TokenKind::LeftBrace => {
                    let table = self.parse_table_constructor()?;
                    let span = start.combine(&table.span);
                    expr = Expression::new(
                        ExpressionKind::TableCall(Box::new(expr), Box::new(table)),
                        span,
                    );
                }
                TokenKind::String(value) => {
                    let value = value.clone();
                    let string_span = self.current_span();
                    self.advance();
                    let span = start.combine(&string_span);
                    let argument = Expression::literal(Literal::String(value), string_span);
                    expr = Expression::new(
                        ExpressionKind::StringCall(Box::new(expr), Box::new(argument)),
                        span,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_method_call_arguments(
        &mut self,
        base: Expression,
        method: crate::ast::Ident,
        start: Span,
    ) -> Result<Expression, ParserError> {
        match &self.current().kind {
            TokenKind::LeftParen => {
                self.advance();
                let mut args = Vec::new();
                if !self.check(&TokenKind::RightParen) {
                    args.push(self.parse_expression()?);
                    while self.match_token(&TokenKind::Comma) {
                        args.push(self.parse_expression()?);
                    }
                }
                self.consume(TokenKind::RightParen, "expected ')' to close method call")?;
                let span = start.combine(&self.previous_span());
                Ok(Expression::new(
                    ExpressionKind::MethodCall(Box::new(base), method, args),
                    span,
                ))
            }
            TokenKind::LeftBrace => {
                let table = self.parse_table_constructor()?;
                let span = start.combine(&table.span);
                Ok(Expression::new(
                    ExpressionKind::MethodCall(Box::new(base), method, vec![table]),
                    span,
                ))
            }
            TokenKind::String(value) => {
                let value = value.clone();
                let string_span = self.current_span();
                self.advance();
                let span = start.combine(&string_span);
                let argument = Expression::literal(Literal::String(value), string_span);
                Ok(Expression::new(
                    ExpressionKind::MethodCall(Box::new(base), method, vec![argument]),
                    span,
                ))
            }
            _ => Err(self.error_here("expected arguments after method name")),
        }
    }

    fn parse_table_constructor(&mut self) -> Result<Expression, ParserError> {
        let start = self.current_span();
        self.consume(TokenKind::LeftBrace, "expected '{'")?;

        let mut fields = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let field = match &self.current().kind {
                TokenKind::LeftBracket => {
                    self.advance();
                    let key = self.parse_expression()?;
                    self.consume(TokenKind::RightBracket, "expected ']' after table key")?;
                    self.consume(TokenKind::Assign, "expected '=' after table key")?;
                    let value = self.parse_expression()?;
                    TableField::Computed(key, value)
                }
                TokenKind::Name(_) if self.peek_is_assign() => {
                    let name = self.consume_name("expected field name")?;
                    self.advance(); // '='
                    let value = self.parse_expression()?;
                    TableField::Named(name, value)
                }
                _ => TableField::Positional(self.parse_expression()?),
            };
            fields.push(field);
            if !self.match_token(&TokenKind::Comma) && !self.match_token(&TokenKind::Semicolon) {
                break;
            }
        }

        self.consume(TokenKind::RightBrace, "expected '}' to close table")?;
        let span = start.combine(&self.previous_span());
        Ok(Expression::new(ExpressionKind::Table(fields), span))
    }

    fn peek_is_assign(&self) -> bool {
        matches!(
            self.tokens.get(self.position + 1).map(|t| &t.kind),
            Some(TokenKind::Assign)
        )
    }
}
