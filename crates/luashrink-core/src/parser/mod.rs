mod expression;
mod statement;

#[cfg(test)]
mod tests;

use crate::ast::{Block, Chunk, Ident, Spanned};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::span::Span;

#[derive(Debug, Clone)]
pub struct ParserError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at line {}", self.message, self.span.line)
    }
}

impl std::error::Error for ParserError {}

/// Parse raw source text into a [`Chunk`]. This is the whole parser
/// boundary: source in, tree plus comment list out.
///
/// Parentheses are not represented in the tree; the printer re-derives them
/// from precedence. A parenthesized call like `(f())` therefore prints back
/// as `f()`, giving up the single-value truncation the parentheses force in
/// multi-value positions.
pub fn parse(source: &str) -> Result<Chunk, ParserError> {
    let (tokens, comments) = Lexer::new(source).tokenize().map_err(|e| ParserError {
        message: e.message,
        span: Span::new(0, 0, e.line),
    })?;
    let mut parser = Parser::new(tokens);
    let block = parser.parse_chunk()?;
    Ok(Chunk::new(block, comments))
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
        }
    }

    fn parse_chunk(&mut self) -> Result<Block, ParserError> {
        let block = self.parse_block()?;
        if !self.is_at_end() {
            return Err(self.error_here("unexpected token after chunk"));
        }
        Ok(block)
    }

    /// Parse statements until a block terminator (`end`, `else`, `elseif`,
    /// `until`, or end of input). The terminator is left unconsumed.
    fn parse_block(&mut self) -> Result<Block, ParserError> {
        let start_span = self.current_span();
        let mut statements = Vec::new();

        loop {
            while self.check(&TokenKind::Semicolon) {
                self.advance();
            }
            if self.is_at_end() || self.at_block_end() {
                break;
            }
            let stmt = self.parse_statement()?;
            let is_terminal = matches!(
                stmt,
                crate::ast::statement::Statement::Return(_)
                    | crate::ast::statement::Statement::Break(_)
            );
            statements.push(stmt);
            if is_terminal {
                while self.check(&TokenKind::Semicolon) {
                    self.advance();
                }
                break;
            }
        }

        let end_span = statements
            .last()
            .map(|s| s.span())
            .unwrap_or(start_span);
        Ok(Block::new(statements, start_span.combine(&end_span)))
    }

    // Token stream management

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream always ends with Eof")
        })
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn previous_span(&self) -> Span {
        self.tokens
            .get(self.position.saturating_sub(1))
            .map(|t| t.span)
            .unwrap_or_else(Span::empty)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        &self.tokens[self.position - 1]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token, ParserError> {
        if self.check(&kind) {
            return Ok(self.advance());
        }
        Err(self.error_here(message))
    }

    fn consume_name(&mut self, message: &str) -> Result<Ident, ParserError> {
        let span = self.current_span();
        if let TokenKind::Name(name) = &self.current().kind {
            let name = name.clone();
            self.advance();
            return Ok(Spanned::new(name, span));
        }
        Err(self.error_here(message))
    }

    fn error_here(&self, message: impl Into<String>) -> ParserError {
        ParserError {
            message: message.into(),
            span: self.current_span(),
        }
    }
}
