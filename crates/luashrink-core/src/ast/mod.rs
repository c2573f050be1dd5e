pub mod expression;
pub mod statement;

use crate::span::Span;

/// Wrapper for AST nodes with span information
#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }
}

/// Identifier
pub type Ident = Spanned<String>;

/// A sequence of statements. A block is a lexical scope when it is a
/// function body, loop body, `do` body, an if/elseif/else clause body, or
/// the top-level chunk.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<statement::Statement>,
    pub span: Span,
}

impl Block {
    pub fn new(statements: Vec<statement::Statement>, span: Span) -> Self {
        Block { statements, span }
    }
}

/// A comment collected by the lexer, carried to the side of the statement
/// tree and re-attached by the printer when comments are kept.
#[derive(Debug, Clone)]
pub struct Comment {
    pub text: String,
    pub span: Span,
    pub line: usize,
}

/// Top-level parse result: the chunk's statement block plus every comment
/// found in the source.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub block: Block,
    pub comments: Vec<Comment>,
}

impl Chunk {
    pub fn new(block: Block, comments: Vec<Comment>) -> Self {
        Chunk { block, comments }
    }
}
