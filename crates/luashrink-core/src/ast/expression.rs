use super::{Block, Ident};
use crate::span::Span;

#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Expression { kind, span }
    }

    pub fn literal(lit: Literal, span: Span) -> Self {
        Expression::new(ExpressionKind::Literal(lit), span)
    }

    pub fn identifier(name: impl Into<String>, span: Span) -> Self {
        Expression::new(ExpressionKind::Identifier(name.into()), span)
    }

    /// A prefix expression may serve directly as the base of a call, member,
    /// or index expression; anything else needs parentheses there.
    pub fn is_prefix(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Identifier(_)
                | ExpressionKind::Member(_, _)
                | ExpressionKind::Index(_, _)
                | ExpressionKind::Call(_, _)
                | ExpressionKind::MethodCall(_, _, _)
                | ExpressionKind::TableCall(_, _)
                | ExpressionKind::StringCall(_, _)
        )
    }
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Identifier(String),
    Literal(Literal),
    Vararg,
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Unary(UnaryOp, Box<Expression>),
    Member(Box<Expression>, Ident),
    Index(Box<Expression>, Box<Expression>),
    Call(Box<Expression>, Vec<Expression>),
    MethodCall(Box<Expression>, Ident, Vec<Expression>),
    /// `f{...}` — call with a single table-constructor argument.
    TableCall(Box<Expression>, Box<Expression>),
    /// `f"..."` — call with a single string-literal argument.
    StringCall(Box<Expression>, Box<Expression>),
    Table(Vec<TableField>),
    Function(FunctionBody),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Literal {
    /// Lua truthiness: everything except `nil` and `false` is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Literal::Nil | Literal::Boolean(false))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Concatenate,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    And,
    Or,
}

impl BinaryOp {
    /// The short-circuiting operators: their right side may never evaluate.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
    Length,
    BitNot,
}

#[derive(Debug, Clone)]
pub enum TableField {
    /// `{ expr }` — positional entry.
    Positional(Expression),
    /// `{ name = expr }` — named entry.
    Named(Ident, Expression),
    /// `{ [key] = expr }` — computed entry.
    Computed(Expression, Expression),
}

#[derive(Debug, Clone)]
pub struct FunctionBody {
    pub parameters: Vec<Ident>,
    pub is_vararg: bool,
    pub body: Block,
    pub span: Span,
}
