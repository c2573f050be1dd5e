use super::expression::{Expression, FunctionBody};
use super::{Block, Ident};
use crate::span::Span;

#[derive(Debug, Clone)]
pub enum Statement {
    LocalDecl(LocalDeclaration),
    Assign(Assignment),
    Call(Expression),
    Return(ReturnStatement),
    Break(Span),
    If(IfStatement),
    While(WhileStatement),
    Repeat(RepeatStatement),
    ForNumeric(NumericForStatement),
    ForGeneric(GenericForStatement),
    FunctionDecl(FunctionDeclaration),
    Do(DoStatement),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::LocalDecl(decl) => decl.span,
            Statement::Assign(assign) => assign.span,
            Statement::Call(expr) => expr.span,
            Statement::Return(ret) => ret.span,
            Statement::Break(span) => *span,
            Statement::If(if_stmt) => if_stmt.span,
            Statement::While(while_stmt) => while_stmt.span,
            Statement::Repeat(repeat_stmt) => repeat_stmt.span,
            Statement::ForNumeric(for_stmt) => for_stmt.span,
            Statement::ForGeneric(for_stmt) => for_stmt.span,
            Statement::FunctionDecl(decl) => decl.span,
            Statement::Do(do_stmt) => do_stmt.span,
        }
    }
}

/// `local a, b = 1, f()` — names and initializers in declared order.
/// `initializers` may be shorter than `names`; the trailing names default
/// to nil (or to extra values of a trailing call/vararg initializer).
#[derive(Debug, Clone)]
pub struct LocalDeclaration {
    pub names: Vec<Ident>,
    pub initializers: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub targets: Vec<Expression>,
    pub values: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub values: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    /// `if`/`elseif` arms in source order.
    pub clauses: Vec<IfClause>,
    pub else_block: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfClause {
    pub condition: Expression,
    pub block: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct RepeatStatement {
    pub body: Block,
    pub condition: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct NumericForStatement {
    pub variable: Ident,
    pub start: Expression,
    pub end: Expression,
    pub step: Option<Expression>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct GenericForStatement {
    pub variables: Vec<Ident>,
    pub iterators: Vec<Expression>,
    pub body: Block,
    pub span: Span,
}

/// `function name(...)`, `function a.b.c(...)`, `function a:m(...)`, or
/// `local function name(...)`.
#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub target: FunctionTarget,
    pub is_local: bool,
    pub body: FunctionBody,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum FunctionTarget {
    /// Simple name — the only form the dead-function eliminator considers.
    Name(Ident),
    /// Dotted path, last segment is the assigned field.
    Path(Vec<Ident>),
    /// Dotted path plus a `:method` suffix (implicit `self` parameter).
    Method(Vec<Ident>, Ident),
}

impl FunctionDeclaration {
    /// The simple declared name, when this is a plain `function f` or
    /// `local function f` declaration.
    pub fn simple_name(&self) -> Option<&str> {
        match &self.target {
            FunctionTarget::Name(name) => Some(&name.node),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DoStatement {
    pub body: Block,
    pub span: Span,
}
