//! Expression rendering: precedence, parenthesization, and the lexical
//! quirks of the concatenation operator.

use super::numbers::{format_number, format_number_no_leading_dot};
use super::{quote_string, CodeGenerator};
use crate::ast::expression::{BinaryOp, Expression, ExpressionKind, Literal, TableField, UnaryOp};

/// Precedence levels, lowest first. `ATOM` marks operands that never need
/// precedence parentheses.
const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_COMPARE: u8 = 3;
const PREC_BOR: u8 = 4;
const PREC_BXOR: u8 = 5;
const PREC_BAND: u8 = 6;
const PREC_SHIFT: u8 = 7;
const PREC_CONCAT: u8 = 8;
const PREC_ADD: u8 = 9;
const PREC_MUL: u8 = 10;
const PREC_UNARY: u8 = 11;
const PREC_POWER: u8 = 12;
const ATOM: u8 = 13;

fn binary_precedence(op: BinaryOp) -> (u8, bool) {
    match op {
        BinaryOp::Or => (PREC_OR, false),
        BinaryOp::And => (PREC_AND, false),
        BinaryOp::Equal
        | BinaryOp::NotEqual
        | BinaryOp::LessThan
        | BinaryOp::LessThanOrEqual
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterThanOrEqual => (PREC_COMPARE, false),
        BinaryOp::BitOr => (PREC_BOR, false),
        BinaryOp::BitXor => (PREC_BXOR, false),
        BinaryOp::BitAnd => (PREC_BAND, false),
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight => (PREC_SHIFT, false),
        BinaryOp::Concatenate => (PREC_CONCAT, true),
        BinaryOp::Add | BinaryOp::Subtract => (PREC_ADD, false),
        BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => (PREC_MUL, false),
        BinaryOp::Power => (PREC_POWER, true),
    }
}

fn binary_op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Subtract => "-",
        BinaryOp::Multiply => "*",
        BinaryOp::Divide => "/",
        BinaryOp::Modulo => "%",
        BinaryOp::Power => "^",
        BinaryOp::Concatenate => "..",
        BinaryOp::Equal => "==",
        BinaryOp::NotEqual => "~=",
        BinaryOp::LessThan => "<",
        BinaryOp::LessThanOrEqual => "<=",
        BinaryOp::GreaterThan => ">",
        BinaryOp::GreaterThanOrEqual => ">=",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "~",
        BinaryOp::ShiftLeft => "<<",
        BinaryOp::ShiftRight => ">>",
        BinaryOp::And => " and ",
        BinaryOp::Or => " or ",
    }
}

fn precedence(expr: &Expression) -> u8 {
    match &expr.kind {
        ExpressionKind::Binary(op, _, _) => binary_precedence(*op).0,
        ExpressionKind::Unary(_, _) => PREC_UNARY,
        _ => ATOM,
    }
}

impl CodeGenerator {
    pub(crate) fn expression_text(&self, expr: &Expression) -> String {
        match &expr.kind {
            ExpressionKind::Identifier(name) => name.clone(),
            ExpressionKind::Literal(lit) => self.literal_text(lit),
            ExpressionKind::Vararg => "...".to_string(),
            ExpressionKind::Binary(op, left, right) => self.binary_text(*op, left, right),
            ExpressionKind::Unary(op, operand) => self.unary_text(*op, operand),
            ExpressionKind::Member(base, name) => {
                format!("{}.{}", self.base_text(base), name.node)
            }
            ExpressionKind::Index(base, index) => {
                format!("{}[{}]", self.base_text(base), self.expression_text(index))
            }
            ExpressionKind::Call(base, args) => {
                format!("{}({})", self.base_text(base), self.list_text(args))
            }
            ExpressionKind::MethodCall(base, name, args) => format!(
                "{}:{}({})",
                self.base_text(base),
                name.node,
                self.list_text(args)
            ),
            ExpressionKind::TableCall(base, table) => {
                format!("{}{}", self.base_text(base), self.expression_text(table))
            }
            ExpressionKind::StringCall(base, argument) => {
                format!("{}{}", self.base_text(base), self.expression_text(argument))
            }
            ExpressionKind::Table(fields) => self.table_text(fields),
            ExpressionKind::Function(body) => {
                let params = self.parameter_text(&body.parameters, body.is_vararg);
                let inline = self.block_inline(&body.body);
                if inline.is_empty() {
                    format!("function({})end", params)
                } else {
                    format!("function({}){} end", params, inline)
                }
            }
        }
    }

    pub(crate) fn literal_text(&self, lit: &Literal) -> String {
        match lit {
            Literal::Nil => "nil".to_string(),
            Literal::Boolean(true) => "true".to_string(),
            Literal::Boolean(false) => "false".to_string(),
            Literal::Number(value) => format_number(*value, self.scientific),
            Literal::String(value) => quote_string(value),
        }
    }

    pub(crate) fn list_text(&self, exprs: &[Expression]) -> String {
        exprs
            .iter()
            .map(|e| self.expression_text(e))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub(crate) fn parameter_text(&self, parameters: &[crate::ast::Ident], is_vararg: bool) -> String {
        let mut parts: Vec<&str> = parameters.iter().map(|p| p.node.as_str()).collect();
        if is_vararg {
            parts.push("...");
        }
        parts.join(",")
    }

    fn table_text(&self, fields: &[TableField]) -> String {
        let parts: Vec<String> = fields
            .iter()
            .map(|field| match field {
                TableField::Positional(value) => self.expression_text(value),
                TableField::Named(name, value) => {
                    format!("{}={}", name.node, self.expression_text(value))
                }
                TableField::Computed(key, value) => format!(
                    "[{}]={}",
                    self.expression_text(key),
                    self.expression_text(value)
                ),
            })
            .collect();
        format!("{{{}}}", parts.join(","))
    }

    fn binary_text(&self, op: BinaryOp, left: &Expression, right: &Expression) -> String {
        let (prec, right_assoc) = binary_precedence(op);
        // The wrong-side child of an equal-precedence operator keeps its
        // parentheses, preserving the original grouping.
        let (left_min, right_min) = if right_assoc {
            (prec + 1, prec)
        } else {
            (prec, prec + 1)
        };
        let mut lhs = self.wrapped(left, left_min);
        let mut rhs = self.wrapped(right, right_min);

        if op == BinaryOp::Concatenate {
            // A digit or dot directly before `..` shifts the token
            // boundary; parenthesize the whole left operand.
            if lhs
                .chars()
                .last()
                .is_some_and(|c| c.is_ascii_digit() || c == '.')
            {
                lhs = format!("({})", lhs);
            }
            if let ExpressionKind::Literal(Literal::Number(value)) = &right.kind {
                rhs = format_number_no_leading_dot(*value, self.scientific);
            }
        }

        let op_text = binary_op_text(op);
        // `a- -b`, never `a--b`: that opens a comment.
        if op == BinaryOp::Subtract && rhs.starts_with('-') {
            return format!("{}{} {}", lhs, op_text, rhs);
        }
        format!("{}{}{}", lhs, op_text, rhs)
    }

    fn unary_text(&self, op: UnaryOp, operand: &Expression) -> String {
        let inner = self.wrapped(operand, PREC_UNARY);
        match op {
            UnaryOp::Negate => {
                if inner.starts_with('-') {
                    format!("- {}", inner)
                } else {
                    format!("-{}", inner)
                }
            }
            UnaryOp::Not => format!("not {}", inner),
            UnaryOp::Length => format!("#{}", inner),
            UnaryOp::BitNot => format!("~{}", inner),
        }
    }

    fn wrapped(&self, expr: &Expression, min_precedence: u8) -> String {
        let text = self.expression_text(expr);
        if precedence(expr) < min_precedence {
            format!("({})", text)
        } else {
            text
        }
    }

    /// The base of a call, member, or index expression must itself be a
    /// prefix expression; anything else is parenthesized.
    pub(crate) fn base_text(&self, base: &Expression) -> String {
        let text = self.expression_text(base);
        if base.is_prefix() {
            text
        } else {
            format!("({})", text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MinifyOptions;
    use crate::parser::parse;

    fn print_expr(source: &str) -> String {
        let chunk = parse(&format!("return {}", source)).expect("parse failed");
        let generator = CodeGenerator::new(&MinifyOptions::default());
        match &chunk.block.statements[0] {
            crate::ast::statement::Statement::Return(ret) => {
                generator.expression_text(&ret.values[0])
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn drops_redundant_parentheses() {
        assert_eq!(print_expr("(a+b)+c"), "a+b+c");
        assert_eq!(print_expr("a+(b*c)"), "a+b*c");
    }

    #[test]
    fn keeps_grouping_parentheses() {
        assert_eq!(print_expr("a-(b-c)"), "a-(b-c)");
        assert_eq!(print_expr("(a+b)*c"), "(a+b)*c");
        assert_eq!(print_expr("(a..b)..c"), "(a..b)..c");
        assert_eq!(print_expr("a^(b^c)"), "a^b^c");
        assert_eq!(print_expr("(a^b)^c"), "(a^b)^c");
    }

    #[test]
    fn bitwise_operators_round_trip() {
        assert_eq!(print_expr("a|b~c&d"), "a|b~c&d");
        assert_eq!(print_expr("(a|b)&c"), "(a|b)&c");
        assert_eq!(print_expr("(a<<b)..c"), "(a<<b)..c");
        assert_eq!(print_expr("~a&b"), "~a&b");
        assert_eq!(print_expr("a>>(b>>c)"), "a>>(b>>c)");
    }

    #[test]
    fn keyword_operators_keep_their_spaces() {
        assert_eq!(print_expr("a and b or c"), "a and b or c");
        assert_eq!(print_expr("not a"), "not a");
    }

    #[test]
    fn numeric_left_of_concat_is_parenthesized() {
        assert_eq!(print_expr("4 .. ''"), "(4)..\"\"");
        assert_eq!(print_expr("a+4 .. ''"), "(a+4)..\"\"");
    }

    #[test]
    fn fractional_right_of_concat_keeps_its_zero() {
        assert_eq!(print_expr("'' .. 0.5"), "\"\"..0.5");
        assert_eq!(print_expr("0.5 + 0.5"), ".5+.5");
    }

    #[test]
    fn double_negation_never_forms_a_comment() {
        assert_eq!(print_expr("- -a"), "- -a");
        assert_eq!(print_expr("a- -b"), "a- -b");
    }

    #[test]
    fn non_prefix_call_base_is_parenthesized() {
        assert_eq!(print_expr("('x'):rep(3)"), "(\"x\"):rep(3)");
        assert_eq!(print_expr("(a or b).x"), "(a or b).x");
    }

    #[test]
    fn call_sugar_round_trips() {
        assert_eq!(print_expr("f{1,2}"), "f{1,2}");
        assert_eq!(print_expr("f'hi'"), "f\"hi\"");
        assert_eq!(print_expr("t:m(1)"), "t:m(1)");
    }
}
