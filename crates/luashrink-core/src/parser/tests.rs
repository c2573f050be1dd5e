use super::parse;
use crate::ast::expression::{BinaryOp, ExpressionKind, Literal};
use crate::ast::statement::{FunctionTarget, Statement};

#[test]
fn parses_local_declaration() {
    let chunk = parse("local a, b = 1, 2").expect("parse failed");
    assert_eq!(chunk.block.statements.len(), 1);
    match &chunk.block.statements[0] {
        Statement::LocalDecl(decl) => {
            assert_eq!(decl.names.len(), 2);
            assert_eq!(decl.names[0].node, "a");
            assert_eq!(decl.initializers.len(), 2);
        }
        other => panic!("expected local declaration, got {other:?}"),
    }
}

#[test]
fn parses_if_elseif_else() {
    let chunk = parse("if a then x=1 elseif b then x=2 else x=3 end").expect("parse failed");
    match &chunk.block.statements[0] {
        Statement::If(if_stmt) => {
            assert_eq!(if_stmt.clauses.len(), 2);
            assert!(if_stmt.else_block.is_some());
        }
        other => panic!("expected if statement, got {other:?}"),
    }
}

#[test]
fn concat_is_right_associative() {
    let chunk = parse("x = a..b..c").expect("parse failed");
    match &chunk.block.statements[0] {
        Statement::Assign(assign) => match &assign.values[0].kind {
            ExpressionKind::Binary(BinaryOp::Concatenate, _, right) => {
                assert!(matches!(
                    right.kind,
                    ExpressionKind::Binary(BinaryOp::Concatenate, _, _)
                ));
            }
            other => panic!("expected concat, got {other:?}"),
        },
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let chunk = parse("x = a + b * c").expect("parse failed");
    match &chunk.block.statements[0] {
        Statement::Assign(assign) => match &assign.values[0].kind {
            ExpressionKind::Binary(BinaryOp::Add, _, right) => {
                assert!(matches!(
                    right.kind,
                    ExpressionKind::Binary(BinaryOp::Multiply, _, _)
                ));
            }
            other => panic!("expected addition at the top, got {other:?}"),
        },
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn and_binds_tighter_than_or() {
    let chunk = parse("x = a or b and c").expect("parse failed");
    match &chunk.block.statements[0] {
        Statement::Assign(assign) => match &assign.values[0].kind {
            ExpressionKind::Binary(BinaryOp::Or, _, right) => {
                assert!(matches!(
                    right.kind,
                    ExpressionKind::Binary(BinaryOp::And, _, _)
                ));
            }
            other => panic!("expected or at the top, got {other:?}"),
        },
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn bitwise_levels_match_the_reference_manual() {
    // or < xor < and < shifts: `a|b~c&d<<e` nests right-tighter throughout.
    let chunk = parse("x = a|b~c&d<<e").expect("parse failed");
    match &chunk.block.statements[0] {
        Statement::Assign(assign) => match &assign.values[0].kind {
            ExpressionKind::Binary(BinaryOp::BitOr, _, right) => {
                let ExpressionKind::Binary(BinaryOp::BitXor, _, xor_right) = &right.kind else {
                    panic!("expected xor under or, got {:?}", right.kind);
                };
                let ExpressionKind::Binary(BinaryOp::BitAnd, _, and_right) = &xor_right.kind
                else {
                    panic!("expected band under xor, got {:?}", xor_right.kind);
                };
                assert!(matches!(
                    and_right.kind,
                    ExpressionKind::Binary(BinaryOp::ShiftLeft, _, _)
                ));
            }
            other => panic!("expected bitwise or at the top, got {other:?}"),
        },
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn parses_bitwise_not() {
    let chunk = parse("x = ~a & b").expect("parse failed");
    match &chunk.block.statements[0] {
        Statement::Assign(assign) => match &assign.values[0].kind {
            ExpressionKind::Binary(BinaryOp::BitAnd, left, _) => {
                assert!(matches!(
                    left.kind,
                    ExpressionKind::Unary(crate::ast::expression::UnaryOp::BitNot, _)
                ));
            }
            other => panic!("expected bitwise and, got {other:?}"),
        },
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn power_binds_tighter_than_unary_minus() {
    let chunk = parse("x = -a^2").expect("parse failed");
    match &chunk.block.statements[0] {
        Statement::Assign(assign) => {
            assert!(matches!(
                assign.values[0].kind,
                ExpressionKind::Unary(_, _)
            ));
        }
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn parses_method_declaration_with_implicit_self() {
    let chunk = parse("function obj:update(dt) end").expect("parse failed");
    match &chunk.block.statements[0] {
        Statement::FunctionDecl(decl) => {
            assert!(matches!(decl.target, FunctionTarget::Method(_, _)));
            assert_eq!(decl.body.parameters[0].node, "self");
            assert_eq!(decl.body.parameters[1].node, "dt");
        }
        other => panic!("expected function declaration, got {other:?}"),
    }
}

#[test]
fn parses_table_and_string_call_sugar() {
    let chunk = parse("f{1} g\"hi\"").expect("parse failed");
    assert!(matches!(
        chunk.block.statements[0],
        Statement::Call(ref e) if matches!(e.kind, ExpressionKind::TableCall(_, _))
    ));
    assert!(matches!(
        chunk.block.statements[1],
        Statement::Call(ref e) if matches!(e.kind, ExpressionKind::StringCall(_, _))
    ));
}

#[test]
fn parses_generic_for() {
    let chunk = parse("for k, v in pairs(t) do print(k, v) end").expect("parse failed");
    match &chunk.block.statements[0] {
        Statement::ForGeneric(for_stmt) => {
            assert_eq!(for_stmt.variables.len(), 2);
            assert_eq!(for_stmt.iterators.len(), 1);
        }
        other => panic!("expected generic for, got {other:?}"),
    }
}

#[test]
fn rejects_bare_expression_statement() {
    assert!(parse("a + 1").is_err());
}

#[test]
fn parses_numeric_literal_concat() {
    let chunk = parse("print(4 ..\"\")").expect("parse failed");
    match &chunk.block.statements[0] {
        Statement::Call(call) => match &call.kind {
            ExpressionKind::Call(_, args) => {
                assert!(matches!(
                    args[0].kind,
                    ExpressionKind::Binary(BinaryOp::Concatenate, _, _)
                ));
            }
            other => panic!("expected call, got {other:?}"),
        },
        other => panic!("expected call statement, got {other:?}"),
    }
}

#[test]
fn comments_are_collected_not_parsed() {
    let chunk = parse("-- header\nlocal x = 1 -- trailing\n").expect("parse failed");
    assert_eq!(chunk.block.statements.len(), 1);
    assert_eq!(chunk.comments.len(), 2);
    assert!(chunk.comments[0].text.starts_with("--"));
}

#[test]
fn empty_source_yields_empty_chunk() {
    let chunk = parse("").expect("parse failed");
    assert!(chunk.block.statements.is_empty());
}
