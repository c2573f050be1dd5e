//! Extraction of repeated literals into short local aliases.
//!
//! ```lua
//! print("sprite");print("sprite");print("sprite");print("sprite")
//! -- becomes
//! local a="sprite" print(a);print(a);print(a);print(a)
//! ```
//!
//! A literal is extracted only when the alias declaration plus the short
//! reads are strictly cheaper than repeating the literal text, and the
//! declaration lands at the lowest common ancestor of all the occurrence
//! scopes.

use super::aliasing::{collect_occurrences, insert_declarations, rewrite_occurrences, worth_aliasing};
use crate::ast::expression::{Expression, ExpressionKind, Literal};
use crate::ast::Chunk;
use crate::codegen::{format_number, quote_string};
use crate::optimizer::names::NameGenerator;
use crate::optimizer::scope::{collect_block_reads, collect_block_writes};
use crate::optimizer::Pass;
use rustc_hash::{FxHashMap, FxHashSet};

/// The literal's printed text, doubling as its per-occurrence cost.
pub(super) fn literal_key(lit: &Literal) -> String {
    match lit {
        Literal::Nil => "nil".to_string(),
        Literal::Boolean(true) => "true".to_string(),
        Literal::Boolean(false) => "false".to_string(),
        Literal::Number(value) => format_number(*value, true),
        Literal::String(value) => quote_string(value),
    }
}

pub struct LiteralAliasPass;

impl LiteralAliasPass {
    pub fn new() -> Self {
        LiteralAliasPass
    }
}

impl Default for LiteralAliasPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for LiteralAliasPass {
    fn name(&self) -> &'static str {
        "alias-literals"
    }

    fn run(&mut self, chunk: &mut Chunk) -> bool {
        let keyer = |expr: &Expression| -> Option<(String, usize)> {
            match &expr.kind {
                ExpressionKind::Literal(lit) => {
                    let key = literal_key(lit);
                    let cost = key.len();
                    Some((key, cost))
                }
                _ => None,
            }
        };

        let walk = collect_occurrences(chunk, &keyer);
        let tree = walk.tree;

        // Alias names must not collide with any name the program already
        // uses; the variable renamer has not run yet.
        let mut forbidden = FxHashSet::default();
        collect_block_reads(&chunk.block, &mut forbidden);
        collect_block_writes(&chunk.block, &mut forbidden);
        let mut names = NameGenerator::with_forbidden(forbidden);

        let mut replacements = FxHashMap::default();
        let mut pending: FxHashMap<_, Vec<(String, Expression)>> = FxHashMap::default();
        for (key, candidate) in walk.candidates {
            if !worth_aliasing(candidate.cost, candidate.count, names.peek_len()) {
                continue;
            }
            let name = names.next_name();
            let scope = tree.lca_all(candidate.scopes.iter().copied());
            pending
                .entry(scope)
                .or_default()
                .push((name.clone(), candidate.representative));
            replacements.insert(key, name);
        }
        if replacements.is_empty() {
            return false;
        }

        rewrite_occurrences(chunk, &keyer, &replacements);
        insert_declarations(chunk, &mut pending);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::statement::Statement;
    use crate::parser::parse;

    fn run(source: &str) -> Chunk {
        let mut chunk = parse(source).expect("parse failed");
        LiteralAliasPass::new().run(&mut chunk);
        chunk
    }

    fn alias_declarations(chunk: &Chunk) -> usize {
        chunk
            .block
            .statements
            .iter()
            .filter(|stmt| matches!(stmt, Statement::LocalDecl(_)))
            .count()
    }

    #[test]
    fn short_string_used_twice_is_not_aliased() {
        let chunk = run("print(\"abc\") print(\"abc\")");
        assert_eq!(alias_declarations(&chunk), 0);
    }

    #[test]
    fn short_string_used_twenty_times_is_aliased() {
        let source = "print(\"abc\") ".repeat(20);
        let chunk = run(&source);
        assert_eq!(alias_declarations(&chunk), 1);
        let Statement::LocalDecl(decl) = &chunk.block.statements[0] else {
            panic!("expected the alias declaration first");
        };
        assert!(matches!(
            &decl.initializers[0].kind,
            ExpressionKind::Literal(Literal::String(s)) if s == "abc"
        ));
        // Every occurrence now reads the alias.
        let Statement::Call(call) = &chunk.block.statements[1] else {
            panic!("expected a call");
        };
        let ExpressionKind::Call(_, args) = &call.kind else {
            panic!("expected call arguments");
        };
        assert!(matches!(&args[0].kind, ExpressionKind::Identifier(_)));
    }

    #[test]
    fn declaration_lands_at_the_common_ancestor_scope() {
        let source = "\
            if a then print(\"needle-needle\") print(\"needle-needle\") end \
            if b then print(\"needle-needle\") print(\"needle-needle\") end";
        let chunk = run(source);
        // Occurrences sit in two sibling clause scopes; the declaration
        // must surface at chunk level, before both.
        assert!(matches!(&chunk.block.statements[0], Statement::LocalDecl(_)));
        assert_eq!(chunk.block.statements.len(), 3);
    }

    #[test]
    fn string_call_sugar_argument_is_left_alone() {
        let source = "f\"quite-long-string\" f\"quite-long-string\" f\"quite-long-string\" \
                      f\"quite-long-string\" f\"quite-long-string\" f\"quite-long-string\"";
        let chunk = run(source);
        assert_eq!(alias_declarations(&chunk), 0);
    }

    #[test]
    fn alias_name_avoids_existing_bindings() {
        let source = format!("local a=1 print(a) {}", "print(\"abc\") ".repeat(20));
        let chunk = run(&source);
        let Statement::LocalDecl(decl) = &chunk.block.statements[0] else {
            panic!("expected the alias declaration first");
        };
        assert_ne!(decl.names[0].node, "a");
    }
}
