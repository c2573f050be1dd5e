//! Extraction of repeated library accesses into local aliases.
//!
//! ```lua
//! for i=1,8 do t[i]=math.floor(x[i]) u[i]=math.floor(y[i]) end
//! -- becomes
//! local a=math.floor for i=1,8 do t[i]=a(x[i]) u[i]=a(y[i]) end
//! ```
//!
//! Only identifier and member/index chains rooted at a known side-effect-free
//! library namespace qualify, so the extracted value is referentially stable.
//! A namespace the program assigns to (or shadows) is dropped from the
//! allow-list for the whole run.

use super::aliasing::{collect_occurrences, insert_declarations, rewrite_occurrences, worth_aliasing};
use super::dead_functions::nested_blocks;
use super::literal_aliasing::literal_key;
use crate::ast::expression::{Expression, ExpressionKind};
use crate::ast::statement::{FunctionTarget, Statement};
use crate::ast::{Block, Chunk};
use crate::optimizer::names::NameGenerator;
use crate::optimizer::scope::{collect_block_reads, collect_block_writes};
use crate::optimizer::Pass;
use rustc_hash::{FxHashMap, FxHashSet};

/// Library namespaces whose members are referentially stable absent
/// monkey-patching. Configuration by constant, not a verified guarantee.
const SAFE_GLOBAL_BASES: &[&str] = &["math", "string", "table"];

pub struct ExpressionAliasPass;

impl ExpressionAliasPass {
    pub fn new() -> Self {
        ExpressionAliasPass
    }
}

impl Default for ExpressionAliasPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for ExpressionAliasPass {
    fn name(&self) -> &'static str {
        "alias-expressions"
    }

    fn run(&mut self, chunk: &mut Chunk) -> bool {
        let allowed = allowed_bases(chunk);
        if allowed.is_empty() {
            return false;
        }

        let keyer = move |expr: &Expression| -> Option<(String, usize)> {
            serialize_chain(expr, &allowed).map(|key| {
                let cost = key.len();
                (key, cost)
            })
        };

        let walk = collect_occurrences(chunk, &keyer);
        let tree = walk.tree;

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

/// The allow-list minus every namespace the program writes to, shadows, or
/// patches a member of.
fn allowed_bases(chunk: &Chunk) -> FxHashSet<String> {
    let mut written = FxHashSet::default();
    collect_block_writes(&chunk.block, &mut written);
    collect_patched_roots(&chunk.block, &mut written);
    SAFE_GLOBAL_BASES
        .iter()
        .filter(|base| !written.contains(**base))
        .map(|base| base.to_string())
        .collect()
}

/// Root names of member/index assignment targets and dotted function
/// declarations, at every nesting level.
fn collect_patched_roots(block: &Block, out: &mut FxHashSet<String>) {
    for stmt in &block.statements {
        match stmt {
            Statement::Assign(assign) => {
                for target in &assign.targets {
                    if let Some(root) = chain_root(target) {
                        out.insert(root.to_string());
                    }
                }
            }
            Statement::FunctionDecl(decl) => match &decl.target {
                FunctionTarget::Path(path) | FunctionTarget::Method(path, _) => {
                    if let Some(head) = path.first() {
                        out.insert(head.node.clone());
                    }
                }
                FunctionTarget::Name(_) => {}
            },
            _ => {}
        }
        for nested in nested_blocks(stmt) {
            collect_patched_roots(nested, out);
        }
    }
}

fn chain_root(expr: &Expression) -> Option<&str> {
    match &expr.kind {
        ExpressionKind::Identifier(name) => Some(name),
        ExpressionKind::Member(base, _) => chain_root(base),
        ExpressionKind::Index(base, _) => chain_root(base),
        _ => None,
    }
}

/// Serialize a qualifying access chain to its printed text, or `None` when
/// any part of the chain is not referentially stable.
fn serialize_chain(expr: &Expression, allowed: &FxHashSet<String>) -> Option<String> {
    match &expr.kind {
        ExpressionKind::Identifier(name) => allowed.contains(name).then(|| name.clone()),
        ExpressionKind::Member(base, name) => {
            serialize_chain(base, allowed).map(|b| format!("{}.{}", b, name.node))
        }
        ExpressionKind::Index(base, index) => {
            let base = serialize_chain(base, allowed)?;
            match &index.kind {
                ExpressionKind::Literal(lit) => Some(format!("{}[{}]", base, literal_key(lit))),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::statement::Statement;
    use crate::parser::parse;

    fn run(source: &str) -> Chunk {
        let mut chunk = parse(source).expect("parse failed");
        ExpressionAliasPass::new().run(&mut chunk);
        chunk
    }

    fn first_alias(chunk: &Chunk) -> Option<&crate::ast::statement::LocalDeclaration> {
        match chunk.block.statements.first() {
            Some(Statement::LocalDecl(decl)) => Some(decl),
            _ => None,
        }
    }

    #[test]
    fn repeated_library_access_is_extracted() {
        let source = "x=math.floor(a) y=math.floor(b) z=math.floor(c) w=math.floor(d)";
        let chunk = run(source);
        let decl = first_alias(&chunk).expect("expected an alias declaration");
        assert!(matches!(
            &decl.initializers[0].kind,
            ExpressionKind::Member(_, name) if name.node == "floor"
        ));
    }

    #[test]
    fn unknown_globals_never_qualify() {
        let source = "x=peek(a) y=peek(b) z=peek(c) w=peek(d) v=peek(e) u=peek(f)";
        let chunk = run(&source);
        assert!(first_alias(&chunk).is_none());
    }

    #[test]
    fn patched_namespace_is_disqualified() {
        let source =
            "math.floor=my_floor x=math.floor(a) y=math.floor(b) z=math.floor(c) w=math.floor(d)";
        let chunk = run(&source);
        assert!(first_alias(&chunk).is_none());
    }

    #[test]
    fn shadowed_namespace_is_disqualified() {
        let source =
            "local math={} x=math.floor(a) y=math.floor(b) z=math.floor(c) w=math.floor(d)";
        let chunk = run(&source);
        // The only local declaration is the shadowing one from the source.
        let decls = chunk
            .block
            .statements
            .iter()
            .filter(|s| matches!(s, Statement::LocalDecl(_)))
            .count();
        assert_eq!(decls, 1);
    }

    #[test]
    fn assignment_target_is_never_rewritten() {
        let source = "string.x=1 a=string.x b=string.x c=string.x d=string.x e=string.x";
        let chunk = run(&source);
        // Writing string.x patches the namespace, so nothing is aliased.
        assert!(first_alias(&chunk).is_none());
    }

    #[test]
    fn cost_model_rejects_rare_accesses() {
        let chunk = run("x=math.pi y=math.pi");
        assert!(first_alias(&chunk).is_none());
    }
}
