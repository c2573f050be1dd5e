//! Merging runs of adjacent single-variable `local` declarations.
//!
//! ```lua
//! local a=1 local b=2 local c=3   -->   local a,b,c=1,2,3
//! ```
//!
//! A declaration joins the current run only when merging cannot change what
//! any initializer resolves to: no redeclaration within the run, no read of
//! a name the run already declares, and no read of a name a later
//! declaration in the same stretch is about to bind.

use super::dead_functions::nested_blocks_mut;
use crate::ast::expression::{Expression, Literal};
use crate::ast::statement::{LocalDeclaration, Statement};
use crate::ast::{Block, Chunk};
use crate::optimizer::scope::collect_expression_reads;
use crate::optimizer::Pass;
use crate::span::Span;
use rustc_hash::FxHashSet;

pub struct DeclarationPackingPass {
    changed: bool,
}

impl DeclarationPackingPass {
    pub fn new() -> Self {
        DeclarationPackingPass { changed: false }
    }
}

impl Default for DeclarationPackingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for DeclarationPackingPass {
    fn name(&self) -> &'static str {
        "pack-declarations"
    }

    fn run(&mut self, chunk: &mut Chunk) -> bool {
        self.changed = false;
        self.process_block(&mut chunk.block);
        self.changed
    }
}

/// Mergeable form: exactly one name, at most one initializer.
fn is_single(decl: &LocalDeclaration) -> bool {
    decl.names.len() == 1 && decl.initializers.len() <= 1
}

impl DeclarationPackingPass {
    fn process_block(&mut self, block: &mut Block) {
        let old = std::mem::take(&mut block.statements);
        let mut out = Vec::with_capacity(old.len());
        let mut stretch: Vec<LocalDeclaration> = Vec::new();
        for stmt in old {
            match stmt {
                Statement::LocalDecl(decl) if is_single(&decl) => stretch.push(decl),
                other => {
                    self.flush_stretch(&mut stretch, &mut out);
                    out.push(other);
                }
            }
        }
        self.flush_stretch(&mut stretch, &mut out);
        block.statements = out;

        for stmt in &mut block.statements {
            for nested in nested_blocks_mut(stmt) {
                self.process_block(nested);
            }
        }
    }

    fn flush_stretch(&mut self, stretch: &mut Vec<LocalDeclaration>, out: &mut Vec<Statement>) {
        if stretch.is_empty() {
            return;
        }
        let declarations = std::mem::take(stretch);

        let reads: Vec<FxHashSet<String>> = declarations
            .iter()
            .map(|decl| {
                let mut set = FxHashSet::default();
                for init in &decl.initializers {
                    collect_expression_reads(init, &mut set);
                }
                set
            })
            .collect();

        let mut group: Vec<LocalDeclaration> = Vec::new();
        let mut group_names: FxHashSet<String> = FxHashSet::default();
        let mut group_reads: FxHashSet<String> = FxHashSet::default();
        for (i, decl) in declarations.iter().enumerate() {
            let name = &decl.names[0].node;
            // Redeclaration, a read of a name the group declares, or a
            // group member having read this name before it was bound.
            let hazard = !group.is_empty()
                && (group_names.contains(name)
                    || group_names.iter().any(|n| reads[i].contains(n))
                    || group_reads.contains(name));
            if hazard {
                emit_group(&mut group, &mut group_names, &mut group_reads, out, &mut self.changed);
            }
            group_names.insert(name.clone());
            group_reads.extend(reads[i].iter().cloned());
            group.push(decl.clone());
        }
        emit_group(&mut group, &mut group_names, &mut group_reads, out, &mut self.changed);
    }
}

fn emit_group(
    group: &mut Vec<LocalDeclaration>,
    group_names: &mut FxHashSet<String>,
    group_reads: &mut FxHashSet<String>,
    out: &mut Vec<Statement>,
    changed: &mut bool,
) {
    group_names.clear();
    group_reads.clear();
    let declarations = std::mem::take(group);
    match declarations.len() {
        0 => {}
        1 => out.push(Statement::LocalDecl(declarations.into_iter().next().expect("one element"))),
        _ => {
            let span = match (declarations.first(), declarations.last()) {
                (Some(first), Some(last)) => first.span.combine(&last.span),
                _ => Span::empty(),
            };
            let mut names = Vec::with_capacity(declarations.len());
            let mut initializers = Vec::with_capacity(declarations.len());
            for decl in declarations {
                let name_span = decl.names[0].span;
                names.extend(decl.names);
                // Pad missing initializers with an explicit nil so the
                // merged arity stays exact.
                match decl.initializers.into_iter().next() {
                    Some(init) => initializers.push(init),
                    None => initializers.push(Expression::literal(Literal::Nil, name_span)),
                }
            }
            out.push(Statement::LocalDecl(LocalDeclaration {
                names,
                initializers,
                span,
            }));
            *changed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expression::ExpressionKind;
    use crate::parser::parse;

    fn run(source: &str) -> Chunk {
        let mut chunk = parse(source).expect("parse failed");
        DeclarationPackingPass::new().run(&mut chunk);
        chunk
    }

    fn decl_shapes(chunk: &Chunk) -> Vec<(usize, usize)> {
        chunk
            .block
            .statements
            .iter()
            .filter_map(|stmt| match stmt {
                Statement::LocalDecl(d) => Some((d.names.len(), d.initializers.len())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn independent_declarations_are_merged() {
        let chunk = run("local a=1 local b=2 local c=3");
        assert_eq!(decl_shapes(&chunk), vec![(3, 3)]);
    }

    #[test]
    fn data_dependency_is_never_merged() {
        let chunk = run("local a=1 local b=a+1");
        assert_eq!(decl_shapes(&chunk), vec![(1, 1), (1, 1)]);
    }

    #[test]
    fn forward_reference_breaks_the_run() {
        let chunk = run("local b=x local x=1");
        assert_eq!(decl_shapes(&chunk), vec![(1, 1), (1, 1)]);
    }

    #[test]
    fn redeclaration_breaks_the_run() {
        let chunk = run("local a=1 local a=2");
        assert_eq!(decl_shapes(&chunk), vec![(1, 1), (1, 1)]);
    }

    #[test]
    fn missing_initializer_is_padded_with_nil() {
        let chunk = run("local a local b=2");
        assert_eq!(decl_shapes(&chunk), vec![(2, 2)]);
        let Statement::LocalDecl(decl) = &chunk.block.statements[0] else {
            panic!("expected a declaration");
        };
        assert!(matches!(
            decl.initializers[0].kind,
            ExpressionKind::Literal(Literal::Nil)
        ));
    }

    #[test]
    fn non_candidate_statement_closes_the_run() {
        let chunk = run("local a=1 print(a) local b=2 local c=3");
        assert_eq!(decl_shapes(&chunk), vec![(1, 1), (2, 2)]);
    }

    #[test]
    fn nested_blocks_are_packed_independently() {
        let chunk = run("do local a=1 local b=2 end");
        let Statement::Do(do_stmt) = &chunk.block.statements[0] else {
            panic!("expected a do block");
        };
        assert_eq!(do_stmt.body.statements.len(), 1);
    }
}
