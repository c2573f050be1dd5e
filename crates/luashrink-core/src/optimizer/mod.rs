//! The pass pipeline.
//!
//! Passes run in a fixed order, each gated by its option flag, and each one
//! fully consumes the tree before the next begins. Every pass is total over
//! the grammar: it treats node kinds it has no interest in as opaque leaves
//! and never fails.

pub mod names;
pub mod scope;

pub mod passes;

use crate::ast::Chunk;
use crate::config::MinifyOptions;
use tracing::debug;

use passes::{
    ConstantFoldingPass, DeadFunctionPass, DeadLocalPass, DeclarationPackingPass,
    ExpressionAliasPass, LiteralAliasPass, TableKeyRenamePass, VariableRenamePass,
};

/// A single tree-to-tree transformation.
pub trait Pass {
    fn name(&self) -> &'static str;

    /// Rewrite the chunk in place. Returns whether anything changed.
    fn run(&mut self, chunk: &mut Chunk) -> bool;
}

/// Runs the enabled passes in the fixed pipeline order.
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl Pipeline {
    pub fn new(options: &MinifyOptions) -> Self {
        let mut passes: Vec<Box<dyn Pass>> = Vec::new();

        if options.fold_constants {
            passes.push(Box::new(ConstantFoldingPass::new()));
        }
        if options.eliminate_dead_functions {
            passes.push(Box::new(DeadFunctionPass::new(
                options.keep_functions.clone(),
                options.entry_points.clone(),
            )));
        }
        if options.eliminate_dead_locals {
            passes.push(Box::new(DeadLocalPass::new()));
        }
        if options.alias_literals {
            passes.push(Box::new(LiteralAliasPass::new()));
        }
        if options.alias_expressions {
            passes.push(Box::new(ExpressionAliasPass::new()));
        }
        if options.pack_declarations {
            passes.push(Box::new(DeclarationPackingPass::new()));
        }
        if options.rename_table_keys {
            passes.push(Box::new(TableKeyRenamePass::new(
                options.rename_keys.clone(),
            )));
        }
        if options.rename_variables {
            passes.push(Box::new(VariableRenamePass::new()));
        }

        Pipeline { passes }
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every enabled pass once, in order.
    pub fn run(&mut self, chunk: &mut Chunk) {
        for pass in &mut self.passes {
            let changed = pass.run(chunk);
            debug!(pass = pass.name(), changed, "pass complete");
        }
    }
}
