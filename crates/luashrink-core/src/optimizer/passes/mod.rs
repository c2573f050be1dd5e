mod constant_folding;
pub use constant_folding::ConstantFoldingPass;

mod dead_locals;
pub use dead_locals::DeadLocalPass;

mod dead_functions;
pub use dead_functions::DeadFunctionPass;

mod aliasing;

mod literal_aliasing;
pub use literal_aliasing::LiteralAliasPass;

mod expression_aliasing;
pub use expression_aliasing::ExpressionAliasPass;

mod declaration_packing;
pub use declaration_packing::DeclarationPackingPass;

mod variable_renaming;
pub use variable_renaming::VariableRenamePass;

mod table_keys;
pub use table_keys::TableKeyRenamePass;
