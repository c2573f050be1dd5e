use serde::{Deserialize, Serialize};

/// How the printer packs statements into lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinePacking {
    /// One statement per line, indented up to `max_indent_level`.
    #[serde(rename = "pretty")]
    Pretty,
    /// Statements flattened to tokens and packed under `max_line_length`.
    #[serde(rename = "tight")]
    Tight,
    /// Each statement rendered inline when it fits, block form otherwise.
    #[serde(rename = "single-line-blocks")]
    SingleLineBlocks,
}

impl Default for LinePacking {
    fn default() -> Self {
        LinePacking::Tight
    }
}

/// Options that control the minification pipeline and the printer.
///
/// Read-only input to every pass; the pipeline never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinifyOptions {
    /// Drop all comments from the output (default: true)
    #[serde(default = "default_true")]
    pub strip_comments: bool,

    /// Fold and propagate constants (default: true)
    #[serde(default = "default_true")]
    pub fold_constants: bool,

    /// Remove unread, side-effect-free local declarations (default: true)
    #[serde(default = "default_true")]
    pub eliminate_dead_locals: bool,

    /// Remove function declarations unreachable from the entry points
    /// (default: true)
    #[serde(default = "default_true")]
    pub eliminate_dead_functions: bool,

    /// Extract repeated literals into local aliases (default: true)
    #[serde(default = "default_true")]
    pub alias_literals: bool,

    /// Extract repeated pure expressions into local aliases (default: true)
    #[serde(default = "default_true")]
    pub alias_expressions: bool,

    /// Merge adjacent single-variable local declarations (default: true)
    #[serde(default = "default_true")]
    pub pack_declarations: bool,

    /// Rename locals and parameters to short names (default: true)
    #[serde(default = "default_true")]
    pub rename_variables: bool,

    /// Rename the table keys listed in `rename_keys` and keys of
    /// non-escaping table locals (default: false)
    #[serde(default)]
    pub rename_table_keys: bool,

    /// Function names that must never be removed, beyond the entry points
    #[serde(default)]
    pub keep_functions: Vec<String>,

    /// Table key names that are allowed to be renamed everywhere
    #[serde(default)]
    pub rename_keys: Vec<String>,

    /// Entry-point function names the host runtime calls; always kept
    #[serde(default = "default_entry_points")]
    pub entry_points: Vec<String>,

    /// Line-packing strategy for the printer
    #[serde(default)]
    pub line_packing: LinePacking,

    /// Line-length ceiling for tight packing (default: 200)
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Indentation is clamped beyond this nesting depth in pretty mode
    /// (default: 6)
    #[serde(default = "default_max_indent_level")]
    pub max_indent_level: usize,

    /// Allow scientific notation when it is the shortest numeric form
    /// (default: true)
    #[serde(default = "default_true")]
    pub scientific_notation: bool,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        MinifyOptions {
            strip_comments: true,
            fold_constants: true,
            eliminate_dead_locals: true,
            eliminate_dead_functions: true,
            alias_literals: true,
            alias_expressions: true,
            pack_declarations: true,
            rename_variables: true,
            rename_table_keys: false,
            keep_functions: Vec::new(),
            rename_keys: Vec::new(),
            entry_points: default_entry_points(),
            line_packing: LinePacking::default(),
            max_line_length: default_max_line_length(),
            max_indent_level: default_max_indent_level(),
            scientific_notation: true,
        }
    }
}

impl MinifyOptions {
    /// Options that disable every transformation, leaving only printing.
    /// Useful as a formatting-only configuration.
    pub fn passthrough() -> Self {
        MinifyOptions {
            strip_comments: false,
            fold_constants: false,
            eliminate_dead_locals: false,
            eliminate_dead_functions: false,
            alias_literals: false,
            alias_expressions: false,
            pack_declarations: false,
            rename_variables: false,
            rename_table_keys: false,
            line_packing: LinePacking::Pretty,
            ..MinifyOptions::default()
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_line_length() -> usize {
    200
}

fn default_max_indent_level() -> usize {
    6
}

/// The host console's lifecycle callbacks. A cart that defines these is
/// called through them by the runtime, so they are roots for dead-function
/// elimination even though nothing in the source references them.
fn default_entry_points() -> Vec<String> {
    ["TIC", "BOOT", "SCN", "BDR", "OVR", "MENU"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_enable_all_passes() {
        let options = MinifyOptions::default();
        assert!(options.fold_constants);
        assert!(options.rename_variables);
        assert!(!options.rename_table_keys);
        assert!(options.entry_points.iter().any(|n| n == "TIC"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let options: MinifyOptions =
            serde_yaml::from_str("renameVariables: false\nlinePacking: pretty\n")
                .expect("deserialize failed");
        assert!(!options.rename_variables);
        assert_eq!(options.line_packing, LinePacking::Pretty);
        assert!(options.strip_comments);
        assert_eq!(options.max_line_length, 200);
    }
}
