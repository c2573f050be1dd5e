//! Source-to-source optimizing minifier for Lua carts.
//!
//! The pipeline parses a source string into an owned statement tree, runs
//! the enabled optimization passes over it in a fixed order, and prints the
//! result under one of three line-packing strategies. Output size is the
//! objective; identical program behavior is the constraint.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod errors;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod span;

pub use codegen::CodeGenerator;
pub use config::{LinePacking, MinifyOptions};
pub use errors::MinifyError;
pub use optimizer::{Pass, Pipeline};

use ast::Chunk;
use tracing::info;

/// Byte counts before and after minification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinifyStats {
    pub input_bytes: usize,
    pub output_bytes: usize,
}

impl MinifyStats {
    /// Output size as a fraction of input size, in percent.
    pub fn ratio_percent(&self) -> f64 {
        if self.input_bytes == 0 {
            return 100.0;
        }
        self.output_bytes as f64 / self.input_bytes as f64 * 100.0
    }
}

/// Minify a source string under the given options.
pub fn minify(source: &str, options: &MinifyOptions) -> Result<String, MinifyError> {
    let mut chunk = parser::parse(source)?;
    Ok(minify_chunk(&mut chunk, options))
}

/// Minify and report input/output byte counts.
pub fn minify_with_stats(
    source: &str,
    options: &MinifyOptions,
) -> Result<(String, MinifyStats), MinifyError> {
    let output = minify(source, options)?;
    let stats = MinifyStats {
        input_bytes: source.len(),
        output_bytes: output.len(),
    };
    info!(
        input_bytes = stats.input_bytes,
        output_bytes = stats.output_bytes,
        "minification complete"
    );
    Ok((output, stats))
}

/// Run the pipeline over an already-parsed tree and print it. The tree is
/// consumed conceptually: passes rewrite it in place and it should not be
/// reused afterwards.
pub fn minify_chunk(chunk: &mut Chunk, options: &MinifyOptions) -> String {
    let mut pipeline = Pipeline::new(options);
    pipeline.run(chunk);
    CodeGenerator::new(options).generate(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minifies_end_to_end() {
        let options = MinifyOptions::default();
        let output = minify("local value = 1 + 2 print(value)", &options).expect("minify failed");
        assert_eq!(output, "print(3)");
    }

    #[test]
    fn stats_report_both_sizes() {
        let source = "local value = 1 + 2 print(value)";
        let options = MinifyOptions::default();
        let (output, stats) = minify_with_stats(source, &options).expect("minify failed");
        assert_eq!(stats.input_bytes, source.len());
        assert_eq!(stats.output_bytes, output.len());
        assert!(stats.output_bytes < stats.input_bytes);
    }

    #[test]
    fn parse_errors_surface() {
        let options = MinifyOptions::default();
        assert!(minify("local = 1", &options).is_err());
    }
}
