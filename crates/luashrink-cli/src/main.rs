use std::path::PathBuf;

use clap::Parser;
use luashrink_core::{minify_with_stats, LinePacking, MinifyOptions};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Luashrink - an optimizing minifier for Lua carts
#[derive(Parser, Debug)]
#[command(name = "luashrink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input file to minify
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to a luashrink.yaml configuration file
    #[arg(short, long, value_name = "FILE")]
    project: Option<PathBuf>,

    /// Line-packing strategy (pretty, tight, single-line-blocks)
    #[arg(long, value_name = "MODE")]
    line_packing: Option<String>,

    /// Line-length ceiling for tight packing
    #[arg(long, value_name = "COLUMNS")]
    max_line_length: Option<usize>,

    /// Keep comments in the output (pretty mode only)
    #[arg(long)]
    keep_comments: bool,

    /// Disable constant folding and propagation
    #[arg(long)]
    no_fold: bool,

    /// Disable dead local and dead function elimination
    #[arg(long)]
    no_dead_code: bool,

    /// Disable literal and expression aliasing
    #[arg(long)]
    no_alias: bool,

    /// Disable declaration packing
    #[arg(long)]
    no_pack: bool,

    /// Disable variable renaming
    #[arg(long)]
    no_rename: bool,

    /// Rename table keys of non-escaping table locals
    #[arg(long)]
    rename_table_keys: bool,

    /// Function names to keep even when unreachable (comma-separated)
    #[arg(long, value_name = "NAMES")]
    keep: Option<String>,

    /// Table keys allowed to be renamed everywhere (comma-separated)
    #[arg(long, value_name = "KEYS")]
    rename_keys: Option<String>,

    /// Print size statistics as JSON to stderr
    #[arg(long)]
    stats: bool,
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG=debug for per-pass logs.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = build_options(&cli)?;

    let source = std::fs::read_to_string(&cli.file)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", cli.file.display()))?;

    info!(file = %cli.file.display(), bytes = source.len(), "minifying");
    let (stripped, regions) = extract_verbatim_regions(&source);
    let (minified, _) = minify_with_stats(&stripped, &options)
        .map_err(|e| anyhow::anyhow!("{}: {e}", cli.file.display()))?;
    let output = reinsert_verbatim_regions(&minified, &regions);
    let stats = luashrink_core::MinifyStats {
        input_bytes: source.len(),
        output_bytes: output.len(),
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &output)
                .map_err(|e| anyhow::anyhow!("cannot write {}: {e}", path.display()))?;
            debug!(file = %path.display(), bytes = output.len(), "wrote output");
        }
        None => {
            println!("{output}");
        }
    }

    if cli.stats {
        let report = serde_json::json!({
            "inputBytes": stats.input_bytes,
            "outputBytes": stats.output_bytes,
            "ratioPercent": stats.ratio_percent(),
        });
        eprintln!("{report}");
    }

    Ok(())
}

/// Configuration file first, then flag overrides on top.
fn build_options(cli: &Cli) -> anyhow::Result<MinifyOptions> {
    let mut options = match &cli.project {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
            serde_yaml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("invalid configuration {}: {e}", path.display()))?
        }
        None => MinifyOptions::default(),
    };

    if let Some(mode) = &cli.line_packing {
        options.line_packing = match mode.as_str() {
            "pretty" => LinePacking::Pretty,
            "tight" => LinePacking::Tight,
            "single-line-blocks" => LinePacking::SingleLineBlocks,
            other => anyhow::bail!("unknown line-packing mode: {other}"),
        };
    }
    if let Some(limit) = cli.max_line_length {
        options.max_line_length = limit;
    }
    if cli.keep_comments {
        options.strip_comments = false;
    }
    if cli.no_fold {
        options.fold_constants = false;
    }
    if cli.no_dead_code {
        options.eliminate_dead_locals = false;
        options.eliminate_dead_functions = false;
    }
    if cli.no_alias {
        options.alias_literals = false;
        options.alias_expressions = false;
    }
    if cli.no_pack {
        options.pack_declarations = false;
    }
    if cli.no_rename {
        options.rename_variables = false;
    }
    if cli.rename_table_keys {
        options.rename_table_keys = true;
    }
    if let Some(names) = &cli.keep {
        options
            .keep_functions
            .extend(names.split(',').map(|n| n.trim().to_string()));
    }
    if let Some(keys) = &cli.rename_keys {
        options
            .rename_keys
            .extend(keys.split(',').map(|k| k.trim().to_string()));
        options.rename_table_keys = true;
    }

    Ok(options)
}

/// Marker comments fencing code the minifier must not touch.
const VERBATIM_OFF: &str = "--minify:off";
const VERBATIM_ON: &str = "--minify:on";

/// Replaces each `--minify:off` .. `--minify:on` region (markers included)
/// with a placeholder call statement, returning the stripped source and the
/// captured region texts in order. The placeholder is a plain global call,
/// so every pass carries it through unchanged and the tight packer treats
/// it as a single statement. An unterminated region runs to end of input.
fn extract_verbatim_regions(source: &str) -> (String, Vec<String>) {
    let mut stripped = String::with_capacity(source.len());
    let mut regions = Vec::new();
    let mut current: Option<String> = None;

    for line in source.lines() {
        match &mut current {
            None => {
                if line.trim() == VERBATIM_OFF {
                    stripped.push_str(&placeholder(regions.len()));
                    stripped.push('\n');
                    current = Some(String::new());
                } else {
                    stripped.push_str(line);
                    stripped.push('\n');
                }
            }
            Some(region) => {
                if line.trim() == VERBATIM_ON {
                    regions.push(std::mem::take(region));
                    current = None;
                } else {
                    region.push_str(line);
                    region.push('\n');
                }
            }
        }
    }
    if let Some(region) = current {
        regions.push(region);
    }

    (stripped, regions)
}

fn placeholder(index: usize) -> String {
    format!("__verbatim_{index}()")
}

/// Swaps each placeholder call back for its captured region, on its own
/// lines so the verbatim text never shares a line with minified code.
fn reinsert_verbatim_regions(output: &str, regions: &[String]) -> String {
    let mut result = output.to_string();
    for (i, region) in regions.iter().enumerate() {
        let body = format!("\n{}\n", region.trim_end_matches('\n'));
        result = result.replacen(&placeholder(i), &body, 1);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_reinserts_regions() {
        let source = "print(1)\n--minify:off\nlocal  x = 1\n--minify:on\nprint(2)\n";
        let (stripped, regions) = extract_verbatim_regions(source);
        assert_eq!(stripped, "print(1)\n__verbatim_0()\nprint(2)\n");
        assert_eq!(regions, vec!["local  x = 1\n".to_string()]);

        let restored = reinsert_verbatim_regions(&stripped, &regions);
        assert_eq!(restored, "print(1)\n\nlocal  x = 1\nprint(2)\n");
    }

    #[test]
    fn unterminated_region_runs_to_end_of_input() {
        let source = "print(1)\n--minify:off\nraw()\n";
        let (stripped, regions) = extract_verbatim_regions(source);
        assert_eq!(stripped, "print(1)\n__verbatim_0()\n");
        assert_eq!(regions, vec!["raw()\n".to_string()]);
    }
}
