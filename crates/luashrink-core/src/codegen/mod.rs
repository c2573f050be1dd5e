//! Rendering the final tree back to source text.
//!
//! Three line-packing modes share one expression printer: `pretty` writes
//! one statement per line with clamped indentation and re-attached
//! comments, `tight` flattens statements into tokens and packs them under
//! the line-length ceiling, and `single-line-blocks` renders each statement
//! inline when it fits and falls back to block form otherwise.

pub mod numbers;

mod expressions;
mod statements;

pub use numbers::{format_number, format_number_no_leading_dot};

use crate::ast::statement::Statement;
use crate::ast::{Block, Chunk, Comment};
use crate::config::{LinePacking, MinifyOptions};

/// Quote and escape a string literal, choosing the quote character that
/// needs fewer escapes. String contents hold one byte per `char` (the
/// lexer's convention); everything outside printable ASCII is escaped
/// numerically so the emitted literal denotes exactly those bytes.
pub fn quote_string(value: &str) -> String {
    let doubles = value.matches('"').count();
    let singles = value.matches('\'').count();
    let quote = if doubles > singles { '\'' } else { '"' };

    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || ((c as u32) > 0x7E && (c as u32) <= 0xFF) => {
                // A decimal escape followed by a digit must be padded to
                // three digits or the digits merge into it.
                if chars.peek().is_some_and(|next| next.is_ascii_digit()) {
                    out.push_str(&format!("\\{:03}", c as u32));
                } else {
                    out.push_str(&format!("\\{}", c as u32));
                }
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

pub struct CodeGenerator {
    mode: LinePacking,
    max_line_length: usize,
    max_indent_level: usize,
    scientific: bool,
    keep_comments: bool,
    comments: Vec<Comment>,
    comment_cursor: usize,
    output: String,
}

impl CodeGenerator {
    pub fn new(options: &MinifyOptions) -> Self {
        CodeGenerator {
            mode: options.line_packing,
            max_line_length: options.max_line_length,
            max_indent_level: options.max_indent_level,
            scientific: options.scientific_notation,
            keep_comments: !options.strip_comments && options.line_packing == LinePacking::Pretty,
            comments: Vec::new(),
            comment_cursor: 0,
            output: String::new(),
        }
    }

    pub fn generate(mut self, chunk: &Chunk) -> String {
        if self.keep_comments {
            self.comments = chunk.comments.clone();
            self.comments.sort_by_key(|c| c.span.start);
        }
        match self.mode {
            LinePacking::Tight => self.generate_tight(&chunk.block),
            LinePacking::Pretty | LinePacking::SingleLineBlocks => {
                for (i, stmt) in chunk.block.statements.iter().enumerate() {
                    self.write_statement(stmt, 0, i == 0);
                }
                self.flush_remaining_comments();
            }
        }
        self.output
    }

    /// Token-level packing: fill each line up to the ceiling, breaking
    /// between tokens. Newlines are plain whitespace to the grammar, so a
    /// break is legal anywhere a space is.
    fn generate_tight(&mut self, block: &Block) {
        let mut line = String::new();
        let mut first_statement = true;
        for stmt in &block.statements {
            let tokens = self.statement_tokens(stmt);
            for (i, token) in tokens.iter().enumerate() {
                // A statement starting with `(` would chain onto the
                // previous statement's trailing expression.
                if i == 0 && !first_statement && token.starts_with('(') {
                    line.push(';');
                }
                let sep = match line.chars().last() {
                    Some(last) => usize::from(needs_space(last, token)),
                    None => 0,
                };
                let candidate = line.len() + sep + token.len();
                let end_at_ceiling = token == "end" && candidate == self.max_line_length;
                if !line.is_empty() && (candidate > self.max_line_length || end_at_ceiling) {
                    self.output.push_str(&line);
                    self.output.push('\n');
                    line.clear();
                } else if sep == 1 {
                    line.push(' ');
                }
                line.push_str(token);
            }
            first_statement = false;
        }
        // No trailing newline; minified bytes are the product.
        if !line.is_empty() {
            self.output.push_str(&line);
        }
    }

    pub(crate) fn write_line(&mut self, text: &str, level: usize) {
        let effective = level.min(self.max_indent_level);
        for _ in 0..effective {
            self.output.push_str("  ");
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    pub(crate) fn indent_width(&self, level: usize) -> usize {
        level.min(self.max_indent_level) * 2
    }

    /// Emit every not-yet-printed comment that starts before `position`,
    /// each on its own line at the current indent.
    pub(crate) fn flush_comments_before(&mut self, position: usize, level: usize) {
        while self.comment_cursor < self.comments.len()
            && self.comments[self.comment_cursor].span.start < position
        {
            let text = self.comments[self.comment_cursor].text.clone();
            self.write_line(&text, level);
            self.comment_cursor += 1;
        }
    }

    fn flush_remaining_comments(&mut self) {
        self.flush_comments_before(usize::MAX, 0);
    }
}

/// Whether two adjacent tokens would lex differently without a space.
pub(crate) fn needs_space(last: char, next_token: &str) -> bool {
    let Some(next) = next_token.chars().next() else {
        return false;
    };
    let word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    if word(last) && word(next) {
        return true;
    }
    // `--` opens a comment; `..` next to `.` or a digit shifts token
    // boundaries.
    if last == '-' && next == '-' {
        return true;
    }
    if last == '.' && next == '.' {
        return true;
    }
    if last.is_ascii_digit() && next == '.' {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_prefer_the_rarer_character() {
        assert_eq!(quote_string("plain"), "\"plain\"");
        assert_eq!(quote_string("say \"hi\""), "'say \"hi\"'");
        assert_eq!(quote_string("it's"), "\"it's\"");
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(quote_string("a\nb"), "\"a\\nb\"");
        assert_eq!(quote_string("\u{1}9"), "\"\\0019\"");
        assert_eq!(quote_string("\u{1}x"), "\"\\1x\"");
    }

    #[test]
    fn high_bytes_are_escaped_numerically() {
        // 0xC3 0xA9 stored one byte per char round-trips as two escapes.
        assert_eq!(quote_string("h\u{c3}\u{a9}y"), "\"h\\195\\169y\"");
        assert_eq!(quote_string("h\u{e9}y"), "\"h\\233y\"");
        assert_eq!(quote_string("\u{7f}"), "\"\\127\"");
    }

    #[test]
    fn space_rules_cover_the_lexical_hazards() {
        assert!(needs_space('a', "b"));
        assert!(needs_space('1', "end"));
        assert!(needs_space('-', "-x"));
        assert!(needs_space('4', ".."));
        assert!(!needs_space(')', "("));
        assert!(!needs_space('=', "1"));
    }
}
