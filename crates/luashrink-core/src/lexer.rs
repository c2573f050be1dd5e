use crate::ast::Comment;
use crate::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Name(String),
    Number(f64),
    String(String),

    // Keywords
    And,
    Break,
    Do,
    Else,
    ElseIf,
    End,
    False,
    For,
    Function,
    If,
    In,
    Local,
    Nil,
    Not,
    Or,
    Repeat,
    Return,
    Then,
    True,
    Until,
    While,

    // Symbols
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Hash,
    Equal,
    NotEqual,
    LessThanOrEqual,
    GreaterThanOrEqual,
    LessThan,
    GreaterThan,
    Ampersand,
    Pipe,
    Tilde,
    ShiftLeft,
    ShiftRight,
    Assign,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Colon,
    Comma,
    Dot,
    Concat,
    Ellipsis,

    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LexerError {
    pub message: String,
    pub line: usize,
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at line {}", self.message, self.line)
    }
}

impl std::error::Error for LexerError {}

/// Hand-written lexer over the raw source bytes. Comments are collected to
/// the side (with spans and lines) instead of becoming tokens, so the parser
/// never sees them but the printer can re-attach them.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: usize,
    line: usize,
    comments: Vec<Comment>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            position: 0,
            line: 1,
            comments: Vec::new(),
        }
    }

    /// Tokenize the whole source, returning the token stream (terminated by
    /// Eof) and every comment encountered.
    pub fn tokenize(mut self) -> Result<(Vec<Token>, Vec<Comment>), LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok((tokens, self.comments))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.position + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.position += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn error(&self, message: impl Into<String>) -> LexerError {
        LexerError {
            message: message.into(),
            line: self.line,
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexerError> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.bump();
                }
                Some(b'-') if self.peek_at(1) == Some(b'-') => {
                    self.lex_comment()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_comment(&mut self) -> Result<(), LexerError> {
        let start = self.position;
        let line = self.line;
        self.bump();
        self.bump();

        // Long comment: --[[ ... ]] (with optional = levels)
        if self.peek() == Some(b'[') {
            let save = self.position;
            self.bump();
            let level = self.count_equals();
            if self.peek() == Some(b'[') {
                self.bump();
                self.read_long_bracket_body(level)?;
                let text = self.source[start..self.position].to_string();
                self.comments.push(Comment {
                    text,
                    span: Span::new(start, self.position, line),
                    line,
                });
                return Ok(());
            }
            self.position = save;
        }

        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.bump();
        }
        let text = self.source[start..self.position].to_string();
        self.comments.push(Comment {
            text,
            span: Span::new(start, self.position, line),
            line,
        });
        Ok(())
    }

    fn count_equals(&mut self) -> usize {
        let mut level = 0;
        while self.peek() == Some(b'=') {
            self.bump();
            level += 1;
        }
        level
    }

    /// Consume up to and including the closing `]==]` of the given level,
    /// returning the body's byte range.
    fn read_long_bracket_body(&mut self, level: usize) -> Result<(usize, usize), LexerError> {
        // A newline immediately after the opening bracket is skipped.
        if self.peek() == Some(b'\n') {
            self.bump();
        } else if self.peek() == Some(b'\r') {
            self.bump();
            if self.peek() == Some(b'\n') {
                self.bump();
            }
        }
        let body_start = self.position;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated long bracket")),
                Some(b']') => {
                    let save = self.position;
                    self.bump();
                    let close_level = self.count_equals();
                    if close_level == level && self.peek() == Some(b']') {
                        self.bump();
                        return Ok((body_start, save));
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace_and_comments()?;

        let start = self.position;
        let line = self.line;
        let make = |kind, start, end, line| Token {
            kind,
            span: Span::new(start, end, line),
        };

        let b = match self.peek() {
            Some(b) => b,
            None => return Ok(make(TokenKind::Eof, start, start, line)),
        };

        if b.is_ascii_digit() || (b == b'.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
        {
            let value = self.lex_number()?;
            return Ok(make(TokenKind::Number(value), start, self.position, line));
        }

        if b.is_ascii_alphabetic() || b == b'_' {
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
            {
                self.bump();
            }
            let word = &self.source[start..self.position];
            let kind = match word {
                "and" => TokenKind::And,
                "break" => TokenKind::Break,
                "do" => TokenKind::Do,
                "else" => TokenKind::Else,
                "elseif" => TokenKind::ElseIf,
                "end" => TokenKind::End,
                "false" => TokenKind::False,
                "for" => TokenKind::For,
                "function" => TokenKind::Function,
                "if" => TokenKind::If,
                "in" => TokenKind::In,
                "local" => TokenKind::Local,
                "nil" => TokenKind::Nil,
                "not" => TokenKind::Not,
                "or" => TokenKind::Or,
                "repeat" => TokenKind::Repeat,
                "return" => TokenKind::Return,
                "then" => TokenKind::Then,
                "true" => TokenKind::True,
                "until" => TokenKind::Until,
                "while" => TokenKind::While,
                _ => TokenKind::Name(word.to_string()),
            };
            return Ok(make(kind, start, self.position, line));
        }

        match b {
            b'"' | b'\'' => {
                let value = self.lex_short_string()?;
                Ok(make(TokenKind::String(value), start, self.position, line))
            }
            b'[' if matches!(self.peek_at(1), Some(b'[') | Some(b'=')) => {
                // Long string, unless the `=` run is not followed by `[`.
                let save = self.position;
                let save_line = self.line;
                self.bump();
                let level = self.count_equals();
                if self.peek() == Some(b'[') {
                    self.bump();
                    let (body_start, body_end) = self.read_long_bracket_body(level)?;
                    let value = bytes_to_string(&self.bytes[body_start..body_end]);
                    Ok(make(TokenKind::String(value), start, self.position, line))
                } else {
                    self.position = save;
                    self.line = save_line;
                    self.bump();
                    Ok(make(TokenKind::LeftBracket, start, self.position, line))
                }
            }
            _ => {
                self.bump();
                let kind = match b {
                    b'+' => TokenKind::Plus,
                    b'-' => TokenKind::Minus,
                    b'*' => TokenKind::Star,
                    b'/' => TokenKind::Slash,
                    b'%' => TokenKind::Percent,
                    b'^' => TokenKind::Caret,
                    b'#' => TokenKind::Hash,
                    b'(' => TokenKind::LeftParen,
                    b')' => TokenKind::RightParen,
                    b'{' => TokenKind::LeftBrace,
                    b'}' => TokenKind::RightBrace,
                    b'[' => TokenKind::LeftBracket,
                    b']' => TokenKind::RightBracket,
                    b';' => TokenKind::Semicolon,
                    b':' => TokenKind::Colon,
                    b',' => TokenKind::Comma,
                    b'=' => {
                        if self.peek() == Some(b'=') {
                            self.bump();
                            TokenKind::Equal
                        } else {
                            TokenKind::Assign
                        }
                    }
                    b'&' => TokenKind::Ampersand,
                    b'|' => TokenKind::Pipe,
                    b'~' => {
                        if self.peek() == Some(b'=') {
                            self.bump();
                            TokenKind::NotEqual
                        } else {
                            TokenKind::Tilde
                        }
                    }
                    b'<' => {
                        if self.peek() == Some(b'=') {
                            self.bump();
                            TokenKind::LessThanOrEqual
                        } else if self.peek() == Some(b'<') {
                            self.bump();
                            TokenKind::ShiftLeft
                        } else {
                            TokenKind::LessThan
                        }
                    }
                    b'>' => {
                        if self.peek() == Some(b'=') {
                            self.bump();
                            TokenKind::GreaterThanOrEqual
                        } else if self.peek() == Some(b'>') {
                            self.bump();
                            TokenKind::ShiftRight
                        } else {
                            TokenKind::GreaterThan
                        }
                    }
                    b'.' => {
                        if self.peek() == Some(b'.') {
                            self.bump();
                            if self.peek() == Some(b'.') {
                                self.bump();
                                TokenKind::Ellipsis
                            } else {
                                TokenKind::Concat
                            }
                        } else {
                            TokenKind::Dot
                        }
                    }
                    _ => {
                        return Err(
                            self.error(format!("unexpected character '{}'", b as char))
                        )
                    }
                };
                Ok(make(kind, start, self.position, line))
            }
        }
    }

    fn lex_number(&mut self) -> Result<f64, LexerError> {
        let start = self.position;

        // Hex literal
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.bump();
            self.bump();
            let digits_start = self.position;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.source[digits_start..self.position];
            if digits.is_empty() {
                return Err(self.error("malformed hex literal"));
            }
            let value = u64::from_str_radix(digits, 16)
                .map_err(|_| self.error("hex literal out of range"))?;
            return Ok(value as f64);
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some(b'.') && self.peek_at(1) != Some(b'.') {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            self.bump();
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.bump();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error("malformed number exponent"));
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }

        let text = &self.source[start..self.position];
        text.parse::<f64>()
            .map_err(|_| self.error(format!("malformed number '{text}'")))
    }

    /// Lua strings are byte strings. Literal contents are stored one source
    /// byte per `char` (scalar values 0..=255); the printer escapes every
    /// value outside printable ASCII numerically, so the emitted literal
    /// denotes exactly the input bytes.
    fn lex_short_string(&mut self) -> Result<String, LexerError> {
        let quote = self.bump().unwrap_or(b'"');
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(b) if b == quote => return Ok(value),
                Some(b'\n') => return Err(self.error("unterminated string")),
                Some(b'\\') => match self.bump() {
                    None => return Err(self.error("unterminated string escape")),
                    Some(b'n') => value.push('\n'),
                    Some(b't') => value.push('\t'),
                    Some(b'r') => value.push('\r'),
                    Some(b'a') => value.push('\x07'),
                    Some(b'b') => value.push('\x08'),
                    Some(b'f') => value.push('\x0c'),
                    Some(b'v') => value.push('\x0b'),
                    Some(b'\\') => value.push('\\'),
                    Some(b'"') => value.push('"'),
                    Some(b'\'') => value.push('\''),
                    Some(b'\n') => value.push('\n'),
                    Some(d) if d.is_ascii_digit() => {
                        let mut code = (d - b'0') as u32;
                        for _ in 0..2 {
                            match self.peek() {
                                Some(d2) if d2.is_ascii_digit() => {
                                    code = code * 10 + (d2 - b'0') as u32;
                                    self.bump();
                                }
                                _ => break,
                            }
                        }
                        if code > 255 {
                            return Err(self.error("decimal escape out of range"));
                        }
                        value.push(code as u8 as char);
                    }
                    Some(other) => {
                        return Err(
                            self.error(format!("invalid escape '\\{}'", other as char))
                        )
                    }
                },
                Some(b) => value.push(b as char),
            }
        }
    }
}

/// One byte per `char`, the string-literal storage convention.
fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, _) = Lexer::new(source).tokenize().expect("lex failed");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_keywords_and_names() {
        assert_eq!(
            kinds("local x = nil"),
            vec![
                TokenKind::Local,
                TokenKind::Name("x".into()),
                TokenKind::Assign,
                TokenKind::Nil,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(
            kinds("1 0.5 .5 1e3 0x10"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(0.5),
                TokenKind::Number(0.5),
                TokenKind::Number(1000.0),
                TokenKind::Number(16.0),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn distinguishes_concat_from_dots() {
        assert_eq!(
            kinds("a..b ... a.b"),
            vec![
                TokenKind::Name("a".into()),
                TokenKind::Concat,
                TokenKind::Name("b".into()),
                TokenKind::Ellipsis,
                TokenKind::Name("a".into()),
                TokenKind::Dot,
                TokenKind::Name("b".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn number_followed_by_concat() {
        // `4..""` must lex as number, concat, string.
        assert_eq!(
            kinds("4 ..\"\""),
            vec![
                TokenKind::Number(4.0),
                TokenKind::Concat,
                TokenKind::String(String::new()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn collects_comments_with_lines() {
        let (tokens, comments) = Lexer::new("-- first\nlocal x --[[ second ]] = 1\n")
            .tokenize()
            .expect("lex failed");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].line, 1);
        assert_eq!(comments[1].line, 2);
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Local));
    }

    #[test]
    fn lexes_long_strings() {
        assert_eq!(
            kinds("[[hello]] [==[a]b]==]"),
            vec![
                TokenKind::String("hello".into()),
                TokenKind::String("a]b".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\nb\065""#),
            vec![TokenKind::String("a\nbA".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn string_contents_are_one_byte_per_char() {
        // `é` is the two UTF-8 bytes 0xC3 0xA9; each byte is its own char.
        assert_eq!(
            kinds("\"h\u{e9}y\""),
            vec![TokenKind::String("h\u{c3}\u{a9}y".into()), TokenKind::Eof]
        );
        // A decimal escape is exactly one byte, never re-encoded.
        assert_eq!(
            kinds(r#""h\233y""#),
            vec![TokenKind::String("h\u{e9}y".into()), TokenKind::Eof]
        );
        assert_eq!(
            kinds("[[h\u{e9}y]]"),
            vec![TokenKind::String("h\u{c3}\u{a9}y".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_bitwise_and_shift_operators() {
        assert_eq!(
            kinds("a & b | c ~ d << e >> f ~= g"),
            vec![
                TokenKind::Name("a".into()),
                TokenKind::Ampersand,
                TokenKind::Name("b".into()),
                TokenKind::Pipe,
                TokenKind::Name("c".into()),
                TokenKind::Tilde,
                TokenKind::Name("d".into()),
                TokenKind::ShiftLeft,
                TokenKind::Name("e".into()),
                TokenKind::ShiftRight,
                TokenKind::Name("f".into()),
                TokenKind::NotEqual,
                TokenKind::Name("g".into()),
                TokenKind::Eof
            ]
        );
    }
}
