//! # SQL Lexer - Zero-Copy Tokenizer
//!
//! This module implements the SQL lexer used both by the parser and by the
//! verifier's keyword scan. Tokens borrow their text from the input string;
//! nothing is allocated while scanning.
//!
//! ## Design Goals
//!
//! 1. **Zero-copy tokenization**: Tokens borrow from input, never allocate
//! 2. **O(1) keyword lookup**: Uses phf perfect hash map for keywords
//! 3. **Comment transparency**: `--` and nested `/* */` comments never
//!    produce tokens, so nothing can hide inside or behind them
//! 4. **Byte spans**: Every token records its byte range for error reporting
//!
//! ## Token Types
//!
//! - **Keywords**: SELECT-statement keywords plus the denylisted statement
//!   keywords (DROP, INSERT, SYSTEM, ...)
//! - **Identifiers**: Unquoted (`fare_amount`), quoted (`"Column"`),
//!   backtick (`` `order` ``)
//! - **Literals**: Strings (`'CMT'`, `''` escapes), integers, floats
//! - **Operators**: `+ - * / % || = != <> < <= > >=`
//! - **Punctuation**: Parentheses, comma, semicolon, dot
//!
//! ## Keyword Lookup
//!
//! Keywords are matched case-insensitively through a compile-time perfect
//! hash map. Words not in the map are identifiers, which keeps function
//! names like `count` or `dateDiff` and time units like `HOUR` out of the
//! reserved set.
//!
//! ## Usage Example
//!
//! ```ignore
//! use sqlfence::sql::{Lexer, Token};
//!
//! let mut lexer = Lexer::new("SELECT count() FROM trips");
//! loop {
//!     let token = lexer.next_token();
//!     println!("{:?} at {:?}", token, lexer.span());
//!     if token.is_eof() { break; }
//! }
//! ```
//!
//! ## Error Handling
//!
//! Invalid input produces `Token::Error` with a descriptive message. The
//! lexer keeps going after an error so a scan can still see later tokens.

use super::token::{Keyword, Span, Token};
use phf::phf_map;
use std::borrow::Cow;

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "SELECT" => Keyword::Select,
    "FROM" => Keyword::From,
    "WHERE" => Keyword::Where,
    "GROUP" => Keyword::Group,
    "BY" => Keyword::By,
    "HAVING" => Keyword::Having,
    "ORDER" => Keyword::Order,
    "LIMIT" => Keyword::Limit,
    "OFFSET" => Keyword::Offset,
    "AS" => Keyword::As,
    "DISTINCT" => Keyword::Distinct,
    "ALL" => Keyword::All,
    "ASC" => Keyword::Asc,
    "DESC" => Keyword::Desc,
    "NULLS" => Keyword::Nulls,
    "FIRST" => Keyword::First,
    "LAST" => Keyword::Last,
    "WITH" => Keyword::With,
    "FORMAT" => Keyword::Format,
    "SETTINGS" => Keyword::Settings,
    "JOIN" => Keyword::Join,
    "INNER" => Keyword::Inner,
    "LEFT" => Keyword::Left,
    "RIGHT" => Keyword::Right,
    "FULL" => Keyword::Full,
    "OUTER" => Keyword::Outer,
    "CROSS" => Keyword::Cross,
    "ON" => Keyword::On,
    "USING" => Keyword::Using,
    "UNION" => Keyword::Union,
    "INTERSECT" => Keyword::Intersect,
    "EXCEPT" => Keyword::Except,
    "AND" => Keyword::And,
    "OR" => Keyword::Or,
    "NOT" => Keyword::Not,
    "IN" => Keyword::In,
    "IS" => Keyword::Is,
    "NULL" => Keyword::Null,
    "BETWEEN" => Keyword::Between,
    "LIKE" => Keyword::Like,
    "ILIKE" => Keyword::Ilike,
    "EXISTS" => Keyword::Exists,
    "CASE" => Keyword::Case,
    "WHEN" => Keyword::When,
    "THEN" => Keyword::Then,
    "ELSE" => Keyword::Else,
    "END" => Keyword::End,
    "CAST" => Keyword::Cast,
    "TRUE" => Keyword::True,
    "FALSE" => Keyword::False,
    "INTERVAL" => Keyword::Interval,
    "OVER" => Keyword::Over,
    "PARTITION" => Keyword::Partition,
    "INSERT" => Keyword::Insert,
    "UPDATE" => Keyword::Update,
    "DELETE" => Keyword::Delete,
    "DROP" => Keyword::Drop,
    "CREATE" => Keyword::Create,
    "ALTER" => Keyword::Alter,
    "TRUNCATE" => Keyword::Truncate,
    "GRANT" => Keyword::Grant,
    "REVOKE" => Keyword::Revoke,
    "ATTACH" => Keyword::Attach,
    "DETACH" => Keyword::Detach,
    "RENAME" => Keyword::Rename,
    "OPTIMIZE" => Keyword::Optimize,
    "KILL" => Keyword::Kill,
    "SYSTEM" => Keyword::System,
    "ADMIN" => Keyword::Admin,
    "SET" => Keyword::Set,
    "USE" => Keyword::Use,
    "EXCHANGE" => Keyword::Exchange,
    "INTO" => Keyword::Into,
    "OUTFILE" => Keyword::Outfile,
};

/// Case-insensitive keyword lookup.
pub fn lookup_keyword(word: &str) -> Option<Keyword> {
    KEYWORDS.get(word.to_ascii_uppercase().as_str()).copied()
}

pub fn is_keyword(word: &str) -> bool {
    lookup_keyword(word).is_some()
}

/// Decodes the body of a quoted token. Backslash escapes resolve to the
/// character they name and a doubled `quote` collapses to one. Borrows
/// when there is nothing to decode.
pub fn unescape(raw: &str, quote: char) -> Cow<'_, str> {
    if !raw.contains('\\') && !raw.contains(quote) {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some('b') => out.push('\u{8}'),
                Some('f') => out.push('\u{c}'),
                Some('a') => out.push('\u{7}'),
                Some('v') => out.push('\u{b}'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            c if c == quote => {
                out.push(c);
                chars.next_if_eq(&quote);
            }
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    token_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            token_start: 0,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Span of the most recently scanned token.
    pub fn span(&self) -> Span {
        Span::new(self.token_start, self.pos - self.token_start)
    }

    /// Source text covered by `span`, empty if the span is out of range or
    /// splits a multi-byte character.
    pub fn text(&self, span: Span) -> &'a str {
        self.input.get(span.start..span.end()).unwrap_or("")
    }

    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace();
        self.token_start = self.pos;

        if self.is_eof() {
            return Token::Eof;
        }

        let ch = self.current();

        if ch.is_ascii_alphabetic() || ch == b'_' {
            return self.scan_identifier_or_keyword();
        }

        if ch.is_ascii_digit() {
            return self.scan_number();
        }

        match ch {
            b'\'' => self.scan_string(),
            b'"' => self.scan_quoted_identifier(b'"'),
            b'`' => self.scan_quoted_identifier(b'`'),
            b'-' => self.scan_minus(),
            b'/' => self.scan_slash(),
            b'+' => {
                self.advance();
                Token::Plus
            }
            b'*' => {
                self.advance();
                Token::Star
            }
            b'%' => {
                self.advance();
                Token::Percent
            }
            b'|' => self.scan_pipe(),
            b'=' => self.scan_equals(),
            b'<' => self.scan_less_than(),
            b'>' => self.scan_greater_than(),
            b'!' => self.scan_exclamation(),
            b'(' => {
                self.advance();
                Token::LParen
            }
            b')' => {
                self.advance();
                Token::RParen
            }
            b',' => {
                self.advance();
                Token::Comma
            }
            b';' => {
                self.advance();
                Token::Semicolon
            }
            b'.' => self.scan_dot(),
            _ => {
                self.advance();
                Token::Error("unexpected character")
            }
        }
    }

    pub fn peek(&mut self) -> Token<'a> {
        let saved_pos = self.pos;
        let saved_line = self.line;
        let saved_column = self.column;
        let saved_token_start = self.token_start;

        let token = self.next_token();

        self.pos = saved_pos;
        self.line = saved_line;
        self.column = saved_column;
        self.token_start = saved_token_start;

        token
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn current(&self) -> u8 {
        self.bytes[self.pos]
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            if self.current() == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() {
            match self.current() {
                b' ' | b'\t' | b'\r' | b'\n' => self.advance(),
                _ => break,
            }
        }
    }

    fn scan_identifier_or_keyword(&mut self) -> Token<'a> {
        let start = self.pos;

        while !self.is_eof() && (self.current().is_ascii_alphanumeric() || self.current() == b'_') {
            self.advance();
        }

        let ident = &self.input[start..self.pos];

        match lookup_keyword(ident) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Ident(ident),
        }
    }

    fn scan_number(&mut self) -> Token<'a> {
        let start = self.pos;

        while !self.is_eof() && self.current().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;

        if !self.is_eof() && self.current() == b'.' {
            if let Some(next) = self.peek_char() {
                if next.is_ascii_digit() {
                    is_float = true;
                    self.advance();
                    while !self.is_eof() && self.current().is_ascii_digit() {
                        self.advance();
                    }
                }
            }
        }

        if !self.is_eof() && (self.current() == b'e' || self.current() == b'E') {
            let exponent_digit = match self.peek_char() {
                Some(b'+') | Some(b'-') => self
                    .bytes
                    .get(self.pos + 2)
                    .is_some_and(|b| b.is_ascii_digit()),
                Some(b) => b.is_ascii_digit(),
                None => false,
            };
            if exponent_digit {
                is_float = true;
                self.advance();
                if self.current() == b'+' || self.current() == b'-' {
                    self.advance();
                }
                while !self.is_eof() && self.current().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        if !self.is_eof() && (self.current().is_ascii_alphabetic() || self.current() == b'_') {
            while !self.is_eof()
                && (self.current().is_ascii_alphanumeric() || self.current() == b'_')
            {
                self.advance();
            }
            return Token::Error("malformed number");
        }

        let num_str = &self.input[start..self.pos];
        if is_float {
            Token::Float(num_str)
        } else {
            Token::Integer(num_str)
        }
    }

    fn scan_string(&mut self) -> Token<'a> {
        self.advance();
        let start = self.pos;

        loop {
            if self.is_eof() {
                return Token::Error("unterminated string");
            }

            match self.current() {
                b'\\' => {
                    self.advance();
                    if self.is_eof() {
                        return Token::Error("unterminated string");
                    }
                    self.advance();
                }
                b'\'' if self.peek_char() == Some(b'\'') => {
                    self.advance();
                    self.advance();
                }
                b'\'' => {
                    let end = self.pos;
                    self.advance();
                    return Token::String(&self.input[start..end]);
                }
                _ => self.advance(),
            }
        }
    }

    fn scan_quoted_identifier(&mut self, quote: u8) -> Token<'a> {
        self.advance();
        let start = self.pos;

        loop {
            if self.is_eof() {
                return Token::Error("unterminated quoted identifier");
            }

            if self.current() == b'\\' {
                self.advance();
                if self.is_eof() {
                    return Token::Error("unterminated quoted identifier");
                }
                self.advance();
            } else if self.current() == quote {
                if self.peek_char() == Some(quote) {
                    self.advance();
                    self.advance();
                } else {
                    let end = self.pos;
                    self.advance();
                    if end == start {
                        return Token::Error("empty quoted identifier");
                    }
                    return Token::QuotedIdent(&self.input[start..end]);
                }
            } else {
                self.advance();
            }
        }
    }

    fn scan_minus(&mut self) -> Token<'a> {
        self.advance();

        if !self.is_eof() && self.current() == b'-' {
            while !self.is_eof() && self.current() != b'\n' {
                self.advance();
            }
            return self.next_token();
        }

        Token::Minus
    }

    fn scan_slash(&mut self) -> Token<'a> {
        self.advance();

        if !self.is_eof() && self.current() == b'*' {
            self.advance();
            self.scan_block_comment()
        } else {
            Token::Slash
        }
    }

    fn scan_block_comment(&mut self) -> Token<'a> {
        let mut depth = 1;

        while !self.is_eof() && depth > 0 {
            if self.current() == b'/' && self.peek_char() == Some(b'*') {
                self.advance();
                self.advance();
                depth += 1;
            } else if self.current() == b'*' && self.peek_char() == Some(b'/') {
                self.advance();
                self.advance();
                depth -= 1;
            } else {
                self.advance();
            }
        }

        if depth > 0 {
            return Token::Error("unterminated block comment");
        }

        self.next_token()
    }

    fn scan_pipe(&mut self) -> Token<'a> {
        self.advance();

        if !self.is_eof() && self.current() == b'|' {
            self.advance();
            Token::DoublePipe
        } else {
            Token::Error("expected '|' after '|'")
        }
    }

    fn scan_equals(&mut self) -> Token<'a> {
        self.advance();

        // `==` is an accepted spelling of equality
        if !self.is_eof() && self.current() == b'=' {
            self.advance();
        }
        Token::Eq
    }

    fn scan_less_than(&mut self) -> Token<'a> {
        self.advance();

        if self.is_eof() {
            return Token::Lt;
        }

        match self.current() {
            b'=' => {
                self.advance();
                Token::LtEq
            }
            b'>' => {
                self.advance();
                Token::NotEq
            }
            _ => Token::Lt,
        }
    }

    fn scan_greater_than(&mut self) -> Token<'a> {
        self.advance();

        if !self.is_eof() && self.current() == b'=' {
            self.advance();
            Token::GtEq
        } else {
            Token::Gt
        }
    }

    fn scan_exclamation(&mut self) -> Token<'a> {
        self.advance();

        if !self.is_eof() && self.current() == b'=' {
            self.advance();
            Token::NotEq
        } else {
            Token::Error("expected '=' after '!'")
        }
    }

    fn scan_dot(&mut self) -> Token<'a> {
        self.advance();

        if !self.is_eof() && self.current().is_ascii_digit() {
            let start = self.pos - 1;
            while !self.is_eof() && self.current().is_ascii_digit() {
                self.advance();
            }
            Token::Float(&self.input[start..self.pos])
        } else {
            Token::Dot
        }
    }
}
