//! Lexer for rogscript
//!
//! Converts a source line into a stream of tokens. Scanning never stops at
//! the first problem: bad characters are recorded and skipped so that one
//! pass reports every error in the line.

use crate::error::{ScanError, ScanErrorKind};
use crate::token::{lookup_keyword, Span, Token, TokenKind};

/// The lexer state
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    line: usize,
    column: usize,
    errors: Vec<ScanError>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from source code
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// Returns every collected scan error if there was at least one.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, Vec<ScanError>> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token() {
            tokens.push(token);
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.current_pos, self.current_pos, self.line, self.column),
            String::new(),
        ));

        if self.errors.is_empty() {
            tracing::trace!(count = tokens.len(), "scanned tokens");
            Ok(tokens)
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    /// Get the next token, or `None` at end of input
    fn next_token(&mut self) -> Option<Token> {
        loop {
            self.skip_whitespace_and_comments();

            let &(start_pos, ch) = self.chars.peek()?;
            let start_line = self.line;
            let start_column = self.column;

            let kind = match ch {
                '(' => { self.advance(); TokenKind::LeftParen }
                ')' => { self.advance(); TokenKind::RightParen }
                '{' => { self.advance(); TokenKind::LeftBrace }
                '}' => { self.advance(); TokenKind::RightBrace }
                '[' => { self.advance(); TokenKind::LeftBracket }
                ']' => { self.advance(); TokenKind::RightBracket }
                ',' => { self.advance(); TokenKind::Comma }
                ';' => { self.advance(); TokenKind::Semicolon }
                ':' => { self.advance(); TokenKind::Colon }
                '.' => { self.advance(); TokenKind::Dot }
                '+' => { self.advance(); TokenKind::Plus }
                '-' => { self.advance(); TokenKind::Minus }
                '*' => { self.advance(); TokenKind::Star }
                '/' => { self.advance(); TokenKind::Slash }

                '=' => {
                    self.advance();
                    if self.match_char('=') {
                        TokenKind::EqualEqual
                    } else if self.match_char('>') {
                        TokenKind::FatArrow
                    } else {
                        TokenKind::Equal
                    }
                }
                '!' => {
                    self.advance();
                    if self.match_char('=') { TokenKind::BangEqual } else { TokenKind::Bang }
                }
                '<' => {
                    self.advance();
                    if self.match_char('=') { TokenKind::LessEqual } else { TokenKind::Less }
                }
                '>' => {
                    self.advance();
                    if self.match_char('=') { TokenKind::GreaterEqual } else { TokenKind::Greater }
                }
                '&' | '|' => {
                    self.advance();
                    if self.match_char(ch) {
                        if ch == '&' { TokenKind::AndAnd } else { TokenKind::OrOr }
                    } else {
                        self.error(ScanErrorKind::BadCharacter(ch), start_pos, start_line, start_column);
                        continue;
                    }
                }

                '"' => match self.scan_string(start_pos, start_line, start_column) {
                    Some(kind) => kind,
                    // An unterminated string consumes the rest of the input
                    None => return None,
                },

                c if c.is_ascii_digit() => self.scan_number(),

                c if c.is_alphabetic() || c == '_' => self.scan_identifier(),

                _ => {
                    self.advance();
                    self.error(ScanErrorKind::BadCharacter(ch), start_pos, start_line, start_column);
                    continue;
                }
            };

            let lexeme = self.source[start_pos..self.current_pos].to_string();

            return Some(Token::new(
                kind,
                Span::new(start_pos, self.current_pos, start_line, start_column),
                lexeme,
            ));
        }
    }

    fn error(&mut self, kind: ScanErrorKind, start: usize, line: usize, column: usize) {
        self.errors.push(ScanError::at(
            kind,
            Span::new(start, self.current_pos, line, column),
        ));
    }

    /// Advance and return the current character
    fn advance(&mut self) -> Option<char> {
        let (pos, ch) = self.chars.next()?;
        self.current_pos = pos + ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip whitespace and `//` comments
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.source[self.current_pos..].starts_with("//") => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Scan a string literal. Returns `None` when input ends before the
    /// closing quote, after recording a single error.
    fn scan_string(&mut self, start_pos: usize, start_line: usize, start_column: usize) -> Option<TokenKind> {
        // Opening quote
        self.advance();

        let mut value = String::new();

        loop {
            match self.advance() {
                Some('"') => return Some(TokenKind::String(value)),
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    // Backslash was the last character in the input
                    None => break,
                },
                Some(c) => value.push(c),
                None => break,
            }
        }

        self.error(ScanErrorKind::UnterminatedString, start_pos, start_line, start_column);
        None
    }

    /// Scan an integer or decimal literal
    fn scan_number(&mut self) -> TokenKind {
        let start = self.current_pos;

        self.consume_digits();

        // A '.' only belongs to the number when a digit follows it
        if self.peek_char() == Some('.') {
            let after_dot = self.source[self.current_pos..].chars().nth(1);
            if after_dot.is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
                self.consume_digits();
            }
        }

        let text = &self.source[start..self.current_pos];
        // Digits with at most one interior '.' always parse
        TokenKind::Number(text.parse::<f64>().unwrap_or_default())
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.current_pos;

        while self.peek_char().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }

        let text = &self.source[start..self.current_pos];
        lookup_keyword(text).unwrap_or_else(|| TokenKind::Ident(text.to_string()))
    }
}
