//! Positioned byte cursor and token scanners.
//!
//! `read_*` scanners fail with [`LexError`] on mismatch.
//! `maybe_*` scanners restore the cursor and return `None` (or `false`) instead.

use thiserror::Error;

use super::diag::Position;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Expected '{expected}', got '{got}'")]
    Expected { expected: char, got: char },
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("Newline is not allowed in a single-line string")]
    NewlineInString,
    #[error("Missing closing {0}")]
    Unterminated(&'static str),
    #[error("Invalid number literal: {0:?}")]
    InvalidNumber(String),
    #[error("Invalid UTF-8 in literal")]
    InvalidUtf8,
}

/// Snapshot of a cursor position, used to backtrack speculative reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pos: usize,
    row: usize,
    col: usize,
}

/// Byte reader over an in-memory document that tracks row and column.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    row: usize,
    col: usize,
}

#[inline]
fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

#[inline]
fn is_ident_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a str) -> Self {
        Self {
            buf: data.as_bytes(),
            pos: 0,
            row: 0,
            col: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> Position {
        Position::new(self.row, self.col)
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    #[inline]
    pub fn tell(&self) -> State {
        State {
            pos: self.pos,
            row: self.row,
            col: self.col,
        }
    }

    #[inline]
    pub fn seek(&mut self, state: State) {
        self.pos = state.pos;
        self.row = state.row;
        self.col = state.col;
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Look at the next `n` bytes without consuming them.
    #[inline]
    pub fn peek_n(&self, n: usize) -> Option<&'a [u8]> {
        self.buf.get(self.pos..self.pos + n)
    }

    #[inline]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.buf[self.pos..].starts_with(prefix.as_bytes())
    }

    pub fn next_char(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;

        if ch == b'\n' {
            self.row += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }

        Some(ch)
    }

    pub fn consume_n(&mut self, n: usize) -> Result<(), LexError> {
        for _ in 0..n {
            self.next_char().ok_or(LexError::UnexpectedEof)?;
        }
        Ok(())
    }

    /// Step back `n` bytes, recomputing the row and column.
    pub fn rewind(&mut self, n: usize) {
        let target = self.pos.saturating_sub(n);
        let crossed = self.buf[target..self.pos].iter().filter(|&&ch| ch == b'\n').count();

        self.pos = target;
        self.row -= crossed;
        self.col = match self.buf[..target].iter().rposition(|&ch| ch == b'\n') {
            Some(nl) => target - nl - 1,
            None => target,
        };
    }

    pub fn expect(&mut self, expected: char) -> Result<(), LexError> {
        match self.peek() {
            Some(ch) if ch == expected as u8 => {
                self.next_char();
                Ok(())
            }
            Some(ch) => Err(LexError::Expected {
                expected,
                got: ch as char,
            }),
            None => Err(LexError::UnexpectedEof),
        }
    }

    /// Consume `ch` if it is next.
    pub fn maybe_char(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch as u8) {
            self.next_char();
            true
        } else {
            false
        }
    }

    /// Consume `keyword` if it is next and not followed by an identifier character.
    pub fn maybe_keyword(&mut self, keyword: &str) -> bool {
        if !self.starts_with(keyword) {
            return false;
        }

        if self.buf.get(self.pos + keyword.len()).copied().is_some_and(is_ident_char) {
            return false;
        }

        // Keywords never span lines.
        self.pos += keyword.len();
        self.col += keyword.len();
        true
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\x0c') = self.peek() {
            self.next_char();
        }
    }

    pub fn skip_whitespace_and_newline(&mut self) {
        while let Some(b' ' | b'\t' | b'\x0c' | b'\n' | b'\r') = self.peek() {
            self.next_char();
        }
    }

    /// Skip to the start of the next line.
    pub fn skip_until_newline(&mut self) {
        while let Some(ch) = self.next_char() {
            if ch == b'\n' {
                break;
            }
        }
    }

    /// Skip blanks, newlines and `#` comments. `;` counts as a newline when allowed.
    pub fn skip_comment_and_whitespace_and_newline(&mut self, allow_semicolon: bool) {
        loop {
            self.skip_whitespace_and_newline();

            match self.peek() {
                Some(b'#') => self.skip_until_newline(),
                Some(b';') if allow_semicolon => {
                    self.next_char();
                }
                _ => break,
            }
        }
    }

    /// Rest of the current line, not including the newline.
    pub fn read_until_newline(&mut self) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == b'\n' || ch == b'\r' {
                break;
            }
            self.next_char();
        }

        String::from_utf8_lossy(&self.buf[start..self.pos]).into_owned()
    }

    #[inline]
    fn slice(&self, start: usize) -> Result<String, LexError> {
        std::str::from_utf8(&self.buf[start..self.pos])
            .map(str::to_owned)
            .map_err(|_| LexError::InvalidUtf8)
    }

    /// `[_a-zA-Z][_a-zA-Z0-9]*`
    pub fn read_identifier(&mut self) -> Result<String, LexError> {
        let start = self.pos;

        match self.peek() {
            Some(ch) if is_ident_start(ch) => {
                self.next_char();
            }
            Some(ch) => return Err(LexError::InvalidIdentifier((ch as char).to_string())),
            None => return Err(LexError::UnexpectedEof),
        }

        while self.peek().is_some_and(is_ident_char) {
            self.next_char();
        }

        self.slice(start)
    }

    /// Property name: a namespaced identifier with an optional `.connect` or
    /// `.timeSamples` suffix.
    pub fn read_prim_attr_identifier(&mut self) -> Result<String, LexError> {
        let start = self.pos;

        if !self.peek().is_some_and(is_ident_start) {
            return match self.peek() {
                Some(ch) => Err(LexError::InvalidIdentifier((ch as char).to_string())),
                None => Err(LexError::UnexpectedEof),
            };
        }

        while self
            .peek()
            .is_some_and(|ch| is_ident_char(ch) || ch == b':' || ch == b'.')
        {
            self.next_char();
        }

        let ident = self.slice(start)?;
        let invalid = || LexError::InvalidIdentifier(ident.clone());

        let (ns, suffix) = match ident.split_once('.') {
            Some((ns, suffix)) => (ns, Some(suffix)),
            None => (ident.as_str(), None),
        };

        if ns.is_empty() || ns.ends_with(':') || ns.contains("::") {
            return Err(invalid());
        }

        if let Some(suffix) = suffix {
            if suffix != "connect" && suffix != "timeSamples" {
                return Err(invalid());
            }
        }

        Ok(ident)
    }

    /// Single or double quoted string on one line.
    pub fn read_string_literal(&mut self) -> Result<String, LexError> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            Some(ch) => {
                return Err(LexError::Expected {
                    expected: '"',
                    got: ch as char,
                })
            }
            None => return Err(LexError::UnexpectedEof),
        };
        self.next_char();

        let mut out = Vec::new();
        loop {
            let ch = self.next_char().ok_or(LexError::Unterminated("quote"))?;
            match ch {
                b'\n' | b'\r' => return Err(LexError::NewlineInString),
                b'\\' => {
                    let escaped = self.next_char().ok_or(LexError::Unterminated("quote"))?;
                    match escaped {
                        b'n' => out.push(b'\n'),
                        b't' => out.push(b'\t'),
                        b'\\' | b'"' | b'\'' => out.push(escaped),
                        other => out.extend_from_slice(&[b'\\', other]),
                    }
                }
                ch if ch == quote => break,
                ch => out.push(ch),
            }
        }

        String::from_utf8(out).map_err(|_| LexError::InvalidUtf8)
    }

    /// `"""..."""` or `'''...'''`. Newlines are kept.
    pub fn maybe_triple_quoted_string(&mut self) -> Option<String> {
        let delim = if self.starts_with("\"\"\"") {
            "\"\"\""
        } else if self.starts_with("'''") {
            "'''"
        } else {
            return None;
        };

        let state = self.tell();
        match self.read_delimited(delim, b'\\') {
            Ok(s) => Some(s),
            Err(err) => {
                log::trace!("Not a triple quoted string: {err}");
                self.seek(state);
                None
            }
        }
    }

    /// Reads `delim ... delim`, where `escape` followed by `delim` is a literal delimiter.
    fn read_delimited(&mut self, delim: &'static str, escape: u8) -> Result<String, LexError> {
        self.consume_n(delim.len())?;

        let mut out = Vec::new();
        loop {
            if self.eof() {
                return Err(LexError::Unterminated(delim));
            }

            if self.peek() == Some(escape) && self.buf[self.pos + 1..].starts_with(delim.as_bytes()) {
                self.next_char();
                self.consume_n(delim.len())?;
                out.extend_from_slice(delim.as_bytes());
                continue;
            }

            if self.starts_with(delim) {
                self.consume_n(delim.len())?;
                break;
            }

            if let Some(ch) = self.next_char() {
                out.push(ch);
            }
        }

        String::from_utf8(out).map_err(|_| LexError::InvalidUtf8)
    }

    /// Any quoted string, triple quoted first.
    pub fn maybe_string(&mut self) -> Option<String> {
        if let Some(s) = self.maybe_triple_quoted_string() {
            return Some(s);
        }

        if !matches!(self.peek(), Some(b'"' | b'\'')) {
            return None;
        }

        let state = self.tell();
        match self.read_string_literal() {
            Ok(s) => Some(s),
            Err(err) => {
                log::trace!("Not a string literal: {err}");
                self.seek(state);
                None
            }
        }
    }

    /// Like [`Cursor::maybe_string`], but a missing string is an error.
    pub fn read_string(&mut self) -> Result<String, LexError> {
        if let Some(s) = self.maybe_triple_quoted_string() {
            return Ok(s);
        }

        self.read_string_literal()
    }

    /// `<...>` without the angle brackets.
    pub fn read_path_identifier(&mut self) -> Result<String, LexError> {
        self.expect('<')?;

        let start = self.pos;
        loop {
            match self.peek() {
                Some(b'>') => break,
                Some(b'\n' | b'\r') | None => return Err(LexError::Unterminated(">")),
                Some(_) => {
                    self.next_char();
                }
            }
        }

        let path = self.slice(start)?;
        self.next_char();

        Ok(path)
    }

    /// `@path@`, `@@@path@@@` or a quoted string.
    pub fn parse_asset_identifier(&mut self) -> Result<String, LexError> {
        if self.starts_with("@@@") {
            return self.read_delimited("@@@", b'\\');
        }

        if self.peek() == Some(b'@') {
            self.next_char();

            let start = self.pos;
            loop {
                match self.peek() {
                    Some(b'@') => break,
                    Some(b'\n' | b'\r') | None => return Err(LexError::Unterminated("@")),
                    Some(_) => {
                        self.next_char();
                    }
                }
            }

            let asset = self.slice(start)?;
            self.next_char();
            return Ok(asset);
        }

        self.read_string()
    }

    /// Scan a numeric literal:
    /// `[sign](digits '.' digits? | '.' digits | digits)[('e'|'E')[sign]digits]`.
    ///
    /// The literal must not run into identifier characters.
    pub fn lex_float(&mut self) -> Result<String, LexError> {
        let start = self.pos;
        let state = self.tell();

        let fail = |this: &mut Self| {
            let end = this.pos.max(start + 1).min(this.buf.len());
            let text = String::from_utf8_lossy(&this.buf[start..end]).into_owned();
            this.seek(state);
            Err(LexError::InvalidNumber(text))
        };

        if let Some(b'+' | b'-') = self.peek() {
            self.next_char();
        }

        let int_digits = self.skip_digits();
        let mut frac_digits = 0;
        if self.peek() == Some(b'.') {
            self.next_char();
            frac_digits = self.skip_digits();
        }

        if int_digits == 0 && frac_digits == 0 {
            return fail(self);
        }

        if let Some(b'e' | b'E') = self.peek() {
            self.next_char();
            if let Some(b'+' | b'-') = self.peek() {
                self.next_char();
            }
            if self.skip_digits() == 0 {
                return fail(self);
            }
        }

        if self.peek().is_some_and(|ch| is_ident_char(ch) || ch == b'.') {
            self.next_char();
            return fail(self);
        }

        self.slice(start)
    }

    fn skip_digits(&mut self) -> usize {
        let mut count = 0;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.next_char();
            count += 1;
        }
        count
    }
}
