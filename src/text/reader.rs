//! Text reader.
//!
//! A single-pass, char-position parser with line and column tracking for
//! error messages. Beyond strict JSON it skips `//` and `/* */` comments and
//! accepts trailing commas. Every number is read as an exact decimal.

use crate::{Document, Error, Options, Result, Value};
use bigdecimal::BigDecimal;
use std::str::FromStr;

/// Nesting limit; deeper input is rejected instead of exhausting the stack.
const MAX_DEPTH: usize = 512;

pub struct Reader<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
    depth: usize,
    trim_strings: bool,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str, options: &Options) -> Self {
        Reader {
            input,
            position: 0,
            line: 1,
            column: 1,
            depth: 0,
            trim_strings: options.trim_strings,
        }
    }

    /// Reads one value spanning the whole input.
    pub fn read_value(&mut self) -> Result<Value> {
        self.skip_ignored()?;
        let value = self.parse_value()?;
        self.skip_ignored()?;
        if !self.at_end() {
            return Err(self.error("Unexpected trailing characters"));
        }
        Ok(value)
    }

    /// Reads a document spanning the whole input.
    pub fn read_document(&mut self) -> Result<Document> {
        self.skip_ignored()?;
        if self.peek_char() != Some('{') {
            return Err(self.error("Expected '{' at the start of a document"));
        }
        let doc = self.parse_object()?;
        self.skip_ignored()?;
        if !self.at_end() {
            return Err(self.error("Unexpected trailing characters"));
        }
        Ok(doc)
    }

    fn error(&self, msg: &str) -> Error {
        Error::syntax(self.line, self.column, msg)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.input[self.position..].chars().next()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn rest(&self) -> &str {
        &self.input[self.position..]
    }

    /// Skips whitespace and comments.
    fn skip_ignored(&mut self) -> Result<()> {
        loop {
            match self.peek_char() {
                Some(ch) if ch.is_whitespace() => {
                    self.next_char();
                }
                Some('/') if self.rest().starts_with("//") => {
                    while let Some(ch) = self.next_char() {
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.rest().starts_with("/*") => {
                    self.next_char();
                    self.next_char();
                    loop {
                        if self.rest().starts_with("*/") {
                            self.next_char();
                            self.next_char();
                            break;
                        }
                        if self.next_char().is_none() {
                            return Err(self.error("Unterminated comment"));
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        match self.peek_char() {
            Some('{') => Ok(Value::Object(self.parse_object()?)),
            Some('[') => Ok(Value::Array(self.parse_array()?)),
            Some('"') => {
                let s = self.parse_string()?;
                Ok(Value::String(if self.trim_strings {
                    s.trim().to_string()
                } else {
                    s
                }))
            }
            Some('t') => self.parse_literal("true", Value::Bool(true)),
            Some('f') => self.parse_literal("false", Value::Bool(false)),
            Some('n') => self.parse_literal("null", Value::Null),
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.parse_number(),
            Some(_) => Err(self.error("Expected a value")),
            None => Err(self.error("Unexpected end of input")),
        }
    }

    fn parse_literal(&mut self, word: &str, value: Value) -> Result<Value> {
        if !self.rest().starts_with(word) {
            return Err(self.error("Expected a value"));
        }
        for _ in 0..word.len() {
            self.next_char();
        }
        Ok(value)
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("Nesting too deep"));
        }
        Ok(())
    }

    fn parse_object(&mut self) -> Result<Document> {
        self.enter()?;
        self.next_char(); // consume '{'
        let doc = Document::new();

        loop {
            self.skip_ignored()?;
            match self.peek_char() {
                Some('}') => {
                    self.next_char();
                    break;
                }
                Some('"') => {}
                Some(_) => return Err(self.error("Expected a quoted key or '}'")),
                None => return Err(self.error("Unterminated document")),
            }

            let key = self.parse_string()?;
            self.skip_ignored()?;
            if self.next_char() != Some(':') {
                return Err(self.error("Expected ':' after key"));
            }
            self.skip_ignored()?;
            let value = self.parse_value()?;
            // Duplicate keys: the last one wins
            doc.set(key, value);

            self.skip_ignored()?;
            match self.next_char() {
                Some(',') => continue,
                Some('}') => break,
                Some(_) => return Err(self.error("Expected ',' or '}'")),
                None => return Err(self.error("Unterminated document")),
            }
        }

        self.depth -= 1;
        Ok(doc)
    }

    fn parse_array(&mut self) -> Result<Vec<Value>> {
        self.enter()?;
        self.next_char(); // consume '['
        let mut items = Vec::new();

        loop {
            self.skip_ignored()?;
            if self.peek_char() == Some(']') {
                self.next_char();
                break;
            }
            if self.at_end() {
                return Err(self.error("Unterminated array"));
            }
            items.push(self.parse_value()?);

            self.skip_ignored()?;
            match self.next_char() {
                Some(',') => continue,
                Some(']') => break,
                Some(_) => return Err(self.error("Expected ',' or ']'")),
                None => return Err(self.error("Unterminated array")),
            }
        }

        self.depth -= 1;
        Ok(items)
    }

    fn parse_string(&mut self) -> Result<String> {
        self.next_char(); // consume opening quote
        let mut result = String::new();

        while let Some(ch) = self.next_char() {
            match ch {
                '"' => return Ok(result),
                '\\' => match self.next_char() {
                    Some('"') => result.push('"'),
                    Some('\\') => result.push('\\'),
                    Some('/') => result.push('/'),
                    Some('b') => result.push('\u{0008}'),
                    Some('f') => result.push('\u{000C}'),
                    Some('n') => result.push('\n'),
                    Some('r') => result.push('\r'),
                    Some('t') => result.push('\t'),
                    Some('u') => result.push(self.parse_unicode_escape()?),
                    Some(_) => return Err(self.error("Invalid escape sequence")),
                    None => return Err(self.error("Unexpected end of input in string")),
                },
                other => result.push(other),
            }
        }
        Err(self.error("Unterminated string"))
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .next_char()
                .and_then(|ch| ch.to_digit(16))
                .ok_or_else(|| self.error("Invalid unicode escape sequence (expected 4 hex digits)"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn parse_unicode_escape(&mut self) -> Result<char> {
        let first = self.parse_hex4()?;
        let code = if (0xD800..0xDC00).contains(&first) {
            if !self.rest().starts_with("\\u") {
                return Err(self.error("Unpaired surrogate in unicode escape"));
            }
            self.next_char();
            self.next_char();
            let second = self.parse_hex4()?;
            if !(0xDC00..0xE000).contains(&second) {
                return Err(self.error("Unpaired surrogate in unicode escape"));
            }
            0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
        } else {
            first
        };
        char::from_u32(code).ok_or_else(|| self.error("Invalid unicode code point"))
    }

    fn digits(&mut self) -> usize {
        let mut count = 0;
        while matches!(self.peek_char(), Some(ch) if ch.is_ascii_digit()) {
            self.next_char();
            count += 1;
        }
        count
    }

    fn parse_number(&mut self) -> Result<Value> {
        let start = self.position;

        if self.peek_char() == Some('-') {
            self.next_char();
        }
        let leading_zero = self.peek_char() == Some('0');
        let integer_digits = self.digits();
        if integer_digits == 0 {
            return Err(self.error("Invalid number"));
        }
        if leading_zero && integer_digits > 1 {
            return Err(self.error("Leading zeros are not allowed"));
        }
        if self.peek_char() == Some('.') {
            self.next_char();
            if self.digits() == 0 {
                return Err(self.error("Expected digits after '.'"));
            }
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            self.next_char();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.next_char();
            }
            if self.digits() == 0 {
                return Err(self.error("Expected digits in exponent"));
            }
        }

        let number = &self.input[start..self.position];
        BigDecimal::from_str(number)
            .map(Value::Decimal)
            .map_err(|_| self.error("Invalid number"))
    }
}
