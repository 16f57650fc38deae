//! Prefix-consuming read cursors over decoded text and raw bytes.
//!
//! Both cursors only ever move forward. Every `eat_*`/`take_*` method either
//! consumes exactly what it matched or leaves the cursor untouched.

use byteorder::{ByteOrder, LittleEndian};

/// Cursor over decoded .reg text.
#[derive(Debug, Clone, Copy)]
pub struct TextCursor<'a> {
    rest: &'a str,
}

impl<'a> TextCursor<'a> {
    /// Creates a cursor positioned at the start of `text`.
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    /// Returns the unconsumed text.
    pub fn rest(&self) -> &'a str {
        self.rest
    }

    /// Returns true when nothing is left.
    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Returns the next character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    /// Returns true if the unconsumed text starts with `prefix`.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest.starts_with(prefix)
    }

    /// Consumes `expected` if it is the next character.
    pub fn eat_char(&mut self, expected: char) -> bool {
        match self.rest.strip_prefix(expected) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    /// Consumes `expected` if the text continues with it.
    pub fn eat_str(&mut self, expected: &str) -> bool {
        match self.rest.strip_prefix(expected) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    /// Consumes consecutive occurrences of `unit`, returning how many were eaten.
    pub fn skip_repeated(&mut self, unit: &str) -> usize {
        let mut count = 0;
        while self.eat_str(unit) {
            count += 1;
        }
        count
    }

    /// Byte offset of the first `pattern` at or after byte `from`.
    pub fn find_from(&self, pattern: &str, from: usize) -> Option<usize> {
        self.rest.get(from..)?.find(pattern).map(|pos| pos + from)
    }

    /// Consumes `len` bytes of text; `len` must fall on a character boundary.
    pub fn advance(&mut self, len: usize) -> Option<&'a str> {
        let taken = self.rest.get(..len)?;
        self.rest = &self.rest[len..];
        Some(taken)
    }

    /// Consumes exactly `count` characters, if that many remain.
    pub fn take_chars(&mut self, count: usize) -> Option<&'a str> {
        let end = match self.rest.char_indices().nth(count) {
            Some((pos, _)) => pos,
            None if self.rest.chars().count() == count => self.rest.len(),
            None => return None,
        };
        self.advance(end)
    }

    /// Consumes the longest prefix whose characters satisfy `pred`.
    pub fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let end = self
            .rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map(|(pos, _)| pos)
            .unwrap_or(self.rest.len());
        let taken = &self.rest[..end];
        self.rest = &self.rest[end..];
        taken
    }

    /// Reads the body of a quoted token whose opening quote was already consumed.
    ///
    /// A backslash takes the next character literally and a CR directly
    /// before LF is dropped. Consumes through the closing quote; returns
    /// `None` and consumes nothing if the quote is never closed.
    pub fn read_quoted(&mut self) -> Option<String> {
        let rest = self.rest;
        let mut text = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((pos, c)) = chars.next() {
            match c {
                '"' => {
                    self.rest = &rest[pos + 1..];
                    return Some(text);
                }
                '\\' => {
                    let (_, escaped) = chars.next()?;
                    text.push(escaped);
                }
                '\r' if matches!(chars.peek(), Some((_, '\n'))) => {}
                other => text.push(other),
            }
        }
        None
    }
}

/// Cursor over a binary .pol buffer.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    rest: &'a [u8],
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { rest: data }
    }

    /// Returns true when nothing is left.
    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Number of unconsumed bytes.
    pub fn len(&self) -> usize {
        self.rest.len()
    }

    /// Consumes `expected` if the buffer continues with it.
    pub fn eat(&mut self, expected: &[u8]) -> bool {
        match self.rest.strip_prefix(expected) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    /// Consumes one little-endian code unit if it equals `unit`.
    pub fn eat_u16(&mut self, unit: u16) -> bool {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, unit);
        self.eat(&buf)
    }

    /// Consumes `len` raw bytes.
    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.rest.len() < len {
            return None;
        }
        let (taken, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(taken)
    }

    /// Reads a little-endian u32.
    pub fn read_u32(&mut self) -> Option<u32> {
        self.take(4).map(LittleEndian::read_u32)
    }

    /// Consumes code units up to and including the first one equal to `unit`,
    /// returning the bytes before it.
    pub fn take_until_u16(&mut self, unit: u16) -> Option<&'a [u8]> {
        let index = self
            .rest
            .chunks_exact(2)
            .position(|pair| LittleEndian::read_u16(pair) == unit)?;
        let field = &self.rest[..index * 2];
        self.rest = &self.rest[index * 2 + 2..];
        Some(field)
    }
}
