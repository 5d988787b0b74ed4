//! Low-level scanning over the unconsumed part of an expression.
//!
//! The tree builder never tokenizes ahead. Each rule of the parser registry asks
//! the [`Cursor`] whether the remaining text starts with its token and consumes
//! it only on a match.

use crate::error::{ExprError, Result};
use crate::{Real, Vec};
use alloc::format;

/// Returns true for characters that may continue an identifier.
pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A position inside an expression string.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor over `input` with surrounding whitespace removed.
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.trim(),
            pos: 0,
        }
    }

    /// The unconsumed input.
    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consumes `len` bytes.
    pub fn advance(&mut self, len: usize) {
        self.pos = (self.pos + len).min(self.input.len());
    }

    /// Number of leading whitespace bytes in the unconsumed input.
    fn whitespace_len(&self) -> usize {
        let rest = self.rest();
        rest.len() - rest.trim_start().len()
    }

    pub fn skip_whitespace(&mut self) {
        let n = self.whitespace_len();
        self.advance(n);
    }

    /// Consumes `\s*token\s*`.
    ///
    /// A token ending in an identifier character only matches when the next
    /// character cannot continue an identifier, so `xor` does not match the
    /// start of `xorval`.
    pub fn eat_operator(&mut self, token: &str) -> bool {
        let lead = self.whitespace_len();
        let after = &self.rest()[lead..];
        if token.is_empty() || !after.starts_with(token) {
            return false;
        }
        if !word_boundary(token, &after[token.len()..]) {
            return false;
        }
        self.advance(lead + token.len());
        self.skip_whitespace();
        true
    }

    /// Consumes `\s*token` when `token` is a whole word.
    pub fn eat_word(&mut self, token: &str) -> bool {
        let lead = self.whitespace_len();
        let after = &self.rest()[lead..];
        if token.is_empty() || !after.starts_with(token) {
            return false;
        }
        match after[token.len()..].chars().next() {
            Some(c) if is_ident_char(c) => false,
            _ => {
                self.advance(lead + token.len());
                true
            }
        }
    }

    /// Consumes `\s*token\s*(` and returns true on a match.
    pub fn eat_call_open(&mut self, token: &str) -> bool {
        let lead = self.whitespace_len();
        let after = &self.rest()[lead..];
        if !after.starts_with(token) {
            return false;
        }
        let tail = &after[token.len()..];
        let gap = tail.len() - tail.trim_start().len();
        if !tail[gap..].starts_with('(') {
            return false;
        }
        self.advance(lead + token.len() + gap + 1);
        true
    }

    /// Length in bytes of the numeric literal at the start of the input,
    /// after leading whitespace. Matches `[0-9]*\.?[0-9]+` with an optional
    /// `[eE][+-]?[0-9]*\.?[0-9]+` suffix.
    fn number_len(&self) -> Option<(usize, usize)> {
        let lead = self.whitespace_len();
        let bytes = &self.rest().as_bytes()[lead..];
        let mantissa = decimal_len(bytes)?;
        let mut len = mantissa;
        if matches!(bytes.get(len), Some(b'e') | Some(b'E')) {
            let mut exp = len + 1;
            if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
                exp += 1;
            }
            if let Some(digits) = decimal_len(&bytes[exp..]) {
                len = exp + digits;
            }
        }
        Some((lead, len))
    }

    /// Consumes a numeric literal and returns its value.
    ///
    /// `Ok(None)` means the input does not start with a literal.
    pub fn number(&mut self) -> Result<Option<Real>> {
        let Some((lead, len)) = self.number_len() else {
            return Ok(None);
        };
        let text = &self.rest()[lead..lead + len];
        let invalid = || ExprError::Syntax(format!("Invalid number literal '{}'", text));
        let value = match text.split_once(['e', 'E']) {
            // `parse` only takes whole exponents
            Some((mantissa, exponent)) if exponent.contains('.') => {
                let mantissa = mantissa.parse::<Real>().map_err(|_| invalid())?;
                let exponent = exponent.parse::<Real>().map_err(|_| invalid())?;
                mantissa * libm::pow(10.0, exponent)
            }
            _ => text.parse::<Real>().map_err(|_| invalid())?,
        };
        self.advance(lead + len);
        Ok(Some(value))
    }

    /// The identifier at the start of the input, after leading whitespace,
    /// without consuming it. Returns the whitespace length and the name.
    pub fn identifier(&self) -> Option<(usize, &'a str)> {
        let lead = self.whitespace_len();
        let after = &self.rest()[lead..];
        let mut chars = after.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return None,
        }
        let end = chars
            .find(|&(_, c)| !is_ident_char(c))
            .map(|(i, _)| i)
            .unwrap_or(after.len());
        Some((lead, &after[..end]))
    }
}

/// True when `token` may end right before `next`.
fn word_boundary(token: &str, next: &str) -> bool {
    let ends_in_word = token.chars().last().is_some_and(is_ident_char);
    let continues = next.chars().next().is_some_and(is_ident_char);
    !(ends_in_word && continues)
}

/// Length of `[0-9]*\.?[0-9]+` at the start of `bytes`.
fn decimal_len(bytes: &[u8]) -> Option<usize> {
    let int = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if bytes.get(int) == Some(&b'.') {
        let frac = bytes[int + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if frac > 0 {
            return Some(int + 1 + frac);
        }
    }
    if int > 0 { Some(int) } else { None }
}

/// A parenthesised region found by [`scan_group`].
#[derive(Debug, PartialEq)]
pub struct Group<'a> {
    /// Text between commas at nesting depth zero.
    pub parts: Vec<&'a str>,
    /// Bytes up to and including the closing parenthesis.
    pub consumed: usize,
}

/// Scans `text`, which starts just after an opening parenthesis, for the
/// matching closing parenthesis. Commas at depth zero split the content.
///
/// Returns `None` when the parenthesis is never closed.
pub fn scan_group(text: &str) -> Option<Group<'_>> {
    let mut depth = 0usize;
    let mut start = 0;
    let mut parts = Vec::new();
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => {
                parts.push(&text[start..i]);
                return Some(Group {
                    parts,
                    consumed: i + 1,
                });
            }
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    None
}
