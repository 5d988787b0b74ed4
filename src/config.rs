//! Per-engine parse configuration.

use crate::error::{ExprError, Result};
use crate::{String, ToString};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Name given to the output of a bare expression such as `a * b`.
pub const DEFAULT_OUTPUT: &str = "result";

bitflags! {
    /// Switches that change how expression text is read and folded.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ParseFlags: u8 {
        /// Identifiers that were never declared become variables instead of
        /// failing the parse.
        const ALLOW_UNDECLARED = 1 << 0;
        /// Adjacent values with no operator between them are multiplied.
        const IMPLICIT_MULTIPLICATION = 1 << 1;
        /// More than one postfix operator may follow a value (`b!!`).
        const MULTIPLE_POSTFIX = 1 << 2;
        /// Skip the absorbing-element folds (`x*0`, `0*x`, `0/x`, `0 mod x`)
        /// so that infinities and NaN reaching `x` at run time are honoured.
        const IEEE_FOLDING = 1 << 3;
    }
}

impl Default for ParseFlags {
    fn default() -> Self {
        ParseFlags::ALLOW_UNDECLARED
            | ParseFlags::IMPLICIT_MULTIPLICATION
            | ParseFlags::MULTIPLE_POSTFIX
    }
}

/// Configuration owned by a single [`Expression`](crate::expression::Expression).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub flags: ParseFlags,
    /// Output variable of a statement written without `name =`.
    pub default_output: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flags: ParseFlags::default(),
            default_output: DEFAULT_OUTPUT.to_string(),
        }
    }
}

/// Returns true if `token` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_token(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Fails with [`ExprError::InvalidToken`] unless `token` is a valid name.
pub fn validate_token(token: &str) -> Result<()> {
    if is_valid_token(token) {
        Ok(())
    } else {
        Err(ExprError::InvalidToken {
            token: token.to_string(),
        })
    }
}
