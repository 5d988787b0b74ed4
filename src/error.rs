//! Error types for parsing and evaluating expressions.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`ExprError`]. Errors raised while parsing one statement of a multi-statement
//! program are wrapped in [`ExprError::InStatement`]; use [`ExprError::kind`] to
//! classify an error independently of that wrapping.

use crate::{Box, String, Vec};
use core::fmt;
use core::result;

/// Result type used throughout the crate.
pub type Result<T> = result::Result<T, ExprError>;

/// Error type for expression parsing and evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    /// The expression text is empty, or nothing could be built from it.
    ///
    /// `expression` holds the text that was being parsed.
    EmptyExpression { expression: String },

    /// A binary operator was required but none was found.
    ///
    /// Raised when implicit multiplication is disabled and two values are
    /// adjacent, e.g. `a b`. `remaining` holds the unconsumed input.
    OperatorExpected { remaining: String },

    /// An identifier is immediately followed by `(` but no function with that
    /// name is registered.
    ///
    /// To resolve this error, register the function with
    /// `Expression::add_user_function` or add the library that provides it.
    UnknownMethod { remaining: String },

    /// One or more identifiers were read but never declared.
    ///
    /// Raised by `parse` when undeclared variables are disallowed, and by
    /// lookups of names the value table does not know. Every offending name
    /// is listed.
    UndeclaredVariable { names: Vec<String> },

    /// A name does not match `[A-Za-z_][A-Za-z0-9_]*`.
    InvalidToken { token: String },

    /// `evaluate` was called before any successful `parse`.
    Uninitialised,

    /// A slot index that was never allocated by the value table.
    UnknownSlot { slot: usize },

    /// Malformed input: mismatched parentheses, bad argument lists, missing
    /// operands and similar. The string contains a detailed message.
    Syntax(String),

    /// An error raised while parsing one statement of a multi-statement
    /// program, together with that statement's text.
    InStatement {
        /// The statement as written by the user
        statement: String,
        /// The underlying error
        source: Box<ExprError>,
    },
}

/// Classification of an [`ExprError`], ignoring statement context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyExpression,
    OperatorExpected,
    UnknownMethod,
    UndeclaredVariable,
    InvalidToken,
    Uninitialised,
    UnknownSlot,
    Syntax,
}

impl ExprError {
    /// Kind of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self.root_cause() {
            ExprError::EmptyExpression { .. } => ErrorKind::EmptyExpression,
            ExprError::OperatorExpected { .. } => ErrorKind::OperatorExpected,
            ExprError::UnknownMethod { .. } => ErrorKind::UnknownMethod,
            ExprError::UndeclaredVariable { .. } => ErrorKind::UndeclaredVariable,
            ExprError::InvalidToken { .. } => ErrorKind::InvalidToken,
            ExprError::Uninitialised => ErrorKind::Uninitialised,
            ExprError::UnknownSlot { .. } => ErrorKind::UnknownSlot,
            ExprError::Syntax(_) => ErrorKind::Syntax,
            // root_cause never stops at a wrapper
            ExprError::InStatement { .. } => ErrorKind::Syntax,
        }
    }

    /// The innermost error, skipping any statement context.
    pub fn root_cause(&self) -> &ExprError {
        let mut err = self;
        while let ExprError::InStatement { source, .. } = err {
            err = source;
        }
        err
    }

    /// Wraps this error with the text of the statement that produced it.
    pub fn in_statement(self, statement: &str) -> Self {
        ExprError::InStatement {
            statement: String::from(statement),
            source: Box::new(self),
        }
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::EmptyExpression { expression } => {
                write!(f, "Unsupported empty expression '{}'", expression)
            }
            ExprError::OperatorExpected { remaining } => {
                write!(f, "An operator was expected at '{}'", remaining)
            }
            ExprError::UnknownMethod { remaining } => {
                write!(f, "Syntax error - unknown method at '{}'", remaining)
            }
            ExprError::UndeclaredVariable { names } => {
                if names.len() == 1 {
                    write!(f, "The variable '{}' was not declared", names[0])
                } else {
                    write!(f, "There are {} undeclared variables: ", names.len())?;
                    for (i, name) in names.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", name)?;
                    }
                    Ok(())
                }
            }
            ExprError::InvalidToken { token } => write!(
                f,
                "The token '{}' is invalid. Tokens must start with a letter or underscore, \
                 and may only contain underscores or alphanumeric characters",
                token
            ),
            ExprError::Uninitialised => write!(f, "No expression has been parsed"),
            ExprError::UnknownSlot { slot } => write!(f, "No variable occupies slot {}", slot),
            ExprError::Syntax(msg) => write!(f, "Syntax error: {}", msg),
            ExprError::InStatement { statement, source } => {
                write!(f, "{} in statement \"{}\"", source, statement)
            }
        }
    }
}

impl core::error::Error for ExprError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            ExprError::InStatement { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
