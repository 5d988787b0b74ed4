//! Multi-statement programs and their dependency graph.
//!
//! Text such as `x = a + b; y = x * 2` is split into assignments that are
//! parsed in order. Each statement remembers the variable slots it reads, which
//! lets [`Program::enable_outputs`] switch off every statement that does not
//! contribute to the requested outputs. Evaluation always runs the enabled
//! statements in declaration order.

use crate::context::{Slot, ValueTable};
use crate::engine::Usage;
use crate::error::{ExprError, Result};
use crate::lexer::Cursor;
use crate::types::Node;
use crate::{Real, String, ToString, Vec};
use alloc::collections::BTreeSet;

/// One `name = expression` piece of the input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment<'t> {
    pub output: &'t str,
    pub expression: &'t str,
    /// The statement as written, for error context.
    pub text: &'t str,
    /// False when the output name was supplied by default.
    pub explicit: bool,
}

/// Splits `name = expression` into its two halves.
///
/// `a == b` is a comparison, not an assignment.
fn split_assignment(statement: &str) -> Option<(&str, &str)> {
    let cursor = Cursor::new(statement);
    let (lead, name) = cursor.identifier()?;
    let after = cursor.rest()[lead + name.len()..].trim_start();
    let expression = after.strip_prefix('=')?;
    match expression.chars().next() {
        Some('=') => None,
        _ => Some((name, expression)),
    }
}

/// Splits program text on `;` into assignments.
///
/// A single statement without `name =` is assigned to `default_output`.
pub fn split_statements<'t>(text: &'t str, default_output: &'t str) -> Result<Vec<Assignment<'t>>> {
    let mut pieces: Vec<&str> = text.split(';').collect();
    while pieces.len() > 1 && pieces.last().is_some_and(|p| p.trim().is_empty()) {
        pieces.pop();
    }

    if let [only] = pieces.as_slice() {
        if split_assignment(only).is_none() {
            return Ok(alloc::vec![Assignment {
                output: default_output,
                expression: only,
                text: only.trim(),
                explicit: false,
            }]);
        }
    }

    let mut assignments = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let Some((output, expression)) = split_assignment(piece) else {
            return Err(
                ExprError::Syntax("Expected an assignment expression".to_string())
                    .in_statement(piece),
            );
        };
        assignments.push(Assignment {
            output,
            expression,
            text: piece,
            explicit: true,
        });
    }
    if assignments.is_empty() {
        return Err(ExprError::EmptyExpression {
            expression: text.trim().to_string(),
        });
    }
    Ok(assignments)
}

/// A parsed assignment.
#[derive(Debug, Clone)]
pub struct Statement {
    pub output: Slot,
    pub root: Node,
    /// Slots the expression reads.
    pub used: BTreeSet<Slot>,
    pub enabled: bool,
    pub text: String,
}

/// Statements in declaration order plus what they read and write.
#[derive(Debug, Clone, Default)]
pub struct Program {
    statements: Vec<Statement>,
    /// Every slot written or read.
    used: BTreeSet<Slot>,
    /// Slots read before any statement of this program wrote them.
    inputs: BTreeSet<Slot>,
    functions: BTreeSet<String>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parsed statement.
    pub fn push(&mut self, output: Slot, root: Node, usage: Usage, text: &str) {
        self.used.insert(output);
        for &slot in &usage.used {
            if self.used.insert(slot) {
                self.inputs.insert(slot);
            }
        }
        self.functions.extend(usage.functions);
        self.statements.push(Statement {
            output,
            root,
            used: usage.used,
            enabled: true,
            text: text.to_string(),
        });
    }

    /// Enables exactly the statements the `required` slots depend on.
    ///
    /// Walks the statements backwards: a statement is enabled iff its output is
    /// required, in which case everything it reads becomes required too.
    pub fn enable_outputs(&mut self, required: impl IntoIterator<Item = Slot>) {
        let mut required: BTreeSet<Slot> = required.into_iter().collect();
        for statement in self.statements.iter_mut().rev() {
            statement.enabled = required.contains(&statement.output);
            if statement.enabled {
                required.extend(statement.used.iter().copied());
            }
        }
        log::debug!(
            "{} of {} statements enabled",
            self.statements.iter().filter(|s| s.enabled).count(),
            self.statements.len()
        );
    }

    pub fn enable_all(&mut self) {
        for statement in &mut self.statements {
            statement.enabled = true;
        }
    }

    /// Runs the enabled statements in order, storing each result in its
    /// output slot. Returns the last result, or NaN if nothing is enabled.
    pub fn evaluate(&self, table: &mut ValueTable) -> Result<Real> {
        let mut last = Real::NAN;
        for statement in self.statements.iter().filter(|s| s.enabled) {
            last = statement.root.eval(table.values());
            table.set(statement.output, last)?;
        }
        Ok(last)
    }

    /// Output slots of the enabled statements, in evaluation order.
    pub fn execution_sequence(&self) -> impl Iterator<Item = Slot> + '_ {
        self.statements
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.output)
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn used(&self) -> &BTreeSet<Slot> {
        &self.used
    }

    pub fn inputs(&self) -> &BTreeSet<Slot> {
        &self.inputs
    }

    /// Slots written by a statement and not read before that.
    pub fn outputs_and_intermediates(&self) -> impl Iterator<Item = Slot> + '_ {
        self.used.difference(&self.inputs).copied()
    }

    pub fn functions(&self) -> &BTreeSet<String> {
        &self.functions
    }
}
