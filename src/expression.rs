//! The expression engine.
//!
//! [`Expression`] owns everything needed to compile and run expressions: the
//! parser registry, the value table, the current program and its
//! configuration. Parse once, then update variables and evaluate as often as
//! needed.

use crate::config::{Config, ParseFlags, validate_token};
use crate::context::{Slot, ValueTable};
use crate::engine::TreeBuilder;
use crate::error::{ExprError, Result};
use crate::functions::{Core, multiply};
use crate::program::{Assignment, Program, split_statements};
use crate::registry::{Library, ParserRegistry, Rule};
use crate::types::{BinaryOp, Function};
use crate::{Real, String, ToString, Vec};
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::rc::Rc;
use bumpalo::Bump;

/// A compiled set of named expressions evaluated against a table of variables.
///
/// # Examples
///
/// ```
/// use exp_fold::Expression;
///
/// let mut expr = Expression::new();
/// expr.parse("x = a + b; y = x * 2").unwrap();
/// expr.add_variable_with_value("a", 1.0).unwrap();
/// expr.add_variable_with_value("b", 2.0).unwrap();
/// assert_eq!(expr.evaluate().unwrap(), 6.0);
/// assert_eq!(expr.variable_value_by_name("x").unwrap(), 3.0);
/// ```
///
/// Selecting outputs skips statements that do not contribute to them:
///
/// ```
/// use exp_fold::Expression;
///
/// let mut expr = Expression::new();
/// expr.parse("a = 1; b = a + 1; c = 10").unwrap();
/// expr.enable_outputs(&["b"]).unwrap();
/// assert_eq!(expr.execution_sequence(), vec!["a", "b"]);
/// ```
pub struct Expression {
    registry: ParserRegistry,
    table: ValueTable,
    program: Option<Program>,
    config: Config,
    implicit_multiply: Rc<BinaryOp>,
    /// Reused by the tree builder for partial trees.
    scratch: Bump,
}

impl Default for Expression {
    fn default() -> Self {
        Self::new()
    }
}

impl Expression {
    /// Creates an engine with the [`Core`] library only.
    pub fn new() -> Self {
        let mut registry = ParserRegistry::new();
        registry.add_library(&Core);
        Self {
            registry,
            table: ValueTable::new(),
            program: None,
            config: Config::default(),
            implicit_multiply: Rc::new(multiply()),
            scratch: Bump::new(),
        }
    }

    /// Creates an engine with [`Core`] plus `libraries`.
    pub fn with_libraries(libraries: &[&dyn Library]) -> Self {
        let mut expr = Self::new();
        for library in libraries {
            expr.add_library(*library);
        }
        expr
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: Config) -> Result<Self> {
        validate_token(&config.default_output)?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn values(&self) -> &ValueTable {
        &self.table
    }

    // Variables

    /// Declares a variable and returns its slot.
    ///
    /// Declaring an existing name returns its slot and keeps its value.
    pub fn add_variable(&mut self, name: &str) -> Result<Slot> {
        self.table.declare(name)
    }

    /// Declares a variable and sets its value.
    pub fn add_variable_with_value(&mut self, name: &str, value: Real) -> Result<Slot> {
        let slot = self.table.declare(name)?;
        self.table.set(slot, value)?;
        Ok(slot)
    }

    pub fn set_variable(&mut self, slot: Slot, value: Real) -> Result<()> {
        self.table.set(slot, value)
    }

    pub fn set_variable_by_name(&mut self, name: &str, value: Real) -> Result<()> {
        let slot = self.variable_slot(name)?;
        self.table.set(slot, value)
    }

    pub fn variable_value(&self, slot: Slot) -> Result<Real> {
        self.table.get(slot).ok_or(ExprError::UnknownSlot { slot })
    }

    pub fn variable_value_by_name(&self, name: &str) -> Result<Real> {
        let slot = self.variable_slot(name)?;
        self.variable_value(slot)
    }

    /// Slot of a known variable.
    pub fn variable_slot(&self, name: &str) -> Result<Slot> {
        validate_token(name)?;
        self.table
            .slot(name)
            .ok_or_else(|| ExprError::UndeclaredVariable {
                names: alloc::vec![name.to_string()],
            })
    }

    // Parsing and evaluation

    /// Parses `text`, replacing the current program.
    ///
    /// Statements are separated by `;` and written `name = expression`. A single
    /// statement may omit `name =`, in which case its result is stored in the
    /// default output variable. On error the previous program stays in place.
    ///
    /// A statement may read the outputs of statements before it. Outputs are
    /// declared only once the whole text has parsed, so with undeclared
    /// variables disallowed `x = y; y = 1` fails on `y`.
    pub fn parse(&mut self, text: &str) -> Result<()> {
        self.scratch.reset();
        let default_output = self.config.default_output.clone();
        let assignments = split_statements(text, &default_output)?;

        let mut program = Program::new();
        let mut outputs = BTreeSet::new();
        let mut undeclared = BTreeSet::new();
        for assignment in &assignments {
            let output = self
                .parse_statement(assignment, &mut program, &outputs, &mut undeclared)
                .map_err(|e| {
                    if assignment.explicit {
                        e.in_statement(assignment.text)
                    } else {
                        e
                    }
                })?;
            outputs.insert(output);
        }

        if !self.config.flags.contains(ParseFlags::ALLOW_UNDECLARED) && !undeclared.is_empty() {
            return Err(ExprError::UndeclaredVariable {
                names: undeclared.into_iter().collect(),
            });
        }
        for &slot in &outputs {
            self.table.mark_declared(slot);
        }

        log::debug!(
            "parsed {} statements reading {} inputs",
            program.statements().len(),
            program.inputs().len()
        );
        self.program = Some(program);
        Ok(())
    }

    fn parse_statement(
        &mut self,
        assignment: &Assignment<'_>,
        program: &mut Program,
        outputs: &BTreeSet<Slot>,
        undeclared: &mut BTreeSet<String>,
    ) -> Result<Slot> {
        if assignment.expression.trim().is_empty() {
            return Err(ExprError::EmptyExpression {
                expression: assignment.text.to_string(),
            });
        }
        validate_token(assignment.output)?;
        let output = self.table.slot_or_insert(assignment.output);
        let mut builder = TreeBuilder::new(
            &self.registry,
            &mut self.table,
            &self.scratch,
            &self.implicit_multiply,
            self.config.flags,
        );
        let root = builder.parse(assignment.expression)?;
        let usage = builder.into_usage();
        log::trace!(
            "{} folded to {} nodes",
            assignment.text,
            root.node_count()
        );
        // outputs of earlier statements count as declared
        let table = &self.table;
        undeclared.extend(
            usage
                .undeclared
                .iter()
                .filter(|name| table.slot(name).is_none_or(|slot| !outputs.contains(&slot)))
                .cloned(),
        );
        program.push(output, root, usage, assignment.text);
        Ok(output)
    }

    /// Runs the enabled statements and returns the result of the last one.
    ///
    /// Returns NaN when no statement is enabled, for example when
    /// [`enable_outputs`](Self::enable_outputs) selected only variables that
    /// no statement assigns.
    pub fn evaluate(&mut self) -> Result<Real> {
        let program = self.program.as_ref().ok_or(ExprError::Uninitialised)?;
        program.evaluate(&mut self.table)
    }

    // Introspection

    fn names_of(&self, slots: impl IntoIterator<Item = Slot>) -> Vec<String> {
        slots
            .into_iter()
            .filter_map(|slot| self.table.name(slot))
            .map(ToString::to_string)
            .collect()
    }

    /// Names read by the current program that were never declared.
    pub fn list_undeclared(&self) -> Vec<String> {
        match &self.program {
            Some(program) => self.names_of(
                program
                    .used()
                    .iter()
                    .copied()
                    .filter(|&slot| !self.table.is_declared(slot)),
            ),
            None => Vec::new(),
        }
    }

    /// Every variable in slot order.
    pub fn list_all_variables(&self) -> Vec<String> {
        self.table.names().map(ToString::to_string).collect()
    }

    /// Variables read or written by the current program.
    pub fn list_active_variables(&self) -> Vec<String> {
        match &self.program {
            Some(program) => self.names_of(program.used().iter().copied()),
            None => Vec::new(),
        }
    }

    /// Variables the current program reads before writing them.
    pub fn list_all_inputs(&self) -> Vec<String> {
        match &self.program {
            Some(program) => self.names_of(program.inputs().iter().copied()),
            None => Vec::new(),
        }
    }

    /// Variables written by the current program.
    pub fn list_all_outputs_or_intermediates(&self) -> Vec<String> {
        match &self.program {
            Some(program) => self.names_of(program.outputs_and_intermediates()),
            None => Vec::new(),
        }
    }

    /// Functions called by the current program.
    pub fn list_active_functions(&self) -> Vec<String> {
        match &self.program {
            Some(program) => program.functions().iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Output names of the statements `evaluate` will run, in order.
    pub fn execution_sequence(&self) -> Vec<String> {
        match &self.program {
            Some(program) => self.names_of(program.execution_sequence()),
            None => Vec::new(),
        }
    }

    /// Dump of the folded trees of the enabled statements.
    ///
    /// Each statement starts with `name = ` followed by one line per node,
    /// indented two spaces per level.
    pub fn to_tree(&self) -> String {
        let mut out = String::new();
        if let Some(program) = &self.program {
            for statement in program.statements().iter().filter(|s| s.enabled) {
                let name = self.table.name(statement.output).unwrap_or("?");
                out.push_str(&format!("{} = {}", name, statement.root));
            }
        }
        out
    }

    // Output selection

    /// Evaluates only the statements that `names` depend on.
    pub fn enable_outputs(&mut self, names: &[&str]) -> Result<()> {
        let mut slots = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();
        for name in names {
            validate_token(name)?;
            match self.table.slot(name) {
                Some(slot) => slots.push(slot),
                None => unknown.push(name.to_string()),
            }
        }
        if !unknown.is_empty() {
            return Err(ExprError::UndeclaredVariable { names: unknown });
        }
        self.enable_output_slots(&slots)
    }

    pub fn enable_output_slots(&mut self, slots: &[Slot]) -> Result<()> {
        if let Some(&slot) = slots.iter().find(|&&slot| slot >= self.table.len()) {
            return Err(ExprError::UnknownSlot { slot });
        }
        if let Some(program) = &mut self.program {
            program.enable_outputs(slots.iter().copied());
        }
        Ok(())
    }

    pub fn enable_all_outputs(&mut self) {
        if let Some(program) = &mut self.program {
            program.enable_all();
        }
    }

    // Registry

    /// Registers `function`, replacing any value rule with the same name.
    ///
    /// Trees already parsed keep calling the previous definition.
    pub fn add_user_function(&mut self, function: Function) -> Result<()> {
        validate_token(&function.name)?;
        self.registry.add(Rule::function(function));
        Ok(())
    }

    /// Removes functions and constants named `name`. Returns true if any were removed.
    pub fn remove_function(&mut self, name: &str) -> bool {
        self.registry.remove_value(name) > 0
    }

    /// Removes the named constant `name`. Returns true if it existed.
    pub fn remove_constant(&mut self, name: &str) -> bool {
        !name.is_empty() && self.registry.remove_constant(name) > 0
    }

    pub fn add_library(&mut self, library: &dyn Library) {
        self.registry.add_library(library);
    }

    pub fn remove_library(&mut self, library: &dyn Library) {
        self.registry.remove_library(library);
    }

    /// Registers a custom rule, such as a postfix or binary operator.
    pub fn add_rule(&mut self, rule: Rule) {
        self.registry.add(rule);
    }

    /// Removes every rule with `token`. Returns true if any were removed.
    pub fn remove_rule(&mut self, token: &str) -> bool {
        self.registry.remove_token(token) > 0
    }

    // Configuration

    pub fn allow_undeclared_variables(&self) -> bool {
        self.config.flags.contains(ParseFlags::ALLOW_UNDECLARED)
    }

    pub fn set_allow_undeclared_variables(&mut self, allow: bool) {
        self.config.flags.set(ParseFlags::ALLOW_UNDECLARED, allow);
    }

    pub fn implicit_multiplication(&self) -> bool {
        self.config.flags.contains(ParseFlags::IMPLICIT_MULTIPLICATION)
    }

    pub fn set_implicit_multiplication(&mut self, enabled: bool) {
        self.config
            .flags
            .set(ParseFlags::IMPLICIT_MULTIPLICATION, enabled);
    }

    pub fn allow_multiple_postfix_operators(&self) -> bool {
        self.config.flags.contains(ParseFlags::MULTIPLE_POSTFIX)
    }

    pub fn set_allow_multiple_postfix_operators(&mut self, allow: bool) {
        self.config.flags.set(ParseFlags::MULTIPLE_POSTFIX, allow);
    }

    pub fn ieee_folding(&self) -> bool {
        self.config.flags.contains(ParseFlags::IEEE_FOLDING)
    }

    pub fn set_ieee_folding(&mut self, enabled: bool) {
        self.config.flags.set(ParseFlags::IEEE_FOLDING, enabled);
    }

    pub fn default_output_name(&self) -> &str {
        &self.config.default_output
    }

    pub fn set_default_output_name(&mut self, name: &str) -> Result<()> {
        validate_token(name)?;
        self.config.default_output = name.to_string();
        Ok(())
    }
}
