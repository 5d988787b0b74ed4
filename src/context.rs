//! The value table: named variables bound to stable slots.
//!
//! Names map to slot indices that never change once assigned. Values live in one
//! flat array indexed by slot, which is what compiled trees read at evaluation
//! time. Trees store only the slot, so growing the array never invalidates them.

use crate::config::validate_token;
use crate::error::{ExprError, Result};
use crate::{Real, String, ToString, Vec};
use alloc::collections::BTreeMap;

/// Stable index of a variable inside a [`ValueTable`].
pub type Slot = usize;

/// Extra capacity reserved whenever the backing array fills up.
const GROWTH_CHUNK: usize = 16;

/// Append-only mapping from variable names to slots and values.
///
/// # Examples
///
/// ```
/// use exp_fold::context::ValueTable;
///
/// let mut table = ValueTable::new();
/// let a = table.declare("a").unwrap();
/// table.set(a, 2.5).unwrap();
/// assert_eq!(table.declare("a").unwrap(), a);
/// assert_eq!(table.value_of("a"), Some(2.5));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    slots: BTreeMap<String, Slot>,
    names: Vec<String>,
    values: Vec<Real>,
    declared: Vec<bool>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name`, allocating a slot initialised to `0.0` if it is new.
    ///
    /// An existing slot keeps its value and is marked declared.
    pub fn declare(&mut self, name: &str) -> Result<Slot> {
        validate_token(name)?;
        let slot = self.slot_or_insert(name);
        self.declared[slot] = true;
        Ok(slot)
    }

    pub(crate) fn mark_declared(&mut self, slot: Slot) {
        if let Some(declared) = self.declared.get_mut(slot) {
            *declared = true;
        }
    }

    /// Returns the slot of `name`, allocating an undeclared one if needed.
    ///
    /// Used by the parser for identifiers met in expression text.
    pub(crate) fn slot_or_insert(&mut self, name: &str) -> Slot {
        if let Some(&slot) = self.slots.get(name) {
            return slot;
        }
        if self.values.len() == self.values.capacity() {
            self.values.reserve(GROWTH_CHUNK);
            self.declared.reserve(GROWTH_CHUNK);
        }
        let slot = self.names.len();
        self.slots.insert(name.to_string(), slot);
        self.names.push(name.to_string());
        self.values.push(0.0);
        self.declared.push(false);
        slot
    }

    pub fn slot(&self, name: &str) -> Option<Slot> {
        self.slots.get(name).copied()
    }

    pub fn name(&self, slot: Slot) -> Option<&str> {
        self.names.get(slot).map(String::as_str)
    }

    pub fn get(&self, slot: Slot) -> Option<Real> {
        self.values.get(slot).copied()
    }

    pub fn value_of(&self, name: &str) -> Option<Real> {
        self.slot(name).and_then(|slot| self.get(slot))
    }

    pub fn set(&mut self, slot: Slot, value: Real) -> Result<()> {
        match self.values.get_mut(slot) {
            Some(v) => {
                *v = value;
                Ok(())
            }
            None => Err(ExprError::UnknownSlot { slot }),
        }
    }

    /// True once the name was declared explicitly or assigned by a statement.
    pub fn is_declared(&self, slot: Slot) -> bool {
        self.declared.get(slot).copied().unwrap_or(false)
    }

    /// The backing array, indexed by slot.
    pub fn values(&self) -> &[Real] {
        &self.values
    }

    /// Variable names in slot order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
