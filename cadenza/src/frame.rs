//! Per-activation storage for local variables.
//!
//! A frame is an indexed array of slots plus the positional arguments
//! of the activation. Slots are resolved to indices during elaboration.
//!
//! The first write to a slot determines its kind.
//! Integer and Boolean slots store their payload unboxed.
//! A later write of a different kind degrades the slot to an object slot,
//! which holds any value, and it stays that way.

use {
    crate::{error::Fault, value::{Arguments, Value}},
    std::fmt,
    thiserror::Error,
};

/// Index of a slot in a frame.
pub type Slot = usize;

/// What a slot currently stores.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotKind
{
    Unset,
    Integer,
    Boolean,
    Object,
}

/// Error returned when reading a slot.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error)]
pub enum SlotError
{
    #[error("Read of unset frame slot {slot}")]
    Unset{slot: Slot},

    #[error("Frame slot {slot} is an {actual:?} slot, not an {expected:?} slot")]
    Kind{slot: Slot, expected: SlotKind, actual: SlotKind},

    #[error("Frame slot {slot} is out of bounds for a frame of size {size}")]
    OutOfBounds{slot: Slot, size: usize},
}

/// Storage for the local variables of an activation.
#[derive(Clone)]
pub struct Frame
{
    slots: Vec<SlotValue>,
    arguments: Arguments,
}

#[derive(Clone)]
enum SlotValue
{
    Unset,
    Integer(i64),
    Boolean(bool),
    Object(Value),
}

impl Frame
{
    /// Create a frame with all slots unset.
    pub fn new(size: usize, arguments: Arguments) -> Self
    {
        Self{slots: vec![SlotValue::Unset; size], arguments}
    }

    /// The number of slots.
    pub fn size(&self) -> usize
    {
        self.slots.len()
    }

    /// The positional arguments of the activation.
    pub fn arguments(&self) -> &[Value]
    {
        &self.arguments
    }

    /// A positional argument of the activation.
    pub fn argument(&self, index: usize) -> Result<Value, Fault>
    {
        let len = self.arguments.len();
        self.arguments.get(index).cloned()
            .ok_or(Fault::MissingArgument{index, len})
    }

    /// The kind of a slot.
    ///
    /// Out-of-bounds slots are reported as unset.
    pub fn kind(&self, slot: Slot) -> SlotKind
    {
        match self.slots.get(slot) {
            None | Some(SlotValue::Unset) => SlotKind::Unset,
            Some(SlotValue::Integer(_))   => SlotKind::Integer,
            Some(SlotValue::Boolean(_))   => SlotKind::Boolean,
            Some(SlotValue::Object(_))    => SlotKind::Object,
        }
    }

    /// Whether the slot is an integer slot.
    pub fn is_integer(&self, slot: Slot) -> bool
    {
        self.kind(slot) == SlotKind::Integer
    }

    /// Whether the slot is a Boolean slot.
    pub fn is_boolean(&self, slot: Slot) -> bool
    {
        self.kind(slot) == SlotKind::Boolean
    }

    /* ------------------------------------------------------------------ */
    /*                               Reading                              */
    /* ------------------------------------------------------------------ */

    fn slot(&self, slot: Slot) -> Result<&SlotValue, SlotError>
    {
        let size = self.slots.len();
        match self.slots.get(slot) {
            None => Err(SlotError::OutOfBounds{slot, size}),
            Some(SlotValue::Unset) => Err(SlotError::Unset{slot}),
            Some(value) => Ok(value),
        }
    }

    /// Read an integer slot.
    pub fn get_integer(&self, slot: Slot) -> Result<i64, SlotError>
    {
        match self.slot(slot)? {
            SlotValue::Integer(n) => Ok(*n),
            _ => Err(self.kind_error(slot, SlotKind::Integer)),
        }
    }

    /// Read a Boolean slot.
    pub fn get_boolean(&self, slot: Slot) -> Result<bool, SlotError>
    {
        match self.slot(slot)? {
            SlotValue::Boolean(b) => Ok(*b),
            _ => Err(self.kind_error(slot, SlotKind::Boolean)),
        }
    }

    /// Read any slot, boxing its payload if needed.
    pub fn get_value(&self, slot: Slot) -> Result<Value, SlotError>
    {
        match self.slot(slot)? {
            SlotValue::Unset      => Err(SlotError::Unset{slot}),
            SlotValue::Integer(n) => Ok(Value::Integer(*n)),
            SlotValue::Boolean(b) => Ok(Value::Boolean(*b)),
            SlotValue::Object(v)  => Ok(v.clone()),
        }
    }

    fn kind_error(&self, slot: Slot, expected: SlotKind) -> SlotError
    {
        SlotError::Kind{slot, expected, actual: self.kind(slot)}
    }

    /* ------------------------------------------------------------------ */
    /*                               Writing                              */
    /* ------------------------------------------------------------------ */

    fn slot_mut(&mut self, slot: Slot) -> Result<&mut SlotValue, SlotError>
    {
        let size = self.slots.len();
        self.slots.get_mut(slot).ok_or(SlotError::OutOfBounds{slot, size})
    }

    /// Write an integer to a slot.
    pub fn set_integer(&mut self, slot: Slot, value: i64)
        -> Result<(), SlotError>
    {
        let target = self.slot_mut(slot)?;
        *target = match target {
            SlotValue::Unset | SlotValue::Integer(_) =>
                SlotValue::Integer(value),
            SlotValue::Boolean(_) | SlotValue::Object(_) =>
                SlotValue::Object(Value::Integer(value)),
        };
        Ok(())
    }

    /// Write a Boolean to a slot.
    pub fn set_boolean(&mut self, slot: Slot, value: bool)
        -> Result<(), SlotError>
    {
        let target = self.slot_mut(slot)?;
        *target = match target {
            SlotValue::Unset | SlotValue::Boolean(_) =>
                SlotValue::Boolean(value),
            SlotValue::Integer(_) | SlotValue::Object(_) =>
                SlotValue::Object(Value::Boolean(value)),
        };
        Ok(())
    }

    /// Write any value to a slot.
    ///
    /// Integers and Booleans are stored unboxed
    /// if the slot is unset or already of their kind.
    pub fn set_value(&mut self, slot: Slot, value: Value)
        -> Result<(), SlotError>
    {
        match value {
            Value::Integer(n) => self.set_integer(slot, n),
            Value::Boolean(b) => self.set_boolean(slot, b),
            other => {
                *self.slot_mut(slot)? = SlotValue::Object(other);
                Ok(())
            },
        }
    }

    /// Copy a slot from another frame, preserving unboxed payloads.
    pub fn copy_from(&mut self, slot: Slot, source: &Frame, source_slot: Slot)
        -> Result<(), SlotError>
    {
        match source.slot(source_slot)? {
            SlotValue::Integer(n) => self.set_integer(slot, *n),
            SlotValue::Boolean(b) => self.set_boolean(slot, *b),
            _ => self.set_value(slot, source.get_value(source_slot)?),
        }
    }
}

impl fmt::Debug for Frame
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        let mut list = f.debug_list();
        for slot in &self.slots {
            match slot {
                SlotValue::Unset      => list.entry(&format_args!("_")),
                SlotValue::Integer(n) => list.entry(n),
                SlotValue::Boolean(b) => list.entry(b),
                SlotValue::Object(v)  => list.entry(v),
            };
        }
        list.finish()
    }
}
