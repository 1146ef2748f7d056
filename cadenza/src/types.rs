//! Types of values.

use {
    crate::{error::Fault, frame::SlotKind, value::Value},
    std::{fmt, sync::Arc},
    thiserror::Error,
};

/// Type of a value.
///
/// Types are compared structurally. There is no subtyping.
#[derive(Clone, Eq, Hash, PartialEq)]
pub enum Type
{
    /// Natural numbers.
    Nat,

    /// Booleans.
    Bool,

    /// The unit type.
    Unit,

    /// I/O action producing a result.
    IO(Arc<Type>),

    /// Function from an argument to a result.
    Arr(Arc<Type>, Arc<Type>),
}

/// Returned when a value does not satisfy the contract of a type.
#[derive(Clone, Debug, Error)]
#[error("Expected a value of type {expected}, got {actual:?}")]
pub struct ValidateError
{
    /// The type that the value was checked against.
    pub expected: Type,

    /// The offending value.
    pub actual: Value,
}

impl Type
{
    /// Create a function type.
    pub fn arr(argument: Type, result: Type) -> Self
    {
        Self::Arr(Arc::new(argument), Arc::new(result))
    }

    /// Create an I/O action type.
    pub fn io(result: Type) -> Self
    {
        Self::IO(Arc::new(result))
    }

    /// The number of arrows on the right spine of the type.
    pub fn arity(&self) -> usize
    {
        let mut arity = 0;
        let mut current = self;
        while let Self::Arr(_, result) = current {
            arity += 1;
            current = result;
        }
        arity
    }

    /// The kind of frame slot best suited to values of this type.
    pub fn slot_kind(&self) -> SlotKind
    {
        match self {
            Self::Nat  => SlotKind::Integer,
            Self::Bool => SlotKind::Boolean,
            _          => SlotKind::Object,
        }
    }

    /// Walk `n` arrows and return the type at the end.
    ///
    /// Elaboration guarantees that this succeeds for every type it derives,
    /// so failure is a fault rather than a type error.
    pub fn after(&self, n: usize) -> Result<&Type, Fault>
    {
        let mut current = self;
        for _ in 0 .. n {
            match current {
                Self::Arr(_, result) => current = result,
                _ => return Err(Fault::NotAFunctionType{ty: self.clone(), n}),
            }
        }
        Ok(current)
    }

    /// Check that a value satisfies the contract of this type.
    ///
    /// Neutral values satisfy a type if they were built with that type.
    pub fn validate(&self, value: &Value) -> Result<(), ValidateError>
    {
        let ok = match (self, value) {
            (_, Value::Neutral(neutral)) => neutral.ty() == self,
            (Self::Nat,  Value::Integer(n)) => *n >= 0,
            (Self::Nat,  Value::BigInteger(_)) => true,
            (Self::Bool, Value::Boolean(_)) => true,
            (Self::Unit, Value::Unit)       => true,
            (Self::Arr(..), Value::Closure(closure)) => closure.ty() == self,
            // No term produces I/O actions yet;
            // a host may still hand one in as a closure of this type.
            (Self::IO(_), Value::Closure(closure)) => closure.ty() == self,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(ValidateError{expected: self.clone(), actual: value.clone()})
        }
    }
}

impl fmt::Debug for Type
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Type
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        match self {
            Self::Nat  => write!(f, "Nat"),
            Self::Bool => write!(f, "Bool"),
            Self::Unit => write!(f, "Unit"),
            Self::IO(result) => match **result {
                Self::Arr(..) | Self::IO(_) => write!(f, "IO ({})", result),
                _ => write!(f, "IO {}", result),
            },
            Self::Arr(argument, result) => match **argument {
                Self::Arr(..) => write!(f, "({}) -> {}", argument, result),
                _ => write!(f, "{} -> {}", argument, result),
            },
        }
    }
}
