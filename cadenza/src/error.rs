//! Errors that abort elaboration or evaluation.

use {
    crate::{
        builtin::Builtin,
        config::ConfigError,
        elaborate::TypeError,
        frame::SlotError,
        types::{Type, ValidateError},
        value::Value,
    },
    std::sync::Arc,
    thiserror::Error,
};

/// Any error produced by the crate.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum Error
{
    #[error("{0}")]
    Type(#[from] TypeError),

    #[error("Internal error: {0}")]
    Fault(#[from] Fault),

    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// Violated runtime invariant.
///
/// Faults mean that elaboration and evaluation disagree
/// about the shape of the program, or that a builtin cannot compute.
/// They abort the current evaluation.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error)]
pub enum Fault
{
    #[error("{0}")]
    Slot(#[from] SlotError),

    #[error("Argument {index} is missing; there are only {len}")]
    MissingArgument{index: usize, len: usize},

    #[error("{node}: expected a closure, got {value:?}")]
    NotAClosure{node: &'static str, value: Value},

    #[error("{node}: unexpected result {value:?}")]
    UnexpectedResult{node: &'static str, value: Value},

    #[error("Arity mismatch: expected {expected} arguments, got {actual}")]
    Arity{expected: usize, actual: usize},

    #[error("Entry point called with the wrong calling convention")]
    CallingConvention,

    #[error("Type {ty} does not have {n} arrows")]
    NotAFunctionType{ty: Type, n: usize},

    #[error("Name `{0}` is not bound in the frame layout")]
    UnboundName(Arc<str>),

    #[error("{0}")]
    Validate(#[from] ValidateError),

    #[error("Division by zero in `{builtin}`")]
    DivisionByZero{builtin: Builtin},

    #[error("Trampoline exceeded the limit of {0} tail calls")]
    TailCallLimit(u64),

    #[error("Cannot write output: {0}")]
    Output(String),

    #[error("Closure arity {arity} is invalid for type {ty}")]
    ClosureArity{arity: usize, ty: Type},
}
