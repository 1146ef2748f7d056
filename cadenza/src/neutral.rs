//! Stuck computations.
//!
//! When evaluation needs a concrete value but finds a symbolic one,
//! it does not fail. Instead it raises a [`NeutralSignal`],
//! which the nearest node that knows how to describe the stuck computation
//! catches and rebuilds into a bigger [`Neutral`] term.
//! Generic evaluation turns the signal back into a first-class value.
//! This way partially symbolic programs evaluate as far as possible.

use {
    crate::{
        builtin::Builtin,
        error::Fault,
        types::Type,
        value::{NeutralValue, Value},
    },
    std::sync::Arc,
    tracing::trace,
};

/// Description of a stuck computation.
#[derive(Clone, Debug, PartialEq)]
pub enum Neutral
{
    /// Free symbolic variable.
    Var(Arc<str>),

    /// Conditional on a stuck scrutinee, with both branches evaluated.
    If(Arc<Neutral>, Value, Value),

    /// Application of a stuck operator.
    App(Arc<Neutral>, Vec<Value>),

    /// Saturated builtin call with at least one neutral argument.
    CallBuiltin(Builtin, Vec<Value>),
}

/// Raised when evaluation gets stuck.
///
/// This is not an error; see the [module documentation][`self`].
#[derive(Clone, Debug)]
pub struct NeutralSignal
{
    value: Arc<NeutralValue>,
}

impl Neutral
{
    /// Apply the stuck computation to more arguments.
    ///
    /// Applications are flattened,
    /// so the operator of an application is never itself an application.
    pub fn apply(&self, args: &[Value]) -> Neutral
    {
        match self {
            Self::App(operator, operands) => {
                let mut operands = operands.clone();
                operands.extend_from_slice(args);
                Self::App(operator.clone(), operands)
            },
            other =>
                Self::App(Arc::new(other.clone()), args.to_vec()),
        }
    }
}

impl NeutralSignal
{
    /// Signal that a computation of the given type got stuck.
    pub fn new(ty: Type, term: Neutral) -> Self
    {
        trace!(%ty, "computation is stuck");
        Self{value: Arc::new(NeutralValue::new(ty, term))}
    }

    /// Raise an existing neutral value.
    pub fn from_value(value: Arc<NeutralValue>) -> Self
    {
        Self{value}
    }

    /// The type of the stuck computation.
    pub fn ty(&self) -> &Type
    {
        self.value.ty()
    }

    /// The stuck computation.
    pub fn term(&self) -> &Arc<Neutral>
    {
        self.value.term()
    }

    /// Convert the signal into a first-class value.
    pub fn into_value(self) -> Value
    {
        Value::Neutral(self.value)
    }

    /// The signal for applying the stuck computation to arguments.
    ///
    /// See [`NeutralValue::apply`].
    pub fn apply(&self, args: &[Value]) -> Result<Self, Fault>
    {
        let value = self.value.apply(args)?;
        trace!(ty = %value.ty(), "stuck application");
        Ok(Self{value: Arc::new(value)})
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn signal_round_trips_through_values()
    {
        let signal = NeutralSignal::new(Type::Bool, Neutral::Var("b".into()));
        let value = signal.clone().into_value();
        let Value::Neutral(neutral) = &value else {
            panic!("Expected a neutral value, got {value:?}");
        };
        assert_eq!(neutral.ty(), signal.ty());
        assert_eq!(neutral.term(), signal.term());
    }

    #[test]
    fn apply_peels_arrows()
    {
        let ty = Type::arr(Type::Nat, Type::arr(Type::Nat, Type::Bool));
        let signal = NeutralSignal::new(ty, Neutral::Var("le".into()));
        let signal = signal.apply(&[Value::Integer(1)]).unwrap();
        assert_eq!(signal.ty(), &Type::arr(Type::Nat, Type::Bool));
        let signal = signal.apply(&[Value::Integer(2)]).unwrap();
        assert_eq!(signal.ty(), &Type::Bool);
        assert!(signal.apply(&[Value::Integer(3)]).is_err());
    }

    #[test]
    fn builtin_calls_are_not_flattened()
    {
        let call = Neutral::CallBuiltin(Builtin::FixNatF, vec![]);
        let applied = call.apply(&[Value::Integer(0)]);
        assert_eq!(
            applied,
            Neutral::App(Arc::new(call), vec![Value::Integer(0)]),
        );
    }
}
