//! Runtime values.

use {
    crate::{
        closure::Closure,
        code::{Exec, Interrupt},
        error::Fault,
        neutral::{Neutral, NeutralSignal},
        runtime::Runtime,
        types::Type,
    },
    num_bigint::BigUint,
    smallvec::SmallVec,
    std::{fmt, sync::Arc},
};

/// Arguments passed to an entry point or closure.
pub type Arguments = SmallVec<[Value; 4]>;

/// Runtime value.
#[derive(Clone)]
pub enum Value
{
    /// Natural number.
    Integer(i64),

    /// Natural number that does not fit in [`Integer`][`Self::Integer`].
    ///
    /// Arithmetic promotes to this on overflow and demotes again
    /// whenever the result fits, so no number has two representations.
    BigInteger(Arc<BigUint>),

    /// Boolean.
    Boolean(bool),

    /// The unit value.
    Unit,

    /// Function value, possibly partially applied.
    Closure(Arc<Closure>),

    /// Computation that is stuck on a symbolic input.
    Neutral(Arc<NeutralValue>),
}

/// A stuck computation together with its type.
///
/// Neutral values are first-class.
/// Applying one to arguments builds a bigger neutral application.
#[derive(Debug, PartialEq)]
pub struct NeutralValue
{
    ty: Type,
    term: Arc<Neutral>,
}

impl Value
{
    /// Create a symbolic value standing for a free variable.
    pub fn symbolic(name: impl Into<Arc<str>>, ty: Type) -> Self
    {
        let term = Neutral::Var(name.into());
        Self::Neutral(Arc::new(NeutralValue::new(ty, term)))
    }

    /// Create a natural number in its canonical representation.
    pub fn natural(n: BigUint) -> Self
    {
        match i64::try_from(&n) {
            Ok(small) => Self::Integer(small),
            Err(_) => Self::BigInteger(Arc::new(n)),
        }
    }

    /// The natural number, if this is one.
    pub fn to_biguint(&self) -> Option<BigUint>
    {
        match self {
            Self::Integer(n) => u64::try_from(*n).ok().map(BigUint::from),
            Self::BigInteger(n) => Some(BigUint::clone(n)),
            _ => None,
        }
    }

    /// Whether the value is a neutral value.
    pub fn is_neutral(&self) -> bool
    {
        matches!(self, Self::Neutral(_))
    }

    /// The integer, if this is an integer.
    pub fn as_integer(&self) -> Option<i64>
    {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// The Boolean, if this is a Boolean.
    pub fn as_boolean(&self) -> Option<bool>
    {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Apply the value to arguments.
    ///
    /// Applying any value to no arguments returns it unchanged.
    /// Closures follow the calling convention of [`Closure::call`];
    /// neutral values grow a neutral application.
    pub fn call(&self, cx: &Runtime, args: &[Value]) -> Exec<Value>
    {
        if args.is_empty() {
            return Ok(self.clone());
        }
        match self {
            Self::Closure(closure) =>
                closure.call(cx, args),
            Self::Neutral(neutral) =>
                Ok(Self::Neutral(Arc::new(neutral.apply(args)?))),
            other =>
                Err(Fault::NotAClosure{node: "call", value: other.clone()}.into()),
        }
    }

    /// Turn a neutral value into a neutral signal.
    ///
    /// Strict evaluation must never return a neutral value;
    /// it raises the signal instead.
    pub(crate) fn raise(self) -> Exec<Value>
    {
        match self {
            Self::Neutral(neutral) =>
                Err(Interrupt::Neutral(NeutralSignal::from_value(neutral))),
            other =>
                Ok(other),
        }
    }

    pub(crate) fn expect_integer(self) -> Exec<i64>
    {
        match self.raise()? {
            Self::Integer(n) => Ok(n),
            other => Err(Interrupt::Unexpected(other)),
        }
    }

    pub(crate) fn expect_boolean(self) -> Exec<bool>
    {
        match self.raise()? {
            Self::Boolean(b) => Ok(b),
            other => Err(Interrupt::Unexpected(other)),
        }
    }

    pub(crate) fn expect_closure(self) -> Exec<Arc<Closure>>
    {
        match self.raise()? {
            Self::Closure(closure) => Ok(closure),
            other => Err(Interrupt::Unexpected(other)),
        }
    }
}

impl NeutralValue
{
    /// Pair a neutral term with its type.
    pub fn new(ty: Type, term: Neutral) -> Self
    {
        Self{ty, term: Arc::new(term)}
    }

    /// The type of the stuck computation.
    pub fn ty(&self) -> &Type
    {
        &self.ty
    }

    /// The stuck computation.
    pub fn term(&self) -> &Arc<Neutral>
    {
        &self.term
    }

    /// Apply the neutral value to arguments.
    ///
    /// Each argument peels one arrow off the type and is validated
    /// against the parameter type it is passed for.
    /// Passing more arguments than the type has arrows is an arity fault.
    pub fn apply(&self, args: &[Value]) -> Result<NeutralValue, Fault>
    {
        let mut ty = &self.ty;
        for arg in args {
            match ty {
                Type::Arr(argument, result) => {
                    argument.validate(arg)?;
                    ty = result;
                },
                _ => return Err(Fault::Arity{
                    expected: self.ty.arity(),
                    actual: args.len(),
                }),
            }
        }
        Ok(Self{ty: ty.clone(), term: Arc::new(self.term.apply(args))})
    }
}

impl PartialEq for Value
{
    /// Closures are compared by identity, everything else structurally.
    fn eq(&self, other: &Self) -> bool
    {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::BigInteger(a), Self::BigInteger(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Unit,       Self::Unit)       => true,
            (Self::Closure(a), Self::Closure(b)) => Arc::ptr_eq(a, b),
            (Self::Neutral(a), Self::Neutral(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::BigInteger(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Unit       => write!(f, "()"),
            Self::Closure(closure) =>
                write!(f, "<closure/{} : {}>", closure.arity(), closure.ty()),
            Self::Neutral(neutral) =>
                write!(f, "<neutral {:?} : {}>", neutral.term, neutral.ty),
        }
    }
}
