//! Functions provided by the runtime.

use {
    crate::{
        closure::{Closure, EntryPoint},
        code::{Exec, Interrupt},
        error::Fault,
        neutral::{Neutral, NeutralSignal},
        runtime::Runtime,
        types::Type,
        value::{Arguments, Value},
    },
    num_bigint::BigUint,
    std::{fmt, sync::{Arc, OnceLock}},
};

/// Function provided by the runtime.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Builtin
{
    Le,
    Eq,
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
    FixNatF,
    PrintId,
}

impl Builtin
{
    /// Every builtin, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Le, Self::Eq,
        Self::Plus, Self::Minus, Self::Mult, Self::Div, Self::Mod,
        Self::FixNatF, Self::PrintId,
    ];

    /// The name by which programs refer to the builtin.
    pub fn name(self) -> &'static str
    {
        match self {
            Self::Le      => "le",
            Self::Eq      => "eq",
            Self::Plus    => "plus",
            Self::Minus   => "minus",
            Self::Mult    => "mult",
            Self::Div     => "div",
            Self::Mod     => "mod",
            Self::FixNatF => "fixNatF",
            Self::PrintId => "printId",
        }
    }

    /// Look up a builtin by name.
    pub fn from_name(name: &str) -> Option<Self>
    {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    /// The type of the builtin.
    pub fn ty(self) -> Type
    {
        let nat = || Type::Nat;
        let natf = || Type::arr(Type::Nat, Type::Nat);
        match self {
            Self::Le | Self::Eq =>
                Type::arr(nat(), Type::arr(nat(), Type::Bool)),
            Self::Plus | Self::Minus | Self::Mult | Self::Div | Self::Mod =>
                Type::arr(nat(), natf()),
            Self::FixNatF =>
                Type::arr(Type::arr(natf(), natf()), natf()),
            Self::PrintId =>
                natf(),
        }
    }

    /// The number of arguments the builtin takes.
    pub fn arity(self) -> usize
    {
        match self {
            Self::PrintId => 1,
            _ => 2,
        }
    }

    /// The entry point shared by all closures over the builtin.
    pub fn entry_point(self) -> Arc<EntryPoint>
    {
        static ENTRY_POINTS: OnceLock<Vec<Arc<EntryPoint>>> = OnceLock::new();
        let entry_points = ENTRY_POINTS.get_or_init(|| {
            Self::ALL.into_iter()
                .map(|builtin| Arc::new(EntryPoint::builtin(builtin)))
                .collect()
        });
        entry_points[self as usize].clone()
    }

    /// Create a closure over the builtin.
    pub fn closure(self) -> Result<Closure, Fault>
    {
        Closure::new(self.entry_point(), None, self.ty())
    }

    /// Invoke the builtin through its entry point.
    ///
    /// Calls with neutral arguments are stuck.
    pub(crate) fn invoke(self, cx: &Runtime, args: Arguments) -> Exec<Value>
    {
        if args.iter().any(Value::is_neutral) {
            let ty = self.ty().after(self.arity())?.clone();
            let term = Neutral::CallBuiltin(self, args.to_vec());
            return Ok(NeutralSignal::new(ty, term).into_value());
        }
        self.run(cx, &args)
    }

    /// Run the builtin on concrete arguments.
    ///
    /// `fixNatF` continues with a tail call,
    /// so the result must be settled by a trampoline.
    pub fn run(self, cx: &Runtime, args: &[Value]) -> Exec<Value>
    {
        if args.len() != self.arity() {
            let fault = Fault::Arity{expected: self.arity(), actual: args.len()};
            return Err(fault.into());
        }
        match self {
            Self::Le => Ok(Value::Boolean(match self.operands(args)? {
                Operands::Small(a, b) => a <= b,
                Operands::Big(a, b) => a <= b,
            })),
            Self::Eq => Ok(Value::Boolean(match self.operands(args)? {
                Operands::Small(a, b) => a == b,
                Operands::Big(a, b) => a == b,
            })),
            Self::Plus => Ok(match self.operands(args)? {
                Operands::Small(a, b) => a.checked_add(b).map(Value::Integer)
                    .unwrap_or_else(|| Value::natural(big(a) + big(b))),
                Operands::Big(a, b) => Value::natural(a + b),
            }),
            Self::Minus => Ok(match self.operands(args)? {
                Operands::Small(a, b) => Value::Integer(a.saturating_sub(b).max(0)),
                Operands::Big(a, b) if a <= b => Value::Integer(0),
                Operands::Big(a, b) => Value::natural(a - b),
            }),
            Self::Mult => Ok(match self.operands(args)? {
                Operands::Small(a, b) => a.checked_mul(b).map(Value::Integer)
                    .unwrap_or_else(|| Value::natural(big(a) * big(b))),
                Operands::Big(a, b) => Value::natural(a * b),
            }),
            Self::Div | Self::Mod => {
                let div = self == Self::Div;
                match self.operands(args)? {
                    Operands::Small(_, 0) =>
                        Err(Fault::DivisionByZero{builtin: self}.into()),
                    Operands::Big(_, b) if b.bits() == 0 =>
                        Err(Fault::DivisionByZero{builtin: self}.into()),
                    Operands::Small(a, b) =>
                        Ok(Value::Integer(if div { a / b } else { a % b })),
                    Operands::Big(a, b) =>
                        Ok(Value::natural(if div { a / b } else { a % b })),
                }
            },
            Self::FixNatF => {
                // fixNatF f x = f (fixNatF f) x
                let f = self.closure_argument(&args[0])?;
                let fix = self.closure()?.pap(&args[.. 1])?;
                let args = [Value::Closure(Arc::new(fix)), args[1].clone()];
                if cx.config().tail_calls {
                    f.tail_call(cx, &args)
                } else {
                    f.call(cx, &args)
                }
            },
            Self::PrintId => {
                let n = self.natural(&args[0])?;
                cx.write_output(format_args!("{:?}\n", n))?;
                Ok(n)
            },
        }
    }

    fn natural(self, arg: &Value) -> Exec<Value>
    {
        match arg.clone().raise().map_err(|interrupt| self.unexpected(interrupt))? {
            n @ (Value::Integer(_) | Value::BigInteger(_)) => Ok(n),
            other => Err(self.unexpected(Interrupt::Unexpected(other))),
        }
    }

    /// Both operands of a binary arithmetic builtin,
    /// unboxed unless either is big.
    fn operands(self, args: &[Value]) -> Exec<Operands>
    {
        match (self.natural(&args[0])?, self.natural(&args[1])?) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Operands::Small(a, b)),
            (a, b) => match (a.to_biguint(), b.to_biguint()) {
                (Some(a), Some(b)) => Ok(Operands::Big(a, b)),
                _ => Err(self.unexpected(Interrupt::Unexpected(a))),
            },
        }
    }

    fn closure_argument(self, arg: &Value) -> Exec<Arc<Closure>>
    {
        arg.clone().expect_closure().map_err(|interrupt| self.unexpected(interrupt))
    }

    fn unexpected(self, interrupt: Interrupt) -> Interrupt
    {
        match interrupt {
            Interrupt::Unexpected(value) =>
                Fault::UnexpectedResult{node: self.name(), value}.into(),
            other => other,
        }
    }
}

enum Operands
{
    Small(i64, i64),
    Big(BigUint, BigUint),
}

fn big(n: i64) -> BigUint
{
    BigUint::from(n.unsigned_abs())
}

impl fmt::Display for Builtin
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        write!(f, "{}", self.name())
    }
}
