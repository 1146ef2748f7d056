//! Compiled, executable trees.
//!
//! Code is produced by [elaboration][`crate::elaborate`]
//! and evaluated against a [`Frame`].
//! Every node supports generic evaluation through [`Code::execute_any`]
//! and [`Code::execute`], plus typed variants that avoid boxing
//! on the fast path and otherwise evaluate generically
//! and check the shape of the result.
//!
//! Evaluation does not use a single return channel.
//! Besides returning a value or failing with a [`Fault`],
//! it may be interrupted by a stuck computation or a tail call.
//! Both are modeled as [`Interrupt`]s so that `?` propagates them
//! to the nearest node that handles them.

use {
    crate::{
        builtin::Builtin,
        closure::{Closure, EntryPoint},
        error::Fault,
        frame::{Frame, Slot, SlotError},
        neutral::{Neutral, NeutralSignal},
        runtime::Runtime,
        trampoline::{self, TailCall},
        types::{Type, ValidateError},
        value::{Arguments, Value},
    },
    std::sync::Arc,
};

pub use self::app::App;

pub mod typing;

mod app;

/// Result of evaluation.
pub type Exec<T> =
    std::result::Result<T, Interrupt>;

/// Non-local exit from evaluation.
#[derive(Debug)]
pub enum Interrupt
{
    /// The computation is stuck on a symbolic input.
    Neutral(NeutralSignal),

    /// A call in tail position, to be performed by the trampoline.
    TailCall(TailCall),

    /// A typed evaluation found a value of a different shape.
    ///
    /// The value is complete; the caller may continue generically with it.
    Unexpected(Value),

    /// Evaluation must be aborted.
    Fault(Fault),
}

impl From<Fault> for Interrupt
{
    fn from(other: Fault) -> Self
    {
        Self::Fault(other)
    }
}

impl From<SlotError> for Interrupt
{
    fn from(other: SlotError) -> Self
    {
        Self::Fault(other.into())
    }
}

impl From<ValidateError> for Interrupt
{
    fn from(other: ValidateError) -> Self
    {
        Self::Fault(other.into())
    }
}

/// Executable tree.
pub enum Code
{
    /// Read a frame slot.
    Var(Slot),

    /// Read a positional argument of the activation.
    Arg(usize),

    /// Constant.
    Lit(Value),

    /// Conditional.
    If(If),

    /// Application of a closure.
    App(App),

    /// Closure construction.
    Lam(Lam),

    /// Saturated call of a builtin.
    CallBuiltin(CallBuiltin),

    /// Non-recursive local binding.
    Let(Let),
}

/// See [`Code::If`].
pub struct If
{
    /// The type of both branches.
    pub ty: Type,

    /// Evaluated to a Boolean, or to a neutral value.
    pub condition: Arc<Code>,

    /// Evaluated when the condition is true or stuck.
    pub then_branch: Arc<Code>,

    /// Evaluated when the condition is false or stuck.
    pub else_branch: Arc<Code>,
}

/// See [`Code::Lam`].
pub struct Lam
{
    /// Size of the capture frame, if the closure needs one.
    pub env_size: Option<usize>,

    /// How to fill each slot of the capture frame
    /// from the enclosing activation.
    pub captures: Vec<(Slot, Capture)>,

    /// The entry point of the closure.
    pub target: Arc<EntryPoint>,

    /// The type of the closure.
    pub ty: Type,
}

/// Where a captured variable lives in the enclosing activation.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capture
{
    Slot(Slot),
    Arg(usize),
}

/// See [`Code::CallBuiltin`].
pub struct CallBuiltin
{
    /// The result type of the call.
    pub ty: Type,

    /// The builtin to call.
    pub builtin: Builtin,

    /// Exactly as many as the builtin takes.
    pub args: Vec<Arc<Code>>,

    /// Whether the call is in tail position.
    pub tail: bool,
}

/// See [`Code::Let`].
pub struct Let
{
    /// Fresh slot that receives the value.
    pub slot: Slot,

    /// Stored into the slot before the body runs.
    pub value: Arc<Code>,

    /// Evaluated with the slot set.
    pub body: Arc<Code>,
}

/* -------------------------------------------------------------------------- */
/*                              Generic evaluation                            */
/* -------------------------------------------------------------------------- */

impl Code
{
    /// Evaluate to a value, which may be a neutral value.
    ///
    /// Stuck computations are converted into neutral values.
    /// Tail calls are passed through to the caller.
    pub fn execute_any(&self, cx: &Runtime, frame: &mut Frame) -> Exec<Value>
    {
        match self.evaluate(cx, frame) {
            Err(Interrupt::Neutral(signal)) => Ok(signal.into_value()),
            other => other,
        }
    }

    /// Evaluate to a value that is never a neutral value.
    ///
    /// Neutral results are raised as [`Interrupt::Neutral`].
    pub fn execute(&self, cx: &Runtime, frame: &mut Frame) -> Exec<Value>
    {
        self.evaluate(cx, frame)?.raise()
    }

    /// Like [`execute_any`][`Self::execute_any`],
    /// but also perform pending tail calls.
    pub fn execute_settled(&self, cx: &Runtime, frame: &mut Frame)
        -> Exec<Value>
    {
        match trampoline::settle(cx, self.execute_any(cx, frame)) {
            Err(Interrupt::Neutral(signal)) => Ok(signal.into_value()),
            other => other,
        }
    }

    /// Evaluate without deciding what to do with neutral values.
    ///
    /// A neutral result is either returned or raised,
    /// depending on where it was found.
    fn evaluate(&self, cx: &Runtime, frame: &mut Frame) -> Exec<Value>
    {
        match self {
            Self::Var(slot) =>
                Ok(frame.get_value(*slot)?),
            Self::Arg(index) =>
                Ok(frame.argument(*index)?),
            Self::Lit(value) =>
                Ok(value.clone()),
            Self::If(node) =>
                node.branch(cx, frame)?.evaluate(cx, frame),
            Self::App(node) =>
                node.evaluate(cx, frame),
            Self::Lam(node) =>
                Ok(Value::Closure(node.evaluate(frame)?)),
            Self::CallBuiltin(node) =>
                node.evaluate(cx, frame),
            Self::Let(node) => {
                let value = node.value.execute_any(cx, frame)?;
                frame.set_value(node.slot, value)?;
                node.body.evaluate(cx, frame)
            },
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                               Typed evaluation                             */
/* -------------------------------------------------------------------------- */

impl Code
{
    /// Evaluate to an integer.
    ///
    /// Results of another shape are reported as [`Interrupt::Unexpected`].
    pub fn execute_integer(&self, cx: &Runtime, frame: &mut Frame)
        -> Exec<i64>
    {
        match self {
            Self::Lit(Value::Integer(n)) =>
                Ok(*n),
            Self::Var(slot) => match frame.get_integer(*slot) {
                Ok(n) => Ok(n),
                Err(SlotError::Kind{..}) =>
                    frame.get_value(*slot)?.expect_integer(),
                Err(err) => Err(err.into()),
            },
            Self::If(node) =>
                node.branch(cx, frame)?.execute_integer(cx, frame),
            _ =>
                self.evaluate(cx, frame)?.expect_integer(),
        }
    }

    /// Evaluate to a Boolean.
    ///
    /// Results of another shape are reported as [`Interrupt::Unexpected`].
    pub fn execute_boolean(&self, cx: &Runtime, frame: &mut Frame)
        -> Exec<bool>
    {
        match self {
            Self::Lit(Value::Boolean(b)) =>
                Ok(*b),
            Self::Var(slot) => match frame.get_boolean(*slot) {
                Ok(b) => Ok(b),
                Err(SlotError::Kind{..}) =>
                    frame.get_value(*slot)?.expect_boolean(),
                Err(err) => Err(err.into()),
            },
            Self::If(node) =>
                node.branch(cx, frame)?.execute_boolean(cx, frame),
            _ =>
                self.evaluate(cx, frame)?.expect_boolean(),
        }
    }

    /// Evaluate to a closure.
    ///
    /// Results of another shape are reported as [`Interrupt::Unexpected`].
    pub fn execute_closure(&self, cx: &Runtime, frame: &mut Frame)
        -> Exec<Arc<Closure>>
    {
        match self {
            Self::Lam(node) =>
                node.evaluate(frame),
            Self::If(node) =>
                node.branch(cx, frame)?.execute_closure(cx, frame),
            _ =>
                self.evaluate(cx, frame)?.expect_closure(),
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                                    Nodes                                   */
/* -------------------------------------------------------------------------- */

impl If
{
    /// Select the branch to evaluate.
    ///
    /// If the condition is stuck, both branches are evaluated
    /// and the whole conditional is raised as a neutral `If`.
    fn branch(&self, cx: &Runtime, frame: &mut Frame) -> Exec<&Code>
    {
        match self.condition.execute_boolean(cx, frame) {
            Ok(true) => Ok(&*self.then_branch),
            Ok(false) => Ok(&*self.else_branch),
            Err(Interrupt::Neutral(signal)) => {
                let then_value = self.then_branch.execute_settled(cx, frame)?;
                let else_value = self.else_branch.execute_settled(cx, frame)?;
                let term = Neutral::If(signal.term().clone(), then_value, else_value);
                Err(Interrupt::Neutral(NeutralSignal::new(self.ty.clone(), term)))
            },
            Err(Interrupt::Unexpected(value)) =>
                Err(Fault::UnexpectedResult{node: "If", value}.into()),
            Err(other) => Err(other),
        }
    }
}

impl Lam
{
    /// Create a closure over the enclosing activation.
    ///
    /// Only the captured variables are copied, into a fresh capture frame.
    fn evaluate(&self, frame: &Frame) -> Exec<Arc<Closure>>
    {
        let env = match self.env_size {
            None => None,
            Some(size) => {
                let mut env = Frame::new(size, Arguments::new());
                for &(slot, capture) in &self.captures {
                    match capture {
                        Capture::Slot(source) =>
                            env.copy_from(slot, frame, source)?,
                        Capture::Arg(index) =>
                            env.set_value(slot, frame.argument(index)?)?,
                    }
                }
                Some(Arc::new(env))
            },
        };
        let closure = Closure::new(self.target.clone(), env, self.ty.clone())?;
        Ok(Arc::new(closure))
    }
}

impl CallBuiltin
{
    fn evaluate(&self, cx: &Runtime, frame: &mut Frame) -> Exec<Value>
    {
        let mut args = Arguments::with_capacity(self.args.len());
        for arg in &self.args {
            args.push(Self::argument(arg, cx, frame)?);
        }

        if args.iter().any(Value::is_neutral) {
            let term = Neutral::CallBuiltin(self.builtin, args.to_vec());
            return Err(Interrupt::Neutral(NeutralSignal::new(self.ty.clone(), term)));
        }

        let result = self.builtin.run(cx, &args);
        if self.tail {
            result
        } else {
            trampoline::settle(cx, result)
        }
    }

    /// Evaluate an argument, preferring the unboxed path.
    ///
    /// Neutral arguments do not stop evaluation of the other arguments.
    fn argument(arg: &Code, cx: &Runtime, frame: &mut Frame) -> Exec<Value>
    {
        match arg.execute_integer(cx, frame) {
            Ok(n) => Ok(Value::Integer(n)),
            Err(Interrupt::Neutral(signal)) => Ok(signal.into_value()),
            Err(Interrupt::Unexpected(value)) => Ok(value),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests
{
    use {
        super::*,
        crate::{config::Config, frame::SlotKind},
        smallvec::smallvec,
    };

    fn lit(value: Value) -> Arc<Code>
    {
        Arc::new(Code::Lit(value))
    }

    fn if_(condition: Arc<Code>) -> Code
    {
        Code::If(If{
            ty: Type::Nat,
            condition,
            then_branch: lit(Value::Integer(1)),
            else_branch: lit(Value::Integer(2)),
        })
    }

    #[test]
    fn typed_literals()
    {
        let cx = Runtime::new(Config::default());
        let mut frame = Frame::new(0, smallvec![]);
        let code = Code::Lit(Value::Integer(3));
        assert_eq!(code.execute_integer(&cx, &mut frame).ok(), Some(3));
        assert!(matches!(
            code.execute_boolean(&cx, &mut frame),
            Err(Interrupt::Unexpected(Value::Integer(3))),
        ));
    }

    #[test]
    fn var_falls_back_on_degraded_slots()
    {
        let cx = Runtime::new(Config::default());
        let mut frame = Frame::new(1, smallvec![]);
        frame.set_boolean(0, true).unwrap();
        frame.set_integer(0, 7).unwrap();
        assert_eq!(frame.kind(0), SlotKind::Object);
        let code = Code::Var(0);
        assert_eq!(code.execute_integer(&cx, &mut frame).ok(), Some(7));
    }

    #[test]
    fn var_unset_is_a_fault()
    {
        let cx = Runtime::new(Config::default());
        let mut frame = Frame::new(1, smallvec![]);
        let result = Code::Var(0).execute_any(&cx, &mut frame);
        assert!(matches!(
            result,
            Err(Interrupt::Fault(Fault::Slot(SlotError::Unset{slot: 0}))),
        ));
    }

    #[test]
    fn arg_reads_arguments()
    {
        let cx = Runtime::new(Config::default());
        let mut frame = Frame::new(0, smallvec![Value::Boolean(true)]);
        assert_eq!(Code::Arg(0).execute_boolean(&cx, &mut frame).ok(), Some(true));
        assert!(matches!(
            Code::Arg(1).execute_any(&cx, &mut frame),
            Err(Interrupt::Fault(Fault::MissingArgument{index: 1, len: 1})),
        ));
    }

    #[test]
    fn if_on_a_non_boolean_is_a_fault()
    {
        let cx = Runtime::new(Config::default());
        let mut frame = Frame::new(0, smallvec![]);
        let code = if_(lit(Value::Unit));
        assert!(matches!(
            code.execute_any(&cx, &mut frame),
            Err(Interrupt::Fault(Fault::UnexpectedResult{node: "If", ..})),
        ));
    }

    #[test]
    fn if_on_a_neutral_condition()
    {
        let cx = Runtime::new(Config::default());
        let mut frame = Frame::new(0, smallvec![]);
        let code = if_(lit(Value::symbolic("b", Type::Bool)));

        assert!(matches!(
            code.execute(&cx, &mut frame),
            Err(Interrupt::Neutral(_)),
        ));

        let value = code.execute_any(&cx, &mut frame).unwrap();
        let Value::Neutral(neutral) = value else {
            panic!("Expected a neutral value, got {value:?}");
        };
        assert_eq!(neutral.ty(), &Type::Nat);
        assert!(matches!(**neutral.term(), Neutral::If(..)));
    }

    #[test]
    fn let_writes_a_slot()
    {
        let cx = Runtime::new(Config::default());
        let mut frame = Frame::new(1, smallvec![]);
        let code = Code::Let(Let{
            slot: 0,
            value: lit(Value::Integer(4)),
            body: Arc::new(Code::Var(0)),
        });
        assert_eq!(code.execute_integer(&cx, &mut frame).ok(), Some(4));
        assert!(frame.is_integer(0));
    }

    #[test]
    fn builtin_with_neutral_argument()
    {
        let cx = Runtime::new(Config::default());
        let mut frame = Frame::new(0, smallvec![]);
        let stuck = Value::symbolic("n", Type::Nat);
        let code = Code::CallBuiltin(CallBuiltin{
            ty: Type::Bool,
            builtin: Builtin::Le,
            args: vec![lit(Value::Integer(1)), lit(stuck.clone())],
            tail: false,
        });
        let Err(Interrupt::Neutral(signal)) = code.execute(&cx, &mut frame) else {
            panic!("Expected a neutral signal");
        };
        assert_eq!(signal.ty(), &Type::Bool);
        assert_eq!(
            **signal.term(),
            Neutral::CallBuiltin(Builtin::Le, vec![Value::Integer(1), stuck]),
        );
    }
}
