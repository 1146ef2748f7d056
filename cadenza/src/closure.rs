//! Closures and the calling convention.

use {
    crate::{
        builtin::Builtin,
        code::{Code, Exec, Interrupt},
        error::Fault,
        frame::{Frame, Slot},
        runtime::Runtime,
        trampoline::{self, TailCall},
        types::Type,
        value::{Arguments, Value},
    },
    scope_exit::scope_exit,
    std::{cell::Cell, cmp::Ordering, sync::Arc},
};

/* -------------------------------------------------------------------------- */
/*                                 Entry points                               */
/* -------------------------------------------------------------------------- */

/// Callable root with a fixed arity.
///
/// An entry point that needs a capture frame is a _supercombinator_.
/// It must be invoked with the capture frame as an implicit leading argument;
/// every other entry point must be invoked without one.
pub struct EntryPoint
{
    arity: usize,
    body: EntryBody,
}

/// What an entry point runs.
pub enum EntryBody
{
    /// Compiled lambda body.
    Closure(ClosureRoot),

    /// Builtin function.
    Builtin(Builtin),
}

/// Compiled lambda body together with its frame descriptor.
pub struct ClosureRoot
{
    /// The number of slots in the frame of each activation.
    pub frame_size: usize,

    /// The type of each slot, as recorded during elaboration.
    pub slot_types: Vec<Type>,

    /// Slots initialized from the capture frame: `(slot, capture slot)`.
    pub env_preamble: Vec<(Slot, Slot)>,

    /// Slots initialized from the arguments: `(slot, argument index)`.
    pub arg_preamble: Vec<(Slot, usize)>,

    /// The body of the lambda.
    pub body: Code,
}

impl EntryPoint
{
    /// Create the entry point of a lambda.
    pub fn closure(arity: usize, root: ClosureRoot) -> Self
    {
        Self{arity, body: EntryBody::Closure(root)}
    }

    /// Create the entry point of a builtin.
    pub fn builtin(builtin: Builtin) -> Self
    {
        Self{arity: builtin.arity(), body: EntryBody::Builtin(builtin)}
    }

    /// The number of arguments, excluding the capture frame.
    pub fn arity(&self) -> usize
    {
        self.arity
    }

    /// What the entry point runs.
    pub fn body(&self) -> &EntryBody
    {
        &self.body
    }

    /// Whether the entry point takes a capture frame.
    pub fn is_super_combinator(&self) -> bool
    {
        match &self.body {
            EntryBody::Closure(root) => !root.env_preamble.is_empty(),
            EntryBody::Builtin(_) => false,
        }
    }

    /// Invoke the entry point.
    ///
    /// Tail calls in the body are returned to the caller;
    /// see [`trampoline::call`] to have them performed.
    pub fn invoke(&self, cx: &Runtime, env: Option<&Arc<Frame>>, args: Arguments)
        -> Exec<Value>
    {
        let depth = DEPTH.with(|depth| {
            depth.set(depth.get() + 1);
            depth.get()
        });
        scope_exit! { DEPTH.with(|depth| depth.set(depth.get() - 1)); }
        cx.stats().record_depth(depth);

        if args.len() != self.arity {
            let fault = Fault::Arity{expected: self.arity, actual: args.len()};
            return Err(fault.into());
        }

        if env.is_some() != self.is_super_combinator() {
            return Err(Fault::CallingConvention.into());
        }

        match &self.body {
            EntryBody::Closure(root) => root.execute(cx, env, args),
            EntryBody::Builtin(builtin) => builtin.invoke(cx, args),
        }
    }
}

impl ClosureRoot
{
    fn execute(&self, cx: &Runtime, env: Option<&Arc<Frame>>, args: Arguments)
        -> Exec<Value>
    {
        let mut frame = Frame::new(self.frame_size, args);
        if let Some(env) = env {
            for &(slot, env_slot) in &self.env_preamble {
                frame.copy_from(slot, env, env_slot)?;
            }
        }
        for &(slot, index) in &self.arg_preamble {
            let value = frame.argument(index)?;
            frame.set_value(slot, value)?;
        }
        self.body.execute_any(cx, &mut frame)
    }
}

thread_local!
{
    /// Nesting depth of entry point invocations on this thread.
    static DEPTH: Cell<u64> = Cell::new(0);
}

/// The current nesting depth of entry point invocations on this thread.
pub fn depth() -> u64
{
    DEPTH.with(Cell::get)
}

/* -------------------------------------------------------------------------- */
/*                                   Closures                                 */
/* -------------------------------------------------------------------------- */

/// Function value.
///
/// A closure is an entry point together with the capture frame it needs
/// and the arguments it has been partially applied to.
/// Its arity is the number of arguments still missing,
/// and its type is the type of the function still to be applied.
pub struct Closure
{
    env: Option<Arc<Frame>>,
    pap_args: Arguments,
    arity: usize,
    ty: Type,
    target: Arc<EntryPoint>,
}

impl Closure
{
    /// Create a closure that is not partially applied.
    pub fn new(target: Arc<EntryPoint>, env: Option<Arc<Frame>>, ty: Type)
        -> Result<Self, Fault>
    {
        let arity = target.arity();
        if arity == 0 || arity > ty.arity() {
            return Err(Fault::ClosureArity{arity, ty});
        }
        if env.is_some() != target.is_super_combinator() {
            return Err(Fault::CallingConvention);
        }
        Ok(Self{env, pap_args: Arguments::new(), arity, ty, target})
    }

    /// The number of arguments still missing.
    pub fn arity(&self) -> usize
    {
        self.arity
    }

    /// The type of the function still to be applied.
    pub fn ty(&self) -> &Type
    {
        &self.ty
    }

    /// The entry point.
    pub fn target(&self) -> &Arc<EntryPoint>
    {
        &self.target
    }

    /// The capture frame, for supercombinators.
    pub fn env(&self) -> Option<&Arc<Frame>>
    {
        self.env.as_ref()
    }

    /// The arguments the closure has been partially applied to.
    pub fn pap_args(&self) -> &[Value]
    {
        &self.pap_args
    }

    /// Partially apply the closure to fewer arguments than it takes.
    pub fn pap(&self, args: &[Value]) -> Result<Self, Fault>
    {
        if args.len() >= self.arity {
            return Err(Fault::Arity{expected: self.arity, actual: args.len()});
        }
        let mut pap_args = self.pap_args.clone();
        pap_args.extend(args.iter().cloned());
        Ok(Self{
            env: self.env.clone(),
            pap_args,
            arity: self.arity - args.len(),
            ty: self.ty.after(args.len())?.clone(),
            target: self.target.clone(),
        })
    }

    /// All arguments for invoking the entry point.
    pub(crate) fn saturate(&self, args: &[Value]) -> Arguments
    {
        let mut all = Arguments::with_capacity(self.pap_args.len() + args.len());
        all.extend(self.pap_args.iter().cloned());
        all.extend(args.iter().cloned());
        all
    }

    /// Apply the closure to arguments.
    ///
    ///  - With fewer arguments than the arity,
    ///    return a partial application.
    ///  - With exactly as many, invoke the entry point.
    ///  - With more, invoke the entry point with as many as it takes,
    ///    and apply the result to the rest.
    pub fn call(&self, cx: &Runtime, args: &[Value]) -> Exec<Value>
    {
        match args.len().cmp(&self.arity) {
            Ordering::Less =>
                Ok(Value::Closure(Arc::new(self.pap(args)?))),
            Ordering::Equal =>
                trampoline::call(cx, &self.target, self.env.as_ref(),
                                 self.saturate(args)),
            Ordering::Greater => {
                let (now, later) = args.split_at(self.arity);
                let result = trampoline::call(cx, &self.target,
                                              self.env.as_ref(),
                                              self.saturate(now))?;
                result.call(cx, later)
            },
        }
    }

    /// Like [`call`][`Self::call`], but in tail position.
    ///
    /// The final invocation is left to the enclosing trampoline.
    pub fn tail_call(&self, cx: &Runtime, args: &[Value]) -> Exec<Value>
    {
        match args.len().cmp(&self.arity) {
            Ordering::Less =>
                Ok(Value::Closure(Arc::new(self.pap(args)?))),
            Ordering::Equal =>
                Err(Interrupt::TailCall(TailCall{
                    target: self.target.clone(),
                    env: self.env.clone(),
                    args: self.saturate(args),
                })),
            Ordering::Greater => {
                let (now, later) = args.split_at(self.arity);
                let result = trampoline::call(cx, &self.target,
                                              self.env.as_ref(),
                                              self.saturate(now))?;
                match result {
                    Value::Closure(next) => next.tail_call(cx, later),
                    other => other.call(cx, later),
                }
            },
        }
    }

    /// Apply the closure on behalf of the host.
    ///
    /// Unlike [`call`][`Self::call`], this checks the arguments
    /// against the type of the closure, and it performs all tail calls.
    pub fn execute(&self, cx: &Runtime, args: &[Value]) -> Result<Value, Fault>
    {
        if args.len() > self.ty.arity() {
            return Err(Fault::Arity{expected: self.ty.arity(), actual: args.len()});
        }
        let mut ty = &self.ty;
        for arg in args {
            let Type::Arr(argument, result) = ty else {
                return Err(Fault::NotAFunctionType{ty: self.ty.clone(), n: args.len()});
            };
            argument.validate(arg)?;
            ty = result;
        }
        trampoline::finish(cx, "execute", self.call(cx, args))
    }
}
