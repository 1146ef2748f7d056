//! Tail calls in constant native stack.
//!
//! A call in tail position does not invoke its target.
//! It returns [`Interrupt::TailCall`] instead, which unwinds
//! to the nearest trampoline. The trampoline performs the call
//! and repeats for as long as the result is another tail call.

use {
    crate::{
        closure::EntryPoint,
        code::{Exec, Interrupt},
        error::Fault,
        frame::Frame,
        runtime::Runtime,
        value::{Arguments, Value},
    },
    std::{fmt, sync::Arc},
    tracing::trace,
};

/// Pending call of an entry point.
pub struct TailCall
{
    /// The entry point to invoke.
    pub target: Arc<EntryPoint>,

    /// The capture frame, for supercombinators.
    pub env: Option<Arc<Frame>>,

    /// All arguments, including any partially applied ones.
    pub args: Arguments,
}

impl fmt::Debug for TailCall
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        // We explicitly *do not* want to use f.debug_struct,
        // as the entry point contains the entire compiled body.
        write!(f, "TailCall(/{}, {:?})", self.target.arity(), self.args)
    }
}

/// Invoke an entry point and perform any resulting tail calls.
pub fn call(
    cx: &Runtime,
    target: &Arc<EntryPoint>,
    env: Option<&Arc<Frame>>,
    args: Arguments,
) -> Exec<Value>
{
    settle(cx, target.invoke(cx, env, args))
}

/// Perform tail calls until the result is not a tail call.
pub fn settle(cx: &Runtime, mut result: Exec<Value>) -> Exec<Value>
{
    let limit = cx.config().tail_call_limit;
    let mut bounces: u64 = 0;
    loop {
        match result {
            Err(Interrupt::TailCall(TailCall{target, env, args})) => {
                bounces += 1;
                cx.stats().record_tail_call();
                if let Some(limit) = limit {
                    if bounces > limit {
                        return Err(Fault::TailCallLimit(limit).into());
                    }
                }
                result = target.invoke(cx, env.as_ref(), args);
            },
            other => {
                if bounces != 0 {
                    trace!(bounces, "trampoline settled");
                }
                return other;
            },
        }
    }
}

/// Settle a result at a boundary where it must become a plain value.
///
/// Stuck computations become neutral values.
/// Unexpected results are faults attributed to `node`.
pub fn finish(cx: &Runtime, node: &'static str, result: Exec<Value>)
    -> Result<Value, Fault>
{
    match settle(cx, result) {
        Ok(value) => Ok(value),
        Err(Interrupt::Neutral(signal)) => Ok(signal.into_value()),
        Err(Interrupt::Unexpected(value)) =>
            Err(Fault::UnexpectedResult{node, value}),
        Err(Interrupt::Fault(fault)) => Err(fault),
        Err(Interrupt::TailCall(_)) =>
            unreachable!("settle never returns a tail call"),
    }
}
