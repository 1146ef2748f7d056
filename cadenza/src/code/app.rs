use {
    super::{Code, Exec, Interrupt},
    crate::{
        dispatch::Dispatch,
        error::Fault,
        frame::Frame,
        runtime::Runtime,
        value::{Arguments, Value},
    },
    std::sync::{Arc, OnceLock},
    tracing::debug,
};

/// See [`Code::App`].
///
/// When the callee takes fewer arguments than the call site passes,
/// the node rewrites itself into a nested application
/// that applies the callee to exactly as many arguments as it takes,
/// and the result to the remaining ones.
/// Later evaluations use the rewritten tree.
pub struct App
{
    operator: Arc<Code>,
    operands: Vec<Arc<Code>>,
    tail: bool,
    dispatch: Dispatch,
    rewritten: OnceLock<Box<Code>>,
}

impl App
{
    /// Create an application node.
    ///
    /// If `tail` is set, calls with exactly the right number of arguments
    /// are performed by the enclosing trampoline.
    pub fn new(operator: Arc<Code>, operands: Vec<Arc<Code>>, tail: bool)
        -> Self
    {
        let dispatch = Dispatch::new(operands.len(), tail);
        Self{operator, operands, tail, dispatch, rewritten: OnceLock::new()}
    }

    /// The operator.
    pub fn operator(&self) -> &Code
    {
        &self.operator
    }

    /// The operands.
    pub fn operands(&self) -> impl Iterator<Item=&Code>
    {
        self.operands.iter().map(|operand| &**operand)
    }

    /// Whether the call is in tail position.
    pub fn is_tail(&self) -> bool
    {
        self.tail
    }

    /// The call site cache.
    pub fn dispatch(&self) -> &Dispatch
    {
        &self.dispatch
    }

    /// Whether the node has rewritten itself.
    pub fn is_rewritten(&self) -> bool
    {
        self.rewritten.get().is_some()
    }

    pub(super) fn evaluate(&self, cx: &Runtime, frame: &mut Frame)
        -> Exec<Value>
    {
        if let Some(rewritten) = self.rewritten.get() {
            return rewritten.evaluate(cx, frame);
        }

        let callee = match self.operator.execute_closure(cx, frame) {
            Ok(callee) => callee,
            Err(Interrupt::Neutral(signal)) => {
                let args = self.evaluate_operands(cx, frame)?;
                return Err(Interrupt::Neutral(signal.apply(&args)?));
            },
            Err(Interrupt::Unexpected(value)) =>
                return Err(Fault::NotAClosure{node: "App", value}.into()),
            Err(other) =>
                return Err(other),
        };

        let args = self.evaluate_operands(cx, frame)?;

        if callee.arity() < args.len() {
            self.rewrite(cx, callee.arity());
            return if self.tail {
                callee.tail_call(cx, &args)
            } else {
                callee.call(cx, &args)
            };
        }

        self.dispatch.call(cx, &callee, args)
    }

    fn evaluate_operands(&self, cx: &Runtime, frame: &mut Frame)
        -> Exec<Arguments>
    {
        self.operands.iter()
            .map(|operand| operand.execute_any(cx, frame))
            .collect()
    }

    /// Split the call site at `arity`.
    ///
    /// Concurrent rewrites produce equivalent trees; the first one wins.
    fn rewrite(&self, cx: &Runtime, arity: usize)
    {
        let (now, later) = self.operands.split_at(arity);
        let inner = Self::new(self.operator.clone(), now.to_vec(), false);
        let outer = Self::new(Arc::new(Code::App(inner)), later.to_vec(), self.tail);
        if self.rewritten.set(Box::new(Code::App(outer))).is_ok() {
            debug!(arity, operands = self.operands.len(), "call site rewritten");
            cx.stats().record_rewrite();
        }
    }
}
