//! Entry points for the host.

use {
    crate::{
        code::{Code, typing},
        config::Config,
        elaborate::{self, Context, FrameLayout},
        error::{Error, Fault},
        frame::Frame,
        syntax::term::Term,
        trampoline,
        types::Type,
        value::{Arguments, Value},
    },
    serde::Serialize,
    std::{
        fmt,
        io::{self, Write},
        sync::{Arc, Mutex, PoisonError, atomic::{AtomicU64, Ordering::Relaxed}},
    },
    tracing::debug,
};

/// Configuration, output and statistics shared by evaluations.
///
/// A runtime may be shared between threads.
/// Each evaluation allocates its own frames.
pub struct Runtime
{
    config: Config,
    stats: Stats,
    output: Mutex<Box<dyn Write + Send>>,
}

/// Counters describing the work done by a runtime.
#[derive(Default)]
pub struct Stats
{
    tail_calls: AtomicU64,
    dispatch_hits: AtomicU64,
    dispatch_misses: AtomicU64,
    call_site_rewrites: AtomicU64,
    max_depth: AtomicU64,
}

/// Point-in-time copy of [`Stats`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StatsSnapshot
{
    /// Calls performed by trampolines.
    pub tail_calls: u64,

    /// Calls that took a cached direct path.
    pub dispatch_hits: u64,

    /// Calls that found no matching cache entry.
    pub dispatch_misses: u64,

    /// Over-applied call sites that split themselves.
    pub call_site_rewrites: u64,

    /// Deepest nesting of entry point invocations on any thread.
    pub max_depth: u64,
}

/// Elaborated program, ready to run.
pub struct Program
{
    ty: Type,
    code: Code,
    frame_size: usize,
    slot_types: Vec<Type>,
    argument_types: Vec<Type>,
}

impl Runtime
{
    /// Create a runtime that writes output to standard output.
    pub fn new(config: Config) -> Self
    {
        Self{
            config,
            stats: Stats::default(),
            output: Mutex::new(Box::new(io::stdout())),
        }
    }

    /// Replace the output of the runtime.
    pub fn with_output(self, output: Box<dyn Write + Send>) -> Self
    {
        Self{output: Mutex::new(output), ..self}
    }

    /// The configuration the runtime was created with.
    pub fn config(&self) -> &Config
    {
        &self.config
    }

    /// The work done by the runtime so far.
    pub fn stats(&self) -> &Stats
    {
        &self.stats
    }

    pub(crate) fn write_output(&self, args: fmt::Arguments) -> Result<(), Fault>
    {
        let mut output = self.output.lock()
            .unwrap_or_else(PoisonError::into_inner);
        output.write_fmt(args)
            .and_then(|()| output.flush())
            .map_err(|err| Fault::Output(err.to_string()))
    }

    /// Elaborate a closed term.
    ///
    /// Free variables may only refer to builtins.
    /// Ill-typed terms are reported as [`Error::Type`].
    pub fn elaborate(&self, term: &Term) -> Result<Program, Error>
    {
        let context = Context::builtins();
        let layout = FrameLayout::new();
        self.elaborate_in(term, context, layout)
    }

    fn elaborate_in(&self, term: &Term, mut context: Context, mut layout: FrameLayout)
        -> Result<Program, Error>
    {
        let witness = elaborate::infer(term, &mut context)?;
        let tail = self.config.tail_calls;
        let code = witness.compile(&self.config, &mut layout, tail)?;
        debug!(ty = %witness.ty(), slots = layout.size(), "elaborated");
        Ok(Program{
            ty: witness.ty().clone(),
            code,
            frame_size: layout.size(),
            slot_types: layout.slot_types().to_vec(),
            argument_types: layout.argument_types().to_vec(),
        })
    }

    /// Elaborate and run a closed term.
    pub fn evaluate(&self, term: &Term) -> Result<Value, Error>
    {
        let program = self.elaborate(term)?;
        Ok(program.run(self)?)
    }

    /// Elaborate and run a term against ambient bindings.
    ///
    /// Each binding is validated against its type
    /// and passed to the program as a positional argument.
    pub fn evaluate_inline(&self, term: &Term, ambient: &[(Arc<str>, Type, Value)])
        -> Result<Value, Error>
    {
        let mut context = Context::builtins();
        for (name, ty, _) in ambient {
            context.push(name.clone(), ty.clone());
        }
        let layout = FrameLayout::with_arguments(
            ambient.iter().map(|(name, ty, _)| (name.clone(), ty.clone())),
        );
        let program = self.elaborate_in(term, context, layout)?;
        let args: Vec<Value> =
            ambient.iter().map(|(_, _, value)| value.clone()).collect();
        Ok(program.run_with_arguments(self, &args)?)
    }
}

impl Stats
{
    /// Copy the current values of the counters.
    pub fn snapshot(&self) -> StatsSnapshot
    {
        StatsSnapshot{
            tail_calls: self.tail_calls.load(Relaxed),
            dispatch_hits: self.dispatch_hits.load(Relaxed),
            dispatch_misses: self.dispatch_misses.load(Relaxed),
            call_site_rewrites: self.call_site_rewrites.load(Relaxed),
            max_depth: self.max_depth.load(Relaxed),
        }
    }

    pub(crate) fn record_tail_call(&self)
    {
        self.tail_calls.fetch_add(1, Relaxed);
    }

    pub(crate) fn record_dispatch_hit(&self)
    {
        self.dispatch_hits.fetch_add(1, Relaxed);
    }

    pub(crate) fn record_dispatch_miss(&self)
    {
        self.dispatch_misses.fetch_add(1, Relaxed);
    }

    pub(crate) fn record_rewrite(&self)
    {
        self.call_site_rewrites.fetch_add(1, Relaxed);
    }

    pub(crate) fn record_depth(&self, depth: u64)
    {
        self.max_depth.fetch_max(depth, Relaxed);
    }
}

impl Program
{
    /// The type of the result of the program.
    pub fn ty(&self) -> &Type
    {
        &self.ty
    }

    /// The compiled program.
    pub fn code(&self) -> &Code
    {
        &self.code
    }

    /// The types of the arguments the program expects.
    pub fn argument_types(&self) -> &[Type]
    {
        &self.argument_types
    }

    /// Recover the type of the program from its compiled form alone.
    pub fn recover_type(&self) -> Option<Type>
    {
        typing::recover_type(&self.code, &self.slot_types, &self.argument_types)
    }

    /// Run a program that expects no arguments.
    pub fn run(&self, cx: &Runtime) -> Result<Value, Fault>
    {
        self.run_with_arguments(cx, &[])
    }

    /// Run the program.
    ///
    /// The arguments are validated against [`argument_types`].
    ///
    /// [`argument_types`]: `Self::argument_types`
    pub fn run_with_arguments(&self, cx: &Runtime, args: &[Value])
        -> Result<Value, Fault>
    {
        if args.len() != self.argument_types.len() {
            let expected = self.argument_types.len();
            return Err(Fault::Arity{expected, actual: args.len()});
        }
        for (ty, arg) in self.argument_types.iter().zip(args) {
            ty.validate(arg)?;
        }
        let mut frame = Frame::new(self.frame_size, Arguments::from(args));
        let result = self.code.execute_any(cx, &mut frame);
        trampoline::finish(cx, "program", result)
    }
}
