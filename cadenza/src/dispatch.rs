//! Call site caches.
//!
//! Each application node owns a [`Dispatch`].
//! It remembers the shapes of the closures called there,
//! keyed on entry point identity, the number of partially applied
//! arguments and the presence of a capture frame.
//! A call matching a remembered shape is performed directly.
//! When too many shapes are seen, the call site goes _megamorphic_
//! and every call takes the indirect path of [`Closure::call`].
//!
//! Caching never changes the result of a call.
//! Entries are installed by whichever thread gets there first;
//! a thread that loses the race simply uses its own result.

use {
    crate::{
        closure::{Closure, EntryPoint},
        code::{Exec, Interrupt},
        runtime::Runtime,
        trampoline::{self, TailCall},
        value::{Arguments, Value},
    },
    std::sync::{Arc, OnceLock, atomic::{AtomicBool, Ordering::Relaxed}},
    tracing::{debug, trace},
};

/// Number of shapes remembered per call site.
pub const CACHE_SIZE: usize = 3;

/// Cache for a single call site.
pub struct Dispatch
{
    args_size: usize,
    tail: bool,
    entries: [OnceLock<CacheEntry>; CACHE_SIZE],
    megamorphic: AtomicBool,
}

/// Shape of a closure seen at a call site.
struct CacheEntry
{
    target: Arc<EntryPoint>,
    pap_len: usize,
    has_env: bool,
}

impl CacheEntry
{
    fn of(closure: &Closure) -> Self
    {
        Self{
            target: closure.target().clone(),
            pap_len: closure.pap_args().len(),
            has_env: closure.env().is_some(),
        }
    }

    fn matches(&self, closure: &Closure) -> bool
    {
        Arc::ptr_eq(&self.target, closure.target())
            && self.pap_len == closure.pap_args().len()
            && self.has_env == closure.env().is_some()
    }
}

impl Dispatch
{
    /// Create an empty cache for a call site
    /// that passes `args_size` arguments.
    pub fn new(args_size: usize, tail: bool) -> Self
    {
        Self{
            args_size,
            tail,
            entries: Default::default(),
            megamorphic: AtomicBool::new(false),
        }
    }

    /// The number of shapes remembered so far.
    pub fn len(&self) -> usize
    {
        self.entries.iter().filter(|entry| entry.get().is_some()).count()
    }

    /// Whether no shape has been remembered yet.
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// Whether the call site has seen too many shapes.
    pub fn is_megamorphic(&self) -> bool
    {
        self.megamorphic.load(Relaxed)
    }

    /// Call a closure that takes at least as many arguments as given.
    pub fn call(&self, cx: &Runtime, callee: &Arc<Closure>, args: Arguments)
        -> Exec<Value>
    {
        debug_assert_eq!(args.len(), self.args_size);

        // Partial applications are cheap and not worth caching.
        if args.len() < callee.arity() {
            return Ok(Value::Closure(Arc::new(callee.pap(&args)?)));
        }

        if !cx.config().dispatch_cache || self.is_megamorphic() {
            return self.indirect(cx, callee, &args);
        }

        for entry in &self.entries {
            match entry.get() {
                Some(cached) if cached.matches(callee) => {
                    cx.stats().record_dispatch_hit();
                    return self.direct(cx, cached, callee, &args);
                },
                Some(_) => continue,
                None => (),
            }
            // A racing thread may install another shape in this entry.
            let _ = entry.set(CacheEntry::of(callee));
            if let Some(cached) = entry.get().filter(|e| e.matches(callee)) {
                trace!(arity = callee.arity(), "dispatch entry installed");
                cx.stats().record_dispatch_miss();
                return self.direct(cx, cached, callee, &args);
            }
        }

        if !self.megamorphic.swap(true, Relaxed) {
            debug!(entries = CACHE_SIZE, "call site went megamorphic");
        }
        cx.stats().record_dispatch_miss();
        self.indirect(cx, callee, &args)
    }

    /// Invoke the cached entry point with the callee's environment.
    fn direct(
        &self,
        cx: &Runtime,
        cached: &CacheEntry,
        callee: &Closure,
        args: &[Value],
    ) -> Exec<Value>
    {
        let target = &cached.target;
        let args = callee.saturate(args);
        if self.tail {
            let env = callee.env().cloned();
            Err(Interrupt::TailCall(TailCall{target: target.clone(), env, args}))
        } else {
            trampoline::call(cx, target, callee.env(), args)
        }
    }

    fn indirect(&self, cx: &Runtime, callee: &Closure, args: &[Value])
        -> Exec<Value>
    {
        if self.tail {
            callee.tail_call(cx, args)
        } else {
            callee.call(cx, args)
        }
    }
}
