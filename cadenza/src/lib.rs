//! Execution core for the Cadenza language.
//!
//! Terms are elaborated by a bidirectional type checker into [`Code`] trees.
//! Code is evaluated against per-activation [`Frame`]s.
//! Evaluation supports partial application, tail calls in constant stack,
//! and _stuck_ computations that become first-class [neutral values].
//!
//! [`Code`]: `code::Code`
//! [`Frame`]: `frame::Frame`
//! [neutral values]: `value::NeutralValue`

#![warn(missing_docs)]

pub use self::{
    config::{Config, ConfigError},
    error::{Error, Fault},
    runtime::{Program, Runtime, Stats, StatsSnapshot},
    types::Type,
    value::{NeutralValue, Value},
};

pub mod builtin;
pub mod closure;
pub mod code;
pub mod config;
pub mod dispatch;
pub mod elaborate;
pub mod error;
pub mod frame;
pub mod neutral;
pub mod runtime;
pub mod syntax;
pub mod trampoline;
pub mod types;
pub mod value;

#[cfg(test)]
mod tests
{
    use {
        crate::{
            closure::EntryBody,
            code::Code,
            neutral::Neutral,
            syntax::term::{self as t, Term},
            *,
        },
        num_bigint::BigUint,
        std::{sync::{Arc, Mutex}, thread},
    };

    fn nat() -> Type
    {
        Type::Nat
    }

    fn evaluate(term: &Term) -> Value
    {
        Runtime::new(Config::default()).evaluate(term).unwrap()
    }

    /// `fixNatF (\f x -> if le limit x then x else f (plus x 1)) 0`
    fn count_to(limit: i64) -> Term
    {
        let natf = Type::arr(nat(), nat());
        t::app(t::var("fixNatF"), [
            t::lam([("f", natf), ("x", nat())],
                t::if_(
                    t::app(t::var("le"), [t::nat(limit), t::var("x")]),
                    t::var("x"),
                    t::app(t::var("f"), [
                        t::app(t::var("plus"), [t::var("x"), t::nat(1)]),
                    ]),
                ),
            ),
            t::nat(0),
        ])
    }

    #[test]
    fn identity()
    {
        let term = t::app(t::lam([("x", nat())], t::var("x")), [t::nat(5)]);
        assert_eq!(evaluate(&term), Value::Integer(5));
    }

    #[test]
    fn if_literal()
    {
        let term = t::if_(t::boolean(true), t::nat(1), t::nat(2));
        let runtime = Runtime::new(Config::default());
        let program = runtime.elaborate(&term).unwrap();
        assert_eq!(program.ty(), &Type::Nat);
        assert_eq!(program.run(&runtime).unwrap(), Value::Integer(1));
    }

    #[test]
    fn builtin_plus()
    {
        let term = t::app(t::var("plus"), [t::nat(3), t::nat(4)]);
        assert_eq!(evaluate(&term), Value::Integer(7));
    }

    #[test]
    fn builtin_plus_stuck()
    {
        let runtime = Runtime::new(Config::default());
        let stuck = Value::symbolic("n", Type::Nat);
        let term = t::app(t::var("plus"), [t::var("n"), t::nat(4)]);
        let result = runtime.evaluate_inline(
            &term,
            &[("n".into(), Type::Nat, stuck.clone())],
        ).unwrap();
        let Value::Neutral(result) = result else {
            panic!("Expected a neutral value, got {result:?}");
        };
        assert_eq!(result.ty(), &Type::Nat);
        assert_eq!(
            **result.term(),
            Neutral::CallBuiltin(
                builtin::Builtin::Plus,
                vec![stuck, Value::Integer(4)],
            ),
        );
    }

    #[test]
    fn fix_counts_to_a_thousand()
    {
        assert_eq!(evaluate(&count_to(1000)), Value::Integer(1000));
    }

    #[test]
    fn fix_runs_in_constant_stack()
    {
        let runtime = Runtime::new(Config::default());
        let result = runtime.evaluate(&count_to(1_000_000)).unwrap();
        assert_eq!(result, Value::Integer(1_000_000));

        let stats = runtime.stats().snapshot();
        assert!(stats.tail_calls >= 1_000_000, "{stats:?}");
        assert!(stats.max_depth <= 8, "{stats:?}");
    }

    #[test]
    fn tail_call_limit()
    {
        let config = Config{tail_call_limit: Some(100), ..Config::default()};
        let runtime = Runtime::new(config);
        let result = runtime.evaluate(&count_to(1000));
        assert!(
            matches!(result, Err(Error::Fault(Fault::TailCallLimit(100)))),
            "{result:?}",
        );
    }

    #[test]
    fn without_tail_calls_the_stack_grows()
    {
        let config = Config{tail_calls: false, ..Config::default()};
        let runtime = Runtime::new(config);
        let result = runtime.evaluate(&count_to(20)).unwrap();
        assert_eq!(result, Value::Integer(20));
        let stats = runtime.stats().snapshot();
        assert!(stats.max_depth > 20, "{stats:?}");
        assert_eq!(stats.tail_calls, 0, "{stats:?}");
    }

    #[test]
    fn over_application_splits_and_chains()
    {
        // (\(x : Nat) (y : Nat) -> \(z : Nat) -> plus x (mult y z)) 1 2 3
        let body = t::lam([("z", nat())],
            t::app(t::var("plus"), [
                t::var("x"),
                t::app(t::var("mult"), [t::var("y"), t::var("z")]),
            ]),
        );
        let f = t::lam([("x", nat()), ("y", nat())], body);
        let all = t::app(f.clone(), [t::nat(1), t::nat(2), t::nat(3)]);
        let nested = t::app(t::app(f, [t::nat(1), t::nat(2)]), [t::nat(3)]);

        let runtime = Runtime::new(Config::default());
        let program = runtime.elaborate(&all).unwrap();
        assert_eq!(program.run(&runtime).unwrap(), Value::Integer(7));
        assert_eq!(program.run(&runtime).unwrap(), Value::Integer(7));
        assert_eq!(runtime.stats().snapshot().call_site_rewrites, 1);

        assert_eq!(evaluate(&nested), Value::Integer(7));
    }

    #[test]
    fn captured_variables()
    {
        // let k = 10 in (\(x : Nat) -> plus x k) 5
        let term = t::let_("k", t::nat(10),
            t::app(
                t::lam([("x", nat())],
                    t::app(t::var("plus"), [t::var("x"), t::var("k")])),
                [t::nat(5)],
            ),
        );
        assert_eq!(evaluate(&term), Value::Integer(15));
    }

    #[test]
    fn stuck_condition_evaluates_both_branches()
    {
        let runtime = Runtime::new(Config::default());
        let b = Value::symbolic("b", Type::Bool);
        let term = t::if_(t::var("b"), t::nat(1), t::nat(2));
        let result = runtime.evaluate_inline(
            &term,
            &[("b".into(), Type::Bool, b)],
        ).unwrap();
        let Value::Neutral(result) = result else {
            panic!("Expected a neutral value, got {result:?}");
        };
        assert_eq!(result.ty(), &Type::Nat);
        assert_eq!(
            **result.term(),
            Neutral::If(
                Arc::new(Neutral::Var("b".into())),
                Value::Integer(1),
                Value::Integer(2),
            ),
        );
    }

    #[test]
    fn print_id_writes_to_output()
    {
        #[derive(Clone, Default)]
        struct Sink(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Sink
        {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize>
            {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()>
            {
                Ok(())
            }
        }

        let sink = Sink::default();
        let runtime = Runtime::new(Config::default())
            .with_output(Box::new(sink.clone()));
        let term = t::app(t::var("printId"), [t::nat(42)]);
        assert_eq!(runtime.evaluate(&term).unwrap(), Value::Integer(42));
        assert_eq!(&*sink.0.lock().unwrap(), b"42\n");
    }

    #[test]
    fn ill_typed_programs_are_rejected()
    {
        let runtime = Runtime::new(Config::default());
        let term = t::if_(t::nat(1), t::nat(1), t::nat(2));
        let result = runtime.evaluate(&term);
        assert!(matches!(result, Err(Error::Type(_))), "{result:?}");
    }

    #[test]
    fn naturals_do_not_overflow()
    {
        let two_32 = t::nat(1 << 32);
        let term = t::app(t::var("mult"), [two_32.clone(), two_32]);
        let result = evaluate(&term);
        assert_eq!(result.to_biguint(), Some(BigUint::from(1u32) << 64usize));

        // Back below the small limit after the big intermediate.
        let term = t::app(t::var("div"), [term, t::nat(1 << 32)]);
        assert_eq!(evaluate(&term), Value::Integer(1 << 32));
    }

    #[test]
    fn programs_are_shared_between_threads()
    {
        const THREADS: u64 = 4;
        const LIMIT: i64 = 10_000;

        let runtime = Arc::new(Runtime::new(Config::default()));
        let program = Arc::new(runtime.elaborate(&count_to(LIMIT)).unwrap());

        let handles: Vec<_> = (0 .. THREADS)
            .map(|_| {
                let runtime = runtime.clone();
                let program = program.clone();
                thread::spawn(move || program.run(&runtime))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), Value::Integer(LIMIT));
        }

        // Every thread calls `f` from the same call site.
        let Code::CallBuiltin(fix) = program.code() else {
            panic!("Expected a builtin call");
        };
        let Code::Lam(lam) = &*fix.args[0] else {
            panic!("Expected a lambda");
        };
        let EntryBody::Closure(root) = lam.target.body() else {
            panic!("Expected a closure body");
        };
        let Code::If(body) = &root.body else {
            panic!("Expected a conditional");
        };
        let Code::App(call) = &*body.else_branch else {
            panic!("Expected an application");
        };
        assert_eq!(call.dispatch().len(), 1);
        assert!(!call.dispatch().is_megamorphic());

        // Racing threads may each miss once, then all of them hit.
        let stats = runtime.stats().snapshot();
        assert_eq!(stats.dispatch_hits + stats.dispatch_misses, THREADS * LIMIT as u64);
        assert!((1 ..= THREADS).contains(&stats.dispatch_misses), "{stats:?}");
        assert!(stats.max_depth <= 8, "{stats:?}");
    }
}
