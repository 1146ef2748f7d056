//! Bidirectional elaboration of terms into code.
//!
//! [`infer`] and [`check`] produce a [`Witness`]:
//! the type of a term together with the means to compile it.
//! Compilation resolves names to frame slots and arguments,
//! and converts lambdas into closures that capture
//! exactly the variables they use from outside.

use {
    crate::{
        builtin::Builtin,
        closure::{ClosureRoot, EntryPoint},
        code::{App, CallBuiltin, Capture, Code, If, Lam, Let},
        config::Config,
        error::Fault,
        syntax::term::Term,
        types::Type,
        value::Value,
    },
    std::{collections::BTreeMap, sync::Arc},
};

pub use self::{
    context::{Context, NameInfo},
    error::TypeError,
    layout::{Binding, FrameLayout},
};

mod context;
mod error;
mod layout;

/// Elaborated term.
///
/// Witnesses only exist during elaboration.
#[derive(Debug)]
pub struct Witness
{
    ty: Type,
    node: Node,
}

#[derive(Debug)]
enum Node
{
    Var{name: Arc<str>, builtin: Option<Builtin>},
    If{condition: Box<Witness>, then_branch: Box<Witness>, else_branch: Box<Witness>},
    App{operator: Box<Witness>, operands: Vec<Witness>},
    Lam{parameters: Vec<(Arc<str>, Type)>, body: Box<Witness>},
    Let{name: Arc<str>, value: Box<Witness>, body: Box<Witness>},
    Lit(Value),
}

/* -------------------------------------------------------------------------- */
/*                                  Inference                                 */
/* -------------------------------------------------------------------------- */

/// Infer the type of a term.
pub fn infer(term: &Term, context: &mut Context) -> Result<Witness, TypeError>
{
    match term {

        Term::Var{name, location} => {
            let info = context.lookup(name)
                .ok_or_else(|| TypeError::UnknownVariable{
                    name: name.clone(),
                    location: *location,
                })?;
            let node = Node::Var{name: name.clone(), builtin: info.builtin};
            Ok(Witness{ty: info.ty.clone(), node})
        },

        Term::If{condition, then_branch, else_branch, ..} => {
            let condition = check(condition, context, &Type::Bool)?;
            let then_branch = infer(then_branch, context)?;
            let else_branch = check(else_branch, context, &then_branch.ty)?;
            Ok(Witness{
                ty: then_branch.ty.clone(),
                node: Node::If{
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                },
            })
        },

        Term::App{operator, operands, location} => {
            let operator = infer(operator, context)?;
            if operands.is_empty() {
                return Ok(operator);
            }

            let mut ty = operator.ty.clone();
            let mut checked = Vec::with_capacity(operands.len());
            for operand in operands {
                let Type::Arr(argument, result) = &ty else {
                    let actual = ty.clone();
                    return Err(TypeError::NotAFunction{actual, location: *location});
                };
                checked.push(check(operand, context, argument)?);
                ty = Type::clone(result);
            }

            let node = Node::App{operator: Box::new(operator), operands: checked};
            Ok(Witness{ty, node})
        },

        Term::Lam{parameters, body, ..} => {
            if parameters.is_empty() {
                return infer(body, context);
            }
            let body = context.with_bindings(parameters, |context| infer(body, context))?;
            let ty = parameters.iter().rev()
                .fold(body.ty.clone(), |result, (_, argument)| {
                    Type::arr(argument.clone(), result)
                });
            let node = Node::Lam{parameters: parameters.clone(), body: Box::new(body)};
            Ok(Witness{ty, node})
        },

        Term::Let{name, value, body, ..} => {
            let value = infer(value, context)?;
            let binding = [(name.clone(), value.ty.clone())];
            let body = context.with_bindings(&binding, |context| infer(body, context))?;
            Ok(Witness{
                ty: body.ty.clone(),
                node: Node::Let{
                    name: name.clone(),
                    value: Box::new(value),
                    body: Box::new(body),
                },
            })
        },

        Term::Nat{value, location} => {
            let value = Value::Integer(*value);
            Type::Nat.validate(&value)
                .map_err(|source| TypeError::InvalidLiteral{source, location: *location})?;
            Ok(Witness{ty: Type::Nat, node: Node::Lit(value)})
        },

        Term::Bool{value, ..} =>
            Ok(Witness{ty: Type::Bool, node: Node::Lit(Value::Boolean(*value))}),

        Term::Unit{..} =>
            Ok(Witness{ty: Type::Unit, node: Node::Lit(Value::Unit)}),

    }
}

/// Check a term against an expected type.
///
/// There is no subtyping; the inferred type must be the expected one.
pub fn check(term: &Term, context: &mut Context, expected: &Type)
    -> Result<Witness, TypeError>
{
    let witness = infer(term, context)?;
    if &witness.ty == expected {
        Ok(witness)
    } else {
        Err(TypeError::TypeMismatch{
            actual: witness.ty,
            expected: expected.clone(),
            location: term.location(),
        })
    }
}

/* -------------------------------------------------------------------------- */
/*                                 Compilation                                */
/* -------------------------------------------------------------------------- */

impl Witness
{
    /// The type of the term.
    pub fn ty(&self) -> &Type
    {
        &self.ty
    }

    /// The locals the term uses but does not bind, with their types.
    ///
    /// References to builtins are not included.
    pub fn free_variables(&self) -> BTreeMap<Arc<str>, Type>
    {
        let mut bound = Vec::new();
        let mut free = BTreeMap::new();
        self.collect_free_variables(&mut bound, &mut free);
        free
    }

    fn collect_free_variables(
        &self,
        bound: &mut Vec<Arc<str>>,
        free: &mut BTreeMap<Arc<str>, Type>,
    )
    {
        match &self.node {
            Node::Var{name, builtin: None} => {
                if !bound.contains(name) {
                    free.entry(name.clone()).or_insert_with(|| self.ty.clone());
                }
            },
            Node::Var{builtin: Some(_), ..} | Node::Lit(_) => (),
            Node::If{condition, then_branch, else_branch} => {
                condition.collect_free_variables(bound, free);
                then_branch.collect_free_variables(bound, free);
                else_branch.collect_free_variables(bound, free);
            },
            Node::App{operator, operands} => {
                operator.collect_free_variables(bound, free);
                for operand in operands {
                    operand.collect_free_variables(bound, free);
                }
            },
            Node::Lam{parameters, body} => {
                let len = bound.len();
                bound.extend(parameters.iter().map(|(name, _)| name.clone()));
                body.collect_free_variables(bound, free);
                bound.truncate(len);
            },
            Node::Let{name, value, body} => {
                value.collect_free_variables(bound, free);
                bound.push(name.clone());
                body.collect_free_variables(bound, free);
                bound.pop();
            },
        }
    }

    /// Compile the term against a frame layout.
    ///
    /// Calls in tail position are compiled as tail calls if `tail` is set.
    /// Every local the term uses must be bound in the layout.
    pub fn compile(&self, config: &Config, layout: &mut FrameLayout, tail: bool)
        -> Result<Code, Fault>
    {
        let compile_arc = |witness: &Witness, layout: &mut FrameLayout| {
            witness.compile(config, layout, false).map(Arc::new)
        };

        match &self.node {

            Node::Var{builtin: Some(builtin), ..} =>
                Ok(Code::Lam(Lam{
                    env_size: None,
                    captures: Vec::new(),
                    target: builtin.entry_point(),
                    ty: self.ty.clone(),
                })),

            Node::Var{name, builtin: None} =>
                match layout.lookup(name) {
                    Some(Binding::Slot(slot)) => Ok(Code::Var(slot)),
                    Some(Binding::Arg(index)) => Ok(Code::Arg(index)),
                    None => Err(Fault::UnboundName(name.clone())),
                },

            Node::If{condition, then_branch, else_branch} =>
                Ok(Code::If(If{
                    ty: self.ty.clone(),
                    condition: compile_arc(condition, layout)?,
                    then_branch: Arc::new(then_branch.compile(config, layout, tail)?),
                    else_branch: Arc::new(else_branch.compile(config, layout, tail)?),
                })),

            Node::App{operator, operands} => {
                let operands = operands.iter()
                    .map(|operand| compile_arc(operand, layout))
                    .collect::<Result<Vec<_>, _>>()?;

                if let Node::Var{builtin: Some(builtin), ..} = operator.node {
                    if operands.len() == builtin.arity() {
                        let ty = self.ty.clone();
                        let args = operands;
                        return Ok(Code::CallBuiltin(CallBuiltin{ty, builtin, args, tail}));
                    }
                }

                let operator = compile_arc(operator, layout)?;
                Ok(Code::App(App::new(operator, operands, tail)))
            },

            Node::Lam{parameters, body} =>
                self.compile_lambda(config, layout, parameters, body),

            Node::Let{name, value, body} => {
                let ty = value.ty.clone();
                let value = compile_arc(value, layout)?;
                layout.with_slot(name.clone(), ty, |layout, slot| {
                    let body = Arc::new(body.compile(config, layout, tail)?);
                    Ok(Code::Let(Let{slot, value, body}))
                })
            },

            Node::Lit(value) =>
                Ok(Code::Lit(value.clone())),

        }
    }

    /// Convert a lambda into a closure.
    ///
    /// Free variables are copied from the enclosing activation
    /// into a capture frame when the closure is created,
    /// and from there into the frame of each activation of the body.
    /// Parameters are copied from the arguments.
    fn compile_lambda(
        &self,
        config: &Config,
        layout: &FrameLayout,
        parameters: &[(Arc<str>, Type)],
        body: &Witness,
    ) -> Result<Code, Fault>
    {
        let free = self.free_variables();

        let mut inner = FrameLayout::new();
        let mut captures = Vec::with_capacity(free.len());
        let mut env_preamble = Vec::with_capacity(free.len());
        for (env_slot, (name, ty)) in free.iter().enumerate() {
            let capture = match layout.lookup(name) {
                Some(Binding::Slot(slot)) => Capture::Slot(slot),
                Some(Binding::Arg(index)) => Capture::Arg(index),
                None => return Err(Fault::UnboundName(name.clone())),
            };
            captures.push((env_slot, capture));
            let slot = inner.bind(name.clone(), ty.clone());
            env_preamble.push((slot, env_slot));
        }

        let mut arg_preamble = Vec::with_capacity(parameters.len());
        for (index, (name, ty)) in parameters.iter().enumerate() {
            let slot = inner.bind(name.clone(), ty.clone());
            arg_preamble.push((slot, index));
        }

        let body = body.compile(config, &mut inner, config.tail_calls)?;
        let root = ClosureRoot{
            frame_size: inner.size(),
            slot_types: inner.slot_types().to_vec(),
            env_preamble,
            arg_preamble,
            body,
        };

        Ok(Code::Lam(Lam{
            env_size: if free.is_empty() { None } else { Some(free.len()) },
            captures,
            target: Arc::new(EntryPoint::closure(parameters.len(), root)),
            ty: self.ty.clone(),
        }))
    }
}

#[cfg(test)]
mod tests
{
    use {
        super::*,
        crate::{
            closure::EntryBody,
            runtime::Runtime,
            syntax::{location::Location, term as t},
        },
        proptest::prelude::*,
    };

    fn infer_closed(term: &Term) -> Result<Witness, TypeError>
    {
        infer(term, &mut Context::builtins())
    }

    fn compile_closed(term: &Term) -> Code
    {
        let witness = infer_closed(term).unwrap();
        let config = Config::default();
        witness.compile(&config, &mut FrameLayout::new(), true).unwrap()
    }

    #[test]
    fn unknown_variable()
    {
        let term = t::var("x").at(Location::new(4, 1));
        let err = infer_closed(&term).unwrap_err();
        assert!(matches!(&err, TypeError::UnknownVariable{name, ..} if &**name == "x"));
        assert_eq!(err.location(), Location::new(4, 1));
        assert_eq!(err.actual(), None);
    }

    #[test]
    fn not_a_function()
    {
        let term = t::app(t::nat(1), [t::nat(2)]).at(Location::new(9, 1));
        let err = infer_closed(&term).unwrap_err();
        assert!(matches!(err, TypeError::NotAFunction{..}));
        assert_eq!(err.actual(), Some(&Type::Nat));
        assert_eq!(err.location(), Location::new(9, 1));

        let term = t::app(t::var("plus"), [t::nat(1), t::nat(2), t::nat(3)]);
        assert!(matches!(
            infer_closed(&term),
            Err(TypeError::NotAFunction{actual: Type::Nat, ..}),
        ));
    }

    #[test]
    fn type_mismatch()
    {
        let term = t::if_(
            t::boolean(true),
            t::nat(1),
            t::boolean(false).at(Location::new(20, 1)),
        );
        let err = infer_closed(&term).unwrap_err();
        assert_eq!(err.actual(), Some(&Type::Bool));
        assert_eq!(err.expected(), Some(&Type::Nat));
        assert_eq!(err.location(), Location::new(20, 1));
    }

    #[test]
    fn invalid_literal()
    {
        let err = infer_closed(&t::nat(-1)).unwrap_err();
        assert!(matches!(err, TypeError::InvalidLiteral{..}));
        assert_eq!(err.expected(), Some(&Type::Nat));
    }

    #[test]
    fn lambda_types()
    {
        let term = t::lam([("x", Type::Nat), ("b", Type::Bool)], t::var("b"));
        let witness = infer_closed(&term).unwrap();
        assert_eq!(witness.ty(), &Type::arr(Type::Nat, Type::arr(Type::Bool, Type::Bool)));

        let empty = t::lam::<&str, _>([], t::nat(1));
        assert_eq!(infer_closed(&empty).unwrap().ty(), &Type::Nat);
    }

    #[test]
    fn free_variables()
    {
        // \(x : Nat) -> let y = plus x k in \(z : Nat) -> plus y (plus z j)
        let inner = t::lam([("z", Type::Nat)],
            t::app(t::var("plus"), [
                t::var("y"),
                t::app(t::var("plus"), [t::var("z"), t::var("j")]),
            ]));
        let term = t::lam([("x", Type::Nat)],
            t::let_("y", t::app(t::var("plus"), [t::var("x"), t::var("k")]), inner));

        let mut context = Context::builtins();
        context.push("k".into(), Type::Nat);
        context.push("j".into(), Type::Nat);
        let witness = infer(&term, &mut context).unwrap();

        let free: Vec<_> = witness.free_variables().into_keys().collect();
        assert_eq!(free, [Arc::<str>::from("j"), Arc::from("k")]);
    }

    #[test]
    fn closure_conversion()
    {
        // let k = 1 in \(x : Nat) -> plus x k
        let term = t::let_("k", t::nat(1),
            t::lam([("x", Type::Nat)], t::app(t::var("plus"), [t::var("x"), t::var("k")])));
        let Code::Let(Let{slot: 0, body, ..}) = compile_closed(&term) else {
            panic!("Expected a let");
        };
        let Code::Lam(lam) = &*body else {
            panic!("Expected a lambda");
        };
        assert_eq!(lam.env_size, Some(1));
        assert_eq!(lam.captures, [(0, Capture::Slot(0))]);
        assert!(lam.target.is_super_combinator());

        let EntryBody::Closure(root) = lam.target.body() else {
            panic!("Expected a closure body");
        };
        assert_eq!(root.env_preamble, [(0, 0)]);
        assert_eq!(root.arg_preamble, [(1, 0)]);
        assert_eq!(root.slot_types, [Type::Nat, Type::Nat]);
    }

    #[test]
    fn combinators_capture_nothing()
    {
        let term = t::lam([("x", Type::Nat)], t::app(t::var("plus"), [t::var("x"), t::nat(1)]));
        let Code::Lam(lam) = compile_closed(&term) else {
            panic!("Expected a lambda");
        };
        assert_eq!(lam.env_size, None);
        assert!(lam.captures.is_empty());
        assert!(!lam.target.is_super_combinator());
    }

    #[test]
    fn saturated_builtins_are_called_directly()
    {
        let saturated = t::app(t::var("plus"), [t::nat(1), t::nat(2)]);
        assert!(matches!(compile_closed(&saturated), Code::CallBuiltin(_)));

        let partial = t::app(t::var("plus"), [t::nat(1)]);
        assert!(matches!(compile_closed(&partial), Code::App(_)));

        let bare = t::var("plus");
        assert!(matches!(compile_closed(&bare), Code::Lam(_)));
    }

    #[test]
    fn let_shadowing_uses_fresh_slots()
    {
        let term = t::let_("x", t::nat(1), t::let_("x", t::boolean(true), t::var("x")));
        let runtime = Runtime::new(Config::default());
        let program = runtime.elaborate(&term).unwrap();
        assert_eq!(program.ty(), &Type::Bool);
        assert_eq!(program.run(&runtime).unwrap(), Value::Boolean(true));
        assert_eq!(program.recover_type(), Some(Type::Bool));
    }

    #[test]
    fn partial_builtin_application()
    {
        let runtime = Runtime::new(Config::default());
        let term = t::app(t::var("minus"), [t::nat(10)]);
        let Value::Closure(closure) = runtime.evaluate(&term).unwrap() else {
            panic!("Expected a closure");
        };
        assert_eq!(closure.arity(), 1);
        assert_eq!(closure.execute(&runtime, &[Value::Integer(3)]).ok(), Some(Value::Integer(7)));
    }

    /// Terms of type `Nat` in which `k` is a `Nat`.
    fn nat_term() -> impl Strategy<Value=Term>
    {
        let leaf = prop_oneof![
            (0i64 .. 10).prop_map(t::nat),
            Just(t::var("k")),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| t::app(t::var("plus"), [a, b])),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| t::app(t::var("minus"), [a, b])),
            (inner.clone(), inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(a, b, c, d)| {
                    t::if_(t::app(t::var("le"), [a, b]), c, d)
                }),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| t::let_("k", a, b)),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| {
                    t::app(t::lam([("k", Type::Nat)], b), [a])
                }),
            (inner.clone(), inner)
                .prop_map(|(a, b)| {
                    t::app(t::app(t::var("plus"), [a]), [b])
                }),
        ])
    }

    proptest!
    {
        #[test]
        fn type_soundness(term in nat_term(), k in 0i64 .. 10)
        {
            let term = t::let_("k", t::nat(k), term);

            let runtime = Runtime::new(Config::default());
            let program = runtime.elaborate(&term).unwrap();
            prop_assert_eq!(program.ty(), &Type::Nat);
            prop_assert_eq!(program.recover_type(), Some(Type::Nat));

            let value = program.run(&runtime).unwrap();
            prop_assert!(matches!(value, Value::Integer(n) if n >= 0));

            let plain = Runtime::new(Config{
                tail_calls: false,
                dispatch_cache: false,
                ..Config::default()
            });
            prop_assert_eq!(plain.evaluate(&term).unwrap(), value);
        }
    }
}
