//! Type recovery for compiled code.
//!
//! Recovering the type of a compiled tree uses nothing but the tree
//! and the types of the slots and arguments of its frame.
//! For every well-typed term, the recovered type of the compiled code
//! equals the type inferred during elaboration.

use {
    super::{Code, Lam},
    crate::{closure::EntryBody, types::Type, value::Value},
};

/// Recover the result type of a compiled tree.
///
/// Returns [`None`] if the tree is inconsistent.
pub fn recover_type(code: &Code, slot_types: &[Type], argument_types: &[Type])
    -> Option<Type>
{
    let recover = |code: &Code| recover_type(code, slot_types, argument_types);
    match code {

        Code::Var(slot) =>
            slot_types.get(*slot).cloned(),

        Code::Arg(index) =>
            argument_types.get(*index).cloned(),

        Code::Lit(value) =>
            match value {
                Value::Integer(_) | Value::BigInteger(_) => Some(Type::Nat),
                Value::Boolean(_) => Some(Type::Bool),
                Value::Unit => Some(Type::Unit),
                Value::Closure(closure) => Some(closure.ty().clone()),
                Value::Neutral(neutral) => Some(neutral.ty().clone()),
            },

        Code::If(node) => {
            let condition = recover(&*node.condition)?;
            let then_type = recover(&*node.then_branch)?;
            let else_type = recover(&*node.else_branch)?;
            let consistent = condition == Type::Bool
                && then_type == node.ty
                && else_type == node.ty;
            consistent.then(|| node.ty.clone())
        },

        Code::App(node) => {
            let operator = recover(node.operator())?;
            let operands: Option<Vec<Type>> = node.operands().map(recover).collect();
            apply(operator, &operands?)
        },

        Code::Lam(node) =>
            recover_lambda(node),

        Code::CallBuiltin(node) => {
            let operands: Option<Vec<Type>> =
                node.args.iter().map(|arg| recover(&**arg)).collect();
            let result = apply(node.builtin.ty(), &operands?)?;
            (result == node.ty).then_some(result)
        },

        Code::Let(node) => {
            let value = recover(&*node.value)?;
            let slot = slot_types.get(node.slot)?;
            if &value != slot {
                return None;
            }
            recover(&*node.body)
        },

    }
}

/// Peel one arrow off `function` per operand, checking each operand.
fn apply(function: Type, operands: &[Type]) -> Option<Type>
{
    let mut ty = function;
    for operand in operands {
        let Type::Arr(argument, result) = &ty else { return None };
        if **argument != *operand {
            return None;
        }
        ty = Type::clone(result);
    }
    Some(ty)
}

fn recover_lambda(node: &Lam) -> Option<Type>
{
    let arity = node.target.arity();
    match node.target.body() {
        EntryBody::Builtin(builtin) =>
            (builtin.ty() == node.ty).then(|| node.ty.clone()),
        EntryBody::Closure(root) => {
            // Parameters and captures live in slots of the body's frame.
            let body = recover_type(&root.body, &root.slot_types, &[])?;
            let parameters = root.arg_preamble.iter()
                .map(|&(slot, _)| root.slot_types.get(slot).cloned())
                .collect::<Option<Vec<_>>>()?;
            let result = apply(node.ty.clone(), &parameters)?;
            (parameters.len() == arity && result == body)
                .then(|| node.ty.clone())
        },
    }
}

#[cfg(test)]
mod tests
{
    use {
        super::*,
        crate::{
            builtin::Builtin,
            code::{CallBuiltin, If},
            config::Config,
            runtime::Runtime,
            syntax::term as t,
        },
        std::sync::Arc,
    };

    #[test]
    fn literals_and_variables()
    {
        let slots = [Type::Bool];
        let args = [Type::Unit];
        assert_eq!(recover_type(&Code::Lit(Value::Integer(1)), &[], &[]), Some(Type::Nat));
        assert_eq!(recover_type(&Code::Var(0), &slots, &args), Some(Type::Bool));
        assert_eq!(recover_type(&Code::Arg(0), &slots, &args), Some(Type::Unit));
        assert_eq!(recover_type(&Code::Var(1), &slots, &args), None);
    }

    #[test]
    fn inconsistent_trees()
    {
        let lit = |value| Arc::new(Code::Lit(value));

        let branches_disagree = Code::If(If{
            ty: Type::Nat,
            condition: lit(Value::Boolean(true)),
            then_branch: lit(Value::Integer(1)),
            else_branch: lit(Value::Unit),
        });
        assert_eq!(recover_type(&branches_disagree, &[], &[]), None);

        let wrong_argument = Code::CallBuiltin(CallBuiltin{
            ty: Type::Nat,
            builtin: Builtin::Plus,
            args: vec![lit(Value::Integer(1)), lit(Value::Boolean(false))],
            tail: false,
        });
        assert_eq!(recover_type(&wrong_argument, &[], &[]), None);
    }

    #[test]
    fn compiled_programs()
    {
        let runtime = Runtime::new(Config::default());
        let natf = Type::arr(Type::Nat, Type::Nat);
        let terms = [
            t::lam([("f", natf.clone()), ("x", Type::Nat)],
                t::app(t::var("f"), [t::var("x")])),
            t::let_("k", t::nat(2),
                t::lam([("x", Type::Nat)], t::app(t::var("mult"), [t::var("k"), t::var("x")]))),
            t::app(t::var("fixNatF"), [
                t::lam([("f", natf.clone()), ("x", Type::Nat)], t::var("x")),
            ]),
            t::app(t::var("le"), [t::nat(1)]),
        ];
        for term in &terms {
            let program = runtime.elaborate(term).unwrap();
            assert_eq!(program.recover_type().as_ref(), Some(program.ty()), "{term:?}");
        }
    }
}
