//! Term trees and convenient constructors for them.

use {super::location::Location, crate::types::Type, std::sync::Arc};

/// Term, as produced by the parser.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub enum Term
{
    /// `x`
    Var{
        name: Arc<str>,
        location: Location,
    },

    /// `if c then t else e`
    If{
        condition: Box<Term>,
        then_branch: Box<Term>,
        else_branch: Box<Term>,
        location: Location,
    },

    /// `f a b`
    App{
        operator: Box<Term>,
        operands: Vec<Term>,
        location: Location,
    },

    /// `\(x : A) (y : B) -> body`
    Lam{
        parameters: Vec<(Arc<str>, Type)>,
        body: Box<Term>,
        location: Location,
    },

    /// `let x = value in body`
    Let{
        name: Arc<str>,
        value: Box<Term>,
        body: Box<Term>,
        location: Location,
    },

    /// `42`
    Nat{
        value: i64,
        location: Location,
    },

    /// `true`
    Bool{
        value: bool,
        location: Location,
    },

    /// `()`
    Unit{
        location: Location,
    },
}

impl Term
{
    /// The location of the term.
    pub fn location(&self) -> Location
    {
        match self {
            Self::Var{location, ..}  => *location,
            Self::If{location, ..}   => *location,
            Self::App{location, ..}  => *location,
            Self::Lam{location, ..}  => *location,
            Self::Let{location, ..}  => *location,
            Self::Nat{location, ..}  => *location,
            Self::Bool{location, ..} => *location,
            Self::Unit{location}     => *location,
        }
    }

    /// Replace the location of the term.
    pub fn at(mut self, at: Location) -> Self
    {
        match &mut self {
            Self::Var{location, ..}  => *location = at,
            Self::If{location, ..}   => *location = at,
            Self::App{location, ..}  => *location = at,
            Self::Lam{location, ..}  => *location = at,
            Self::Let{location, ..}  => *location = at,
            Self::Nat{location, ..}  => *location = at,
            Self::Bool{location, ..} => *location = at,
            Self::Unit{location}     => *location = at,
        }
        self
    }
}

/* -------------------------------------------------------------------------- */
/*                                Constructors                                */
/* -------------------------------------------------------------------------- */

// Terms built with these have the default location.
// Use [`Term::at`] to attach a real one.

/// Create a variable term.
pub fn var(name: impl Into<Arc<str>>) -> Term
{
    Term::Var{name: name.into(), location: Location::default()}
}

/// Create a conditional term.
pub fn if_(condition: Term, then_branch: Term, else_branch: Term) -> Term
{
    Term::If{
        condition: Box::new(condition),
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
        location: Location::default(),
    }
}

/// Create an application term.
pub fn app(operator: Term, operands: impl IntoIterator<Item=Term>) -> Term
{
    Term::App{
        operator: Box::new(operator),
        operands: operands.into_iter().collect(),
        location: Location::default(),
    }
}

/// Create a lambda term.
pub fn lam<N, I>(parameters: I, body: Term) -> Term
    where I: IntoIterator<Item=(N, Type)>
        , N: Into<Arc<str>>
{
    Term::Lam{
        parameters: parameters.into_iter()
            .map(|(name, ty)| (name.into(), ty))
            .collect(),
        body: Box::new(body),
        location: Location::default(),
    }
}

/// Create a let term.
pub fn let_(name: impl Into<Arc<str>>, value: Term, body: Term) -> Term
{
    Term::Let{
        name: name.into(),
        value: Box::new(value),
        body: Box::new(body),
        location: Location::default(),
    }
}

/// Create a natural number literal.
pub fn nat(value: i64) -> Term
{
    Term::Nat{value, location: Location::default()}
}

/// Create a Boolean literal.
pub fn boolean(value: bool) -> Term
{
    Term::Bool{value, location: Location::default()}
}

/// Create the unit literal.
pub fn unit() -> Term
{
    Term::Unit{location: Location::default()}
}
