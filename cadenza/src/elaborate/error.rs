use {
    crate::{syntax::location::Location, types::{Type, ValidateError}},
    std::sync::Arc,
    thiserror::Error,
};

/// Error returned when a term is ill-typed.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error)]
pub enum TypeError
{
    #[error("{location}: Unknown variable `{name}`")]
    UnknownVariable{name: Arc<str>, location: Location},

    #[error("{location}: Expected a function, got a value of type {actual}")]
    NotAFunction{actual: Type, location: Location},

    #[error("{location}: Expected type {expected}, got {actual}")]
    TypeMismatch{actual: Type, expected: Type, location: Location},

    #[error("{location}: Invalid literal: {source}")]
    InvalidLiteral{source: ValidateError, location: Location},
}

impl TypeError
{
    /// Where the offending term is.
    pub fn location(&self) -> Location
    {
        match self {
            Self::UnknownVariable{location, ..} => *location,
            Self::NotAFunction{location, ..}    => *location,
            Self::TypeMismatch{location, ..}    => *location,
            Self::InvalidLiteral{location, ..}  => *location,
        }
    }

    /// The type that was found, if any.
    pub fn actual(&self) -> Option<&Type>
    {
        match self {
            Self::UnknownVariable{..}       => None,
            Self::NotAFunction{actual, ..}  => Some(actual),
            Self::TypeMismatch{actual, ..}  => Some(actual),
            Self::InvalidLiteral{..}        => None,
        }
    }

    /// The type that was required, if any.
    pub fn expected(&self) -> Option<&Type>
    {
        match self {
            Self::UnknownVariable{..}         => None,
            Self::NotAFunction{..}            => None,
            Self::TypeMismatch{expected, ..}  => Some(expected),
            Self::InvalidLiteral{source, ..}  => Some(&source.expected),
        }
    }
}
