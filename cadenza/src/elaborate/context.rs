use {
    crate::{builtin::Builtin, types::Type},
    std::sync::Arc,
};

/// Names in scope during elaboration, with their types.
///
/// Later bindings shadow earlier ones.
#[derive(Clone, Debug)]
pub struct Context
{
    names: Vec<(Arc<str>, NameInfo)>,
}

/// What elaboration knows about a name.
#[derive(Clone, Debug)]
pub struct NameInfo
{
    /// The type of the name.
    pub ty: Type,

    /// The builtin the name refers to, unless it is a local.
    pub builtin: Option<Builtin>,
}

impl Context
{
    /// Create an empty context.
    pub fn new() -> Self
    {
        Self{names: Vec::new()}
    }

    /// Create a context with every builtin in scope.
    pub fn builtins() -> Self
    {
        let names = Builtin::ALL.into_iter()
            .map(|builtin| {
                let info = NameInfo{ty: builtin.ty(), builtin: Some(builtin)};
                (Arc::from(builtin.name()), info)
            })
            .collect();
        Self{names}
    }

    /// Bring a local into scope.
    pub fn push(&mut self, name: Arc<str>, ty: Type)
    {
        self.names.push((name, NameInfo{ty, builtin: None}));
    }

    /// Find the innermost binding of a name.
    pub fn lookup(&self, name: &str) -> Option<&NameInfo>
    {
        self.names.iter().rev()
            .find(|(other, _)| &**other == name)
            .map(|(_, info)| info)
    }

    /// Call `f` with locals in scope, then remove them again.
    pub fn with_bindings<'a, I, F, R>(&mut self, bindings: I, f: F) -> R
        where I: IntoIterator<Item=&'a (Arc<str>, Type)>
            , F: FnOnce(&mut Self) -> R
    {
        let len = self.names.len();
        for (name, ty) in bindings {
            self.push(name.clone(), ty.clone());
        }
        let result = f(self);
        self.names.truncate(len);
        result
    }
}

impl Default for Context
{
    fn default() -> Self
    {
        Self::new()
    }
}
