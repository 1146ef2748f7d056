use {
    crate::{frame::Slot, types::Type},
    std::sync::Arc,
};

/// Where compiled code finds the names in scope.
///
/// Slots are allocated once and never reused,
/// so every slot has a single type.
#[derive(Clone, Debug, Default)]
pub struct FrameLayout
{
    scope: Vec<(Arc<str>, Binding)>,
    slot_types: Vec<Type>,
    argument_types: Vec<Type>,
}

/// Storage for a name.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Binding
{
    Slot(Slot),
    Arg(usize),
}

impl FrameLayout
{
    /// Create a layout with nothing in scope.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Create a layout whose names are the positional arguments.
    pub fn with_arguments<I>(arguments: I) -> Self
        where I: IntoIterator<Item=(Arc<str>, Type)>
    {
        let mut this = Self::new();
        for (index, (name, ty)) in arguments.into_iter().enumerate() {
            this.scope.push((name, Binding::Arg(index)));
            this.argument_types.push(ty);
        }
        this
    }

    /// The number of slots allocated.
    pub fn size(&self) -> usize
    {
        self.slot_types.len()
    }

    /// The type of each slot.
    pub fn slot_types(&self) -> &[Type]
    {
        &self.slot_types
    }

    /// The type of each positional argument.
    pub fn argument_types(&self) -> &[Type]
    {
        &self.argument_types
    }

    /// Find the innermost binding of a name.
    pub fn lookup(&self, name: &str) -> Option<Binding>
    {
        self.scope.iter().rev()
            .find(|(other, _)| &**other == name)
            .map(|(_, binding)| *binding)
    }

    /// Allocate a fresh slot and bind a name to it for the rest of the layout.
    pub fn bind(&mut self, name: Arc<str>, ty: Type) -> Slot
    {
        let slot = self.slot_types.len();
        self.slot_types.push(ty);
        self.scope.push((name, Binding::Slot(slot)));
        slot
    }

    /// Allocate a fresh slot, bind a name to it, and call `f`.
    ///
    /// The name goes out of scope when `f` returns; the slot stays allocated.
    pub fn with_slot<F, R>(&mut self, name: Arc<str>, ty: Type, f: F) -> R
        where F: FnOnce(&mut Self, Slot) -> R
    {
        let len = self.scope.len();
        let slot = self.bind(name, ty);
        let result = f(self, slot);
        self.scope.truncate(len);
        result
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn slots_are_never_reused()
    {
        let mut layout = FrameLayout::with_arguments([("a".into(), Type::Unit)]);
        assert_eq!(layout.lookup("a"), Some(Binding::Arg(0)));

        let first = layout.with_slot("x".into(), Type::Nat, |layout, slot| {
            assert_eq!(layout.lookup("x"), Some(Binding::Slot(slot)));
            slot
        });
        assert_eq!(layout.lookup("x"), None);

        let second = layout.with_slot("x".into(), Type::Bool, |_, slot| slot);
        assert_ne!(first, second);
        assert_eq!(layout.size(), 2);
        assert_eq!(layout.slot_types(), &[Type::Nat, Type::Bool]);
        assert_eq!(layout.argument_types(), &[Type::Unit]);
    }
}
