//! Ad-hoc scope guards.

#![warn(missing_docs)]

use std::mem::ManuallyDrop;

#[doc(hidden)]
pub struct ScopeExit<F>
    where F: FnOnce()
{
    f: ManuallyDrop<F>,
}

impl<F> ScopeExit<F>
    where F: FnOnce()
{
    pub fn new(f: F) -> Self
    {
        Self{f: ManuallyDrop::new(f)}
    }
}

impl<F> Drop for ScopeExit<F>
    where F: FnOnce()
{
    fn drop(&mut self)
    {
        // SAFETY: self.f will not be used anymore.
        let f = unsafe { ManuallyDrop::take(&mut self.f) };
        f();
    }
}

/// Define an ad-hoc scope guard.
///
/// The code passed to this macro is performed at the end of the scope.
/// It is performed when the scope ends or when a panic passes through.
///
/// # Examples
///
/// ```
/// # use scope_exit::scope_exit;
/// use std::cell::Cell;
/// let x = Cell::new(0);
/// {
///     scope_exit! { x.set(1); }
///     x.set(2);
/// }
/// assert_eq!(x.get(), 1);
/// ```
#[macro_export]
macro_rules! scope_exit
{
    { $($tt:tt)* } => {
        let __scope_exit = $crate::ScopeExit::new(|| { $($tt)* });
    };
}

#[cfg(test)]
mod tests
{
    use {super::*, std::{cell::Cell, panic::{self, AssertUnwindSafe}}};

    #[test]
    fn runs_in_reverse_order()
    {
        let log = Cell::new(0);
        {
            scope_exit! { log.set(log.get() * 10 + 1); }
            scope_exit! { log.set(log.get() * 10 + 2); }
        }
        assert_eq!(log.get(), 21);
    }

    #[test]
    fn runs_on_panic()
    {
        let depth = Cell::new(1);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            scope_exit! { depth.set(depth.get() - 1); }
            panic!("unwind");
        }));
        assert!(result.is_err());
        assert_eq!(depth.get(), 0);
    }

    #[test]
    fn guard_value()
    {
        let fired = Cell::new(false);
        let guard = ScopeExit::new(|| fired.set(true));
        assert!(!fired.get());
        drop(guard);
        assert!(fired.get());
    }
}
