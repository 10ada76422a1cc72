//! Actions
//!
//! An action is a command that may or may not be ready to run. Widgets take
//! actions instead of closures so that, for example, a button can render
//! itself disabled while its action is not ready.
//!
//! # How Actions Work
//!
//! Performing an action happens in two stages:
//!
//! 1. The action reads every signal it needs. If a read fails, nothing has
//!    been changed yet.
//!
//! 2. The action calls the *intermediary* it was handed, then commits its
//!    side effects.
//!
//! Composite actions nest intermediaries: performing `(a, b)` performs `b`
//! with an intermediary that performs `a`. All reads happen before the
//! innermost intermediary runs, and the writes then commit in declaration
//! order as the calls unwind. A composite either reads everything
//! successfully or commits nothing.
//!
//! # Arguments
//!
//! `Args` is a tuple: `()` for plain actions, `(T,)` for actions that take
//! one argument (like [`push_back`]). [`bind`] supplies the first argument
//! from a signal, producing an action with one argument fewer.
//!
//! ```rust,ignore
//! let add = bind(push_back(direct(&items)), draft.clone());
//! let submit = (add, set_to(draft, String::new()));
//! if submit.is_ready() {
//!     perform_action(&submit, ())?;
//! }
//! ```

mod library;
mod operators;

pub use library::{
    add_assign, apply_to, decrement, div_assign, erase_index, increment, mul_assign, push_back,
    rem_assign, set_to, sub_assign, toggle, ApplyTo, CompoundAssign, EraseIndex, PushBack, SetTo,
};
pub use operators::{bind, copy, seq, Bound, CopyAction};

use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::reactive::{IntoReadSignal, ReadSignal};

/// A command with a readiness check and a staged perform step.
pub trait Action<Args = ()> {
    fn is_ready(&self) -> bool;

    /// Perform the action. `intermediary` must be called exactly once,
    /// after every read and before any side effect.
    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, args: Args) -> Result<()>;
}

impl<A: Action<Args> + ?Sized, Args> Action<Args> for &A {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, args: Args) -> Result<()> {
        (**self).perform(intermediary, args)
    }
}

/// Perform `action` with a no-op intermediary.
///
/// Returns [`Error::NotReady`] without doing anything if the action is not
/// ready.
pub fn perform_action<A: Action<Args> + ?Sized, Args>(action: &A, args: Args) -> Result<()> {
    if !action.is_ready() {
        tracing::trace!("refusing to perform an action that is not ready");
        return Err(Error::NotReady);
    }
    action.perform(&mut || Ok(()), args)
}

// ----------------------------------------------------------------------------
// Callbacks
// ----------------------------------------------------------------------------

/// An always-ready action that calls a function.
#[derive(Clone)]
pub struct Callback<F>(F);

pub fn callback<Args, F>(f: F) -> Callback<F>
where
    F: Fn(Args) -> Result<()>,
{
    Callback(f)
}

impl<F, Args> Action<Args> for Callback<F>
where
    F: Fn(Args) -> Result<()>,
{
    fn is_ready(&self) -> bool {
        true
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, args: Args) -> Result<()> {
        intermediary()?;
        (self.0)(args)
    }
}

/// A ready action that does nothing.
pub struct NoopAction<Args>(PhantomData<fn(Args)>);

pub fn noop_action<Args>() -> NoopAction<Args> {
    NoopAction(PhantomData)
}

impl<Args> Clone for NoopAction<Args> {
    fn clone(&self) -> Self {
        noop_action()
    }
}

impl<Args> Action<Args> for NoopAction<Args> {
    fn is_ready(&self) -> bool {
        true
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, _: Args) -> Result<()> {
        intermediary()
    }
}

/// An action that is never ready.
pub struct UnreadyAction<Args>(PhantomData<fn(Args)>);

pub fn unready_action<Args>() -> UnreadyAction<Args> {
    UnreadyAction(PhantomData)
}

impl<Args> Clone for UnreadyAction<Args> {
    fn clone(&self) -> Self {
        unready_action()
    }
}

impl<Args> Action<Args> for UnreadyAction<Args> {
    fn is_ready(&self) -> bool {
        false
    }

    fn perform(&self, _: &mut dyn FnMut() -> Result<()>, _: Args) -> Result<()> {
        Err(Error::NotReady)
    }
}

// ----------------------------------------------------------------------------
// Readiness adaptors
// ----------------------------------------------------------------------------

/// Always ready; performs the wrapped action only if it is.
#[derive(Clone)]
pub struct OnlyIfReady<A>(A);

/// Make `action` optional. Useful for folding it into a sequence without
/// letting it block the others.
pub fn only_if_ready<A>(action: A) -> OnlyIfReady<A> {
    OnlyIfReady(action)
}

impl<A: Action<Args>, Args> Action<Args> for OnlyIfReady<A> {
    fn is_ready(&self) -> bool {
        true
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, args: Args) -> Result<()> {
        if self.0.is_ready() {
            self.0.perform(intermediary, args)
        } else {
            intermediary()
        }
    }
}

/// Ready only when the wrapped action is and a flag signal reads `true`.
#[derive(Clone)]
pub struct MaskedAction<A, F> {
    action: A,
    flag: F,
}

pub fn mask<A, F>(action: A, flag: F) -> MaskedAction<A, F::Signal>
where
    F: IntoReadSignal,
    F::Signal: ReadSignal<Value = bool>,
{
    MaskedAction {
        action,
        flag: flag.into_read_signal(),
    }
}

impl<A, F, Args> Action<Args> for MaskedAction<A, F>
where
    A: Action<Args>,
    F: ReadSignal<Value = bool>,
{
    fn is_ready(&self) -> bool {
        self.action.is_ready() && self.flag.with(|flag| *flag).unwrap_or(false)
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, args: Args) -> Result<()> {
        self.action.perform(intermediary, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{direct, empty, value};
    use std::cell::{Cell, RefCell};

    #[test]
    fn unready_actions_are_refused() {
        let refused = perform_action(&unready_action::<()>(), ());
        assert!(matches!(refused, Err(Error::NotReady)));
        assert!(perform_action(&noop_action::<()>(), ()).is_ok());
    }

    #[test]
    fn callbacks_run_after_the_intermediary() {
        let order = RefCell::new(Vec::new());
        let action = callback(|(n,): (i32,)| {
            order.borrow_mut().push(n);
            Ok(())
        });
        action
            .perform(
                &mut || {
                    order.borrow_mut().push(0);
                    Ok(())
                },
                (1,),
            )
            .unwrap();
        assert_eq!(*order.borrow(), vec![0, 1]);
    }

    #[test]
    fn only_if_ready_still_calls_the_intermediary() {
        let called = Cell::new(false);
        let action = only_if_ready(unready_action::<()>());
        assert!(action.is_ready());
        action
            .perform(
                &mut || {
                    called.set(true);
                    Ok(())
                },
                (),
            )
            .unwrap();
        assert!(called.get());
    }

    #[test]
    fn masks_gate_readiness() {
        let flag = RefCell::new(false);
        let action = mask(noop_action::<()>(), direct(&flag));
        assert!(!action.is_ready());
        *flag.borrow_mut() = true;
        assert!(action.is_ready());
        assert!(!mask(noop_action::<()>(), empty::<bool>()).is_ready());
        assert!(mask(noop_action::<()>(), value(true)).is_ready());
    }
}
