//! Common actions on signals.

use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::id::IdValue;
use crate::reactive::{
    value, Arithmetic, Binary, BinaryOp, DividedBy, IntoReadSignal, Minus, Modulo, Plus,
    ReadSignal, Signal, Times, ValueSignal, WriteSignal,
};

use super::Action;

/// Replaces the value of a duplex signal with a function of itself.
#[derive(Clone)]
pub struct ApplyTo<S, F> {
    signal: S,
    f: F,
}

/// An action that writes `f(value)` back to `signal`.
pub fn apply_to<S, F>(signal: S, f: F) -> ApplyTo<S, F>
where
    S: ReadSignal + WriteSignal,
    F: Fn(S::Value) -> S::Value,
{
    ApplyTo { signal, f }
}

impl<S, F> Action<()> for ApplyTo<S, F>
where
    S: ReadSignal + WriteSignal,
    S::Value: Clone,
    F: Fn(S::Value) -> S::Value,
{
    fn is_ready(&self) -> bool {
        self.signal.has_value() && self.signal.ready_to_write()
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, (): ()) -> Result<()> {
        let updated = (self.f)(self.signal.read()?);
        intermediary()?;
        self.signal.write(updated)
    }
}

/// Flip a boolean signal.
pub fn toggle<S>(flag: S) -> ApplyTo<S, fn(bool) -> bool>
where
    S: ReadSignal<Value = bool> + WriteSignal,
{
    apply_to(flag, negate as fn(bool) -> bool)
}

fn negate(value: bool) -> bool {
    !value
}

/// Writes a fixed value.
#[derive(Clone)]
pub struct SetTo<S, T> {
    sink: S,
    value: T,
}

/// An action that writes `value` to `sink`. Ready whenever `sink` is.
pub fn set_to<S: WriteSignal>(sink: S, value: S::Value) -> SetTo<S, S::Value> {
    SetTo { sink, value }
}

impl<S, T> Action<()> for SetTo<S, T>
where
    S: WriteSignal<Value = T>,
    T: Clone,
{
    fn is_ready(&self) -> bool {
        self.sink.ready_to_write()
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, (): ()) -> Result<()> {
        intermediary()?;
        self.sink.write(self.value.clone())
    }
}

/// Appends its argument to a vector signal.
#[derive(Clone)]
pub struct PushBack<S>(S);

/// An action taking one item and pushing it onto the end of `container`.
pub fn push_back<S, T>(container: S) -> PushBack<S>
where
    S: ReadSignal<Value = Vec<T>> + WriteSignal,
{
    PushBack(container)
}

impl<S, T> Action<(T,)> for PushBack<S>
where
    S: ReadSignal<Value = Vec<T>> + WriteSignal,
    T: Clone,
{
    fn is_ready(&self) -> bool {
        self.0.has_value() && self.0.ready_to_write()
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, (item,): (T,)) -> Result<()> {
        let mut items = self.0.read()?;
        items.push(item);
        intermediary()?;
        self.0.write(items)
    }
}

/// Removes one element from a vector signal.
#[derive(Clone)]
pub struct EraseIndex<S, I> {
    container: S,
    index: I,
}

/// An action that removes the element at `index` (a plain `usize` or a
/// signal carrying one) from `container`.
pub fn erase_index<S, T, I>(container: S, index: I) -> EraseIndex<S, I::Signal>
where
    S: ReadSignal<Value = Vec<T>> + WriteSignal,
    I: IntoReadSignal,
    I::Signal: ReadSignal<Value = usize>,
{
    EraseIndex {
        container,
        index: index.into_read_signal(),
    }
}

impl<S, T, I> Action<()> for EraseIndex<S, I>
where
    S: ReadSignal<Value = Vec<T>> + WriteSignal,
    T: Clone,
    I: ReadSignal<Value = usize>,
{
    fn is_ready(&self) -> bool {
        self.container.has_value() && self.container.ready_to_write() && self.index.has_value()
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, (): ()) -> Result<()> {
        let mut items = self.container.read()?;
        let index = self.index.read()?;
        if index >= items.len() {
            return Err(Error::validation(format!(
                "index {index} is out of range for {} items",
                items.len()
            )));
        }
        items.remove(index);
        intermediary()?;
        self.container.write(items)
    }
}

// ----------------------------------------------------------------------------
// Compound assignment
// ----------------------------------------------------------------------------

/// Replaces a duplex signal's value with `value op operand`.
pub struct CompoundAssign<S, B, Op> {
    target: S,
    operand: B,
    op: PhantomData<fn() -> Op>,
}

impl<S: Clone, B: Clone, Op> Clone for CompoundAssign<S, B, Op> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            operand: self.operand.clone(),
            op: PhantomData,
        }
    }
}

impl<S, B, Op> CompoundAssign<S, B, Op> {
    fn new(target: S, operand: B) -> Self {
        Self {
            target,
            operand,
            op: PhantomData,
        }
    }

    fn combined(&self) -> Binary<&S, &B, Op> {
        Binary::new(&self.target, &self.operand)
    }
}

/// Ready when the target is writable and the combined value is defined, so
/// an overflowing increment or a division by zero is never ready.
impl<S, B, Op> Action<()> for CompoundAssign<S, B, Op>
where
    S: ReadSignal + WriteSignal,
    B: ReadSignal,
    Op: BinaryOp<S::Value, B::Value, Output = S::Value>,
    S::Value: Clone,
{
    fn is_ready(&self) -> bool {
        self.target.ready_to_write() && self.combined().has_value()
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, (): ()) -> Result<()> {
        let updated = self.combined().read()?;
        intermediary()?;
        self.target.write(updated)
    }
}

macro_rules! compound_assignments {
    ($($(#[$doc:meta])* $name:ident => $op:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<S, B>(target: S, operand: B) -> CompoundAssign<S, B::Signal, $op>
            where
                S: ReadSignal + WriteSignal,
                B: IntoReadSignal,
                $op: BinaryOp<S::Value, <B::Signal as Signal>::Value, Output = S::Value>,
            {
                CompoundAssign::new(target, operand.into_read_signal())
            }
        )*
    };
}

compound_assignments! {
    /// `target += operand`.
    add_assign => Plus;
    /// `target -= operand`.
    sub_assign => Minus;
    /// `target *= operand`.
    mul_assign => Times;
    /// `target /= operand`. Never ready while `operand` is zero.
    div_assign => DividedBy;
    /// `target %= operand`. Never ready while `operand` is zero.
    rem_assign => Modulo;
}

/// `target += 1`.
pub fn increment<S>(target: S) -> CompoundAssign<S, ValueSignal<S::Value>, Plus>
where
    S: ReadSignal + WriteSignal,
    S::Value: Arithmetic + IdValue,
{
    CompoundAssign::new(target, value(<S::Value as Arithmetic>::ONE))
}

/// `target -= 1`.
pub fn decrement<S>(target: S) -> CompoundAssign<S, ValueSignal<S::Value>, Minus>
where
    S: ReadSignal + WriteSignal,
    S::Value: Arithmetic + IdValue,
{
    CompoundAssign::new(target, value(<S::Value as Arithmetic>::ONE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{bind, perform_action};
    use crate::reactive::{direct, empty};
    use std::cell::RefCell;

    #[test]
    fn toggling_flips_the_flag() {
        let flag = RefCell::new(false);
        let action = toggle(direct(&flag));
        perform_action(&action, ()).unwrap();
        assert!(*flag.borrow());
        perform_action(&action, ()).unwrap();
        assert!(!*flag.borrow());
    }

    #[test]
    fn items_are_pushed_and_erased() {
        let items = RefCell::new(vec![1, 2]);
        perform_action(&push_back(direct(&items)), (3,)).unwrap();
        assert_eq!(*items.borrow(), vec![1, 2, 3]);

        perform_action(&bind(push_back(direct(&items)), 4), ()).unwrap();
        assert_eq!(*items.borrow(), vec![1, 2, 3, 4]);

        perform_action(&erase_index(direct(&items), 0usize), ()).unwrap();
        assert_eq!(*items.borrow(), vec![2, 3, 4]);

        let out_of_range = perform_action(&erase_index(direct(&items), 9usize), ());
        assert!(matches!(out_of_range, Err(Error::Validation(_))));
        assert_eq!(*items.borrow(), vec![2, 3, 4]);

        assert!(!erase_index(direct(&items), empty::<usize>()).is_ready());
    }

    #[test]
    fn set_and_apply_write_their_results() {
        let n = RefCell::new(3);
        perform_action(&apply_to(direct(&n), |n| n * 2), ()).unwrap();
        assert_eq!(*n.borrow(), 6);
        perform_action(&set_to(direct(&n), 0), ()).unwrap();
        assert_eq!(*n.borrow(), 0);
    }

    #[test]
    fn compound_assignments_combine_with_the_operand() {
        let n = RefCell::new(10);
        let step = RefCell::new(3);
        perform_action(&add_assign(direct(&n), direct(&step)), ()).unwrap();
        assert_eq!(*n.borrow(), 13);
        perform_action(&sub_assign(direct(&n), 1), ()).unwrap();
        perform_action(&mul_assign(direct(&n), 2), ()).unwrap();
        assert_eq!(*n.borrow(), 24);
        perform_action(&rem_assign(direct(&n), 5), ()).unwrap();
        assert_eq!(*n.borrow(), 4);
        perform_action(&div_assign(direct(&n), 2), ()).unwrap();
        assert_eq!(*n.borrow(), 2);

        assert!(!add_assign(direct(&n), empty::<i32>()).is_ready());
        let by_zero = div_assign(direct(&n), 0);
        assert!(!by_zero.is_ready());
        assert!(matches!(perform_action(&by_zero, ()), Err(Error::NotReady)));
        assert_eq!(*n.borrow(), 2);
    }

    #[test]
    fn increments_step_by_one_and_stop_at_the_bounds() {
        let count = RefCell::new(0u8);
        perform_action(&increment(direct(&count)), ()).unwrap();
        perform_action(&increment(direct(&count)), ()).unwrap();
        perform_action(&decrement(direct(&count)), ()).unwrap();
        assert_eq!(*count.borrow(), 1);

        perform_action(&decrement(direct(&count)), ()).unwrap();
        assert!(!decrement(direct(&count)).is_ready());

        *count.borrow_mut() = u8::MAX;
        assert!(!increment(direct(&count)).is_ready());

        let level = RefCell::new(0.5);
        perform_action(&increment(direct(&level)), ()).unwrap();
        assert_eq!(*level.borrow(), 1.5);
    }
}
