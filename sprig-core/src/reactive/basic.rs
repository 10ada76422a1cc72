//! Basic Signals
//!
//! The leaves of every signal expression: constants, empty signals, direct
//! views of caller-owned storage, and closures.

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::id::{ByRef, IdValue, NullId, SimpleId};

use super::signal::{MoveSignal, ReadSignal, Signal, WriteSignal};

// ----------------------------------------------------------------------------
// value
// ----------------------------------------------------------------------------

/// A read-only signal carrying its own value.
#[derive(Debug, Clone)]
pub struct ValueSignal<T> {
    value: T,
}

/// A signal that always has `value`.
pub fn value<T: IdValue>(value: T) -> ValueSignal<T> {
    ValueSignal { value }
}

impl<T> Signal for ValueSignal<T> {
    type Value = T;
}

impl<T: IdValue> ReadSignal for ValueSignal<T> {
    type Id<'a> = ByRef<'a, T> where Self: 'a;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> Self::Id<'_> {
        ByRef(&self.value)
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        Ok(f(&self.value))
    }
}

// ----------------------------------------------------------------------------
// empty
// ----------------------------------------------------------------------------

/// A signal that never has a value and is never ready to write.
pub struct EmptySignal<T>(PhantomData<fn() -> T>);

impl<T> Clone for EmptySignal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EmptySignal<T> {}

pub fn empty<T>() -> EmptySignal<T> {
    EmptySignal(PhantomData)
}

impl<T> Signal for EmptySignal<T> {
    type Value = T;
}

impl<T> ReadSignal for EmptySignal<T> {
    type Id<'a> = NullId where Self: 'a;

    fn has_value(&self) -> bool {
        false
    }

    fn value_id(&self) -> NullId {
        NullId
    }

    fn with<R>(&self, _: impl FnOnce(&T) -> R) -> Result<R> {
        Err(Error::NoValue)
    }
}

impl<T> WriteSignal for EmptySignal<T> {
    fn ready_to_write(&self) -> bool {
        false
    }

    fn write(&self, _: T) -> Result<()> {
        Err(Error::NotReady)
    }
}

// ----------------------------------------------------------------------------
// direct
// ----------------------------------------------------------------------------

/// A duplex view of a caller-owned `RefCell`.
///
/// The value id is a copy of the value, so changes made to the cell by
/// other code are noticed.
pub struct DirectSignal<'r, T> {
    cell: &'r RefCell<T>,
}

impl<T> Clone for DirectSignal<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DirectSignal<'_, T> {}

pub fn direct<T>(cell: &RefCell<T>) -> DirectSignal<'_, T> {
    DirectSignal { cell }
}

impl<T> Signal for DirectSignal<'_, T> {
    type Value = T;
}

impl<T: IdValue> ReadSignal for DirectSignal<'_, T> {
    type Id<'a> = SimpleId<T> where Self: 'a;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> SimpleId<T> {
        SimpleId(self.cell.borrow().clone())
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        Ok(f(&self.cell.borrow()))
    }
}

impl<T> WriteSignal for DirectSignal<'_, T> {
    fn ready_to_write(&self) -> bool {
        true
    }

    fn write(&self, value: T) -> Result<()> {
        *self.cell.borrow_mut() = value;
        Ok(())
    }
}

impl<T: IdValue + Default> MoveSignal for DirectSignal<'_, T> {
    fn move_out(&self) -> Result<T> {
        Ok(std::mem::take(&mut *self.cell.borrow_mut()))
    }
}

/// A read-only view of a caller-owned value.
pub struct DirectConstSignal<'r, T> {
    value: &'r T,
}

impl<T> Clone for DirectConstSignal<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DirectConstSignal<'_, T> {}

pub fn direct_const<T>(value: &T) -> DirectConstSignal<'_, T> {
    DirectConstSignal { value }
}

impl<T> Signal for DirectConstSignal<'_, T> {
    type Value = T;
}

impl<T: IdValue> ReadSignal for DirectConstSignal<'_, T> {
    type Id<'a> = ByRef<'a, T> where Self: 'a;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> ByRef<'_, T> {
        ByRef(self.value)
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        Ok(f(self.value))
    }
}

// ----------------------------------------------------------------------------
// lambda_reader
// ----------------------------------------------------------------------------

/// A read-only signal backed by two closures.
#[derive(Clone)]
pub struct LambdaReader<H, G> {
    has_value: H,
    get: G,
}

/// A signal that asks `has_value` whether a value exists and `get` for the
/// value itself. The value id is a copy of the value.
pub fn lambda_reader<T, H, G>(has_value: H, get: G) -> LambdaReader<H, G>
where
    H: Fn() -> bool,
    G: Fn() -> T,
{
    LambdaReader { has_value, get }
}

impl<T, H, G> Signal for LambdaReader<H, G>
where
    G: Fn() -> T,
{
    type Value = T;
}

impl<T, H, G> ReadSignal for LambdaReader<H, G>
where
    T: IdValue,
    H: Fn() -> bool,
    G: Fn() -> T,
{
    type Id<'a> = Option<SimpleId<T>> where Self: 'a;

    fn has_value(&self) -> bool {
        (self.has_value)()
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.has_value().then(|| SimpleId((self.get)()))
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        if !self.has_value() {
            return Err(Error::NoValue);
        }
        Ok(f(&(self.get)()))
    }
}

// ----------------------------------------------------------------------------
// signalize
// ----------------------------------------------------------------------------

/// Anything that can stand in for a readable signal: signals themselves,
/// and plain values (which become [`ValueSignal`]s).
pub trait IntoReadSignal {
    type Signal: ReadSignal;

    fn into_read_signal(self) -> Self::Signal;
}

impl<S: ReadSignal> IntoReadSignal for S {
    type Signal = S;

    fn into_read_signal(self) -> S {
        self
    }
}

macro_rules! impl_into_read_signal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReadSignal for $ty {
                type Signal = ValueSignal<$ty>;

                fn into_read_signal(self) -> Self::Signal {
                    value(self)
                }
            }
        )*
    };
}

impl_into_read_signal!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    String, &'static str,
);

/// Convert a plain value or a signal into a signal.
pub fn signalize<V: IntoReadSignal>(value: V) -> V::Signal {
    value.into_read_signal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdInterface;
    use std::cell::Cell;

    #[test]
    fn value_signals_always_have_values() {
        let signal = value(5);
        assert!(signal.has_value());
        assert_eq!(signal.read().unwrap(), 5);
        assert!(signal.value_id().equals(&value(5).value_id()));
        assert!(!signal.value_id().equals(&value(6).value_id()));
    }

    #[test]
    fn empty_signals_refuse_everything() {
        let signal = empty::<i32>();
        assert!(!signal.has_value());
        assert!(matches!(signal.read(), Err(Error::NoValue)));
        assert!(!signal.ready_to_write());
        assert!(matches!(signal.write(1), Err(Error::NotReady)));
    }

    #[test]
    fn direct_signals_see_outside_changes() {
        let cell = RefCell::new(1);
        let signal = direct(&cell);
        let before = signal.value_id();
        signal.write(2).unwrap();
        assert_eq!(*cell.borrow(), 2);
        assert!(!before.equals(&signal.value_id()));
        assert_eq!(signal.move_out().unwrap(), 2);
        assert_eq!(*cell.borrow(), 0);
    }

    #[test]
    fn lambda_readers_follow_their_closures() {
        let ready = Cell::new(false);
        let signal = lambda_reader(|| ready.get(), || 42);
        assert!(signal.read().is_err());
        ready.set(true);
        assert_eq!(signal.read().unwrap(), 42);
    }

    #[test]
    fn plain_values_are_signalized() {
        assert_eq!(signalize(3i32).read().unwrap(), 3);
        let cell = RefCell::new(4);
        assert_eq!(signalize(direct(&cell)).read().unwrap(), 4);
    }
}
