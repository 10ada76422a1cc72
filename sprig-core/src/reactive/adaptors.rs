//! Signal Adaptors
//!
//! Adaptors wrap a signal and change one aspect of it while delegating the
//! rest: which capabilities it exposes, when it counts as ready, what type
//! it carries, or how its identity is computed.

use std::any::type_name;
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::id::{IdPair, IdValue, NullId, SimpleId};

use super::basic::IntoReadSignal;
use super::signal::{ClearSignal, ReadSignal, Signal, WriteSignal};

fn flag_is_set<F: ReadSignal<Value = bool>>(flag: &F) -> bool {
    flag.has_value() && flag.with(|set| *set).unwrap_or(false)
}

// ----------------------------------------------------------------------------
// Readability and writability
// ----------------------------------------------------------------------------

/// Presents a write-only signal as readable. It never has a value.
#[derive(Clone)]
pub struct FakeReadability<S>(S);

pub fn fake_readability<S: WriteSignal>(signal: S) -> FakeReadability<S> {
    FakeReadability(signal)
}

impl<S: Signal> Signal for FakeReadability<S> {
    type Value = S::Value;
}

impl<S: Signal> ReadSignal for FakeReadability<S> {
    type Id<'a> = NullId where Self: 'a;

    fn has_value(&self) -> bool {
        false
    }

    fn value_id(&self) -> NullId {
        NullId
    }

    fn with<R>(&self, _: impl FnOnce(&S::Value) -> R) -> Result<R> {
        Err(Error::NoValue)
    }
}

impl<S: WriteSignal> WriteSignal for FakeReadability<S> {
    fn ready_to_write(&self) -> bool {
        self.0.ready_to_write()
    }

    fn write(&self, value: S::Value) -> Result<()> {
        self.0.write(value)
    }
}

/// Presents a read-only signal as writable. It is never ready to write.
#[derive(Clone)]
pub struct FakeWritability<S>(S);

pub fn fake_writability<S: ReadSignal>(signal: S) -> FakeWritability<S> {
    FakeWritability(signal)
}

/// Keep a signal's reads but refuse its writes.
pub fn disable_writes<S: ReadSignal>(signal: S) -> FakeWritability<S> {
    FakeWritability(signal)
}

impl<S: Signal> Signal for FakeWritability<S> {
    type Value = S::Value;
}

impl<S: ReadSignal> ReadSignal for FakeWritability<S> {
    type Id<'a> = S::Id<'a> where Self: 'a;

    fn has_value(&self) -> bool {
        self.0.has_value()
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.0.value_id()
    }

    fn with<R>(&self, f: impl FnOnce(&S::Value) -> R) -> Result<R> {
        self.0.with(f)
    }
}

impl<S: Signal> WriteSignal for FakeWritability<S> {
    fn ready_to_write(&self) -> bool {
        false
    }

    fn write(&self, _: S::Value) -> Result<()> {
        Err(Error::NotReady)
    }
}

// ----------------------------------------------------------------------------
// signal_cast
// ----------------------------------------------------------------------------

/// Converts values with `TryFrom` in both directions.
pub struct SignalCast<S, T> {
    inner: S,
    target: PhantomData<fn() -> T>,
}

impl<S: Clone, T> Clone for SignalCast<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            target: PhantomData,
        }
    }
}

/// View `signal` as carrying `T`. Failed conversions are validation
/// errors.
pub fn signal_cast<T, S: Signal>(signal: S) -> SignalCast<S, T> {
    SignalCast {
        inner: signal,
        target: PhantomData,
    }
}

fn cast_failure<T>() -> Error {
    Error::validation(format!("value cannot be represented as {}", type_name::<T>()))
}

impl<S: Signal, T> Signal for SignalCast<S, T> {
    type Value = T;
}

impl<S, T> ReadSignal for SignalCast<S, T>
where
    S: ReadSignal,
    S::Value: Clone,
    T: TryFrom<S::Value>,
{
    type Id<'a> = S::Id<'a> where Self: 'a;

    fn has_value(&self) -> bool {
        self.inner.has_value()
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.inner.value_id()
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let converted = self
            .inner
            .with(|value| T::try_from(value.clone()))?
            .map_err(|_| cast_failure::<T>())?;
        Ok(f(&converted))
    }
}

impl<S, T> WriteSignal for SignalCast<S, T>
where
    S: WriteSignal,
    S::Value: TryFrom<T>,
{
    fn ready_to_write(&self) -> bool {
        self.inner.ready_to_write()
    }

    fn write(&self, value: T) -> Result<()> {
        let converted = S::Value::try_from(value).map_err(|_| cast_failure::<S::Value>())?;
        self.inner.write(converted)
    }
}

// ----------------------------------------------------------------------------
// Readiness
// ----------------------------------------------------------------------------

/// Always ready to write; writes made while the wrapped signal is not
/// ready are dropped.
#[derive(Clone)]
pub struct OnlyIfReady<S>(S);

pub fn only_if_ready<S: WriteSignal>(signal: S) -> OnlyIfReady<S> {
    OnlyIfReady(signal)
}

impl<S: Signal> Signal for OnlyIfReady<S> {
    type Value = S::Value;
}

impl<S: ReadSignal> ReadSignal for OnlyIfReady<S> {
    type Id<'a> = S::Id<'a> where Self: 'a;

    fn has_value(&self) -> bool {
        self.0.has_value()
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.0.value_id()
    }

    fn with<R>(&self, f: impl FnOnce(&S::Value) -> R) -> Result<R> {
        self.0.with(f)
    }
}

impl<S: WriteSignal> WriteSignal for OnlyIfReady<S> {
    fn ready_to_write(&self) -> bool {
        true
    }

    fn write(&self, value: S::Value) -> Result<()> {
        if self.0.ready_to_write() {
            self.0.write(value)
        } else {
            tracing::trace!("dropping write to unready signal");
            Ok(())
        }
    }
}

/// Has a value and accepts writes only while `flag` is set.
#[derive(Clone)]
pub struct Masked<S, F> {
    inner: S,
    flag: F,
}

pub fn mask<S, F>(signal: S, flag: F) -> Masked<S, F::Signal>
where
    S: Signal,
    F: IntoReadSignal,
    F::Signal: ReadSignal<Value = bool>,
{
    Masked {
        inner: signal,
        flag: flag.into_read_signal(),
    }
}

impl<S: Signal, F> Signal for Masked<S, F> {
    type Value = S::Value;
}

impl<S: ReadSignal, F: ReadSignal<Value = bool>> ReadSignal for Masked<S, F> {
    type Id<'a> = Option<S::Id<'a>> where Self: 'a;

    fn has_value(&self) -> bool {
        flag_is_set(&self.flag) && self.inner.has_value()
    }

    fn value_id(&self) -> Self::Id<'_> {
        flag_is_set(&self.flag).then(|| self.inner.value_id())
    }

    fn with<R>(&self, f: impl FnOnce(&S::Value) -> R) -> Result<R> {
        if !flag_is_set(&self.flag) {
            return Err(Error::NoValue);
        }
        self.inner.with(f)
    }
}

impl<S: WriteSignal, F: ReadSignal<Value = bool>> WriteSignal for Masked<S, F> {
    fn ready_to_write(&self) -> bool {
        flag_is_set(&self.flag) && self.inner.ready_to_write()
    }

    fn write(&self, value: S::Value) -> Result<()> {
        if !flag_is_set(&self.flag) {
            return Err(Error::NotReady);
        }
        self.inner.write(value)
    }
}

/// Reads pass through; writes are accepted only while `flag` is set.
#[derive(Clone)]
pub struct MaskedWrites<S, F> {
    inner: S,
    flag: F,
}

pub fn mask_writes<S, F>(signal: S, flag: F) -> MaskedWrites<S, F::Signal>
where
    S: Signal,
    F: IntoReadSignal,
    F::Signal: ReadSignal<Value = bool>,
{
    MaskedWrites {
        inner: signal,
        flag: flag.into_read_signal(),
    }
}

impl<S: Signal, F> Signal for MaskedWrites<S, F> {
    type Value = S::Value;
}

impl<S: ReadSignal, F> ReadSignal for MaskedWrites<S, F> {
    type Id<'a> = S::Id<'a> where Self: 'a;

    fn has_value(&self) -> bool {
        self.inner.has_value()
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.inner.value_id()
    }

    fn with<R>(&self, f: impl FnOnce(&S::Value) -> R) -> Result<R> {
        self.inner.with(f)
    }
}

impl<S: WriteSignal, F: ReadSignal<Value = bool>> WriteSignal for MaskedWrites<S, F> {
    fn ready_to_write(&self) -> bool {
        flag_is_set(&self.flag) && self.inner.ready_to_write()
    }

    fn write(&self, value: S::Value) -> Result<()> {
        if !flag_is_set(&self.flag) {
            return Err(Error::NotReady);
        }
        self.inner.write(value)
    }
}

// ----------------------------------------------------------------------------
// Values
// ----------------------------------------------------------------------------

/// Falls back to a default when the primary signal has no value. Writes go
/// to the primary signal.
#[derive(Clone)]
pub struct AddDefault<P, D> {
    primary: P,
    default: D,
}

pub fn add_default<P, D>(primary: P, default: D) -> AddDefault<P, D::Signal>
where
    P: ReadSignal,
    D: IntoReadSignal,
    D::Signal: ReadSignal<Value = P::Value>,
{
    AddDefault {
        primary,
        default: default.into_read_signal(),
    }
}

impl<P: Signal, D> Signal for AddDefault<P, D> {
    type Value = P::Value;
}

impl<P, D> ReadSignal for AddDefault<P, D>
where
    P: ReadSignal,
    D: ReadSignal<Value = P::Value>,
{
    type Id<'a> = IdPair<Option<P::Id<'a>>, Option<D::Id<'a>>> where Self: 'a;

    fn has_value(&self) -> bool {
        self.primary.has_value() || self.default.has_value()
    }

    fn value_id(&self) -> Self::Id<'_> {
        if self.primary.has_value() {
            IdPair(Some(self.primary.value_id()), None)
        } else {
            IdPair(None, Some(self.default.value_id()))
        }
    }

    fn with<R>(&self, f: impl FnOnce(&P::Value) -> R) -> Result<R> {
        if self.primary.has_value() {
            self.primary.with(f)
        } else {
            self.default.with(f)
        }
    }
}

impl<P: WriteSignal, D> WriteSignal for AddDefault<P, D> {
    fn ready_to_write(&self) -> bool {
        self.primary.ready_to_write()
    }

    fn write(&self, value: P::Value) -> Result<()> {
        self.primary.write(value)
    }
}

/// Replaces the wrapped signal's (possibly expensive, nested) value id
/// with a copy of the value.
#[derive(Clone)]
pub struct SimplifyId<S>(S);

pub fn simplify_id<S: ReadSignal>(signal: S) -> SimplifyId<S> {
    SimplifyId(signal)
}

impl<S: Signal> Signal for SimplifyId<S> {
    type Value = S::Value;
}

impl<S> ReadSignal for SimplifyId<S>
where
    S: ReadSignal,
    S::Value: IdValue,
{
    type Id<'a> = Option<SimpleId<S::Value>> where Self: 'a;

    fn has_value(&self) -> bool {
        self.0.has_value()
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.0.read().ok().map(SimpleId)
    }

    fn with<R>(&self, f: impl FnOnce(&S::Value) -> R) -> Result<R> {
        self.0.with(f)
    }
}

impl<S: WriteSignal> WriteSignal for SimplifyId<S> {
    fn ready_to_write(&self) -> bool {
        self.0.ready_to_write()
    }

    fn write(&self, value: S::Value) -> Result<()> {
        self.0.write(value)
    }
}

/// Whether the wrapped signal has a value, as a signal that always has one.
#[derive(Clone)]
pub struct Presence<S>(S);

pub fn presence<S: ReadSignal>(signal: S) -> Presence<S> {
    Presence(signal)
}

impl<S> Signal for Presence<S> {
    type Value = bool;
}

impl<S: ReadSignal> ReadSignal for Presence<S> {
    type Id<'a> = SimpleId<bool> where Self: 'a;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> SimpleId<bool> {
        SimpleId(self.0.has_value())
    }

    fn with<R>(&self, f: impl FnOnce(&bool) -> R) -> Result<R> {
        Ok(f(&self.0.has_value()))
    }
}

/// Whether the wrapped signal is ready to write, as a signal.
#[derive(Clone)]
pub struct WriteReadiness<S>(S);

pub fn write_readiness<S: WriteSignal>(signal: S) -> WriteReadiness<S> {
    WriteReadiness(signal)
}

impl<S> Signal for WriteReadiness<S> {
    type Value = bool;
}

impl<S: WriteSignal> ReadSignal for WriteReadiness<S> {
    type Id<'a> = SimpleId<bool> where Self: 'a;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> SimpleId<bool> {
        SimpleId(self.0.ready_to_write())
    }

    fn with<R>(&self, f: impl FnOnce(&bool) -> R) -> Result<R> {
        Ok(f(&self.0.ready_to_write()))
    }
}

/// Treats a signal carrying `Option<T>` as a signal carrying `T` that has
/// no value while the option is `None`.
#[derive(Clone)]
pub struct UnwrapOption<S>(S);

pub fn unwrap_option<S, T>(signal: S) -> UnwrapOption<S>
where
    S: Signal<Value = Option<T>>,
{
    UnwrapOption(signal)
}

impl<S, T> Signal for UnwrapOption<S>
where
    S: Signal<Value = Option<T>>,
{
    type Value = T;
}

impl<S, T> ReadSignal for UnwrapOption<S>
where
    S: ReadSignal<Value = Option<T>>,
{
    type Id<'a> = S::Id<'a> where Self: 'a;

    fn has_value(&self) -> bool {
        self.0.has_value() && self.0.with(Option::is_some).unwrap_or(false)
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.0.value_id()
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.0.with(|value| value.as_ref().map(f))?.ok_or(Error::NoValue)
    }
}

impl<S, T> WriteSignal for UnwrapOption<S>
where
    S: WriteSignal<Value = Option<T>>,
{
    fn ready_to_write(&self) -> bool {
        self.0.ready_to_write()
    }

    fn write(&self, value: T) -> Result<()> {
        self.0.write(Some(value))
    }
}

impl<S, T> ClearSignal for UnwrapOption<S>
where
    S: WriteSignal<Value = Option<T>>,
{
    fn clear(&self) -> Result<()> {
        self.0.write(None)
    }
}

// ----------------------------------------------------------------------------
// element
// ----------------------------------------------------------------------------

/// One element of a signal carrying a `Vec`.
#[derive(Clone)]
pub struct Element<S> {
    container: S,
    index: usize,
}

pub fn element<S, T>(container: S, index: usize) -> Element<S>
where
    S: Signal<Value = Vec<T>>,
{
    Element { container, index }
}

impl<S> Element<S> {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<S, T> Signal for Element<S>
where
    S: Signal<Value = Vec<T>>,
{
    type Value = T;
}

impl<S, T> ReadSignal for Element<S>
where
    S: ReadSignal<Value = Vec<T>>,
{
    type Id<'a> = IdPair<S::Id<'a>, SimpleId<usize>> where Self: 'a;

    fn has_value(&self) -> bool {
        self.container.has_value()
            && self
                .container
                .with(|items| self.index < items.len())
                .unwrap_or(false)
    }

    fn value_id(&self) -> Self::Id<'_> {
        IdPair(self.container.value_id(), SimpleId(self.index))
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.container
            .with(|items| items.get(self.index).map(f))?
            .ok_or(Error::NoValue)
    }
}

impl<S, T> WriteSignal for Element<S>
where
    S: ReadSignal<Value = Vec<T>> + WriteSignal,
    T: Clone,
{
    fn ready_to_write(&self) -> bool {
        self.container.ready_to_write() && self.has_value()
    }

    fn write(&self, value: T) -> Result<()> {
        let mut items = self.container.read()?;
        let slot = items.get_mut(self.index).ok_or(Error::NotReady)?;
        *slot = value;
        self.container.write(items)
    }
}
