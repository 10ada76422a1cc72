//! Signal Traits
//!
//! A signal is a handle to a value that may or may not be available. Signals
//! do not own state in general; they are cheap views that are re-created on
//! every pass and combined into larger expressions.
//!
//! # Capabilities
//!
//! Capabilities are expressed as traits, so a function that only reads its
//! argument can accept anything readable:
//!
//! - [`ReadSignal`]: the value may be inspected, and it carries a *value
//!   id*, a cheap identity that changes whenever the value does.
//! - [`WriteSignal`]: a new value may be written.
//! - [`ClearSignal`]: the value may be removed.
//! - [`MoveSignal`]: the value may be moved out.
//!
//! # Value Ids
//!
//! Comparing value ids instead of values is what lets caches (derived
//! values, content caching, change detection) stay cheap. An id must change
//! whenever the value changes; it may also change when the value did not
//! (that only costs a recomputation).

use crate::error::{Error, Result};
use crate::id::IdInterface;

/// The value type shared by all capabilities of a signal.
pub trait Signal {
    type Value;
}

/// A signal that can be read.
pub trait ReadSignal: Signal {
    /// The identity type of the signal's value.
    type Id<'a>: IdInterface
    where
        Self: 'a;

    /// Whether a value is currently available.
    fn has_value(&self) -> bool;

    /// Identity of the current value. Only meaningful while
    /// [`has_value`](Self::has_value) is true.
    fn value_id(&self) -> Self::Id<'_>;

    /// Run `f` against the current value.
    ///
    /// Fails with [`Error::NoValue`] when there is none.
    fn with<R>(&self, f: impl FnOnce(&Self::Value) -> R) -> Result<R>;

    /// A copy of the current value.
    fn read(&self) -> Result<Self::Value>
    where
        Self::Value: Clone,
    {
        self.with(Clone::clone)
    }
}

/// A signal that can be written.
pub trait WriteSignal: Signal {
    /// Whether [`write`](Self::write) would currently succeed.
    fn ready_to_write(&self) -> bool;

    fn write(&self, value: Self::Value) -> Result<()>;
}

/// A signal whose value can be removed.
pub trait ClearSignal: Signal {
    fn clear(&self) -> Result<()>;
}

/// A signal whose value can be moved out, leaving it empty or defaulted.
pub trait MoveSignal: ReadSignal {
    fn move_out(&self) -> Result<Self::Value>;
}

/// Readable and writable.
pub trait DuplexSignal: ReadSignal + WriteSignal {}

impl<S: ReadSignal + WriteSignal> DuplexSignal for S {}

// ----------------------------------------------------------------------------
// References
// ----------------------------------------------------------------------------

impl<S: Signal + ?Sized> Signal for &S {
    type Value = S::Value;
}

impl<S: ReadSignal> ReadSignal for &S {
    type Id<'a> = S::Id<'a> where Self: 'a;

    fn has_value(&self) -> bool {
        (**self).has_value()
    }

    fn value_id(&self) -> Self::Id<'_> {
        (**self).value_id()
    }

    fn with<R>(&self, f: impl FnOnce(&Self::Value) -> R) -> Result<R> {
        (**self).with(f)
    }
}

impl<S: WriteSignal + ?Sized> WriteSignal for &S {
    fn ready_to_write(&self) -> bool {
        (**self).ready_to_write()
    }

    fn write(&self, value: Self::Value) -> Result<()> {
        (**self).write(value)
    }
}

impl<S: ClearSignal + ?Sized> ClearSignal for &S {
    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

impl<S: MoveSignal> MoveSignal for &S {
    fn move_out(&self) -> Result<Self::Value> {
        (**self).move_out()
    }
}

// ----------------------------------------------------------------------------
// Free functions
// ----------------------------------------------------------------------------

pub fn signal_has_value<S: ReadSignal>(signal: &S) -> bool {
    signal.has_value()
}

pub fn signal_ready_to_write<S: WriteSignal>(signal: &S) -> bool {
    signal.ready_to_write()
}

pub fn read_signal<S>(signal: &S) -> Result<S::Value>
where
    S: ReadSignal,
    S::Value: Clone,
{
    signal.read()
}

/// Write `value` to `signal`, failing with [`Error::NotReady`] if the
/// signal is not ready for writing.
pub fn write_signal<S: WriteSignal>(signal: &S, value: S::Value) -> Result<()> {
    if !signal.ready_to_write() {
        return Err(Error::NotReady);
    }
    signal.write(value)
}
