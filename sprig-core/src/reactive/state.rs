//! Component State
//!
//! State lives in the data graph at the call site of [`get_state`] and is
//! read and written through a [`StateSignal`].
//!
//! # How State Works
//!
//! 1. The first pass through a call site creates the storage, empty.
//!
//! 2. While the storage is empty and the `initial` signal has a value, the
//!    value is copied in. This happens without marking anything dirty, so
//!    initialization does not trigger another refresh.
//!
//! 3. Every write bumps a version counter (the signal's value id) and marks
//!    the component that owns the state dirty, so the next refresh
//!    re-renders it.
//!
//! # Design Decisions
//!
//! The owning component is stored as a weak reference and rebound on every
//! refresh pass, so state written from an event handler after the
//! component has moved still dirties the right place.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::error::{Error, Result};
use crate::flow::{mark_dirty, ComponentContainer, Context};
use crate::id::SimpleId;

use super::basic::IntoReadSignal;
use super::signal::{ClearSignal, MoveSignal, ReadSignal, Signal, WriteSignal};

/// Backing storage for a piece of state.
pub struct StateStorage<T> {
    value: RefCell<Option<T>>,
    version: Cell<u64>,
    container: RefCell<Weak<ComponentContainer>>,
}

impl<T> Default for StateStorage<T> {
    fn default() -> Self {
        Self {
            value: RefCell::new(None),
            version: Cell::new(0),
            container: RefCell::new(Weak::new()),
        }
    }
}

impl<T> StateStorage<T> {
    fn bind(&self, ctx: &Context<'_>) {
        let active = ctx.active_container();
        *self.container.borrow_mut() = active.as_ref().map(Rc::downgrade).unwrap_or_default();
    }

    /// Store `value` without notifying anyone.
    fn initialize(&self, value: T) {
        *self.value.borrow_mut() = Some(value);
        self.version.set(self.version.get() + 1);
    }

    fn changed(&self) {
        self.version.set(self.version.get() + 1);
        if let Some(container) = self.container.borrow().upgrade() {
            mark_dirty(&container);
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.borrow().is_some()
    }

    pub fn version(&self) -> u64 {
        self.version.get()
    }
}

/// A duplex handle to component state.
pub struct StateSignal<T> {
    storage: Rc<StateStorage<T>>,
}

impl<T> Clone for StateSignal<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl<T> StateSignal<T> {
    /// Whether two handles refer to the same storage.
    pub fn same_state(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.storage, &other.storage)
    }
}

fn attach_state<T, I>(
    ctx: &Context<'_>,
    storage: Rc<StateStorage<T>>,
    initial: I,
) -> Result<StateSignal<T>>
where
    T: Clone + 'static,
    I: IntoReadSignal,
    I::Signal: ReadSignal<Value = T>,
{
    if ctx.is_refresh() {
        storage.bind(ctx);
    }
    if !storage.has_value() {
        let initial = initial.into_read_signal();
        if initial.has_value() {
            storage.initialize(initial.read()?);
        }
    }
    Ok(StateSignal { storage })
}

/// State that persists for as long as the call site stays in the data
/// graph.
///
/// ```rust,ignore
/// let count = get_state(ctx, 0)?;
/// count.write(count.read()? + 1)?;
/// ```
pub fn get_state<T, I>(ctx: &Context<'_>, initial: I) -> Result<StateSignal<T>>
where
    T: Clone + 'static,
    I: IntoReadSignal,
    I::Signal: ReadSignal<Value = T>,
{
    let (storage, _) = ctx.get_data::<StateStorage<T>>();
    attach_state(ctx, storage, initial)
}

/// Like [`get_state`], but the state is discarded (and reinitialized)
/// whenever the enclosing block's cache is cleared.
pub fn get_transient_state<T, I>(ctx: &Context<'_>, initial: I) -> Result<StateSignal<T>>
where
    T: Clone + 'static,
    I: IntoReadSignal,
    I::Signal: ReadSignal<Value = T>,
{
    let (storage, _) = ctx.get_cached_data::<StateStorage<T>>();
    attach_state(ctx, storage, initial)
}

impl<T> Signal for StateSignal<T> {
    type Value = T;
}

impl<T> ReadSignal for StateSignal<T> {
    type Id<'a> = SimpleId<u64> where Self: 'a;

    fn has_value(&self) -> bool {
        self.storage.has_value()
    }

    fn value_id(&self) -> SimpleId<u64> {
        SimpleId(self.storage.version())
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.storage.value.borrow().as_ref().map(f).ok_or(Error::NoValue)
    }
}

impl<T> WriteSignal for StateSignal<T> {
    fn ready_to_write(&self) -> bool {
        true
    }

    fn write(&self, value: T) -> Result<()> {
        *self.storage.value.borrow_mut() = Some(value);
        self.storage.changed();
        Ok(())
    }
}

impl<T> ClearSignal for StateSignal<T> {
    fn clear(&self) -> Result<()> {
        self.storage.value.borrow_mut().take();
        self.storage.changed();
        Ok(())
    }
}

impl<T> MoveSignal for StateSignal<T> {
    fn move_out(&self) -> Result<T> {
        let value = self.storage.value.borrow_mut().take().ok_or(Error::NoValue)?;
        self.storage.changed();
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::if_;
    use crate::id::IdInterface;
    use crate::reactive::empty;
    use crate::system::{System, SystemConfig};

    #[test]
    fn state_initializes_once_and_counts_writes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let mut system = System::new(move |ctx| {
            let count = get_state(ctx, 12)?;
            let value = count.read()?;
            log.borrow_mut().push(value);
            if value == 12 {
                count.write(13)?;
            }
            Ok(())
        });
        system.refresh().unwrap();
        assert_eq!(*seen.borrow(), vec![12, 13]);
    }

    #[test]
    fn empty_initial_values_leave_state_empty() {
        let mut system = System::new(|ctx| {
            let state = get_state(ctx, empty::<String>())?;
            assert!(!state.has_value());
            assert!(matches!(state.read(), Err(Error::NoValue)));
            Ok(())
        });
        system.refresh().unwrap();
    }

    #[test]
    fn initialization_does_not_dirty_the_component() {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let mut system = System::new(move |ctx| {
            counter.set(counter.get() + 1);
            get_state(ctx, "ready".to_owned())?;
            Ok(())
        });
        system.refresh().unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn writes_change_the_value_id() {
        let checked = Rc::new(Cell::new(false));
        let flag = checked.clone();
        let mut system = System::new(move |ctx| {
            let state = get_state(ctx, 1)?;
            if flag.replace(true) {
                return Ok(());
            }
            let before = state.value_id().clone_id();
            state.write(1)?;
            assert!(!state.value_id().equals(&*before));
            assert_eq!(state.move_out()?, 1);
            assert!(!state.has_value());
            state.write(5)?;
            state.clear()?;
            assert!(!state.has_value());
            Ok(())
        });
        system.refresh().unwrap();
        assert!(checked.get());
    }

    #[test]
    fn transient_state_resets_when_its_block_is_cleared() {
        let config = SystemConfig {
            gc_enabled: false,
            cache_clearing_enabled: true,
            ..SystemConfig::default()
        };
        let show = Rc::new(Cell::new(true));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (visible, log) = (show.clone(), seen.clone());
        let mut system = System::builder().config(config).build(move |ctx| {
            if_(ctx, visible.get(), |ctx| {
                let kept = get_state(ctx, 0)?;
                let transient = get_transient_state(ctx, 0)?;
                if transient.read()? == 0 {
                    kept.write(kept.read()? + 1)?;
                    transient.write(1)?;
                }
                log.borrow_mut().push((kept.read()?, transient.read()?));
                Ok(())
            })
        });
        system.refresh().unwrap();
        system.refresh().unwrap();
        assert_eq!(seen.borrow().last(), Some(&(1, 1)));

        show.set(false);
        system.refresh().unwrap();
        show.set(true);
        system.refresh().unwrap();
        // persistent state survived; transient state started over
        assert_eq!(seen.borrow().last(), Some(&(2, 1)));
    }
}
