//! Traversal Context
//!
//! A [`Context`] is handed to the controller for every pass. It bundles the
//! data traversal, the event traversal, and the system state the controller
//! is allowed to see. Controller code only ever holds `&Context`; all of the
//! traversal state is interior-mutable, which lets guards and closures share
//! it freely while the pass runs.

use std::any::Any;
use std::cell::{Cell, RefCell, RefMut};
use std::rc::Rc;
use std::sync::Arc;

use super::components::ContainerPtr;
use super::events::EventTraversal;
use crate::error::Result;
use crate::graph::{DataBlock, KeyedData, ScopedDataTraversal};
use crate::id::SimpleId;
use crate::system::{ExternalInterface, SystemShared};
use crate::timing::MillisecondCount;

/// Everything a controller can reach during one pass.
pub struct Context<'a> {
    system: &'a SystemShared,
    data: RefCell<ScopedDataTraversal>,
    events: RefCell<EventTraversal>,
    event: RefCell<&'a mut (dyn Any + 'static)>,
    tick_count: Cell<Option<MillisecondCount>>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        system: &'a SystemShared,
        data: ScopedDataTraversal,
        events: EventTraversal,
        event: &'a mut (dyn Any + 'static),
    ) -> Self {
        Self {
            system,
            data: RefCell::new(data),
            events: RefCell::new(events),
            event: RefCell::new(event),
            tick_count: Cell::new(None),
        }
    }

    pub(crate) fn system(&self) -> &'a SystemShared {
        self.system
    }

    // ------------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------------

    /// Persistent storage for the current call site. The flag is `true` when
    /// the storage was just created.
    pub fn get_data<T: Default + 'static>(&self) -> (Rc<T>, bool) {
        self.data.borrow_mut().get_data()
    }

    /// Storage for the current call site that is discarded whenever the
    /// enclosing block's cache is cleared.
    pub fn get_cached_data<T: Default + 'static>(&self) -> (Rc<T>, bool) {
        self.data.borrow_mut().get_cached_data()
    }

    /// Cached storage paired with the identity of the inputs it was
    /// computed from. See [`KeyedData::refresh_key`].
    pub fn get_keyed_data<T: 'static>(&self) -> (Rc<RefCell<KeyedData<T>>>, bool) {
        self.get_cached_data()
    }

    /// Run `body` with `block` as the current data block.
    pub fn scoped_block<R>(
        &self,
        block: &Rc<DataBlock>,
        body: impl FnOnce(&Self) -> Result<R>,
    ) -> Result<R> {
        self.data.borrow_mut().enter_block(block.clone());
        let result = body(self);
        self.data.borrow_mut().leave_block(result.is_ok());
        result
    }

    pub fn gc_enabled(&self) -> bool {
        self.data.borrow().gc_enabled()
    }

    pub fn cache_clearing_enabled(&self) -> bool {
        self.data.borrow().cache_clearing_enabled()
    }

    pub(crate) fn abandon_data_traversal(&self) {
        self.data.borrow_mut().abandon();
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    pub(crate) fn event_traversal_mut(&self) -> RefMut<'_, EventTraversal> {
        self.events.borrow_mut()
    }

    /// Whether this pass is a refresh.
    pub fn is_refresh(&self) -> bool {
        self.events.borrow().is_refresh
    }

    /// Whether the current event is aimed at a single component.
    pub fn is_targeted(&self) -> bool {
        self.events.borrow().targeted
    }

    /// Whether `abort_traversal` has been called during this pass.
    pub fn traversal_aborted(&self) -> bool {
        self.events.borrow().aborted
    }

    /// Borrow the current event if it is an `E`.
    ///
    /// Returns `None` when the event is of another type, or when it is
    /// already borrowed by an enclosing handler.
    pub fn event<E: Any>(&self) -> Option<RefMut<'_, E>> {
        let event = self.event.try_borrow_mut().ok()?;
        RefMut::filter_map(event, |event| (**event).downcast_mut::<E>()).ok()
    }

    pub fn active_container(&self) -> Option<ContainerPtr> {
        self.events.borrow().active_container.clone()
    }

    // ------------------------------------------------------------------------
    // System
    // ------------------------------------------------------------------------

    /// The refresh counter of the owning system.
    pub fn refresh_counter(&self) -> u64 {
        self.system.refresh_counter.get()
    }

    /// Identity of everything the context itself contributes to content.
    /// Changes when the system's content is invalidated.
    pub fn content_id(&self) -> SimpleId<u64> {
        SimpleId(self.system.content_version.get())
    }

    pub fn external(&self) -> &Arc<dyn ExternalInterface> {
        &self.system.external
    }

    /// The tick count, sampled once per pass.
    pub fn tick_count(&self) -> MillisecondCount {
        match self.tick_count.get() {
            Some(ticks) => ticks,
            None => {
                let ticks = self.system.external.tick_count();
                self.tick_count.set(Some(ticks));
                ticks
            }
        }
    }
}
