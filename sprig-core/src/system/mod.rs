//! System
//!
//! A [`System`] ties everything together: it owns the data graph, the
//! controller, and the root component container, and it drives passes.
//!
//! # How Passes Work
//!
//! - [`System::refresh`] runs the controller with a [`RefreshEvent`]. State
//!   written during the pass dirties the root, in which case the controller
//!   runs again, until the root stays clean.
//!
//! - [`System::dispatch_event`] runs the controller once with an arbitrary
//!   event, visiting the whole tree, and then refreshes.
//!
//! - [`System::dispatch_targeted_event`] resolves the event's target,
//!   computes the routing path, and runs the controller so that only
//!   containers on that path execute. It too ends with a refresh.
//!
//! Errors that escape a pass are handed to the installed error handler. If
//! there is none, they are returned to the caller.
//!
//! # Threading
//!
//! A system is single-threaded. Other threads talk to it only through the
//! [`ExternalInterface`], whose asynchronous updates are queued and later
//! applied on the system's thread.

mod config;
mod external;

pub use config::SystemConfig;
pub use external::{AsyncUpdate, DefaultExternalInterface, ExternalInterface};

use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::sync::Arc;

use external::SystemQueues;

use crate::error::{Error, Result};
use crate::flow::{
    routing_path, ComponentContainer, ComponentRegistry, ContainerPtr, Context, EventTraversal,
    RefreshEvent, ScopedComponentContainer, TargetedEvent,
};
use crate::graph::{DataGraph, ScopedDataTraversal};
use crate::timing::{MillisecondCount, TickClock, TimerEvent};

/// The application's declarative UI function.
pub type Controller = Box<dyn FnMut(&Context<'_>) -> Result<()>>;

/// Receives errors that escape a pass.
pub type ErrorHandler = Box<dyn FnMut(&Error)>;

/// State shared between the system and the contexts it creates.
pub(crate) struct SystemShared {
    pub(crate) refresh_counter: Cell<u64>,
    pub(crate) refresh_needed: Cell<bool>,
    pub(crate) animation_requested: Cell<bool>,
    pub(crate) content_version: Cell<u64>,
    pub(crate) external: Arc<dyn ExternalInterface>,
    pub(crate) error_handler: RefCell<Option<ErrorHandler>>,
    pub(crate) registry: RefCell<ComponentRegistry>,
    pub(crate) config: SystemConfig,
}

impl SystemShared {
    /// Hand `error` to the error handler, or return it if there is none.
    pub(crate) fn report_error(&self, error: Error) -> Result<()> {
        let Ok(mut handler) = self.error_handler.try_borrow_mut() else {
            tracing::warn!(%error, "error raised inside the error handler");
            return Err(error);
        };
        match handler.as_mut() {
            Some(handler) => {
                tracing::debug!(%error, "error handed to error handler");
                handler(&error);
                Ok(())
            }
            None => Err(error),
        }
    }

    pub(crate) fn request_animation_refresh(&self) {
        self.refresh_needed.set(true);
        if !self.animation_requested.replace(true) {
            self.external.schedule_animation_refresh();
        }
    }
}

/// Configures and builds a [`System`].
#[derive(Default)]
pub struct SystemBuilder {
    config: SystemConfig,
    clock: Option<TickClock>,
    external: Option<Arc<dyn ExternalInterface>>,
    error_handler: Option<ErrorHandler>,
}

impl SystemBuilder {
    pub fn config(mut self, config: SystemConfig) -> Self {
        self.config = config;
        self
    }

    /// Clock used by the default external interface.
    pub fn clock(mut self, clock: TickClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the default external interface.
    pub fn external_interface(mut self, external: Arc<dyn ExternalInterface>) -> Self {
        self.external = Some(external);
        self
    }

    pub fn error_handler(mut self, handler: impl FnMut(&Error) + 'static) -> Self {
        self.error_handler = Some(Box::new(handler));
        self
    }

    pub fn build(
        self,
        controller: impl FnMut(&Context<'_>) -> Result<()> + 'static,
    ) -> System {
        let queues = Arc::new(SystemQueues::default());
        let external = self.external.unwrap_or_else(|| {
            Arc::new(DefaultExternalInterface::new(
                self.clock.unwrap_or_default(),
                queues.clone(),
            ))
        });
        System {
            data: DataGraph::new(),
            controller: Box::new(controller),
            root: ComponentContainer::new(),
            shared: SystemShared {
                refresh_counter: Cell::new(0),
                refresh_needed: Cell::new(true),
                animation_requested: Cell::new(false),
                content_version: Cell::new(0),
                external,
                error_handler: RefCell::new(self.error_handler),
                registry: RefCell::new(ComponentRegistry::default()),
                config: self.config,
            },
            queues,
        }
    }
}

/// A UI instance: data graph, controller, component tree.
pub struct System {
    data: DataGraph,
    controller: Controller,
    root: ContainerPtr,
    shared: SystemShared,
    queues: Arc<SystemQueues>,
}

impl System {
    /// A system with default configuration and the default external
    /// interface.
    pub fn new(controller: impl FnMut(&Context<'_>) -> Result<()> + 'static) -> Self {
        Self::builder().build(controller)
    }

    pub fn builder() -> SystemBuilder {
        SystemBuilder::default()
    }

    pub fn set_error_handler(&mut self, handler: impl FnMut(&Error) + 'static) {
        *self.shared.error_handler.borrow_mut() = Some(Box::new(handler));
    }

    pub fn clear_error_handler(&mut self) {
        *self.shared.error_handler.borrow_mut() = None;
    }

    /// Number of refreshes performed so far.
    pub fn refresh_counter(&self) -> u64 {
        self.shared.refresh_counter.get()
    }

    /// Whether something requested a refresh since the last one.
    pub fn refresh_needed(&self) -> bool {
        self.shared.refresh_needed.get()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.shared.config
    }

    pub fn data_graph(&self) -> &DataGraph {
        &self.data
    }

    pub fn root_component(&self) -> &ContainerPtr {
        &self.root
    }

    pub fn external(&self) -> &Arc<dyn ExternalInterface> {
        &self.shared.external
    }

    pub fn tick_count(&self) -> MillisecondCount {
        self.shared.external.tick_count()
    }

    /// Force every cached piece of content to be recomputed on the next
    /// refresh.
    pub fn invalidate_content(&mut self) {
        self.shared
            .content_version
            .set(self.shared.content_version.get() + 1);
        self.shared.refresh_needed.set(true);
    }

    // ------------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------------

    fn invoke_controller(
        &mut self,
        event: &mut (dyn Any + 'static),
        traversal: EventTraversal,
    ) -> Result<()> {
        let is_refresh = traversal.is_refresh;
        let data = ScopedDataTraversal::new(
            &self.data,
            is_refresh && self.shared.config.gc_enabled,
            is_refresh && self.shared.config.cache_clearing_enabled,
        );
        let ctx = Context::new(&self.shared, data, traversal, event);
        let result = {
            let scope = ScopedComponentContainer::with_container(&ctx, self.root.clone());
            if scope.is_on_route() {
                (self.controller)(&ctx)
            } else {
                Ok(())
            }
        };
        match result {
            Ok(()) => Ok(()),
            Err(error) => {
                ctx.abandon_data_traversal();
                if error.is_traversal_control() {
                    tracing::trace!("traversal aborted");
                    Ok(())
                } else {
                    Err(error)
                }
            }
        }
    }

    /// Run refresh passes until the component tree settles.
    pub fn refresh(&mut self) -> Result<()> {
        let counter = self.shared.refresh_counter.get() + 1;
        self.shared.refresh_counter.set(counter);
        self.shared.refresh_needed.set(false);
        self.shared.animation_requested.set(false);

        let max_passes = self.shared.config.max_refresh_passes.max(1);
        let mut passes = 0;
        loop {
            passes += 1;
            let outcome =
                self.invoke_controller(&mut RefreshEvent, EventTraversal::untargeted(true));
            if let Err(error) = outcome {
                return self.shared.report_error(error);
            }
            if !self.root.is_dirty() {
                break;
            }
            if passes >= max_passes {
                tracing::warn!(passes, "refresh did not settle; giving up for now");
                self.shared.refresh_needed.set(true);
                break;
            }
        }

        let interval = self.shared.config.component_registry_prune_interval.max(1);
        if counter % interval == 0 {
            self.shared.registry.borrow_mut().prune();
        }
        tracing::debug!(counter, passes, "refresh complete");
        Ok(())
    }

    /// Dispatch an untargeted event to the whole tree, then refresh.
    pub fn dispatch_event<E: Any>(&mut self, event: &mut E) -> Result<()> {
        if TypeId::of::<E>() == TypeId::of::<RefreshEvent>() {
            return self.refresh();
        }
        tracing::debug!(event = type_name::<E>(), "dispatching event");
        if let Err(error) = self.invoke_controller(event, EventTraversal::untargeted(false)) {
            self.shared.report_error(error)?;
        }
        self.refresh()
    }

    /// Dispatch an event to its target component, then refresh.
    ///
    /// If the target no longer exists the event is dropped.
    pub fn dispatch_targeted_event<E: TargetedEvent>(&mut self, event: &mut E) -> Result<()> {
        let target = event.target();
        let container = self.shared.registry.borrow().resolve(target);
        match container {
            Some(container) => {
                let path = routing_path(&container);
                let rooted = path
                    .first()
                    .map_or(false, |head| ContainerPtr::ptr_eq(head, &self.root));
                if rooted {
                    tracing::debug!(
                        event = type_name::<E>(),
                        depth = path.len(),
                        "dispatching targeted event"
                    );
                    if let Err(error) = self.invoke_controller(event, EventTraversal::targeted(path))
                    {
                        self.shared.report_error(error)?;
                    }
                } else {
                    tracing::trace!(?target, "target is detached from the tree");
                }
            }
            None => tracing::trace!(?target, "target no longer exists"),
        }
        self.refresh()
    }

    // ------------------------------------------------------------------------
    // Internal queues
    // ------------------------------------------------------------------------

    /// Deliver every timer event due at `now` that was scheduled through the
    /// default external interface.
    pub fn process_internal_timing_events(&mut self, now: MillisecondCount) -> Result<()> {
        self.queues.timers.lock().begin_frame();
        loop {
            let next = self.queues.timers.lock().pop_ready(now);
            let Some((trigger_time, target)) = next else {
                break;
            };
            self.dispatch_targeted_event(&mut TimerEvent {
                target,
                trigger_time,
            })?;
        }
        Ok(())
    }

    /// Milliseconds until the next internally scheduled timer fires.
    pub fn time_until_next_timer(&self, now: MillisecondCount) -> Option<MillisecondCount> {
        self.queues.timers.lock().time_until_next_callback(now)
    }

    /// Apply one asynchronous update and refresh.
    pub fn run_update(&mut self, update: AsyncUpdate) -> Result<()> {
        update(self)?;
        self.refresh()
    }

    /// Apply every update queued through the default external interface.
    /// Returns how many were applied.
    pub fn process_asynchronous_updates(&mut self) -> Result<usize> {
        let mut applied = 0;
        loop {
            let next = self.queues.updates.lock().pop_front();
            let Some(update) = next else {
                break;
            };
            self.run_update(update)?;
            applied += 1;
        }
        Ok(applied)
    }

    pub fn has_pending_updates(&self) -> bool {
        !self.queues.updates.lock().is_empty()
    }
}
