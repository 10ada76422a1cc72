//! External Interface
//!
//! The system's only window onto the host: a clock, and three ways of
//! asking to be called back later. Hosts may implement these on other
//! threads, which is why the trait is `Send + Sync` and why asynchronous
//! work re-enters the system exclusively through
//! [`schedule_asynchronous_update`](ExternalInterface::schedule_asynchronous_update).

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::System;
use crate::error::Result;
use crate::flow::ExternalComponentId;
use crate::timing::{MillisecondCount, TickClock, TimerScheduler};

/// Work to be run against the system on its own thread.
pub type AsyncUpdate = Box<dyn FnOnce(&mut System) -> Result<()> + Send>;

/// Services the host provides to a system.
pub trait ExternalInterface: Send + Sync {
    /// Current time in milliseconds. Wraps.
    fn tick_count(&self) -> MillisecondCount;

    /// Ask the host for another refresh as soon as convenient.
    fn schedule_animation_refresh(&self);

    /// Deliver a [`TimerEvent`](crate::timing::TimerEvent) to `target` at
    /// `trigger_time`.
    fn schedule_timer_event(&self, target: ExternalComponentId, trigger_time: MillisecondCount);

    /// Run `update` against the system, on the system's thread, and refresh
    /// afterwards.
    fn schedule_asynchronous_update(&self, update: AsyncUpdate);
}

/// Work queued by the default interface, drained by the system.
#[derive(Default)]
pub(crate) struct SystemQueues {
    pub(crate) timers: Mutex<TimerScheduler<ExternalComponentId>>,
    pub(crate) updates: Mutex<VecDeque<AsyncUpdate>>,
}

/// An interface that keeps timers and asynchronous updates in internal
/// queues. The host drives them by calling
/// [`System::process_internal_timing_events`] and
/// [`System::process_asynchronous_updates`].
pub struct DefaultExternalInterface {
    clock: TickClock,
    queues: Arc<SystemQueues>,
}

impl DefaultExternalInterface {
    pub(crate) fn new(clock: TickClock, queues: Arc<SystemQueues>) -> Self {
        Self { clock, queues }
    }
}

impl ExternalInterface for DefaultExternalInterface {
    fn tick_count(&self) -> MillisecondCount {
        self.clock.now()
    }

    fn schedule_animation_refresh(&self) {
        tracing::trace!("animation refresh requested");
    }

    fn schedule_timer_event(&self, target: ExternalComponentId, trigger_time: MillisecondCount) {
        self.queues.timers.lock().schedule_callback(target, trigger_time);
    }

    fn schedule_asynchronous_update(&self, update: AsyncUpdate) {
        self.queues.updates.lock().push_back(update);
    }
}
