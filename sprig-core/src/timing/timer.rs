//! Timers
//!
//! A timer is a component-level utility: starting it schedules a
//! [`TimerEvent`] aimed at the component, and on the pass that delivers the
//! event the timer reports itself as triggered.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::Result;
use crate::flow::{
    abort_traversal, detect_targeted_event, get_component_id, mark_dirty_component, ComponentId,
    Context, ExternalComponentId, TargetedEvent,
};

use super::MillisecondCount;

/// Delivered to a component when one of its timers fires.
#[derive(Debug, Clone, Copy)]
pub struct TimerEvent {
    pub target: ExternalComponentId,
    pub trigger_time: MillisecondCount,
}

impl TargetedEvent for TimerEvent {
    fn target(&self) -> ExternalComponentId {
        self.target
    }
}

#[derive(Default)]
struct TimerData {
    active: Cell<bool>,
    expected_trigger_time: Cell<MillisecondCount>,
}

/// Handle to the timer at a call site.
pub struct Timer<'c, 'a> {
    ctx: &'c Context<'a>,
    data: Rc<TimerData>,
    id: ComponentId,
    triggered: bool,
}

/// Fetch the timer at the current call site.
pub fn timer<'c, 'a>(ctx: &'c Context<'a>) -> Timer<'c, 'a> {
    let (data, _) = ctx.get_data::<TimerData>();
    let id = get_component_id(ctx);
    let triggered = match detect_targeted_event::<TimerEvent>(ctx, &id) {
        Some(event) => {
            data.active.get() && event.trigger_time == data.expected_trigger_time.get()
        }
        None => false,
    };
    if triggered {
        data.active.set(false);
        mark_dirty_component(ctx);
    }
    Timer {
        ctx,
        data,
        id,
        triggered,
    }
}

impl Timer<'_, '_> {
    /// Whether the timer is running.
    pub fn is_active(&self) -> bool {
        self.data.active.get()
    }

    /// Whether the timer fired on this pass.
    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Start (or restart) the timer.
    pub fn start(&self, duration: MillisecondCount) {
        let trigger_time = self.ctx.tick_count().wrapping_add(duration);
        self.data.active.set(true);
        self.data.expected_trigger_time.set(trigger_time);
        self.ctx
            .external()
            .schedule_timer_event(self.id.external(), trigger_time);
    }

    /// Stop the timer. A pending event will be ignored when it arrives.
    pub fn stop(&self) {
        self.data.active.set(false);
    }

    /// End the pass after handling a trigger, so no other component sees
    /// the event.
    pub fn finish(&self) -> Result<()> {
        if self.triggered {
            abort_traversal(self.ctx)
        } else {
            Ok(())
        }
    }
}
