//! Timing
//!
//! Tick counts, the timer event scheduler, and the components built on
//! them.
//!
//! Time is measured in milliseconds as a wrapping `u32`. Comparisons are
//! always made through [`ticks_between`], which stays correct across the
//! wrap as long as the two instants are less than ~24 days apart.

mod scheduler;
mod ticks;
mod timer;

pub use scheduler::TimerScheduler;
pub use ticks::TickClock;
pub use timer::{timer, Timer, TimerEvent};

use crate::flow::{mark_animating_component, Context};
use crate::reactive::{value, ValueSignal};

pub type MillisecondCount = u32;

/// Signed distance in ticks from `from` to `to`.
pub fn ticks_between(from: MillisecondCount, to: MillisecondCount) -> i32 {
    to.wrapping_sub(from) as i32
}

/// Request another refresh as soon as the host can deliver one, and mark
/// the active component as animating so cached content is revisited.
pub fn schedule_animation_refresh(ctx: &Context<'_>) {
    mark_animating_component(ctx);
    ctx.system().request_animation_refresh();
}

/// The current tick count. Reading it marks the component as animating.
pub fn get_raw_animation_tick_count(ctx: &Context<'_>) -> MillisecondCount {
    schedule_animation_refresh(ctx);
    ctx.tick_count()
}

/// The current tick count as a signal.
pub fn get_animation_tick_count(ctx: &Context<'_>) -> ValueSignal<MillisecondCount> {
    value(get_raw_animation_tick_count(ctx))
}

/// Ticks remaining until `end_time`, scheduling animation refreshes while
/// the count is positive.
pub fn get_raw_animation_ticks_left(
    ctx: &Context<'_>,
    end_time: MillisecondCount,
) -> MillisecondCount {
    let remaining = ticks_between(ctx.tick_count(), end_time);
    if remaining > 0 {
        if ctx.is_refresh() {
            schedule_animation_refresh(ctx);
        }
        remaining as MillisecondCount
    } else {
        0
    }
}
