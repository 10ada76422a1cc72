//! Timer Event Scheduler
//!
//! Holds callbacks that should fire at a given tick. Requests are delivered
//! in trigger-time order, first-scheduled first among equal times, and never
//! before their trigger time. A request scheduled while a frame's requests
//! are being delivered waits for the next frame, so a callback that
//! reschedules itself cannot spin.
//!
//! Tick counts wrap, so all comparisons are relative to `now`.

use super::{ticks_between, MillisecondCount};

struct TimerRequest<C> {
    trigger_time: MillisecondCount,
    callback: C,
    frame_issued: u64,
}

/// Pending timer callbacks of type `C`.
pub struct TimerScheduler<C> {
    requests: Vec<TimerRequest<C>>,
    frame_counter: u64,
}

impl<C> Default for TimerScheduler<C> {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            frame_counter: 0,
        }
    }
}

impl<C> TimerScheduler<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` to fire at `trigger_time`.
    pub fn schedule_callback(&mut self, callback: C, trigger_time: MillisecondCount) {
        self.requests.push(TimerRequest {
            trigger_time,
            callback,
            frame_issued: self.frame_counter,
        });
    }

    pub fn has_scheduled_callbacks(&self) -> bool {
        !self.requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Milliseconds until the earliest request fires, zero if one is
    /// already due, `None` if nothing is scheduled.
    pub fn time_until_next_callback(&self, now: MillisecondCount) -> Option<MillisecondCount> {
        let next = self
            .requests
            .iter()
            .map(|request| request.trigger_time)
            .reduce(|earliest, time| {
                if ticks_between(time, earliest) > 0 {
                    time
                } else {
                    earliest
                }
            })?;
        Some(ticks_between(now, next).max(0) as MillisecondCount)
    }

    /// Start a new delivery frame. Requests scheduled from here on are held
    /// back until the next frame.
    pub fn begin_frame(&mut self) {
        self.frame_counter += 1;
    }

    /// Remove and return the earliest request that is due at `now`.
    pub fn pop_ready(&mut self, now: MillisecondCount) -> Option<(MillisecondCount, C)> {
        let mut next: Option<usize> = None;
        for (index, request) in self.requests.iter().enumerate() {
            if request.frame_issued == self.frame_counter
                || ticks_between(request.trigger_time, now) < 0
            {
                continue;
            }
            let earlier = match next {
                Some(current) => {
                    ticks_between(request.trigger_time, self.requests[current].trigger_time) > 0
                }
                None => true,
            };
            if earlier {
                next = Some(index);
            }
        }
        let request = self.requests.remove(next?);
        Some((request.trigger_time, request.callback))
    }

    /// Deliver every request that is due at `now`, in order.
    pub fn invoke_ready_callbacks(
        &mut self,
        now: MillisecondCount,
        mut deliver: impl FnMut(&mut Self, MillisecondCount, C),
    ) {
        self.begin_frame();
        while let Some((trigger_time, callback)) = self.pop_ready(now) {
            deliver(self, trigger_time, callback);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_trigger_order() {
        let mut scheduler = TimerScheduler::new();
        scheduler.schedule_callback("late", 30);
        scheduler.schedule_callback("early", 10);
        scheduler.schedule_callback("middle", 20);

        let mut delivered = Vec::new();
        scheduler.invoke_ready_callbacks(25, |_, _, name| delivered.push(name));
        assert_eq!(delivered, vec!["early", "middle"]);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn ties_are_first_in_first_out() {
        let mut scheduler = TimerScheduler::new();
        for name in ["a", "b", "c"] {
            scheduler.schedule_callback(name, 5);
        }
        let mut delivered = Vec::new();
        scheduler.invoke_ready_callbacks(5, |_, _, name| delivered.push(name));
        assert_eq!(delivered, vec!["a", "b", "c"]);
    }

    #[test]
    fn never_fires_early() {
        let mut scheduler = TimerScheduler::new();
        scheduler.schedule_callback((), 100);
        let mut count = 0;
        scheduler.invoke_ready_callbacks(99, |_, _, ()| count += 1);
        assert_eq!(count, 0);
        assert_eq!(scheduler.time_until_next_callback(99), Some(1));
        assert_eq!(scheduler.time_until_next_callback(150), Some(0));
    }

    #[test]
    fn rescheduled_requests_wait_for_next_frame() {
        let mut scheduler = TimerScheduler::new();
        scheduler.schedule_callback(1, 0);
        let mut count = 0;
        scheduler.invoke_ready_callbacks(10, |scheduler, _, n| {
            count += 1;
            scheduler.schedule_callback(n + 1, 0);
        });
        assert_eq!(count, 1);
        assert!(scheduler.has_scheduled_callbacks());

        scheduler.invoke_ready_callbacks(10, |_, _, n| assert_eq!(n, 2));
        assert!(!scheduler.has_scheduled_callbacks());
    }

    #[test]
    fn handles_wrapping_tick_counts() {
        let mut scheduler = TimerScheduler::new();
        let near_wrap = MillisecondCount::MAX - 5;
        scheduler.schedule_callback("after-wrap", near_wrap.wrapping_add(10));
        scheduler.schedule_callback("before-wrap", near_wrap);

        let mut delivered = Vec::new();
        scheduler.invoke_ready_callbacks(near_wrap.wrapping_add(20), |_, _, name| {
            delivered.push(name)
        });
        assert_eq!(delivered, vec!["before-wrap", "after-wrap"]);
    }

    #[test]
    fn empty_scheduler_has_no_next_callback() {
        let scheduler = TimerScheduler::<()>::new();
        assert_eq!(scheduler.time_until_next_callback(0), None);
    }
}
