//! Timer scheduling
//!
//! The engine never reads a clock. It hands deferred work to a `Scheduler`
//! as `TimerTask` values and the host delivers due firings back through
//! `AttributeSystem::advance`.

use crate::types::AttributeTag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Shortest period a repeating timer may have
pub const MIN_TIMER_PERIOD: f64 = 0.001;

/// Firings a repeating timer may catch up on within one `advance`
pub const MAX_CATCH_UP_FIRINGS: u32 = 10_000;

/// Opaque handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        TimerHandle(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Deferred work the engine asks to be called back with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimerTask {
    /// Periodic regeneration of one attribute
    RegenTick(AttributeTag),
    /// Expiry of a temporary modifier
    RevertModifier { tag: AttributeTag, amount: f64 },
}

/// A timer that came due
#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub handle: TimerHandle,
    pub task: TimerTask,
    /// Scheduler time the timer was due at
    pub due: f64,
}

/// Host-provided timer service
///
/// Implementations must tolerate `cancel` on a handle that already fired or
/// was never issued.
pub trait Scheduler {
    /// Run `task` once after `delay` seconds
    fn schedule_once(&mut self, delay: f64, task: TimerTask) -> TimerHandle;

    /// Run `task` every `period` seconds until cancelled
    fn schedule_repeating(&mut self, period: f64, task: TimerTask) -> TimerHandle;

    fn cancel(&mut self, handle: TimerHandle);

    fn is_active(&self, handle: TimerHandle) -> bool;

    /// Take the earliest timer due at or before `deadline` and move the clock
    /// to its due time
    ///
    /// Timers scheduled after this call are anchored at that due time, so
    /// work started by a firing can come due within the same `deadline`.
    fn pop_due(&mut self, deadline: f64) -> Option<Firing>;

    /// Move the clock to `deadline` once nothing more is due
    fn settle(&mut self, deadline: f64);

    /// Current scheduler time in seconds
    fn now(&self) -> f64;

    /// Deadline `delta` seconds from now
    ///
    /// Negative or non-finite deltas do not move the clock.
    fn deadline(&self, delta: f64) -> f64 {
        let now = self.now();
        let deadline = now + delta;
        if delta.is_finite() && delta > 0.0 && deadline.is_finite() {
            deadline
        } else {
            if !delta.is_finite() {
                warn!("Ignoring non-finite time step {}", delta);
            }
            now
        }
    }

    /// Move time forward and return every firing that came due, in due order
    fn advance(&mut self, delta: f64) -> Vec<Firing> {
        let deadline = self.deadline(delta);
        let mut fired = Vec::new();
        while let Some(firing) = self.pop_due(deadline) {
            fired.push(firing);
        }
        self.settle(deadline);
        fired
    }
}

#[derive(Debug, Clone)]
struct Timer {
    due: f64,
    period: Option<f64>,
    task: TimerTask,
    /// Firings since the last `settle`
    caught_up: u32,
}

/// Deterministic scheduler driven entirely by the host
///
/// A repeating timer fires once per elapsed period, up to
/// `MAX_CATCH_UP_FIRINGS` per `settle`; past that it skips ahead to its
/// first period after the deadline.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    now: f64,
    next_id: u64,
    timers: BTreeMap<u64, Timer>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live timers
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    fn insert(&mut self, delay: f64, period: Option<f64>, task: TimerTask) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let delay = if delay.is_finite() { delay.max(0.0) } else { f64::MAX };
        self.timers.insert(
            id,
            Timer {
                due: self.now + delay,
                period,
                task,
                caught_up: 0,
            },
        );
        TimerHandle(id)
    }

    /// Earliest timer due at or before `deadline`; ties go to the older handle
    fn next_due(&self, deadline: f64) -> Option<u64> {
        self.timers
            .iter()
            .filter(|(_, t)| t.due <= deadline)
            .min_by(|a, b| a.1.due.total_cmp(&b.1.due).then(a.0.cmp(b.0)))
            .map(|(id, _)| *id)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&mut self, delay: f64, task: TimerTask) -> TimerHandle {
        self.insert(delay, None, task)
    }

    fn schedule_repeating(&mut self, period: f64, task: TimerTask) -> TimerHandle {
        let period = if period.is_finite() {
            period.max(MIN_TIMER_PERIOD)
        } else {
            f64::MAX
        };
        self.insert(period, Some(period), task)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.remove(&handle.0);
    }

    fn is_active(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle.0)
    }

    fn pop_due(&mut self, deadline: f64) -> Option<Firing> {
        let id = self.next_due(deadline)?;
        let timer = self.timers.get_mut(&id)?;
        let firing = Firing {
            handle: TimerHandle(id),
            task: timer.task.clone(),
            due: timer.due,
        };
        self.now = self.now.max(timer.due);

        let period = timer.period;
        match period {
            Some(period) => {
                timer.caught_up += 1;
                timer.due += period;
                if timer.caught_up >= MAX_CATCH_UP_FIRINGS && timer.due <= deadline {
                    let skipped = ((deadline - timer.due) / period).floor() + 1.0;
                    timer.due += skipped * period;
                    if timer.due <= deadline {
                        timer.due = deadline + period;
                    }
                    warn!("Timer {} fell behind, skipped {} periods", id, skipped);
                }
            }
            None => {
                self.timers.remove(&id);
            }
        }
        Some(firing)
    }

    fn settle(&mut self, deadline: f64) {
        self.now = self.now.max(deadline);
        for timer in self.timers.values_mut() {
            timer.caught_up = 0;
        }
    }

    fn now(&self) -> f64 {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tags;

    #[test]
    fn test_once_fires_after_delay() {
        let mut scheduler = ManualScheduler::new();
        let handle = scheduler.schedule_once(
            5.0,
            TimerTask::RevertModifier {
                tag: tags::HEALTH,
                amount: -15.0,
            },
        );
        assert!(scheduler.advance(4.0).is_empty());
        assert!(scheduler.is_active(handle));

        let fired = scheduler.advance(1.0);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].handle, handle);
        assert!(!scheduler.is_active(handle));
        assert!(scheduler.advance(10.0).is_empty());
    }

    #[test]
    fn test_repeating_fires_each_period() {
        let mut scheduler = ManualScheduler::new();
        let handle = scheduler.schedule_repeating(1.0, TimerTask::RegenTick(tags::MANA));

        assert_eq!(scheduler.advance(1.0).len(), 1);
        assert_eq!(scheduler.advance(2.5).len(), 2);
        assert!(scheduler.is_active(handle));
        // 3.0 elapsed so far plus 0.5 carried over
        assert_eq!(scheduler.advance(0.5).len(), 1);
    }

    #[test]
    fn test_cancel_stops_firing() {
        let mut scheduler = ManualScheduler::new();
        let handle = scheduler.schedule_repeating(1.0, TimerTask::RegenTick(tags::MANA));
        scheduler.cancel(handle);
        assert!(!scheduler.is_active(handle));
        assert!(scheduler.advance(5.0).is_empty());
        // Cancelling twice is harmless
        scheduler.cancel(handle);
    }

    #[test]
    fn test_firings_are_ordered_by_due_time() {
        let mut scheduler = ManualScheduler::new();
        let slow = scheduler.schedule_repeating(2.0, TimerTask::RegenTick(tags::HEALTH));
        let fast = scheduler.schedule_repeating(1.5, TimerTask::RegenTick(tags::MANA));

        let handles: Vec<_> = scheduler.advance(4.0).iter().map(|f| f.handle).collect();
        // due: fast 1.5, slow 2.0, fast 3.0, slow 4.0
        assert_eq!(handles, vec![fast, slow, fast, slow]);
    }

    #[test]
    fn test_zero_period_is_bounded() {
        let mut scheduler = ManualScheduler::new();
        scheduler.schedule_repeating(0.0, TimerTask::RegenTick(tags::STAMINA));
        let fired = scheduler.advance(0.01);
        assert!(!fired.is_empty());
        assert!(fired.len() <= 11);
    }

    #[test]
    fn test_non_finite_delta_does_not_move_clock() {
        let mut scheduler = ManualScheduler::new();
        scheduler.schedule_repeating(1.0, TimerTask::RegenTick(tags::MANA));

        assert!(scheduler.advance(f64::INFINITY).is_empty());
        assert!(scheduler.advance(f64::NAN).is_empty());
        assert!((scheduler.now() - 0.0).abs() < f64::EPSILON);
        assert_eq!(scheduler.advance(1.0).len(), 1);
    }

    #[test]
    fn test_huge_delta_catch_up_is_capped() {
        let mut scheduler = ManualScheduler::new();
        let handle = scheduler.schedule_repeating(1.0, TimerTask::RegenTick(tags::STAMINA));

        let fired = scheduler.advance(1.0e12);
        assert_eq!(fired.len(), MAX_CATCH_UP_FIRINGS as usize);
        assert!(scheduler.is_active(handle));

        // Skipped ahead past the deadline, then fires normally again
        assert!((scheduler.now() - 1.0e12).abs() < f64::EPSILON);
        assert_eq!(scheduler.advance(1.5).len(), 1);
    }

    #[test]
    fn test_pop_due_moves_clock_to_due_time() {
        let mut scheduler = ManualScheduler::new();
        scheduler.schedule_once(2.0, TimerTask::RegenTick(tags::HEALTH));

        let firing = scheduler.pop_due(10.0).unwrap();
        assert!((firing.due - 2.0).abs() < f64::EPSILON);
        assert!((scheduler.now() - 2.0).abs() < f64::EPSILON);

        // Scheduled from inside the batch: anchored at 2.0, due at 3.0
        let late = scheduler.schedule_once(1.0, TimerTask::RegenTick(tags::MANA));
        let next = scheduler.pop_due(10.0).unwrap();
        assert_eq!(next.handle, late);
        assert!((next.due - 3.0).abs() < f64::EPSILON);

        assert!(scheduler.pop_due(10.0).is_none());
        scheduler.settle(10.0);
        assert!((scheduler.now() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clock_advances() {
        let mut scheduler = ManualScheduler::new();
        scheduler.advance(1.5);
        scheduler.advance(-3.0);
        assert!((scheduler.now() - 1.5).abs() < f64::EPSILON);
    }
}
