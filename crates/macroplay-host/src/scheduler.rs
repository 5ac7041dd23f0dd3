use std::time::{Duration, Instant};

use crate::continuation::Continuation;
use crate::timer::{TimerId, TimerQueue};

/// Deferred execution of suspended playback
///
/// Continuations handed to a scheduler are run exactly once, by the player's
/// tick, after at least their delay.
pub trait Scheduler {
    fn register_delayed(&mut self, continuation: Continuation, delay: Duration) -> TimerId;

    /// Remove the continuations whose delay elapsed, oldest deadline first
    fn take_due(&mut self, now: Instant) -> Vec<Continuation>;

    fn pending(&self) -> usize;

    fn next_deadline(&self) -> Option<Instant>;
}

impl Scheduler for TimerQueue<Continuation> {
    fn register_delayed(&mut self, continuation: Continuation, delay: Duration) -> TimerId {
        self.schedule(delay, continuation)
    }

    fn take_due(&mut self, now: Instant) -> Vec<Continuation> {
        TimerQueue::take_due(self, now)
            .into_iter()
            .map(|(_, continuation)| continuation)
            .collect()
    }

    fn pending(&self) -> usize {
        self.active_count()
    }

    fn next_deadline(&self) -> Option<Instant> {
        TimerQueue::next_deadline(self)
    }
}
