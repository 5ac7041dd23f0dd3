use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Latest deadline used when a delay overflows the clock (about 30 years)
pub const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Unique identifier for a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A one-shot timer carrying its payload
#[derive(Debug)]
struct Timer<T> {
    fire_at: Instant,
    payload: T,
}

/// One-shot timers keyed by id, fired by explicit ticks
#[derive(Debug)]
pub struct TimerQueue<T> {
    timers: HashMap<TimerId, Timer<T>>,
    next_id: u64,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
            next_id: 0,
        }
    }

    /// Schedule a payload to fire after a delay from now
    ///
    /// Delays past what an [`Instant`] can represent are capped at
    /// [`FAR_FUTURE`] from now.
    pub fn schedule(&mut self, delay: Duration, payload: T) -> TimerId {
        let now = Instant::now();
        let fire_at = now
            .checked_add(delay)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        self.schedule_at(fire_at, payload)
    }

    /// Schedule a payload to fire at a fixed instant
    pub fn schedule_at(&mut self, fire_at: Instant, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(id, Timer { fire_at, payload });
        id
    }

    /// Remove and return every timer due at `now`
    ///
    /// Fired timers come out in deadline order; timers sharing a deadline come
    /// out in scheduling order.
    pub fn take_due(&mut self, now: Instant) -> Vec<(TimerId, T)> {
        let mut due: Vec<(Instant, TimerId)> = self
            .timers
            .iter()
            .filter(|(_, timer)| now >= timer.fire_at)
            .map(|(id, timer)| (timer.fire_at, *id))
            .collect();
        due.sort();

        due.into_iter()
            .filter_map(|(_, id)| self.timers.remove(&id).map(|timer| (id, timer.payload)))
            .collect()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|timer| timer.fire_at).min()
    }

    /// Get the number of active timers
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
