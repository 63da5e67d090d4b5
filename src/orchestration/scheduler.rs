//! Debounce timers that coalesce bursts of ledger mutations into one
//! recompute per timer.
//!
//! The scheduler only tracks deadlines; the controller sleeps until
//! [`UpdateScheduler::next_deadline`] and then drains what is due.

use std::time::Duration;
use tokio::time::Instant;

/// The independently debounced recompute jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// League and game views.
    Summaries,
    /// Counterparty view (backend fetch).
    Counterparties,
}

impl Timer {
    pub const ALL: [Timer; 2] = [Timer::Summaries, Timer::Counterparties];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceDelays {
    /// After a mutation that created a new ledger entry.
    pub new_entry: Duration,
    /// After a mutation that replaced an existing entry.
    pub update: Duration,
}

impl Default for DebounceDelays {
    fn default() -> Self {
        Self {
            new_entry: Duration::from_millis(100),
            update: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    delays: DebounceDelays,
    summaries: Option<Instant>,
    counterparties: Option<Instant>,
}

impl UpdateScheduler {
    pub fn new(delays: DebounceDelays) -> Self {
        Self {
            delays,
            summaries: None,
            counterparties: None,
        }
    }

    fn slot(&mut self, timer: Timer) -> &mut Option<Instant> {
        match timer {
            Timer::Summaries => &mut self.summaries,
            Timer::Counterparties => &mut self.counterparties,
        }
    }

    pub fn deadline(&self, timer: Timer) -> Option<Instant> {
        match timer {
            Timer::Summaries => self.summaries,
            Timer::Counterparties => self.counterparties,
        }
    }

    /// Restart both timers after a ledger mutation. A pending deadline is
    /// replaced, never queued behind.
    pub fn on_mutation(&mut self, is_new_entry: bool, now: Instant) {
        let delay = if is_new_entry {
            self.delays.new_entry
        } else {
            self.delays.update
        };
        for timer in Timer::ALL {
            *self.slot(timer) = Some(now + delay);
        }
    }

    /// Drop every pending deadline.
    pub fn cancel_all(&mut self) {
        for timer in Timer::ALL {
            *self.slot(timer) = None;
        }
    }

    pub fn is_idle(&self) -> bool {
        self.summaries.is_none() && self.counterparties.is_none()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.summaries, self.counterparties) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Clear and return every timer whose deadline is at or before `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<Timer> {
        let mut due = Vec::new();
        for timer in Timer::ALL {
            let slot = self.slot(timer);
            if slot.is_some_and(|deadline| deadline <= now) {
                *slot = None;
                due.push(timer);
            }
        }
        due
    }
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new(DebounceDelays::default())
    }
}
