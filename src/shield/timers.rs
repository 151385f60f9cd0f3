//! Deadline bookkeeping for the shield's one-shot timers
//!
//! The shield never sleeps itself; the event loop asks for the nearest
//! deadline and calls back into the shield once it has passed.

use std::collections::HashMap;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Shield fade-in after `activate()`
    ShieldFade,
    /// Slow fade from `Fading` to `Shown`
    IdleFade,
    /// Delay before widgets start loading
    WidgetLoad,
    /// Next widget construction step
    WidgetIdle,
    /// Shown -> Locked
    LockDelay,
    /// Floating widget relayout
    FloatTick,
    /// Unlock dialog fade-out
    DialogFade,
    /// Retake a modal grab lost while the shield is up
    GrabRetry,
}

#[derive(Debug, Default)]
pub struct Timers {
    deadlines: HashMap<TimerKind, Instant>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer, replacing any pending deadline of the same kind
    pub fn arm(&mut self, kind: TimerKind, after: Duration) {
        self.deadlines.insert(kind, Instant::now() + after);
    }

    /// Cancel a timer; cancelling an idle timer is fine
    pub fn cancel(&mut self, kind: TimerKind) {
        self.deadlines.remove(&kind);
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.deadlines.contains_key(&kind)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Timers due at `now`, earliest first
    pub fn due(&self, now: Instant) -> Vec<TimerKind> {
        let mut due: Vec<_> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(kind, deadline)| (*deadline, *kind))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);
        due.into_iter().map(|(_, kind)| kind).collect()
    }

    /// Disarm the timer if it is still due at `now`.
    ///
    /// Returns false when it was cancelled or re-armed in the meantime.
    pub fn take_if_due(&mut self, kind: TimerKind, now: Instant) -> bool {
        match self.deadlines.get(&kind) {
            Some(deadline) if *deadline <= now => {
                self.deadlines.remove(&kind);
                true
            }
            _ => false,
        }
    }
}
