use super::entry::TimerEntry;
use super::signal::WakeSignal;
use crate::timer::TimerId;

use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

pub(crate) enum Wakeup {
    /// The external wake signal was raised.
    Signal,
    /// The deadline armed for this timer is due.
    Timer(TimerId),
}

/// Deadline dispatcher owned exclusively by the loop thread.
///
/// Watches a set of armed deadlines plus one external wake signal and hands
/// back one wakeup at a time. `wait` returns `None` once nothing is armed
/// anymore, which is what ends the loop thread.
pub(crate) struct Reactor {
    timers: BinaryHeap<TimerEntry>,
    signal: Arc<WakeSignal>,
    signal_armed: bool,
}

impl Reactor {
    /// The signal watcher is armed from the start.
    pub(crate) fn new(signal: Arc<WakeSignal>) -> Self {
        Self {
            timers: BinaryHeap::new(),
            signal,
            signal_armed: true,
        }
    }

    /// Arms a deadline `delay` from now; with a `period`, the entry re-arms
    /// itself on every fire until disarmed.
    pub(crate) fn arm_deadline(&mut self, id: TimerId, delay: Duration, period: Option<Duration>) {
        trace!(?id, ?delay, ?period, "deadline armed");

        self.timers.push(TimerEntry {
            deadline: Instant::now() + delay,
            period,
            id,
        });
    }

    /// Drops every entry armed for `id`. Idempotent; a one-shot entry that
    /// already fired is simply absent.
    pub(crate) fn disarm(&mut self, id: TimerId) {
        self.timers.retain(|entry| entry.id != id);
    }

    /// Stops watching the wake signal. Never re-armed; once the remaining
    /// deadlines drain, `wait` returns `None`.
    pub(crate) fn disarm_signal(&mut self) {
        self.signal_armed = false;
    }

    /// Blocks until the next wakeup. A raised signal is delivered before any
    /// due deadline, so queued registration changes are applied before a
    /// stale deadline could fire. `None` means no watchers remain.
    pub(crate) fn wait(&mut self) -> Option<Wakeup> {
        loop {
            // Consume even when disarmed: a late raise must not keep the
            // deadline wait from ever blocking.
            let raised = self.signal.consume();
            if self.signal_armed && raised {
                return Some(Wakeup::Signal);
            }

            let now = Instant::now();
            if let Some(entry) = self.timers.peek() {
                if entry.deadline <= now {
                    let entry = self.timers.pop().unwrap();

                    if let Some(period) = entry.period {
                        self.timers.push(TimerEntry {
                            deadline: now + period,
                            period: entry.period,
                            id: entry.id,
                        });
                    }

                    return Some(Wakeup::Timer(entry.id));
                }
            }

            if !self.signal_armed && self.timers.is_empty() {
                return None;
            }

            let timeout = self
                .timers
                .peek()
                .map(|entry| entry.deadline.saturating_duration_since(Instant::now()));

            self.signal.wait(timeout);
        }
    }
}
