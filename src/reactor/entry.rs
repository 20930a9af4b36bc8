use crate::timer::TimerId;

use std::cmp::Ordering;
use std::time::{Duration, Instant};

/// Heap element for an armed deadline. Ordering is reversed so the earliest
/// deadline sits on top of the `BinaryHeap`.
pub(crate) struct TimerEntry {
    pub(crate) deadline: Instant,
    pub(crate) period: Option<Duration>,
    pub(crate) id: TimerId,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline.eq(&other.deadline)
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.deadline.cmp(&self.deadline)
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
