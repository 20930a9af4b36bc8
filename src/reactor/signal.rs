use std::mem;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Cross-thread wake primitive for the loop thread.
///
/// Level-triggered: `raise` leaves a flag set until the loop thread consumes
/// it, so a wake delivered before the first wait is not lost and construction
/// needs no readiness handshake.
pub(crate) struct WakeSignal {
    raised: Mutex<bool>,
    condvar: Condvar,
}

impl WakeSignal {
    pub(crate) fn new() -> Self {
        Self {
            raised: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Callable from any thread. Raises collapse until the next consume.
    pub(crate) fn raise(&self) {
        let mut raised = self.raised.lock().unwrap();
        *raised = true;

        self.condvar.notify_one();
    }

    /// Takes the flag, reporting whether it was set.
    pub(crate) fn consume(&self) -> bool {
        let mut raised = self.raised.lock().unwrap();

        mem::take(&mut *raised)
    }

    /// Blocks until the signal is raised or `timeout` elapses; with no
    /// timeout, until raised. Spurious condvar wakeups are absorbed. The flag
    /// stays set for the caller to consume.
    pub(crate) fn wait(&self, timeout: Option<Duration>) {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut raised = self.raised.lock().unwrap();

        while !*raised {
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return;
                    }

                    let (guard, _) = self.condvar.wait_timeout(raised, deadline - now).unwrap();
                    raised = guard;
                }
                None => {
                    raised = self.condvar.wait(raised).unwrap();
                }
            }
        }
    }
}
