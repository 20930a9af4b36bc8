use crate::task::{Outcome, run_fenced};

use std::sync::Mutex;
use std::sync::atomic::AtomicU8;
use std::sync::mpsc::Sender;
use std::time::Duration;

/// Registration states of a [`Timer`].
///
/// A timer moves `PENDING_ADD -> REGISTERED -> IDLE`, either by firing its
/// single shot or by being marked `PENDING_DELETE` during shutdown. The state
/// is written by the caller side only at submission and shutdown; everything
/// else happens on the loop thread.
pub(crate) mod state {
    pub(crate) const IDLE: u8 = 0;
    pub(crate) const PENDING_ADD: u8 = 1;
    pub(crate) const PENDING_DELETE: u8 = 2;
    pub(crate) const REGISTERED: u8 = 3;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct TimerId(pub(crate) u64);

/// A scheduled unit of work bound to a reactor deadline.
///
/// Shared through `Arc` between the pending queue or active registry and any
/// in-flight invocation, so it cannot be destroyed mid-fire.
pub(crate) struct Timer {
    pub(crate) id: TimerId,
    pub(crate) delay: Duration,
    pub(crate) repeat: Option<Duration>,
    pub(crate) state: AtomicU8,
    job: Mutex<Box<dyn FnMut() + Send>>,
}

impl Timer {
    /// A timer that fires exactly once after `delay`.
    pub(crate) fn once<F, T>(id: TimerId, delay: Duration, sender: Sender<Outcome<T>>, f: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut f = Some(f);
        let job = Box::new(move || {
            // The executor guarantees a single call; the take guards the
            // consuming closure, it is not an expected second path.
            if let Some(f) = f.take() {
                let _ = sender.send(run_fenced(f));
            }
        });

        Self::with_job(id, delay, None, job)
    }

    /// A timer that first fires after `delay`, then every `every`. The result
    /// channel is fulfilled by the first fire; later fires run the closure
    /// again and discard its result.
    pub(crate) fn repeating<F, T>(
        id: TimerId,
        delay: Duration,
        every: Duration,
        sender: Sender<Outcome<T>>,
        mut f: F,
    ) -> Self
    where
        F: FnMut() -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut sender = Some(sender);
        let job = Box::new(move || {
            let outcome = run_fenced(|| f());

            if let Some(sender) = sender.take() {
                let _ = sender.send(outcome);
            }
        });

        Self::with_job(id, delay, Some(every), job)
    }

    fn with_job(
        id: TimerId,
        delay: Duration,
        repeat: Option<Duration>,
        job: Box<dyn FnMut() + Send>,
    ) -> Self {
        Self {
            id,
            delay,
            repeat,
            state: AtomicU8::new(state::PENDING_ADD),
            job: Mutex::new(job),
        }
    }

    /// Runs the task once for the current fire. Loop thread only; the mutex
    /// exists to keep the shared entity `Sync`, not for contention.
    pub(crate) fn invoke(&self) {
        let job = &mut *self.job.lock().unwrap();
        job();
    }
}
