use super::builder::Builder;
use crate::reactor::{Reactor, WakeSignal, Wakeup};
use crate::task::{Task, TaskHandle, result_channel};
use crate::timer::{Timer, TimerId, state};

use std::collections::{HashMap, VecDeque};
use std::mem;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

/// A dedicated-thread task executor.
///
/// Owns one background loop thread. Tasks and timers may be submitted from
/// any number of threads; everything executes serially on the loop thread, so
/// side effects inside submitted closures never race each other.
///
/// Dropping the worker joins implicitly. If the worker is shared through an
/// `Arc`, keep the last clone off the loop thread: the implicit join would
/// otherwise wait on the very thread running it.
pub struct Worker {
    shared: Arc<Mutex<Shared>>,
    signal: Arc<WakeSignal>,
    thread: Option<thread::JoinHandle<()>>,
}

/// Everything shared across threads, guarded by one mutex. Held only for
/// O(1) appends and swaps, never across task execution; the single exception
/// is the shutdown scan over the registry.
struct Shared {
    running: bool,
    tasks: VecDeque<Task>,
    pending_timers: VecDeque<Arc<Timer>>,
    registry: HashMap<TimerId, Arc<Timer>>,
    next_id: u64,
}

impl Shared {
    fn new() -> Self {
        Self {
            running: true,
            tasks: VecDeque::new(),
            pending_timers: VecDeque::new(),
            registry: HashMap::new(),
            next_id: 0,
        }
    }

    fn next_timer_id(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        id
    }
}

impl Worker {
    /// Starts the loop thread immediately. See [`Builder`] for a fallible,
    /// named-thread construction.
    pub fn new() -> Self {
        Builder::new().build().expect("failed to spawn the loop thread")
    }

    pub(crate) fn spawn(name: String) -> std::io::Result<Self> {
        let shared = Arc::new(Mutex::new(Shared::new()));
        let signal = Arc::new(WakeSignal::new());

        let thread = {
            let shared = shared.clone();
            let signal = signal.clone();

            thread::Builder::new()
                .name(name)
                .spawn(move || main_loop(shared, signal))?
        };

        Ok(Self {
            shared,
            signal,
            thread: Some(thread),
        })
    }

    /// Submits a one-shot task to run as soon as possible.
    ///
    /// Never blocks. After [`join`](Self::join) has begun the task is dropped
    /// and its handle resolves to `Cancelled`.
    pub fn submit<F, T>(&self, f: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (task, handle) = Task::new(f);

        {
            let mut shared = self.shared.lock().unwrap();
            if shared.running {
                shared.tasks.push_back(task);
            }
        }

        // Raised even when the task was dropped, so submission looks the
        // same to the caller either way.
        self.signal.raise();

        handle
    }

    /// Submits a task to run once, `delay` after the loop thread registers
    /// it.
    pub fn submit_delayed<F, T>(&self, delay: Duration, f: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, handle) = result_channel();

        {
            let mut shared = self.shared.lock().unwrap();
            if shared.running {
                let id = shared.next_timer_id();
                let timer = Arc::new(Timer::once(id, delay, sender, f));
                shared.pending_timers.push_back(timer);
            }
        }

        self.signal.raise();

        handle
    }

    /// Submits a task to run first after `delay`, then repeatedly every
    /// `every` until shutdown. The handle resolves with the first fire's
    /// outcome; later fires run the closure again and discard its result.
    ///
    /// # Panics
    ///
    /// Panics if `every` is zero.
    pub fn submit_repeating<F, T>(&self, delay: Duration, every: Duration, f: F) -> TaskHandle<T>
    where
        F: FnMut() -> T + Send + 'static,
        T: Send + 'static,
    {
        assert!(!every.is_zero(), "repeat interval must be non-zero");

        let (sender, handle) = result_channel();

        {
            let mut shared = self.shared.lock().unwrap();
            if shared.running {
                let id = shared.next_timer_id();
                let timer = Arc::new(Timer::repeating(id, delay, every, sender, f));
                shared.pending_timers.push_back(timer);
            }
        }

        self.signal.raise();

        handle
    }

    /// Stops accepting work and blocks until the loop thread terminates.
    ///
    /// Queued tasks and one-shot timers still run to completion. Repeating
    /// timers are cancelled: those not yet started are dropped outright,
    /// active ones are unregistered on the loop's next cycle. Idempotent:
    /// the second call returns immediately.
    pub fn join(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        {
            let mut shared = self.shared.lock().unwrap();
            shared.running = false;

            // A repeating timer that has not started must not begin now;
            // queued one-shot timers keep their single fire.
            shared.pending_timers.retain(|timer| timer.repeat.is_none());

            let repeating: Vec<Arc<Timer>> = shared
                .registry
                .values()
                .filter(|timer| timer.repeat.is_some())
                .cloned()
                .collect();

            debug!(
                repeating = repeating.len(),
                one_shot = shared.pending_timers.len(),
                "shutdown requested; reconciling timers"
            );

            for timer in repeating {
                timer.state.store(state::PENDING_DELETE, Ordering::Release);
                shared.pending_timers.push_back(timer);
            }
        }

        // The guaranteed final wake: an idle loop must still observe the
        // stop and drain the deletions queued above.
        self.signal.raise();
        let _ = thread.join();

        debug!("loop thread joined");
    }
}

impl Default for Worker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.join();
    }
}

fn main_loop(shared: Arc<Mutex<Shared>>, signal: Arc<WakeSignal>) {
    debug!("loop thread started");

    let mut reactor = Reactor::new(signal);

    while let Some(wakeup) = reactor.wait() {
        match wakeup {
            Wakeup::Signal => drain(&shared, &mut reactor),
            Wakeup::Timer(id) => fire(&shared, &mut reactor, id),
        }
    }

    debug!("loop thread stopped; no watchers remain");
}

/// Swap-and-drain cycle. Repeats until both queues are observed empty, so
/// work submitted while a burst executes is drained before control returns
/// to the reactor; a wakeup raised for it would otherwise be consumed here
/// and lost.
fn drain(shared: &Mutex<Shared>, reactor: &mut Reactor) {
    loop {
        let (tasks, timers) = {
            let mut shared = shared.lock().unwrap();

            if !shared.running {
                reactor.disarm_signal();
            }
            if shared.tasks.is_empty() && shared.pending_timers.is_empty() {
                return;
            }

            let tasks = mem::take(&mut shared.tasks);
            let timers = mem::take(&mut shared.pending_timers);

            (tasks, timers)
        };

        trace!(tasks = tasks.len(), timers = timers.len(), "burst captured");

        for task in tasks {
            task.run();
        }

        for timer in timers {
            match timer.state.load(Ordering::Acquire) {
                state::PENDING_ADD => register(shared, reactor, timer),
                state::PENDING_DELETE => unregister(shared, reactor, &timer),
                _ => {}
            }
        }
    }
}

fn register(shared: &Mutex<Shared>, reactor: &mut Reactor, timer: Arc<Timer>) {
    {
        let mut shared = shared.lock().unwrap();

        // A repeating add swapped out concurrently with shutdown would start
        // a timer that join can no longer reconcile; drop it instead.
        if !shared.running && timer.repeat.is_some() {
            timer.state.store(state::IDLE, Ordering::Release);
            return;
        }

        shared.registry.insert(timer.id, timer.clone());

        // Stored while the lock is held: a concurrent join must either see
        // this timer as REGISTERED and queue its delete, or not see it at
        // all. Storing after unlock could overwrite a PENDING_DELETE that
        // join just placed, and the delete would never be drained.
        timer.state.store(state::REGISTERED, Ordering::Release);
    }

    reactor.arm_deadline(timer.id, timer.delay, timer.repeat);

    trace!(id = ?timer.id, "timer registered");
}

fn unregister(shared: &Mutex<Shared>, reactor: &mut Reactor, timer: &Arc<Timer>) {
    shared.lock().unwrap().registry.remove(&timer.id);

    timer.state.store(state::IDLE, Ordering::Release);
    reactor.disarm(timer.id);

    trace!(id = ?timer.id, "timer unregistered");
}

fn fire(shared: &Mutex<Shared>, reactor: &mut Reactor, id: TimerId) {
    // The clone out of the registry is the extra owning reference that keeps
    // the timer alive for the whole call.
    let timer = shared.lock().unwrap().registry.get(&id).cloned();
    let Some(timer) = timer else {
        // Unregistered after the wakeup was produced; never invoke a timer
        // that has gone idle.
        return;
    };

    trace!(?id, "timer fired");
    timer.invoke();

    if timer.repeat.is_none() {
        // One-shot timers remove themselves after their single fire.
        shared.lock().unwrap().registry.remove(&id);
        timer.state.store(state::IDLE, Ordering::Release);
        reactor.disarm(id);
    }
}
