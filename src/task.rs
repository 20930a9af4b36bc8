use crate::error::TaskError;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::time::Duration;

use tracing::debug;

/// What a task body produced: its return value, or the text of its panic.
pub(crate) type Outcome<T> = Result<T, String>;

/// A one-shot unit of work with its result delivery baked in. The erased job
/// never unwinds; panics are fenced and recorded into the handle.
pub(crate) struct Task {
    job: Box<dyn FnOnce() + Send>,
}

impl Task {
    pub(crate) fn new<F, T>(f: F) -> (Self, TaskHandle<T>)
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, handle) = result_channel();
        let job = Box::new(move || {
            let _ = sender.send(run_fenced(f));
        });

        (Self { job }, handle)
    }

    pub(crate) fn run(self) {
        (self.job)();
    }
}

/// One-time result channel: the sender side is owned by the job, the receiver
/// side by the caller's handle.
pub(crate) fn result_channel<T>() -> (Sender<Outcome<T>>, TaskHandle<T>) {
    let (sender, receiver) = channel();

    (sender, TaskHandle { receiver })
}

/// Runs a task body behind a panic fence.
pub(crate) fn run_fenced<T>(f: impl FnOnce() -> T) -> Outcome<T> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_text);

    if let Err(text) = &outcome {
        debug!(panic = %text, "task body panicked; failure captured");
    }

    outcome
}

fn panic_text(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

/// Receiving end of a submission, fulfilled exactly once by the loop thread.
///
/// If the executor never runs the task (submission after shutdown, or a
/// repeating timer reconciled away before its first fire), the job is dropped
/// and waiting reports [`TaskError::Cancelled`] instead of blocking forever.
pub struct TaskHandle<T> {
    receiver: Receiver<Outcome<T>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task has run.
    pub fn wait(self) -> Result<T, TaskError> {
        match self.receiver.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(text)) => Err(TaskError::Panicked(text)),
            Err(_) => Err(TaskError::Cancelled),
        }
    }

    /// Blocks until the task has run or `timeout` elapses.
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, TaskError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(text)) => Err(TaskError::Panicked(text)),
            Err(RecvTimeoutError::Timeout) => Err(TaskError::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Err(TaskError::Cancelled),
        }
    }
}
