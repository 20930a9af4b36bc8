use thiserror::Error;

/// Failure outcome of a submitted task or timer, observed through its
/// [`TaskHandle`](crate::TaskHandle).
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task body panicked. The panic payload text is preserved; the loop
    /// thread itself is unaffected.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was dropped before it could run, either because it was
    /// submitted after shutdown began or because shutdown reconciled it away.
    #[error("task was dropped before it could run")]
    Cancelled,

    /// `wait_timeout` elapsed before the task produced a result.
    #[error("timed out waiting for the task result")]
    TimedOut,
}
