//! A single dedicated-thread task executor.
//!
//! One background thread runs a cooperative event loop; any number of caller
//! threads submit one-shot tasks, delayed tasks, or repeating timers, and all
//! of them execute serially on the loop thread. Every submission returns a
//! [`TaskHandle`] that resolves with the task's result or failure.
//!
//! ```
//! use loopwork::Worker;
//!
//! let mut worker = Worker::new();
//!
//! let handle = worker.submit(|| 2 + 2);
//! assert_eq!(handle.wait().unwrap(), 4);
//!
//! worker.join();
//! ```

mod error;
mod reactor;
mod task;
mod timer;
mod worker;

pub use error::TaskError;
pub use task::TaskHandle;
pub use worker::{Builder, Worker};
