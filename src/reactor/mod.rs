mod core;
mod entry;
mod signal;

pub(crate) use self::core::{Reactor, Wakeup};
pub(crate) use self::signal::WakeSignal;
