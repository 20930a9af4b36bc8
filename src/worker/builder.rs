use super::core::Worker;

use std::io;

/// Configures and spawns a [`Worker`].
pub struct Builder {
    name: String,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            name: "loopwork".to_string(),
        }
    }

    /// Name given to the loop thread.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Spawns the loop thread. Spawn failure is fatal to the executor and is
    /// surfaced here, synchronously; no partial worker exists afterwards.
    pub fn build(self) -> io::Result<Worker> {
        Worker::spawn(self.name)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
