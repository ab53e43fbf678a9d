use std::time::Duration;

/// Initial slot count of a `DynArray` built from the default configuration.
pub const DEFAULT_ARRAY_CAPACITY: usize = 8;

/// Factor by which a full `DynArray` grows its storage.
pub const ARRAY_RESIZE_FACTOR: usize = 2;

/// Struct defining a container configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Number of slots a dynamic array starts out with. Must be non-zero.
    /// Ignored by the linked list.
    pub initial_capacity: usize,
    /// Upper bound for acquiring the container lock. `None` blocks until the
    /// lock becomes available.
    pub lock_timeout: Option<Duration>,
}

impl CollectionConfig {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = Some(lock_timeout);
        self
    }
}

impl Default for CollectionConfig {
    fn default() -> CollectionConfig {
        CollectionConfig {
            initial_capacity: DEFAULT_ARRAY_CAPACITY,
            lock_timeout: None,
        }
    }
}
