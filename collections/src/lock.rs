use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{CollectionError, Result};

/// Lock acquisition honouring an optional timeout.
///
/// The containers' locks are not reentrant. A thread that already holds a
/// guard on a container must not call back into the same container.
pub(crate) trait RwLockExt<T> {
    fn read_within(&self, timeout: Option<Duration>) -> Result<RwLockReadGuard<'_, T>>;
    fn write_within(&self, timeout: Option<Duration>) -> Result<RwLockWriteGuard<'_, T>>;
}

impl<T> RwLockExt<T> for RwLock<T> {
    fn read_within(&self, timeout: Option<Duration>) -> Result<RwLockReadGuard<'_, T>> {
        match timeout {
            None => Ok(self.read()),
            Some(timeout) => self.try_read_for(timeout).ok_or_else(|| {
                log::warn!(?timeout, "Failed to acquire read lock");
                CollectionError::LockFailure
            }),
        }
    }

    fn write_within(&self, timeout: Option<Duration>) -> Result<RwLockWriteGuard<'_, T>> {
        match timeout {
            None => Ok(self.write()),
            Some(timeout) => self.try_write_for(timeout).ok_or_else(|| {
                log::warn!(?timeout, "Failed to acquire write lock");
                CollectionError::LockFailure
            }),
        }
    }
}
