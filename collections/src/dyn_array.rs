//! A growable array of element handles behind a reader/writer lock.
//!
//! The array stores handles (`Arc<E>`, `&'a E`, ids, ...) to elements that the
//! caller owns. It manages its slots but never the payloads: removing an
//! element or destroying the array only drops the handle that was stored.
//!
//! Storage always holds `capacity` slots. The first `size` slots hold the live
//! elements, every slot from `size` on is vacant. When an insertion finds the
//! storage full, the capacity is doubled.
//!
//! All public operations on [`DynArray`] acquire the lock exactly once. Code
//! that needs several steps under one acquisition takes a guard via
//! [`DynArray::read`] or [`DynArray::write`] and works on the [`RawArray`]
//! behind it.

use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{CollectionConfig, ARRAY_RESIZE_FACTOR};
use crate::error::{CollectionError, Result};
use crate::lock::RwLockExt;
use crate::Collection;

/// Slot storage of a [`DynArray`].
///
/// A `RawArray` is only reachable through a guard of its `DynArray`, so every
/// method on it runs with the lock already held.
#[derive(Debug)]
pub struct RawArray<T> {
    slots: Vec<Option<T>>,
    size: usize,
}

impl<T> RawArray<T> {
    fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CollectionError::OutOfBounds);
        }

        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize_with(capacity, || None);

        Ok(RawArray { slots, size: 0 })
    }

    /// Returns the number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the number of allocated slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the handle stored at `index`, or `None` if the index lies
    /// beyond the capacity or the slot is vacant.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index)?.as_ref()
    }

    /// Provides a forward iterator over the live elements, skipping vacant
    /// slots.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots[..self.size].iter().flatten()
    }

    /// Returns the slot index of the first live element matching `predicate`.
    pub fn position<F>(&self, mut predicate: F) -> Option<usize>
    where
        F: FnMut(&T) -> bool,
    {
        self.slots[..self.size]
            .iter()
            .position(|slot| slot.as_ref().map_or(false, &mut predicate))
    }

    /// Appends `element` after the last live element, doubling the capacity
    /// first if the storage is full.
    pub fn push(&mut self, element: T) -> Result<()> {
        if self.size == self.capacity() {
            let target = self.next_capacity(self.capacity())?;
            self.grow_to(target)?;
        }

        self.slots[self.size] = Some(element);
        self.size += 1;

        log::trace!(size = self.size, "Appended element");
        Ok(())
    }

    /// Stores `element` at `index`, doubling the capacity until the index
    /// fits. Returns the handle previously stored there.
    ///
    /// Afterwards the size is at least `index + 1`. Overwriting a live slot
    /// leaves the size unchanged, writing past the end leaves the skipped
    /// slots vacant.
    pub fn set(&mut self, element: T, index: usize) -> Result<Option<T>> {
        if index == usize::MAX {
            return Err(CollectionError::OutOfBounds);
        }

        // Compute the final capacity before touching the storage so that a
        // failed growth leaves the array as it was.
        let mut target = self.capacity();
        while target <= index {
            target = self.next_capacity(target)?;
        }
        if target > self.capacity() {
            self.grow_to(target)?;
        }

        let previous = self.slots[index].replace(element);
        self.size = self.size.max(index + 1);

        log::trace!(index, size = self.size, "Set element");
        Ok(previous)
    }

    /// Removes the slot at `index` and shifts every following live element
    /// one position to the left. Returns the handle that was stored in the
    /// slot, which is `None` for a vacant slot left behind by [`set`].
    ///
    /// [`set`]: RawArray::set
    pub fn remove(&mut self, index: usize) -> Result<Option<T>> {
        if index >= self.capacity() {
            return Err(CollectionError::OutOfBounds);
        }
        if self.size == 0 || index >= self.size {
            return Err(CollectionError::InvalidState);
        }

        let removed = self.slots[index].take();
        // The vacated slot travels to the end of the live prefix.
        self.slots[index..self.size].rotate_left(1);
        self.size -= 1;

        log::trace!(index, size = self.size, "Removed element");
        Ok(removed)
    }

    /// Keeps only the live elements for which `keep` returns `true`,
    /// compacting them to the front in their original order. Vacant slots
    /// inside the live prefix are dropped as well. Returns the number of
    /// elements removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = 0;
        let mut write = 0;
        for read in 0..self.size {
            match self.slots[read].take() {
                Some(element) if keep(&element) => {
                    self.slots[write] = Some(element);
                    write += 1;
                }
                Some(_) => removed += 1,
                None => {}
            }
        }
        self.size = write;
        removed
    }

    fn next_capacity(&self, capacity: usize) -> Result<usize> {
        capacity.checked_mul(ARRAY_RESIZE_FACTOR).ok_or_else(|| {
            log::warn!(capacity, "Capacity overflow while growing array");
            CollectionError::AllocationFailure
        })
    }

    fn grow_to(&mut self, new_capacity: usize) -> Result<()> {
        let old_capacity = self.capacity();
        debug_assert!(new_capacity > old_capacity);

        self.slots
            .try_reserve_exact(new_capacity - old_capacity)
            .map_err(|error| {
                log::warn!(old_capacity, new_capacity, %error, "Failed to grow array");
                CollectionError::AllocationFailure
            })?;
        self.slots.resize_with(new_capacity, || None);

        log::debug!(old_capacity, new_capacity, "Grew array");
        Ok(())
    }
}

/// A dynamic array of element handles guarded by a reader/writer lock.
///
/// Readers (`get`, `size`, `capacity`, ...) share the lock, writers (`append`,
/// `set`, `remove`) hold it exclusively for the whole operation, including
/// any growth of the storage.
#[derive(Debug)]
pub struct DynArray<T> {
    inner: RwLock<RawArray<T>>,
    lock_timeout: Option<Duration>,
}

impl<T> DynArray<T> {
    /// Creates an empty array with room for `capacity` elements.
    ///
    /// Fails with `OutOfBounds` for a zero capacity and with
    /// `AllocationFailure` if the storage cannot be reserved.
    ///
    /// # Examples
    ///
    /// ```
    /// use coil_collections::DynArray;
    ///
    /// let array: DynArray<u32> = DynArray::new(4).unwrap();
    /// assert_eq!(array.capacity().unwrap(), 4);
    /// assert!(array.is_empty().unwrap());
    /// ```
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(CollectionConfig::default().with_initial_capacity(capacity))
    }

    pub fn with_config(config: CollectionConfig) -> Result<Self> {
        let raw = RawArray::with_capacity(config.initial_capacity).map_err(|error| {
            log::warn!(capacity = config.initial_capacity, %error, "Failed to create array");
            error
        })?;

        log::debug!(capacity = config.initial_capacity, "Created array");
        Ok(DynArray {
            inner: RwLock::new(raw),
            lock_timeout: config.lock_timeout,
        })
    }

    /// Releases the storage and the lock. The elements the stored handles
    /// refer to are left alone. Returns the number of live elements that were
    /// still stored.
    pub fn destroy(self) -> Result<usize> {
        let raw = self.inner.into_inner();
        let live = raw.iter().count();

        log::debug!(capacity = raw.capacity(), live, "Destroyed array");
        Ok(live)
    }

    /// Acquires shared access for several reads under one acquisition.
    pub fn read(&self) -> Result<RwLockReadGuard<'_, RawArray<T>>> {
        self.inner.read_within(self.lock_timeout)
    }

    /// Acquires exclusive access for several mutations under one acquisition.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, RawArray<T>>> {
        self.inner.write_within(self.lock_timeout)
    }

    /// Appends `element`, doubling the capacity if the array is full.
    ///
    /// # Examples
    ///
    /// ```
    /// use coil_collections::DynArray;
    ///
    /// let array = DynArray::new(1).unwrap();
    /// array.append("a").unwrap();
    /// array.append("b").unwrap();
    ///
    /// assert_eq!(array.size().unwrap(), 2);
    /// assert_eq!(array.capacity().unwrap(), 2);
    /// assert_eq!(array.get(1), Some("b"));
    /// ```
    pub fn append(&self, element: T) -> Result<()> {
        self.write()?.push(element)
    }

    /// Stores `element` at `index`, growing the array until the index fits.
    /// Returns the handle previously stored at `index`.
    pub fn set(&self, element: T, index: usize) -> Result<Option<T>> {
        if index == usize::MAX {
            log::warn!(index, "Rejected set at invalid index");
            return Err(CollectionError::OutOfBounds);
        }
        self.write()?.set(element, index)
    }

    /// Removes the element at `index`, shifting the following elements left.
    pub fn remove(&self, index: usize) -> Result<Option<T>> {
        self.write()?.remove(index)
    }

    /// Returns the number of live elements.
    pub fn size(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn capacity(&self) -> Result<usize> {
        Ok(self.read()?.capacity())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Returns `true` if a live element matches `predicate`.
    pub fn contains_by<F>(&self, predicate: F) -> Result<bool>
    where
        F: FnMut(&T) -> bool,
    {
        Ok(self.read()?.position(predicate).is_some())
    }

    /// Returns the index of the first live element matching `predicate`.
    pub fn position_by<F>(&self, predicate: F) -> Result<Option<usize>>
    where
        F: FnMut(&T) -> bool,
    {
        Ok(self.read()?.position(predicate))
    }
}

impl<T: Clone> DynArray<T> {
    /// Returns a clone of the handle stored at `index`.
    ///
    /// Yields `None` if the index lies beyond the capacity, the slot is
    /// vacant, or the lock could not be acquired.
    pub fn get(&self, index: usize) -> Option<T> {
        let raw = self.read().ok()?;
        raw.get(index).cloned()
    }

    /// Clones the live handles in order.
    pub fn snapshot(&self) -> Result<Vec<T>> {
        Ok(self.read()?.iter().cloned().collect())
    }
}

impl<T> Collection for DynArray<T> {
    fn size(&self) -> Result<usize> {
        DynArray::size(self)
    }

    fn destroy(self) -> Result<usize> {
        DynArray::destroy(self)
    }
}
