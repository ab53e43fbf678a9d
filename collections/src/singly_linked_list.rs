//! A singly-linked list with owned nodes behind a reader/writer lock.
//!
//! Every node holds one element handle and a link to its successor. The list
//! owns the nodes, the caller owns whatever the handles refer to: removing a
//! node or destroying the list frees the node and drops the handle, nothing
//! more.
//!
//! The list keeps pointers to its first and last node, so pushing at either
//! end is O(1). Popping at the back walks the whole list to find the new tail.
//!
//! The lock is not reentrant. Public operations on [`SinglyLinkedList`]
//! acquire it once and then run the unlocked operations of [`RawList`];
//! operations that reuse each other (an insert at index `0` pushing at the
//! front, a removal at the last index popping at the back) do so on the
//! `RawList` and never touch the lock a second time.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::CollectionConfig;
use crate::error::{CollectionError, Result};
use crate::lock::RwLockExt;
use crate::Collection;

/// Equality function used by [`SinglyLinkedList::is_in`].
pub type Comparator<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

struct Node<T> {
    element: T,
    next: Option<NonNull<Node<T>>>,
}

impl<T> Node<T> {
    fn new(element: T, next: Option<NonNull<Node<T>>>) -> NonNull<Node<T>> {
        NonNull::from(Box::leak(Box::new(Node { element, next })))
    }

    /// Reclaims a node that was created by `Node::new` and unlinked from the
    /// list, returning its element.
    ///
    /// # Safety
    ///
    /// `node` must not be reachable from the list anymore and must not be
    /// freed twice.
    unsafe fn into_element(node: NonNull<Node<T>>) -> T {
        Box::from_raw(node.as_ptr()).element
    }
}

/// Node chain of a [`SinglyLinkedList`].
///
/// A `RawList` is only reachable through a guard of its `SinglyLinkedList`,
/// so every method on it runs with the lock already held.
pub struct RawList<T> {
    head: Option<NonNull<Node<T>>>,
    tail: Option<NonNull<Node<T>>>,
    len: usize,
    marker: PhantomData<Box<Node<T>>>,
}

impl<T> RawList<T> {
    fn new() -> Self {
        RawList {
            head: None,
            tail: None,
            len: 0,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Provides a forward iterator from the first to the last node.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head,
            remaining: self.len,
            marker: PhantomData,
        }
    }

    /// Provides a forward iterator with mutable references to the handles.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            next: self.head,
            remaining: self.len,
            marker: PhantomData,
        }
    }

    /// Returns the handle of the first node.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        // SAFETY: `head` points to a node owned by this list.
        self.head.map(|node| unsafe { &(*node.as_ptr()).element })
    }

    /// Returns the handle of the last node.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        // SAFETY: `tail` points to a node owned by this list.
        self.tail.map(|node| unsafe { &(*node.as_ptr()).element })
    }

    /// Returns the handle at `index`, walking from the first node.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        self.iter().nth(index)
    }

    /// Returns `true` if a node's handle equals `element` according to `eq`.
    pub fn contains_by<F>(&self, element: &T, mut eq: F) -> bool
    where
        F: FnMut(&T, &T) -> bool,
    {
        self.iter().any(|current| eq(current, element))
    }

    /// Adds an element first in the list.
    pub fn push_front(&mut self, element: T) {
        let node = Node::new(element, self.head);
        if self.tail.is_none() {
            self.tail = Some(node);
        }
        self.head = Some(node);
        self.len += 1;
    }

    /// Adds an element last in the list.
    pub fn push_back(&mut self, element: T) {
        let node = Node::new(element, None);
        match self.tail {
            // SAFETY: `tail` points to a node owned by this list.
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
        self.len += 1;
    }

    /// Inserts an element so that it ends up at position `index`.
    ///
    /// `index` may be anything from `0` to `len()` inclusive.
    pub fn insert(&mut self, element: T, index: usize) -> Result<()> {
        if index > self.len {
            return Err(CollectionError::OutOfBounds);
        }
        if index == 0 {
            self.push_front(element);
            return Ok(());
        }
        if index == self.len {
            self.push_back(element);
            return Ok(());
        }

        let prev = self.node_at(index - 1)?;
        // SAFETY: `prev` is a node owned by this list and is not the tail,
        // because `index < len`.
        unsafe {
            let node = Node::new(element, (*prev.as_ptr()).next);
            (*prev.as_ptr()).next = Some(node);
        }
        self.len += 1;
        Ok(())
    }

    /// Removes the first node and returns its handle.
    pub fn pop_front(&mut self) -> Result<T> {
        let head = self.head.ok_or(CollectionError::InvalidState)?;

        // SAFETY: `head` is owned by this list and is unlinked before it is
        // freed.
        unsafe {
            self.head = (*head.as_ptr()).next;
            if self.head.is_none() {
                self.tail = None;
            }
            self.len -= 1;
            Ok(Node::into_element(head))
        }
    }

    /// Removes the last node and returns its handle.
    ///
    /// Without back links this walks the whole list to find the new tail.
    pub fn pop_back(&mut self) -> Result<T> {
        let mut current = self.head.ok_or(CollectionError::InvalidState)?;
        let mut prev: Option<NonNull<Node<T>>> = None;

        // SAFETY: every pointer followed here belongs to a node owned by this
        // list; the last node is unlinked before it is freed.
        unsafe {
            while let Some(next) = (*current.as_ptr()).next {
                prev = Some(current);
                current = next;
            }

            match prev {
                Some(prev) => (*prev.as_ptr()).next = None,
                None => self.head = None,
            }
            self.tail = prev;
            self.len -= 1;
            Ok(Node::into_element(current))
        }
    }

    /// Removes the node at `index` and returns its handle.
    ///
    /// `index` must be less than `len()`.
    pub fn remove(&mut self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(CollectionError::OutOfBounds);
        }
        if index == 0 {
            return self.pop_front();
        }
        if index == self.len - 1 {
            return self.pop_back();
        }

        let prev = self.node_at(index - 1)?;
        // SAFETY: `prev` and its successor are owned by this list. The
        // successor is neither head nor tail, so only `prev.next` refers to it.
        unsafe {
            let target = (*prev.as_ptr())
                .next
                .ok_or(CollectionError::GenericFailure)?;
            (*prev.as_ptr()).next = (*target.as_ptr()).next;
            self.len -= 1;
            Ok(Node::into_element(target))
        }
    }

    /// Removes all nodes, returning how many were freed.
    pub fn clear(&mut self) -> usize {
        let mut freed = 0;
        while self.pop_front().is_ok() {
            freed += 1;
        }
        freed
    }

    fn node_at(&self, index: usize) -> Result<NonNull<Node<T>>> {
        let mut current = self.head.ok_or(CollectionError::GenericFailure)?;
        for _ in 0..index {
            // SAFETY: `current` points to a node owned by this list.
            current = unsafe { (*current.as_ptr()).next }
                .ok_or(CollectionError::GenericFailure)?;
        }
        Ok(current)
    }
}

impl<T> Drop for RawList<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for RawList<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a RawList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

unsafe impl<T: Send> Send for RawList<T> {}

unsafe impl<T: Sync> Sync for RawList<T> {}

/// An iterator over the handles of a [`RawList`].
pub struct Iter<'a, T: 'a> {
    next: Option<NonNull<Node<T>>>,
    remaining: usize,
    marker: PhantomData<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        self.next.map(|node| {
            // SAFETY: the list outlives `'a` and is not mutated meanwhile.
            let node = unsafe { &*node.as_ptr() };
            self.next = node.next;
            self.remaining -= 1;
            &node.element
        })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// A mutable iterator over the handles of a [`RawList`].
pub struct IterMut<'a, T: 'a> {
    next: Option<NonNull<Node<T>>>,
    remaining: usize,
    marker: PhantomData<&'a mut Node<T>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        self.next.map(|node| {
            // SAFETY: the list is mutably borrowed for `'a` and every node is
            // yielded at most once.
            let node = unsafe { &mut *node.as_ptr() };
            self.next = node.next;
            self.remaining -= 1;
            &mut node.element
        })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

/// A singly-linked list of element handles guarded by a reader/writer lock.
///
/// Membership testing needs a comparator supplied at construction. Without
/// one, [`is_in`] fails with `NullArgument`.
///
/// The comparator runs while the shared lock is held and must not call back
/// into the same list.
///
/// [`is_in`]: SinglyLinkedList::is_in
pub struct SinglyLinkedList<T> {
    inner: RwLock<RawList<T>>,
    comparator: Option<Comparator<T>>,
    lock_timeout: Option<Duration>,
}

impl<T> Default for SinglyLinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SinglyLinkedList<T> {
    /// Creates an empty list without a comparator.
    ///
    /// # Examples
    ///
    /// ```
    /// use coil_collections::SinglyLinkedList;
    ///
    /// let list: SinglyLinkedList<u32> = SinglyLinkedList::new();
    /// assert!(list.is_empty().unwrap());
    /// ```
    pub fn new() -> Self {
        Self::with_config(CollectionConfig::default(), None)
    }

    /// Creates an empty list that tests membership with `comparator`.
    ///
    /// # Examples
    ///
    /// ```
    /// use coil_collections::SinglyLinkedList;
    ///
    /// let list = SinglyLinkedList::with_comparator(|a: &(i32, i32), b: &(i32, i32)| a == b);
    /// list.append((1, 2)).unwrap();
    ///
    /// assert_eq!(list.is_in(&(1, 2)), Ok(true));
    /// assert_eq!(list.is_in(&(2, 1)), Ok(false));
    /// ```
    pub fn with_comparator<F>(comparator: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self::with_config(CollectionConfig::default(), Some(Box::new(comparator)))
    }

    pub fn with_config(config: CollectionConfig, comparator: Option<Comparator<T>>) -> Self {
        log::debug!(comparator = comparator.is_some(), "Created list");
        SinglyLinkedList {
            inner: RwLock::new(RawList::new()),
            comparator,
            lock_timeout: config.lock_timeout,
        }
    }

    /// Frees every node and releases the lock. The elements the handles
    /// refer to are left alone. Returns the number of freed nodes.
    pub fn destroy(self) -> Result<usize> {
        let mut raw = self.inner.into_inner();
        let freed = raw.clear();

        log::debug!(freed, "Destroyed list");
        Ok(freed)
    }

    /// Acquires shared access for several reads under one acquisition.
    pub fn read(&self) -> Result<RwLockReadGuard<'_, RawList<T>>> {
        self.inner.read_within(self.lock_timeout)
    }

    /// Acquires exclusive access for several mutations under one acquisition.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, RawList<T>>> {
        self.inner.write_within(self.lock_timeout)
    }

    /// Adds an element at the front of the list.
    pub fn prepend(&self, element: T) -> Result<()> {
        let mut raw = self.write()?;
        raw.push_front(element);
        log::trace!(size = raw.len(), "Prepended element");
        Ok(())
    }

    /// Adds an element at the back of the list.
    pub fn append(&self, element: T) -> Result<()> {
        let mut raw = self.write()?;
        raw.push_back(element);
        log::trace!(size = raw.len(), "Appended element");
        Ok(())
    }

    /// Inserts an element at position `index`, which may range from `0` to
    /// `size()` inclusive.
    ///
    /// # Examples
    ///
    /// ```
    /// use coil_collections::SinglyLinkedList;
    ///
    /// let list = SinglyLinkedList::new();
    /// list.insert('x', 0).unwrap();
    /// list.insert('y', 1).unwrap();
    /// list.insert('z', 1).unwrap();
    ///
    /// assert_eq!(list.snapshot().unwrap(), vec!['x', 'z', 'y']);
    /// ```
    pub fn insert(&self, element: T, index: usize) -> Result<()> {
        let mut raw = self.write()?;
        raw.insert(element, index).map_err(|error| {
            log::warn!(index, size = raw.len(), %error, "Rejected insert");
            error
        })?;
        log::trace!(index, size = raw.len(), "Inserted element");
        Ok(())
    }

    /// Removes the first element. Fails with `InvalidState` on an empty list.
    pub fn remove_first(&self) -> Result<T> {
        self.write()?.pop_front()
    }

    /// Removes the last element. Fails with `InvalidState` on an empty list.
    pub fn remove_last(&self) -> Result<T> {
        self.write()?.pop_back()
    }

    /// Removes the element at `index`, which must be less than `size()`.
    pub fn remove(&self, index: usize) -> Result<T> {
        let mut raw = self.write()?;
        let element = raw.remove(index).map_err(|error| {
            log::warn!(index, size = raw.len(), %error, "Rejected remove");
            error
        })?;
        log::trace!(index, size = raw.len(), "Removed element");
        Ok(element)
    }

    /// Returns `true` if the comparator reports a node's handle equal to
    /// `element`.
    ///
    /// Fails with `NullArgument` if the list was created without a
    /// comparator.
    pub fn is_in(&self, element: &T) -> Result<bool> {
        let comparator = self.comparator.as_ref().ok_or_else(|| {
            log::warn!("Membership test on a list without comparator");
            CollectionError::NullArgument
        })?;
        Ok(self
            .read()?
            .contains_by(element, |current, target| comparator(current, target)))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Returns the number of nodes.
    pub fn size(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

impl<T: Clone> SinglyLinkedList<T> {
    /// Returns a clone of the handle at `index`.
    ///
    /// Yields `None` if `index >= size()` or the lock could not be acquired.
    pub fn get(&self, index: usize) -> Option<T> {
        let raw = self.read().ok()?;
        raw.get(index).cloned()
    }

    /// Returns a clone of the first handle.
    pub fn front(&self) -> Option<T> {
        self.read().ok()?.front().cloned()
    }

    /// Returns a clone of the last handle.
    pub fn back(&self) -> Option<T> {
        self.read().ok()?.back().cloned()
    }

    /// Clones all handles from front to back.
    pub fn snapshot(&self) -> Result<Vec<T>> {
        Ok(self.read()?.iter().cloned().collect())
    }
}

impl<T> Collection for SinglyLinkedList<T> {
    fn size(&self) -> Result<usize> {
        SinglyLinkedList::size(self)
    }

    fn destroy(self) -> Result<usize> {
        SinglyLinkedList::destroy(self)
    }
}

impl<T: fmt::Debug> fmt::Debug for SinglyLinkedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.try_read() {
            Some(raw) => f.debug_list().entries(raw.iter()).finish(),
            None => f.write_str("SinglyLinkedList { <locked> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn list_from<T: Clone>(v: &[T]) -> SinglyLinkedList<T> {
        let list = SinglyLinkedList::new();
        for element in v {
            list.append(element.clone()).unwrap();
        }
        list
    }

    pub fn check_links<T>(list: &SinglyLinkedList<T>) {
        let raw = list.read().unwrap();
        let head = match raw.head {
            None => {
                // tail node should also be None.
                assert!(raw.tail.is_none());
                assert_eq!(0, raw.len);
                return;
            }
            Some(head) => head,
        };
        let tail = raw.tail.expect("some tail node");

        let mut len = 1;
        let mut node = head;
        unsafe {
            while let Some(next) = (*node.as_ptr()).next {
                node = next;
                len += 1;
            }
        }

        // verify that the tail node points to the last node.
        assert_eq!(tail, node);
        // check that len matches interior links.
        assert_eq!(len, raw.len);
    }

    #[test]
    fn it_can_insert_by_index() {
        let list = SinglyLinkedList::new();
        list.insert('x', 0).unwrap();
        assert_eq!(list.size(), Ok(1));
        {
            let raw = list.read().unwrap();
            assert_eq!(raw.head, raw.tail);
        }
        check_links(&list);

        list.insert('y', 1).unwrap();
        assert_eq!(list.snapshot().unwrap(), vec!['x', 'y']);
        list.insert('z', 1).unwrap();
        assert_eq!(list.snapshot().unwrap(), vec!['x', 'z', 'y']);
        check_links(&list);

        assert_eq!(list.remove(1), Ok('z'));
        assert_eq!(list.snapshot().unwrap(), vec!['x', 'y']);
        check_links(&list);
    }

    #[test]
    fn it_rejects_out_of_bounds_insert() {
        let list = list_from(&[1, 2]);
        assert_eq!(list.insert(3, 3), Err(CollectionError::OutOfBounds));
        assert_eq!(list.snapshot().unwrap(), vec![1, 2]);
        check_links(&list);
    }

    #[test]
    fn it_can_prepend_and_append() {
        let list = SinglyLinkedList::new();
        for i in 0..3 {
            list.prepend(i).unwrap();
        }
        for i in 10..14 {
            list.append(i).unwrap();
        }
        check_links(&list);
        assert_eq!(list.size(), Ok(7));
        assert_eq!(list.get(0), Some(2));
        assert_eq!(list.get(6), Some(13));
        assert_eq!(list.get(7), None);
        assert_eq!(list.front(), Some(2));
        assert_eq!(list.back(), Some(13));
    }

    #[test]
    fn it_can_correctly_pop_elements() {
        let list = list_from(&[3, 1, 2]);

        assert_eq!(list.remove_first(), Ok(3));
        assert_eq!(list.remove_last(), Ok(2));
        check_links(&list);
        assert_eq!(list.remove_last(), Ok(1));
        check_links(&list);

        assert_eq!(list.remove_first(), Err(CollectionError::InvalidState));
        assert_eq!(list.remove_last(), Err(CollectionError::InvalidState));
        assert_eq!(list.is_empty(), Ok(true));
    }

    #[test]
    fn it_clears_tail_when_front_pop_empties() {
        let list = list_from(&[1]);
        assert_eq!(list.remove_first(), Ok(1));
        check_links(&list);

        // The tail must not dangle: appending again links from the new head.
        list.append(2).unwrap();
        list.append(3).unwrap();
        assert_eq!(list.snapshot().unwrap(), vec![2, 3]);
        check_links(&list);
    }

    #[test]
    fn it_removes_by_index() {
        let list = list_from(&[0, 1, 2, 3, 4]);
        assert_eq!(list.remove(5), Err(CollectionError::OutOfBounds));
        assert_eq!(list.remove(0), Ok(0));
        assert_eq!(list.remove(3), Ok(4));
        assert_eq!(list.remove(1), Ok(2));
        assert_eq!(list.snapshot().unwrap(), vec![1, 3]);
        assert_eq!(list.back(), Some(3));
        check_links(&list);
    }

    #[test]
    fn it_requires_comparator_for_membership() {
        let list = list_from(&[1, 2]);
        assert_eq!(list.is_in(&1), Err(CollectionError::NullArgument));

        let list = SinglyLinkedList::with_comparator(|a: &i32, b: &i32| a == b);
        assert_eq!(list.is_in(&1), Ok(false));
        list.append(1).unwrap();
        list.append(5).unwrap();
        assert_eq!(list.is_in(&5), Ok(true));
        assert_eq!(list.is_in(&4), Ok(false));
    }

    #[test]
    fn it_can_shift_segments_under_one_lock() {
        // Each element takes over the value of its successor, the last one
        // moves on by one: the way a snake body follows its head.
        let list = list_from(&[(0, 0), (1, 0), (2, 0)]);
        {
            let mut raw = list.write().unwrap();
            let mut iter = raw.iter_mut().peekable();
            while let Some(current) = iter.next() {
                match iter.peek() {
                    Some(next) => *current = **next,
                    None => current.0 += 1,
                }
            }
        }
        assert_eq!(list.snapshot().unwrap(), vec![(1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn it_does_not_own_elements() {
        let segment = Arc::new(7u8);
        let list = SinglyLinkedList::new();
        list.append(Arc::clone(&segment)).unwrap();
        list.prepend(Arc::clone(&segment)).unwrap();
        assert_eq!(Arc::strong_count(&segment), 3);

        list.remove_last().unwrap();
        assert_eq!(Arc::strong_count(&segment), 2);

        assert_eq!(list.destroy(), Ok(1));
        assert_eq!(Arc::strong_count(&segment), 1);
    }

    #[test]
    fn it_drops_remaining_nodes() {
        let segment = Arc::new(());
        {
            let list = SinglyLinkedList::new();
            for _ in 0..100 {
                list.append(Arc::clone(&segment)).unwrap();
            }
        }
        assert_eq!(Arc::strong_count(&segment), 1);
    }

    #[test]
    fn it_reports_lock_failure_on_timeout() {
        let config = CollectionConfig::default().with_lock_timeout(Duration::from_millis(5));
        let list = SinglyLinkedList::with_config(config, None);
        list.append(1).unwrap();

        let guard = list.write().unwrap();
        assert_eq!(list.size(), Err(CollectionError::LockFailure));
        assert_eq!(list.get(0), None);
        assert_eq!(list.insert(2, 0), Err(CollectionError::LockFailure));
        assert_eq!(format!("{:?}", list), "SinglyLinkedList { <locked> }");
        drop(guard);

        assert_eq!(list.snapshot(), Ok(vec![1]));
        assert_eq!(format!("{:?}", list), "[1]");
    }

    #[test]
    #[cfg_attr(target_os = "emscripten", ignore)]
    fn test_send() {
        let list = list_from(&[1, 2, 3]);
        thread::spawn(move || {
            check_links(&list);
            let a: &[_] = &[&1, &2, &3];
            assert_eq!(a, &*list.read().unwrap().iter().collect::<Vec<_>>());
        })
        .join()
        .ok()
        .unwrap();
    }
}
