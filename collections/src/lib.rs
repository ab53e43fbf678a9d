//! Reader/writer-locked containers over element handles the caller owns.
//!
//! [`DynArray`] is an index-addressable sequence that doubles its storage
//! when full. [`SinglyLinkedList`] is a chain of owned nodes with O(1)
//! insertion at both ends. Each instance carries its own
//! `parking_lot::RwLock`: readers share it, writers hold it exclusively for
//! the whole operation.
//!
//! Neither container owns the elements. They store handles such as `Arc<E>`,
//! `&'a E` or plain ids and only ever drop the handle, never the payload.

pub mod config;
pub mod dyn_array;
pub mod error;
pub(crate) mod lock;
pub mod singly_linked_list;

pub use self::config::CollectionConfig;
pub use self::dyn_array::DynArray;
pub use self::error::{status_code, CollectionError, Result};
pub use self::singly_linked_list::{Comparator, SinglyLinkedList};

/// Operations shared by every container in this crate.
pub trait Collection: Sized {
    /// Returns the number of live elements.
    fn size(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    /// Tears the container down, returning how many element handles it still
    /// held. The elements themselves are left to the caller.
    fn destroy(self) -> Result<usize>;
}

/// Destroys the container held in `slot` and leaves `None` behind.
///
/// Destroying an empty slot, e.g. a second time, fails with `NullArgument`
/// and has no effect.
///
/// # Examples
///
/// ```
/// use coil_collections::{destroy_in_place, CollectionError, DynArray};
///
/// let mut items = Some(DynArray::<u8>::new(4).unwrap());
/// assert_eq!(destroy_in_place(&mut items), Ok(0));
/// assert!(items.is_none());
/// assert_eq!(destroy_in_place(&mut items), Err(CollectionError::NullArgument));
/// ```
pub fn destroy_in_place<C: Collection>(slot: &mut Option<C>) -> Result<usize> {
    match slot.take() {
        Some(collection) => collection.destroy(),
        None => {
            log::warn!("Attempted to destroy a missing collection");
            Err(CollectionError::NullArgument)
        }
    }
}
