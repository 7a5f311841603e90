pub mod snapshot;

pub use snapshot::SnapshotIterator;

use crate::error::Result;

/// The central iteration abstraction for the backing store.
///
/// Every sorted data source (skip list, store snapshot) implements this
/// trait, and the reverse index drives its expiry sweep through it.
pub trait StorageIterator {
    /// Returns the current key. Only valid when is_valid() is true.
    fn key(&self) -> &[u8];

    /// Returns the current value. Only valid when is_valid() is true.
    fn value(&self) -> &[u8];

    /// Returns true if the iterator is positioned at a valid entry.
    fn is_valid(&self) -> bool;

    /// Advances to the next entry. Returns error on IO failure.
    fn next(&mut self) -> Result<()>;

    /// Positions the iterator at the first entry with key >= target.
    fn seek(&mut self, key: &[u8]) -> Result<()>;
}
