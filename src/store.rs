use std::ops::Bound;

use crate::error::Result;
use crate::iterator::StorageIterator;
use crate::types::Value;

/// What the reverse index needs from an ordered key-value store.
///
/// Implementations must allow concurrent point reads and writes from many
/// threads, and `range` must return an iterator that is stable for its
/// whole lifetime: it need not observe writes made after it was created.
/// Deleting an absent key is not an error.
pub trait KvStore: Send + Sync {
    type Iter: StorageIterator;

    fn get(&self, key: &[u8]) -> Result<Option<Value>>;

    /// Stores `value` under `key` as a single atomic write.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Forward iterator over the live entries within the bounds, positioned
    /// at the first one.
    fn range(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Result<Self::Iter>;
}
