pub mod skiplist;

use skiplist::{SkipList, SkipListIterator};

use crate::error::Result;
use crate::iterator::StorageIterator;
use crate::types::ValueType;

/// In-memory sorted view of a store. Wraps a SkipList.
///
/// Every write lands here after it has been appended to the WAL. Deletes
/// are tombstones so that replaying a WAL in order always ends in the same
/// state; `compacted()` drops them when the store checkpoints.
#[derive(Default)]
pub struct MemTable {
    data: SkipList,
    live: usize,
}

impl MemTable {
    /// Create a new empty memtable.
    pub fn new() -> Self {
        MemTable::default()
    }

    /// Insert or update a key-value pair.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        if !self.is_live(&key) {
            self.live += 1;
        }
        self.data.insert(key, value);
    }

    /// Look up a key. Returns None if not found OR if tombstoned.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.data.get(key)
    }

    /// Mark a key as deleted by writing a tombstone.
    pub fn delete(&mut self, key: Vec<u8>) {
        if self.is_live(&key) {
            self.live -= 1;
        }
        self.data.insert_tombstone(key);
    }

    /// Return a sorted iterator over all entries (including tombstones).
    pub fn iter(&self) -> SkipListIterator<'_> {
        self.data.iter()
    }

    /// Current memory usage in bytes.
    pub fn size(&self) -> usize {
        self.data.size_bytes()
    }

    /// Number of keys holding a live value.
    pub fn live_len(&self) -> usize {
        self.live
    }

    /// Number of entries, tombstones included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A fresh memtable holding only the live entries of this one.
    pub fn compacted(&self) -> Result<MemTable> {
        let mut fresh = MemTable::new();
        let mut iter = self.iter();
        while iter.is_valid() {
            if iter.value_type() == ValueType::Put {
                fresh.put(iter.key().to_vec(), iter.value().to_vec());
            }
            iter.next()?;
        }
        Ok(fresh)
    }

    fn is_live(&self, key: &[u8]) -> bool {
        self.data.get(key).is_some()
    }
}
