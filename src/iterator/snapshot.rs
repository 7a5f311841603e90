use crate::error::Result;
use crate::iterator::StorageIterator;
use crate::types::{Key, Value};

/// A forward iterator over an owned, sorted copy of live entries.
///
/// Stores hand these out for range scans: the copy is taken under the
/// store's read lock, so the iterator is stable while writers carry on.
#[derive(Debug, Default)]
pub struct SnapshotIterator {
    entries: Vec<(Key, Value)>,
    pos: usize,
}

impl SnapshotIterator {
    /// Wrap entries that are already sorted by key, without duplicates.
    pub fn new(entries: Vec<(Key, Value)>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        SnapshotIterator { entries, pos: 0 }
    }

    /// Number of entries in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StorageIterator for SnapshotIterator {
    fn key(&self) -> &[u8] {
        &self.entries[self.pos].0
    }

    fn value(&self) -> &[u8] {
        &self.entries[self.pos].1
    }

    fn is_valid(&self) -> bool {
        self.pos < self.entries.len()
    }

    fn next(&mut self) -> Result<()> {
        if self.is_valid() {
            self.pos += 1;
        }
        Ok(())
    }

    fn seek(&mut self, key: &[u8]) -> Result<()> {
        self.pos = self.entries.partition_point(|(k, _)| k.as_slice() < key);
        Ok(())
    }
}
