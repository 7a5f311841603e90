use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::wal::record::WALRecord;

/// Reads WAL records from a file for crash recovery.
///
/// Loads the entire file into memory, then iterates record by record.
/// On open, a store replays every WAL file in order into a fresh memtable.
/// If CRC fails on a record, replay of that file stops: it was a partial
/// write from a crash. All preceding records are valid.
pub struct WALReader {
    data: Vec<u8>,
}

impl WALReader {
    /// Open a WAL file for reading.
    pub fn new(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(WALReader { data })
    }

    /// Create an iterator over all valid records in the WAL.
    pub fn iter(&self) -> WALIterator<'_> {
        WALIterator {
            data: &self.data,
            offset: 0,
        }
    }

    /// Size of the file in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Iterator over WAL records. Yields records until EOF or corruption.
///
/// WAL writes are sequential and append-only, so nothing valid can follow
/// a damaged record. After the iterator is exhausted, `offset()` below the
/// file length means the tail was discarded.
pub struct WALIterator<'a> {
    data: &'a [u8],
    offset: usize,
}

impl WALIterator<'_> {
    /// Bytes consumed by the records yielded so far.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for WALIterator<'_> {
    type Item = WALRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.data.get(self.offset..).filter(|r| !r.is_empty())?;
        let record = WALRecord::decode(remaining).ok()?;
        self.offset += record.encoded_size();
        Some(record)
    }
}
