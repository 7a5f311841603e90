//! A single ordered key-value store: one directory, one memtable, one
//! write-ahead log.
//!
//! Writes go to the WAL first, then to the memtable. The memtable holds the
//! whole data set; the WAL is periodically checkpointed (rewritten with only
//! the live entries) so it does not grow without bound.

use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::iterator::{SnapshotIterator, StorageIterator};
use crate::memtable::MemTable;
use crate::store::KvStore;
use crate::types::{Value, ValueType};
use crate::wal::reader::WALReader;
use crate::wal::writer::{WALManager, WALWriter};
use crate::wal::{SyncPolicy, WALRecord};

/// Tuning for one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub sync_policy: SyncPolicy,
    /// The active WAL is checkpointed once it exceeds this size and twice
    /// the live data size.
    pub checkpoint_bytes: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            sync_policy: SyncPolicy::default(),
            checkpoint_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Point-in-time counters of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub live_keys: usize,
    pub memtable_bytes: usize,
    pub wal_bytes: u64,
    pub puts: u64,
    pub deletes: u64,
    pub gets: u64,
    pub checkpoints: u64,
}

#[derive(Default)]
struct Counters {
    puts: AtomicU64,
    deletes: AtomicU64,
    gets: AtomicU64,
    checkpoints: AtomicU64,
}

/// An ordered key-value store backed by a skip list and a write-ahead log.
///
/// Writers serialize on the WAL mutex, which they hold until the memtable
/// reflects the write, so the memtable always applies records in WAL order.
/// Readers only take the memtable read lock.
pub struct DB {
    dir: PathBuf,
    options: Options,
    memtable: RwLock<MemTable>,
    wal: Mutex<WALManager>,
    counters: Counters,
}

impl DB {
    /// Open (or create) the store in `dir`.
    ///
    /// Replays every WAL file in order, then writes the live entries into a
    /// fresh WAL and deletes the replayed ones.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn open(dir: &Path, options: Options) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let existing = WALManager::existing(dir)?;
        let mut memtable = MemTable::new();
        let mut replayed = 0usize;
        for path in &existing {
            let reader = WALReader::new(path)?;
            let mut records = reader.iter();
            for record in records.by_ref() {
                match record.record_type {
                    ValueType::Put => memtable.put(record.key, record.value),
                    ValueType::Delete => memtable.delete(record.key),
                }
                replayed += 1;
            }
            if records.offset() < reader.len() {
                tracing::warn!(
                    wal = %path.display(),
                    valid_bytes = records.offset(),
                    file_bytes = reader.len(),
                    "Discarding damaged write-ahead log tail"
                );
            }
        }

        let mut wal = WALManager::new(dir, options.sync_policy)?;
        let memtable = Self::rewrite_live(&memtable, wal.active_writer())?;
        for path in wal.retired()? {
            WALManager::delete_wal(&path)?;
        }
        tracing::debug!(
            files = existing.len(),
            records = replayed,
            live_keys = memtable.live_len(),
            "Replayed write-ahead log"
        );

        Ok(DB {
            dir: dir.to_path_buf(),
            options,
            memtable: RwLock::new(memtable),
            wal: Mutex::new(wal),
            counters: Counters::default(),
        })
    }

    /// Look up a key.
    pub fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        Ok(self.memtable.read().get(key).map(<[u8]>::to_vec))
    }

    /// Insert or overwrite a key.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let record = WALRecord::put(key.to_vec(), value.to_vec());
        let mut wal = self.wal.lock();
        wal.active_writer().append(&record)?;
        self.memtable.write().put(record.key, record.value);
        self.counters.puts.fetch_add(1, Ordering::Relaxed);
        self.maybe_checkpoint(&mut wal);
        Ok(())
    }

    /// Delete a key. Deleting an absent key succeeds.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let record = WALRecord::delete(key.to_vec());
        let mut wal = self.wal.lock();
        wal.active_writer().append(&record)?;
        self.memtable.write().delete(record.key);
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        self.maybe_checkpoint(&mut wal);
        Ok(())
    }

    /// Snapshot of the live entries within the bounds.
    pub fn range(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Result<SnapshotIterator> {
        let memtable = self.memtable.read();
        let mut iter = memtable.iter();
        match lower {
            Bound::Included(key) => iter.seek(key)?,
            Bound::Excluded(key) => {
                iter.seek(key)?;
                if iter.is_valid() && iter.key() == key {
                    iter.next()?;
                }
            }
            Bound::Unbounded => {}
        }

        let mut entries = Vec::new();
        while iter.is_valid() {
            let within = match upper {
                Bound::Included(key) => iter.key() <= key,
                Bound::Excluded(key) => iter.key() < key,
                Bound::Unbounded => true,
            };
            if !within {
                break;
            }
            if iter.value_type() == ValueType::Put {
                entries.push((iter.key().to_vec(), iter.value().to_vec()));
            }
            iter.next()?;
        }
        Ok(SnapshotIterator::new(entries))
    }

    /// Rewrite the live entries into a new WAL and drop the old one.
    pub fn checkpoint(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        self.checkpoint_locked(&mut wal)
    }

    /// Force the active WAL to disk.
    pub fn sync(&self) -> Result<()> {
        self.wal.lock().active_writer().sync()
    }

    /// Sync and close the store.
    pub fn close(self) -> Result<()> {
        self.sync()
    }

    pub fn stats(&self) -> Stats {
        let wal_bytes = self.wal.lock().active_writer().offset();
        let memtable = self.memtable.read();
        Stats {
            live_keys: memtable.live_len(),
            memtable_bytes: memtable.size(),
            wal_bytes,
            puts: self.counters.puts.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
            gets: self.counters.gets.load(Ordering::Relaxed),
            checkpoints: self.counters.checkpoints.load(Ordering::Relaxed),
        }
    }

    /// Checkpoint once the active WAL is mostly dead records.
    /// The write that triggered it has already succeeded, so a failed
    /// checkpoint is reported and retried on a later write.
    fn maybe_checkpoint(&self, wal: &mut WALManager) {
        let live_bytes = self.memtable.read().size() as u64;
        let threshold = self.options.checkpoint_bytes.max(live_bytes.saturating_mul(2));
        if wal.active_writer().offset() <= threshold {
            return;
        }
        if let Err(error) = self.checkpoint_locked(wal) {
            tracing::warn!(dir = %self.dir.display(), %error, "Checkpoint failed");
        }
    }

    fn checkpoint_locked(&self, wal: &mut WALManager) -> Result<()> {
        wal.rotate()?;
        // Writers are held off by the WAL lock, so nothing changes between
        // the rewrite and the swap.
        let compacted = {
            let memtable = self.memtable.read();
            Self::rewrite_live(&memtable, wal.active_writer())?
        };
        *self.memtable.write() = compacted;
        // The rewrite carries no tombstones, so every older WAL must go,
        // including any left behind by an earlier failed checkpoint.
        for path in wal.retired()? {
            WALManager::delete_wal(&path)?;
        }

        self.counters.checkpoints.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            dir = %self.dir.display(),
            wal_bytes = wal.active_writer().offset(),
            "Checkpointed write-ahead log"
        );
        Ok(())
    }

    /// Append every live entry of `memtable` to `writer`, fsync, and return
    /// the tombstone-free memtable those records describe.
    fn rewrite_live(memtable: &MemTable, writer: &mut WALWriter) -> Result<MemTable> {
        let compacted = memtable.compacted()?;
        let mut iter = compacted.iter();
        while iter.is_valid() {
            writer.append(&WALRecord::put(iter.key().to_vec(), iter.value().to_vec()))?;
            iter.next()?;
        }
        writer.sync()?;
        Ok(compacted)
    }
}

impl Drop for DB {
    fn drop(&mut self) {
        if let Err(error) = self.wal.get_mut().active_writer().sync() {
            tracing::warn!(dir = %self.dir.display(), %error, "Failed to sync write-ahead log on close");
        }
    }
}

impl KvStore for DB {
    type Iter = SnapshotIterator;

    fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        DB::get(self, key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        DB::put(self, key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        DB::delete(self, key)
    }

    fn range(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Result<SnapshotIterator> {
        DB::range(self, lower, upper)
    }
}
