use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::wal::SyncPolicy;
use crate::wal::record::WALRecord;

const WAL_EXTENSION: &str = "wal";

/// Writes WAL records to a file on disk.
///
/// Two layers of buffering:
///   BufWriter.flush()  → Rust buffer → OS page cache
///   file.sync_all()    → OS page cache → physical disk
///
/// Every append reaches the page cache before it returns; `SyncPolicy`
/// decides how often the page cache is pushed to disk.
pub struct WALWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    offset: u64,
    sync_policy: SyncPolicy,
    writes_since_sync: usize,
    last_sync: Instant,
}

impl WALWriter {
    /// Create a new WAL writer at the given path, appending if it exists.
    pub fn new(path: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let offset = file.metadata()?.len();

        Ok(WALWriter {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            offset,
            sync_policy,
            writes_since_sync: 0,
            last_sync: Instant::now(),
        })
    }

    /// Append a record to the WAL.
    /// Depending on SyncPolicy, may fsync after this write.
    pub fn append(&mut self, record: &WALRecord) -> Result<()> {
        let encoded = record.encode();

        self.writer.write_all(&encoded)?;
        self.writer.flush()?;
        self.offset += encoded.len() as u64;
        self.writes_since_sync += 1;

        let due = match self.sync_policy {
            SyncPolicy::EveryWrite => true,
            SyncPolicy::EveryNWrites(n) => self.writes_since_sync >= n,
            SyncPolicy::EveryNMillis(ms) => self.last_sync.elapsed() >= Duration::from_millis(ms),
        };
        if due {
            self.sync()?;
        }

        Ok(())
    }

    /// Force fsync to disk. Ensures all buffered writes are durable.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_sync = 0;
        self.last_sync = Instant::now();
        Ok(())
    }

    /// Current file length (bytes written so far, including earlier sessions).
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Appends not yet covered by an fsync.
    pub fn writes_since_sync(&self) -> usize {
        self.writes_since_sync
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Manages the numbered WAL files of one store directory.
///
/// Files are named `000001.wal`, `000002.wal`, ... and replayed in that
/// order. On checkpoint:
/// 1. Rotate to a new WAL
/// 2. Rewrite the live entries into it and fsync
/// 3. Delete the old WAL
///
/// CRITICAL INVARIANT: an old WAL is only deleted AFTER the live data it
/// holds has been fsync'd into a newer one. Violating this loses data.
pub struct WALManager {
    dir: PathBuf,
    active_writer: WALWriter,
    active_path: PathBuf,
    next_wal_id: u64,
    sync_policy: SyncPolicy,
}

impl WALManager {
    /// Create a WAL manager for the given directory.
    ///
    /// Starts a new active WAL numbered after any existing one; existing
    /// files are left for the caller to replay (see [`WALManager::existing`]).
    pub fn new(dir: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let next_wal_id = Self::existing_ids(dir)?.last().map_or(1, |(id, _)| id + 1);
        let active_path = Self::wal_path(dir, next_wal_id);
        let active_writer = WALWriter::new(&active_path, sync_policy)?;

        Ok(WALManager {
            dir: dir.to_path_buf(),
            active_writer,
            active_path,
            next_wal_id: next_wal_id + 1,
            sync_policy,
        })
    }

    /// WAL files currently in `dir`, in replay order.
    pub fn existing(dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(Self::existing_ids(dir)?.into_iter().map(|(_, path)| path).collect())
    }

    fn existing_ids(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != WAL_EXTENSION) {
                continue;
            }
            let id = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok());
            if let Some(id) = id {
                found.push((id, path));
            }
        }
        found.sort_unstable_by_key(|(id, _)| *id);
        Ok(found)
    }

    fn wal_path(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("{id:06}.{WAL_EXTENSION}"))
    }

    /// The writer all new records go to.
    pub fn active_writer(&mut self) -> &mut WALWriter {
        &mut self.active_writer
    }

    /// Path of the active WAL file.
    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    /// Rotate: fsync the current WAL, make a new one active.
    /// Returns the path of the old WAL (caller deletes once its data is safe).
    pub fn rotate(&mut self) -> Result<PathBuf> {
        self.active_writer.sync()?;

        let new_path = Self::wal_path(&self.dir, self.next_wal_id);
        let new_writer = WALWriter::new(&new_path, self.sync_policy)?;
        self.next_wal_id += 1;

        self.active_writer = new_writer;
        Ok(std::mem::replace(&mut self.active_path, new_path))
    }

    /// WAL files older than the active one, in replay order.
    pub fn retired(&self) -> Result<Vec<PathBuf>> {
        let active_id = self.next_wal_id - 1;
        Ok(Self::existing_ids(&self.dir)?
            .into_iter()
            .filter(|(id, _)| *id < active_id)
            .map(|(_, path)| path)
            .collect())
    }

    /// Delete an old WAL file (safe only after its data is fsync'd elsewhere).
    pub fn delete_wal(path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }
}
