//! Shared fixtures for the reverse index tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rildb::iterator::SnapshotIterator;
use rildb::wal::SyncPolicy;
use rildb::{Error, KvStore, Options, Result, RiDb};

/// Options for on-disk stores in tests: every write reaches the disk.
pub fn options() -> Options {
    Options {
        sync_policy: SyncPolicy::EveryWrite,
        ..Options::default()
    }
}

pub fn open_spool(dir: &tempfile::TempDir) -> RiDb {
    RiDb::open_spool(dir.path(), &options()).unwrap()
}

/// In-memory store whose operations can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    data: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
    pub fail_get: AtomicBool,
    pub fail_put: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FlakyStore {
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn set_fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(Error::Io(io::Error::other("injected failure")));
        }
        Ok(())
    }
}

impl KvStore for FlakyStore {
    type Iter = SnapshotIterator;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Self::check(&self.fail_get)?;
        Ok(self.data.lock().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        Self::check(&self.fail_put)?;
        self.data.lock().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        Self::check(&self.fail_delete)?;
        self.data.lock().remove(key);
        Ok(())
    }

    fn range(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Result<SnapshotIterator> {
        let entries = self
            .data
            .lock()
            .range::<[u8], _>((lower, upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(SnapshotIterator::new(entries))
    }
}

pub fn flaky_index() -> RiDb<FlakyStore> {
    RiDb::from_stores(FlakyStore::default(), FlakyStore::default(), FlakyStore::default())
}
