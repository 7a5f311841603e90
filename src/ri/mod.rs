//! Reverse index: message-id → (group, number) associations, with a
//! time-ordered expiry index.
//!
//! Three independent stores back one logical index:
//!
//! ```text
//! MDB  rildbm   message-id            → "<group> <number>\n"...
//! TDB  rildbt   TimeKey(expiry, hash) → message-id
//! RDB  rildbr   message-id            → TimeKey
//! ```
//!
//! There is no transaction spanning the three. A crash between the time
//! index writes of `write_first` and the message index write of `commit`,
//! or between the deletions of `expire`, leaves them out of step.

pub mod codec;
pub mod cursor;
pub mod timekey;
pub mod writer;

use std::fmt;
use std::ops::Bound;
use std::path::Path;

use time::OffsetDateTime;
use tracing::instrument;

pub use cursor::{ExpiredCursor, LookupCursor};
pub use timekey::TimeKey;
pub use writer::RiDbWriter;

use crate::config::Config;
use crate::db::{DB, Options};
use crate::error::{Error, Result};
use crate::method::{Cursor, RiMethod, RiWriter};
use crate::store::KvStore;
use crate::types::{RiElement, RiHistory};

/// Name the built-in backend registers under.
pub const BACKEND_NAME: &str = "rildb";

/// One of the three stores of the reverse index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    /// Message-id → association list.
    Message,
    /// TimeKey → message-id.
    Time,
    /// Message-id → TimeKey.
    ReverseTime,
}

impl Index {
    /// Directory of this store beneath the spool.
    pub fn dir_name(self) -> &'static str {
        match self {
            Index::Message => "rildbm",
            Index::Time => "rildbt",
            Index::ReverseTime => "rildbr",
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Message => write!(f, "message index"),
            Index::Time => write!(f, "time index"),
            Index::ReverseTime => write!(f, "reverse-time index"),
        }
    }
}

/// The reverse index over three ordered stores.
pub struct RiDb<S: KvStore = DB> {
    pub(crate) mdb: S,
    pub(crate) tdb: S,
    pub(crate) rdb: S,
}

impl RiDb<DB> {
    /// Open (or create) the three stores beneath `spool`.
    ///
    /// If one fails to open, the ones already open are closed again.
    #[instrument(skip_all, fields(spool = %spool.display()))]
    pub fn open_spool(spool: &Path, options: &Options) -> Result<Self> {
        let mdb = DB::open(&spool.join(Index::Message.dir_name()), *options)?;
        let tdb = DB::open(&spool.join(Index::Time.dir_name()), *options)?;
        let rdb = DB::open(&spool.join(Index::ReverseTime.dir_name()), *options)?;
        tracing::info!("Opened reverse index stores");
        Ok(RiDb::from_stores(mdb, tdb, rdb))
    }

    /// Sync and close all three stores, reporting the first failure.
    pub fn close(self) -> Result<()> {
        let results = [self.mdb.close(), self.tdb.close(), self.rdb.close()];
        results.into_iter().collect()
    }
}

impl<S: KvStore> RiDb<S> {
    pub fn from_stores(mdb: S, tdb: S, rdb: S) -> Self {
        RiDb { mdb, tdb, rdb }
    }

    /// Message-id → association list.
    pub fn mdb(&self) -> &S {
        &self.mdb
    }

    /// TimeKey → message-id.
    pub fn tdb(&self) -> &S {
        &self.tdb
    }

    /// Message-id → TimeKey.
    pub fn rdb(&self) -> &S {
        &self.rdb
    }

    /// Start a write session for one article.
    pub fn begin(&self, msgid: &[u8]) -> RiDbWriter<'_, S> {
        RiDbWriter::new(self, msgid)
    }

    /// First association of `msgid`. Only the first line is decoded.
    pub fn lookup(&self, msgid: &[u8]) -> Result<RiElement> {
        let record = self.read_record(msgid)?;
        codec::decode_first(&record)
    }

    /// Cursor over every association of `msgid`.
    pub fn lookup_all(&self, msgid: &[u8]) -> Result<LookupCursor> {
        let record = self.read_record(msgid)?;
        Ok(LookupCursor::new(record))
    }

    /// Sweep articles whose expiry is at or before `cutoff`.
    pub fn query_expired(&self, cutoff: OffsetDateTime) -> Result<ExpiredCursor<'_, S>> {
        let barrier = TimeKey::barrier(cutoff)?;
        let iter = self
            .tdb
            .range(Bound::Unbounded, Bound::Included(barrier.as_bytes()))
            .map_err(|e| Error::store_read(Index::Time, e))?;
        Ok(ExpiredCursor::new(&self.mdb, iter, barrier))
    }

    /// Remove a time-indexed article from all three stores.
    ///
    /// All three deletions are attempted even when one fails; the error
    /// then carries the first failure and the article may be partially
    /// expired. Calling `expire` again is safe.
    pub fn expire(&self, msgid: &[u8]) -> Result<()> {
        let time_key = self
            .rdb
            .get(msgid)
            .map_err(|e| Error::store_read(Index::ReverseTime, e))?
            .ok_or(Error::NotFound)?;

        let results = [
            self.mdb.delete(msgid).map_err(|e| Error::store_write(Index::Message, e)),
            self.tdb.delete(&time_key).map_err(|e| Error::store_write(Index::Time, e)),
            self.rdb.delete(msgid).map_err(|e| Error::store_write(Index::ReverseTime, e)),
        ];
        let mut failures = results.into_iter().filter_map(Result::err);
        match failures.next() {
            None => Ok(()),
            Some(first) => Err(Error::PartialExpiry {
                failed: 1 + failures.count(),
                first: Box::new(first),
            }),
        }
    }

    fn read_record(&self, msgid: &[u8]) -> Result<Vec<u8>> {
        self.mdb
            .get(msgid)
            .map_err(|e| Error::store_read(Index::Message, e))?
            .ok_or(Error::NotFound)
    }
}

impl<S: KvStore + 'static> RiMethod for RiDb<S> {
    fn begin(&self, msgid: &[u8]) -> Option<Box<dyn RiWriter + '_>> {
        Some(Box::new(RiDb::begin(self, msgid)))
    }

    fn lookup(&self, msgid: &[u8]) -> Result<RiElement> {
        RiDb::lookup(self, msgid)
    }

    fn lookup_all(&self, msgid: &[u8]) -> Result<Box<dyn Cursor<Item = RiElement> + '_>> {
        Ok(Box::new(RiDb::lookup_all(self, msgid)?))
    }

    fn query_expired(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<Box<dyn Cursor<Item = Result<RiHistory>> + '_>> {
        Ok(Box::new(RiDb::query_expired(self, cutoff)?))
    }

    fn expire(&self, msgid: &[u8]) -> Result<()> {
        RiDb::expire(self, msgid)
    }
}

/// Registry loader for [`BACKEND_NAME`].
pub fn load(cfg: &Config) -> Result<Box<dyn RiMethod>> {
    Ok(Box::new(RiDb::open_spool(&cfg.spool, &cfg.store_options())?))
}
