//! # rildb
//!
//! Reverse index storage for an NNTP article backend: given a message-id,
//! find the newsgroups and article numbers it was filed under, and sweep
//! articles in order of expiry.
//!
//! ## Layout
//! The reverse index ([`ri::RiDb`]) is three ordered key-value stores: the
//! message index, the time index and the reverse-time index. Each store is
//! a [`DB`]: a skip-list memtable holding the data set, made durable by a
//! CRC-framed write-ahead log that is checkpointed as it fills with dead
//! records. The reverse index only needs the [`KvStore`] contract, so any
//! ordered store with snapshot range scans can stand in.

pub mod config;
pub mod db;
pub mod error;
pub mod iterator;
pub mod memtable;
pub mod method;
pub mod registry;
pub mod ri;
pub mod store;
pub mod types;
pub mod wal;

// Public re-exports for the top-level API
pub use config::Config;
pub use db::{DB, Options, Stats};
pub use error::{Error, Result};
pub use method::{Cursor, RiMethod, RiWriter};
pub use registry::Registry;
pub use ri::{Index, RiDb, TimeKey};
pub use store::KvStore;
pub use types::{ArticleMeta, MessageId, RiElement, RiHistory};
