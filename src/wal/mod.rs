pub mod reader;
pub mod record;
pub mod writer;

use serde::{Deserialize, Serialize};

pub use record::WALRecord;

/// Controls when the WAL is fsync'd to disk.
///
/// Trade-off: durability vs throughput.
///   - EveryWrite: zero data loss, ~10x slower (each fsync waits for disk)
///   - EveryNWrites: batched durability, lose up to N writes on crash
///   - EveryNMillis: bounded loss window, much higher throughput
///
/// Every append is flushed to the OS regardless; the policy only decides
/// when the OS is asked to reach the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// fsync after every record. Safest, slowest.
    EveryWrite,
    /// fsync every N records. Batched durability.
    EveryNWrites(usize),
    /// fsync on the first append at least N milliseconds after the last sync.
    EveryNMillis(u64),
}

impl Default for SyncPolicy {
    fn default() -> Self {
        SyncPolicy::EveryNWrites(64)
    }
}
