//! The reverse-index surface seen by the ingestion, retrieval and expiry
//! sides of the article backend. Object safe, so backends can be picked by
//! name at startup (see [`crate::registry`]).

use time::OffsetDateTime;

use crate::error::Result;
use crate::types::{ArticleMeta, RiElement, RiHistory};

/// A per-article write session.
pub trait RiWriter {
    /// Called for the first group/number pair of the article.
    fn write_first(&mut self, md: &ArticleMeta, rie: &RiElement) -> Result<()>;

    /// Called for every further group/number pair.
    fn write_more(&mut self, md: &ArticleMeta, rie: &RiElement) -> Result<()>;

    /// Called after all pairs have been written.
    fn commit(self: Box<Self>) -> Result<()>;
}

/// A lazily decoding result stream that may hold backing-store resources.
///
/// Dropping a cursor releases them; `release` makes that explicit.
pub trait Cursor: Iterator {
    fn release(self: Box<Self>) {}
}

pub trait RiMethod: Send + Sync {
    /// Start a write session for `msgid`. `None` means no session is needed
    /// and the caller skips the article.
    fn begin(&self, msgid: &[u8]) -> Option<Box<dyn RiWriter + '_>>;

    /// The first group/number pair recorded for `msgid`.
    fn lookup(&self, msgid: &[u8]) -> Result<RiElement>;

    /// Every group/number pair recorded for `msgid`.
    fn lookup_all(&self, msgid: &[u8]) -> Result<Box<dyn Cursor<Item = RiElement> + '_>>;

    /// Articles expiring at or before `cutoff`, oldest first. Each article
    /// yields its associations, then its message-id marker.
    fn query_expired(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<Box<dyn Cursor<Item = Result<RiHistory>> + '_>>;

    /// Remove a time-indexed article from every index.
    fn expire(&self, msgid: &[u8]) -> Result<()>;
}
