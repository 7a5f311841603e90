use time::OffsetDateTime;

/// Raw key bytes.
pub type Key = Vec<u8>;

/// Raw value bytes.
pub type Value = Vec<u8>;

/// Globally unique, opaque article identifier. Used verbatim as a key.
pub type MessageId = Vec<u8>;

/// Distinguishes puts from deletes in the backing store.
/// A Delete writes a tombstone: the key stays, marked as deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// A normal put operation.
    Put = 0x01,
    /// A delete (tombstone marker).
    Delete = 0x02,
}

/// A (newsgroup, article number) association of one article.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RiElement {
    pub group: Vec<u8>,
    pub num: i64,
}

impl RiElement {
    pub fn new(group: impl Into<Vec<u8>>, num: i64) -> Self {
        RiElement {
            group: group.into(),
            num,
        }
    }
}

/// One item produced by an expiry sweep.
///
/// For every expired article the sweep yields all of its associations
/// first, then exactly one `Expired` carrying the message-id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiHistory {
    Association(RiElement),
    Expired(MessageId),
}

/// Article metadata handed over by the ingestion side at write time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleMeta {
    /// `None` means the article never expires and is not time-indexed.
    pub expires: Option<OffsetDateTime>,
}

impl ArticleMeta {
    pub fn expiring(at: OffsetDateTime) -> Self {
        ArticleMeta { expires: Some(at) }
    }
}
