use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Error, Result};

/// `YYYYMMDDhhmmss`, always in UTC.
const TIME_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year][month][day][hour][minute][second]");

/// Length of the textual time prefix.
pub const TIME_PREFIX_LEN: usize = 14;

/// Length of the message-id hash suffix.
pub const HASH_LEN: usize = 8;

/// Key of the time index: fixed-width expiry time, then a hash of the
/// message-id that keeps articles expiring in the same second apart.
///
/// Byte order equals (expiry second, hash) order, so a forward scan over
/// the time index enumerates articles by increasing expiry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeKey(Vec<u8>);

impl TimeKey {
    pub fn new(expires: OffsetDateTime, msgid: &[u8]) -> Result<Self> {
        let mut key = time_prefix(expires)?;
        key.extend_from_slice(&xxh3_64(msgid).to_be_bytes());
        Ok(TimeKey(key))
    }

    /// Upper bound of an expiry sweep: sorts after every key whose time is
    /// at or before `cutoff`, and before every later one.
    pub fn barrier(cutoff: OffsetDateTime) -> Result<Self> {
        let mut key = time_prefix(cutoff)?;
        key.extend_from_slice(&[0xFF; HASH_LEN]);
        Ok(TimeKey(key))
    }

    /// Reinterpret raw bytes read back from the time or reverse-time index.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != TIME_PREFIX_LEN + HASH_LEN
            || !bytes[..TIME_PREFIX_LEN].iter().all(u8::is_ascii_digit)
        {
            return Err(Error::Decode(format!("malformed time index key ({} bytes)", bytes.len())));
        }
        Ok(TimeKey(bytes))
    }

    /// The expiry time, at second resolution.
    pub fn expires(&self) -> Result<OffsetDateTime> {
        let prefix = std::str::from_utf8(&self.0[..TIME_PREFIX_LEN])
            .map_err(|e| Error::Decode(e.to_string()))?;
        PrimitiveDateTime::parse(prefix, TIME_FORMAT)
            .map(PrimitiveDateTime::assume_utc)
            .map_err(|e| Error::Decode(e.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for TimeKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn time_prefix(at: OffsetDateTime) -> Result<Vec<u8>> {
    let at = at
        .checked_to_offset(UtcOffset::UTC)
        .ok_or_else(|| Error::InvalidExpiry("not representable in UTC".into()))?;
    // A sign or a fifth digit would break the fixed-width ordering.
    if !(0..=9999).contains(&at.year()) {
        return Err(Error::InvalidExpiry(format!("year {} out of range", at.year())));
    }
    let text = at
        .format(TIME_FORMAT)
        .map_err(|e| Error::InvalidExpiry(e.to_string()))?;
    debug_assert_eq!(text.len(), TIME_PREFIX_LEN);
    Ok(text.into_bytes())
}
