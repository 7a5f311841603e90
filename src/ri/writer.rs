use crate::error::{Error, Result};
use crate::method::RiWriter;
use crate::ri::codec::encode_line;
use crate::ri::timekey::TimeKey;
use crate::ri::{Index, RiDb};
use crate::store::KvStore;
use crate::types::{ArticleMeta, MessageId, RiElement};

/// Write session for one article.
///
/// The time and reverse-time entries are written as soon as the first
/// association arrives; the association list itself is buffered and lands
/// in the message index as a single put on commit.
pub struct RiDbWriter<'a, S: KvStore> {
    db: &'a RiDb<S>,
    msgid: MessageId,
    buf: Vec<u8>,
}

impl<'a, S: KvStore> RiDbWriter<'a, S> {
    pub(crate) fn new(db: &'a RiDb<S>, msgid: &[u8]) -> Self {
        RiDbWriter {
            db,
            msgid: msgid.to_vec(),
            buf: Vec::new(),
        }
    }

    /// Record the first association, indexing the expiry time if set.
    /// Without an expiry, any time entry left by an earlier session for
    /// the same article is removed.
    ///
    /// A failure between the two index writes leaves the time entry in
    /// place; it is reported, not rolled back.
    pub fn write_first(&mut self, md: &ArticleMeta, rie: &RiElement) -> Result<()> {
        let mut line = Vec::new();
        encode_line(&mut line, rie)?;

        match md.expires {
            Some(expires) => {
                let time_key = TimeKey::new(expires, &self.msgid)?;
                self.drop_stale_time_key(Some(&time_key))?;
                self.db
                    .tdb
                    .put(time_key.as_bytes(), &self.msgid)
                    .map_err(|e| Error::store_write(Index::Time, e))?;
                self.db
                    .rdb
                    .put(&self.msgid, time_key.as_bytes())
                    .map_err(|e| Error::store_write(Index::ReverseTime, e))?;
            }
            None => {
                if self.drop_stale_time_key(None)? {
                    self.db
                        .rdb
                        .delete(&self.msgid)
                        .map_err(|e| Error::store_write(Index::ReverseTime, e))?;
                }
            }
        }

        self.buf.extend_from_slice(&line);
        Ok(())
    }

    /// Record a further association. The time indexes are left alone.
    pub fn write_more(&mut self, _md: &ArticleMeta, rie: &RiElement) -> Result<()> {
        encode_line(&mut self.buf, rie)
    }

    /// Store the buffered association list. A session that recorded no
    /// association writes nothing.
    pub fn commit(self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.db
            .mdb
            .put(&self.msgid, &self.buf)
            .map_err(|e| Error::store_write(Index::Message, e))
    }

    /// The article was time-indexed before: remove that time entry unless
    /// it equals `time_key`, so the article keeps at most one. Returns
    /// whether a previous entry existed.
    fn drop_stale_time_key(&self, time_key: Option<&TimeKey>) -> Result<bool> {
        let previous = self
            .db
            .rdb
            .get(&self.msgid)
            .map_err(|e| Error::store_read(Index::ReverseTime, e))?;
        let Some(previous) = previous else {
            return Ok(false);
        };
        if time_key.is_none_or(|key| key.as_bytes() != previous) {
            self.db
                .tdb
                .delete(&previous)
                .map_err(|e| Error::store_write(Index::Time, e))?;
        }
        Ok(true)
    }
}

impl<S: KvStore> RiWriter for RiDbWriter<'_, S> {
    fn write_first(&mut self, md: &ArticleMeta, rie: &RiElement) -> Result<()> {
        RiDbWriter::write_first(self, md, rie)
    }

    fn write_more(&mut self, md: &ArticleMeta, rie: &RiElement) -> Result<()> {
        RiDbWriter::write_more(self, md, rie)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        RiDbWriter::commit(*self)
    }
}
