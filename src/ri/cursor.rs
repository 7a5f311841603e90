use crate::error::{Error, Result};
use crate::iterator::StorageIterator;
use crate::method::Cursor;
use crate::ri::Index;
use crate::ri::codec::LineScanner;
use crate::ri::timekey::TimeKey;
use crate::store::KvStore;
use crate::types::{MessageId, RiElement, RiHistory};

/// Cursor over every association of one article.
///
/// Holds the stored list as read when the cursor was opened. Lines that
/// only scan partially are skipped; the first empty scan ends the cursor.
#[derive(Debug)]
pub struct LookupCursor {
    scanner: Option<LineScanner>,
}

impl LookupCursor {
    pub(crate) fn new(record: Vec<u8>) -> Self {
        LookupCursor {
            scanner: Some(LineScanner::new(record)),
        }
    }

    pub fn release(self) {}
}

impl Iterator for LookupCursor {
    type Item = RiElement;

    fn next(&mut self) -> Option<RiElement> {
        let next = self.scanner.as_mut()?.next_element();
        if next.is_none() {
            self.scanner = None;
        }
        next
    }
}

impl Cursor for LookupCursor {}

/// The article the sweep is currently emitting.
struct Article {
    msgid: MessageId,
    /// `None` once its associations are exhausted, or if it had no record.
    scanner: Option<LineScanner>,
    /// A failed read of its record, reported before the marker.
    error: Option<Error>,
}

/// Expiry sweep over the time index.
///
/// For each time-index entry up to the barrier, in key order: every
/// association of the article, then `RiHistory::Expired(msgid)`.
pub struct ExpiredCursor<'a, S: KvStore> {
    mdb: &'a S,
    iter: S::Iter,
    barrier: TimeKey,
    started: bool,
    current: Option<Article>,
    done: bool,
}

impl<'a, S: KvStore> ExpiredCursor<'a, S> {
    pub(crate) fn new(mdb: &'a S, iter: S::Iter, barrier: TimeKey) -> Self {
        ExpiredCursor {
            mdb,
            iter,
            barrier,
            started: false,
            current: None,
            done: false,
        }
    }

    /// Release the underlying range iterator.
    pub fn release(self) {}

    /// Move to the next time-index entry and load its article.
    /// `Ok(false)` once the barrier is passed or the index is exhausted.
    fn advance(&mut self) -> Result<bool> {
        if self.started {
            self.iter.next().map_err(|e| Error::store_read(Index::Time, e))?;
        } else {
            self.started = true;
        }
        if !self.iter.is_valid() || self.iter.key() > self.barrier.as_bytes() {
            return Ok(false);
        }

        let msgid = self.iter.value().to_vec();
        let (scanner, error) = match self.mdb.get(&msgid) {
            Ok(record) => (record.map(LineScanner::new), None),
            Err(e) => (None, Some(Error::store_read(Index::Message, e))),
        };
        self.current = Some(Article {
            msgid,
            scanner,
            error,
        });
        Ok(true)
    }
}

impl<S: KvStore> Iterator for ExpiredCursor<'_, S> {
    type Item = Result<RiHistory>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if let Some(mut article) = self.current.take() {
                if let Some(error) = article.error.take() {
                    self.current = Some(article);
                    return Some(Err(error));
                }
                let rie = article.scanner.as_mut().and_then(LineScanner::next_element);
                if let Some(rie) = rie {
                    self.current = Some(article);
                    return Some(Ok(RiHistory::Association(rie)));
                }
                return Some(Ok(RiHistory::Expired(article.msgid)));
            }

            match self.advance() {
                Ok(true) => continue,
                Ok(false) => self.done = true,
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            }
        }
    }
}

impl<S: KvStore> Cursor for ExpiredCursor<'_, S> {}
