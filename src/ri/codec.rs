//! Text encoding of an article's association list.
//!
//! One line per association, `"<group> <number>\n"`, in write order:
//!
//! ```text
//! alt.test 1
//! alt.test2 7
//! ```
//!
//! Reading is lenient. A line is scanned into at most two whitespace
//! separated fields; a line that yields only the group (number missing or
//! not an integer) is skipped, a line with no fields at all ends the list.

use crate::error::{Error, Result};
use crate::types::RiElement;

/// Append one association line to `buf`.
///
/// The group must be non-empty and free of whitespace, or the line would
/// not scan back into the same association.
pub fn encode_line(buf: &mut Vec<u8>, rie: &RiElement) -> Result<()> {
    if rie.group.is_empty() {
        return Err(Error::InvalidAssociation("empty group name".into()));
    }
    if rie.group.iter().any(u8::is_ascii_whitespace) {
        return Err(Error::InvalidAssociation(format!(
            "group name contains whitespace: {:?}",
            String::from_utf8_lossy(&rie.group)
        )));
    }
    buf.extend_from_slice(&rie.group);
    buf.push(b' ');
    buf.extend_from_slice(rie.num.to_string().as_bytes());
    buf.push(b'\n');
    Ok(())
}

/// Outcome of scanning one line, by the number of fields recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// Zero fields: end of buffer, or a blank line.
    Empty,
    /// One field: the group scanned, the number did not.
    Partial,
    /// Both fields.
    Complete(RiElement),
}

/// Line-at-a-time scanner over a stored association list.
#[derive(Debug, Clone)]
pub struct LineScanner {
    buf: Vec<u8>,
    pos: usize,
}

impl LineScanner {
    pub fn new(buf: Vec<u8>) -> Self {
        LineScanner { buf, pos: 0 }
    }

    /// Consume the next line (up to and including `\n`) and scan it.
    /// Fields past the second are ignored.
    pub fn scan_line(&mut self) -> Scan {
        let rest = &self.buf[self.pos..];
        let (line, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;

        let mut fields = line
            .split(u8::is_ascii_whitespace)
            .filter(|field| !field.is_empty());
        let Some(group) = fields.next() else {
            return Scan::Empty;
        };
        let num = fields
            .next()
            .and_then(|field| std::str::from_utf8(field).ok())
            .and_then(|field| field.parse::<i64>().ok());
        match num {
            Some(num) => Scan::Complete(RiElement::new(group, num)),
            None => Scan::Partial,
        }
    }

    /// Next well-formed association, skipping lines that only scan partially.
    /// `None` once a line scans empty.
    pub fn next_element(&mut self) -> Option<RiElement> {
        loop {
            match self.scan_line() {
                Scan::Empty => return None,
                Scan::Partial => continue,
                Scan::Complete(rie) => return Some(rie),
            }
        }
    }
}

/// Decode only the first line of a stored list, strictly: exactly a group
/// and a number.
pub fn decode_first(buf: &[u8]) -> Result<RiElement> {
    // Only the first line is scanned, so copy no more than that.
    let end = buf.iter().position(|&b| b == b'\n').map_or(buf.len(), |i| i + 1);
    let line = &buf[..end];
    let fields = line
        .split(u8::is_ascii_whitespace)
        .filter(|field| !field.is_empty())
        .count();
    match LineScanner::new(line.to_vec()).scan_line() {
        Scan::Complete(rie) if fields == 2 => Ok(rie),
        _ => Err(Error::Decode(format!(
            "expected `<group> <number>`, found {:?}",
            String::from_utf8_lossy(line).trim_end()
        ))),
    }
}
