use std::fmt;
use std::io;

use crate::ri::Index;

/// Unified error type for the backing store and the reverse index.
#[derive(Debug)]
pub enum Error {
    /// IO error from disk operations.
    Io(io::Error),
    /// Data corruption detected in a store file (CRC mismatch, bad framing).
    Corruption(String),
    /// No record for the requested key. Expected; not an anomaly.
    NotFound,
    /// A stored association record does not match `<group> <number>`.
    Decode(String),
    /// The caller handed over an association that cannot be serialized.
    InvalidAssociation(String),
    /// The expiry time cannot be encoded into a time-index key.
    InvalidExpiry(String),
    /// A read against one of the three indexes failed.
    StoreRead { index: Index, source: Box<Error> },
    /// A write against one of the three indexes failed.
    StoreWrite { index: Index, source: Box<Error> },
    /// At least one of the three deletions of an expire failed.
    /// The article may be partially expired.
    PartialExpiry { failed: usize, first: Box<Error> },
    /// Configuration could not be loaded or extracted.
    Config(Box<figment::Error>),
    /// No loader registered under the configured backend name.
    UnknownBackend(String),
    /// A loader is already registered under this name.
    DuplicateBackend(String),
}

impl Error {
    pub(crate) fn store_read(index: Index, source: Error) -> Self {
        Error::StoreRead {
            index,
            source: Box::new(source),
        }
    }

    pub(crate) fn store_write(index: Index, source: Error) -> Self {
        Error::StoreWrite {
            index,
            source: Box::new(source),
        }
    }

    /// True for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Corruption(msg) => write!(f, "Corruption: {msg}"),
            Error::NotFound => write!(f, "Not found"),
            Error::Decode(msg) => write!(f, "Decode error: {msg}"),
            Error::InvalidAssociation(msg) => write!(f, "Invalid association: {msg}"),
            Error::InvalidExpiry(msg) => write!(f, "Invalid expiry time: {msg}"),
            Error::StoreRead { index, source } => write!(f, "Read from {index} failed: {source}"),
            Error::StoreWrite { index, source } => write!(f, "Write to {index} failed: {source}"),
            Error::PartialExpiry { failed, first } => {
                write!(f, "Expire partially failed ({failed} of 3 deletions): {first}")
            }
            Error::Config(e) => write!(f, "Configuration error: {e}"),
            Error::UnknownBackend(name) => write!(f, "Unknown reverse index backend: {name}"),
            Error::DuplicateBackend(name) => {
                write!(f, "Reverse index backend already registered: {name}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::StoreRead { source, .. } | Error::StoreWrite { source, .. } => Some(source.as_ref()),
            Error::PartialExpiry { first, .. } => Some(first.as_ref()),
            Error::Config(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Error::Config(Box::new(e))
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
