use crate::error::{Error, Result};
use crate::types::ValueType;

impl ValueType {
    fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(ValueType::Put),
            0x02 => Ok(ValueType::Delete),
            _ => Err(Error::Corruption(format!("invalid record type: {byte}"))),
        }
    }
}

/// A single record in the WAL.
///
/// On-disk format:
/// ```text
/// ┌──────────┬────────┬──────────┬───────────┬───────────┬──────────┐
/// │ CRC (4B) │ Len(4B)│ Type(1B) │ Key Len(4B│ Key (var) │Val (var) │
/// └──────────┴────────┴──────────┴───────────┴───────────┴──────────┘
/// ```
///
/// CRC covers everything after the CRC field itself. A put carries the
/// complete value, so a reverse index commit is one record and lands
/// entirely or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WALRecord {
    pub record_type: ValueType,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

const CRC_SIZE: usize = 4;
const LEN_SIZE: usize = 4;
const TYPE_SIZE: usize = 1;
const KEY_LEN_SIZE: usize = 4;
const HEADER_SIZE: usize = CRC_SIZE + LEN_SIZE + TYPE_SIZE + KEY_LEN_SIZE;

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| Error::Corruption("record truncated".into()))
}

impl WALRecord {
    /// Create a Put record.
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        WALRecord {
            record_type: ValueType::Put,
            key,
            value,
        }
    }

    /// Create a Delete record.
    pub fn delete(key: Vec<u8>) -> Self {
        WALRecord {
            record_type: ValueType::Delete,
            key,
            value: Vec::new(),
        }
    }

    /// Serialize this record to bytes (including CRC header).
    pub fn encode(&self) -> Vec<u8> {
        let payload_len = TYPE_SIZE + KEY_LEN_SIZE + self.key.len() + self.value.len();
        let mut buf = Vec::with_capacity(CRC_SIZE + LEN_SIZE + payload_len);

        // CRC placeholder, filled once the payload is in place
        buf.extend_from_slice(&[0u8; CRC_SIZE]);
        buf.extend_from_slice(&(payload_len as u32).to_le_bytes());
        buf.push(self.record_type as u8);
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);

        let crc = crc32fast::hash(&buf[CRC_SIZE..]);
        buf[..CRC_SIZE].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Deserialize a record from the front of `data`.
    /// Returns error if the record is short or its CRC doesn't match.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Corruption("record too short".into()));
        }

        let stored_crc = read_u32(data, 0)?;
        let payload_len = read_u32(data, CRC_SIZE)? as usize;
        let total_len = CRC_SIZE + LEN_SIZE + payload_len;
        if data.len() < total_len || payload_len < TYPE_SIZE + KEY_LEN_SIZE {
            return Err(Error::Corruption("record truncated".into()));
        }

        if stored_crc != crc32fast::hash(&data[CRC_SIZE..total_len]) {
            return Err(Error::Corruption("CRC mismatch".into()));
        }

        let mut offset = CRC_SIZE + LEN_SIZE;
        let record_type = ValueType::from_u8(data[offset])?;
        offset += TYPE_SIZE;

        let key_len = read_u32(data, offset)? as usize;
        offset += KEY_LEN_SIZE;
        if offset + key_len > total_len {
            return Err(Error::Corruption("key length exceeds record".into()));
        }
        let key = data[offset..offset + key_len].to_vec();
        let value = data[offset + key_len..total_len].to_vec();

        Ok(WALRecord {
            record_type,
            key,
            value,
        })
    }

    /// Size of this record when serialized on disk.
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }
}
