//! Log entry types and serialization.

use crate::error::{CoreError, CoreResult};
use crate::types::TransactionId;

/// Magic bytes opening every entry.
pub const LOG_BEGIN_MAGIC: [u8; 4] = *b"RVMB";

/// Magic bytes closing every entry.
pub const LOG_END_MAGIC: [u8; 4] = *b"RVME";

/// Current log format version.
pub const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + txid (8) + count (4) + body length (8)
pub const HEADER_SIZE: usize = 27;

/// crc32 (4) + end magic (4)
pub const TRAILER_SIZE: usize = 8;

/// Type of log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogEntryType {
    /// The complete redo record set of one committed transaction.
    Transaction = 1,
    /// A segment was destroyed; earlier records for it are void.
    Destroy = 2,
}

impl LogEntryType {
    /// Converts a byte to an entry type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Transaction),
            2 => Some(Self::Destroy),
            _ => None,
        }
    }

    /// Converts the entry type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Post-image of one declared range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedoRecord {
    /// Segment name.
    pub segment: String,
    /// Byte offset within the segment.
    pub offset: u64,
    /// Bytes to write at `offset`.
    pub data: Vec<u8>,
}

impl RedoRecord {
    /// Returns the offset one past the last byte written.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }
}

/// A log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// Redo records of one committed transaction, honored all or nothing.
    Transaction {
        /// Transaction ID.
        txid: TransactionId,
        /// Records in commit order.
        records: Vec<RedoRecord>,
    },
    /// Destruction of a segment.
    Destroy {
        /// Segment name.
        segment: String,
    },
}

/// Fixed-size header fields of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    /// Entry type.
    pub entry_type: LogEntryType,
    /// Transaction ID, zero for destroy entries.
    pub txid: u64,
    /// Number of redo records in the body.
    pub record_count: u32,
    /// Body length in bytes.
    pub body_len: u64,
}

impl EntryHeader {
    /// Parses a header, checking magic, version and type.
    pub fn parse(bytes: &[u8], offset: u64) -> CoreResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CoreError::log_corruption(format!(
                "short header at offset {offset}"
            )));
        }
        if bytes[0..4] != LOG_BEGIN_MAGIC {
            return Err(CoreError::log_corruption(format!(
                "invalid magic at offset {offset}"
            )));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version == 0 || version > LOG_VERSION {
            return Err(CoreError::log_corruption(format!(
                "unsupported version {version} at offset {offset}"
            )));
        }
        let entry_type = LogEntryType::from_byte(bytes[6]).ok_or_else(|| {
            CoreError::log_corruption(format!(
                "unknown entry type {} at offset {offset}",
                bytes[6]
            ))
        })?;
        let mut reader = Reader::new(&bytes[7..HEADER_SIZE]);
        Ok(Self {
            entry_type,
            txid: reader.u64()?,
            record_count: reader.u32()?,
            body_len: reader.u64()?,
        })
    }

    /// Returns the size of the whole entry on disk.
    #[must_use]
    pub fn frame_len(&self) -> u64 {
        (HEADER_SIZE as u64)
            .saturating_add(self.body_len)
            .saturating_add(TRAILER_SIZE as u64)
    }
}

impl LogEntry {
    /// Returns the entry type.
    #[must_use]
    pub fn entry_type(&self) -> LogEntryType {
        match self {
            Self::Transaction { .. } => LogEntryType::Transaction,
            Self::Destroy { .. } => LogEntryType::Destroy,
        }
    }

    /// Returns the transaction ID if this entry belongs to one.
    #[must_use]
    pub fn txid(&self) -> Option<TransactionId> {
        match self {
            Self::Transaction { txid, .. } => Some(*txid),
            Self::Destroy { .. } => None,
        }
    }

    /// Serializes the entry with its header and trailer.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment name or record does not fit the
    /// on-disk field widths.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut body = Vec::new();
        let (txid, count) = match self {
            Self::Transaction { txid, records } => {
                for record in records {
                    put_name(&mut body, &record.segment)?;
                    body.extend_from_slice(&record.offset.to_le_bytes());
                    let len = u32::try_from(record.data.len()).map_err(|_| {
                        CoreError::invalid_argument("redo record larger than 4 GiB")
                    })?;
                    body.extend_from_slice(&len.to_le_bytes());
                    body.extend_from_slice(&record.data);
                }
                let count = u32::try_from(records.len())
                    .map_err(|_| CoreError::invalid_argument("too many redo records"))?;
                (txid.as_u64(), count)
            }
            Self::Destroy { segment } => {
                put_name(&mut body, segment)?;
                (0, 0)
            }
        };

        let mut data = Vec::with_capacity(HEADER_SIZE + body.len() + TRAILER_SIZE);
        data.extend_from_slice(&LOG_BEGIN_MAGIC);
        data.extend_from_slice(&LOG_VERSION.to_le_bytes());
        data.push(self.entry_type().as_byte());
        data.extend_from_slice(&txid.to_le_bytes());
        data.extend_from_slice(&count.to_le_bytes());
        data.extend_from_slice(&(body.len() as u64).to_le_bytes());
        data.extend_from_slice(&body);

        // CRC32 (over header and body)
        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        data.extend_from_slice(&LOG_END_MAGIC);

        Ok(data)
    }

    /// Deserializes an entry body.
    pub fn decode_body(header: &EntryHeader, body: &[u8]) -> CoreResult<Self> {
        let mut reader = Reader::new(body);
        let entry = match header.entry_type {
            LogEntryType::Transaction => {
                let mut records = Vec::with_capacity(header.record_count.min(1024) as usize);
                for _ in 0..header.record_count {
                    let segment = reader.name()?;
                    let offset = reader.u64()?;
                    let len = reader.u32()? as usize;
                    let data = reader.bytes(len)?.to_vec();
                    if offset.checked_add(len as u64).is_none() {
                        return Err(CoreError::log_corruption("redo record range overflows"));
                    }
                    records.push(RedoRecord {
                        segment,
                        offset,
                        data,
                    });
                }
                Self::Transaction {
                    txid: TransactionId::new(header.txid),
                    records,
                }
            }
            LogEntryType::Destroy => {
                if header.record_count != 0 {
                    return Err(CoreError::log_corruption(
                        "destroy entry with redo records",
                    ));
                }
                Self::Destroy {
                    segment: reader.name()?,
                }
            }
        };

        if !reader.is_empty() {
            return Err(CoreError::log_corruption(format!(
                "{} trailing bytes in {:?} entry",
                reader.remaining(),
                header.entry_type
            )));
        }
        Ok(entry)
    }
}

fn put_name(buf: &mut Vec<u8>, name: &str) -> CoreResult<()> {
    let len = u16::try_from(name.len())
        .map_err(|_| CoreError::invalid_argument("segment name longer than 65535 bytes"))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(name.as_bytes());
    Ok(())
}

/// Bounds-checked little-endian cursor.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, len: usize) -> CoreResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| CoreError::log_corruption("unexpected end of entry"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> CoreResult<[u8; N]> {
        self.bytes(N)?
            .try_into()
            .map_err(|_| CoreError::log_corruption("unexpected end of entry"))
    }

    fn u16(&mut self) -> CoreResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> CoreResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> CoreResult<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn name(&mut self) -> CoreResult<String> {
        let len = self.u16()? as usize;
        let raw = self.bytes(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| CoreError::log_corruption("segment name is not UTF-8"))
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

/// Computes CRC32 checksum for data.
pub fn compute_crc32(data: &[u8]) -> u32 {
    // IEEE polynomial, reflected
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
