//! Write-ahead log (`.log`) reader.
//!
//! The file is a sequence of 32 KiB blocks. Each physical record has a 7-byte
//! header (checksum, u16 length, type) and never crosses a block boundary; a
//! logical record too large for the rest of a block is split into
//! FIRST/MIDDLE/LAST fragments. Every logical record is one write batch.

use bedrock_codec::varint::put_var_u32;
use bedrock_codec::ByteReader;
use bytes::Bytes;

use crate::error::DbError;

pub const BLOCK_SIZE: usize = 32 * 1024;
pub const HEADER_LEN: usize = 7;
pub const BATCH_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordType {
    Zero,
    Full,
    First,
    Middle,
    Last,
}

impl RecordType {
    fn from_byte(b: u8) -> Result<Self, DbError> {
        match b {
            0 => Ok(Self::Zero),
            1 => Ok(Self::Full),
            2 => Ok(Self::First),
            3 => Ok(Self::Middle),
            4 => Ok(Self::Last),
            other => Err(DbError::UnknownRecordType(other)),
        }
    }

    fn byte(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::Full => 1,
            Self::First => 2,
            Self::Middle => 3,
            Self::Last => 4,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Zero => "ZERO",
            Self::Full => "FULL",
            Self::First => "FIRST",
            Self::Middle => "MIDDLE",
            Self::Last => "LAST",
        }
    }
}

/// Reassemble the logical records of a log file.
///
/// Checksums are not verified.
pub fn read_log_records(data: &[u8]) -> Result<Vec<Vec<u8>>, DbError> {
    let mut records = Vec::new();
    let mut pending: Option<Vec<u8>> = None;
    let mut pos = 0;

    while pos < data.len() {
        let block_left = BLOCK_SIZE - pos % BLOCK_SIZE;
        if block_left < HEADER_LEN {
            pos += block_left;
            continue;
        }
        let file_left = data.len() - pos;
        if file_left < HEADER_LEN {
            // A short zeroed tail is preallocation, anything else is a cut header.
            if data[pos..].iter().all(|&b| b == 0) {
                break;
            }
            return Err(DbError::LogRecordOverrun {
                offset: pos,
                needed: HEADER_LEN,
                available: file_left,
            });
        }

        let mut header = ByteReader::at(data, pos + 4);
        let length = header.u16_le()? as usize;
        let record_type = RecordType::from_byte(header.u8()?)?;

        if record_type == RecordType::Zero && length == 0 {
            pos += block_left;
            continue;
        }

        let available = block_left.min(file_left) - HEADER_LEN;
        if length > available {
            return Err(DbError::LogRecordOverrun {
                offset: pos,
                needed: length,
                available,
            });
        }
        let payload = &data[pos + HEADER_LEN..pos + HEADER_LEN + length];
        pos += HEADER_LEN + length;

        match (record_type, pending.take()) {
            (RecordType::Full, None) => records.push(payload.to_vec()),
            (RecordType::First, None) => pending = Some(payload.to_vec()),
            (RecordType::Middle, Some(mut buf)) => {
                buf.extend_from_slice(payload);
                pending = Some(buf);
            }
            (RecordType::Last, Some(mut buf)) => {
                buf.extend_from_slice(payload);
                records.push(buf);
            }
            (RecordType::Full | RecordType::First, Some(_)) => {
                return Err(DbError::FragmentOrder {
                    got: record_type.name(),
                    state: "inside a fragmented record",
                })
            }
            (RecordType::Middle | RecordType::Last, None) => {
                return Err(DbError::FragmentOrder {
                    got: record_type.name(),
                    state: "without a FIRST fragment",
                })
            }
            (RecordType::Zero, _) => {
                return Err(DbError::FragmentOrder {
                    got: record_type.name(),
                    state: "with a non-empty payload",
                })
            }
        }
    }

    if pending.is_some() {
        return Err(DbError::UnterminatedRecord);
    }
    Ok(records)
}

/// One put or delete from a write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub key: Bytes,
    /// `None` for a delete.
    pub value: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    pub sequence: u64,
    pub count: u32,
    pub entries: Vec<BatchEntry>,
}

/// Decode a write batch: 8-byte sequence, 4-byte count, then tagged entries.
pub fn parse_batch(record: &[u8]) -> Result<WriteBatch, DbError> {
    if record.len() < BATCH_HEADER_LEN {
        return Err(DbError::ShortBatch(record.len()));
    }
    let mut reader = ByteReader::new(record);
    let sequence = reader.u64_le()?;
    let count = reader.u32_le()?;

    let mut entries = Vec::new();
    while !reader.is_empty() {
        let entry = match reader.u8()? {
            1 => {
                let key = Bytes::copy_from_slice(reader.length_prefixed()?);
                let value = Bytes::copy_from_slice(reader.length_prefixed()?);
                BatchEntry {
                    key,
                    value: Some(value),
                }
            }
            0 => BatchEntry {
                key: Bytes::copy_from_slice(reader.length_prefixed()?),
                value: None,
            },
            other => return Err(DbError::UnknownEntryType(other)),
        };
        entries.push(entry);
    }
    Ok(WriteBatch {
        sequence,
        count,
        entries,
    })
}

/// Encode a write batch, the inverse of [`parse_batch`]. Entries are
/// `(key, Some(value))` puts or `(key, None)` deletes.
pub fn encode_batch(sequence: u64, entries: &[(&[u8], Option<&[u8]>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&sequence.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for (key, value) in entries {
        out.push(u8::from(value.is_some()));
        put_var_u32(&mut out, key.len() as u32);
        out.extend_from_slice(key);
        if let Some(value) = value {
            put_var_u32(&mut out, value.len() as u32);
            out.extend_from_slice(value);
        }
    }
    out
}

/// Frame logical records into 32 KiB blocks, fragmenting as needed. The
/// checksum field is left zero.
pub fn frame_records(records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        let mut rest: &[u8] = record;
        let mut first = true;
        loop {
            let block_left = BLOCK_SIZE - out.len() % BLOCK_SIZE;
            if block_left < HEADER_LEN {
                out.resize(out.len() + block_left, 0);
                continue;
            }
            let take = (block_left - HEADER_LEN).min(rest.len());
            let last = take == rest.len();
            let record_type = match (first, last) {
                (true, true) => RecordType::Full,
                (true, false) => RecordType::First,
                (false, false) => RecordType::Middle,
                (false, true) => RecordType::Last,
            };
            out.extend_from_slice(&[0; 4]);
            out.extend_from_slice(&(take as u16).to_le_bytes());
            out.push(record_type.byte());
            out.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            first = false;
            if last {
                break;
            }
        }
    }
    out
}
