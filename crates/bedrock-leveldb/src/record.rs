//! Prefix-compressed records as stored in table blocks.
//!
//! Each record stores only the bytes its key does not share with the record
//! before it. Records of one block live in a [`RecordArena`] and point back at
//! their predecessor by index; the full key is rebuilt on first access and
//! memoized on the record.

use std::cell::OnceCell;

use bedrock_codec::ByteReader;
use bytes::Bytes;

use crate::error::DbError;

/// Length of LevelDB's `(sequence << 8) | value_type` internal key suffix.
pub const INTERNAL_SUFFIX_LEN: usize = 8;

/// How the stored key of a record relates to the user key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    /// Stored key is the key (index blocks, hand-built blocks).
    Plain,
    /// Stored key ends in an 8-byte sequence/type suffix (data blocks).
    Internal,
}

/// Value type carried in an internal key suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Deletion,
    Value,
}

impl ValueType {
    fn from_byte(b: u8) -> Self {
        if b == 0 {
            ValueType::Deletion
        } else {
            ValueType::Value
        }
    }
}

#[derive(Debug)]
pub struct KeyValueRecord {
    shared: usize,
    unshared: Bytes,
    value: Bytes,
    encoded_len: usize,
    previous: Option<usize>,
    key: OnceCell<Vec<u8>>,
}

impl KeyValueRecord {
    /// Decode one record starting at `offset` in `block`.
    ///
    /// The returned record has no predecessor yet; [`RecordArena::push`] links it.
    pub fn decode(block: &Bytes, offset: usize) -> Result<Self, DbError> {
        let mut reader = ByteReader::at(block, offset);
        let shared = reader.var_u32()? as usize;
        let unshared_len = reader.var_u32()? as usize;
        let value_len = reader.var_u32()? as usize;

        let key_start = reader.position();
        reader.skip(unshared_len)?;
        let value_start = reader.position();
        reader.skip(value_len)?;
        let end = reader.position();

        Ok(Self {
            shared,
            unshared: block.slice(key_start..value_start),
            value: block.slice(value_start..end),
            encoded_len: end - offset,
            previous: None,
            key: OnceCell::new(),
        })
    }

    pub fn shared_prefix_len(&self) -> usize {
        self.shared
    }

    pub fn unshared_key(&self) -> &[u8] {
        &self.unshared
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Bytes this record occupies on disk, including its varint headers.
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    pub fn is_restart_point(&self) -> bool {
        self.shared == 0
    }

    fn resolved(&self) -> Option<&[u8]> {
        self.key.get().map(Vec::as_slice)
    }
}

/// Ordered records of one block, linked to their predecessors by index.
#[derive(Debug)]
pub struct RecordArena {
    format: KeyFormat,
    records: Vec<KeyValueRecord>,
}

impl RecordArena {
    pub fn new(format: KeyFormat) -> Self {
        Self {
            format,
            records: Vec::new(),
        }
    }

    pub fn format(&self) -> KeyFormat {
        self.format
    }

    /// Append a record, linking it to the current last record.
    pub fn push(&mut self, mut record: KeyValueRecord) -> usize {
        record.previous = self.records.len().checked_sub(1);
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, index: usize) -> Option<&KeyValueRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValueRecord> {
        self.records.iter()
    }

    /// Full stored key of record `index`, rebuilt through the predecessor chain.
    ///
    /// Walks back only as far as the nearest restart point or already resolved
    /// record, so resolving every record in order costs one copy per record.
    pub fn stored_key(&self, index: usize) -> Result<&[u8], DbError> {
        let record = self.records.get(index).ok_or(DbError::NoSuchRecord(index))?;
        if let Some(key) = record.resolved() {
            return Ok(key);
        }

        let mut chain = vec![index];
        let mut cursor = record;
        while !cursor.is_restart_point() {
            let prev_index = cursor
                .previous
                .ok_or(DbError::MissingPrevious { index })?;
            let prev = &self.records[prev_index];
            if prev.resolved().is_some() {
                break;
            }
            chain.push(prev_index);
            cursor = prev;
        }

        for &i in chain.iter().rev() {
            let rec = &self.records[i];
            let full = if rec.is_restart_point() {
                rec.unshared.to_vec()
            } else {
                let prev = rec
                    .previous
                    .and_then(|p| self.records[p].resolved())
                    .ok_or(DbError::MissingPrevious { index: i })?;
                if rec.shared > prev.len() {
                    return Err(DbError::SharedPrefixTooLong {
                        shared: rec.shared,
                        previous: prev.len(),
                    });
                }
                let mut full = Vec::with_capacity(rec.shared + rec.unshared.len());
                full.extend_from_slice(&prev[..rec.shared]);
                full.extend_from_slice(&rec.unshared);
                full
            };
            let _ = rec.key.set(full);
        }

        record
            .resolved()
            .ok_or(DbError::MissingPrevious { index })
    }

    /// The user key of record `index`: the stored key minus any internal suffix.
    pub fn key(&self, index: usize) -> Result<&[u8], DbError> {
        let stored = self.stored_key(index)?;
        match self.format {
            KeyFormat::Plain => Ok(stored),
            KeyFormat::Internal => {
                let (user, _) = split_internal(stored)?;
                Ok(user)
            }
        }
    }

    /// Sequence number and value type of an internal-format record.
    pub fn sequence(&self, index: usize) -> Result<Option<(u64, ValueType)>, DbError> {
        match self.format {
            KeyFormat::Plain => Ok(None),
            KeyFormat::Internal => {
                let (_, tag) = split_internal(self.stored_key(index)?)?;
                Ok(Some((tag >> 8, ValueType::from_byte(tag as u8))))
            }
        }
    }
}

fn split_internal(stored: &[u8]) -> Result<(&[u8], u64), DbError> {
    let Some(split) = stored.len().checked_sub(INTERNAL_SUFFIX_LEN) else {
        return Err(DbError::InternalKeyTooShort { len: stored.len() });
    };
    let (user, suffix) = stored.split_at(split);
    let mut raw = [0u8; INTERNAL_SUFFIX_LEN];
    raw.copy_from_slice(suffix);
    Ok((user, u64::from_le_bytes(raw)))
}
