//! Table block layout: records, then a restart array, then its u32 count.

use bedrock_codec::primitive::read_u32_le;
use bytes::Bytes;

use crate::error::DbError;
use crate::record::{KeyFormat, KeyValueRecord, RecordArena};

/// A decompressed table block.
#[derive(Debug, Clone)]
pub struct Block {
    data: Bytes,
    content_end: usize,
    restart_count: u32,
}

impl Block {
    pub fn new(data: Bytes) -> Result<Self, DbError> {
        let len = data.len();
        let trailer = len
            .checked_sub(4)
            .ok_or(DbError::BadRestartCount { count: 0, len })?;
        let restart_count = read_u32_le(&data, trailer)?;
        let content_end = (restart_count as usize)
            .checked_mul(4)
            .and_then(|restarts| len.checked_sub(4 + restarts))
            .ok_or(DbError::BadRestartCount {
                count: restart_count,
                len,
            })?;
        Ok(Self {
            data,
            content_end,
            restart_count,
        })
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    /// Length of the record area.
    pub fn content_len(&self) -> usize {
        self.content_end
    }

    /// Decode every record of the block in order.
    pub fn records(&self, format: KeyFormat) -> Result<RecordArena, DbError> {
        let mut arena = RecordArena::new(format);
        let mut offset = 0;
        while offset < self.content_end {
            let record = KeyValueRecord::decode(&self.data, offset)?;
            let next = offset + record.encoded_len();
            if next > self.content_end {
                return Err(DbError::RecordOverrun {
                    offset,
                    end: self.content_end,
                });
            }
            arena.push(record);
            offset = next;
        }
        Ok(arena)
    }
}
