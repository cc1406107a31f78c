//! Sorted table (`.ldb`) reader.
//!
//! Layout: data blocks, a meta-index block, an index block, then a 48-byte
//! footer holding two block handles, padding and the 8-byte magic. Each block
//! is followed by a 5-byte trailer (compression type, CRC) that its handle
//! does not count.

use bedrock_codec::compression::decompress_block;
use bedrock_codec::primitive::read_u64_le;
use bedrock_codec::ByteReader;
use bytes::Bytes;
use tracing::trace;

use crate::block::Block;
use crate::error::DbError;
use crate::record::{KeyFormat, ValueType};

pub const TABLE_MAGIC: u64 = 0xdb47_7524_8b80_fb57;
pub const FOOTER_LEN: usize = 48;
pub const BLOCK_TRAILER_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    pub offset: u64,
    pub size: u64,
}

impl BlockHandle {
    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DbError> {
        let offset = u64::from(reader.var_u32()?);
        let size = u64::from(reader.var_u32()?);
        Ok(Self { offset, size })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub metaindex: BlockHandle,
    pub index: BlockHandle,
}

impl Footer {
    pub fn decode(file: &[u8]) -> Result<Self, DbError> {
        let len = file.len();
        if len < FOOTER_LEN {
            return Err(DbError::FileTooShort { len });
        }
        let found = read_u64_le(file, len - 8)?;
        if found != TABLE_MAGIC {
            return Err(DbError::BadMagic { found });
        }
        let mut reader = ByteReader::new(&file[len - FOOTER_LEN..len - 8]);
        let metaindex = BlockHandle::decode(&mut reader)?;
        let index = BlockHandle::decode(&mut reader)?;
        Ok(Self { metaindex, index })
    }
}

/// One data record of a table with its internal key decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub key: Vec<u8>,
    pub sequence: u64,
    /// `None` for a deletion marker.
    pub value: Option<Bytes>,
}

/// Read and decompress the block a handle points at.
pub fn read_block(file: &Bytes, handle: BlockHandle) -> Result<Bytes, DbError> {
    let out_of_range = || DbError::HandleOutOfRange {
        offset: handle.offset,
        size: handle.size,
        file_len: file.len(),
    };
    let start = usize::try_from(handle.offset).map_err(|_| out_of_range())?;
    let end = usize::try_from(handle.size)
        .ok()
        .and_then(|size| start.checked_add(size))
        .filter(|&end| end <= file.len())
        .ok_or_else(out_of_range)?;

    // The trailer may be missing on hand-assembled files.
    let hint = (end + BLOCK_TRAILER_LEN <= file.len()).then(|| file[end]);
    let raw = decompress_block(&file[start..end], hint)?;
    Ok(Bytes::from(raw))
}

/// Decode every data record of a table, in table order.
pub fn read_table(file: &Bytes) -> Result<Vec<TableEntry>, DbError> {
    let footer = Footer::decode(file)?;
    let index = Block::new(read_block(file, footer.index)?)?.records(KeyFormat::Plain)?;
    trace!(blocks = index.len(), "table index");

    let mut entries = Vec::new();
    for record in index.iter() {
        let mut reader = ByteReader::new(record.value());
        let handle = BlockHandle::decode(&mut reader)?;
        let block = Block::new(read_block(file, handle)?)?;
        let records = block.records(KeyFormat::Internal)?;
        for (i, record) in records.iter().enumerate() {
            let key = records.key(i)?.to_vec();
            let (sequence, value_type) = records
                .sequence(i)?
                .unwrap_or((0, ValueType::Value));
            let value = match value_type {
                ValueType::Value => Some(record.value().clone()),
                ValueType::Deletion => None,
            };
            entries.push(TableEntry {
                key,
                sequence,
                value,
            });
        }
    }
    Ok(entries)
}
