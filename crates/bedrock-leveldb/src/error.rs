use bedrock_codec::{CodecError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("file of {len} bytes is too short for a table footer")]
    FileTooShort { len: usize },

    #[error("bad table magic {found:#018x}")]
    BadMagic { found: u64 },

    #[error("block handle {offset}+{size} out of range for a {file_len}-byte file")]
    HandleOutOfRange {
        offset: u64,
        size: u64,
        file_len: usize,
    },

    #[error("restart count {count} does not fit a {len}-byte block")]
    BadRestartCount { count: u32, len: usize },

    #[error("record at offset {offset} runs past the block content end {end}")]
    RecordOverrun { offset: usize, end: usize },

    #[error("shared prefix of {shared} bytes exceeds the previous key ({previous} bytes)")]
    SharedPrefixTooLong { shared: usize, previous: usize },

    #[error("record {index} shares a prefix but has no previous record")]
    MissingPrevious { index: usize },

    #[error("no record at index {0}")]
    NoSuchRecord(usize),

    #[error("internal key of {len} bytes has no 8-byte sequence suffix")]
    InternalKeyTooShort { len: usize },

    #[error("unknown log record type {0}")]
    UnknownRecordType(u8),

    #[error("log fragment {got} arrived {state}")]
    FragmentOrder {
        got: &'static str,
        state: &'static str,
    },

    #[error("log ends inside a fragmented record")]
    UnterminatedRecord,

    #[error("log record at offset {offset} needs {needed} bytes, {available} left in block")]
    LogRecordOverrun {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("write batch of {0} bytes is shorter than its 12-byte header")]
    ShortBatch(usize),

    #[error("unknown write batch entry type {0}")]
    UnknownEntryType(u8),
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Codec(e) => e.kind(),
            DbError::FileTooShort { .. }
            | DbError::UnterminatedRecord
            | DbError::LogRecordOverrun { .. }
            | DbError::ShortBatch(_) => ErrorKind::Truncated,
            DbError::UnknownRecordType(_) | DbError::UnknownEntryType(_) => {
                ErrorKind::Unsupported
            }
            DbError::BadMagic { .. }
            | DbError::HandleOutOfRange { .. }
            | DbError::BadRestartCount { .. }
            | DbError::RecordOverrun { .. }
            | DbError::SharedPrefixTooLong { .. }
            | DbError::MissingPrevious { .. }
            | DbError::NoSuchRecord(_)
            | DbError::InternalKeyTooShort { .. }
            | DbError::FragmentOrder { .. } => ErrorKind::Structural,
        }
    }
}
