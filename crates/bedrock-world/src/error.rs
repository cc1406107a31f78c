use std::path::PathBuf;

use bedrock_codec::{CodecError, ErrorKind};
use bedrock_leveldb::DbError;
use bedrock_nbt::NbtError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("NBT: {0}")]
    Nbt(#[from] NbtError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no such file in world: {0}")]
    MissingFile(String),

    #[error("unknown chunk record tag {0:#04x}")]
    UnknownRecordTag(u8),

    #[error("chunk record key of {len} bytes cannot carry tag {tag:#04x}")]
    BadKeyLength { len: usize, tag: u8 },

    #[error("sub-chunk index {0} maps outside the 64 column slots")]
    SubChunkIndexOutOfRange(i8),

    #[error("{record} record has {len} bytes, expected {expected}")]
    RecordSize {
        record: &'static str,
        len: usize,
        expected: usize,
    },

    #[error("empty sub-chunk record")]
    EmptySubChunk,

    #[error("unsupported sub-chunk version {0}")]
    UnsupportedSubChunkVersion(u8),

    #[error("sub-chunk has {0} storage areas, expected 1 or 2")]
    BadStorageCount(u8),

    #[error("sub-chunk y index byte {0} outside 0..32 and 224..256")]
    BadYIndex(u8),

    #[error("storage header {0:#04x} marks a runtime-id palette")]
    RuntimePalette(u8),

    #[error("unsupported bits per block {0}")]
    BitsPerBlock(u8),

    #[error("palette declares {declared} entries, expected {expected}")]
    PaletteCount { declared: i32, expected: usize },

    #[error("packed index {index} exceeds palette of {len} entries")]
    PaletteIndexOutOfRange { index: usize, len: usize },

    #[error("palette entry has no `name` string")]
    MissingBlockName,

    #[error("cube of {size:?} blocks exceeds the limit of {limit}")]
    CubeTooLarge { size: [u64; 3], limit: u64 },

    #[error("level.dat header declares {declared} payload bytes, file has {available}")]
    LevelDatLength { declared: i32, available: usize },
}

impl WorldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorldError::Codec(e) => e.kind(),
            WorldError::Db(e) => e.kind(),
            WorldError::Nbt(e) => e.kind(),
            WorldError::Io { .. } | WorldError::MissingFile(_) => ErrorKind::Truncated,
            WorldError::UnknownRecordTag(_)
            | WorldError::UnsupportedSubChunkVersion(_)
            | WorldError::RuntimePalette(_)
            | WorldError::BitsPerBlock(_) => ErrorKind::Unsupported,
            WorldError::LevelDatLength { .. } => ErrorKind::Truncated,
            WorldError::CubeTooLarge { .. } => ErrorKind::Unsupported,
            WorldError::BadKeyLength { .. }
            | WorldError::SubChunkIndexOutOfRange(_)
            | WorldError::RecordSize { .. }
            | WorldError::EmptySubChunk
            | WorldError::BadStorageCount(_)
            | WorldError::BadYIndex(_)
            | WorldError::PaletteCount { .. }
            | WorldError::PaletteIndexOutOfRange { .. }
            | WorldError::MissingBlockName => ErrorKind::Structural,
        }
    }
}
