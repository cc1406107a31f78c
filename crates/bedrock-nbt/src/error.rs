//! NBT error types.

use bedrock_codec::{CodecError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NbtError {
    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("expected TAG_Compound (10) at root, got {got}")]
    ExpectedCompound { got: u8 },

    #[error("unknown tag type: {0}")]
    UnknownTagType(u8),

    #[error("TAG_End where a value was expected")]
    UnexpectedEnd,

    #[error("invalid UTF-8 in NBT string")]
    InvalidUtf8,

    #[error("nesting too deep (limit: {limit})")]
    NestingTooDeep { limit: usize },

    #[error("negative array length: {0}")]
    NegativeLength(i32),

    #[error("duplicate name in compound: {0:?}")]
    DuplicateName(String),

    #[error("list element type {got} does not match list type {expected}")]
    ListTypeMismatch { expected: u8, got: u8 },

    #[error("string of {0} bytes does not fit its length prefix")]
    StringTooLong(usize),

    #[error("character {0:?} has no single-byte encoding")]
    UnencodableChar(char),

    #[error("{0} elements exceed the i32 length prefix")]
    LengthOverflow(usize),

    #[error("VarInt error: {0}")]
    VarInt(#[from] CodecError),
}

impl NbtError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NbtError::UnexpectedEof => ErrorKind::Truncated,
            NbtError::VarInt(e) => e.kind(),
            _ => ErrorKind::Structural,
        }
    }
}
