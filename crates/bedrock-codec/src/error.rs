//! Decoding errors and the collected-error record shared by every layer.

use std::fmt;

use thiserror::Error;

/// Coarse classification of a decode failure.
///
/// Every failure is fatal for the smallest enclosing unit (a file, a chunk
/// record, a sub-chunk) and never for a whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Magic mismatch, out-of-range offsets, unexpected type bytes, length mismatches.
    Structural,
    /// Fewer bytes available than a length field demands.
    Truncated,
    /// A recognized but unhandled format revision.
    Unsupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Structural => f.write_str("structural"),
            ErrorKind::Truncated => f.write_str("truncated"),
            ErrorKind::Unsupported => f.write_str("unsupported"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("buffer too short: need {needed} bytes at offset {offset}, have {available}")]
    BufferTooShort {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("VarInt is too long (more than {max_bytes} bytes)")]
    VarIntTooLong { max_bytes: usize },

    #[error("decompression error: {0}")]
    Decompress(String),

    #[error("compression error: {0}")]
    Compress(String),

    #[error("unknown compression type: {0}")]
    UnknownCompression(u8),
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::BufferTooShort { .. } => ErrorKind::Truncated,
            CodecError::UnknownCompression(_) => ErrorKind::Unsupported,
            CodecError::VarIntTooLong { .. }
            | CodecError::Decompress(_)
            | CodecError::Compress(_) => ErrorKind::Structural,
        }
    }
}

/// A recoverable failure collected while loading a store or a world.
///
/// `context` names the unit that failed: a file name, a chunk position, a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub context: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl LoadError {
    pub fn new(context: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} error): {}", self.context, self.kind, self.message)
    }
}
