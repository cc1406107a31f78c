//! Table block compression as written by Bedrock's LevelDB fork.

use flate2::{Decompress, FlushDecompress, Status};

use crate::error::CodecError;

/// Compression ids stored in a table block trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockCompression {
    None = 0,
    Snappy = 1,
    Zlib = 2,
    ZlibRaw = 4,
}

impl BlockCompression {
    pub fn from_byte(v: u8) -> Result<Self, CodecError> {
        match v {
            0 => Ok(Self::None),
            1 => Ok(Self::Snappy),
            2 => Ok(Self::Zlib),
            4 => Ok(Self::ZlibRaw),
            other => Err(CodecError::UnknownCompression(other)),
        }
    }
}

/// Compress data using the specified algorithm.
pub fn compress(
    data: &[u8],
    algorithm: BlockCompression,
    level: u32,
) -> Result<Vec<u8>, CodecError> {
    use flate2::Compression;
    use std::io::Write;

    match algorithm {
        BlockCompression::ZlibRaw => {
            let mut encoder =
                flate2::write::DeflateEncoder::new(Vec::new(), Compression::new(level));
            encoder
                .write_all(data)
                .map_err(|e| CodecError::Compress(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CodecError::Compress(e.to_string()))
        }
        BlockCompression::Zlib => {
            let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), Compression::new(level));
            encoder
                .write_all(data)
                .map_err(|e| CodecError::Compress(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CodecError::Compress(e.to_string()))
        }
        BlockCompression::Snappy => snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| CodecError::Compress(e.to_string())),
        BlockCompression::None => Ok(data.to_vec()),
    }
}

/// Decompress data using a known algorithm.
pub fn decompress_with(data: &[u8], algorithm: BlockCompression) -> Result<Vec<u8>, CodecError> {
    match algorithm {
        BlockCompression::ZlibRaw => inflate(data, false),
        BlockCompression::Zlib => inflate(data, true),
        BlockCompression::Snappy => snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| CodecError::Decompress(e.to_string())),
        BlockCompression::None => Ok(data.to_vec()),
    }
}

/// Decompress a table block.
///
/// A Snappy trailer hint is honored directly. Anything else goes through the
/// fallback chain: raw deflate, then zlib-wrapped deflate, then the bytes as
/// stored, since some producers write uncompressed blocks.
pub fn decompress_block(data: &[u8], hint: Option<u8>) -> Result<Vec<u8>, CodecError> {
    if hint == Some(BlockCompression::Snappy as u8) {
        return decompress_with(data, BlockCompression::Snappy);
    }
    if let Ok(out) = inflate(data, false) {
        return Ok(out);
    }
    if let Ok(out) = inflate(data, true) {
        return Ok(out);
    }
    Ok(data.to_vec())
}

/// Inflate a complete deflate stream. A stream that ends before its final
/// block is an error rather than a short result.
fn inflate(data: &[u8], zlib_header: bool) -> Result<Vec<u8>, CodecError> {
    let mut inflater = Decompress::new(zlib_header);
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).max(64));
    loop {
        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();
        if out.len() == out.capacity() {
            out.reserve(out.capacity());
        }
        let status = inflater
            .decompress_vec(&data[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| CodecError::Decompress(e.to_string()))?;
        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                let stalled =
                    inflater.total_in() as usize == consumed && inflater.total_out() == produced;
                if stalled && out.len() < out.capacity() {
                    return Err(CodecError::Decompress("truncated deflate stream".into()));
                }
            }
        }
    }
}
