//! Fixed-width integer and float decoding at an explicit offset.
//!
//! All readers take the whole buffer plus a start offset and never mutate the
//! input. A read that would run past the end returns
//! [`CodecError::BufferTooShort`].

use crate::error::CodecError;

/// Borrow `len` bytes starting at `offset`.
pub fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], CodecError> {
    let end = offset.checked_add(len).filter(|&end| end <= data.len());
    match end {
        Some(end) => Ok(&data[offset..end]),
        None => Err(CodecError::BufferTooShort {
            offset,
            needed: len,
            available: data.len().saturating_sub(offset),
        }),
    }
}

pub fn read_u8(data: &[u8], offset: usize) -> Result<u8, CodecError> {
    Ok(slice(data, offset, 1)?[0])
}

pub fn read_i8(data: &[u8], offset: usize) -> Result<i8, CodecError> {
    Ok(read_u8(data, offset)? as i8)
}

macro_rules! fixed_readers {
    ($($name:ident => $ty:ty, $conv:ident;)*) => {
        $(
            #[inline]
            pub fn $name(data: &[u8], offset: usize) -> Result<$ty, CodecError> {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                let mut raw = [0u8; WIDTH];
                raw.copy_from_slice(slice(data, offset, WIDTH)?);
                Ok(<$ty>::$conv(raw))
            }
        )*
    };
}

fixed_readers! {
    read_u16_le => u16, from_le_bytes;
    read_u16_be => u16, from_be_bytes;
    read_i16_le => i16, from_le_bytes;
    read_i16_be => i16, from_be_bytes;
    read_u32_le => u32, from_le_bytes;
    read_u32_be => u32, from_be_bytes;
    read_i32_le => i32, from_le_bytes;
    read_i32_be => i32, from_be_bytes;
    read_u64_le => u64, from_le_bytes;
    read_u64_be => u64, from_be_bytes;
    read_i64_le => i64, from_le_bytes;
    read_i64_be => i64, from_be_bytes;
    read_f32_le => f32, from_le_bytes;
    read_f32_be => f32, from_be_bytes;
    read_f64_le => f64, from_le_bytes;
    read_f64_be => f64, from_be_bytes;
}
