//! Varint-length strings copied byte for byte. Each byte maps to the char
//! with the same code point, so any byte sequence decodes and re-encodes
//! unchanged.

use bytes::{Buf, BufMut};

use bedrock_codec::varint::{get_var_u32, put_var_u32};

use crate::error::NbtError;
use crate::io::{ensure_remaining, NbtVariant};

pub(crate) struct AsciiVariant;

impl NbtVariant for AsciiVariant {
    fn write_string(buf: &mut impl BufMut, s: &str) -> Result<(), NbtError> {
        let bytes = s
            .chars()
            .map(|c| u8::try_from(c).map_err(|_| NbtError::UnencodableChar(c)))
            .collect::<Result<Vec<u8>, _>>()?;
        let len = u32::try_from(bytes.len()).map_err(|_| NbtError::StringTooLong(bytes.len()))?;
        put_var_u32(buf, len);
        buf.put_slice(&bytes);
        Ok(())
    }

    fn read_string(buf: &mut impl Buf) -> Result<String, NbtError> {
        let len = get_var_u32(buf)? as usize;
        ensure_remaining(buf, len)?;
        let mut out = String::with_capacity(len);
        for _ in 0..len {
            out.push(char::from(buf.get_u8()));
        }
        Ok(out)
    }
}
