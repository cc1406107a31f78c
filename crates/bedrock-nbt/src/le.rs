//! Length-prefixed UTF-8 strings: u16 little-endian byte length, then UTF-8.
//! Used by `level.dat`, block palettes and every other disk record.

use bytes::{Buf, BufMut};

use crate::error::NbtError;
use crate::io::{ensure_remaining, NbtVariant};

pub(crate) struct LeVariant;

impl NbtVariant for LeVariant {
    fn write_string(buf: &mut impl BufMut, s: &str) -> Result<(), NbtError> {
        let len = u16::try_from(s.len()).map_err(|_| NbtError::StringTooLong(s.len()))?;
        buf.put_u16_le(len);
        buf.put_slice(s.as_bytes());
        Ok(())
    }

    fn read_string(buf: &mut impl Buf) -> Result<String, NbtError> {
        ensure_remaining(buf, 2)?;
        let len = buf.get_u16_le() as usize;
        ensure_remaining(buf, len)?;
        let data = buf.copy_to_bytes(len);
        String::from_utf8(data.to_vec()).map_err(|_| NbtError::InvalidUtf8)
    }
}
