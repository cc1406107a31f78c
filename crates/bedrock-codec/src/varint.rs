//! Unsigned LEB128 varints (7 data bits per byte, continuation in the top bit,
//! least-significant group first), capped at five bytes.

use bytes::{Buf, BufMut};

use crate::error::CodecError;

/// Longest encoding accepted; LevelDB and Bedrock never need more for a u32.
pub const MAX_VARINT_BYTES: usize = 5;

/// Decode a varint at `offset`. Returns the value and the number of bytes consumed.
pub fn read_var_u32(data: &[u8], offset: usize) -> Result<(u32, usize), CodecError> {
    let mut result: u32 = 0;
    let mut shift: u32 = 0;
    for i in 0..MAX_VARINT_BYTES {
        let Some(&byte) = data.get(offset + i) else {
            return Err(CodecError::BufferTooShort {
                offset: offset + i,
                needed: 1,
                available: 0,
            });
        };
        result |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
        shift += 7;
    }
    Err(CodecError::VarIntTooLong {
        max_bytes: MAX_VARINT_BYTES,
    })
}

/// Decode a varint from the front of a [`Buf`], advancing it.
pub fn get_var_u32(buf: &mut impl Buf) -> Result<u32, CodecError> {
    let mut result: u32 = 0;
    let mut shift: u32 = 0;
    for _ in 0..MAX_VARINT_BYTES {
        if !buf.has_remaining() {
            return Err(CodecError::BufferTooShort {
                offset: 0,
                needed: 1,
                available: 0,
            });
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
    Err(CodecError::VarIntTooLong {
        max_bytes: MAX_VARINT_BYTES,
    })
}

/// Append the varint encoding of `value`.
pub fn put_var_u32(buf: &mut impl BufMut, mut value: u32) {
    loop {
        if value & !0x7F == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value & 0x7F | 0x80) as u8);
        value >>= 7;
    }
}

/// Number of bytes [`put_var_u32`] writes for `value`.
pub fn encoded_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn encode(value: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        put_var_u32(&mut buf, value);
        buf
    }

    #[test]
    fn known_encodings() {
        assert_eq!(encode(0), [0x00]);
        assert_eq!(encode(1), [0x01]);
        assert_eq!(encode(127), [0x7F]);
        assert_eq!(encode(128), [0x80, 0x01]);
        assert_eq!(encode(300), [0xAC, 0x02]);
        assert_eq!(encode(u32::MAX), [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn boundaries_roundtrip() {
        for value in [0, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1F_FFFF, 0x20_0000, 0x0FFF_FFFF, 0x1000_0000, u32::MAX] {
            let bytes = encode(value);
            assert_eq!(bytes.len(), encoded_len(value));
            assert_eq!(read_var_u32(&bytes, 0).unwrap(), (value, bytes.len()));
        }
    }

    #[test]
    fn random_roundtrip() {
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let value: u32 = rng.gen();
            let bytes = encode(value);
            let (decoded, consumed) = read_var_u32(&bytes, 0).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, bytes.len());
            assert!((1..=5).contains(&consumed));
            assert_eq!(get_var_u32(&mut bytes.as_slice()).unwrap(), value);
        }
    }

    #[test]
    fn reads_at_offset() {
        let data = [0xFF, 0xAC, 0x02, 0x07];
        assert_eq!(read_var_u32(&data, 1).unwrap(), (300, 2));
        assert_eq!(read_var_u32(&data, 3).unwrap(), (7, 1));
    }

    #[test]
    fn too_long_is_fatal() {
        let data = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(
            read_var_u32(&data, 0),
            Err(CodecError::VarIntTooLong { max_bytes: 5 })
        ));
        assert!(get_var_u32(&mut &data[..]).is_err());
    }

    #[test]
    fn truncated() {
        assert!(matches!(
            read_var_u32(&[0x80, 0x80], 0),
            Err(CodecError::BufferTooShort { .. })
        ));
        assert!(read_var_u32(&[], 0).is_err());
    }
}
