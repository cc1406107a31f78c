//! Bounds-checked forward cursor over a byte slice.

use crate::error::CodecError;
use crate::primitive;
use crate::varint;

/// Sequential reader used by the table, log and sub-chunk parsers.
///
/// Every read either succeeds and advances, or fails and leaves the position
/// unchanged.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The full underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn skip(&mut self, len: usize) -> Result<(), CodecError> {
        self.bytes(len).map(|_| ())
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let out = primitive::slice(self.data, self.pos, len)?;
        self.pos += len;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        let v = primitive::read_u8(self.data, self.pos)?;
        self.pos += 1;
        Ok(v)
    }

    pub fn u16_le(&mut self) -> Result<u16, CodecError> {
        let v = primitive::read_u16_le(self.data, self.pos)?;
        self.pos += 2;
        Ok(v)
    }

    pub fn u32_le(&mut self) -> Result<u32, CodecError> {
        let v = primitive::read_u32_le(self.data, self.pos)?;
        self.pos += 4;
        Ok(v)
    }

    pub fn i32_le(&mut self) -> Result<i32, CodecError> {
        let v = primitive::read_i32_le(self.data, self.pos)?;
        self.pos += 4;
        Ok(v)
    }

    pub fn u64_le(&mut self) -> Result<u64, CodecError> {
        let v = primitive::read_u64_le(self.data, self.pos)?;
        self.pos += 8;
        Ok(v)
    }

    pub fn var_u32(&mut self) -> Result<u32, CodecError> {
        let (v, len) = varint::read_var_u32(self.data, self.pos)?;
        self.pos += len;
        Ok(v)
    }

    /// A varint length followed by that many bytes.
    pub fn length_prefixed(&mut self) -> Result<&'a [u8], CodecError> {
        let start = self.pos;
        let len = self.var_u32()? as usize;
        match self.bytes(len) {
            Ok(out) => Ok(out),
            Err(e) => {
                self.pos = start;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_reads() {
        let mut data = vec![7u8];
        data.extend_from_slice(&0xBEEFu16.to_le_bytes());
        data.extend_from_slice(&(-3i32).to_le_bytes());
        data.extend_from_slice(&[0x03, b'a', b'b', b'c']);
        data.extend_from_slice(&42u64.to_le_bytes());

        let mut r = ByteReader::new(&data);
        assert_eq!(r.u8().unwrap(), 7);
        assert_eq!(r.u16_le().unwrap(), 0xBEEF);
        assert_eq!(r.i32_le().unwrap(), -3);
        assert_eq!(r.length_prefixed().unwrap(), b"abc");
        assert_eq!(r.u64_le().unwrap(), 42);
        assert!(r.is_empty());
    }

    #[test]
    fn failed_read_keeps_position() {
        let data = [0x05, b'a', b'b'];
        let mut r = ByteReader::new(&data);
        assert!(r.length_prefixed().is_err());
        assert_eq!(r.position(), 0);
        assert!(r.u32_le().is_err());
        assert_eq!(r.position(), 0);
        assert_eq!(r.remaining(), 3);
    }
}
