//! `level.dat`: world settings as one little-endian NBT root behind an
//! 8-byte header.

use bedrock_codec::ByteReader;
use bedrock_nbt::{read_nbt_le, write_nbt_le, NbtCompound, NbtRoot};

use crate::error::WorldError;

pub const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct LevelDat {
    pub storage_version: i32,
    pub root: NbtRoot,
}

impl LevelDat {
    pub fn parse(data: &[u8]) -> Result<Self, WorldError> {
        let mut reader = ByteReader::new(data);
        let storage_version = reader.i32_le()?;
        let declared = reader.i32_le()?;
        let available = reader.remaining();
        if declared < 0 || declared as usize > available {
            return Err(WorldError::LevelDatLength {
                declared,
                available,
            });
        }
        let mut payload = reader.bytes(declared as usize)?;
        let root = read_nbt_le(&mut payload)?;
        Ok(Self {
            storage_version,
            root,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, WorldError> {
        let mut payload = Vec::new();
        write_nbt_le(&mut payload, &self.root)?;
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(&self.storage_version.to_le_bytes());
        out.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    pub fn compound(&self) -> &NbtCompound {
        &self.root.compound
    }

    pub fn level_name(&self) -> Option<&str> {
        self.compound().get_str("LevelName")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedrock_nbt::NbtTag;

    fn sample() -> LevelDat {
        let mut c = NbtCompound::new();
        c.insert("LevelName".into(), NbtTag::String("My World".into()));
        c.insert("StorageVersion".into(), NbtTag::Int(10));
        LevelDat {
            storage_version: 10,
            root: NbtRoot::new("", c),
        }
    }

    #[test]
    fn parse_written_file() {
        let bytes = sample().encode().unwrap();
        assert_eq!(&bytes[..4], &10i32.to_le_bytes());
        let level = LevelDat::parse(&bytes).unwrap();
        assert_eq!(level.storage_version, 10);
        assert_eq!(level.level_name(), Some("My World"));
        assert_eq!(level.compound().get_int("StorageVersion"), Some(10));
    }

    #[test]
    fn declared_length_past_end() {
        let mut bytes = sample().encode().unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            LevelDat::parse(&bytes),
            Err(WorldError::LevelDatLength { .. })
        ));
        assert!(matches!(LevelDat::parse(&[1, 0, 0]), Err(WorldError::Codec(_))));
    }
}
