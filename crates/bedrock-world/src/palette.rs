//! Block palettes: consecutive little-endian NBT compounds, one per distinct
//! block of a storage area.

use std::sync::Arc;

use bedrock_nbt::{read_nbt_le, write_nbt_le, NbtCompound, NbtRoot, NbtTag};

use crate::block::BlockInfo;
use crate::error::WorldError;

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    pub name: Arc<str>,
    /// Legacy data value from a pre-1.13 `val` short, else 0.
    pub aux: u16,
    /// Kept as decoded; individual states are not modeled.
    pub states: Option<NbtCompound>,
    pub version: Option<i32>,
}

impl PaletteEntry {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            aux: 0,
            states: None,
            version: None,
        }
    }

    pub fn from_compound(compound: &NbtCompound) -> Result<Self, WorldError> {
        let name = compound
            .get_str("name")
            .ok_or(WorldError::MissingBlockName)?;
        Ok(Self {
            name: Arc::from(name),
            aux: compound.get_short("val").map_or(0, |v| v as u16),
            states: compound.get_compound("states").cloned(),
            version: compound.get_int("version"),
        })
    }

    pub fn to_compound(&self) -> NbtCompound {
        let mut c = NbtCompound::new();
        c.insert("name".into(), NbtTag::String(self.name.to_string()));
        if let Some(states) = &self.states {
            c.insert("states".into(), NbtTag::Compound(states.clone()));
        }
        if self.aux != 0 {
            c.insert("val".into(), NbtTag::Short(self.aux as i16));
        }
        if let Some(version) = self.version {
            c.insert("version".into(), NbtTag::Int(version));
        }
        c
    }

    pub fn block(&self) -> BlockInfo {
        BlockInfo {
            name: self.name.clone(),
            aux: self.aux,
        }
    }
}

/// Decode `count` palette entries starting at `offset`.
///
/// Returns the entries in index order and the offset just past the last one,
/// where a following storage area (if any) begins.
pub fn decode_palette(
    data: &[u8],
    offset: usize,
    count: usize,
) -> Result<(Vec<PaletteEntry>, usize), WorldError> {
    let mut cursor = data.get(offset..).ok_or(bedrock_codec::CodecError::BufferTooShort {
        offset,
        needed: 1,
        available: 0,
    })?;
    // Every entry is at least a 4-byte empty compound.
    let mut palette = Vec::with_capacity(count.min(cursor.len() / 4));
    for _ in 0..count {
        let root = read_nbt_le(&mut cursor)?;
        palette.push(PaletteEntry::from_compound(&root.compound)?);
    }
    Ok((palette, data.len() - cursor.len()))
}

/// Encode entries in the on-disk palette layout.
pub fn encode_palette(buf: &mut Vec<u8>, palette: &[PaletteEntry]) -> Result<(), WorldError> {
    for entry in palette {
        write_nbt_le(buf, &NbtRoot::new("", entry.to_compound()))?;
    }
    Ok(())
}
