//! Whole-column records: pre-sub-chunk terrain and the 2-D/3-D data maps.

use bytes::Bytes;

use crate::block::BlockInfo;
use crate::error::WorldError;
use crate::legacy::LegacyBlockTable;

pub const LEGACY_TERRAIN_HEIGHT: usize = 128;

const COLUMN_BLOCKS: usize = 16 * 16 * LEGACY_TERRAIN_HEIGHT;
const IDS_LEN: usize = COLUMN_BLOCKS;
const NIBBLES_LEN: usize = COLUMN_BLOCKS / 2;
const HEIGHTS_LEN: usize = 256;
const BIOMES_LEN: usize = 1024;

/// ids, data, sky light, block light, heights, biome colors.
pub const LEGACY_TERRAIN_LEN: usize = IDS_LEN + 3 * NIBBLES_LEN + HEIGHTS_LEN + BIOMES_LEN;

const DATA_OFFSET: usize = IDS_LEN;
const HEIGHTS_OFFSET: usize = IDS_LEN + 3 * NIBBLES_LEN;

/// Height map size in bytes shared by the 2-D and 3-D data records.
pub const HEIGHT_MAP_LEN: usize = 512;
pub const DATA_2D_LEN: usize = HEIGHT_MAP_LEN + 256;

#[inline]
fn column_index(x: usize, z: usize) -> usize {
    x * 16 + z
}

/// The 0x30 record: a full 16x128x16 column of numeric ids.
#[derive(Debug, Clone)]
pub struct LegacyTerrain {
    data: Bytes,
}

impl LegacyTerrain {
    pub fn parse(data: Bytes) -> Result<Self, WorldError> {
        if data.len() != LEGACY_TERRAIN_LEN {
            return Err(WorldError::RecordSize {
                record: "legacy terrain",
                len: data.len(),
                expected: LEGACY_TERRAIN_LEN,
            });
        }
        Ok(Self { data })
    }

    /// `y` must be below [`LEGACY_TERRAIN_HEIGHT`].
    pub fn block(&self, x: usize, y: usize, z: usize, table: &LegacyBlockTable) -> BlockInfo {
        let i = (x << 11) | (z << 7) | y;
        let nibbles = self.data[DATA_OFFSET + (i >> 1)];
        let aux = if i & 1 == 0 { nibbles & 0x0F } else { nibbles >> 4 };
        BlockInfo {
            name: table.name(self.data[i]).clone(),
            aux: u16::from(aux),
        }
    }

    /// Stored height of the column.
    pub fn height(&self, x: usize, z: usize) -> u8 {
        self.data[HEIGHTS_OFFSET + z * 16 + x]
    }
}

/// Which record a [`HeightMap`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMapKind {
    Data2D,
    Data2DLegacy,
    Data3D,
}

/// Stored per-column heights plus the raw biome payload that follows them.
#[derive(Debug, Clone)]
pub struct HeightMap {
    pub kind: DataMapKind,
    heights: [i16; 256],
    biomes: Bytes,
}

impl HeightMap {
    pub fn parse(kind: DataMapKind, data: Bytes) -> Result<Self, WorldError> {
        let (name, expected) = match kind {
            DataMapKind::Data2D => ("2-D data", DATA_2D_LEN),
            DataMapKind::Data2DLegacy => ("legacy 2-D data", HEIGHT_MAP_LEN),
            DataMapKind::Data3D => ("3-D data", HEIGHT_MAP_LEN),
        };
        let size_ok = match kind {
            DataMapKind::Data2D => data.len() == expected,
            _ => data.len() >= expected,
        };
        if !size_ok {
            return Err(WorldError::RecordSize {
                record: name,
                len: data.len(),
                expected,
            });
        }
        let mut heights = [0i16; 256];
        for (h, raw) in heights.iter_mut().zip(data[..HEIGHT_MAP_LEN].chunks_exact(2)) {
            *h = i16::from_le_bytes([raw[0], raw[1]]);
        }
        Ok(Self {
            kind,
            heights,
            biomes: data.slice(HEIGHT_MAP_LEN..),
        })
    }

    pub fn height(&self, x: usize, z: usize) -> i16 {
        self.heights[column_index(x, z)]
    }

    /// One byte per column for 2-D data; paletted biome storage for 3-D data.
    pub fn biomes(&self) -> &Bytes {
        &self.biomes
    }

    pub fn biome_id(&self, x: usize, z: usize) -> Option<u8> {
        match self.kind {
            DataMapKind::Data2D => self.biomes.get(column_index(x, z)).copied(),
            _ => None,
        }
    }
}
