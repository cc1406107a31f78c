//! 16x16x16 sub-chunk decoding.
//!
//! Disk layouts, selected by the first byte:
//! ```text
//! 0, 2..=7  [version][4096 block ids][2048 data nibbles]...
//! 1         [1][storage]
//! 8         [8][count][storage]*count
//! 9         [9][count][y_index][storage]*count
//! storage   [bpb << 1][packed u32 words][palette_count:i32_le][NBT_LE_compound]*
//! ```
//! Blocks are indexed XZY: `x*256 + z*16 + y`. Words hold `32 / bpb` indices
//! each, least significant first, with unused high bits.

use bedrock_codec::ByteReader;

use crate::block::BlockInfo;
use crate::error::WorldError;
use crate::legacy::LegacyBlockTable;
use crate::palette::{decode_palette, encode_palette, PaletteEntry};

pub const SUB_CHUNK_SIZE: usize = 16;
pub const SUB_CHUNK_VOLUME: usize = 4096;
pub const MAX_BITS_PER_BLOCK: u8 = 16;

const LEGACY_IDS_LEN: usize = SUB_CHUNK_VOLUME;
const LEGACY_DATA_LEN: usize = SUB_CHUNK_VOLUME / 2;

#[inline]
pub fn block_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < 16 && y < 16 && z < 16);
    (x << 8) | (z << 4) | y
}

/// Layout family selected by the version byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubChunkFormat {
    /// Flat id and nibble arrays (versions 0 and 2 to 7).
    Legacy,
    /// One storage area, no count byte (version 1).
    SingleStorage,
    /// Count byte then storage areas (version 8).
    MultiStorage,
    /// Count byte, y index byte, then storage areas (version 9).
    IndexedStorage,
}

impl SubChunkFormat {
    pub fn from_version(version: u8) -> Result<Self, WorldError> {
        match version {
            1 => Ok(Self::SingleStorage),
            8 => Ok(Self::MultiStorage),
            9 => Ok(Self::IndexedStorage),
            0..=7 => Ok(Self::Legacy),
            other => Err(WorldError::UnsupportedSubChunkVersion(other)),
        }
    }
}

/// Smallest bit width able to index `palette_len` entries (`ceil(log2)`).
pub fn bits_for_palette(palette_len: usize) -> u8 {
    if palette_len <= 1 {
        0
    } else {
        (usize::BITS - (palette_len - 1).leading_zeros()) as u8
    }
}

pub fn words_for_bits(bits_per_block: u8) -> usize {
    let per_word = 32 / bits_per_block as usize;
    SUB_CHUNK_VOLUME.div_ceil(per_word)
}

/// Read the palette index of block `index` from packed words.
///
/// The shift and mask are done in 64 bits so a 16-bit index in the high
/// half of a word never overflows.
#[inline]
pub fn unpack_index(words: &[u32], bits_per_block: u8, index: usize) -> usize {
    let per_word = 32 / bits_per_block as usize;
    let word = u64::from(words[index / per_word]);
    let shift = (index % per_word) as u32 * u32::from(bits_per_block);
    let mask = (1u64 << bits_per_block) - 1;
    ((word >> shift) & mask) as usize
}

/// Pack 4096 palette indices at the given width.
pub fn pack_indices(indices: &[u16], bits_per_block: u8) -> Vec<u32> {
    let per_word = 32 / bits_per_block as usize;
    let mut words = vec![0u32; words_for_bits(bits_per_block)];
    for (i, &value) in indices.iter().take(SUB_CHUNK_VOLUME).enumerate() {
        let shift = (i % per_word) as u32 * u32::from(bits_per_block);
        words[i / per_word] |= u32::from(value) << shift;
    }
    words
}

/// One storage area: a palette plus packed indices into it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStorage {
    bits_per_block: u8,
    words: Vec<u32>,
    palette: Vec<PaletteEntry>,
}

impl BlockStorage {
    /// A storage area filled with a single block.
    pub fn uniform(entry: PaletteEntry) -> Self {
        Self {
            bits_per_block: 0,
            words: Vec::new(),
            palette: vec![entry],
        }
    }

    /// Build from 4096 XZY-ordered indices, at the smallest width that fits.
    pub fn from_indices(indices: &[u16], palette: Vec<PaletteEntry>) -> Result<Self, WorldError> {
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= palette.len()) {
            return Err(WorldError::PaletteIndexOutOfRange {
                index: bad as usize,
                len: palette.len(),
            });
        }
        let bits_per_block = bits_for_palette(palette.len());
        let words = if bits_per_block == 0 {
            Vec::new()
        } else {
            pack_indices(indices, bits_per_block)
        };
        Ok(Self {
            bits_per_block,
            words,
            palette,
        })
    }

    pub fn bits_per_block(&self) -> u8 {
        self.bits_per_block
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn palette(&self) -> &[PaletteEntry] {
        &self.palette
    }

    pub fn palette_index(&self, x: usize, y: usize, z: usize) -> usize {
        if self.bits_per_block == 0 {
            0
        } else {
            unpack_index(&self.words, self.bits_per_block, block_index(x, y, z))
        }
    }

    pub fn entry(&self, x: usize, y: usize, z: usize) -> Option<&PaletteEntry> {
        self.palette.get(self.palette_index(x, y, z))
    }

    /// Parse one storage area at the reader's position.
    fn parse(reader: &mut ByteReader<'_>) -> Result<Self, WorldError> {
        let header = reader.u8()?;
        if header & 1 != 0 {
            return Err(WorldError::RuntimePalette(header));
        }
        let bits_per_block = header >> 1;
        if bits_per_block > MAX_BITS_PER_BLOCK {
            return Err(WorldError::BitsPerBlock(bits_per_block));
        }

        let mut words = Vec::new();
        if bits_per_block > 0 {
            let count = words_for_bits(bits_per_block);
            words.reserve_exact(count);
            for _ in 0..count {
                words.push(reader.u32_le()?);
            }
        }

        let declared = reader.i32_le()?;
        let expected_single = bits_per_block == 0;
        if declared <= 0 || (expected_single && declared != 1) {
            return Err(WorldError::PaletteCount {
                declared,
                expected: 1,
            });
        }
        let (palette, next) = decode_palette(reader.data(), reader.position(), declared as usize)?;
        *reader = ByteReader::at(reader.data(), next);

        let storage = Self {
            bits_per_block,
            words,
            palette,
        };
        storage.validate()?;
        Ok(storage)
    }

    fn validate(&self) -> Result<(), WorldError> {
        if self.bits_per_block == 0 {
            return Ok(());
        }
        let len = self.palette.len();
        for i in 0..SUB_CHUNK_VOLUME {
            let index = unpack_index(&self.words, self.bits_per_block, i);
            if index >= len {
                return Err(WorldError::PaletteIndexOutOfRange { index, len });
            }
        }
        Ok(())
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), WorldError> {
        buf.push(self.bits_per_block << 1);
        for word in &self.words {
            buf.extend_from_slice(&word.to_le_bytes());
        }
        buf.extend_from_slice(&(self.palette.len() as i32).to_le_bytes());
        encode_palette(buf, &self.palette)
    }
}

/// Pre-palette sub-chunk: numeric ids with 4-bit data values.
#[derive(Debug, Clone)]
pub struct LegacySubChunk {
    version: u8,
    ids: Vec<u8>,
    data: Vec<u8>,
    table: LegacyBlockTable,
}

impl LegacySubChunk {
    fn parse(version: u8, bytes: &[u8], table: &LegacyBlockTable) -> Result<Self, WorldError> {
        let mut reader = ByteReader::at(bytes, 1);
        let ids = reader.bytes(LEGACY_IDS_LEN)?.to_vec();
        let data = reader.bytes(LEGACY_DATA_LEN)?.to_vec();
        Ok(Self {
            version,
            ids,
            data,
            table: table.clone(),
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn block(&self, x: usize, y: usize, z: usize) -> BlockInfo {
        let i = block_index(x, y, z);
        let nibbles = self.data[i >> 1];
        let aux = if i & 1 == 0 { nibbles & 0x0F } else { nibbles >> 4 };
        BlockInfo {
            name: self.table.name(self.ids[i]).clone(),
            aux: u16::from(aux),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PalettedSubChunk {
    pub version: u8,
    /// Only version 9 records its own index.
    pub y_index: Option<i8>,
    pub storages: Vec<BlockStorage>,
}

#[derive(Debug, Clone)]
pub enum SubChunk {
    Legacy(LegacySubChunk),
    Paletted(PalettedSubChunk),
}

impl SubChunk {
    pub fn parse(data: &[u8], legacy: &LegacyBlockTable) -> Result<Self, WorldError> {
        let mut reader = ByteReader::new(data);
        let version = reader.u8().map_err(|_| WorldError::EmptySubChunk)?;
        let format = SubChunkFormat::from_version(version)?;

        let (count, y_index) = match format {
            SubChunkFormat::Legacy => {
                return LegacySubChunk::parse(version, data, legacy).map(SubChunk::Legacy)
            }
            SubChunkFormat::SingleStorage => (1, None),
            SubChunkFormat::MultiStorage => (reader.u8()?, None),
            SubChunkFormat::IndexedStorage => {
                let count = reader.u8()?;
                let raw = reader.u8()?;
                if !(raw < 32 || raw >= 224) {
                    return Err(WorldError::BadYIndex(raw));
                }
                (count, Some(raw as i8))
            }
        };
        if !(1..=2).contains(&count) {
            return Err(WorldError::BadStorageCount(count));
        }

        let mut storages = Vec::with_capacity(count as usize);
        for _ in 0..count {
            storages.push(BlockStorage::parse(&mut reader)?);
        }
        Ok(SubChunk::Paletted(PalettedSubChunk {
            version,
            y_index,
            storages,
        }))
    }

    pub fn version(&self) -> u8 {
        match self {
            SubChunk::Legacy(l) => l.version,
            SubChunk::Paletted(p) => p.version,
        }
    }

    pub fn format(&self) -> SubChunkFormat {
        match self {
            SubChunk::Legacy(_) => SubChunkFormat::Legacy,
            SubChunk::Paletted(p) => match p.version {
                1 => SubChunkFormat::SingleStorage,
                8 => SubChunkFormat::MultiStorage,
                _ => SubChunkFormat::IndexedStorage,
            },
        }
    }

    pub fn storage_count(&self) -> usize {
        match self {
            SubChunk::Legacy(_) => 1,
            SubChunk::Paletted(p) => p.storages.len(),
        }
    }

    /// Block in storage area 0.
    pub fn block(&self, x: usize, y: usize, z: usize) -> BlockInfo {
        self.block_layer(x, y, z, 0).unwrap_or_else(BlockInfo::air)
    }

    /// Block in the given storage area; layer 1 holds waterlogging liquid.
    pub fn block_layer(&self, x: usize, y: usize, z: usize, layer: usize) -> Option<BlockInfo> {
        match self {
            SubChunk::Legacy(l) => (layer == 0).then(|| l.block(x, y, z)),
            SubChunk::Paletted(p) => p
                .storages
                .get(layer)
                .and_then(|s| s.entry(x, y, z))
                .map(PaletteEntry::block),
        }
    }

    /// Serialize a paletted sub-chunk. Legacy sub-chunks have no encoder.
    pub fn encode(&self) -> Result<Vec<u8>, WorldError> {
        let SubChunk::Paletted(p) = self else {
            return Err(WorldError::UnsupportedSubChunkVersion(self.version()));
        };
        let mut buf = vec![p.version];
        match p.version {
            1 => {}
            9 => {
                buf.push(p.storages.len() as u8);
                buf.push(p.y_index.unwrap_or(0) as u8);
            }
            _ => buf.push(p.storages.len() as u8),
        }
        for storage in &p.storages {
            storage.encode(&mut buf)?;
        }
        Ok(buf)
    }
}
