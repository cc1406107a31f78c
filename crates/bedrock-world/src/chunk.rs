//! Chunk columns assembled from the per-record keys of one (dimension, x, z).

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use bedrock_codec::LoadError;
use bedrock_nbt::{read_nbt_stream, NbtRoot, StringEncoding};
use bytes::Bytes;
use tracing::{trace, warn};

use crate::block::BlockInfo;
use crate::error::WorldError;
use crate::keys::{ChunkKey, RecordTag};
use crate::legacy::LegacyBlockTable;
use crate::sub_chunk::SubChunk;
use crate::terrain::{DataMapKind, HeightMap, LegacyTerrain, LEGACY_TERRAIN_HEIGHT};

/// Sub-chunk slots per column; slot 32 starts at y = 0.
pub const SLOT_COUNT: usize = 64;
const SLOT_OFFSET: i32 = 32;

/// Map a raw sub-chunk key index to its column slot.
pub fn slot_for_index(raw: i8) -> Result<usize, WorldError> {
    let index = i32::from(raw);
    let slot = if index < SLOT_OFFSET {
        index + SLOT_OFFSET
    } else {
        index - SLOT_OFFSET
    };
    if (0..SLOT_COUNT as i32).contains(&slot) {
        Ok(slot as usize)
    } else {
        Err(WorldError::SubChunkIndexOutOfRange(raw))
    }
}

/// World y of the bottom of a slot.
pub fn slot_base_y(slot: usize) -> i32 {
    (slot as i32 - SLOT_OFFSET) * 16
}

/// Slot holding world `y`, if any.
pub fn slot_for_y(y: i32) -> Option<usize> {
    let slot = y.div_euclid(16) + SLOT_OFFSET;
    (0..SLOT_COUNT as i32).contains(&slot).then_some(slot as usize)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnPos {
    pub dimension: i32,
    pub x: i32,
    pub z: i32,
}

impl fmt::Display for ColumnPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk ({}, {}) dim {}", self.x, self.z, self.dimension)
    }
}

#[derive(Debug, Clone, Default)]
enum SubChunkSlot {
    #[default]
    Empty,
    /// Raw bytes not yet decoded.
    Pending(Bytes),
    Parsed(Box<SubChunk>),
    /// Decoding failed once; the error has been collected.
    Failed,
}

/// One 16-wide column of the world and every record stored for it.
#[derive(Debug, Clone)]
pub struct ChunkColumn {
    pos: ColumnPos,
    version: Option<u8>,
    slots: Vec<SubChunkSlot>,
    legacy_terrain: Option<LegacyTerrain>,
    height_map: Option<HeightMap>,
    records: BTreeMap<RecordTag, Bytes>,
    top_cache: Vec<Option<Option<i32>>>,
    parses: usize,
    scans: usize,
}

impl ChunkColumn {
    pub fn new(pos: ColumnPos) -> Self {
        Self {
            pos,
            version: None,
            slots: vec![SubChunkSlot::Empty; SLOT_COUNT],
            legacy_terrain: None,
            height_map: None,
            records: BTreeMap::new(),
            top_cache: vec![None; 256],
            parses: 0,
            scans: 0,
        }
    }

    pub fn pos(&self) -> ColumnPos {
        self.pos
    }

    /// Format version from the 0x2C (or old 0x76) record.
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    pub fn legacy_terrain(&self) -> Option<&LegacyTerrain> {
        self.legacy_terrain.as_ref()
    }

    pub fn height_map(&self) -> Option<&HeightMap> {
        self.height_map.as_ref()
    }

    /// Raw bytes of a record that has no dedicated decoder.
    pub fn record(&self, tag: RecordTag) -> Option<&Bytes> {
        self.records.get(&tag)
    }

    pub fn record_tags(&self) -> impl Iterator<Item = RecordTag> + '_ {
        self.records.keys().copied()
    }

    /// Block entity compounds (chests, signs, ...).
    pub fn block_entities(&self) -> Result<Vec<NbtRoot>, WorldError> {
        self.nbt_record(RecordTag::BlockEntity)
    }

    /// Entity compounds stored with the chunk (pre-1.18.30 saves).
    pub fn entities(&self) -> Result<Vec<NbtRoot>, WorldError> {
        self.nbt_record(RecordTag::Entity)
    }

    fn nbt_record(&self, tag: RecordTag) -> Result<Vec<NbtRoot>, WorldError> {
        match self.records.get(&tag) {
            Some(raw) => Ok(read_nbt_stream(&mut &raw[..], StringEncoding::Utf8)?),
            None => Ok(Vec::new()),
        }
    }

    /// Attach one record. Sub-chunks are kept raw until first queried.
    pub fn insert(&mut self, key: &ChunkKey, value: Bytes) -> Result<(), WorldError> {
        match key.tag {
            RecordTag::Version | RecordTag::LegacyVersion => {
                self.version = value.first().copied();
            }
            RecordTag::Data2D => {
                self.height_map = Some(HeightMap::parse(DataMapKind::Data2D, value)?);
            }
            RecordTag::Data2DLegacy => {
                self.height_map = Some(HeightMap::parse(DataMapKind::Data2DLegacy, value)?);
            }
            RecordTag::Data3D => {
                self.height_map = Some(HeightMap::parse(DataMapKind::Data3D, value)?);
            }
            RecordTag::SubChunkPrefix => {
                let raw = key.sub_chunk.unwrap_or(0);
                let slot = slot_for_index(raw)?;
                self.slots[slot] = SubChunkSlot::Pending(value);
            }
            RecordTag::LegacyTerrain => {
                self.legacy_terrain = Some(LegacyTerrain::parse(value)?);
            }
            other => {
                self.records.insert(other, value);
            }
        }
        Ok(())
    }

    /// Slots that hold a sub-chunk record, parsed or not.
    pub fn occupied_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !matches!(s, SubChunkSlot::Empty))
            .map(|(i, _)| i)
    }

    pub fn sub_chunk_count(&self) -> usize {
        self.occupied_slots().count()
    }

    /// Number of sub-chunk decodes performed so far.
    pub fn parse_count(&self) -> usize {
        self.parses
    }

    /// Number of surface scans performed (cache misses).
    pub fn scan_count(&self) -> usize {
        self.scans
    }

    /// Decoded sub-chunk in `slot`, parsing it on first access.
    pub fn sub_chunk(
        &mut self,
        slot: usize,
        table: &LegacyBlockTable,
        errors: &mut Vec<LoadError>,
    ) -> Option<&SubChunk> {
        let entry = self.slots.get_mut(slot)?;
        if let SubChunkSlot::Pending(raw) = entry {
            let parsed = SubChunk::parse(raw, table);
            self.parses += 1;
            *entry = match parsed {
                Ok(sub) => {
                    trace!(pos = %self.pos, slot, version = sub.version(), "sub-chunk decoded");
                    SubChunkSlot::Parsed(Box::new(sub))
                }
                Err(e) => {
                    let context = format!("{} sub-chunk {}", self.pos, slot_base_y(slot) / 16);
                    warn!(%context, error = %e, "sub-chunk skipped");
                    errors.push(LoadError::new(context, e.kind(), e.to_string()));
                    SubChunkSlot::Failed
                }
            };
        }
        match &self.slots[slot] {
            SubChunkSlot::Parsed(sub) => Some(sub.as_ref()),
            _ => None,
        }
    }

    /// Decode every pending sub-chunk.
    pub fn parse_all(&mut self, table: &LegacyBlockTable, errors: &mut Vec<LoadError>) {
        for slot in 0..SLOT_COUNT {
            self.sub_chunk(slot, table, errors);
        }
    }

    /// Block at local `x`/`z` and world `y`, or `None` where nothing is stored.
    pub fn block(
        &mut self,
        x: usize,
        y: i32,
        z: usize,
        layer: usize,
        table: &LegacyBlockTable,
        errors: &mut Vec<LoadError>,
    ) -> Option<BlockInfo> {
        let slot = slot_for_y(y)?;
        let local_y = y.rem_euclid(16) as usize;
        if !matches!(self.slots[slot], SubChunkSlot::Empty) {
            return self
                .sub_chunk(slot, table, errors)?
                .block_layer(x, local_y, z, layer);
        }
        match &self.legacy_terrain {
            Some(terrain) if layer == 0 && (0..LEGACY_TERRAIN_HEIGHT as i32).contains(&y) => {
                Some(terrain.block(x, y as usize, z, table))
            }
            _ => None,
        }
    }

    /// Highest world y in the column whose block is not in `transparent`.
    ///
    /// Scans top-down and caches the answer per column, so repeated calls do
    /// not decode or scan again.
    pub fn top_block_y(
        &mut self,
        x: usize,
        z: usize,
        transparent: &HashSet<String>,
        table: &LegacyBlockTable,
        errors: &mut Vec<LoadError>,
    ) -> Option<i32> {
        let cell = x * 16 + z;
        if let Some(cached) = self.top_cache[cell] {
            return cached;
        }
        self.scans += 1;
        let found = self.scan_down(x, z, transparent, table, errors);
        self.top_cache[cell] = Some(found);
        found
    }

    fn scan_down(
        &mut self,
        x: usize,
        z: usize,
        transparent: &HashSet<String>,
        table: &LegacyBlockTable,
        errors: &mut Vec<LoadError>,
    ) -> Option<i32> {
        let solid = |b: &BlockInfo| !transparent.contains(&*b.name);
        for slot in (0..SLOT_COUNT).rev() {
            let base = slot_base_y(slot);
            if matches!(self.slots[slot], SubChunkSlot::Empty) {
                let Some(terrain) = &self.legacy_terrain else {
                    continue;
                };
                if !(0..LEGACY_TERRAIN_HEIGHT as i32).contains(&base) {
                    continue;
                }
                for ly in (0..16).rev() {
                    let y = base + ly;
                    if solid(&terrain.block(x, y as usize, z, table)) {
                        return Some(y);
                    }
                }
            } else if let Some(sub) = self.sub_chunk(slot, table, errors) {
                for ly in (0..16).rev() {
                    if solid(&sub.block(x, ly, z)) {
                        return Some(base + ly as i32);
                    }
                }
            }
        }
        None
    }
}
