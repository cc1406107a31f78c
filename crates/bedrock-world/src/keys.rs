//! Classification of world database keys.
//!
//! Chunk records use `[X:i32_le][Z:i32_le]([dim:i32_le])[tag]([sub_chunk:i8])`,
//! where the dimension id is present only outside the overworld. Everything
//! else is a named whole-world record.

use crate::error::WorldError;

pub const OVERWORLD: i32 = 0;
pub const NETHER: i32 = 1;
pub const THE_END: i32 = 2;

/// One-byte record tag of a chunk key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum RecordTag {
    Data3D = 0x2B,
    Version = 0x2C,
    Data2D = 0x2D,
    Data2DLegacy = 0x2E,
    SubChunkPrefix = 0x2F,
    LegacyTerrain = 0x30,
    BlockEntity = 0x31,
    Entity = 0x32,
    PendingTicks = 0x33,
    LegacyBlockExtraData = 0x34,
    BiomeState = 0x35,
    FinalizedState = 0x36,
    ConversionData = 0x37,
    BorderBlocks = 0x38,
    HardcodedSpawners = 0x39,
    RandomTicks = 0x3A,
    Checksums = 0x3B,
    GenerationSeed = 0x3C,
    GeneratedPreCavesAndCliffsBlending = 0x3D,
    BlendingBiomeHeight = 0x3E,
    MetaDataHash = 0x3F,
    BlendingData = 0x40,
    ActorDigestVersion = 0x41,
    LegacyVersion = 0x76,
}

impl RecordTag {
    pub fn from_byte(b: u8) -> Result<Self, WorldError> {
        use RecordTag::*;
        Ok(match b {
            0x2B => Data3D,
            0x2C => Version,
            0x2D => Data2D,
            0x2E => Data2DLegacy,
            0x2F => SubChunkPrefix,
            0x30 => LegacyTerrain,
            0x31 => BlockEntity,
            0x32 => Entity,
            0x33 => PendingTicks,
            0x34 => LegacyBlockExtraData,
            0x35 => BiomeState,
            0x36 => FinalizedState,
            0x37 => ConversionData,
            0x38 => BorderBlocks,
            0x39 => HardcodedSpawners,
            0x3A => RandomTicks,
            0x3B => Checksums,
            0x3C => GenerationSeed,
            0x3D => GeneratedPreCavesAndCliffsBlending,
            0x3E => BlendingBiomeHeight,
            0x3F => MetaDataHash,
            0x40 => BlendingData,
            0x41 => ActorDigestVersion,
            0x76 => LegacyVersion,
            other => return Err(WorldError::UnknownRecordTag(other)),
        })
    }

    pub fn byte(self) -> u8 {
        self as u8
    }
}

/// A decoded chunk record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub x: i32,
    pub z: i32,
    pub dimension: i32,
    pub tag: RecordTag,
    /// Raw sub-chunk index for [`RecordTag::SubChunkPrefix`] keys.
    pub sub_chunk: Option<i8>,
}

/// Whole-world records, matched by name before any chunk-shape check since
/// some names are exactly 9 or 10 bytes long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GlobalKind {
    LocalPlayer,
    Player,
    AutonomousEntities,
    BiomeData,
    DynamicProperties,
    LevelChunkMetaDataDictionary,
    MobEvents,
    Scoreboard,
    Portals,
    Dimension,
    SchedulerWt,
    Map,
    Village,
    TickingArea,
    ActorPrefix,
    ActorDigest,
    StructureTemplate,
}

const EXACT_NAMES: &[(&[u8], GlobalKind)] = &[
    (b"~local_player", GlobalKind::LocalPlayer),
    (b"AutonomousEntities", GlobalKind::AutonomousEntities),
    (b"BiomeData", GlobalKind::BiomeData),
    (b"DynamicProperties", GlobalKind::DynamicProperties),
    (b"LevelChunkMetaDataDictionary", GlobalKind::LevelChunkMetaDataDictionary),
    (b"mobevents", GlobalKind::MobEvents),
    (b"scoreboard", GlobalKind::Scoreboard),
    (b"portals", GlobalKind::Portals),
    (b"Overworld", GlobalKind::Dimension),
    (b"Nether", GlobalKind::Dimension),
    (b"TheEnd", GlobalKind::Dimension),
    (b"schedulerWT", GlobalKind::SchedulerWt),
    // Pre-1.1 names.
    (b"mVillages", GlobalKind::Village),
    (b"villages", GlobalKind::Village),
    (b"idcounts", GlobalKind::Map),
];

const PREFIXES: &[(&[u8], GlobalKind)] = &[
    (b"player_", GlobalKind::Player),
    (b"dimension", GlobalKind::Dimension),
    (b"map_", GlobalKind::Map),
    (b"VILLAGE_", GlobalKind::Village),
    (b"tickingarea_", GlobalKind::TickingArea),
    (b"actorprefix", GlobalKind::ActorPrefix),
    (b"digp", GlobalKind::ActorDigest),
    (b"structuretemplate", GlobalKind::StructureTemplate),
];

impl GlobalKind {
    pub fn from_key(key: &[u8]) -> Option<Self> {
        EXACT_NAMES
            .iter()
            .find(|(name, _)| *name == key)
            .or_else(|| PREFIXES.iter().find(|(prefix, _)| key.starts_with(prefix)))
            .map(|&(_, kind)| kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    Chunk(ChunkKey),
    Global(GlobalKind),
    Unclassified,
}

fn i32_at(key: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&key[offset..offset + 4]);
    i32::from_le_bytes(raw)
}

/// Classify a key by name, then by length.
///
/// A chunk-shaped key (9, 10, 13 or 14 bytes) with an unknown tag is an
/// error so that format drift is reported rather than dropped.
pub fn classify_key(key: &[u8]) -> Result<KeyClass, WorldError> {
    if let Some(kind) = GlobalKind::from_key(key) {
        return Ok(KeyClass::Global(kind));
    }
    let (dimension, tag_at) = match key.len() {
        9 | 10 => (OVERWORLD, 8),
        13 | 14 => (i32_at(key, 8), 12),
        _ => return Ok(KeyClass::Unclassified),
    };
    let tag = RecordTag::from_byte(key[tag_at])?;
    let sub_chunk = match (tag, key.len() - tag_at) {
        (RecordTag::SubChunkPrefix, 2) => Some(key[tag_at + 1] as i8),
        (_, 1) => None,
        _ => {
            return Err(WorldError::BadKeyLength {
                len: key.len(),
                tag: tag.byte(),
            })
        }
    };
    Ok(KeyClass::Chunk(ChunkKey {
        x: i32_at(key, 0),
        z: i32_at(key, 4),
        dimension,
        tag,
        sub_chunk,
    }))
}

/// Build a chunk record key: `[X][Z]([dim])[tag]`.
pub fn chunk_key(x: i32, z: i32, dimension: i32, tag: RecordTag) -> Vec<u8> {
    let cap = if dimension == OVERWORLD { 9 } else { 13 };
    let mut key = Vec::with_capacity(cap);
    key.extend_from_slice(&x.to_le_bytes());
    key.extend_from_slice(&z.to_le_bytes());
    if dimension != OVERWORLD {
        key.extend_from_slice(&dimension.to_le_bytes());
    }
    key.push(tag.byte());
    key
}

/// Build a sub-chunk key: `[X][Z]([dim])[0x2F][y_index]`.
pub fn sub_chunk_key(x: i32, z: i32, dimension: i32, y_index: i8) -> Vec<u8> {
    let mut key = chunk_key(x, z, dimension, RecordTag::SubChunkPrefix);
    key.push(y_index as u8);
    key
}
