//! The decode session: load a world's database once, classify every record
//! and answer block queries over the reconstructed columns.

use std::collections::{BTreeMap, HashMap, HashSet};

use bedrock_codec::LoadError;
use bedrock_leveldb::{classify_file, DbFileKind, KeyValueStore};
use bedrock_nbt::{read_nbt_stream, NbtRoot, StringEncoding};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::block::BlockInfo;
use crate::chunk::{slot_base_y, slot_for_index, ChunkColumn, ColumnPos};
use crate::error::WorldError;
use crate::keys::{classify_key, GlobalKind, KeyClass, RecordTag, OVERWORLD};
use crate::legacy::LegacyBlockTable;
use crate::level_dat::LevelDat;
use crate::options::WorldOptions;
use crate::source::{WorldSource, LEVEL_DAT};

/// Block coordinates in world space.
pub type BlockPos = [i32; 3];

/// Chunk column holding a block column, plus the local x/z inside it.
fn locate(dimension: i32, x: i32, z: i32) -> (ColumnPos, usize, usize) {
    let pos = ColumnPos {
        dimension,
        x: x.div_euclid(16),
        z: z.div_euclid(16),
    };
    (pos, x.rem_euclid(16) as usize, z.rem_euclid(16) as usize)
}

fn hex(key: &[u8]) -> String {
    key.iter().map(|b| format!("{b:02x}")).collect()
}

/// A box of blocks, x-major then z then y.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    /// Lowest corner.
    pub origin: BlockPos,
    pub size: [usize; 3],
    pub blocks: Vec<BlockInfo>,
}

impl Cube {
    fn offset(&self, dx: usize, dy: usize, dz: usize) -> usize {
        (dx * self.size[2] + dz) * self.size[1] + dy
    }

    /// Block at an offset from [`Cube::origin`].
    pub fn get(&self, dx: usize, dy: usize, dz: usize) -> Option<&BlockInfo> {
        if dx >= self.size[0] || dy >= self.size[1] || dz >= self.size[2] {
            return None;
        }
        self.blocks.get(self.offset(dx, dy, dz))
    }

    /// Block at a world position inside the cube.
    pub fn at(&self, pos: BlockPos) -> Option<&BlockInfo> {
        let d = |i: usize| usize::try_from(i64::from(pos[i]) - i64::from(self.origin[i])).ok();
        self.get(d(0)?, d(1)?, d(2)?)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Counters describing a loaded session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorldStats {
    pub db_files: usize,
    pub records: usize,
    pub tombstones: usize,
    pub columns: usize,
    pub sub_chunks: usize,
    pub global_records: usize,
    pub unclassified: usize,
    pub sub_chunk_parses: usize,
    pub min_y: i32,
    pub errors: usize,
}

pub struct World {
    store: KeyValueStore,
    columns: HashMap<ColumnPos, ChunkColumn>,
    globals: BTreeMap<Vec<u8>, GlobalKind>,
    unclassified: usize,
    legacy: LegacyBlockTable,
    transparent: HashSet<String>,
    options: WorldOptions,
    level: Option<LevelDat>,
    min_y: Option<i32>,
    errors: Vec<LoadError>,
}

impl World {
    /// Read `level.dat` and every database file from `source`.
    ///
    /// Only a failure to list the container is returned; unreadable or
    /// corrupt files are collected in [`World::errors`].
    pub fn load(source: &dyn WorldSource, options: WorldOptions) -> Result<Self, WorldError> {
        let mut errors = Vec::new();
        let mut files = Vec::new();
        for name in source.db_files()? {
            let Some((kind, _)) = classify_file(&name) else {
                continue;
            };
            if kind == DbFileKind::Log && !options.load_logs {
                debug!(file = %name, "log skipped");
                continue;
            }
            match source.read(&name) {
                Ok(data) => files.push((name, data)),
                Err(e) => {
                    warn!(file = %name, error = %e, "database file unreadable");
                    errors.push(LoadError::new(name, e.kind(), e.to_string()));
                }
            }
        }

        let level = match source.read(LEVEL_DAT) {
            Ok(data) => match LevelDat::parse(&data) {
                Ok(level) => Some(level),
                Err(e) => {
                    warn!(error = %e, "level.dat unreadable");
                    errors.push(LoadError::new(LEVEL_DAT, e.kind(), e.to_string()));
                    None
                }
            },
            Err(WorldError::MissingFile(_)) => None,
            Err(e) => {
                errors.push(LoadError::new(LEVEL_DAT, e.kind(), e.to_string()));
                None
            }
        };

        let mut store = KeyValueStore::new();
        store.init(files);
        let mut world = Self::from_store(store, options);
        world.level = level;
        errors.append(&mut world.errors);
        world.errors = errors;
        Ok(world)
    }

    /// Build the chunk model from an already loaded store.
    pub fn from_store(store: KeyValueStore, options: WorldOptions) -> Self {
        let mut world = Self {
            errors: store.errors().to_vec(),
            store,
            columns: HashMap::new(),
            globals: BTreeMap::new(),
            unclassified: 0,
            legacy: LegacyBlockTable::bedrock(),
            transparent: options.surface_transparent_blocks.iter().cloned().collect(),
            options,
            level: None,
            min_y: None,
        };
        world.classify();
        if world.options.eager_sub_chunks {
            for column in world.columns.values_mut() {
                column.parse_all(&world.legacy, &mut world.errors);
            }
        }
        let stats = world.stats();
        info!(
            records = stats.records,
            columns = stats.columns,
            sub_chunks = stats.sub_chunks,
            globals = stats.global_records,
            errors = stats.errors,
            "world loaded"
        );
        world
    }

    fn classify(&mut self) {
        for (key, entry) in self.store.iter() {
            let Some(value) = &entry.value else {
                continue;
            };
            match classify_key(key) {
                Ok(KeyClass::Chunk(ck)) => {
                    let pos = ColumnPos {
                        dimension: ck.dimension,
                        x: ck.x,
                        z: ck.z,
                    };
                    let column = self
                        .columns
                        .entry(pos)
                        .or_insert_with(|| ChunkColumn::new(pos));
                    if let Err(e) = column.insert(&ck, value.clone()) {
                        let context = format!("{pos} record {:#04x}", ck.tag.byte());
                        warn!(%context, error = %e, "chunk record skipped");
                        self.errors.push(LoadError::new(context, e.kind(), e.to_string()));
                        continue;
                    }
                    if let (RecordTag::SubChunkPrefix, Some(raw)) = (ck.tag, ck.sub_chunk) {
                        if let Ok(slot) = slot_for_index(raw) {
                            let base = slot_base_y(slot);
                            self.min_y = Some(self.min_y.map_or(base, |m| m.min(base)));
                        }
                    }
                }
                Ok(KeyClass::Global(kind)) => {
                    self.globals.insert(key.to_vec(), kind);
                }
                Ok(KeyClass::Unclassified) => self.unclassified += 1,
                Err(e) => {
                    let context = format!("key {}", hex(key));
                    warn!(%context, error = %e, "record skipped");
                    self.errors.push(LoadError::new(context, e.kind(), e.to_string()));
                }
            }
        }
        debug!(
            columns = self.columns.len(),
            globals = self.globals.len(),
            unclassified = self.unclassified,
            "records classified"
        );
    }

    pub fn options(&self) -> &WorldOptions {
        &self.options
    }

    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    pub fn level(&self) -> Option<&LevelDat> {
        self.level.as_ref()
    }

    /// Lowest sub-chunk base y seen, or 0 without sub-chunks.
    pub fn min_y(&self) -> i32 {
        self.min_y.unwrap_or(0)
    }

    pub fn column(&self, dimension: i32, chunk_x: i32, chunk_z: i32) -> Option<&ChunkColumn> {
        self.columns.get(&ColumnPos {
            dimension,
            x: chunk_x,
            z: chunk_z,
        })
    }

    pub fn columns(&self) -> impl Iterator<Item = &ChunkColumn> {
        self.columns.values()
    }

    /// Whole-world record keys and their kinds, in key order.
    pub fn globals(&self) -> impl Iterator<Item = (&[u8], GlobalKind)> {
        self.globals.iter().map(|(k, &kind)| (k.as_slice(), kind))
    }

    pub fn global(&self, key: &[u8]) -> Option<&Bytes> {
        self.globals.contains_key(key).then(|| self.store.get(key)).flatten()
    }

    /// Decode a whole-world record as a stream of NBT roots.
    pub fn global_nbt(&self, key: &[u8]) -> Option<Result<Vec<NbtRoot>, WorldError>> {
        let raw = self.global(key)?;
        Some(read_nbt_stream(&mut &raw[..], StringEncoding::Utf8).map_err(WorldError::from))
    }

    pub fn errors(&self) -> &[LoadError] {
        &self.errors
    }

    pub fn is_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn stats(&self) -> WorldStats {
        let columns = self.columns.values();
        WorldStats {
            db_files: self.store.files_loaded(),
            records: self.store.len(),
            tombstones: self.store.tombstone_count(),
            columns: self.columns.len(),
            sub_chunks: columns.clone().map(ChunkColumn::sub_chunk_count).sum(),
            global_records: self.globals.len(),
            unclassified: self.unclassified,
            sub_chunk_parses: columns.map(ChunkColumn::parse_count).sum(),
            min_y: self.min_y(),
            errors: self.errors.len(),
        }
    }

    pub fn get_block(&mut self, x: i32, y: i32, z: i32) -> BlockInfo {
        self.get_block_in(OVERWORLD, x, y, z)
    }

    pub fn get_block_in(&mut self, dimension: i32, x: i32, y: i32, z: i32) -> BlockInfo {
        self.get_block_layer_in(dimension, x, y, z, 0)
    }

    /// Block in a given storage layer; layer 1 is the liquid a block is
    /// submerged in.
    pub fn get_block_layer(&mut self, x: i32, y: i32, z: i32, layer: usize) -> BlockInfo {
        self.get_block_layer_in(OVERWORLD, x, y, z, layer)
    }

    pub fn get_block_layer_in(
        &mut self,
        dimension: i32,
        x: i32,
        y: i32,
        z: i32,
        layer: usize,
    ) -> BlockInfo {
        let (pos, lx, lz) = locate(dimension, x, z);
        let Self {
            columns,
            legacy,
            errors,
            ..
        } = self;
        columns
            .get_mut(&pos)
            .and_then(|c| c.block(lx, y, lz, layer, legacy, errors))
            .unwrap_or_else(BlockInfo::air)
    }

    /// Y of the highest block in the column that is not surface-transparent.
    pub fn get_top_block_y(&mut self, x: i32, z: i32) -> Option<i32> {
        self.get_top_block_y_in(OVERWORLD, x, z)
    }

    pub fn get_top_block_y_in(&mut self, dimension: i32, x: i32, z: i32) -> Option<i32> {
        let (pos, lx, lz) = locate(dimension, x, z);
        let Self {
            columns,
            legacy,
            transparent,
            errors,
            ..
        } = self;
        columns
            .get_mut(&pos)?
            .top_block_y(lx, lz, transparent, legacy, errors)
    }

    /// The block at [`World::get_top_block_y`], or air for an empty column.
    pub fn get_top_block(&mut self, x: i32, z: i32) -> BlockInfo {
        self.get_top_block_in(OVERWORLD, x, z)
    }

    pub fn get_top_block_in(&mut self, dimension: i32, x: i32, z: i32) -> BlockInfo {
        match self.get_top_block_y_in(dimension, x, z) {
            Some(y) => self.get_block_in(dimension, x, y, z),
            None => BlockInfo::air(),
        }
    }

    /// Every block between two inclusive corners, given in any order.
    ///
    /// Fails when the box holds more than [`WorldOptions::max_cube_volume`]
    /// blocks.
    pub fn get_cube(&mut self, from: BlockPos, to: BlockPos) -> Result<Cube, WorldError> {
        self.get_cube_in(OVERWORLD, from, to)
    }

    pub fn get_cube_in(
        &mut self,
        dimension: i32,
        from: BlockPos,
        to: BlockPos,
    ) -> Result<Cube, WorldError> {
        let lo = [from[0].min(to[0]), from[1].min(to[1]), from[2].min(to[2])];
        let hi = [from[0].max(to[0]), from[1].max(to[1]), from[2].max(to[2])];
        let extent = [0, 1, 2].map(|i| (i64::from(hi[i]) - i64::from(lo[i]) + 1) as u64);
        let limit = self.options.max_cube_volume;
        let volume = extent[0]
            .checked_mul(extent[1])
            .and_then(|v| v.checked_mul(extent[2]))
            .filter(|&v| v <= limit)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or(WorldError::CubeTooLarge {
                size: extent,
                limit,
            })?;
        // Each axis is at most the volume, which fits in usize.
        let size = extent.map(|e| e as usize);
        let min_y = self.min_y();

        let Self {
            columns,
            legacy,
            errors,
            ..
        } = self;
        let mut blocks = Vec::with_capacity(volume);
        for x in lo[0]..=hi[0] {
            for z in lo[2]..=hi[2] {
                let (pos, lx, lz) = locate(dimension, x, z);
                let mut column = columns.get_mut(&pos);
                for y in lo[1]..=hi[1] {
                    let block = match column.as_deref_mut() {
                        Some(c) if y >= min_y => c.block(lx, y, lz, 0, legacy, errors),
                        _ => None,
                    };
                    blocks.push(block.unwrap_or_else(BlockInfo::air));
                }
            }
        }
        Ok(Cube {
            origin: lo,
            size,
            blocks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{chunk_key, sub_chunk_key, NETHER};
    use crate::palette::PaletteEntry;
    use crate::source::MemorySource;
    use crate::sub_chunk::{block_index, BlockStorage, PalettedSubChunk, SubChunk, SUB_CHUNK_VOLUME};
    use bedrock_leveldb::{encode_batch, frame_records};

    fn sub_chunk_bytes(y_index: i8, blocks: &[(usize, usize, usize, &str)]) -> Vec<u8> {
        let mut palette = vec![PaletteEntry::new("minecraft:air")];
        let mut indices = vec![0u16; SUB_CHUNK_VOLUME];
        for &(x, y, z, name) in blocks {
            let i = match palette.iter().position(|p| &*p.name == name) {
                Some(i) => i,
                None => {
                    palette.push(PaletteEntry::new(name));
                    palette.len() - 1
                }
            };
            indices[block_index(x, y, z)] = i as u16;
        }
        let storage = BlockStorage::from_indices(&indices, palette).unwrap();
        SubChunk::Paletted(PalettedSubChunk {
            version: 9,
            y_index: Some(y_index),
            storages: vec![storage],
        })
        .encode()
        .unwrap()
    }

    fn world(records: &[(Vec<u8>, Option<Vec<u8>>)], options: WorldOptions) -> World {
        let entries: Vec<(&[u8], Option<&[u8]>)> = records
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_deref()))
            .collect();
        let log = frame_records(&[encode_batch(1, &entries)]);
        let source = MemorySource::new().with_file("db/000001.log", log);
        World::load(&source, options).unwrap()
    }

    #[test]
    fn negative_coordinates_use_floor_division() {
        assert_eq!(locate(OVERWORLD, -1, -16), (ColumnPos { dimension: 0, x: -1, z: -1 }, 15, 0));
        assert_eq!(locate(OVERWORLD, -17, 31), (ColumnPos { dimension: 0, x: -2, z: 1 }, 15, 15));
    }

    #[test]
    fn blocks_across_columns() {
        let mut w = world(
            &[
                (sub_chunk_key(0, 0, OVERWORLD, 0), Some(sub_chunk_bytes(0, &[(1, 2, 3, "minecraft:stone")]))),
                (sub_chunk_key(-1, 0, OVERWORLD, -1), Some(sub_chunk_bytes(-1, &[(15, 15, 0, "minecraft:dirt")]))),
                (sub_chunk_key(0, 0, NETHER, 0), Some(sub_chunk_bytes(0, &[(1, 2, 3, "minecraft:netherrack")]))),
            ],
            WorldOptions::default(),
        );
        assert!(!w.is_error(), "{:?}", w.errors());
        assert_eq!(&*w.get_block(1, 2, 3).name, "minecraft:stone");
        assert_eq!(&*w.get_block(-1, -1, 0).name, "minecraft:dirt");
        assert_eq!(&*w.get_block_in(NETHER, 1, 2, 3).name, "minecraft:netherrack");
        assert!(w.get_block(1, 3, 3).is_air());
        assert!(w.get_block(1000, 2, 3).is_air());
        assert_eq!(w.min_y(), -16);
        assert_eq!(w.stats().columns, 3);
    }

    #[test]
    fn top_block_is_cached() {
        let mut w = world(
            &[
                (sub_chunk_key(0, 0, OVERWORLD, 1), Some(sub_chunk_bytes(1, &[(4, 0, 4, "minecraft:double_plant")]))),
                (sub_chunk_key(0, 0, OVERWORLD, 0), Some(sub_chunk_bytes(0, &[(4, 15, 4, "minecraft:grass")]))),
            ],
            WorldOptions::default(),
        );
        assert_eq!(w.get_top_block_y(4, 4), Some(15));
        let parses = w.stats().sub_chunk_parses;
        let scans = w.column(OVERWORLD, 0, 0).unwrap().scan_count();
        assert_eq!(w.get_top_block_y(4, 4), Some(15));
        assert_eq!(w.stats().sub_chunk_parses, parses);
        assert_eq!(w.column(OVERWORLD, 0, 0).unwrap().scan_count(), scans);
        assert_eq!(&*w.get_top_block(4, 4).name, "minecraft:grass");
        assert_eq!(w.get_top_block_y(5, 5), None);
        assert!(w.get_top_block(5, 5).is_air());
        assert_eq!(w.get_top_block_y(100, 100), None);
    }

    #[test]
    fn custom_transparent_set() {
        let options = WorldOptions {
            surface_transparent_blocks: vec!["minecraft:air".into(), "minecraft:grass".into()],
            ..WorldOptions::default()
        };
        let mut w = world(
            &[(
                sub_chunk_key(0, 0, OVERWORLD, 0),
                Some(sub_chunk_bytes(0, &[(0, 15, 0, "minecraft:grass"), (0, 14, 0, "minecraft:dirt")])),
            )],
            options,
        );
        assert_eq!(w.get_top_block_y(0, 0), Some(14));
    }

    #[test]
    fn cube_spans_columns_and_clips_min_y() {
        let mut w = world(
            &[
                (sub_chunk_key(0, 0, OVERWORLD, 0), Some(sub_chunk_bytes(0, &[(15, 0, 0, "minecraft:stone")]))),
                (sub_chunk_key(1, 0, OVERWORLD, 0), Some(sub_chunk_bytes(0, &[(0, 1, 0, "minecraft:dirt")]))),
            ],
            WorldOptions::default(),
        );
        let cube = w.get_cube([16, 1, 0], [15, -2, 0]).unwrap();
        assert_eq!(cube.origin, [15, -2, 0]);
        assert_eq!(cube.size, [2, 4, 1]);
        assert_eq!(cube.len(), 8);
        assert_eq!(&*cube.at([15, 0, 0]).unwrap().name, "minecraft:stone");
        assert_eq!(&*cube.at([16, 1, 0]).unwrap().name, "minecraft:dirt");
        assert!(cube.at([15, -2, 0]).unwrap().is_air());
        assert_eq!(cube.at([17, 0, 0]), None);
        // x-major, then z, then y.
        assert_eq!(&*cube.blocks[2].name, "minecraft:stone");
        assert_eq!(&*cube.blocks[7].name, "minecraft:dirt");
    }

    #[test]
    fn oversized_cube_is_refused() {
        let mut w = World::from_store(KeyValueStore::new(), WorldOptions::default());
        let err = w
            .get_cube([i32::MIN, -64, i32::MIN], [i32::MAX, 319, i32::MAX])
            .unwrap_err();
        assert!(matches!(err, WorldError::CubeTooLarge { size: [4_294_967_296, 384, 4_294_967_296], .. }));

        let mut small = World::from_store(
            KeyValueStore::new(),
            WorldOptions {
                max_cube_volume: 27,
                ..WorldOptions::default()
            },
        );
        assert_eq!(small.get_cube([0, 0, 0], [2, 2, 2]).unwrap().len(), 27);
        assert!(matches!(
            small.get_cube([0, 0, 0], [2, 2, 3]),
            Err(WorldError::CubeTooLarge { limit: 27, .. })
        ));
    }

    #[test]
    fn globals_and_unclassified() {
        let mut compound = bedrock_nbt::NbtCompound::new();
        compound.insert("score".into(), bedrock_nbt::NbtTag::Int(3));
        let mut nbt = Vec::new();
        bedrock_nbt::write_nbt_le(&mut nbt, &NbtRoot::new("", compound)).unwrap();

        let w = world(
            &[
                (b"scoreboard".to_vec(), Some(nbt)),
                (b"~local_player".to_vec(), Some(vec![1, 2, 3])),
                (b"game_flatworldlayers".to_vec(), Some(b"[7,3,3,2]".to_vec())),
            ],
            WorldOptions::default(),
        );
        assert_eq!(w.stats().global_records, 2);
        assert_eq!(w.stats().unclassified, 1);
        assert_eq!(w.stats().columns, 0);
        let roots = w.global_nbt(b"scoreboard").unwrap().unwrap();
        assert_eq!(roots[0].compound.get_int("score"), Some(3));
        assert!(w.global_nbt(b"~local_player").unwrap().is_err());
        assert!(w.global_nbt(b"game_flatworldlayers").is_none());
        assert_eq!(
            w.globals().map(|(_, kind)| kind).collect::<Vec<_>>(),
            vec![GlobalKind::Scoreboard, GlobalKind::LocalPlayer]
        );
    }

    #[test]
    fn bad_records_are_collected() {
        let mut unknown = chunk_key(0, 0, OVERWORLD, RecordTag::Version);
        unknown[8] = 0x99;
        let mut w = world(
            &[
                (unknown, Some(vec![1])),
                (chunk_key(2, 2, OVERWORLD, RecordTag::LegacyTerrain), Some(vec![0; 10])),
                (sub_chunk_key(3, 3, OVERWORLD, 0), Some(vec![200, 0])),
                (sub_chunk_key(4, 4, OVERWORLD, 0), Some(sub_chunk_bytes(0, &[(0, 0, 0, "minecraft:stone")]))),
            ],
            WorldOptions::default(),
        );
        assert_eq!(w.errors().len(), 2);
        assert!(w.errors()[0].context.starts_with("key "));
        assert_eq!(w.errors()[0].kind, bedrock_codec::ErrorKind::Unsupported);

        // The corrupt sub-chunk only fails when first read.
        assert!(w.get_block(48, 0, 48).is_air());
        assert_eq!(w.errors().len(), 3);
        assert_eq!(&*w.get_block(64, 0, 64).name, "minecraft:stone");
        assert!(w.is_error());
    }

    #[test]
    fn eager_parse_surfaces_errors_at_load() {
        let records = [(sub_chunk_key(0, 0, OVERWORLD, 0), Some(vec![200, 0]))];
        let lazy = world(&records, WorldOptions::default());
        assert!(!lazy.is_error());
        let eager = world(
            &records,
            WorldOptions {
                eager_sub_chunks: true,
                ..WorldOptions::default()
            },
        );
        assert_eq!(eager.errors().len(), 1);
        assert_eq!(eager.stats().sub_chunk_parses, 1);
    }

    #[test]
    fn deleted_chunk_records_are_ignored() {
        let key = sub_chunk_key(0, 0, OVERWORLD, 0);
        let w = world(&[(key, None)], WorldOptions::default());
        assert_eq!(w.stats().columns, 0);
        assert_eq!(w.stats().tombstones, 1);
    }

    #[test]
    fn logs_can_be_skipped() {
        let w = world(
            &[(sub_chunk_key(0, 0, OVERWORLD, 0), Some(sub_chunk_bytes(0, &[])))],
            WorldOptions {
                load_logs: false,
                ..WorldOptions::default()
            },
        );
        assert_eq!(w.stats().records, 0);
        assert_eq!(w.stats().db_files, 0);
    }
}
