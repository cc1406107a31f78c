//! Minecraft Bedrock world decoder.
//!
//! Loads the `db/` LevelDB folder of a world, groups chunk records into
//! columns and answers block queries. Sub-chunks stay as raw bytes until a
//! query first touches them.
//!
//! ```no_run
//! use bedrock_world::{DirectorySource, World, WorldOptions};
//!
//! let source = DirectorySource::new("worlds/My World");
//! let mut world = World::load(&source, WorldOptions::default())?;
//! let surface = world.get_top_block(0, 0);
//! println!("{surface}");
//! # Ok::<(), bedrock_world::WorldError>(())
//! ```

pub mod block;
pub mod chunk;
pub mod error;
pub mod keys;
pub mod legacy;
pub mod level_dat;
pub mod options;
pub mod palette;
pub mod source;
pub mod sub_chunk;
pub mod terrain;
pub mod world;

pub use block::BlockInfo;
pub use chunk::{ChunkColumn, ColumnPos};
pub use error::WorldError;
pub use keys::{classify_key, GlobalKind, KeyClass, RecordTag, NETHER, OVERWORLD, THE_END};
pub use legacy::LegacyBlockTable;
pub use level_dat::LevelDat;
pub use options::WorldOptions;
pub use palette::PaletteEntry;
pub use source::{DirectorySource, MemorySource, WorldSource};
pub use sub_chunk::SubChunk;
pub use world::{BlockPos, Cube, World, WorldStats};
