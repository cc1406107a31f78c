use std::error::Error;
use std::fmt::Write as _;

use bedrock_world::{classify_key, BlockInfo, KeyClass, World};
use clap::Subcommand;
use serde::Serialize;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Record, column and error counts
    Summary {
        #[arg(long)]
        json: bool,
    },
    /// Block at a world position
    Block {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
        #[arg(allow_negative_numbers = true)]
        z: i32,
        /// Storage layer (1 = waterlogging liquid)
        #[arg(long, default_value_t = 0)]
        layer: usize,
        #[arg(long)]
        json: bool,
    },
    /// Highest block of a column that is not surface-transparent
    Top {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        z: i32,
        #[arg(long)]
        json: bool,
    },
    /// Every block between two inclusive corners
    Cube {
        #[arg(allow_negative_numbers = true)]
        x1: i32,
        #[arg(allow_negative_numbers = true)]
        y1: i32,
        #[arg(allow_negative_numbers = true)]
        z1: i32,
        #[arg(allow_negative_numbers = true)]
        x2: i32,
        #[arg(allow_negative_numbers = true)]
        y2: i32,
        #[arg(allow_negative_numbers = true)]
        z2: i32,
        #[arg(long)]
        json: bool,
    },
    /// Database keys and how they were classified
    Keys {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Contents of level.dat
    Level,
}

#[derive(Debug, Serialize)]
struct BlockReport {
    x: i32,
    y: i32,
    z: i32,
    name: String,
    aux: u16,
}

impl BlockReport {
    fn new([x, y, z]: [i32; 3], block: &BlockInfo) -> Self {
        Self {
            x,
            y,
            z,
            name: block.name.to_string(),
            aux: block.aux,
        }
    }
}

#[derive(Debug, Serialize)]
struct TopReport {
    x: i32,
    z: i32,
    y: Option<i32>,
    name: String,
    aux: u16,
}

/// Blocks as indices into a palette of `name[:aux]` strings, x-major then z
/// then y.
#[derive(Debug, Serialize)]
struct CubeReport {
    origin: [i32; 3],
    size: [usize; 3],
    palette: Vec<String>,
    blocks: Vec<usize>,
}

pub fn run(command: &Command, world: &mut World) -> Result<String, Box<dyn Error>> {
    let mut out = String::new();
    match *command {
        Command::Summary { json } => {
            let stats = world.stats();
            if json {
                return Ok(serde_json::to_string_pretty(&stats)?);
            }
            if let Some(name) = world.level().and_then(|l| l.level_name()) {
                writeln!(out, "level name:       {name}")?;
            }
            writeln!(out, "db files:         {}", stats.db_files)?;
            writeln!(out, "records:          {}", stats.records)?;
            writeln!(out, "tombstones:       {}", stats.tombstones)?;
            writeln!(out, "chunk columns:    {}", stats.columns)?;
            writeln!(out, "sub-chunks:       {}", stats.sub_chunks)?;
            writeln!(out, "global records:   {}", stats.global_records)?;
            writeln!(out, "unclassified:     {}", stats.unclassified)?;
            writeln!(out, "min y:            {}", stats.min_y)?;
            writeln!(out, "errors:           {}", stats.errors)?;
            for e in world.errors() {
                writeln!(out, "  {e}")?;
            }
        }
        Command::Block {
            x,
            y,
            z,
            layer,
            json,
        } => {
            let block = world.get_block_layer(x, y, z, layer);
            if json {
                return Ok(serde_json::to_string(&BlockReport::new([x, y, z], &block))?);
            }
            writeln!(out, "{x} {y} {z}: {block}")?;
        }
        Command::Top { x, z, json } => {
            let y = world.get_top_block_y(x, z);
            let block = world.get_top_block(x, z);
            if json {
                let report = TopReport {
                    x,
                    z,
                    y,
                    name: block.name.to_string(),
                    aux: block.aux,
                };
                return Ok(serde_json::to_string(&report)?);
            }
            match y {
                Some(y) => writeln!(out, "{x} {y} {z}: {block}")?,
                None => writeln!(out, "{x} {z}: no surface block")?,
            }
        }
        Command::Cube {
            x1,
            y1,
            z1,
            x2,
            y2,
            z2,
            json,
        } => {
            let cube = world.get_cube([x1, y1, z1], [x2, y2, z2])?;
            if json {
                let mut palette: Vec<String> = Vec::new();
                let blocks = cube
                    .blocks
                    .iter()
                    .map(|b| {
                        let key = b.to_string();
                        match palette.iter().position(|p| *p == key) {
                            Some(i) => i,
                            None => {
                                palette.push(key);
                                palette.len() - 1
                            }
                        }
                    })
                    .collect();
                let report = CubeReport {
                    origin: cube.origin,
                    size: cube.size,
                    palette,
                    blocks,
                };
                return Ok(serde_json::to_string(&report)?);
            }
            let [ox, oy, oz] = cube.origin;
            let mut solid = 0;
            for dx in 0..cube.size[0] {
                for dz in 0..cube.size[2] {
                    for dy in 0..cube.size[1] {
                        let Some(block) = cube.get(dx, dy, dz).filter(|b| !b.is_air()) else {
                            continue;
                        };
                        solid += 1;
                        let (x, y, z) = (ox + dx as i32, oy + dy as i32, oz + dz as i32);
                        writeln!(out, "{x} {y} {z}: {block}")?;
                    }
                }
            }
            writeln!(out, "{solid} of {} blocks are not air", cube.len())?;
        }
        Command::Keys { limit } => {
            for (key, entry) in world.store().iter().take(limit) {
                let class = match classify_key(key) {
                    Ok(KeyClass::Chunk(k)) => match k.sub_chunk {
                        Some(y) => format!("chunk ({}, {}) dim {} {:?} {y}", k.x, k.z, k.dimension, k.tag),
                        None => format!("chunk ({}, {}) dim {} {:?}", k.x, k.z, k.dimension, k.tag),
                    },
                    Ok(KeyClass::Global(kind)) => format!("{kind:?}"),
                    Ok(KeyClass::Unclassified) => "unclassified".to_string(),
                    Err(e) => format!("invalid: {e}"),
                };
                let size = match &entry.value {
                    Some(v) => format!("{} bytes", v.len()),
                    None => "deleted".to_string(),
                };
                writeln!(out, "{}  {class}  ({size})", printable(key))?;
            }
        }
        Command::Level => match world.level() {
            Some(level) => {
                writeln!(out, "storage version: {}", level.storage_version)?;
                for (name, tag) in level.compound().iter() {
                    writeln!(out, "  {name} = {tag}")?;
                }
            }
            None => writeln!(out, "no level.dat")?,
        },
    }
    Ok(out)
}

/// ASCII keys as text, anything else as hex.
fn printable(key: &[u8]) -> String {
    if !key.is_empty() && key.iter().all(|b| b.is_ascii_graphic()) {
        String::from_utf8_lossy(key).into_owned()
    } else {
        key.iter().map(|b| format!("{b:02x}")).collect()
    }
}
