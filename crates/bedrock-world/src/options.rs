use serde::{Deserialize, Serialize};

/// Decode-session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldOptions {
    /// Blocks that height queries look through.
    #[serde(default = "default_surface_transparent_blocks")]
    pub surface_transparent_blocks: Vec<String>,
    /// Apply `db/*.log` files on top of the tables.
    #[serde(default = "default_load_logs")]
    pub load_logs: bool,
    /// Decode every sub-chunk during load instead of on first query.
    #[serde(default)]
    pub eager_sub_chunks: bool,
    /// Largest number of blocks a single cube query may return.
    #[serde(default = "default_max_cube_volume")]
    pub max_cube_volume: u64,
}

fn default_surface_transparent_blocks() -> Vec<String> {
    vec![
        "minecraft:air".into(),
        "minecraft:tallgrass".into(),
        "minecraft:double_plant".into(),
    ]
}

fn default_load_logs() -> bool {
    true
}

fn default_max_cube_volume() -> u64 {
    1 << 24
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self {
            surface_transparent_blocks: default_surface_transparent_blocks(),
            load_logs: default_load_logs(),
            eager_sub_chunks: false,
            max_cube_volume: default_max_cube_volume(),
        }
    }
}
