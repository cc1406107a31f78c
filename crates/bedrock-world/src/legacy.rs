//! Numeric block ids used by pre-palette chunk formats.

use std::collections::HashMap;
use std::sync::Arc;

/// Bedrock block names indexed by their pre-1.2.13 numeric id.
const LEGACY_NAMES: [&str; 256] = [
    "air", "stone", "grass", "dirt", "cobblestone", "planks", "sapling", "bedrock",
    "flowing_water", "water", "flowing_lava", "lava", "sand", "gravel", "gold_ore", "iron_ore",
    "coal_ore", "log", "leaves", "sponge", "glass", "lapis_ore", "lapis_block", "dispenser",
    "sandstone", "noteblock", "bed", "golden_rail", "detector_rail", "sticky_piston", "web",
    "tallgrass", "deadbush", "piston", "pistonArmCollision", "wool", "element_0",
    "yellow_flower", "red_flower", "brown_mushroom", "red_mushroom", "gold_block", "iron_block",
    "double_stone_slab", "stone_slab", "brick_block", "tnt", "bookshelf", "mossy_cobblestone",
    "obsidian", "torch", "fire", "mob_spawner", "oak_stairs", "chest", "redstone_wire",
    "diamond_ore", "diamond_block", "crafting_table", "wheat", "farmland", "furnace",
    "lit_furnace", "standing_sign", "wooden_door", "ladder", "rail", "stone_stairs",
    "wall_sign", "lever", "stone_pressure_plate", "iron_door", "wooden_pressure_plate",
    "redstone_ore", "lit_redstone_ore", "unlit_redstone_torch", "redstone_torch",
    "stone_button", "snow_layer", "ice", "snow", "cactus", "clay", "reeds", "jukebox", "fence",
    "pumpkin", "netherrack", "soul_sand", "glowstone", "portal", "lit_pumpkin", "cake",
    "unpowered_repeater", "powered_repeater", "invisibleBedrock", "trapdoor", "monster_egg",
    "stonebrick", "brown_mushroom_block", "red_mushroom_block", "iron_bars", "glass_pane",
    "melon_block", "pumpkin_stem", "melon_stem", "vine", "fence_gate", "brick_stairs",
    "stone_brick_stairs", "mycelium", "waterlily", "nether_brick", "nether_brick_fence",
    "nether_brick_stairs", "nether_wart", "enchanting_table", "brewing_stand", "cauldron",
    "end_portal", "end_portal_frame", "end_stone", "dragon_egg", "redstone_lamp",
    "lit_redstone_lamp", "dropper", "activator_rail", "cocoa", "sandstone_stairs",
    "emerald_ore", "ender_chest", "tripwire_hook", "tripWire", "emerald_block",
    "spruce_stairs", "birch_stairs", "jungle_stairs", "command_block", "beacon",
    "cobblestone_wall", "flower_pot", "carrots", "potatoes", "wooden_button", "skull", "anvil",
    "trapped_chest", "light_weighted_pressure_plate", "heavy_weighted_pressure_plate",
    "unpowered_comparator", "powered_comparator", "daylight_detector", "redstone_block",
    "quartz_ore", "hopper", "quartz_block", "quartz_stairs", "double_wooden_slab",
    "wooden_slab", "stained_hardened_clay", "stained_glass_pane", "leaves2", "log2",
    "acacia_stairs", "dark_oak_stairs", "slime", "glow_stick", "iron_trapdoor", "prismarine",
    "seaLantern", "hay_block", "carpet", "hardened_clay", "coal_block", "packed_ice",
    "double_plant", "standing_banner", "wall_banner", "daylight_detector_inverted",
    "red_sandstone", "red_sandstone_stairs", "double_stone_slab2", "stone_slab2",
    "spruce_fence_gate", "birch_fence_gate", "jungle_fence_gate", "dark_oak_fence_gate",
    "acacia_fence_gate", "repeating_command_block", "chain_command_block", "hard_glass_pane",
    "hard_stained_glass_pane", "chemical_heat", "spruce_door", "birch_door", "jungle_door",
    "acacia_door", "dark_oak_door", "grass_path", "frame", "chorus_flower", "purpur_block",
    "colored_torch_rg", "purpur_stairs", "colored_torch_bp", "undyed_shulker_box",
    "end_bricks", "frosted_ice", "end_rod", "end_gateway", "allow", "deny", "border_block",
    "magma", "nether_wart_block", "red_nether_brick", "bone_block", "structure_void",
    "shulker_box", "purple_glazed_terracotta", "white_glazed_terracotta",
    "orange_glazed_terracotta", "magenta_glazed_terracotta", "light_blue_glazed_terracotta",
    "yellow_glazed_terracotta", "lime_glazed_terracotta", "pink_glazed_terracotta",
    "gray_glazed_terracotta", "silver_glazed_terracotta", "cyan_glazed_terracotta",
    "chalkboard", "blue_glazed_terracotta", "brown_glazed_terracotta",
    "green_glazed_terracotta", "red_glazed_terracotta", "black_glazed_terracotta", "concrete",
    "concrete_powder", "chemistry_table", "underwater_torch", "chorus_plant", "stained_glass",
    "camera", "podzol", "beetroot", "stonecutter", "glowingobsidian", "netherreactor",
    "info_update", "info_update2", "movingBlock", "observer", "structure_block", "hard_glass",
    "hard_stained_glass", "reserved6",
];

/// Numeric id to namespaced name table, built once per world session.
///
/// Clones share one copy of the table.
#[derive(Debug, Clone)]
pub struct LegacyBlockTable {
    inner: Arc<TableInner>,
}

#[derive(Debug)]
struct TableInner {
    names: Vec<Arc<str>>,
    ids: HashMap<Arc<str>, u8>,
}

impl Default for LegacyBlockTable {
    fn default() -> Self {
        Self::bedrock()
    }
}

impl LegacyBlockTable {
    /// The vanilla Bedrock id assignments.
    pub fn bedrock() -> Self {
        Self::from_names(LEGACY_NAMES.iter().map(|n| format!("minecraft:{n}")))
    }

    /// Build a table from names in id order. Ids beyond the list resolve to
    /// `minecraft:unknown_<id>`.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<Arc<str>> = names
            .into_iter()
            .take(256)
            .map(|n| Arc::from(Into::<String>::into(n)))
            .collect();
        for id in list.len()..256 {
            list.push(Arc::from(format!("minecraft:unknown_{id}")));
        }
        let ids = list
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id as u8))
            .collect();
        Self {
            inner: Arc::new(TableInner { names: list, ids }),
        }
    }

    pub fn name(&self, id: u8) -> &Arc<str> {
        &self.inner.names[id as usize]
    }

    pub fn id(&self, name: &str) -> Option<u8> {
        self.inner.ids.get(name).copied()
    }

    #[cfg(test)]
    pub(crate) fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
