//! Name and id lookups for blocks, block handlers and biomes.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use crate::biome::Biome;
use crate::block::{Block, BlockHandler, NamedHandler};

pub trait BlockRegistry: Send + Sync {
    /// Default state of the block type with this namespaced name.
    fn resolve(&self, name: &str) -> Option<Block>;
}

pub trait BlockHandlerRegistry: Send + Sync {
    fn resolve(&self, id: &str) -> Option<Arc<dyn BlockHandler>>;
}

pub trait BiomeRegistry: Send + Sync {
    fn resolve(&self, id: i32) -> Option<Biome>;
}

/// Add the `minecraft:` namespace to bare names.
fn namespaced(name: &str) -> Cow<'_, str> {
    if name.contains(':') {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("minecraft:{name}"))
    }
}

fn is_identifier(name: &str) -> bool {
    let Some((namespace, path)) = name.split_once(':') else {
        return false;
    };
    let valid = |s: &str, extra: &[char]| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_-.".contains(c) || extra.contains(&c))
    };
    valid(namespace, &[]) && valid(path, &['/'])
}

const VANILLA_BLOCKS: &[&str] = &[
    "air", "cave_air", "void_air", "stone", "granite", "diorite", "andesite", "grass_block",
    "dirt", "coarse_dirt", "podzol", "cobblestone", "mossy_cobblestone", "bedrock", "water",
    "lava", "sand", "red_sand", "gravel", "sandstone", "clay", "snow", "snow_block", "ice",
    "obsidian", "coal_ore", "iron_ore", "gold_ore", "redstone_ore", "lapis_ore", "diamond_ore",
    "emerald_ore", "oak_log", "spruce_log", "birch_log", "oak_leaves", "spruce_leaves",
    "birch_leaves", "oak_planks", "spruce_planks", "birch_planks", "oak_stairs", "oak_slab",
    "oak_fence", "glass", "white_wool", "grass", "tall_grass", "fern", "dandelion", "poppy",
    "torch", "wall_torch", "crafting_table", "chest", "trapped_chest", "furnace", "barrel",
    "hopper", "dispenser", "dropper", "spawner", "oak_sign", "oak_wall_sign", "beacon",
    "enchanting_table", "bookshelf", "jukebox", "note_block",
];

const VANILLA_HANDLERS: &[&str] = &[
    "chest", "trapped_chest", "furnace", "barrel", "hopper", "dispenser", "dropper",
    "mob_spawner", "sign", "beacon", "enchanting_table", "jukebox", "skull", "banner",
];

const VANILLA_BIOMES: &[(i32, &str)] = &[
    (0, "ocean"),
    (1, "plains"),
    (2, "desert"),
    (3, "mountains"),
    (4, "forest"),
    (5, "taiga"),
    (6, "swamp"),
    (7, "river"),
    (8, "nether_wastes"),
    (9, "the_end"),
    (10, "frozen_ocean"),
    (11, "frozen_river"),
    (12, "snowy_tundra"),
    (13, "snowy_mountains"),
    (14, "mushroom_fields"),
    (16, "beach"),
    (21, "jungle"),
    (24, "deep_ocean"),
    (27, "birch_forest"),
    (29, "dark_forest"),
    (30, "snowy_taiga"),
    (35, "savanna"),
    (37, "badlands"),
];

/// Block types by name.
#[derive(Debug, Clone, Default)]
pub struct BlockTable {
    blocks: HashMap<String, Block>,
    permissive: bool,
}

impl BlockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vanilla() -> Self {
        let mut table = Self::new();
        for name in VANILLA_BLOCKS {
            table.register(Block::new(format!("minecraft:{name}")));
        }
        table
    }

    /// Also resolve well-formed names that were never registered.
    pub fn permissive(mut self) -> Self {
        self.permissive = true;
        self
    }

    pub fn register(&mut self, block: Block) {
        self.blocks.insert(block.name().to_string(), block);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockRegistry for BlockTable {
    fn resolve(&self, name: &str) -> Option<Block> {
        let name = namespaced(name);
        if let Some(block) = self.blocks.get(name.as_ref()) {
            return Some(block.clone());
        }
        (self.permissive && is_identifier(&name)).then(|| Block::new(name.into_owned()))
    }
}

/// Block handlers by namespaced id.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Arc<dyn BlockHandler>>,
    permissive: bool,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vanilla() -> Self {
        let mut table = Self::new();
        for id in VANILLA_HANDLERS {
            table.register(Arc::new(NamedHandler::new(format!("minecraft:{id}"))));
        }
        table
    }

    /// Hand out a [`NamedHandler`] for well-formed ids that were never
    /// registered.
    pub fn permissive(mut self) -> Self {
        self.permissive = true;
        self
    }

    pub fn register(&mut self, handler: Arc<dyn BlockHandler>) {
        self.handlers.insert(handler.namespace_id().to_string(), handler);
    }
}

impl BlockHandlerRegistry for HandlerTable {
    fn resolve(&self, id: &str) -> Option<Arc<dyn BlockHandler>> {
        let id = namespaced(id);
        if let Some(handler) = self.handlers.get(id.as_ref()) {
            return Some(handler.clone());
        }
        if self.permissive && is_identifier(&id) {
            return Some(Arc::new(NamedHandler::new(id.into_owned())));
        }
        None
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.handlers.keys().collect();
        ids.sort();
        f.debug_struct("HandlerTable")
            .field("handlers", &ids)
            .field("permissive", &self.permissive)
            .finish()
    }
}

/// Biomes by numeric id.
#[derive(Debug, Clone, Default)]
pub struct BiomeTable {
    biomes: HashMap<i32, Biome>,
}

impl BiomeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vanilla() -> Self {
        let mut table = Self::new();
        for (id, name) in VANILLA_BIOMES {
            table.register(Biome::new(*id, format!("minecraft:{name}")));
        }
        table
    }

    pub fn register(&mut self, biome: Biome) {
        self.biomes.insert(biome.id(), biome);
    }
}

impl BiomeRegistry for BiomeTable {
    fn resolve(&self, id: i32) -> Option<Biome> {
        self.biomes.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vanilla_blocks_resolve_with_or_without_namespace() {
        let table = BlockTable::vanilla();
        assert_eq!(table.resolve("minecraft:stone").unwrap().name(), "minecraft:stone");
        assert_eq!(table.resolve("stone").unwrap().name(), "minecraft:stone");
        assert!(table.resolve("minecraft:not_a_block").is_none());
    }

    #[test]
    fn test_permissive_blocks_still_reject_garbage() {
        let table = BlockTable::vanilla().permissive();
        assert_eq!(table.resolve("mymod:copper_pipe").unwrap().name(), "mymod:copper_pipe");
        assert!(table.resolve("Not A Block!").is_none());
        assert!(table.resolve("minecraft:").is_none());
    }

    #[test]
    fn test_handlers() {
        let strict = HandlerTable::vanilla();
        assert_eq!(strict.resolve("minecraft:chest").unwrap().namespace_id(), "minecraft:chest");
        assert!(strict.resolve("mymod:pipe").is_none());

        let open = HandlerTable::new().permissive();
        assert_eq!(open.resolve("mymod:pipe").unwrap().namespace_id(), "mymod:pipe");
    }

    #[test]
    fn test_biomes() {
        let table = BiomeTable::vanilla();
        assert_eq!(table.resolve(1), Some(Biome::PLAINS));
        assert_eq!(table.resolve(4).unwrap().name(), "minecraft:forest");
        assert!(table.resolve(999).is_none());
    }
}
