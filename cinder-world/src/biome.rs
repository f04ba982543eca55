use std::borrow::Cow;

/// A biome, identified on disk by its numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Biome {
    id: i32,
    name: Cow<'static, str>,
}

impl Biome {
    pub const OCEAN: Biome = Biome::from_static(0, "minecraft:ocean");
    pub const PLAINS: Biome = Biome::from_static(1, "minecraft:plains");
    pub const DESERT: Biome = Biome::from_static(2, "minecraft:desert");
    pub const MOUNTAINS: Biome = Biome::from_static(3, "minecraft:mountains");
    pub const FOREST: Biome = Biome::from_static(4, "minecraft:forest");
    pub const TAIGA: Biome = Biome::from_static(5, "minecraft:taiga");
    pub const SWAMP: Biome = Biome::from_static(6, "minecraft:swamp");
    pub const RIVER: Biome = Biome::from_static(7, "minecraft:river");

    pub const fn from_static(id: i32, name: &'static str) -> Self {
        Self {
            id,
            name: Cow::Borrowed(name),
        }
    }

    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Cow::Owned(name.into()),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for Biome {
    fn default() -> Self {
        Biome::PLAINS
    }
}
