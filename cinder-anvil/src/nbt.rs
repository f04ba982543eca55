//! NBT (Named Binary Tag) structures for stored chunk data.
//!
//! These structures are (de)serialized with fastnbt and follow the
//! `Level`-rooted chunk layout: one flat biome array per chunk, paletted
//! sections carrying their own light arrays, and a tile entity list.

use std::collections::BTreeMap;

use fastnbt::{ByteArray, IntArray, LongArray, Value};
use serde::{Deserialize, Serialize};

/// Arbitrary tagged data, kept sorted so it always serializes the same way.
pub type Compound = BTreeMap<String, Value>;

/// Data version written by default (1.16.5).
/// Can be overridden by the loader configuration.
pub const DEFAULT_DATA_VERSION: i32 = 2586;

/// Root of the NBT hierarchy of one chunk.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkRoot {
    #[serde(rename = "DataVersion", default)]
    pub data_version: i32,

    #[serde(rename = "Level")]
    pub level: Level,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Level {
    // Chunk coordinates (absolute, not relative to region)
    #[serde(rename = "xPos")]
    pub x_pos: i32,
    #[serde(rename = "zPos")]
    pub z_pos: i32,

    #[serde(rename = "LastUpdate", default)]
    pub last_update: i64,

    #[serde(rename = "InhabitedTime", default)]
    pub inhabited_time: i64,

    // "full" tells the server the chunk is fully generated.
    #[serde(rename = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    // One biome id per 4x4x4 cell.
    #[serde(rename = "Biomes", default, skip_serializing_if = "Option::is_none")]
    pub biomes: Option<IntArray>,

    // Vertical slices of the chunk (16 blocks high each)
    #[serde(rename = "Sections", alias = "sections", default)]
    pub sections: Vec<Section>,

    #[serde(rename = "TileEntities", alias = "block_entities", default)]
    pub tile_entities: Vec<Compound>,
}

// --- Section (16x16x16 Cube) ---
#[derive(Debug, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "Y")]
    pub y: i8,

    // Light-only sections (below and above the world) have no palette.
    #[serde(rename = "Palette", default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<BlockState>>,

    // Indices into the palette. Omitted when the palette has a single entry.
    #[serde(rename = "BlockStates", default, skip_serializing_if = "Option::is_none")]
    pub block_states: Option<LongArray>,

    #[serde(rename = "SkyLight", default, skip_serializing_if = "Option::is_none")]
    pub sky_light: Option<ByteArray>,

    #[serde(rename = "BlockLight", default, skip_serializing_if = "Option::is_none")]
    pub block_light: Option<ByteArray>,
}

// --- Single Block ---
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Properties", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub const AIR: &'static str = "minecraft:air";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn air() -> Self {
        Self::new(Self::AIR)
    }

    pub fn matches(&self, name: &str, properties: &BTreeMap<String, String>) -> bool {
        self.name == name && &self.properties == properties
    }
}
