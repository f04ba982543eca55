//! Working form of a stored chunk.
//!
//! [`ChunkDocument`] is what the region file hands out and takes back. It
//! unpacks the paletted sections of the NBT layout into per-section index
//! arrays so single coordinates can be read and written directly, and packs
//! them again (with a compacted palette) on the way out.

use std::collections::BTreeMap;

use fastnbt::{ByteArray, IntArray, LongArray};

use crate::error::{RegionError, Result};
use crate::nbt::{BlockState, ChunkRoot, Compound, DEFAULT_DATA_VERSION, Level, Section};

/// Blocks per section side.
pub const SECTION_SIZE: usize = 16;
/// Blocks in one 16x16x16 section.
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;
/// Bytes in one nibble light array.
pub const LIGHT_BYTES: usize = SECTION_VOLUME / 2;
/// First data version (20w17a) whose packed indices never span two longs.
pub const PADDED_INDICES_VERSION: i32 = 2529;

/// How far world generation got for a chunk. Ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum GenerationStatus {
    #[default]
    Empty,
    StructureStarts,
    StructureReferences,
    Biomes,
    Noise,
    Surface,
    Carvers,
    LiquidCarvers,
    Features,
    Light,
    Spawn,
    Heightmaps,
    Full,
}

impl GenerationStatus {
    pub const ALL: [GenerationStatus; 13] = [
        GenerationStatus::Empty,
        GenerationStatus::StructureStarts,
        GenerationStatus::StructureReferences,
        GenerationStatus::Biomes,
        GenerationStatus::Noise,
        GenerationStatus::Surface,
        GenerationStatus::Carvers,
        GenerationStatus::LiquidCarvers,
        GenerationStatus::Features,
        GenerationStatus::Light,
        GenerationStatus::Spawn,
        GenerationStatus::Heightmaps,
        GenerationStatus::Full,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GenerationStatus::Empty => "empty",
            GenerationStatus::StructureStarts => "structure_starts",
            GenerationStatus::StructureReferences => "structure_references",
            GenerationStatus::Biomes => "biomes",
            GenerationStatus::Noise => "noise",
            GenerationStatus::Surface => "surface",
            GenerationStatus::Carvers => "carvers",
            GenerationStatus::LiquidCarvers => "liquid_carvers",
            GenerationStatus::Features => "features",
            GenerationStatus::Light => "light",
            GenerationStatus::Spawn => "spawn",
            GenerationStatus::Heightmaps => "heightmaps",
            GenerationStatus::Full => "full",
        }
    }

    /// Parse a stored status, with or without the `minecraft:` namespace.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("minecraft:").unwrap_or(name);
        Self::ALL.into_iter().find(|status| status.name() == name)
    }
}

/// One 16-block-high slice of a stored chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSection {
    palette: Vec<BlockState>,
    // Empty when the section carries no block data (light-only).
    indices: Vec<u16>,
    sky_light: Option<Vec<u8>>,
    block_light: Option<Vec<u8>>,
}

impl DocumentSection {
    fn has_blocks(&self) -> bool {
        !self.palette.is_empty() && self.indices.len() == SECTION_VOLUME
    }

    fn ensure_blocks(&mut self) {
        if !self.has_blocks() {
            self.palette = vec![BlockState::air()];
            self.indices = vec![0; SECTION_VOLUME];
        }
    }

    pub fn sky_light(&self) -> Option<&[u8]> {
        self.sky_light.as_deref()
    }

    pub fn block_light(&self) -> Option<&[u8]> {
        self.block_light.as_deref()
    }

    /// Palette with unused entries dropped, ordered by first use.
    fn compacted(&self) -> (Vec<BlockState>, Vec<u16>) {
        let mut remap: Vec<Option<u16>> = vec![None; self.palette.len()];
        let mut palette = Vec::new();
        let mut indices = Vec::with_capacity(self.indices.len());
        for &old in &self.indices {
            let slot = &mut remap[old as usize];
            let new = *slot.get_or_insert_with(|| {
                palette.push(self.palette[old as usize].clone());
                (palette.len() - 1) as u16
            });
            indices.push(new);
        }
        (palette, indices)
    }
}

/// Stored representation of one chunk, owned by the caller for one load or
/// save.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDocument {
    x: i32,
    z: i32,
    data_version: i32,
    status: GenerationStatus,
    last_update: i64,
    inhabited_time: i64,
    biomes: Vec<i32>,
    sections: BTreeMap<i8, DocumentSection>,
    tile_entities: Vec<Compound>,
}

impl ChunkDocument {
    /// A blank document, as handed out for a chunk that was never saved.
    pub fn new(x: i32, z: i32) -> Self {
        Self {
            x,
            z,
            data_version: DEFAULT_DATA_VERSION,
            status: GenerationStatus::Empty,
            last_update: 0,
            inhabited_time: 0,
            biomes: Vec::new(),
            sections: BTreeMap::new(),
            tile_entities: Vec::new(),
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    pub fn data_version(&self) -> i32 {
        self.data_version
    }

    pub fn set_data_version(&mut self, version: i32) {
        self.data_version = version;
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn set_status(&mut self, status: GenerationStatus) {
        self.status = status;
    }

    pub fn last_update(&self) -> i64 {
        self.last_update
    }

    /// Block state at chunk-local coordinates, `None` when the section holds
    /// no block data.
    pub fn block_state(&self, x: usize, y: usize, z: usize) -> Option<&BlockState> {
        let section = self.sections.get(&section_y(y)?)?;
        if !section.has_blocks() {
            return None;
        }
        let index = *section.indices.get(block_index(x, y, z))?;
        section.palette.get(index as usize)
    }

    /// Store a block state. Only allocates when the state is new to the
    /// section palette.
    pub fn set_block_state(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        name: &str,
        properties: &BTreeMap<String, String>,
    ) {
        let Some(sy) = section_y(y) else {
            return;
        };
        let section = self.sections.entry(sy).or_default();
        section.ensure_blocks();
        let palette_index = match section.palette.iter().position(|s| s.matches(name, properties)) {
            Some(i) => i,
            None => {
                section.palette.push(BlockState {
                    name: name.to_string(),
                    properties: properties.clone(),
                });
                section.palette.len() - 1
            }
        };
        section.indices[block_index(x, y, z)] = palette_index as u16;
    }

    pub fn biomes(&self) -> &[i32] {
        &self.biomes
    }

    /// Store a biome id, growing the array with zeros when needed.
    pub fn set_biome(&mut self, index: usize, id: i32) {
        if index >= self.biomes.len() {
            self.biomes.resize(index + 1, 0);
        }
        self.biomes[index] = id;
    }

    pub fn set_biomes(&mut self, biomes: Vec<i32>) {
        self.biomes = biomes;
    }

    pub fn tile_entities(&self) -> &[Compound] {
        &self.tile_entities
    }

    pub fn set_tile_entities(&mut self, tile_entities: Vec<Compound>) {
        self.tile_entities = tile_entities;
    }

    /// Sections present in the document, bottom to top.
    pub fn sections(&self) -> impl Iterator<Item = (i8, &DocumentSection)> + '_ {
        self.sections.iter().map(|(y, section)| (*y, section))
    }

    pub fn section(&self, y: i8) -> Option<&DocumentSection> {
        self.sections.get(&y)
    }

    pub fn set_light(&mut self, section_y: i8, sky_light: &[u8], block_light: &[u8]) {
        let section = self.sections.entry(section_y).or_default();
        section.sky_light = Some(sky_light.to_vec());
        section.block_light = Some(block_light.to_vec());
    }

    /// Parse uncompressed chunk NBT.
    pub fn from_nbt(bytes: &[u8]) -> Result<Self> {
        let root: ChunkRoot = fastnbt::from_bytes(bytes)?;
        let level = root.level;
        let (x, z) = (level.x_pos, level.z_pos);

        let status = match level.status.as_deref() {
            Some(name) => GenerationStatus::from_name(name).unwrap_or_else(|| {
                log::warn!("Chunk ({x}, {z}) has unknown status {name:?}, reading it as empty");
                GenerationStatus::Empty
            }),
            None => GenerationStatus::Empty,
        };

        let mut sections = BTreeMap::new();
        for section in level.sections {
            let decoded = read_section(&section, root.data_version, x, z)?;
            sections.insert(section.y, decoded);
        }

        Ok(Self {
            x,
            z,
            data_version: root.data_version,
            status,
            last_update: level.last_update,
            inhabited_time: level.inhabited_time,
            biomes: level.biomes.map(|b| b.iter().copied().collect()).unwrap_or_default(),
            sections,
            tile_entities: level.tile_entities,
        })
    }

    /// Serialize to uncompressed chunk NBT.
    pub fn to_nbt(&self) -> Result<Vec<u8>> {
        let sections = self
            .sections
            .iter()
            .map(|(y, section)| write_section(*y, section, self.data_version))
            .collect();

        let root = ChunkRoot {
            data_version: self.data_version,
            level: Level {
                x_pos: self.x,
                z_pos: self.z,
                last_update: self.last_update,
                inhabited_time: self.inhabited_time,
                status: Some(self.status.name().to_string()),
                biomes: (!self.biomes.is_empty()).then(|| IntArray::new(self.biomes.clone())),
                sections,
                tile_entities: self.tile_entities.clone(),
            },
        };
        Ok(fastnbt::to_bytes(&root)?)
    }
}

fn section_y(y: usize) -> Option<i8> {
    i8::try_from(y / SECTION_SIZE).ok()
}

// Standard Order: Y lines of X columns (Y -> Z -> X) => Index = (y*16 + z)*16 + x
fn block_index(x: usize, y: usize, z: usize) -> usize {
    ((y % SECTION_SIZE) * SECTION_SIZE + z) * SECTION_SIZE + x
}

/// Bits per palette index: ceil(log2(palette_len)), min 4.
fn bits_per_block(palette_len: usize) -> u32 {
    let needed = usize::BITS - (palette_len.max(2) - 1).leading_zeros();
    needed.max(4)
}

/// Unpack indices. Entries never span two longs.
pub fn unpack_indices(packed: &[i64], palette_len: usize) -> Vec<u16> {
    let bits = bits_per_block(palette_len);
    let per_long = (64 / bits) as usize;
    let mask = (1u64 << bits) - 1;

    let mut result = Vec::with_capacity(SECTION_VOLUME);
    for &long in packed {
        let long = long as u64;
        for j in 0..per_long {
            if result.len() == SECTION_VOLUME {
                break;
            }
            result.push(((long >> (j as u32 * bits)) & mask) as u16);
        }
    }
    result.resize(SECTION_VOLUME, 0);
    result
}

/// Unpack indices stored before 20w17a, where entries run on across long
/// boundaries.
pub fn unpack_spanning_indices(packed: &[i64], palette_len: usize) -> Vec<u16> {
    let bits = bits_per_block(palette_len) as usize;
    let mask = (1u64 << bits) - 1;
    let word = |i: usize| packed.get(i).map_or(0, |w| *w as u64);

    (0..SECTION_VOLUME)
        .map(|i| {
            let bit = i * bits;
            let (long, offset) = (bit / 64, bit % 64);
            let mut value = word(long) >> offset;
            if offset + bits > 64 {
                value |= word(long + 1) << (64 - offset);
            }
            (value & mask) as u16
        })
        .collect()
}

/// Pack indices the pre-20w17a way, entries running on across longs.
pub fn pack_spanning_indices(indices: &[u16], palette_len: usize) -> Vec<i64> {
    let bits = bits_per_block(palette_len) as usize;
    let mask = (1u64 << bits) - 1;

    let mut packed = vec![0u64; (indices.len() * bits).div_ceil(64)];
    for (i, &index) in indices.iter().enumerate() {
        let value = index as u64 & mask;
        let bit = i * bits;
        let (long, offset) = (bit / 64, bit % 64);
        packed[long] |= value << offset;
        if offset + bits > 64 {
            packed[long + 1] |= value >> (64 - offset);
        }
    }
    packed.into_iter().map(|w| w as i64).collect()
}

/// Pack indices. Entries never span two longs.
pub fn pack_indices(indices: &[u16], palette_len: usize) -> Vec<i64> {
    let bits = bits_per_block(palette_len);
    let per_long = (64 / bits) as usize;
    let mask = (1u64 << bits) - 1;

    let mut packed = vec![0i64; indices.len().div_ceil(per_long)];
    for (i, &index) in indices.iter().enumerate() {
        let offset = (i % per_long) as u32 * bits;
        // We need to treat i64 as u64 for bitwise ops, then cast back
        let current = packed[i / per_long] as u64;
        packed[i / per_long] = (current | ((index as u64 & mask) << offset)) as i64;
    }
    packed
}

fn read_light(array: &Option<ByteArray>, what: &str, y: i8, x: i32, z: i32) -> Option<Vec<u8>> {
    let array = array.as_ref()?;
    if array.len() != LIGHT_BYTES {
        log::warn!(
            "Chunk ({x}, {z}) section {y} has {} {what} bytes, expected {LIGHT_BYTES}; ignoring it",
            array.len()
        );
        return None;
    }
    Some(array.iter().map(|b| *b as u8).collect())
}

fn read_section(section: &Section, data_version: i32, x: i32, z: i32) -> Result<DocumentSection> {
    let palette = section.palette.clone().unwrap_or_default();
    let indices = match (&section.block_states, palette.len()) {
        (_, 0) => Vec::new(),
        (_, 1) => vec![0; SECTION_VOLUME],
        (Some(data), len) => {
            let indices = if data_version < PADDED_INDICES_VERSION {
                unpack_spanning_indices(data, len)
            } else {
                unpack_indices(data, len)
            };
            if let Some(bad) = indices.iter().find(|i| **i as usize >= len) {
                return Err(RegionError::Corrupt {
                    x,
                    z,
                    reason: format!("section {} references palette entry {bad} of {len}", section.y),
                });
            }
            indices
        }
        (None, _) => {
            return Err(RegionError::Corrupt {
                x,
                z,
                reason: format!("section {} has a palette but no block states", section.y),
            });
        }
    };

    Ok(DocumentSection {
        palette,
        indices,
        sky_light: read_light(&section.sky_light, "sky light", section.y, x, z),
        block_light: read_light(&section.block_light, "block light", section.y, x, z),
    })
}

fn write_section(y: i8, section: &DocumentSection, data_version: i32) -> Section {
    let light = |bytes: &Option<Vec<u8>>| {
        bytes
            .as_ref()
            .map(|b| ByteArray::new(b.iter().map(|v| *v as i8).collect()))
    };

    let (palette, block_states) = if section.has_blocks() {
        let (palette, indices) = section.compacted();
        let data = (palette.len() > 1).then(|| {
            LongArray::new(if data_version < PADDED_INDICES_VERSION {
                pack_spanning_indices(&indices, palette.len())
            } else {
                pack_indices(&indices, palette.len())
            })
        });
        (Some(palette), data)
    } else {
        (None, None)
    };

    Section {
        y,
        palette,
        block_states,
        sky_light: light(&section.sky_light),
        block_light: light(&section.block_light),
    }
}
