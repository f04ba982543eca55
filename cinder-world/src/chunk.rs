//! In-memory chunk columns.

use crate::biome::Biome;
use crate::block::Block;

pub const CHUNK_SIZE_X: usize = 16;
pub const CHUNK_SIZE_Z: usize = 16;
pub const SECTION_HEIGHT: usize = 16;
/// Bytes in one section light array (one nibble per block).
pub const LIGHT_BYTES: usize = CHUNK_SIZE_X * CHUNK_SIZE_Z * SECTION_HEIGHT / 2;

/// Biome cell of a block: one cell per 4x4x4 blocks, ordered Y -> Z -> X.
///
/// For a 256-block world this is `((y >> 2) & 63) << 4 | ((z >> 2) & 3) << 2 | ((x >> 2) & 3)`;
/// `y >> 2` never reaches `height / 4` so taller worlds need no mask.
#[inline]
pub fn biome_index(x: usize, y: usize, z: usize) -> usize {
    (y >> 2) << 4 | ((z >> 2) & 3) << 2 | ((x >> 2) & 3)
}

/// Number of biome cells in a chunk of the given height.
pub fn biome_cells(height: usize) -> usize {
    (CHUNK_SIZE_X / 4) * (height / 4) * (CHUNK_SIZE_Z / 4)
}

/// Light of one 16-block-high slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    sky_light: Box<[u8; LIGHT_BYTES]>,
    block_light: Box<[u8; LIGHT_BYTES]>,
}

impl Section {
    pub fn new() -> Self {
        Self {
            sky_light: Box::new([0; LIGHT_BYTES]),
            block_light: Box::new([0; LIGHT_BYTES]),
        }
    }

    pub fn sky_light(&self) -> &[u8; LIGHT_BYTES] {
        &self.sky_light
    }

    pub fn block_light(&self) -> &[u8; LIGHT_BYTES] {
        &self.block_light
    }

    pub fn set_sky_light(&mut self, light: &[u8; LIGHT_BYTES]) {
        self.sky_light.copy_from_slice(light);
    }

    pub fn set_block_light(&mut self, light: &[u8; LIGHT_BYTES]) {
        self.block_light.copy_from_slice(light);
    }
}

impl Default for Section {
    fn default() -> Self {
        Self::new()
    }
}

/// A full-height column of blocks.
///
/// Blocks are stored as indices into a per-chunk palette, so repeated
/// states share one `Block` value.
#[derive(Debug, Clone)]
pub struct Chunk {
    x: i32,
    z: i32,
    height: usize,
    palette: Vec<Block>,
    blocks: Vec<u32>,
    biomes: Vec<Biome>,
    sections: Vec<Section>,
}

impl Chunk {
    /// An all-air chunk whose biome grid is filled with `biome`.
    ///
    /// # Panics
    /// If `height` is not a positive multiple of 16.
    pub fn new(x: i32, z: i32, height: usize, biome: Biome) -> Self {
        assert!(
            height > 0 && height % SECTION_HEIGHT == 0,
            "chunk height {height} is not a positive multiple of {SECTION_HEIGHT}"
        );
        Self {
            x,
            z,
            height,
            palette: vec![Block::AIR],
            blocks: vec![0; CHUNK_SIZE_X * height * CHUNK_SIZE_Z],
            biomes: vec![biome; biome_cells(height)],
            sections: vec![Section::new(); height / SECTION_HEIGHT],
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, x: usize, y: usize, z: usize) -> bool {
        x < CHUNK_SIZE_X && y < self.height && z < CHUNK_SIZE_Z
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        assert!(self.in_bounds(x, y, z), "block ({x}, {y}, {z}) is outside the chunk");
        (y * CHUNK_SIZE_Z + z) * CHUNK_SIZE_X + x
    }

    pub fn block(&self, x: usize, y: usize, z: usize) -> &Block {
        &self.palette[self.blocks[self.index(x, y, z)] as usize]
    }

    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: Block) {
        let index = self.index(x, y, z);
        let palette_index = match self.palette.iter().position(|b| *b == block) {
            Some(i) => i,
            None => {
                self.palette.push(block);
                self.palette.len() - 1
            }
        };
        self.blocks[index] = palette_index as u32;
    }

    pub fn biomes(&self) -> &[Biome] {
        &self.biomes
    }

    pub fn biomes_mut(&mut self) -> &mut [Biome] {
        &mut self.biomes
    }

    /// Biome of the 4x4x4 cell containing a block.
    pub fn biome_at(&self, x: usize, y: usize, z: usize) -> &Biome {
        &self.biomes[biome_index(x, y, z)]
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn section_mut(&mut self, index: usize) -> Option<&mut Section> {
        self.sections.get_mut(index)
    }

    /// Distinct non-air blocks and how often they occur.
    pub fn block_counts(&self) -> Vec<(&Block, usize)> {
        let mut counts = vec![0usize; self.palette.len()];
        for &i in &self.blocks {
            counts[i as usize] += 1;
        }
        self.palette
            .iter()
            .zip(counts)
            .filter(|(block, n)| *n > 0 && !block.is_air())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biome_index_matches_masked_form() {
        for y in 0..256 {
            for z in 0..16 {
                for x in 0..16 {
                    let masked = ((y >> 2) & 63) << 4 | ((z >> 2) & 3) << 2 | ((x >> 2) & 3);
                    assert_eq!(biome_index(x, y, z), masked);
                }
            }
        }
        assert_eq!(biome_index(15, 255, 15), biome_cells(256) - 1);
    }

    #[test]
    fn test_biome_at_reads_the_enclosing_cell() {
        let mut chunk = Chunk::new(0, 0, 64, Biome::PLAINS);
        chunk.biomes_mut()[biome_index(12, 20, 4)] = Biome::DESERT;
        for (x, y, z) in [(12, 20, 4), (15, 23, 7), (12, 21, 5)] {
            assert_eq!(chunk.biome_at(x, y, z), &Biome::DESERT);
        }
        assert_eq!(chunk.biome_at(11, 20, 4), &Biome::PLAINS);
        assert_eq!(chunk.biome_at(12, 24, 4), &Biome::PLAINS);
    }

    #[test]
    fn test_new_chunk_is_air() {
        let chunk = Chunk::new(1, 2, 256, Biome::PLAINS);
        assert_eq!(chunk.sections().len(), 16);
        assert_eq!(chunk.biomes().len(), 1024);
        assert!(chunk.block(3, 100, 7).is_air());
    }

    #[test]
    fn test_set_block_shares_palette() {
        let mut chunk = Chunk::new(0, 0, 32, Biome::PLAINS);
        chunk.set_block(0, 0, 0, Block::new("minecraft:stone"));
        chunk.set_block(1, 0, 0, Block::new("minecraft:stone"));
        chunk.set_block(0, 31, 15, Block::new("minecraft:dirt"));
        assert_eq!(chunk.block(1, 0, 0).name(), "minecraft:stone");
        assert_eq!(chunk.block(0, 31, 15).name(), "minecraft:dirt");
        assert_eq!(chunk.palette.len(), 3);

        let counts = chunk.block_counts();
        assert_eq!(counts.len(), 2);
        assert!(counts.contains(&(&Block::new("minecraft:stone"), 2)));
    }

    #[test]
    #[should_panic]
    fn test_rejects_partial_sections() {
        Chunk::new(0, 0, 20, Biome::PLAINS);
    }

    #[test]
    fn test_section_light() {
        let mut chunk = Chunk::new(0, 0, 64, Biome::PLAINS);
        chunk.section_mut(2).unwrap().set_sky_light(&[0xFF; LIGHT_BYTES]);
        assert_eq!(chunk.section(2).unwrap().sky_light()[0], 0xFF);
        assert_eq!(chunk.section(1).unwrap().sky_light()[0], 0);
        assert!(chunk.section(4).is_none());
    }
}
