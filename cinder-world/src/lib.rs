//! In-memory world model: chunks, blocks, biomes and the registries that
//! resolve their stored names.

pub mod biome;
pub mod block;
pub mod chunk;
pub mod registry;

pub use biome::Biome;
pub use block::{Block, BlockHandler, Compound, NamedHandler};
pub use chunk::{CHUNK_SIZE_X, CHUNK_SIZE_Z, Chunk, LIGHT_BYTES, SECTION_HEIGHT, Section, biome_cells, biome_index};
pub use registry::{BiomeRegistry, BiomeTable, BlockHandlerRegistry, BlockRegistry, BlockTable, HandlerTable};
