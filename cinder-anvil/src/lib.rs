//! Anvil region storage.
//!
//! This crate handles:
//! - Region files (sector allocation, location and timestamp tables)
//! - Chunk payload compression
//! - Chunk documents (NBT layout, paletted sections, light, tile entities)

pub mod compression;
pub mod document;
pub mod error;
pub mod nbt;
pub mod region;

pub use compression::CompressionType;
pub use document::{ChunkDocument, DocumentSection, GenerationStatus, LIGHT_BYTES, SECTION_SIZE};
pub use error::{RegionError, Result};
pub use nbt::{BlockState, Compound, DEFAULT_DATA_VERSION};
pub use region::{REGION_WIDTH, RegionFile, chunk_index, file_name, region_coord};
