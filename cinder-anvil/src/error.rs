use std::io;

use thiserror::Error;

/// Errors raised by the region container and the chunk document codec.
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("region i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("nbt codec failed: {0}")]
    Nbt(#[from] fastnbt::error::Error),

    #[error("unsupported compression type {0}")]
    UnsupportedCompression(u8),

    #[error("region header is truncated ({0} bytes)")]
    TruncatedHeader(u64),

    #[error("chunk ({x}, {z}) is malformed: {reason}")]
    Corrupt { x: i32, z: i32, reason: String },

    #[error("chunk ({x}, {z}) needs {sectors} sectors, more than a region entry can address")]
    ChunkTooLarge { x: i32, z: i32, sectors: usize },

    #[error("chunk ({x}, {z}) does not belong to region ({region_x}, {region_z})")]
    ForeignChunk {
        x: i32,
        z: i32,
        region_x: i32,
        region_z: i32,
    },
}

impl RegionError {
    /// True when the error only says the region file is not there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegionError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, RegionError>;
