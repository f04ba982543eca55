use std::path::PathBuf;

use cinder_anvil::RegionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("world directory {} does not exist", .0.display())]
    StorageUnavailable(PathBuf),

    #[error("failed to open region {}: {source}", path.display())]
    RegionOpen { path: PathBuf, source: RegionError },

    #[error("chunk ({x}, {z}) has never been saved")]
    DocumentMissing { x: i32, z: i32 },

    #[error("failed to read chunk ({x}, {z}): {source}")]
    DocumentCorrupt { x: i32, z: i32, source: RegionError },

    #[error("failed to write chunk ({x}, {z}): {source}")]
    Write { x: i32, z: i32, source: RegionError },

    #[error("invalid loader configuration: {0}")]
    InvalidConfig(String),
}

impl LoaderError {
    /// Errors that only mean "generate this chunk instead".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LoaderError::StorageUnavailable(_) | LoaderError::DocumentMissing { .. }
        )
    }
}
