//! Loads and saves chunks from an Anvil world directory.
//!
//! ```no_run
//! use cinder_loader::ChunkLoader;
//!
//! let loader = ChunkLoader::new("world");
//! let found = loader.load_chunk(0, 0, |chunk| {
//!     println!("loaded {} sections", chunk.sections().len());
//! });
//! if !found {
//!     // generate it instead
//! }
//! ```

pub mod cache;
pub mod config;
mod decode;
pub mod diagnostics;
mod encode;
pub mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use cinder_anvil::region_coord;
use cinder_benchmark::BenchmarkMetrics;
use cinder_world::{BiomeRegistry, BiomeTable, BlockHandlerRegistry, BlockRegistry, BlockTable, Chunk, HandlerTable};

pub use cache::RegionCache;
pub use config::LoaderConfig;
pub use decode::RESERVED_TAGS;
pub use diagnostics::{DiagnosticSink, LogSink, MemorySink, Recovered, TileEntityProblem};
pub use error::LoaderError;

use decode::Decoder;
use diagnostics::Reporter;

/// Lookups used while decoding.
#[derive(Clone)]
pub struct Registries {
    pub blocks: Arc<dyn BlockRegistry>,
    pub handlers: Arc<dyn BlockHandlerRegistry>,
    pub biomes: Arc<dyn BiomeRegistry>,
}

impl Registries {
    /// Only the built-in vanilla tables. Anything else is reported and
    /// skipped on load.
    pub fn strict() -> Self {
        Self {
            blocks: Arc::new(BlockTable::vanilla()),
            handlers: Arc::new(HandlerTable::vanilla()),
            biomes: Arc::new(BiomeTable::vanilla()),
        }
    }
}

impl Default for Registries {
    /// Resolves any well-formed block name or handler id, so a world loads
    /// and saves back intact whatever blocks it holds.
    fn default() -> Self {
        Self {
            blocks: Arc::new(BlockTable::vanilla().permissive()),
            handlers: Arc::new(HandlerTable::vanilla().permissive()),
            biomes: Arc::new(BiomeTable::vanilla()),
        }
    }
}

pub struct ChunkLoader {
    root: PathBuf,
    config: LoaderConfig,
    registries: Registries,
    regions: RegionCache,
    diagnostics: Arc<dyn DiagnosticSink>,
    metrics: Arc<BenchmarkMetrics>,
}

impl ChunkLoader {
    /// Loader over `root` with the default configuration and registries.
    /// Region files live in `root/region`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let config = LoaderConfig::default();
        let metrics = Arc::new(BenchmarkMetrics::new(config.summary()));
        Self {
            regions: RegionCache::new(root.join("region"), metrics.clone()),
            root,
            config,
            registries: Registries::default(),
            diagnostics: Arc::new(LogSink),
            metrics,
        }
    }

    pub fn with_config(
        root: impl Into<PathBuf>,
        config: LoaderConfig,
        registries: Registries,
    ) -> Result<Self, LoaderError> {
        config.validate()?;
        let root = root.into();
        let metrics = Arc::new(BenchmarkMetrics::new(config.summary()));
        Ok(Self {
            regions: RegionCache::new(root.join("region"), metrics.clone()),
            root,
            config,
            registries,
            diagnostics: Arc::new(LogSink),
            metrics,
        })
    }

    /// Send recoverable decode problems somewhere other than the log.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn regions(&self) -> &RegionCache {
        &self.regions
    }

    pub fn metrics(&self) -> &Arc<BenchmarkMetrics> {
        &self.metrics
    }

    /// Load a chunk and hand it to `on_loaded`.
    ///
    /// Returns `false` without calling `on_loaded` when the chunk is not
    /// stored or cannot be read; the caller should generate it instead.
    pub fn load_chunk(&self, chunk_x: i32, chunk_z: i32, on_loaded: impl FnOnce(Chunk)) -> bool {
        match self.load_inner(chunk_x, chunk_z, on_loaded) {
            Ok(()) => true,
            Err(e) if e.is_not_found() => {
                self.metrics.record_missing();
                false
            }
            Err(e) => {
                log::error!("Failed to load chunk {chunk_x}, {chunk_z}: {e}");
                self.metrics.record_load_failure();
                false
            }
        }
    }

    /// Like [`load_chunk`](Self::load_chunk), but returns the chunk and
    /// keeps the reason it could not be loaded.
    pub fn try_load_chunk(&self, chunk_x: i32, chunk_z: i32) -> Result<Chunk, LoaderError> {
        let mut loaded = None;
        self.load_inner(chunk_x, chunk_z, |chunk| loaded = Some(chunk))?;
        loaded.ok_or(LoaderError::DocumentMissing { x: chunk_x, z: chunk_z })
    }

    fn load_inner(&self, chunk_x: i32, chunk_z: i32, on_loaded: impl FnOnce(Chunk)) -> Result<(), LoaderError> {
        if !self.root.is_dir() {
            return Err(LoaderError::StorageUnavailable(self.root.clone()));
        }
        let start = Instant::now();
        let region = self
            .regions
            .open(region_coord(chunk_x), region_coord(chunk_z))?
            .ok_or(LoaderError::DocumentMissing { x: chunk_x, z: chunk_z })?;

        log::debug!("Attempt loading at {chunk_x} {chunk_z}");
        let document = region
            .get_document(chunk_x, chunk_z)
            .map_err(|source| LoaderError::DocumentCorrupt {
                x: chunk_x,
                z: chunk_z,
                source,
            })?
            .ok_or(LoaderError::DocumentMissing { x: chunk_x, z: chunk_z })?;

        let decoder = Decoder {
            registries: &self.registries,
            default_biome: &self.config.default_biome,
            height: self.config.world_height,
            reporter: Reporter {
                sink: self.diagnostics.as_ref(),
                metrics: &self.metrics,
                chunk_x,
                chunk_z,
            },
        };
        let chunk = decoder.decode(&document);
        self.metrics.record_load(start.elapsed());

        on_loaded(chunk);
        region.release_document(document);
        Ok(())
    }

    /// Save a chunk, calling `on_saved` once the write has reached the
    /// region file. Failures are logged and `on_saved` is not called.
    pub fn save_chunk(&self, chunk: &Chunk, on_saved: impl FnOnce()) {
        match self.try_save_chunk(chunk) {
            Ok(()) => on_saved(),
            Err(e) => {
                log::error!("Failed to save chunk {}, {}: {e}", chunk.x(), chunk.z());
                self.metrics.record_save_failure();
            }
        }
    }

    pub fn try_save_chunk(&self, chunk: &Chunk) -> Result<(), LoaderError> {
        let (chunk_x, chunk_z) = (chunk.x(), chunk.z());
        if chunk.height() != self.config.world_height {
            log::warn!(
                "Chunk {chunk_x}, {chunk_z} is {} blocks high, loader is configured for {}",
                chunk.height(),
                self.config.world_height
            );
        }
        let start = Instant::now();
        let region = self.regions.get_or_create(region_coord(chunk_x), region_coord(chunk_z))?;

        let mut document = region
            .get_or_create_document(chunk_x, chunk_z)
            .map_err(|source| LoaderError::DocumentCorrupt {
                x: chunk_x,
                z: chunk_z,
                source,
            })?;
        encode::encode(chunk, &mut document, self.config.data_version);

        log::debug!("Attempt saving at {chunk_x} {chunk_z}");
        region.write_document(&document).map_err(|source| LoaderError::Write {
            x: chunk_x,
            z: chunk_z,
            source,
        })?;
        region.release_document(document);
        self.metrics.record_save(start.elapsed());
        Ok(())
    }
}

impl std::fmt::Debug for ChunkLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkLoader")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("regions", &self.regions)
            .finish()
    }
}
