//! Open region files, at most one per region.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cinder_anvil::{RegionError, RegionFile, file_name};
use cinder_benchmark::BenchmarkMetrics;
use parking_lot::RwLock;

use crate::error::LoaderError;

/// Region handles keyed by file name.
///
/// Handles live as long as the cache. Lookups share a read lock; opening
/// or creating a region takes the write lock and checks again, so
/// concurrent first accesses to a region end up with the same handle.
pub struct RegionCache {
    region_dir: PathBuf,
    handles: RwLock<HashMap<String, Arc<RegionFile>>>,
    metrics: Arc<BenchmarkMetrics>,
}

impl RegionCache {
    pub fn new(region_dir: impl Into<PathBuf>, metrics: Arc<BenchmarkMetrics>) -> Self {
        Self {
            region_dir: region_dir.into(),
            handles: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    pub fn region_dir(&self) -> &Path {
        &self.region_dir
    }

    /// Handle of an existing region. `None` if the region file does not
    /// exist or cannot be opened; nothing is created either way.
    pub fn get_or_open(&self, region_x: i32, region_z: i32) -> Option<Arc<RegionFile>> {
        match self.open(region_x, region_z) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("{e}");
                None
            }
        }
    }

    pub(crate) fn open(&self, region_x: i32, region_z: i32) -> Result<Option<Arc<RegionFile>>, LoaderError> {
        let name = file_name(region_x, region_z);
        if let Some(handle) = self.cached(&name) {
            return Ok(Some(handle));
        }

        let mut handles = self.handles.write();
        if let Some(handle) = handles.get(&name) {
            return Ok(Some(handle.clone()));
        }
        let path = self.region_dir.join(&name);
        let region = match RegionFile::open(&path, region_x, region_z) {
            Ok(region) => region,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(source) => return Err(LoaderError::RegionOpen { path, source }),
        };
        self.metrics.record_region_opened();
        let handle = Arc::new(region);
        handles.insert(name, handle.clone());
        Ok(Some(handle))
    }

    /// Handle of a region, creating the file and its directories first if
    /// needed. Only one caller ever creates a given region.
    pub fn get_or_create(&self, region_x: i32, region_z: i32) -> Result<Arc<RegionFile>, LoaderError> {
        let name = file_name(region_x, region_z);
        if let Some(handle) = self.cached(&name) {
            return Ok(handle);
        }

        let mut handles = self.handles.write();
        if let Some(handle) = handles.get(&name) {
            return Ok(handle.clone());
        }
        let path = self.region_dir.join(&name);
        let existed = path.exists();
        let region = RegionFile::create(&path, region_x, region_z).map_err(|source: RegionError| {
            LoaderError::RegionOpen {
                path: path.clone(),
                source,
            }
        })?;
        if existed {
            self.metrics.record_region_opened();
        } else {
            log::info!("Created region {}", path.display());
            self.metrics.record_region_created();
        }
        let handle = Arc::new(region);
        handles.insert(name, handle.clone());
        Ok(handle)
    }

    fn cached(&self, name: &str) -> Option<Arc<RegionFile>> {
        let handle = self.handles.read().get(name).cloned();
        match &handle {
            Some(_) => self.metrics.record_cache_hit(),
            None => self.metrics.record_cache_miss(),
        }
        handle
    }

    pub fn contains(&self, region_x: i32, region_z: i32) -> bool {
        self.handles.read().contains_key(&file_name(region_x, region_z))
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }
}

impl std::fmt::Debug for RegionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionCache")
            .field("region_dir", &self.region_dir)
            .field("handles", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(dir: &Path) -> RegionCache {
        RegionCache::new(dir.join("region"), Arc::new(BenchmarkMetrics::default()))
    }

    #[test]
    fn test_open_missing_region_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        assert!(cache.get_or_open(0, 0).is_none());
        assert!(cache.is_empty());
        assert!(!dir.path().join("region").exists());
    }

    #[test]
    fn test_create_then_open_shares_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let created = cache.get_or_create(-1, 2).unwrap();
        assert!(dir.path().join("region/r.-1.2.mca").exists());

        let opened = cache.get_or_open(-1, 2).unwrap();
        assert!(Arc::ptr_eq(&created, &opened));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.metrics.regions_created(), 1);
    }

    #[test]
    fn test_existing_file_is_opened_not_created() {
        let dir = tempfile::tempdir().unwrap();
        RegionFile::create(dir.path().join("region/r.0.0.mca"), 0, 0).unwrap();

        let cache = cache(dir.path());
        assert!(cache.get_or_open(0, 0).is_some());
        assert_eq!(cache.metrics.regions_opened(), 1);
        assert_eq!(cache.metrics.regions_created(), 0);
    }

    #[test]
    fn test_broken_region_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("region")).unwrap();
        std::fs::write(dir.path().join("region/r.0.0.mca"), [0u8; 100]).unwrap();

        let cache = cache(dir.path());
        assert!(cache.get_or_open(0, 0).is_none());
        assert!(matches!(cache.open(0, 0), Err(LoaderError::RegionOpen { .. })));
        assert!(cache.get_or_create(0, 0).is_err());
        assert!(cache.is_empty());
    }
}
