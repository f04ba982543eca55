//! Region files: 32x32 chunks stored in one sector-addressed file.

mod header;

pub use header::{Header, Location};

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::compression::CompressionType;
use crate::document::ChunkDocument;
use crate::error::{RegionError, Result};

pub const SECTOR_BYTES: u64 = 4096; // minecraft uses 4096 bytes per sector
pub const HEADER_BYTES: u64 = 8192; // header is 8192 bytes (2 sectors 8kb)

/// Chunks per region side.
pub const REGION_WIDTH: i32 = 32;
pub const CHUNKS_PER_REGION: usize = (REGION_WIDTH * REGION_WIDTH) as usize;

// A location entry stores the sector count in one byte.
const MAX_SECTORS_PER_CHUNK: usize = u8::MAX as usize;
// length (4 bytes) + compression type (1 byte)
const CHUNK_HEADER_BYTES: usize = 5;

/// Region coordinate containing a chunk coordinate (floor division).
pub fn region_coord(chunk: i32) -> i32 {
    chunk.div_euclid(REGION_WIDTH)
}

/// Deterministic file name of a region.
pub fn file_name(region_x: i32, region_z: i32) -> String {
    format!("r.{region_x}.{region_z}.mca")
}

/// Index of a chunk inside its region. Formula: x + z * 32
pub fn chunk_index(chunk_x: i32, chunk_z: i32) -> usize {
    ((chunk_x & 31) + (chunk_z & 31) * 32) as usize
}

struct RegionInner {
    file: File,
    header: Header,
    // One flag per sector of the file; the two header sectors are always taken.
    used: Vec<bool>,
}

impl RegionInner {
    fn mark(&mut self, sectors: std::ops::Range<usize>, value: bool) {
        if sectors.end > self.used.len() {
            self.used.resize(sectors.end, false);
        }
        for sector in sectors {
            self.used[sector] = value;
        }
    }

    /// First run of `count` free sectors, possibly past the end of the file.
    fn allocate(&self, count: usize) -> usize {
        let mut run_start = 0;
        let mut run_len = 0;
        for (sector, used) in self.used.iter().enumerate() {
            if *used {
                run_len = 0;
                run_start = sector + 1;
            } else {
                run_len += 1;
                if run_len == count {
                    return run_start;
                }
            }
        }
        run_start
    }

    fn read_payload(&mut self, location: Location) -> std::io::Result<Vec<u8>> {
        let mut payload = vec![0u8; location.count as usize * SECTOR_BYTES as usize];
        self.file.seek(SeekFrom::Start(location.byte_offset()))?;
        self.file.read_exact(&mut payload)?;
        Ok(payload)
    }
}

/// An open region file.
///
/// All physical access goes through an internal mutex, so a shared
/// `RegionFile` can serve reads and writes for different chunks from many
/// threads. Compression and NBT work happen outside the lock.
pub struct RegionFile {
    path: PathBuf,
    region_x: i32,
    region_z: i32,
    inner: Mutex<RegionInner>,
}

impl RegionFile {
    /// Open an existing region file. Fails with a `NotFound` i/o error when
    /// the file is absent.
    pub fn open(path: impl AsRef<Path>, region_x: i32, region_z: i32) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::from_file(path, file, region_x, region_z)
    }

    /// Create the region file (and its parent directories) if absent, then
    /// open it.
    pub fn create(path: impl AsRef<Path>, region_x: i32, region_z: i32) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::from_file(path, file, region_x, region_z)
    }

    fn from_file(path: &Path, mut file: File, region_x: i32, region_z: i32) -> Result<Self> {
        let len = file.metadata()?.len();
        let header = if len == 0 {
            // Freshly created: lay down an empty header.
            let header = Header::empty();
            file.write_all(&header.to_bytes())?;
            header
        } else if len < HEADER_BYTES {
            return Err(RegionError::TruncatedHeader(len));
        } else {
            let mut bytes = vec![0u8; HEADER_BYTES as usize];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut bytes)?;
            Header::parse(&bytes)
        };

        let total_sectors = len.max(HEADER_BYTES).div_ceil(SECTOR_BYTES) as usize;
        let mut inner = RegionInner {
            file,
            header,
            used: vec![false; total_sectors],
        };
        inner.mark(0..2, true);
        let entries: Vec<_> = inner.header.locations().filter(|(_, l)| !l.is_empty()).collect();
        // Bad entries are dropped from the in-memory table so a later write
        // of that chunk never frees sectors it does not own.
        for (index, location) in entries {
            let problem = if location.sectors().end > total_sectors || location.sector < 2 {
                "outside the file"
            } else if location.sectors().any(|sector| inner.used[sector]) {
                "already used by another chunk"
            } else {
                inner.mark(location.sectors(), true);
                continue;
            };
            log::warn!(
                "Region {} entry {index} points at sectors {:?} {problem}; ignoring it",
                path.display(),
                location.sectors()
            );
            inner.header.set(index, Location::default(), 0);
        }

        log::debug!("Opened region {} ({} sectors)", path.display(), total_sectors);
        Ok(Self {
            path: path.to_path_buf(),
            region_x,
            region_z,
            inner: Mutex::new(inner),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn region_x(&self) -> i32 {
        self.region_x
    }

    pub fn region_z(&self) -> i32 {
        self.region_z
    }

    fn check_owned(&self, chunk_x: i32, chunk_z: i32) -> Result<()> {
        if region_coord(chunk_x) != self.region_x || region_coord(chunk_z) != self.region_z {
            return Err(RegionError::ForeignChunk {
                x: chunk_x,
                z: chunk_z,
                region_x: self.region_x,
                region_z: self.region_z,
            });
        }
        Ok(())
    }

    /// Whether the region holds data for a chunk.
    pub fn has_chunk(&self, chunk_x: i32, chunk_z: i32) -> bool {
        let index = chunk_index(chunk_x, chunk_z);
        !self.inner.lock().header.location(index).is_empty()
    }

    /// Last save time of a chunk, in seconds since the epoch (0 if never).
    pub fn timestamp(&self, chunk_x: i32, chunk_z: i32) -> u32 {
        self.inner.lock().header.timestamp(chunk_index(chunk_x, chunk_z))
    }

    /// Uncompressed NBT of a chunk, `None` if the chunk was never stored.
    pub fn read_raw(&self, chunk_x: i32, chunk_z: i32) -> Result<Option<Vec<u8>>> {
        self.check_owned(chunk_x, chunk_z)?;
        let index = chunk_index(chunk_x, chunk_z);
        let corrupt = |reason: String| RegionError::Corrupt {
            x: chunk_x,
            z: chunk_z,
            reason,
        };

        let payload = {
            let mut inner = self.inner.lock();
            let location = inner.header.location(index);
            if location.is_empty() {
                return Ok(None);
            }
            if location.sectors().end > inner.used.len() {
                return Err(corrupt(format!("sectors {:?} lie outside the file", location.sectors())));
            }
            inner.read_payload(location)?
        };

        let length = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
        if length == 0 {
            return Ok(None);
        }
        if length + 4 > payload.len() {
            return Err(corrupt(format!("length {length} overruns its {} bytes", payload.len())));
        }
        let kind = payload[4];
        if kind & 0x80 != 0 {
            return Err(corrupt("stored in an external file, which is not supported".to_string()));
        }
        let compression = CompressionType::from_byte(kind)?;
        let nbt = compression.decompress(&payload[CHUNK_HEADER_BYTES..4 + length])?;
        Ok(Some(nbt))
    }

    /// The stored document of a chunk, `None` if the chunk was never stored.
    pub fn get_document(&self, chunk_x: i32, chunk_z: i32) -> Result<Option<ChunkDocument>> {
        let Some(nbt) = self.read_raw(chunk_x, chunk_z)? else {
            return Ok(None);
        };
        let document = ChunkDocument::from_nbt(&nbt)?;
        if document.x() != chunk_x || document.z() != chunk_z {
            return Err(RegionError::Corrupt {
                x: chunk_x,
                z: chunk_z,
                reason: format!("slot holds chunk ({}, {})", document.x(), document.z()),
            });
        }
        Ok(Some(document))
    }

    /// The stored document of a chunk, or a blank one.
    pub fn get_or_create_document(&self, chunk_x: i32, chunk_z: i32) -> Result<ChunkDocument> {
        Ok(self
            .get_document(chunk_x, chunk_z)?
            .unwrap_or_else(|| ChunkDocument::new(chunk_x, chunk_z)))
    }

    /// Persist a document.
    ///
    /// The payload goes to freshly allocated sectors before the header entry
    /// is repointed, so a failed write leaves the previous version current.
    pub fn write_document(&self, document: &ChunkDocument) -> Result<()> {
        let (chunk_x, chunk_z) = (document.x(), document.z());
        self.check_owned(chunk_x, chunk_z)?;

        let compressed = CompressionType::Zlib.compress(&document.to_nbt()?)?;

        // Pack in MCA format: [length:4][type:1][data:N]
        let mut blob = Vec::with_capacity(CHUNK_HEADER_BYTES + compressed.len());
        blob.extend_from_slice(&(compressed.len() as u32 + 1).to_be_bytes());
        blob.push(CompressionType::Zlib.as_byte());
        blob.extend_from_slice(&compressed);

        let sectors = blob.len().div_ceil(SECTOR_BYTES as usize);
        if sectors > MAX_SECTORS_PER_CHUNK {
            return Err(RegionError::ChunkTooLarge {
                x: chunk_x,
                z: chunk_z,
                sectors,
            });
        }
        blob.resize(sectors * SECTOR_BYTES as usize, 0);

        let index = chunk_index(chunk_x, chunk_z);
        let mut inner = self.inner.lock();
        let previous = inner.header.location(index);
        let start = inner.allocate(sectors);
        let location = Location {
            sector: start as u32,
            count: sectors as u8,
        };

        inner.file.seek(SeekFrom::Start(location.byte_offset()))?;
        inner.file.write_all(&blob)?;
        inner.mark(location.sectors(), true);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        inner.file.seek(SeekFrom::Start(Header::location_offset(index)))?;
        inner.file.write_all(&Header::location_bytes(location))?;
        inner.file.seek(SeekFrom::Start(Header::timestamp_offset(index)))?;
        inner.file.write_all(&now.to_be_bytes())?;
        inner.file.flush()?;
        inner.header.set(index, location, now);

        if !previous.is_empty() && previous.sectors().end <= inner.used.len() {
            inner.mark(previous.sectors(), false);
        }
        Ok(())
    }

    /// Hint that the caller is done with a document. Documents are owned
    /// values, so this only drops it.
    pub fn release_document(&self, document: ChunkDocument) {
        log::trace!("Released chunk ({}, {}) of {}", document.x(), document.z(), self.path.display());
    }
}

impl std::fmt::Debug for RegionFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionFile")
            .field("path", &self.path)
            .field("region_x", &self.region_x)
            .field("region_z", &self.region_z)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::GenerationStatus;
    use std::collections::BTreeMap;

    fn stone_document(x: i32, z: i32) -> ChunkDocument {
        let mut doc = ChunkDocument::new(x, z);
        doc.set_status(GenerationStatus::Full);
        doc.set_block_state(8, 64, 8, "minecraft:stone", &BTreeMap::new());
        doc
    }

    #[test]
    fn test_region_coord_floors_negatives() {
        assert_eq!(region_coord(0), 0);
        assert_eq!(region_coord(31), 0);
        assert_eq!(region_coord(32), 1);
        assert_eq!(region_coord(-1), -1);
        assert_eq!(region_coord(-32), -1);
        assert_eq!(region_coord(-33), -2);
    }

    #[test]
    fn test_chunk_index() {
        assert_eq!(chunk_index(0, 0), 0);
        assert_eq!(chunk_index(31, 0), 31);
        assert_eq!(chunk_index(0, 1), 32);
        assert_eq!(chunk_index(-1, -1), 1023);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(-1, 2), "r.-1.2.mca");
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = RegionFile::open(dir.path().join("r.0.0.mca"), 0, 0).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_makes_parents_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region").join("r.0.0.mca");
        let region = RegionFile::create(&path, 0, 0).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), HEADER_BYTES);
        assert!(region.get_document(3, 4).unwrap().is_none());
    }

    #[test]
    fn test_truncated_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.0.0.mca");
        fs::write(&path, [0u8; 100]).unwrap();
        assert!(matches!(RegionFile::open(&path, 0, 0), Err(RegionError::TruncatedHeader(100))));
    }

    #[test]
    fn test_write_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.-1.0.mca");
        {
            let region = RegionFile::create(&path, -1, 0).unwrap();
            region.write_document(&stone_document(-3, 5)).unwrap();
            assert!(region.has_chunk(-3, 5));
            assert!(region.timestamp(-3, 5) > 0);
        }

        let region = RegionFile::open(&path, -1, 0).unwrap();
        let doc = region.get_document(-3, 5).unwrap().unwrap();
        assert_eq!(doc.status(), GenerationStatus::Full);
        assert_eq!(doc.block_state(8, 64, 8).unwrap().name, "minecraft:stone");
        assert!(region.get_document(-4, 5).unwrap().is_none());
    }

    #[test]
    fn test_rewrite_reuses_freed_sectors() {
        let dir = tempfile::tempdir().unwrap();
        let region = RegionFile::create(dir.path().join("r.0.0.mca"), 0, 0).unwrap();
        region.write_document(&stone_document(0, 0)).unwrap();
        let first = region.inner.lock().header.location(0);
        region.write_document(&stone_document(0, 0)).unwrap();
        region.write_document(&stone_document(0, 0)).unwrap();
        let third = region.inner.lock().header.location(0);

        // Second write went after the first, third reclaims the first run.
        assert_eq!(first.sector, 2);
        assert_eq!(third.sector, 2);
    }

    #[test]
    fn test_overlapping_entry_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.0.0.mca");
        {
            let region = RegionFile::create(&path, 0, 0).unwrap();
            region.write_document(&stone_document(0, 0)).unwrap();
            let shared = region.inner.lock().header.location(0);
            // Point chunk (1, 0) at chunk (0, 0)'s sectors.
            let mut inner = region.inner.lock();
            inner.file.seek(SeekFrom::Start(Header::location_offset(1))).unwrap();
            inner.file.write_all(&Header::location_bytes(shared)).unwrap();
        }

        let region = RegionFile::open(&path, 0, 0).unwrap();
        assert!(region.has_chunk(0, 0));
        assert!(!region.has_chunk(1, 0));

        // Rewriting the dropped chunk must leave the other one intact.
        region.write_document(&stone_document(1, 0)).unwrap();
        region.write_document(&stone_document(1, 0)).unwrap();
        region.write_document(&stone_document(2, 0)).unwrap();
        let doc = region.get_document(0, 0).unwrap().unwrap();
        assert_eq!(doc.block_state(8, 64, 8).unwrap().name, "minecraft:stone");
        assert_eq!(region.get_document(1, 0).unwrap().unwrap().x(), 1);
    }

    #[test]
    fn test_foreign_chunk_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let region = RegionFile::create(dir.path().join("r.0.0.mca"), 0, 0).unwrap();
        assert!(matches!(
            region.write_document(&stone_document(40, 0)),
            Err(RegionError::ForeignChunk { .. })
        ));
    }

    #[test]
    fn test_get_or_create_document_is_blank() {
        let dir = tempfile::tempdir().unwrap();
        let region = RegionFile::create(dir.path().join("r.0.0.mca"), 0, 0).unwrap();
        let doc = region.get_or_create_document(7, 9).unwrap();
        assert_eq!((doc.x(), doc.z()), (7, 9));
        assert_eq!(doc.status(), GenerationStatus::Empty);
        region.release_document(doc);
    }
}
