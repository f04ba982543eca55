//! Region file header.
//!
//! The header consists of two tables:
//! - Location table: where each chunk is stored
//! - Timestamp table: when each chunk was last saved

use super::{CHUNKS_PER_REGION, HEADER_BYTES, SECTOR_BYTES};

/// Where one chunk lives: first sector and sector count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub sector: u32,
    pub count: u8,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.sector == 0 || self.count == 0
    }

    /// Sector range covered by this entry.
    pub fn sectors(&self) -> std::ops::Range<usize> {
        self.sector as usize..self.sector as usize + self.count as usize
    }

    pub fn byte_offset(&self) -> u64 {
        self.sector as u64 * SECTOR_BYTES
    }
}

/// Parsed 8KB header (location table + timestamp table).
#[derive(Debug, Clone)]
pub struct Header {
    locations: Vec<Location>,
    timestamps: Vec<u32>,
}

impl Header {
    /// Header of a region with no chunks.
    pub fn empty() -> Self {
        Self {
            locations: vec![Location::default(); CHUNKS_PER_REGION],
            timestamps: vec![0; CHUNKS_PER_REGION],
        }
    }

    /// Parse the first [`HEADER_BYTES`] of a region file.
    pub fn parse(bytes: &[u8]) -> Self {
        let mut header = Self::empty();
        for i in 0..CHUNKS_PER_REGION {
            // Each entry: 3 bytes offset + 1 byte sector count
            let entry = &bytes[i * 4..i * 4 + 4];
            header.locations[i] = Location {
                sector: u32::from_be_bytes([0, entry[0], entry[1], entry[2]]),
                count: entry[3],
            };

            let stamp = &bytes[SECTOR_BYTES as usize + i * 4..SECTOR_BYTES as usize + i * 4 + 4];
            header.timestamps[i] = u32::from_be_bytes([stamp[0], stamp[1], stamp[2], stamp[3]]);
        }
        header
    }

    /// Generate complete header (8192 bytes).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_BYTES as usize];
        for i in 0..CHUNKS_PER_REGION {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&Self::location_bytes(self.locations[i]));
            let at = SECTOR_BYTES as usize + i * 4;
            bytes[at..at + 4].copy_from_slice(&self.timestamps[i].to_be_bytes());
        }
        bytes
    }

    pub fn location(&self, index: usize) -> Location {
        self.locations[index]
    }

    pub fn timestamp(&self, index: usize) -> u32 {
        self.timestamps[index]
    }

    pub fn set(&mut self, index: usize, location: Location, timestamp: u32) {
        self.locations[index] = location;
        self.timestamps[index] = timestamp;
    }

    pub fn locations(&self) -> impl Iterator<Item = (usize, Location)> + '_ {
        self.locations.iter().copied().enumerate()
    }

    /// On-disk bytes of one location entry.
    pub fn location_bytes(location: Location) -> [u8; 4] {
        let s = location.sector;
        [
            ((s >> 16) & 0xFF) as u8,
            ((s >> 8) & 0xFF) as u8,
            (s & 0xFF) as u8,
            location.count,
        ]
    }

    /// File offset of the location entry for a chunk index.
    #[inline]
    pub fn location_offset(index: usize) -> u64 {
        index as u64 * 4
    }

    /// File offset of the timestamp entry for a chunk index.
    #[inline]
    pub fn timestamp_offset(index: usize) -> u64 {
        SECTOR_BYTES + index as u64 * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        let header = Header::empty();
        assert_eq!(header.to_bytes().len(), 8192);
    }

    #[test]
    fn test_location_encoding() {
        let mut header = Header::empty();
        header.set(0, Location { sector: 2, count: 1 }, 0);
        header.set(1023, Location { sector: 0x01_02_03, count: 7 }, 99);
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &[0, 0, 2, 1]); // sector 2, size 1
        assert_eq!(&bytes[4092..4096], &[1, 2, 3, 7]);
        assert_eq!(&bytes[8188..8192], &99u32.to_be_bytes());

        let parsed = Header::parse(&bytes);
        assert_eq!(parsed.location(1023), Location { sector: 0x01_02_03, count: 7 });
        assert_eq!(parsed.timestamp(1023), 99);
        assert!(parsed.location(5).is_empty());
    }

    #[test]
    fn test_entry_offsets() {
        assert_eq!(Header::location_offset(1), 4);
        assert_eq!(Header::timestamp_offset(0), 4096);
        assert_eq!(Location { sector: 3, count: 2 }.byte_offset(), 12288);
        assert_eq!(Location { sector: 3, count: 2 }.sectors(), 3..5);
    }
}
