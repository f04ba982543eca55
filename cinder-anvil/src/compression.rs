//! Chunk payload compression.
//!
//! Every chunk stored in a region file is prefixed by a single byte naming
//! the scheme used for the NBT bytes that follow.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};

use crate::error::{RegionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    Gzip = 1,
    Zlib = 2,
    Uncompressed = 3,
    Lz4 = 4,
}

impl CompressionType {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            1 => Ok(CompressionType::Gzip),
            2 => Ok(CompressionType::Zlib),
            3 => Ok(CompressionType::Uncompressed),
            4 => Ok(CompressionType::Lz4),
            other => Err(RegionError::UnsupportedCompression(other)),
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            CompressionType::Gzip => {
                GzDecoder::new(data).read_to_end(&mut out)?;
            }
            CompressionType::Zlib => {
                ZlibDecoder::new(data).read_to_end(&mut out)?;
            }
            CompressionType::Uncompressed => out.extend_from_slice(data),
            CompressionType::Lz4 => {
                lz4_java_wrc::Lz4BlockInput::new(data).read_to_end(&mut out)?;
            }
        }
        Ok(out)
    }

    /// Compress `data` with this scheme. LZ4 is read-only: we never write it.
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionType::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            CompressionType::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            CompressionType::Uncompressed => Ok(data.to_vec()),
            CompressionType::Lz4 => Err(RegionError::UnsupportedCompression(self.as_byte())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_byte() {
        assert_eq!(CompressionType::from_byte(2).unwrap(), CompressionType::Zlib);
        assert_eq!(CompressionType::from_byte(4).unwrap(), CompressionType::Lz4);
        assert!(matches!(
            CompressionType::from_byte(9),
            Err(RegionError::UnsupportedCompression(9))
        ));
    }

    #[test]
    fn test_zlib_and_gzip_restore_input() {
        let payload = b"minecraft:stone minecraft:stone minecraft:stone".to_vec();
        for scheme in [CompressionType::Zlib, CompressionType::Gzip, CompressionType::Uncompressed] {
            let packed = scheme.compress(&payload).unwrap();
            assert_eq!(scheme.decompress(&packed).unwrap(), payload, "{scheme:?}");
        }
    }

    #[test]
    fn test_lz4_is_not_written() {
        assert!(CompressionType::Lz4.compress(b"data").is_err());
    }
}
