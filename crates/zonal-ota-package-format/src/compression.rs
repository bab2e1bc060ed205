//! Payload compression capability.
//!
//! The package builders only need "compress these bytes and tell me the
//! before/after size". Which algorithm runs is a configuration concern, so it
//! sits behind [`PayloadCompressor`].

use std::io::{Read, Write};

use flate2::{Compression, GzBuilder};
use tracing::debug;
use zonal_ota_errors::CodecError;

/// Compressed bytes plus the sizes a package header records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedPayload {
    pub bytes: Vec<u8>,
    pub original_size: u64,
    pub compressed_size: u64,
}

impl CompressedPayload {
    /// Compressed size as a fraction of the original, `1.0` for empty input.
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 1.0;
        }
        self.compressed_size as f64 / self.original_size as f64
    }
}

/// Algorithm identifiers recognised by the builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionAlgorithm {
    None,
    Gzip,
    Zlib,
}

impl CompressionAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionAlgorithm::None => "none",
            CompressionAlgorithm::Gzip => "gzip",
            CompressionAlgorithm::Zlib => "zlib",
        }
    }
}

/// Compress/decompress capability with reported sizes.
pub trait PayloadCompressor: Send + Sync {
    fn algorithm(&self) -> CompressionAlgorithm;

    fn compress(&self, data: &[u8]) -> Result<CompressedPayload, CodecError>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Whether output differs from input, i.e. the header flag should be set.
    fn is_compressing(&self) -> bool {
        self.algorithm() != CompressionAlgorithm::None
    }
}

/// Passes bytes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

impl PayloadCompressor for NoCompression {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::None
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedPayload, CodecError> {
        Ok(sized(data, data.to_vec()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }
}

/// Gzip with a zeroed modification time so output is byte-reproducible.
#[derive(Debug, Clone, Copy)]
pub struct GzipCompressor {
    level: u32,
}

impl GzipCompressor {
    /// `level` is clamped to 0..=9.
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new(6)
    }
}

impl PayloadCompressor for GzipCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Gzip
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedPayload, CodecError> {
        let mut encoder = GzBuilder::new()
            .mtime(0)
            .write(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| CodecError::Compression(format!("gzip write: {e}")))?;
        let bytes = encoder
            .finish()
            .map_err(|e| CodecError::Compression(format!("gzip finish: {e}")))?;
        let out = sized(data, bytes);
        debug!(
            algorithm = "gzip",
            original = out.original_size,
            compressed = out.compressed_size,
            "Compressed payload"
        );
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = flate2::read::GzDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Compression(format!("gzip read: {e}")))?;
        Ok(out)
    }
}

/// Zlib stream compressor.
#[derive(Debug, Clone, Copy)]
pub struct ZlibCompressor {
    level: u32,
}

impl ZlibCompressor {
    /// `level` is clamped to 0..=9.
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl Default for ZlibCompressor {
    fn default() -> Self {
        Self::new(6)
    }
}

impl PayloadCompressor for ZlibCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Zlib
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedPayload, CodecError> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| CodecError::Compression(format!("zlib write: {e}")))?;
        let bytes = encoder
            .finish()
            .map_err(|e| CodecError::Compression(format!("zlib finish: {e}")))?;
        let out = sized(data, bytes);
        debug!(
            algorithm = "zlib",
            original = out.original_size,
            compressed = out.compressed_size,
            "Compressed payload"
        );
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Compression(format!("zlib read: {e}")))?;
        Ok(out)
    }
}

/// Boxed compressor for `algorithm` at `level`.
pub fn compressor_for(algorithm: CompressionAlgorithm, level: u32) -> Box<dyn PayloadCompressor> {
    match algorithm {
        CompressionAlgorithm::None => Box::new(NoCompression),
        CompressionAlgorithm::Gzip => Box::new(GzipCompressor::new(level)),
        CompressionAlgorithm::Zlib => Box::new(ZlibCompressor::new(level)),
    }
}

fn sized(original: &[u8], bytes: Vec<u8>) -> CompressedPayload {
    CompressedPayload {
        original_size: original.len() as u64,
        compressed_size: bytes.len() as u64,
        bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        (0..4096u32).map(|i| (i % 17) as u8).collect()
    }

    #[test]
    fn test_gzip_roundtrip_and_sizes() -> Result<(), CodecError> {
        let data = sample();
        let gz = GzipCompressor::default();
        let out = gz.compress(&data)?;
        assert_eq!(out.original_size, 4096);
        assert_eq!(out.compressed_size, out.bytes.len() as u64);
        assert!(out.ratio() < 1.0);
        assert_eq!(gz.decompress(&out.bytes)?, data);
        Ok(())
    }

    #[test]
    fn test_gzip_is_deterministic() -> Result<(), CodecError> {
        let data = sample();
        let gz = GzipCompressor::new(9);
        assert_eq!(gz.compress(&data)?.bytes, gz.compress(&data)?.bytes);
        Ok(())
    }

    #[test]
    fn test_zlib_roundtrip() -> Result<(), CodecError> {
        let data = sample();
        let z = ZlibCompressor::new(1);
        let out = z.compress(&data)?;
        assert_eq!(z.decompress(&out.bytes)?, data);
        Ok(())
    }

    #[test]
    fn test_passthrough() -> Result<(), CodecError> {
        let out = NoCompression.compress(b"abc")?;
        assert_eq!(out.bytes, b"abc");
        assert!(!NoCompression.is_compressing());
        Ok(())
    }

    #[test]
    fn test_garbage_fails_to_decompress() {
        let err = GzipCompressor::default().decompress(b"not gzip at all");
        assert!(matches!(err, Err(CodecError::Compression(_))));
    }
}
