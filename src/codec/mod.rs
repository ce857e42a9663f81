//! Block compression support.
//!
//! Value regions are compressed per block; the compression in use is recorded
//! as a one-byte tag in the block's skip node. Exists bitmaps are never
//! compressed. This module provides the tag mapping and decompression.

use crate::error::CodecError;

#[cfg(feature = "snappy")]
use snap::raw::Decoder as SnappyDecoder;

#[cfg(feature = "deflate")]
use flate2::read::ZlibDecoder;

#[cfg(any(feature = "deflate", feature = "zstd"))]
use std::io::Read;

/// Compression applied to a block's value region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// No compression (passthrough).
    #[default]
    None,
    /// Snappy with a trailing 4-byte big-endian CRC32 of the uncompressed data.
    Snappy,
    /// Deflate (zlib) compression.
    Deflate,
    /// Zstandard compression.
    Zstd,
}

impl Compression {
    /// Map a wire tag to a compression.
    ///
    /// # Errors
    /// `CodecError::UnknownTag` for tags the format does not define.
    pub fn from_tag(tag: u8) -> Result<Self, CodecError> {
        match tag {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Snappy),
            2 => Ok(Compression::Deflate),
            3 => Ok(Compression::Zstd),
            unknown => Err(CodecError::UnknownTag(unknown)),
        }
    }

    /// The wire tag recorded in skip nodes.
    pub fn tag(&self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Snappy => 1,
            Compression::Deflate => 2,
            Compression::Zstd => 3,
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Snappy => "snappy",
            Compression::Deflate => "deflate",
            Compression::Zstd => "zstd",
        }
    }

    /// Decompress a value region.
    ///
    /// `Compression::None` returns a copy of the input. Codecs compiled out
    /// via feature flags fail with `CodecError::UnsupportedCodec`.
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self {
            Compression::None => Ok(data.to_vec()),
            #[cfg(feature = "snappy")]
            Compression::Snappy => decompress_snappy(data),
            #[cfg(not(feature = "snappy"))]
            Compression::Snappy => Err(CodecError::UnsupportedCodec(
                "snappy support not enabled; enable the 'snappy' feature".to_string(),
            )),
            #[cfg(feature = "deflate")]
            Compression::Deflate => decompress_deflate(data),
            #[cfg(not(feature = "deflate"))]
            Compression::Deflate => Err(CodecError::UnsupportedCodec(
                "deflate support not enabled; enable the 'deflate' feature".to_string(),
            )),
            #[cfg(feature = "zstd")]
            Compression::Zstd => decompress_zstd(data),
            #[cfg(not(feature = "zstd"))]
            Compression::Zstd => Err(CodecError::UnsupportedCodec(
                "zstd support not enabled; enable the 'zstd' feature".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decompress a snappy value region.
///
/// Layout: `[snappy compressed data][4-byte big-endian CRC32]`. The checksum
/// covers the uncompressed data and is validated after decompression.
#[cfg(feature = "snappy")]
fn decompress_snappy(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    const CRC_SIZE: usize = 4;

    if data.len() < CRC_SIZE {
        return Err(CodecError::Decompression(
            "snappy region too short: missing CRC checksum".to_string(),
        ));
    }

    let compressed = &data[..data.len() - CRC_SIZE];
    let crc_bytes = &data[data.len() - CRC_SIZE..];
    let expected = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

    let decompressed = if compressed.is_empty() {
        Vec::new()
    } else {
        let mut decoder = SnappyDecoder::new();
        decoder
            .decompress_vec(compressed)
            .map_err(|e| CodecError::Decompression(format!("snappy decompression failed: {}", e)))?
    };

    let found = crc32fast::hash(&decompressed);
    if found != expected {
        return Err(CodecError::ChecksumMismatch { expected, found });
    }

    Ok(decompressed)
}

/// Decompress a zlib-wrapped deflate value region.
#[cfg(feature = "deflate")]
fn decompress_deflate(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| CodecError::Decompression(format!("deflate decompression failed: {}", e)))?;

    Ok(decompressed)
}

/// Decompress a zstd value region.
#[cfg(feature = "zstd")]
fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut decoder = zstd::Decoder::new(data)
        .map_err(|e| CodecError::Decompression(format!("zstd decoder init failed: {}", e)))?;
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| CodecError::Decompression(format!("zstd decompression failed: {}", e)))?;

    Ok(decompressed)
}
