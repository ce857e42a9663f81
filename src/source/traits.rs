//! RegionSource trait definition
//!
//! Provides a unified async interface for byte-range reads against the logical
//! file region a table lives in.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SourceError;

/// Abstraction over byte-range access to one logical file region.
///
/// The reader validates every offset and length against stored metadata
/// before asking for it, and relies on a strict contract in return: a range
/// read either yields exactly the requested bytes or fails. Implementations
/// must never silently clamp or pad.
#[async_trait]
pub trait RegionSource: Send + Sync {
    /// Read exactly `length` bytes starting at `offset`.
    ///
    /// # Arguments
    /// * `offset` - The byte offset to start reading from
    /// * `length` - The number of bytes to read
    ///
    /// # Returns
    /// Exactly `length` bytes.
    ///
    /// # Errors
    /// Returns `SourceError::ShortRead` if fewer than `length` bytes exist at
    /// `offset`, and other `SourceError` variants for access failures.
    async fn read_range(&self, offset: u64, length: usize) -> Result<Bytes, SourceError>;

    /// Get the total size of the region in bytes.
    ///
    /// # Returns
    /// The total size in bytes, or an error if the size cannot be determined.
    async fn size(&self) -> Result<u64, SourceError>;
}

/// A boxed RegionSource for dynamic dispatch
pub type BoxedSource = Box<dyn RegionSource>;

/// Implement RegionSource for BoxedSource to allow using it with generic code
#[async_trait]
impl RegionSource for BoxedSource {
    async fn read_range(&self, offset: u64, length: usize) -> Result<Bytes, SourceError> {
        (**self).read_range(offset, length).await
    }

    async fn size(&self) -> Result<u64, SourceError> {
        (**self).size().await
    }
}
