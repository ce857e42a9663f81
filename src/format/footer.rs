//! Postscript and table footer layouts.
//!
//! A stripe file ends with `[table footer][postscript][postscript size byte]`.
//! The trailing size byte locates the postscript, the postscript locates the
//! footer, and the footer describes every stripe in the file.

use bytes::BufMut;

use crate::error::FormatError;
use crate::format::{decode_slice, decode_u64, decode_u8, reject_trailing};

/// Magic bytes identifying a stripe-file postscript.
pub const POSTSCRIPT_MAGIC: [u8; 4] = *b"STRP";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

/// Encoded postscript size: magic (4) + version (1) + footer length (8).
pub const POSTSCRIPT_LENGTH: usize = 13;

/// Width of the trailing postscript-size byte.
pub const POSTSCRIPT_SIZE_LENGTH: usize = 1;

/// Encoded size of one stripe metadata entry (4 x u64).
const STRIPE_METADATA_LENGTH: usize = 32;

/// The fixed-format trailer that locates the table footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Postscript {
    /// Format version the file was written with.
    pub version: u8,
    /// Byte length of the table footer immediately preceding the postscript.
    pub footer_length: u64,
}

impl Postscript {
    /// Encode into the postscript byte layout.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_slice(&POSTSCRIPT_MAGIC);
        buf.put_u8(self.version);
        buf.put_u64_le(self.footer_length);
    }

    /// Decode a postscript from exactly its encoded bytes.
    ///
    /// # Errors
    /// - `FormatError::InvalidMagic` if the magic bytes do not match
    /// - `FormatError::UnsupportedVersion` for an unknown version byte
    /// - `FormatError::Corrupt` if the buffer is the wrong size
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut cursor = bytes;
        let mut offset = 0u64;

        let magic = decode_slice(&mut cursor, &mut offset, 4)?;
        if magic != POSTSCRIPT_MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(magic);
            return Err(FormatError::InvalidMagic(found));
        }

        let version = decode_u8(&mut cursor, &mut offset)?;
        if version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let footer_length = decode_u64(&mut cursor, &mut offset)?;
        reject_trailing(cursor, "postscript")?;

        Ok(Self {
            version,
            footer_length,
        })
    }
}

/// Location and region sizes of one stripe.
///
/// A stripe occupies four contiguous regions starting at `file_offset`:
/// skip lists, column data, then the stripe footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripeMetadata {
    /// Absolute offset of the stripe's first byte.
    pub file_offset: u64,
    /// Byte length of the skip-list region.
    pub skip_list_length: u64,
    /// Byte length of the column data region.
    pub data_length: u64,
    /// Byte length of the stripe footer.
    pub footer_length: u64,
}

impl StripeMetadata {
    /// Absolute offset of the column data region.
    pub fn data_offset(&self) -> u64 {
        self.file_offset + self.skip_list_length
    }

    /// Absolute offset of the stripe footer.
    pub fn footer_offset(&self) -> u64 {
        self.file_offset + self.skip_list_length + self.data_length
    }

    /// Total byte length of the stripe.
    pub fn total_length(&self) -> u64 {
        self.skip_list_length + self.data_length + self.footer_length
    }
}

/// The table footer: fixed block size plus every stripe's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFooter {
    /// Rows per uncompressed block, fixed for the whole file.
    pub block_row_count: u64,
    /// Stripes in file order.
    pub stripes: Vec<StripeMetadata>,
}

impl TableFooter {
    /// Encode into the footer byte layout.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u64_le(self.block_row_count);
        buf.put_u64_le(self.stripes.len() as u64);
        for stripe in &self.stripes {
            buf.put_u64_le(stripe.file_offset);
            buf.put_u64_le(stripe.skip_list_length);
            buf.put_u64_le(stripe.data_length);
            buf.put_u64_le(stripe.footer_length);
        }
    }

    /// Decode a footer from exactly its encoded bytes.
    ///
    /// # Errors
    /// `FormatError::Corrupt` if the buffer is truncated, oversized, declares
    /// a zero block row count, or declares more stripes than it contains.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut cursor = bytes;
        let mut offset = 0u64;

        let block_row_count = decode_u64(&mut cursor, &mut offset)?;
        if block_row_count == 0 {
            return Err(FormatError::Corrupt(
                "footer declares a zero block row count".to_string(),
            ));
        }

        let stripe_count = decode_u64(&mut cursor, &mut offset)?;
        let declared = (stripe_count as usize)
            .checked_mul(STRIPE_METADATA_LENGTH)
            .filter(|needed| *needed <= cursor.len());
        if declared.is_none() {
            return Err(FormatError::Corrupt(format!(
                "footer declares {} stripes but holds {} bytes of stripe metadata",
                stripe_count,
                cursor.len()
            )));
        }

        let mut stripes = Vec::with_capacity(stripe_count as usize);
        for _ in 0..stripe_count {
            let file_offset = decode_u64(&mut cursor, &mut offset)?;
            let skip_list_length = decode_u64(&mut cursor, &mut offset)?;
            let data_length = decode_u64(&mut cursor, &mut offset)?;
            let footer_length = decode_u64(&mut cursor, &mut offset)?;
            stripes.push(StripeMetadata {
                file_offset,
                skip_list_length,
                data_length,
                footer_length,
            });
        }
        reject_trailing(cursor, "table footer")?;

        Ok(Self {
            block_row_count,
            stripes,
        })
    }
}
