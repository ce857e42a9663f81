//! On-disk layout encode/decode primitives.
//!
//! Everything in a stripe file is described by four structures: the trailing
//! postscript, the table footer, the per-stripe footer, and per-column skip
//! lists. This module defines their exact byte layouts plus the bit-packed
//! exists bitmap and aligned value-array encodings. All multi-byte integers
//! are little-endian; lengths and offsets are 64-bit.

mod footer;
mod stripe;
mod values;

pub use footer::{
    Postscript, StripeMetadata, TableFooter, FORMAT_VERSION, POSTSCRIPT_LENGTH,
    POSTSCRIPT_MAGIC, POSTSCRIPT_SIZE_LENGTH,
};
pub use stripe::{
    decode_column_skip_list, encode_column_skip_list, ColumnBlockSkipNode, ColumnSizes,
    StripeFooter, StripeSkipList,
};
pub use values::{
    decode_bool_array, decode_value_array, encode_bool_array, encode_value, encode_value_array,
};

use crate::error::FormatError;

/// Read one byte, advancing the cursor.
pub(crate) fn decode_u8(cursor: &mut &[u8], offset: &mut u64) -> Result<u8, FormatError> {
    if cursor.is_empty() {
        return Err(FormatError::Corrupt(format!(
            "unexpected end of buffer at offset {}",
            offset
        )));
    }
    let value = cursor[0];
    *cursor = &cursor[1..];
    *offset += 1;
    Ok(value)
}

/// Read a little-endian u32, advancing the cursor.
pub(crate) fn decode_u32(cursor: &mut &[u8], offset: &mut u64) -> Result<u32, FormatError> {
    if cursor.len() < 4 {
        return Err(FormatError::Corrupt(format!(
            "unexpected end of buffer at offset {}: expected 4 bytes, got {}",
            offset,
            cursor.len()
        )));
    }
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&cursor[..4]);
    *cursor = &cursor[4..];
    *offset += 4;
    Ok(u32::from_le_bytes(raw))
}

/// Read a little-endian u64, advancing the cursor.
pub(crate) fn decode_u64(cursor: &mut &[u8], offset: &mut u64) -> Result<u64, FormatError> {
    if cursor.len() < 8 {
        return Err(FormatError::Corrupt(format!(
            "unexpected end of buffer at offset {}: expected 8 bytes, got {}",
            offset,
            cursor.len()
        )));
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&cursor[..8]);
    *cursor = &cursor[8..];
    *offset += 8;
    Ok(u64::from_le_bytes(raw))
}

/// Borrow the next `length` bytes, advancing the cursor.
pub(crate) fn decode_slice<'a>(
    cursor: &mut &'a [u8],
    offset: &mut u64,
    length: usize,
) -> Result<&'a [u8], FormatError> {
    if cursor.len() < length {
        return Err(FormatError::Corrupt(format!(
            "unexpected end of buffer at offset {}: expected {} bytes, got {}",
            offset,
            length,
            cursor.len()
        )));
    }
    let slice = &cursor[..length];
    *cursor = &cursor[length..];
    *offset += length as u64;
    Ok(slice)
}

/// A structure decoded cleanly but left bytes behind.
pub(crate) fn reject_trailing(cursor: &[u8], what: &str) -> Result<(), FormatError> {
    if cursor.is_empty() {
        Ok(())
    } else {
        Err(FormatError::Corrupt(format!(
            "{} has {} trailing bytes",
            what,
            cursor.len()
        )))
    }
}
