//! Exists bitmaps and value-array serialization.
//!
//! Exists bitmaps are bit-packed eight rows per byte, least-significant bit
//! first, and are never compressed. Value arrays hold one encoded value per
//! existing row, in row order; absent rows contribute no bytes. After each
//! value the write position advances by the encoded length and then rounds up
//! to the kind's alignment, zero-padding the gap.

use bytes::BufMut;

use crate::error::FormatError;
use crate::format::{decode_slice, decode_u32, decode_u64, decode_u8};
use crate::schema::{ColumnKind, Value};

/// Round `position` up to the next multiple of `alignment`.
fn align_up(position: usize, alignment: usize) -> usize {
    (position + alignment - 1) / alignment * alignment
}

/// Bit-pack a boolean array, eight per byte, LSB first.
pub fn encode_bool_array(bits: &[bool], buf: &mut Vec<u8>) {
    let start = buf.len();
    buf.resize(start + (bits.len() + 7) / 8, 0);
    for (index, &bit) in bits.iter().enumerate() {
        if bit {
            buf[start + index / 8] |= 1 << (index % 8);
        }
    }
}

/// Unpack `row_count` booleans from a bit-packed buffer.
///
/// # Errors
/// `FormatError::InsufficientData` if the buffer holds fewer than
/// `ceil(row_count / 8)` bytes.
pub fn decode_bool_array(bytes: &[u8], row_count: usize) -> Result<Vec<bool>, FormatError> {
    let needed = (row_count + 7) / 8;
    if bytes.len() < needed {
        return Err(FormatError::InsufficientData(format!(
            "exists buffer holds {} bytes, {} rows need {}",
            bytes.len(),
            row_count,
            needed
        )));
    }

    let mut bits = Vec::with_capacity(row_count);
    for index in 0..row_count {
        bits.push(bytes[index / 8] & (1 << (index % 8)) != 0);
    }
    Ok(bits)
}

/// Encode one value in its kind's wire form, without alignment padding.
///
/// # Errors
/// `FormatError::Corrupt` if a text or binary payload exceeds the u32 length
/// prefix.
pub fn encode_value(value: &Value, buf: &mut Vec<u8>) -> Result<(), FormatError> {
    match value {
        Value::Bool(b) => buf.put_u8(*b as u8),
        Value::Int32(i) => buf.put_i32_le(*i),
        Value::Int64(i) => buf.put_i64_le(*i),
        Value::Float64(f) => buf.put_u64_le(f.to_bits()),
        Value::Text(s) => {
            let length = encodable_length(s.len())?;
            buf.put_u32_le(length);
            buf.put_slice(s.as_bytes());
        }
        Value::Binary(b) => {
            let length = encodable_length(b.len())?;
            buf.put_u32_le(length);
            buf.put_slice(b);
        }
    }
    Ok(())
}

fn encodable_length(length: usize) -> Result<u32, FormatError> {
    u32::try_from(length)
        .map_err(|_| FormatError::Corrupt(format!("value of {} bytes exceeds length prefix", length)))
}

/// Decode one value of `kind` from a cursor.
///
/// Used for skip-node min/max fields; value arrays go through
/// [`decode_value_array`], which also handles alignment.
pub(crate) fn decode_value(
    cursor: &mut &[u8],
    offset: &mut u64,
    kind: ColumnKind,
) -> Result<Value, FormatError> {
    let value = match kind {
        ColumnKind::Bool => Value::Bool(decode_u8(cursor, offset)? != 0),
        ColumnKind::Int32 => Value::Int32(decode_u32(cursor, offset)? as i32),
        ColumnKind::Int64 => Value::Int64(decode_u64(cursor, offset)? as i64),
        ColumnKind::Float64 => Value::Float64(f64::from_bits(decode_u64(cursor, offset)?)),
        ColumnKind::Text => {
            let length = decode_u32(cursor, offset)? as usize;
            let raw = decode_slice(cursor, offset, length)?;
            let text = std::str::from_utf8(raw).map_err(|_| {
                FormatError::Corrupt(format!("invalid UTF-8 in text value at offset {}", offset))
            })?;
            Value::Text(text.to_string())
        }
        ColumnKind::Binary => {
            let length = decode_u32(cursor, offset)? as usize;
            Value::Binary(decode_slice(cursor, offset, length)?.to_vec())
        }
    };
    Ok(value)
}

/// Serialize a column block's values, skipping absent rows and padding each
/// value to the kind's alignment.
///
/// # Errors
/// `FormatError::Corrupt` if a present value is not of `kind` or exceeds its
/// length prefix.
pub fn encode_value_array(
    rows: &[Option<Value>],
    kind: ColumnKind,
    buf: &mut Vec<u8>,
) -> Result<(), FormatError> {
    let start = buf.len();
    for value in rows.iter().flatten() {
        if value.kind() != kind {
            return Err(FormatError::Corrupt(format!(
                "value of kind {:?} in a {:?} column",
                value.kind(),
                kind
            )));
        }
        encode_value(value, buf)?;
        let aligned = align_up(buf.len() - start, kind.alignment());
        buf.resize(start + aligned, 0);
    }
    Ok(())
}

/// Reconstruct a column block's rows from its decompressed value buffer and
/// exists bits.
///
/// Walks the buffer sequentially: each set exists-bit consumes one encoded
/// value at the current position, then the position rounds up to the kind's
/// alignment. Clear bits yield `None` and consume nothing.
///
/// # Errors
/// `FormatError::InsufficientData` if the walk runs past the end of the
/// buffer; `FormatError::Corrupt` for undecodable payloads (bad UTF-8).
pub fn decode_value_array(
    bytes: &[u8],
    exists: &[bool],
    kind: ColumnKind,
) -> Result<Vec<Option<Value>>, FormatError> {
    let mut rows = Vec::with_capacity(exists.len());
    let mut position = 0usize;

    for &present in exists {
        if !present {
            rows.push(None);
            continue;
        }
        let (value, encoded_length) = decode_value_at(bytes, position, kind)?;
        rows.push(Some(value));
        position = align_up(position + encoded_length, kind.alignment());
    }
    Ok(rows)
}

/// Decode the value at `position`, returning it with its encoded length.
///
/// Truncation here is `InsufficientData`, not `Corrupt`: the walk is driven
/// by exists bits rather than a stored structure length, so running out of
/// bytes means the buffer is short, not malformed.
fn decode_value_at(
    bytes: &[u8],
    position: usize,
    kind: ColumnKind,
) -> Result<(Value, usize), FormatError> {
    let take = |at: usize, needed: usize| {
        bytes.get(at..at + needed).ok_or_else(|| {
            FormatError::InsufficientData(format!(
                "value cursor at {} needs {} bytes, buffer holds {}",
                at,
                needed,
                bytes.len()
            ))
        })
    };

    match kind {
        ColumnKind::Bool => Ok((Value::Bool(take(position, 1)?[0] != 0), 1)),
        ColumnKind::Int32 => {
            let mut le = [0u8; 4];
            le.copy_from_slice(take(position, 4)?);
            Ok((Value::Int32(i32::from_le_bytes(le)), 4))
        }
        ColumnKind::Int64 => {
            let mut le = [0u8; 8];
            le.copy_from_slice(take(position, 8)?);
            Ok((Value::Int64(i64::from_le_bytes(le)), 8))
        }
        ColumnKind::Float64 => {
            let mut le = [0u8; 8];
            le.copy_from_slice(take(position, 8)?);
            Ok((Value::Float64(f64::from_bits(u64::from_le_bytes(le))), 8))
        }
        ColumnKind::Text | ColumnKind::Binary => {
            let mut le = [0u8; 4];
            le.copy_from_slice(take(position, 4)?);
            let length = u32::from_le_bytes(le) as usize;
            let payload = take(position + 4, length)?;
            let value = if kind == ColumnKind::Text {
                let text = std::str::from_utf8(payload).map_err(|_| {
                    FormatError::Corrupt(format!(
                        "invalid UTF-8 in text value at offset {}",
                        position
                    ))
                })?;
                Value::Text(text.to_string())
            } else {
                Value::Binary(payload.to_vec())
            };
            Ok((value, 4 + length))
        }
    }
}
