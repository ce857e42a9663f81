//! Stripe footer and skip-list layouts.
//!
//! Each stripe ends with a footer of per-column region sizes and begins with
//! one skip list per column, stored contiguously in column order. A skip list
//! is a block-count header followed by one node per block carrying the block's
//! row count, optional min/max statistics, and the relative offsets/lengths of
//! its exists and value regions.

use bytes::BufMut;

use crate::codec::Compression;
use crate::error::FormatError;
use crate::format::values::decode_value;
use crate::format::{decode_u64, decode_u8, encode_value, reject_trailing};
use crate::schema::{ColumnKind, Value};

/// Encoded size of one per-column size triplet (3 x u64).
const COLUMN_SIZES_LENGTH: usize = 24;

/// Smallest possible encoded skip node: row count (8) + min/max flag (1) +
/// four offsets/lengths (32) + compression tag (1).
const MIN_SKIP_NODE_LENGTH: usize = 42;

/// Byte sizes of one column's regions within a stripe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSizes {
    /// Byte length of the column's skip list.
    pub skip_list_size: u64,
    /// Total byte length of the column's exists regions.
    pub exists_size: u64,
    /// Total byte length of the column's value regions.
    pub value_size: u64,
}

/// Per-stripe footer: one size triplet per column the stripe was written with.
///
/// A stripe written before a schema change may carry fewer columns than the
/// table; it must never carry more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeFooter {
    /// Region sizes in column order.
    pub column_sizes: Vec<ColumnSizes>,
}

impl StripeFooter {
    /// Number of columns the stripe was written with.
    pub fn column_count(&self) -> usize {
        self.column_sizes.len()
    }

    /// Encode into the stripe footer byte layout.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u64_le(self.column_sizes.len() as u64);
        for sizes in &self.column_sizes {
            buf.put_u64_le(sizes.skip_list_size);
            buf.put_u64_le(sizes.exists_size);
            buf.put_u64_le(sizes.value_size);
        }
    }

    /// Decode a stripe footer from exactly its encoded bytes.
    ///
    /// # Errors
    /// `FormatError::Corrupt` if the buffer is truncated or oversized, or if
    /// the footer declares zero columns.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut cursor = bytes;
        let mut offset = 0u64;

        let column_count = decode_u64(&mut cursor, &mut offset)?;
        if column_count == 0 {
            return Err(FormatError::Corrupt(
                "stripe footer declares zero columns".to_string(),
            ));
        }
        let fits = (column_count as usize)
            .checked_mul(COLUMN_SIZES_LENGTH)
            .filter(|needed| *needed <= cursor.len());
        if fits.is_none() {
            return Err(FormatError::Corrupt(format!(
                "stripe footer declares {} columns but holds {} bytes",
                column_count,
                cursor.len()
            )));
        }

        let mut column_sizes = Vec::with_capacity(column_count as usize);
        for _ in 0..column_count {
            let skip_list_size = decode_u64(&mut cursor, &mut offset)?;
            let exists_size = decode_u64(&mut cursor, &mut offset)?;
            let value_size = decode_u64(&mut cursor, &mut offset)?;
            column_sizes.push(ColumnSizes {
                skip_list_size,
                exists_size,
                value_size,
            });
        }
        reject_trailing(cursor, "stripe footer")?;

        Ok(Self { column_sizes })
    }
}

/// Statistics and region locations for one block of one column.
///
/// Offsets are relative to the column's first exists/value byte within the
/// stripe data region. Min/max are absent when every row in the block is null.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBlockSkipNode {
    /// Rows in this block.
    pub row_count: u64,
    /// Minimum and maximum value over the block's non-null rows.
    pub min_max: Option<(Value, Value)>,
    /// Offset of the block's exists bitmap, relative to the column's exists base.
    pub exists_block_offset: u64,
    /// Byte length of the exists bitmap.
    pub exists_length: u64,
    /// Offset of the block's value region, relative to the column's value base.
    pub value_block_offset: u64,
    /// Byte length of the (possibly compressed) value region.
    pub value_length: u64,
    /// Compression applied to the value region. Exists bitmaps are never
    /// compressed.
    pub value_compression: Compression,
}

impl ColumnBlockSkipNode {
    /// Node for a column the stripe predates: no rows, no statistics, no data.
    pub fn empty() -> Self {
        Self {
            row_count: 0,
            min_max: None,
            exists_block_offset: 0,
            exists_length: 0,
            value_block_offset: 0,
            value_length: 0,
            value_compression: Compression::None,
        }
    }

    /// Whether the block carries min/max statistics.
    pub fn has_min_max(&self) -> bool {
        self.min_max.is_some()
    }
}

/// Encode one column's skip list: block count, then one node per block.
///
/// # Errors
/// `FormatError::Corrupt` if a node's min and max are of different kinds or a
/// min/max payload exceeds its length prefix.
pub fn encode_column_skip_list(
    nodes: &[ColumnBlockSkipNode],
    buf: &mut Vec<u8>,
) -> Result<(), FormatError> {
    buf.put_u64_le(nodes.len() as u64);
    for node in nodes {
        buf.put_u64_le(node.row_count);
        match &node.min_max {
            Some((minimum, maximum)) => {
                if minimum.kind() != maximum.kind() {
                    return Err(FormatError::Corrupt(format!(
                        "skip node min is {:?} but max is {:?}",
                        minimum.kind(),
                        maximum.kind()
                    )));
                }
                buf.put_u8(1);
                encode_value(minimum, buf)?;
                encode_value(maximum, buf)?;
            }
            None => buf.put_u8(0),
        }
        buf.put_u64_le(node.exists_block_offset);
        buf.put_u64_le(node.exists_length);
        buf.put_u64_le(node.value_block_offset);
        buf.put_u64_le(node.value_length);
        buf.put_u8(node.value_compression.tag());
    }
    Ok(())
}

/// Decode one column's skip list from exactly its encoded bytes.
///
/// `kind` selects the min/max value encoding.
///
/// # Errors
/// `FormatError::Corrupt` for truncated or oversized buffers, implausible
/// block counts, unknown compression tags, or an invalid min/max flag.
pub fn decode_column_skip_list(
    bytes: &[u8],
    kind: ColumnKind,
) -> Result<Vec<ColumnBlockSkipNode>, FormatError> {
    let mut cursor = bytes;
    let mut offset = 0u64;

    let block_count = decode_u64(&mut cursor, &mut offset)?;
    let fits = (block_count as usize)
        .checked_mul(MIN_SKIP_NODE_LENGTH)
        .filter(|needed| *needed <= cursor.len());
    if fits.is_none() {
        return Err(FormatError::Corrupt(format!(
            "skip list declares {} blocks but holds {} bytes",
            block_count,
            cursor.len()
        )));
    }

    let mut nodes = Vec::with_capacity(block_count as usize);
    for _ in 0..block_count {
        let row_count = decode_u64(&mut cursor, &mut offset)?;
        let min_max = match decode_u8(&mut cursor, &mut offset)? {
            0 => None,
            1 => {
                let minimum = decode_value(&mut cursor, &mut offset, kind)?;
                let maximum = decode_value(&mut cursor, &mut offset, kind)?;
                Some((minimum, maximum))
            }
            flag => {
                return Err(FormatError::Corrupt(format!(
                    "invalid min/max flag {} at offset {}",
                    flag,
                    offset - 1
                )))
            }
        };
        let exists_block_offset = decode_u64(&mut cursor, &mut offset)?;
        let exists_length = decode_u64(&mut cursor, &mut offset)?;
        let value_block_offset = decode_u64(&mut cursor, &mut offset)?;
        let value_length = decode_u64(&mut cursor, &mut offset)?;
        let tag = decode_u8(&mut cursor, &mut offset)?;
        let value_compression = Compression::from_tag(tag)
            .map_err(|_| FormatError::Corrupt(format!("unknown compression tag {}", tag)))?;

        nodes.push(ColumnBlockSkipNode {
            row_count,
            min_max,
            exists_block_offset,
            exists_length,
            value_block_offset,
            value_length,
            value_compression,
        });
    }
    reject_trailing(cursor, "skip list")?;

    Ok(nodes)
}

/// Column-major grid of skip nodes for one stripe: one node per
/// (column, block).
///
/// Every column holds the same number of nodes. Schema-added columns carry
/// synthesized empty nodes so the grid stays rectangular.
#[derive(Debug, Clone, PartialEq)]
pub struct StripeSkipList {
    columns: Vec<Vec<ColumnBlockSkipNode>>,
}

impl StripeSkipList {
    /// Assemble a grid from per-column node lists. Callers guarantee the lists
    /// are equal-length.
    pub fn new(columns: Vec<Vec<ColumnBlockSkipNode>>) -> Self {
        Self { columns }
    }

    /// Number of columns in the grid.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of blocks per column.
    pub fn block_count(&self) -> usize {
        self.columns.first().map_or(0, |nodes| nodes.len())
    }

    /// One column's nodes, indexed by block.
    pub fn column(&self, index: usize) -> &[ColumnBlockSkipNode] {
        &self.columns[index]
    }

    /// The node for one (column, block) cell.
    pub fn node(&self, column: usize, block: usize) -> &ColumnBlockSkipNode {
        &self.columns[column][block]
    }

    /// Copy the blocks whose mask bit is set into a fresh grid.
    ///
    /// The result owns its nodes and never aliases `self`. `mask` must be
    /// `block_count` long; selected blocks keep their relative order and are
    /// re-indexed contiguously from zero.
    pub fn select(&self, mask: &[bool]) -> StripeSkipList {
        let columns = self
            .columns
            .iter()
            .map(|nodes| {
                nodes
                    .iter()
                    .zip(mask)
                    .filter(|(_, &selected)| selected)
                    .map(|(node, _)| node.clone())
                    .collect()
            })
            .collect();
        StripeSkipList { columns }
    }

    /// Total rows covered by the grid, read from the first column.
    ///
    /// Row counts are identical across columns for a given block, so the first
    /// column is authoritative.
    pub fn row_count(&self) -> u64 {
        self.columns
            .first()
            .map_or(0, |nodes| nodes.iter().map(|node| node.row_count).sum())
    }
}
