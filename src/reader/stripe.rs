//! Stripe loading: skip lists, block selection, and raw column buffers.
//!
//! A stripe is loaded in three steps. The stripe footer gives each column's
//! region sizes; the per-column skip lists give per-block statistics and
//! block locations; and once pruning has chosen the blocks worth reading,
//! the raw exists and value regions of the selected blocks are fetched for
//! every projected column. Nothing here decompresses or decodes values.

use bytes::Bytes;
use tracing::debug;

use crate::codec::Compression;
use crate::error::{FormatError, ReaderError};
use crate::format::{
    decode_column_skip_list, ColumnBlockSkipNode, ColumnSizes, StripeFooter, StripeMetadata,
    StripeSkipList,
};
use crate::predicate::{Predicate, PredicateEvaluator};
use crate::reader::prune::selected_block_mask;
use crate::schema::TableSchema;
use crate::source::RegionSource;

/// Raw regions of one selected block of one column.
#[derive(Debug, Clone)]
pub struct ColumnBlockBuffers {
    /// Bit-packed exists bitmap. Never compressed.
    pub exists: Bytes,
    /// Value region, compressed according to `value_compression`.
    pub value: Bytes,
    /// Compression applied to `value`.
    pub value_compression: Compression,
}

/// Raw regions of every selected block of one column.
#[derive(Debug, Clone)]
pub struct ColumnBuffers {
    /// Selected blocks in stripe order, re-indexed from zero.
    pub blocks: Vec<ColumnBlockBuffers>,
}

/// One stripe's worth of raw column data, after pruning.
///
/// Column entries are `None` both for columns outside the projection and for
/// columns added to the table after the stripe was written. Everything here
/// is dropped wholesale when the scan moves to the next stripe.
#[derive(Debug)]
pub struct StripeBuffers {
    /// Table column count, not the stripe's own possibly-smaller count.
    pub column_count: usize,
    /// Rows covered by the selected blocks.
    pub row_count: u64,
    /// Raw buffers per table column.
    pub columns: Vec<Option<ColumnBuffers>>,
}

/// Read and decode a stripe's footer, enforcing the schema-growth invariant:
/// a stripe may carry fewer columns than the table, never more.
pub(crate) async fn load_stripe_footer<S: RegionSource>(
    source: &S,
    stripe: &StripeMetadata,
    table_column_count: usize,
) -> Result<StripeFooter, ReaderError> {
    let bytes = source
        .read_range(stripe.footer_offset(), stripe.footer_length as usize)
        .await?;
    let stripe_footer = StripeFooter::decode(&bytes)?;

    if stripe_footer.column_count() > table_column_count {
        return Err(ReaderError::SchemaMismatch {
            stripe_columns: stripe_footer.column_count(),
            table_columns: table_column_count,
        });
    }
    Ok(stripe_footer)
}

/// Load every column's skip list for one stripe.
///
/// Skip lists sit contiguously in column order at the start of the stripe.
/// The first column fixes the stripe's block count; every other column must
/// agree, and no node may claim more than `block_row_count` rows. Columns
/// the stripe predates get `block_count` synthesized empty nodes, so the
/// resulting grid always spans the full table schema.
pub(crate) async fn load_stripe_skip_list<S: RegionSource>(
    source: &S,
    stripe: &StripeMetadata,
    stripe_footer: &StripeFooter,
    schema: &TableSchema,
    block_row_count: u64,
) -> Result<StripeSkipList, ReaderError> {
    let mut columns = Vec::with_capacity(schema.column_count());
    let mut skip_list_offset = 0u64;
    let mut block_count: Option<usize> = None;

    for (column_index, sizes) in stripe_footer.column_sizes.iter().enumerate() {
        let end = skip_list_offset
            .checked_add(sizes.skip_list_size)
            .filter(|end| *end <= stripe.skip_list_length);
        if end.is_none() {
            return Err(FormatError::Corrupt(format!(
                "column {} skip list overruns the stripe's {}-byte skip-list region",
                column_index, stripe.skip_list_length
            ))
            .into());
        }

        let bytes = source
            .read_range(
                stripe.file_offset + skip_list_offset,
                sizes.skip_list_size as usize,
            )
            .await?;
        let nodes = decode_column_skip_list(&bytes, schema.column_kind(column_index))?;

        match block_count {
            None => block_count = Some(nodes.len()),
            Some(count) if count != nodes.len() => {
                return Err(FormatError::Corrupt(format!(
                    "column {} skip list has {} blocks, expected {}",
                    column_index,
                    nodes.len(),
                    count
                ))
                .into());
            }
            Some(_) => {}
        }

        // The scan's block arithmetic divides row offsets by the table's
        // block size; a node claiming more rows would index past the grid.
        if let Some(node) = nodes.iter().find(|node| node.row_count > block_row_count) {
            return Err(FormatError::Corrupt(format!(
                "column {} skip node claims {} rows, blocks hold at most {}",
                column_index, node.row_count, block_row_count
            ))
            .into());
        }

        skip_list_offset += sizes.skip_list_size;
        columns.push(nodes);
    }

    // Table columns the stripe predates: a full set of empty nodes keeps the
    // grid rectangular without rewriting old stripes.
    let block_count = block_count.unwrap_or(0);
    for _ in stripe_footer.column_count()..schema.column_count() {
        columns.push(vec![ColumnBlockSkipNode::empty(); block_count]);
    }

    Ok(StripeSkipList::new(columns))
}

/// Load one stripe: decode its metadata, prune blocks against `predicates`,
/// and fetch the selected blocks' raw regions for every projected column.
///
/// A stripe whose blocks are all pruned away comes back with `row_count` 0
/// and no fetched column data.
pub(crate) async fn load_filtered_stripe<S: RegionSource>(
    source: &S,
    stripe: &StripeMetadata,
    schema: &TableSchema,
    block_row_count: u64,
    projected: &[bool],
    predicates: &[Predicate],
    evaluator: &dyn PredicateEvaluator,
) -> Result<StripeBuffers, ReaderError> {
    let stripe_footer = load_stripe_footer(source, stripe, schema.column_count()).await?;
    let skip_list =
        load_stripe_skip_list(source, stripe, &stripe_footer, schema, block_row_count).await?;

    let mask = selected_block_mask(&skip_list, schema, projected, predicates, evaluator);
    let selected = skip_list.select(&mask);
    let row_count = selected.row_count();

    let mut declared = 0u64;
    for sizes in &stripe_footer.column_sizes {
        declared = sizes
            .exists_size
            .checked_add(sizes.value_size)
            .and_then(|length| declared.checked_add(length))
            .ok_or_else(|| FormatError::Corrupt("column data sizes overflow".to_string()))?;
    }
    if declared > stripe.data_length {
        return Err(FormatError::Corrupt(format!(
            "stripe footer declares {} bytes of column data, region holds {}",
            declared, stripe.data_length
        ))
        .into());
    }

    // Column data is laid out per column: all exists regions, then all value
    // regions.
    let mut columns: Vec<Option<ColumnBuffers>> = Vec::with_capacity(schema.column_count());
    let mut column_offset = stripe.data_offset();

    if row_count > 0 {
        for (column_index, sizes) in stripe_footer.column_sizes.iter().enumerate() {
            let exists_offset = column_offset;
            let value_offset = column_offset + sizes.exists_size;

            if projected[column_index] {
                let buffers = load_column_buffers(
                    source,
                    selected.column(column_index),
                    exists_offset,
                    value_offset,
                    sizes,
                )
                .await?;
                columns.push(Some(buffers));
            } else {
                columns.push(None);
            }

            column_offset = value_offset + sizes.value_size;
        }
    }
    // Schema-added columns have no stored data in this stripe.
    columns.resize_with(schema.column_count(), || None);

    debug!(
        selected_blocks = selected.block_count(),
        total_blocks = mask.len(),
        rows = row_count,
        "loaded stripe"
    );

    Ok(StripeBuffers {
        column_count: schema.column_count(),
        row_count,
        columns,
    })
}

/// Fetch the selected blocks' raw regions for one column.
///
/// All exists regions are fetched before any value region: same-typed
/// regions sit contiguously on disk, so grouping the reads keeps seeks
/// short.
async fn load_column_buffers<S: RegionSource>(
    source: &S,
    nodes: &[ColumnBlockSkipNode],
    exists_offset: u64,
    value_offset: u64,
    sizes: &ColumnSizes,
) -> Result<ColumnBuffers, ReaderError> {
    let mut exists_buffers = Vec::with_capacity(nodes.len());
    for node in nodes {
        check_block_region(
            node.exists_block_offset,
            node.exists_length,
            sizes.exists_size,
            "exists",
        )?;
        let bytes = source
            .read_range(
                exists_offset + node.exists_block_offset,
                node.exists_length as usize,
            )
            .await?;
        exists_buffers.push(bytes);
    }

    let mut blocks = Vec::with_capacity(nodes.len());
    for (node, exists) in nodes.iter().zip(exists_buffers) {
        check_block_region(
            node.value_block_offset,
            node.value_length,
            sizes.value_size,
            "value",
        )?;
        let value = source
            .read_range(
                value_offset + node.value_block_offset,
                node.value_length as usize,
            )
            .await?;
        blocks.push(ColumnBlockBuffers {
            exists,
            value,
            value_compression: node.value_compression,
        });
    }

    Ok(ColumnBuffers { blocks })
}

/// A block's stored offset and length must stay inside its column's region.
fn check_block_region(
    offset: u64,
    length: u64,
    region_size: u64,
    region: &str,
) -> Result<(), FormatError> {
    let end = offset.checked_add(length).filter(|end| *end <= region_size);
    if end.is_none() {
        return Err(FormatError::Corrupt(format!(
            "block {} region [{} + {}] overruns its column's {} bytes",
            region, offset, length, region_size
        )));
    }
    Ok(())
}
