//! Block deserialization into row-addressable column data.
//!
//! A materialized block holds, for one column, `row_count` optional values
//! with `None` where the exists bit was clear. Each column keeps at most one
//! materialized block; materializing the next block replaces the previous
//! one's rows.

use crate::error::{FormatError, ReaderError};
use crate::format::{decode_bool_array, decode_value_array};
use crate::reader::stripe::StripeBuffers;
use crate::schema::{ColumnDefault, TableSchema, Value};

/// Deserialized rows of one block of one column.
///
/// Reused across block materializations within a stripe and cleared on
/// stripe transitions.
#[derive(Debug, Default)]
pub struct ColumnBlockData {
    rows: Vec<Option<Value>>,
}

impl ColumnBlockData {
    /// Empty block data, ready for the first materialization.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of materialized rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The value at `row`, `None` when the row is null or out of range.
    pub fn value(&self, row: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|value| value.as_ref())
    }

    /// Drop the materialized rows.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

/// Materialize one block for every projected column of a stripe.
///
/// `block_data` has one entry per table column: `Some` for projected columns
/// (overwritten here), `None` for the rest. A projected column with no
/// stored data in this stripe (added to the table after the stripe was
/// written) is filled from its default: a constant fills every row, no
/// default yields all-null rows, and an unreduced expression fails.
///
/// # Errors
/// - [`ReaderError::Codec`] when a value region fails to decompress
/// - [`ReaderError::Format`] when a buffer is shorter than its rows require
///   or `block_index` exceeds the stripe's stored blocks
/// - [`ReaderError::UnsupportedDefault`] for non-constant or mistyped
///   defaults
pub fn deserialize_block(
    stripe: &StripeBuffers,
    block_index: usize,
    row_count: usize,
    schema: &TableSchema,
    block_data: &mut [Option<ColumnBlockData>],
) -> Result<(), ReaderError> {
    for column_index in 0..stripe.column_count {
        let Some(data) = block_data[column_index].as_mut() else {
            continue;
        };

        match &stripe.columns[column_index] {
            Some(column) => {
                let Some(block) = column.blocks.get(block_index) else {
                    return Err(FormatError::Corrupt(format!(
                        "block {} requested from a column holding {}",
                        block_index,
                        column.blocks.len()
                    ))
                    .into());
                };
                let value_bytes = block.value_compression.decompress(&block.value)?;
                let exists = decode_bool_array(&block.exists, row_count)?;
                // Replaces the previous block's rows; its buffers drop here.
                data.rows =
                    decode_value_array(&value_bytes, &exists, schema.column_kind(column_index))?;
            }
            None => materialize_default(column_index, row_count, schema, data)?,
        }
    }
    Ok(())
}

/// Fill a schema-added column's rows from its default.
fn materialize_default(
    column_index: usize,
    row_count: usize,
    schema: &TableSchema,
    data: &mut ColumnBlockData,
) -> Result<(), ReaderError> {
    let column = &schema.columns[column_index];
    match &column.default {
        ColumnDefault::Constant(value) => {
            if value.kind() != column.kind {
                return Err(ReaderError::UnsupportedDefault {
                    column: column_index,
                    message: format!(
                        "constant default of kind {:?} for a {:?} column",
                        value.kind(),
                        column.kind
                    ),
                });
            }
            data.rows.clear();
            data.rows.resize(row_count, Some(value.clone()));
        }
        ColumnDefault::None => {
            data.rows.clear();
            data.rows.resize(row_count, None);
        }
        ColumnDefault::Expression(expression) => {
            return Err(ReaderError::UnsupportedDefault {
                column: column_index,
                message: format!("default expression '{}' is not a constant", expression),
            });
        }
    }
    Ok(())
}
