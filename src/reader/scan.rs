//! Pull-based row scan over a stripe file.
//!
//! `TableScan` drives the whole read pipeline. It loads the table footer up
//! front, then walks stripes one at a time (footer, skip lists, pruning, raw
//! buffers) and blocks one at a time (deserialization), yielding one row per
//! call. At any moment the scan holds at most one stripe's raw buffers and
//! one materialized block per projected column; both are released at the
//! respective transitions.

use std::sync::Arc;

use tracing::debug;

use crate::error::ReaderError;
use crate::format::{decode_column_skip_list, StripeMetadata, TableFooter};
use crate::predicate::{MinMaxEvaluator, Predicate, PredicateEvaluator};
use crate::reader::block::{deserialize_block, ColumnBlockData};
use crate::reader::footer::read_table_footer;
use crate::reader::stripe::{load_filtered_stripe, load_stripe_footer, StripeBuffers};
use crate::schema::{TableSchema, Value};
use crate::source::RegionSource;

/// One scanned row: a value per table column, `None` for nulls and for
/// columns outside the projection.
pub type Row = Vec<Option<Value>>;

/// Scan configuration: projection, predicates, and the pruning evaluator.
#[derive(Clone)]
pub struct ScanConfig {
    /// Column names to materialize; `None` projects every column.
    pub columns: Option<Vec<String>>,
    /// Conjunctive predicates used for block pruning.
    pub predicates: Vec<Predicate>,
    /// Evaluator deciding block refutation.
    pub evaluator: Arc<dyn PredicateEvaluator>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            columns: None,
            predicates: Vec::new(),
            evaluator: Arc::new(MinMaxEvaluator),
        }
    }
}

impl ScanConfig {
    /// A config that projects every column and prunes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Project only the named columns; everything else reads back as null.
    pub fn with_columns<I, T>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Add a pruning predicate. Predicates combine with AND semantics and
    /// must reference projected columns.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Replace the refutation evaluator. The default is [`MinMaxEvaluator`].
    pub fn with_evaluator(mut self, evaluator: Arc<dyn PredicateEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }
}

impl std::fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanConfig")
            .field("columns", &self.columns)
            .field("predicates", &self.predicates)
            .finish_non_exhaustive()
    }
}

/// A cursor yielding rows from a stripe file, one stripe at a time.
///
/// Dropping the scan releases everything it holds; there is no separate
/// close step.
pub struct TableScan<S: RegionSource> {
    source: S,
    schema: TableSchema,
    footer: Option<TableFooter>,
    projected: Vec<bool>,
    predicates: Vec<Predicate>,
    evaluator: Arc<dyn PredicateEvaluator>,
    /// Current stripe's raw buffers; `None` between stripes.
    stripe: Option<StripeBuffers>,
    /// Per-column materialized block; `None` for columns outside the
    /// projection.
    block_data: Vec<Option<ColumnBlockData>>,
    /// Stripes consumed so far, loaded or skipped.
    stripes_read: usize,
    /// Row offset within the current stripe.
    stripe_row_offset: u64,
    /// Index of the block currently materialized in `block_data`.
    deserialized_block: Option<usize>,
}

impl<S: RegionSource> TableScan<S> {
    /// Open a scan over `source`.
    ///
    /// The table footer is read immediately; a zero-length region opens as
    /// an already-exhausted scan. Column data is not touched until the first
    /// [`next_row`](Self::next_row) call.
    ///
    /// # Errors
    /// - [`ReaderError::UnknownColumn`] for a projected name missing from
    ///   the schema
    /// - [`ReaderError::Configuration`] for a predicate on an unprojected or
    ///   out-of-range column
    /// - footer loading errors per [`read_table_footer`]
    pub async fn open(
        source: S,
        schema: TableSchema,
        config: ScanConfig,
    ) -> Result<Self, ReaderError> {
        let projected = resolve_projection(&schema, config.columns.as_deref())?;
        validate_predicates(&schema, &projected, &config.predicates)?;

        let footer = read_table_footer(&source).await?;

        let block_data = projected
            .iter()
            .map(|&selected| selected.then(ColumnBlockData::new))
            .collect();

        debug!(
            columns = schema.column_count(),
            projected = projected.iter().filter(|&&p| p).count(),
            predicates = config.predicates.len(),
            stripes = footer.as_ref().map_or(0, |footer| footer.stripes.len()),
            "opened table scan"
        );

        Ok(Self {
            source,
            schema,
            footer,
            projected,
            predicates: config.predicates,
            evaluator: config.evaluator,
            stripe: None,
            block_data,
            stripes_read: 0,
            stripe_row_offset: 0,
            deserialized_block: None,
        })
    }

    /// The schema this scan reads against.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// The region source this scan reads from.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Whether every stripe has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.stripe.is_none()
            && self
                .footer
                .as_ref()
                .map_or(true, |footer| self.stripes_read == footer.stripes.len())
    }

    /// Fetch the next row.
    ///
    /// Returns `Ok(None)` once every stripe has been read. Stripes whose
    /// blocks are all pruned away are passed over without fetching any
    /// column data.
    pub async fn next_row(&mut self) -> Result<Option<Row>, ReaderError> {
        let Some(block_row_count) = self.footer.as_ref().map(|footer| footer.block_row_count)
        else {
            return Ok(None);
        };

        // A stripe can be physically non-empty yet contribute nothing after
        // pruning; keep consuming until one holds rows.
        while self.stripe.is_none() {
            if !self.load_next_stripe().await? {
                return Ok(None);
            }
        }

        let block_index = (self.stripe_row_offset / block_row_count) as usize;
        let block_row_index = (self.stripe_row_offset % block_row_count) as usize;

        let Some(stripe) = &self.stripe else {
            return Ok(None);
        };

        if self.deserialized_block != Some(block_index) {
            let block_rows = rows_in_block(stripe.row_count, block_row_count, block_index);
            deserialize_block(
                stripe,
                block_index,
                block_rows,
                &self.schema,
                &mut self.block_data,
            )?;
            self.deserialized_block = Some(block_index);
        }

        let mut row: Row = vec![None; stripe.column_count];
        for (column_index, data) in self.block_data.iter().enumerate() {
            if let Some(data) = data {
                row[column_index] = data.value(block_row_index).cloned();
            }
        }

        self.stripe_row_offset += 1;
        let stripe_exhausted = self.stripe_row_offset == stripe.row_count;
        if stripe_exhausted {
            // Stripe-scoped buffers die here; the next call loads fresh
            // ones.
            self.stripe = None;
        }

        Ok(Some(row))
    }

    /// Load the stripe at the consumed-stripe cursor.
    ///
    /// Returns `Ok(false)` once every stripe has been consumed. A stripe
    /// pruned down to zero rows is consumed without being installed.
    async fn load_next_stripe(&mut self) -> Result<bool, ReaderError> {
        let Some((metadata, block_row_count)) = self.footer.as_ref().and_then(|footer| {
            footer
                .stripes
                .get(self.stripes_read)
                .map(|stripe| (*stripe, footer.block_row_count))
        }) else {
            return Ok(false);
        };

        let buffers = load_filtered_stripe(
            &self.source,
            &metadata,
            &self.schema,
            block_row_count,
            &self.projected,
            &self.predicates,
            self.evaluator.as_ref(),
        )
        .await?;
        self.stripes_read += 1;

        if buffers.row_count > 0 {
            self.stripe = Some(buffers);
            self.stripe_row_offset = 0;
            self.deserialized_block = None;
            for data in self.block_data.iter_mut().flatten() {
                data.clear();
            }
        }
        Ok(true)
    }
}

impl<S: RegionSource> std::fmt::Debug for TableScan<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableScan")
            .field("schema", &self.schema)
            .field("projected", &self.projected)
            .field("predicates", &self.predicates)
            .field("stripes_read", &self.stripes_read)
            .field("stripe_row_offset", &self.stripe_row_offset)
            .finish_non_exhaustive()
    }
}

/// Rows in one block of a pruned stripe.
///
/// Every selected block is full except possibly the final one, which holds
/// the remainder. An exact multiple leaves no remainder and no short block.
fn rows_in_block(stripe_row_count: u64, block_row_count: u64, block_index: usize) -> usize {
    let last_block_index = (stripe_row_count / block_row_count) as usize;
    if block_index == last_block_index {
        (stripe_row_count % block_row_count) as usize
    } else {
        block_row_count as usize
    }
}

fn resolve_projection(
    schema: &TableSchema,
    columns: Option<&[String]>,
) -> Result<Vec<bool>, ReaderError> {
    match columns {
        None => Ok(vec![true; schema.column_count()]),
        Some(names) => {
            let mut projected = vec![false; schema.column_count()];
            for name in names {
                let index = schema
                    .column_index(name)
                    .ok_or_else(|| ReaderError::UnknownColumn(name.clone()))?;
                projected[index] = true;
            }
            Ok(projected)
        }
    }
}

/// Predicates may only reference projected columns: pruning consults the
/// same columns the scan materializes.
fn validate_predicates(
    schema: &TableSchema,
    projected: &[bool],
    predicates: &[Predicate],
) -> Result<(), ReaderError> {
    for predicate in predicates {
        if predicate.column >= schema.column_count() {
            return Err(ReaderError::Configuration(format!(
                "predicate references column {} but the table has {}",
                predicate.column,
                schema.column_count()
            )));
        }
        if !projected[predicate.column] {
            return Err(ReaderError::Configuration(format!(
                "predicate on column '{}' requires it to be projected",
                schema.columns[predicate.column].name
            )));
        }
    }
    Ok(())
}

/// Exact row count of a table from skip-list statistics alone.
///
/// Reads each stripe's footer and its first column's skip list, summing the
/// stored row counts: no pruning, no column data, no deserialization. A
/// zero-length region counts zero rows.
///
/// # Errors
/// Footer and skip-list decode failures, plus
/// [`ReaderError::Configuration`] when `schema` has no columns.
pub async fn table_row_count<S: RegionSource>(
    source: &S,
    schema: &TableSchema,
) -> Result<u64, ReaderError> {
    if schema.column_count() == 0 {
        return Err(ReaderError::Configuration(
            "table schema has no columns".to_string(),
        ));
    }
    let Some(footer) = read_table_footer(source).await? else {
        return Ok(0);
    };

    let mut total = 0u64;
    for stripe in &footer.stripes {
        total += stripe_row_count(source, stripe, schema).await?;
    }
    Ok(total)
}

/// Sum one stripe's row counts from its first column's skip list.
async fn stripe_row_count<S: RegionSource>(
    source: &S,
    stripe: &StripeMetadata,
    schema: &TableSchema,
) -> Result<u64, ReaderError> {
    use crate::error::FormatError;

    let stripe_footer = load_stripe_footer(source, stripe, schema.column_count()).await?;
    let first_column_size = stripe_footer.column_sizes[0].skip_list_size;
    if first_column_size > stripe.skip_list_length {
        return Err(FormatError::Corrupt(format!(
            "column 0 skip list overruns the stripe's {}-byte skip-list region",
            stripe.skip_list_length
        ))
        .into());
    }

    let bytes = source
        .read_range(stripe.file_offset, first_column_size as usize)
        .await?;
    let nodes = decode_column_skip_list(&bytes, schema.column_kind(0))?;
    Ok(nodes.iter().map(|node| node.row_count).sum())
}
