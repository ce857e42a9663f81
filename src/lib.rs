//! Stripe-oriented columnar file reader with block-level predicate pruning.
//!
//! Rows are stored column by column in stripes of a fixed row budget,
//! subdivided into blocks carrying min/max statistics. A [`TableScan`] pulls
//! rows from any range-addressable [`RegionSource`], skipping blocks whose
//! statistics refute the scan's predicates before their column data is ever
//! fetched.

pub mod codec;
pub mod error;
pub mod format;
pub mod predicate;
pub mod reader;
pub mod schema;
pub mod source;

// Re-export main types
pub use codec::Compression;
pub use error::{CodecError, FormatError, ReaderError, SourceError};
pub use format::{
    ColumnBlockSkipNode, ColumnSizes, Postscript, StripeFooter, StripeMetadata, StripeSkipList,
    TableFooter,
};
pub use predicate::{ColumnRange, CompareOp, MinMaxEvaluator, Predicate, PredicateEvaluator};
pub use reader::{read_table_footer, table_row_count, ColumnBlockData, Row, ScanConfig, TableScan};
pub use schema::{Column, ColumnDefault, ColumnKind, TableSchema, Value};
pub use source::{BoxedSource, LocalSource, RegionSource};
