//! The read pipeline, from raw byte regions to scanned rows.
//!
//! Reading proceeds in layers: [`read_table_footer`] locates and validates
//! the table's metadata, the stripe loader fetches skip lists and raw column
//! buffers, the pruner drops blocks whose statistics refute the scan's
//! predicates, the block deserializer materializes row-addressable values,
//! and [`TableScan`] drives the whole thing one row at a time.

mod block;
mod footer;
mod prune;
mod scan;
mod stripe;

pub use block::{deserialize_block, ColumnBlockData};
pub use footer::read_table_footer;
pub use prune::selected_block_mask;
pub use scan::{table_row_count, Row, ScanConfig, TableScan};
pub use stripe::{ColumnBlockBuffers, ColumnBuffers, StripeBuffers};
