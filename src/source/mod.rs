//! Byte-range source abstractions
//!
//! This module provides the region-read capability the scan pipeline consumes:
//! an async range-request trait plus a local filesystem implementation.

mod local;
mod traits;

pub use local::LocalSource;
pub use traits::{BoxedSource, RegionSource};
