//! Shared fixtures: an in-memory region source and a stripe-file builder.
//!
//! The crate only reads stripe files, so the tests carry their own minimal
//! writer. `TableBuilder` assembles whole files from the crate's encode
//! primitives with the exact on-disk layout the reader expects: per stripe,
//! all column skip lists, then per column its exists regions followed by its
//! value regions, then the stripe footer; after the last stripe, the table
//! footer, postscript, and trailing size byte.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;

use stripeline::format::{
    encode_bool_array, encode_column_skip_list, encode_value_array, FORMAT_VERSION,
    POSTSCRIPT_LENGTH,
};
use stripeline::{
    ColumnBlockSkipNode, ColumnSizes, Compression, Postscript, RegionSource, SourceError,
    StripeFooter, StripeMetadata, TableFooter, TableSchema, Value,
};

/// In-memory byte region with exact-read semantics.
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl RegionSource for MemorySource {
    async fn read_range(&self, offset: u64, length: usize) -> Result<Bytes, SourceError> {
        let available = self.data.len().saturating_sub(offset as usize);
        if length > available {
            return Err(SourceError::ShortRead {
                offset,
                requested: length,
                returned: available,
            });
        }
        let start = offset as usize;
        Ok(Bytes::copy_from_slice(&self.data[start..start + length]))
    }

    async fn size(&self) -> Result<u64, SourceError> {
        Ok(self.data.len() as u64)
    }
}

/// Block a current-thread runtime on `future`.
pub fn run_async<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// Compress a value region the way a writer would.
///
/// Snappy framing is compressed body plus a trailing big-endian CRC32 of the
/// uncompressed data.
pub fn compress(data: &[u8], compression: Compression) -> Vec<u8> {
    match compression {
        Compression::None => data.to_vec(),
        Compression::Snappy => {
            let compressed = snap::raw::Encoder::new().compress_vec(data).unwrap();
            let crc = crc32fast::hash(data);
            let mut framed = compressed;
            framed.extend_from_slice(&crc.to_be_bytes());
            framed
        }
        Compression::Deflate => {
            use flate2::write::ZlibEncoder;
            use std::io::Write;

            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        Compression::Zstd => zstd::stream::encode_all(data, 0).unwrap(),
    }
}

/// Assembles complete stripe files row by row.
///
/// Each `stripe` call writes one stripe; the number of columns in its rows
/// sets the stripe's column count, so older, narrower stripes can sit next
/// to newer ones. `finish` appends the trailer and returns the file bytes.
pub struct TableBuilder {
    schema: TableSchema,
    block_row_count: u64,
    compression: Compression,
    file: Vec<u8>,
    stripes: Vec<StripeMetadata>,
}

impl TableBuilder {
    pub fn new(schema: TableSchema, block_row_count: u64) -> Self {
        Self {
            schema,
            block_row_count,
            compression: Compression::None,
            file: Vec::new(),
            stripes: Vec::new(),
        }
    }

    /// Compress value regions of stripes added after this call.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Append one stripe. Every row must have the same number of values,
    /// at most the schema's column count; values must match the column
    /// kinds or be `None`.
    pub fn stripe(&mut self, rows: &[Vec<Option<Value>>]) -> &mut Self {
        let stripe_columns = rows
            .first()
            .map_or(self.schema.column_count(), |row| row.len());
        assert!(stripe_columns >= 1, "a stripe needs at least one column");
        assert!(
            stripe_columns <= self.schema.column_count(),
            "stripe wider than the table schema"
        );
        for row in rows {
            assert_eq!(row.len(), stripe_columns, "ragged stripe rows");
        }

        let blocks: Vec<&[Vec<Option<Value>>]> =
            rows.chunks(self.block_row_count as usize).collect();

        let mut skip_lists = Vec::new();
        let mut data_regions = Vec::new();
        let mut column_sizes = Vec::new();

        for column_index in 0..stripe_columns {
            let kind = self.schema.column_kind(column_index);
            let mut nodes = Vec::new();
            let mut exists_region = Vec::new();
            let mut value_region = Vec::new();

            for block in &blocks {
                let column_rows: Vec<Option<Value>> =
                    block.iter().map(|row| row[column_index].clone()).collect();
                let exists: Vec<bool> =
                    column_rows.iter().map(|value| value.is_some()).collect();

                let exists_at = exists_region.len() as u64;
                encode_bool_array(&exists, &mut exists_region);

                let mut raw_values = Vec::new();
                encode_value_array(&column_rows, kind, &mut raw_values).unwrap();
                // Empty regions are stored as-is; compressing nothing only
                // adds framing.
                let (stored, value_compression) = if raw_values.is_empty() {
                    (raw_values, Compression::None)
                } else {
                    (compress(&raw_values, self.compression), self.compression)
                };
                let value_at = value_region.len() as u64;
                value_region.extend_from_slice(&stored);

                nodes.push(ColumnBlockSkipNode {
                    row_count: block.len() as u64,
                    min_max: block_min_max(&column_rows),
                    exists_block_offset: exists_at,
                    exists_length: exists_region.len() as u64 - exists_at,
                    value_block_offset: value_at,
                    value_length: stored.len() as u64,
                    value_compression,
                });
            }

            let mut skip_list = Vec::new();
            encode_column_skip_list(&nodes, &mut skip_list).unwrap();
            column_sizes.push(ColumnSizes {
                skip_list_size: skip_list.len() as u64,
                exists_size: exists_region.len() as u64,
                value_size: value_region.len() as u64,
            });
            skip_lists.push(skip_list);
            data_regions.push((exists_region, value_region));
        }

        let stripe_footer = StripeFooter { column_sizes };
        let mut footer_bytes = Vec::new();
        stripe_footer.encode(&mut footer_bytes);

        let file_offset = self.file.len() as u64;
        let skip_list_length: u64 = skip_lists.iter().map(|list| list.len() as u64).sum();
        let data_length: u64 = data_regions
            .iter()
            .map(|(exists, values)| (exists.len() + values.len()) as u64)
            .sum();

        for skip_list in &skip_lists {
            self.file.extend_from_slice(skip_list);
        }
        for (exists_region, value_region) in &data_regions {
            self.file.extend_from_slice(exists_region);
            self.file.extend_from_slice(value_region);
        }
        self.file.extend_from_slice(&footer_bytes);

        self.stripes.push(StripeMetadata {
            file_offset,
            skip_list_length,
            data_length,
            footer_length: footer_bytes.len() as u64,
        });
        self
    }

    /// Append the table footer, postscript, and size byte; return the file.
    pub fn finish(self) -> Vec<u8> {
        let mut file = self.file;
        let footer = TableFooter {
            block_row_count: self.block_row_count,
            stripes: self.stripes,
        };
        let mut footer_bytes = Vec::new();
        footer.encode(&mut footer_bytes);

        let postscript = Postscript {
            version: FORMAT_VERSION,
            footer_length: footer_bytes.len() as u64,
        };
        file.extend_from_slice(&footer_bytes);
        postscript.encode(&mut file);
        file.push(POSTSCRIPT_LENGTH as u8);
        file
    }

    /// Build a file and wrap it in a [`MemorySource`].
    pub fn into_source(self) -> MemorySource {
        MemorySource::new(self.finish())
    }
}

/// Min and max over a block's non-null values, absent for all-null blocks
/// and for kinds without an ordering.
fn block_min_max(rows: &[Option<Value>]) -> Option<(Value, Value)> {
    let mut present = rows.iter().flatten();
    let first = present.next()?;
    if !first.kind().is_ordered() {
        return None;
    }

    let mut minimum = first.clone();
    let mut maximum = first.clone();
    for value in present {
        if value.compare(&minimum) == Some(std::cmp::Ordering::Less) {
            minimum = value.clone();
        }
        if value.compare(&maximum) == Some(std::cmp::Ordering::Greater) {
            maximum = value.clone();
        }
    }
    Some((minimum, maximum))
}
