//! Error types for columnar file reading

use std::io;
use thiserror::Error;

/// Errors raised while decoding on-disk structures
#[derive(Debug, Error)]
pub enum FormatError {
    /// Structurally invalid footer, stripe footer, or skip list
    #[error("Corrupt format: {0}")]
    Corrupt(String),
    /// A decode cursor ran past a buffer's declared length
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    /// Invalid magic bytes in the postscript
    #[error("Invalid magic bytes: expected 'STRP', found {0:?}")]
    InvalidMagic([u8; 4]),
    /// Unknown format version
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),
}

/// Errors raised by decompression
#[derive(Debug, Error)]
pub enum CodecError {
    /// Compression tag not defined by the format
    #[error("Unknown compression tag: {0}")]
    UnknownTag(u8),
    /// Codec known but not compiled in
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),
    /// Decompression failed
    #[error("Decompression error: {0}")]
    Decompression(String),
    /// Decompressed payload failed checksum validation
    #[error("Checksum mismatch: expected {expected:#010x}, found {found:#010x}")]
    ChecksumMismatch { expected: u32, found: u32 },
}

/// Errors raised by byte-range sources
#[derive(Debug, Error)]
pub enum SourceError {
    /// File system error
    #[error("File system error: {0}")]
    FileSystem(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Path not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// A range read returned fewer bytes than requested
    #[error("Short read at offset {offset}: requested {requested} bytes, got {returned}")]
    ShortRead {
        offset: u64,
        requested: usize,
        returned: usize,
    },
}

/// Top-level reader error type
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Source error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Format error
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Codec error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Postscript or footer failed its length validation
    #[error("Invalid footer: {0}")]
    InvalidFooter(String),

    /// A stripe claims more columns than the table has
    #[error("Schema mismatch: stripe has {stripe_columns} columns, table has {table_columns}")]
    SchemaMismatch {
        stripe_columns: usize,
        table_columns: usize,
    },

    /// A schema-added column's default is not a reducible constant
    #[error("Unsupported default for column {column}: {message}")]
    UnsupportedDefault { column: usize, message: String },

    /// A projected column name does not exist in the table
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}
