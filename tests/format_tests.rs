//! Whole-file trailer handling and on-disk layout pinning.
//!
//! The golden tests fix the byte layout readers and writers must agree on:
//! little-endian integers, LSB-first bitmaps, aligned value arrays, and the
//! `[footer][postscript][size byte]` trailer.

mod common;

use common::{run_async, MemorySource, TableBuilder};
use stripeline::format::{encode_bool_array, encode_value, encode_value_array};
use stripeline::{
    read_table_footer, Column, ColumnKind, FormatError, Postscript, ReaderError, TableSchema,
    Value,
};

fn int_schema() -> TableSchema {
    TableSchema::new(vec![Column::new("measure", ColumnKind::Int64)])
}

#[test]
fn test_postscript_golden_bytes() {
    let postscript = Postscript {
        version: 1,
        footer_length: 0x0102,
    };
    let mut buf = Vec::new();
    postscript.encode(&mut buf);

    // Magic, version, then the footer length as little-endian u64.
    assert_eq!(
        buf,
        vec![b'S', b'T', b'R', b'P', 1, 0x02, 0x01, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn test_bool_array_golden_bytes() {
    let mut buf = Vec::new();
    encode_bool_array(&[true, false, true, true, false, false, false, false, true], &mut buf);

    // LSB-first within each byte: rows 0,2,3 set -> 0b0000_1101.
    assert_eq!(buf, vec![0x0D, 0x01]);
}

#[test]
fn test_int32_array_golden_bytes() {
    let rows = vec![Some(Value::Int32(1)), None, Some(Value::Int32(-2))];
    let mut buf = Vec::new();
    encode_value_array(&rows, ColumnKind::Int32, &mut buf).unwrap();

    // Nulls take no space; each value is 4 bytes, already 4-aligned.
    assert_eq!(buf, vec![1, 0, 0, 0, 0xFE, 0xFF, 0xFF, 0xFF]);
}

#[test]
fn test_text_array_golden_bytes() {
    let rows = vec![Some(Value::Text("ab".into())), Some(Value::Text("c".into()))];
    let mut buf = Vec::new();
    encode_value_array(&rows, ColumnKind::Text, &mut buf).unwrap();

    // u32 length prefix plus payload, padded to 4-byte alignment.
    assert_eq!(
        buf,
        vec![2, 0, 0, 0, b'a', b'b', 0, 0, 1, 0, 0, 0, b'c', 0, 0, 0]
    );
}

#[test]
fn test_float64_golden_bytes() {
    let mut buf = Vec::new();
    encode_value(&Value::Float64(1.0), &mut buf).unwrap();
    assert_eq!(buf, 1.0f64.to_le_bytes());
}

#[test]
fn test_file_trailer_round_trip() {
    let mut builder = TableBuilder::new(int_schema(), 4);
    builder.stripe(&[vec![Some(Value::Int64(1))], vec![Some(Value::Int64(2))]]);
    builder.stripe(&[vec![Some(Value::Int64(3))]]);
    let source = builder.into_source();

    let footer = run_async(read_table_footer(&source)).unwrap().unwrap();
    assert_eq!(footer.block_row_count, 4);
    assert_eq!(footer.stripes.len(), 2);
    // Stripes are laid out back to back from the start of the file.
    assert_eq!(footer.stripes[0].file_offset, 0);
    assert_eq!(
        footer.stripes[1].file_offset,
        footer.stripes[0].file_offset
            + footer.stripes[0].skip_list_length
            + footer.stripes[0].data_length
            + footer.stripes[0].footer_length
    );
}

#[test]
fn test_footer_of_empty_table_has_no_stripes() {
    let source = TableBuilder::new(int_schema(), 4).into_source();
    let footer = run_async(read_table_footer(&source)).unwrap().unwrap();
    assert!(footer.stripes.is_empty());
}

#[test]
fn test_truncated_trailer_is_rejected() {
    let mut builder = TableBuilder::new(int_schema(), 4);
    builder.stripe(&[vec![Some(Value::Int64(1))]]);
    let mut file = builder.finish();
    // Drop the middle of the trailer: size byte survives, postscript loses a
    // byte, so the stored lengths no longer line up.
    file.remove(file.len() - 2);
    let source = MemorySource::new(file);

    let error = run_async(read_table_footer(&source)).unwrap_err();
    assert!(matches!(
        error,
        ReaderError::Format(_) | ReaderError::InvalidFooter(_)
    ));
}

#[test]
fn test_unknown_version_is_rejected() {
    let mut builder = TableBuilder::new(int_schema(), 4);
    builder.stripe(&[vec![Some(Value::Int64(1))]]);
    let mut file = builder.finish();
    // The version byte follows the 4-byte magic, 13 + 1 bytes from the end.
    let version_at = file.len() - 14 + 4;
    file[version_at] = 9;
    let source = MemorySource::new(file);

    let error = run_async(read_table_footer(&source)).unwrap_err();
    assert!(matches!(
        error,
        ReaderError::Format(FormatError::UnsupportedVersion(9))
    ));
}

#[test]
fn test_zeroed_trailer_is_rejected() {
    // A file of zeros has a zero size byte and an empty postscript.
    let source = MemorySource::new(vec![0u8; 64]);
    let error = run_async(read_table_footer(&source)).unwrap_err();
    assert!(matches!(error, ReaderError::Format(_)));
}
