//! Table footer location and loading.
//!
//! All of a table's metadata hangs off the end of its file region: the last
//! byte stores the postscript size, the postscript stores the footer length,
//! and the footer describes every stripe. Loading walks these hops backward,
//! validating each stored length against the file length before reading.

use tracing::debug;

use crate::error::ReaderError;
use crate::format::{Postscript, TableFooter, POSTSCRIPT_SIZE_LENGTH};
use crate::source::RegionSource;

/// Load the table footer from the trailing region of `source`.
///
/// Returns `Ok(None)` for a zero-length region: a table that has never been
/// written has no trailer at all. Any other length must hold a complete,
/// self-consistent trailer.
///
/// # Errors
/// - [`ReaderError::InvalidFooter`] when a stored length points outside the
///   file or a stripe extends past the data region
/// - [`ReaderError::Format`] when the postscript or footer bytes are invalid
/// - [`ReaderError::Source`] when a read fails
pub async fn read_table_footer<S: RegionSource>(
    source: &S,
) -> Result<Option<TableFooter>, ReaderError> {
    let file_length = source.size().await?;
    if file_length == 0 {
        return Ok(None);
    }

    let size_length = POSTSCRIPT_SIZE_LENGTH as u64;
    let size_byte = source
        .read_range(file_length - size_length, POSTSCRIPT_SIZE_LENGTH)
        .await?;
    let postscript_size = u64::from(size_byte[0]);

    if postscript_size + size_length > file_length {
        return Err(ReaderError::InvalidFooter(format!(
            "postscript of {} bytes does not fit in a {}-byte file",
            postscript_size, file_length
        )));
    }

    let postscript_offset = file_length - size_length - postscript_size;
    let postscript_bytes = source
        .read_range(postscript_offset, postscript_size as usize)
        .await?;
    let postscript = Postscript::decode(&postscript_bytes)?;

    let footer_length = postscript.footer_length;
    let trailer_length = footer_length
        .checked_add(postscript_size + size_length)
        .filter(|trailer| *trailer <= file_length);
    if trailer_length.is_none() {
        return Err(ReaderError::InvalidFooter(format!(
            "footer of {} bytes does not fit ahead of the postscript",
            footer_length
        )));
    }

    let footer_offset = postscript_offset - footer_length;
    let footer_bytes = source
        .read_range(footer_offset, footer_length as usize)
        .await?;
    let footer = TableFooter::decode(&footer_bytes)?;

    // Everything before the footer is the data region; no stripe may reach
    // into the trailer.
    let data_region_length = footer_offset;
    for (index, stripe) in footer.stripes.iter().enumerate() {
        let extent = stripe
            .skip_list_length
            .checked_add(stripe.data_length)
            .and_then(|length| length.checked_add(stripe.footer_length))
            .and_then(|length| stripe.file_offset.checked_add(length))
            .filter(|end| *end <= data_region_length);
        if extent.is_none() {
            return Err(ReaderError::InvalidFooter(format!(
                "stripe {} extends past the {}-byte data region",
                index, data_region_length
            )));
        }
    }

    debug!(
        stripes = footer.stripes.len(),
        block_row_count = footer.block_row_count,
        "loaded table footer"
    );

    Ok(Some(footer))
}
