use tracing::trace;

use crate::bbi::rtree::{self, Window};
use crate::bbi::{BBIFile, CIR_TREE_HEADER_SIZE};
use crate::error::BBIError;
use crate::utils::IoContext;

/// Reads every point of one contiguous window: resolves the chromosome id,
/// walks the R+ tree (the full-resolution tree, or a zoom level's tree when
/// `zoom` is set), then fetches, inflates, and decodes each matching block.
pub(crate) async fn read_data<T, D>(
    io: &IoContext,
    file: &BBIFile,
    chrom: &str,
    start: i32,
    end: i32,
    zoom: Option<usize>,
    decode: D,
) -> Result<Vec<T>, BBIError>
where
    D: Fn(&BBIFile, &[u8], Window) -> Result<Vec<T>, BBIError>,
{
    let chrom_id = file.chrom_id(chrom)?;
    let window = Window {
        start_chrom: chrom_id,
        start_base: start,
        end_chrom: chrom_id,
        end_base: end,
    };

    let index_offset = match zoom {
        Some(index) => {
            file.zoom_headers
                .get(index)
                .ok_or_else(|| {
                    BBIError::MalformedFile(format!("zoom level {} out of range", index))
                })?
                .index_offset
        }
        None => file.header.full_index_offset,
    };
    let root_offset = index_offset + CIR_TREE_HEADER_SIZE;

    let leaves = rtree::search(io, &file.url, file.endianness, root_offset, window).await?;
    trace!(
        url = %file.url,
        chrom,
        start,
        end,
        blocks = leaves.len(),
        "located data blocks"
    );

    let compressed = file.header.uncompress_buf_size > 0;
    let mut decoded = Vec::new();
    for leaf in leaves {
        let raw = io
            .fetcher
            .fetch(&file.url, leaf.data_offset, leaf.data_size as usize)
            .await?;
        let block = io.inflate.decompress(&raw, compressed)?;
        decoded.extend(decode(file, &block, window)?);
    }

    Ok(decoded)
}
