use byteordered::Endianness;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use smallvec::SmallVec;

use crate::error::BBIError;
use crate::utils::parser::Parser;
use crate::utils::IoContext;

/// Nodes are fetched with a single 4 KiB request; only oversized nodes need
/// a second fetch for their items.
const NODE_PREFETCH_SIZE: usize = 4096;

const NODE_LEAF: u8 = 1;
const LEAF_ITEM_SIZE: usize = 32;
const CHILD_ITEM_SIZE: usize = 24;

/// The genomic window of one query, in R+ tree coordinates. Base bounds are
/// half-open; both chromosome ids are equal for a single-chrom query.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Window {
    pub(crate) start_chrom: u32,
    pub(crate) start_base: i32,
    pub(crate) end_chrom: u32,
    pub(crate) end_base: i32,
}

/// A leaf of the R+ tree: the extent and location of one data block.
#[derive(Copy, Clone, Debug)]
pub(crate) struct RTreeLeaf {
    pub(crate) start_chrom: u32,
    pub(crate) start_base: u32,
    pub(crate) end_chrom: u32,
    pub(crate) end_base: u32,
    pub(crate) data_offset: u64,
    pub(crate) data_size: u64,
}

/// Collects every leaf under `node_offset` whose extent overlaps `window`.
/// Children of an internal node are descended concurrently; the first
/// failure fails the whole traversal.
pub(crate) fn search<'a>(
    io: &'a IoContext,
    url: &'a str,
    endianness: Endianness,
    node_offset: u64,
    window: Window,
) -> BoxFuture<'a, Result<Vec<RTreeLeaf>, BBIError>> {
    async move {
        let prefetch = io.fetcher.fetch(url, node_offset, NODE_PREFETCH_SIZE).await?;

        let mut parser = Parser::new(&prefetch, endianness);
        let is_leaf = parser.read_u8()?;
        let _reserved = parser.read_u8()?;
        let count = parser.read_u16()? as usize;

        let item_size = if is_leaf == NODE_LEAF {
            LEAF_ITEM_SIZE
        } else {
            CHILD_ITEM_SIZE
        };
        let required = count * item_size;

        // The common case: the whole node fits in the prefetch buffer.
        let node_data = if 4 + required <= NODE_PREFETCH_SIZE {
            prefetch.slice(4..4 + required)
        } else {
            io.fetcher.fetch(url, node_offset + 4, required).await?
        };
        let mut parser = Parser::new(&node_data, endianness);

        if is_leaf == NODE_LEAF {
            let mut leaves = Vec::new();
            for _ in 0..count {
                let leaf = RTreeLeaf {
                    start_chrom: parser.read_u32()?,
                    start_base: parser.read_u32()?,
                    end_chrom: parser.read_u32()?,
                    end_base: parser.read_u32()?,
                    data_offset: parser.read_u64()?,
                    data_size: parser.read_u64()?,
                };
                if overlaps(
                    leaf.start_chrom,
                    leaf.start_base,
                    leaf.end_chrom,
                    leaf.end_base,
                    window,
                ) {
                    leaves.push(leaf);
                }
            }
            Ok(leaves)
        } else {
            let mut children: SmallVec<[u64; 4]> = SmallVec::new();
            for _ in 0..count {
                let start_chrom = parser.read_u32()?;
                let start_base = parser.read_u32()?;
                let end_chrom = parser.read_u32()?;
                let end_base = parser.read_u32()?;
                let child_offset = parser.read_u64()?;
                if overlaps(start_chrom, start_base, end_chrom, end_base, window) {
                    children.push(child_offset);
                }
            }

            let results = try_join_all(
                children
                    .into_iter()
                    .map(|child| search(io, url, endianness, child, window)),
            )
            .await?;
            Ok(results.into_iter().flatten().collect())
        }
    }
    .boxed()
}

/// Overlap between a node extent and the query window, comparing
/// `(chrom, base)` pairs lexicographically with exclusive end bounds.
fn overlaps(
    start_chrom: u32,
    start_base: u32,
    end_chrom: u32,
    end_base: u32,
    window: Window,
) -> bool {
    let q_start = (window.start_chrom, window.start_base as u32);
    let q_end = (window.end_chrom, window.end_base as u32);
    // Node ends at or before the window starts, or starts at or after it ends.
    if (end_chrom, end_base) <= q_start {
        return false;
    }
    if (start_chrom, start_base) >= q_end {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start_chrom: u32, start: i32, end_chrom: u32, end: i32) -> Window {
        Window {
            start_chrom,
            start_base: start,
            end_chrom,
            end_base: end,
        }
    }

    #[test]
    fn overlapping_extent() {
        assert!(overlaps(0, 100, 0, 200, window(0, 150, 0, 250)));
        assert!(overlaps(0, 100, 0, 200, window(0, 0, 0, 101)));
    }

    #[test]
    fn touching_extents_do_not_overlap() {
        // Node [100, 200) vs window [200, 300): exclusive at the boundary.
        assert!(!overlaps(0, 100, 0, 200, window(0, 200, 0, 300)));
        assert!(!overlaps(0, 300, 0, 400, window(0, 200, 0, 300)));
    }

    #[test]
    fn chromosome_ordering_dominates() {
        // A node spanning the end of chr0 into chr1 overlaps a chr1 window.
        assert!(overlaps(0, 5000, 1, 100, window(1, 0, 1, 50)));
        // A node wholly on chr0 does not.
        assert!(!overlaps(0, 0, 0, 5000, window(1, 0, 1, 50)));
    }
}
