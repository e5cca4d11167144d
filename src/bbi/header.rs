use byteordered::Endianness;
use tracing::debug;

use crate::bbi::{
    BBIFile, BBIHeader, BBIKind, ChromTree, Summary, ZoomHeader, BBI_HEADER_SIZE,
    CHROM_TREE_MAGIC, CIR_TREE_MAGIC,
};
use crate::error::BBIError;
use crate::utils::parser::Parser;
use crate::utils::IoContext;

/// Opens a remote bbi file: parses the fixed header, the zoom-level table,
/// the total summary, and the chromosome B+ tree, and verifies the R+ tree
/// magic. Two range requests cover the whole metadata region.
pub(crate) async fn open(io: &IoContext, url: &str, kind: BBIKind) -> Result<BBIFile, BBIError> {
    let head = io.fetcher.fetch(url, 0, BBI_HEADER_SIZE).await?;

    // The magic at offset 0 decides the endianness of every later read.
    let mut parser = Parser::new(&head, Endianness::Little);
    let magic = parser.read_u32()?;
    let endianness = if magic == kind.magic() {
        Endianness::Little
    } else {
        let mut parser = Parser::new(&head, Endianness::Big);
        let be_magic = parser.read_u32()?;
        if be_magic != kind.magic() {
            return Err(BBIError::InvalidMagic(magic));
        }
        Endianness::Big
    };

    let mut parser = Parser::new(&head, endianness);
    parser.seek(4);
    let version = parser.read_u16()?;
    let zoom_levels = parser.read_u16()?;
    let chrom_tree_offset = parser.read_u64()?;
    let full_data_offset = parser.read_u64()?;
    let full_index_offset = parser.read_u64()?;
    let field_count = parser.read_u16()?;
    let defined_field_count = parser.read_u16()?;
    let auto_sql_offset = parser.read_u64()?;
    let total_summary_offset = parser.read_u64()?;
    let uncompress_buf_size = parser.read_u32()?;

    let header = BBIHeader {
        version,
        zoom_levels,
        field_count,
        defined_field_count,
        chrom_tree_offset,
        full_data_offset,
        full_index_offset,
        auto_sql_offset,
        total_summary_offset,
        uncompress_buf_size,
    };

    debug!(url, version, zoom_levels, "parsed bbi header");

    // Everything between the fixed header and the full data section is
    // fetched as one slab and parsed in place.
    let slab_len = header
        .full_data_offset
        .checked_sub(BBI_HEADER_SIZE as u64)
        .ok_or_else(|| {
            BBIError::MalformedFile(format!(
                "full data offset {} precedes the fixed header",
                header.full_data_offset
            ))
        })? as usize
        + 5;
    let slab = io.fetcher.fetch(url, BBI_HEADER_SIZE as u64, slab_len).await?;
    let mut parser = Parser::new(&slab, endianness);

    // The writer stores the zoom table back to front: the first entry on
    // disk lands in the last slot, leaving index 0 as the finest level.
    let mut zoom_headers = vec![ZoomHeader::default(); header.zoom_levels as usize];
    for i in 1..=header.zoom_levels as usize {
        let slot = header.zoom_levels as usize - i;
        let reduction_level = parser.read_u32()?;
        let _reserved = parser.read_u32()?;
        let data_offset = parser.read_u64()?;
        let index_offset = parser.read_u64()?;
        zoom_headers[slot] = ZoomHeader {
            index: slot,
            reduction_level,
            data_offset,
            index_offset,
        };
    }

    let auto_sql = if header.auto_sql_offset != 0 {
        parser.seek(slab_offset(header.auto_sql_offset)?);
        Some(parser.read_cstring(0)?)
    } else {
        None
    };

    let total_summary = if header.total_summary_offset != 0 {
        parser.seek(slab_offset(header.total_summary_offset)?);
        Some(Summary {
            bases_covered: parser.read_u64()?,
            min_val: parser.read_f64()?,
            max_val: parser.read_f64()?,
            sum: parser.read_f64()?,
            sum_squares: parser.read_f64()?,
        })
    } else {
        None
    };

    parser.seek(slab_offset(header.chrom_tree_offset)?);
    let chrom_magic = parser.read_u32()?;
    if chrom_magic != CHROM_TREE_MAGIC {
        return Err(BBIError::MalformedFile(format!(
            "chromosome B+ tree not found at offset {}",
            header.chrom_tree_offset
        )));
    }

    let mut chroms = ChromTree {
        block_size: parser.read_u32()?,
        key_size: parser.read_u32()?,
        val_size: parser.read_u32()?,
        item_count: parser.read_u64()?,
        ..ChromTree::default()
    };
    let _reserved = parser.read_u64()?;
    read_chrom_tree_node(&mut parser, &mut chroms, None)?;

    // The full R+ tree itself is only walked at query time; just confirm
    // its magic is where the header says it is.
    let index_head = io.fetcher.fetch(url, header.full_index_offset, 4).await?;
    let mut parser = Parser::new(&index_head, endianness);
    if parser.read_u32()? != CIR_TREE_MAGIC {
        return Err(BBIError::MalformedFile(format!(
            "R+ tree not found at offset {}",
            header.full_index_offset
        )));
    }

    debug!(url, chroms = chroms.len(), "opened bbi file");

    Ok(BBIFile {
        url: url.to_owned(),
        kind,
        endianness,
        header,
        zoom_headers,
        auto_sql,
        total_summary,
        chroms,
    })
}

/// Translates an absolute file offset into the metadata slab, which starts
/// right after the 64-byte fixed header.
fn slab_offset(file_offset: u64) -> Result<usize, BBIError> {
    file_offset
        .checked_sub(BBI_HEADER_SIZE as u64)
        .map(|o| o as usize)
        .ok_or_else(|| {
            BBIError::MalformedFile(format!(
                "offset {} precedes the fixed header",
                file_offset
            ))
        })
}

/// Recursively walks the chromosome B+ tree within the metadata slab.
/// Child offsets are absolute file offsets; the cursor is saved and
/// restored around each descent.
fn read_chrom_tree_node(
    parser: &mut Parser<'_>,
    tree: &mut ChromTree,
    offset: Option<usize>,
) -> Result<(), BBIError> {
    if let Some(offset) = offset {
        parser.seek(offset);
    }

    let is_leaf = parser.read_u8()?;
    let _reserved = parser.read_u8()?;
    let count = parser.read_u16()?;

    if is_leaf == 1 {
        for _ in 0..count {
            let name = parser.read_fixed_string(tree.key_size as usize)?;
            let chrom_id = parser.read_u32()?;
            let chrom_size = parser.read_u32()?;
            tree.chrom_to_id.insert(name.clone(), chrom_id);
            tree.id_to_chrom.insert(chrom_id, name.clone());
            tree.chrom_size.insert(name, chrom_size);
        }
    } else {
        for _ in 0..count {
            parser.read_fixed_string(tree.key_size as usize)?;
            let child_offset = parser.read_u64()?;
            let child = slab_offset(child_offset)?;
            let saved = parser.position();
            read_chrom_tree_node(parser, tree, Some(child))?;
            parser.seek(saved);
        }
    }

    Ok(())
}
