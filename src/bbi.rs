pub(crate) mod decode;
pub(crate) mod header;
pub(crate) mod read;
pub(crate) mod rtree;

use std::collections::HashMap;

use byteordered::Endianness;

use crate::error::BBIError;

pub(crate) const BIGWIG_MAGIC: u32 = 0x888F_FC26;
pub(crate) const BIGBED_MAGIC: u32 = 0x8789_F2EB;

pub(crate) const CHROM_TREE_MAGIC: u32 = 0x78CA_8C91;
pub(crate) const CIR_TREE_MAGIC: u32 = 0x2468_ACE0;

pub(crate) const BBI_HEADER_SIZE: usize = 64;
pub(crate) const CIR_TREE_HEADER_SIZE: u64 = 48;

/// The type of bbi file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BBIKind {
    BigWig,
    BigBed,
}

impl BBIKind {
    pub(crate) fn magic(self) -> u32 {
        match self {
            BBIKind::BigWig => BIGWIG_MAGIC,
            BBIKind::BigBed => BIGBED_MAGIC,
        }
    }
}

/// Fixed header fields of a bbi file.
///
/// Offsets are internal; data access goes through the query API.
#[derive(Copy, Clone, Debug)]
pub struct BBIHeader {
    pub version: u16,
    pub zoom_levels: u16,
    pub field_count: u16,
    pub defined_field_count: u16,

    pub(crate) chrom_tree_offset: u64,
    pub(crate) full_data_offset: u64,
    pub(crate) full_index_offset: u64,
    pub(crate) auto_sql_offset: u64,
    pub(crate) total_summary_offset: u64,
    pub(crate) uncompress_buf_size: u32,
}

/// One precomputed zoom level. `reduction_level` is the number of bases
/// summarized per record. The table is kept with index 0 holding the finest
/// level, matching the reversed order the file writer uses.
#[derive(Copy, Clone, Debug, Default)]
pub struct ZoomHeader {
    pub index: usize,
    pub reduction_level: u32,
    pub data_offset: u64,
    pub index_offset: u64,
}

/// Whole-file summary statistics.
#[derive(Copy, Clone, Debug, Default)]
pub struct Summary {
    pub bases_covered: u64,
    pub min_val: f64,
    pub max_val: f64,
    pub sum: f64,
    pub sum_squares: f64,
}

/// The chromosome B+ tree: a bidirectional name/id mapping plus sizes.
/// IDs are the dense small integers the writer assigned; they are the sort
/// key of the R+ tree.
#[derive(Clone, Debug, Default)]
pub struct ChromTree {
    pub(crate) block_size: u32,
    pub(crate) key_size: u32,
    pub(crate) val_size: u32,
    pub(crate) item_count: u64,
    pub(crate) chrom_to_id: HashMap<String, u32>,
    pub(crate) id_to_chrom: HashMap<u32, String>,
    pub(crate) chrom_size: HashMap<String, u32>,
}

impl ChromTree {
    pub fn id(&self, chrom: &str) -> Option<u32> {
        self.chrom_to_id.get(chrom).copied()
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.id_to_chrom.get(&id).map(String::as_str)
    }

    pub fn size(&self, chrom: &str) -> Option<u32> {
        self.chrom_size.get(chrom).copied()
    }

    pub fn len(&self) -> usize {
        self.chrom_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chrom_to_id.is_empty()
    }
}

/// A fully parsed bbi file handle. Immutable once opened; shared across
/// queries for the same URL.
#[derive(Clone, Debug)]
pub struct BBIFile {
    pub url: String,
    pub kind: BBIKind,
    pub(crate) endianness: Endianness,
    pub header: BBIHeader,
    pub zoom_headers: Vec<ZoomHeader>,
    pub auto_sql: Option<String>,
    pub total_summary: Option<Summary>,
    pub chroms: ChromTree,
}

impl BBIFile {
    pub(crate) fn chrom_id(&self, chrom: &str) -> Result<u32, BBIError> {
        self.chroms
            .id(chrom)
            .ok_or_else(|| BBIError::UnknownChromosome(chrom.to_owned()))
    }
}

/// A single value in a bigWig file.
#[derive(Clone, Debug, PartialEq)]
pub struct WigValue {
    pub chrom: String,
    pub start: i32,
    pub end: i32,
    pub value: f32,
}

/// A single entry in a bigBed file. `rest` holds the tab-separated columns
/// after the chrom/start/end triple.
#[derive(Clone, Debug, PartialEq)]
pub struct BedEntry {
    pub chrom: String,
    pub start: i32,
    pub end: i32,
    pub rest: String,
}

pub use decode::{parse_ccre, CcreEntry};
