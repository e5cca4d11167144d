use crate::bbi::rtree::Window;
use crate::bbi::{BBIFile, BedEntry, WigValue};
use crate::error::BBIError;
use crate::utils::parser::Parser;

const WIG_TYPE_BED_GRAPH: u8 = 1;
const WIG_TYPE_VARIABLE_STEP: u8 = 2;

const ZOOM_RECORD_SIZE: usize = 32;

/// Skip records that end at or before the window start. Records are sorted
/// within a block, so anything starting at or past the window end also ends
/// the scan (checked separately).
fn before_window(chrom_id: u32, end_base: i32, window: Window) -> bool {
    chrom_id < window.start_chrom
        || (chrom_id == window.start_chrom && end_base <= window.start_base)
}

fn past_window(chrom_id: u32, start_base: i32, window: Window) -> bool {
    chrom_id > window.end_chrom
        || (chrom_id == window.end_chrom && start_base >= window.end_base)
}

/// Decodes one full-resolution bigWig block. The 24-byte section header
/// declares one of three layouts: bedGraph triples, variableStep pairs, or
/// fixedStep singletons.
pub(crate) fn decode_wig_block(
    file: &BBIFile,
    data: &[u8],
    window: Window,
) -> Result<Vec<WigValue>, BBIError> {
    let mut decoded = Vec::new();
    let mut parser = Parser::new(data, file.endianness);

    let chrom_id = parser.read_u32()?;
    let mut start_base = parser.read_i32()?;
    let mut end_base = parser.read_i32()?;
    let item_step = parser.read_i32()?;
    let item_span = parser.read_i32()?;
    let section_type = parser.read_u8()?;
    let _reserved = parser.read_u8()?;
    let mut item_count = parser.read_u16()?;

    if chrom_id < window.start_chrom || chrom_id > window.end_chrom {
        return Ok(decoded);
    }
    let chrom = match file.chroms.name(chrom_id) {
        Some(name) => name.to_owned(),
        None => return Ok(decoded),
    };

    while item_count > 0 {
        item_count -= 1;

        let value = match section_type {
            WIG_TYPE_BED_GRAPH => {
                start_base = parser.read_i32()?;
                end_base = parser.read_i32()?;
                parser.read_f32()?
            }
            WIG_TYPE_VARIABLE_STEP => {
                start_base = parser.read_i32()?;
                let value = parser.read_f32()?;
                end_base = start_base + item_span;
                value
            }
            _ => {
                let value = parser.read_f32()?;
                end_base = start_base + item_span;
                value
            }
        };

        if past_window(chrom_id, start_base, window) {
            break;
        }
        if !before_window(chrom_id, end_base, window) {
            decoded.push(WigValue {
                chrom: chrom.clone(),
                start: start_base,
                end: end_base,
                value,
            });
        }

        if section_type != WIG_TYPE_BED_GRAPH && section_type != WIG_TYPE_VARIABLE_STEP {
            start_base += item_step;
        }
    }

    Ok(decoded)
}

/// Decodes one zoom-summary block: a dense array of 32-byte records. Each
/// record becomes a single point whose value is the bin mean
/// (`sum / valid_count`, zero for an empty bin).
pub(crate) fn decode_zoom_block(
    file: &BBIFile,
    data: &[u8],
    window: Window,
) -> Result<Vec<WigValue>, BBIError> {
    let mut decoded = Vec::new();
    let mut parser = Parser::new(data, file.endianness);

    for _ in 0..data.len() / ZOOM_RECORD_SIZE {
        let chrom_id = parser.read_u32()?;
        let start_base = parser.read_i32()?;
        let end_base = parser.read_i32()?;
        let valid_count = parser.read_u32()?;
        let _min_val = parser.read_f32()?;
        let _max_val = parser.read_f32()?;
        let sum = parser.read_f32()?;
        let _sum_squares = parser.read_f32()?;

        if chrom_id < window.start_chrom || chrom_id > window.end_chrom {
            continue;
        }
        if past_window(chrom_id, start_base, window) {
            break;
        }
        if before_window(chrom_id, end_base, window) {
            continue;
        }

        let chrom = match file.chroms.name(chrom_id) {
            Some(name) => name.to_owned(),
            None => continue,
        };
        let value = if valid_count > 0 {
            sum / valid_count as f32
        } else {
            0.0
        };
        decoded.push(WigValue {
            chrom,
            start: start_base,
            end: end_base,
            value,
        });
    }

    Ok(decoded)
}

/// Decodes one bigBed block: variable-length records terminated by the end
/// of the buffer. Records naming a chromosome outside the B+ tree are
/// skipped.
pub(crate) fn decode_bed_block(
    file: &BBIFile,
    data: &[u8],
    window: Window,
) -> Result<Vec<BedEntry>, BBIError> {
    let mut decoded = Vec::new();
    let mut parser = Parser::new(data, file.endianness);

    loop {
        let chrom_id = match parser.read_u32() {
            Ok(id) => id,
            Err(_) => break,
        };
        let start_base = match parser.read_i32() {
            Ok(v) => v,
            Err(_) => break,
        };
        let end_base = match parser.read_i32() {
            Ok(v) => v,
            Err(_) => break,
        };
        let rest = match parser.read_cstring(0) {
            Ok(s) => s,
            Err(_) => break,
        };

        let chrom = match file.chroms.name(chrom_id) {
            Some(name) => name.to_owned(),
            None => continue,
        };

        if before_window(chrom_id, end_base, window) {
            continue;
        }
        if past_window(chrom_id, start_base, window) {
            break;
        }

        decoded.push(BedEntry {
            chrom,
            start: start_base,
            end: end_base,
            rest,
        });
    }

    Ok(decoded)
}

/// A candidate cis-regulatory element: a bigBed entry whose `rest` column
/// carries seven fixed fields, with anything after them left in `rest`.
#[derive(Clone, Debug, PartialEq)]
pub struct CcreEntry {
    pub chrom: String,
    pub start: i32,
    pub end: i32,
    pub name: String,
    pub score: i32,
    pub strand: String,
    pub thick_start: i32,
    pub thick_end: i32,
    pub color: String,
    pub class: String,
    pub rest: String,
}

const CCRE_FIELDS: usize = 7;

/// Splits the `rest` column of cCRE-schema bigBed entries into typed
/// records.
pub fn parse_ccre(entries: &[BedEntry]) -> Result<Vec<CcreEntry>, BBIError> {
    entries
        .iter()
        .map(|entry| {
            let fields: Vec<&str> = entry.rest.split('\t').collect();
            if fields.len() < CCRE_FIELDS {
                return Err(BBIError::Decode(format!(
                    "expected at least {} fields, got {}",
                    CCRE_FIELDS,
                    fields.len()
                )));
            }
            let score: i32 = fields[1]
                .parse()
                .map_err(|_| BBIError::Decode(format!("unparsable score {:?}", fields[1])))?;
            let thick_start: i32 = fields[3].parse().map_err(|_| {
                BBIError::Decode(format!("unparsable thick start {:?}", fields[3]))
            })?;
            let thick_end: i32 = fields[4]
                .parse()
                .map_err(|_| BBIError::Decode(format!("unparsable thick end {:?}", fields[4])))?;

            Ok(CcreEntry {
                chrom: entry.chrom.clone(),
                start: entry.start,
                end: entry.end,
                name: fields[0].to_owned(),
                score,
                strand: fields[2].to_owned(),
                thick_start,
                thick_end,
                color: fields[5].to_owned(),
                class: fields[6].to_owned(),
                rest: fields[CCRE_FIELDS..].join("\t"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use byteorder::{LittleEndian, WriteBytesExt};
    use byteordered::Endianness;

    use super::*;
    use crate::bbi::{BBIHeader, BBIKind, ChromTree};

    fn test_file() -> BBIFile {
        let mut chroms = ChromTree {
            key_size: 8,
            ..ChromTree::default()
        };
        for (name, id) in [("chr1", 0u32), ("chr19", 1u32)] {
            chroms.chrom_to_id.insert(name.to_owned(), id);
            chroms.id_to_chrom.insert(id, name.to_owned());
            chroms.chrom_size.insert(name.to_owned(), 100_000_000);
        }
        BBIFile {
            url: "http://localhost/test.bw".to_owned(),
            kind: BBIKind::BigWig,
            endianness: Endianness::Little,
            header: BBIHeader {
                version: 4,
                zoom_levels: 0,
                field_count: 0,
                defined_field_count: 0,
                chrom_tree_offset: 0,
                full_data_offset: 0,
                full_index_offset: 0,
                auto_sql_offset: 0,
                total_summary_offset: 0,
                uncompress_buf_size: 0,
            },
            zoom_headers: Vec::new(),
            auto_sql: None,
            total_summary: None,
            chroms,
        }
    }

    fn window(chrom: u32, start: i32, end: i32) -> Window {
        Window {
            start_chrom: chrom,
            start_base: start,
            end_chrom: chrom,
            end_base: end,
        }
    }

    fn wig_section_header(
        out: &mut Vec<u8>,
        chrom_id: u32,
        start: i32,
        end: i32,
        step: i32,
        span: i32,
        section_type: u8,
        count: u16,
    ) {
        out.write_u32::<LittleEndian>(chrom_id).unwrap();
        out.write_i32::<LittleEndian>(start).unwrap();
        out.write_i32::<LittleEndian>(end).unwrap();
        out.write_i32::<LittleEndian>(step).unwrap();
        out.write_i32::<LittleEndian>(span).unwrap();
        out.write_u8(section_type).unwrap();
        out.write_u8(0).unwrap();
        out.write_u16::<LittleEndian>(count).unwrap();
    }

    #[test]
    fn bed_graph_section() {
        let mut block = Vec::new();
        wig_section_header(&mut block, 1, 100, 300, 0, 0, 1, 2);
        for (start, end, value) in [(100, 200, 1.5f32), (200, 300, 2.5)] {
            block.write_i32::<LittleEndian>(start).unwrap();
            block.write_i32::<LittleEndian>(end).unwrap();
            block.write_f32::<LittleEndian>(value).unwrap();
        }

        let file = test_file();
        let values = decode_wig_block(&file, &block, window(1, 0, 1000)).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].chrom, "chr19");
        assert_eq!(values[0].start, 100);
        assert_eq!(values[0].end, 200);
        assert_eq!(values[0].value, 1.5);
        assert_eq!(values[1].value, 2.5);
    }

    #[test]
    fn variable_step_section_derives_end() {
        let mut block = Vec::new();
        wig_section_header(&mut block, 1, 0, 0, 0, 25, 2, 2);
        for (start, value) in [(100, 0.5f32), (400, 0.75)] {
            block.write_i32::<LittleEndian>(start).unwrap();
            block.write_f32::<LittleEndian>(value).unwrap();
        }

        let file = test_file();
        let values = decode_wig_block(&file, &block, window(1, 0, 1000)).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].end, 125);
        assert_eq!(values[1].start, 400);
        assert_eq!(values[1].end, 425);
    }

    #[test]
    fn fixed_step_section_advances_start() {
        let mut block = Vec::new();
        wig_section_header(&mut block, 1, 1000, 1090, 30, 20, 3, 3);
        for value in [1.0f32, 2.0, 3.0] {
            block.write_f32::<LittleEndian>(value).unwrap();
        }

        let file = test_file();
        let values = decode_wig_block(&file, &block, window(1, 0, 10_000)).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(
            values.iter().map(|v| v.start).collect::<Vec<_>>(),
            vec![1000, 1030, 1060]
        );
        assert!(values.iter().all(|v| v.end == v.start + 20));
    }

    #[test]
    fn scan_stops_past_window_end() {
        let mut block = Vec::new();
        wig_section_header(&mut block, 1, 0, 0, 0, 0, 1, 3);
        for (start, end, value) in [(100, 200, 1.0f32), (500, 600, 2.0), (700, 800, 3.0)] {
            block.write_i32::<LittleEndian>(start).unwrap();
            block.write_i32::<LittleEndian>(end).unwrap();
            block.write_f32::<LittleEndian>(value).unwrap();
        }

        let file = test_file();
        let values = decode_wig_block(&file, &block, window(1, 0, 500)).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].start, 100);
    }

    #[test]
    fn point_ending_at_window_start_is_excluded() {
        let mut block = Vec::new();
        wig_section_header(&mut block, 1, 0, 0, 0, 0, 1, 2);
        for (start, end, value) in [(100, 200, 1.0f32), (200, 300, 2.0)] {
            block.write_i32::<LittleEndian>(start).unwrap();
            block.write_i32::<LittleEndian>(end).unwrap();
            block.write_f32::<LittleEndian>(value).unwrap();
        }

        let file = test_file();
        let values = decode_wig_block(&file, &block, window(1, 200, 400)).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].start, 200);
    }

    fn zoom_record(
        out: &mut Vec<u8>,
        chrom_id: u32,
        start: i32,
        end: i32,
        valid_count: u32,
        min: f32,
        max: f32,
        sum: f32,
        sum_squares: f32,
    ) {
        out.write_u32::<LittleEndian>(chrom_id).unwrap();
        out.write_i32::<LittleEndian>(start).unwrap();
        out.write_i32::<LittleEndian>(end).unwrap();
        out.write_u32::<LittleEndian>(valid_count).unwrap();
        out.write_f32::<LittleEndian>(min).unwrap();
        out.write_f32::<LittleEndian>(max).unwrap();
        out.write_f32::<LittleEndian>(sum).unwrap();
        out.write_f32::<LittleEndian>(sum_squares).unwrap();
    }

    #[test]
    fn zoom_records_round_trip() {
        let mut block = Vec::new();
        zoom_record(&mut block, 1, 0, 1000, 250, 0.0, 8.0, 500.0, 2000.0);
        zoom_record(&mut block, 1, 1000, 2000, 0, 0.0, 0.0, 0.0, 0.0);
        zoom_record(&mut block, 1, 2000, 3000, 100, 1.0, 4.0, 300.0, 950.0);

        let file = test_file();
        let values = decode_zoom_block(&file, &block, window(1, 0, 3000)).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].start, 0);
        assert_eq!(values[0].end, 1000);
        assert_eq!(values[0].value, 2.0);
        // Empty bin decodes to zero rather than NaN.
        assert_eq!(values[1].value, 0.0);
        assert_eq!(values[2].value, 3.0);
    }

    #[test]
    fn zoom_scan_respects_window() {
        let mut block = Vec::new();
        zoom_record(&mut block, 1, 0, 1000, 10, 0.0, 1.0, 10.0, 10.0);
        zoom_record(&mut block, 1, 5000, 6000, 10, 0.0, 1.0, 10.0, 10.0);

        let file = test_file();
        let values = decode_zoom_block(&file, &block, window(1, 1500, 4000)).unwrap();
        assert!(values.is_empty());
    }

    fn bed_record(out: &mut Vec<u8>, chrom_id: u32, start: i32, end: i32, rest: &str) {
        out.write_u32::<LittleEndian>(chrom_id).unwrap();
        out.write_i32::<LittleEndian>(start).unwrap();
        out.write_i32::<LittleEndian>(end).unwrap();
        out.extend_from_slice(rest.as_bytes());
        out.push(0);
    }

    #[test]
    fn bed_block_reads_until_exhausted() {
        let mut block = Vec::new();
        bed_record(&mut block, 1, 100, 200, "first\t850\t+");
        bed_record(&mut block, 1, 300, 400, "second\t425\t-");

        let file = test_file();
        let entries = decode_bed_block(&file, &block, window(1, 0, 1000)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rest, "first\t850\t+");
        assert_eq!(entries[1].start, 300);
    }

    #[test]
    fn bed_block_skips_unknown_chromosome() {
        let mut block = Vec::new();
        bed_record(&mut block, 9, 100, 200, "bogus");
        bed_record(&mut block, 1, 300, 400, "kept");

        let file = test_file();
        let entries = decode_bed_block(&file, &block, window(1, 0, 1000)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rest, "kept");
    }

    #[test]
    fn truncated_bed_record_ends_block() {
        let mut block = Vec::new();
        bed_record(&mut block, 1, 100, 200, "whole");
        block.extend_from_slice(&[1, 0, 0, 0, 44]); // partial record, no terminator

        let file = test_file();
        let entries = decode_bed_block(&file, &block, window(1, 0, 1000)).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn ccre_splits_seven_fields() {
        let entries = vec![BedEntry {
            chrom: "chr19".to_owned(),
            start: 44_905_754,
            end: 44_906_100,
            rest: "EH38E2156517\t620\t.\t44905754\t44906100\t255,0,0\tPLS\textra1\textra2"
                .to_owned(),
        }];
        let ccres = parse_ccre(&entries).unwrap();
        assert_eq!(ccres.len(), 1);
        let ccre = &ccres[0];
        assert_eq!(ccre.name, "EH38E2156517");
        assert_eq!(ccre.score, 620);
        assert_eq!(ccre.strand, ".");
        assert_eq!(ccre.thick_start, 44_905_754);
        assert_eq!(ccre.thick_end, 44_906_100);
        assert_eq!(ccre.color, "255,0,0");
        assert_eq!(ccre.class, "PLS");
        assert_eq!(ccre.rest, "extra1\textra2");
    }

    #[test]
    fn ccre_rejects_missing_fields() {
        let entries = vec![BedEntry {
            chrom: "chr19".to_owned(),
            start: 0,
            end: 10,
            rest: "name\t100\t+".to_owned(),
        }];
        assert!(matches!(
            parse_ccre(&entries),
            Err(BBIError::Decode(_))
        ));
    }

    #[test]
    fn ccre_rejects_bad_score() {
        let entries = vec![BedEntry {
            chrom: "chr19".to_owned(),
            start: 0,
            end: 10,
            rest: "name\tnot-a-number\t+\t0\t10\t0,0,0\tPLS".to_owned(),
        }];
        assert!(matches!(
            parse_ccre(&entries),
            Err(BBIError::Decode(_))
        ));
    }
}
