//! Tests against publicly hosted tracks. These hit the network, so they are
//! ignored by default; run with `cargo test -- --ignored`.

use bbiserve::{parse_ccre, resample_to_width, BBIError, Settings, TrackService};

const BIGWIG_URL: &str = "https://downloads.wenglab.org/DNAse_All_ENCODE_MAR20_2024_merged.bw";
const BIGBED_URL: &str = "https://downloads.wenglab.org/GRCh38-cCREs.DCC.bigBed";

fn service() -> TrackService {
    TrackService::new(Settings::default()).unwrap()
}

#[ignore]
#[tokio::test]
async fn known_bigwig_point() {
    let service = service();
    let values = service
        .bigwig(BIGWIG_URL, "chr19", 44_905_740, 44_905_760, 0)
        .await
        .unwrap();

    assert!(!values.is_empty());
    let first = &values[0];
    assert_eq!(first.chrom, "chr19");
    assert_eq!(first.start, 44_905_740);
    assert_eq!(first.end, 44_905_760);
    assert!((first.value - 610.4453).abs() < 1e-3);
}

#[ignore]
#[tokio::test]
async fn bigwig_region_stays_in_window() {
    let service = service();
    let values = service
        .bigwig(BIGWIG_URL, "chr19", 44_905_000, 44_916_000, 0)
        .await
        .unwrap();

    assert!(!values.is_empty());
    for value in &values {
        assert_eq!(value.chrom, "chr19");
        assert!(value.start >= 44_905_000 && value.start < 44_916_000);
    }
}

#[ignore]
#[tokio::test]
async fn bigwig_zoomed_query_resamples() {
    let service = service();
    let values = service
        .bigwig(BIGWIG_URL, "chr19", 0, 58_000_000, 800)
        .await
        .unwrap();
    assert!(!values.is_empty());

    let bins = resample_to_width(&values, 800);
    assert_eq!(bins.len(), 800);
    for bin in &bins {
        assert!(bin.min <= bin.max);
    }
}

#[ignore]
#[tokio::test]
async fn bigwig_empty_region() {
    let service = service();
    let values = service.bigwig(BIGWIG_URL, "chr1", 1, 100, 0).await.unwrap();
    assert!(values.is_empty());
}

#[ignore]
#[tokio::test]
async fn bigwig_invalid_chromosome() {
    let service = service();
    let result = service
        .bigwig(BIGWIG_URL, "chrINVALID", 1000, 2000, 0)
        .await;
    assert!(matches!(result, Err(BBIError::UnknownChromosome(_))));
}

#[ignore]
#[tokio::test]
async fn bigwig_overlapping_queries_share_cache() {
    let service = service();
    let first = service
        .bigwig(BIGWIG_URL, "chr19", 44_905_000, 44_910_000, 0)
        .await
        .unwrap();
    // The second window overlaps the first; only the tail is fetched, and
    // both queries are answered from a single merged cache entry.
    let second = service
        .bigwig(BIGWIG_URL, "chr19", 44_907_000, 44_916_000, 0)
        .await
        .unwrap();

    assert_eq!(service.wig_cache_len(), 1);
    assert_eq!(service.header_cache_len(), 1);
    for value in &second {
        assert!(value.start >= 44_907_000 && value.start < 44_916_000);
    }
    assert!(!first.is_empty());
}

#[ignore]
#[tokio::test]
async fn bigbed_ccre_region() {
    let service = service();
    let entries = service
        .bigbed(BIGBED_URL, "chr19", 44_905_754, 44_907_754)
        .await
        .unwrap();

    assert!(!entries.is_empty());
    for entry in &entries {
        assert_eq!(entry.chrom, "chr19");
        assert!(entry.start < 44_907_754 && entry.end > 44_905_754);
    }

    let ccres = parse_ccre(&entries).unwrap();
    assert_eq!(ccres.len(), entries.len());
    for ccre in &ccres {
        assert!(!ccre.name.is_empty());
        assert!(!ccre.class.is_empty());
    }
}

#[ignore]
#[tokio::test]
async fn bigbed_invalid_url() {
    let service = service();
    let result = service
        .bigbed("https://invalid.example.com/nonexistent.bb", "chr1", 0, 1000)
        .await;
    assert!(result.is_err());
}

#[ignore]
#[tokio::test]
async fn wrong_kind_for_url() {
    let service = service();
    let result = service.bigbed(BIGWIG_URL, "chr19", 44_905_000, 44_906_000).await;
    assert!(matches!(result, Err(BBIError::InvalidMagic(_))));
}
