use std::sync::Arc;

use futures::future::try_join_all;
use parking_lot::RwLock;
use tracing::debug;

use crate::bbi::decode::{decode_bed_block, decode_wig_block, decode_zoom_block};
use crate::bbi::read::read_data;
use crate::bbi::rtree::Window;
use crate::bbi::{header, BBIFile, BBIKind, BedEntry, WigValue};
use crate::cache::lru::LruMap;
use crate::cache::range::{RangeCache, RangeEntry};
use crate::config::Settings;
use crate::error::BBIError;
use crate::utils::IoContext;
use crate::zoom::select_zoom_level;

type WigDecoder = fn(&BBIFile, &[u8], Window) -> Result<Vec<WigValue>, BBIError>;

/// The query engine over remote bigWig and bigBed files.
///
/// One instance owns the pooled HTTP client, the parsed-header cache, and
/// one range cache per file type. Construct it once at startup and share it
/// across requests; all methods take `&self`.
pub struct TrackService {
    io: IoContext,
    headers: RwLock<LruMap<Arc<BBIFile>>>,
    wig_ranges: RangeCache<WigValue>,
    bed_ranges: RangeCache<BedEntry>,
}

impl TrackService {
    pub fn new(settings: Settings) -> Result<TrackService, BBIError> {
        Ok(TrackService {
            io: IoContext::new(&settings)?,
            headers: RwLock::new(LruMap::new(settings.cache_size)),
            wig_ranges: RangeCache::new(settings.cache_size),
            bed_ranges: RangeCache::new(settings.cache_size),
        })
    }

    /// Builds a service from [`Settings::from_env`].
    pub fn from_env() -> Result<TrackService, BBIError> {
        TrackService::new(Settings::from_env())
    }

    /// Returns the bigWig values of `[start, end)` on `chrom`.
    ///
    /// A nonzero `width` (the render width in pixels) lets the query read
    /// from the file's zoom pyramid instead of full-resolution data when the
    /// window is wide enough. Only sub-ranges not already cached for this
    /// `(url, chrom, zoom)` are fetched, concurrently, and merged back into
    /// the cache.
    ///
    /// Points are filtered to those *starting* inside the window, so a value
    /// straddling `start` is not returned.
    pub async fn bigwig(
        &self,
        url: &str,
        chrom: &str,
        start: i32,
        end: i32,
        width: u32,
    ) -> Result<Vec<WigValue>, BBIError> {
        let file = self.open_handle(url, BBIKind::BigWig).await?;

        let zoom = select_zoom_level(&file.zoom_headers, end - start, width);
        let key = match zoom {
            Some(index) => format!("{}-{}-zoom{}", url, chrom, index),
            None => format!("{}-{}", url, chrom),
        };

        let (existing, gaps) = self.wig_ranges.probe(&key, start, end);
        debug!(
            url,
            chrom,
            start,
            end,
            ?zoom,
            cached = existing.len(),
            missing = gaps.len(),
            "bigwig query"
        );

        let decoder: WigDecoder = if zoom.is_some() {
            decode_zoom_block
        } else {
            decode_wig_block
        };

        let fetched = try_join_all(gaps.into_iter().map(|gap| {
            let file = Arc::clone(&file);
            async move {
                let data =
                    read_data(&self.io, &file, chrom, gap.start, gap.end, zoom, decoder).await?;
                Ok::<_, BBIError>(RangeEntry {
                    start: gap.start,
                    end: gap.end,
                    data,
                })
            }
        }))
        .await?;

        let mut combined = existing;
        combined.extend(fetched);
        let merged = self.wig_ranges.insert(key, combined);
        debug!(url, chrom, ranges = merged.len(), "bigwig cache updated");

        Ok(collect_window(&merged, start, end, |value: &WigValue| {
            value.start
        }))
    }

    /// Returns the bigBed entries of `[start, end)` on `chrom`, with the
    /// same caching, concurrency, and filtering behavior as [`Self::bigwig`].
    /// bigBed queries always read full-resolution data.
    pub async fn bigbed(
        &self,
        url: &str,
        chrom: &str,
        start: i32,
        end: i32,
    ) -> Result<Vec<BedEntry>, BBIError> {
        let file = self.open_handle(url, BBIKind::BigBed).await?;

        let key = format!("{}-{}", url, chrom);
        let (existing, gaps) = self.bed_ranges.probe(&key, start, end);
        debug!(
            url,
            chrom,
            start,
            end,
            cached = existing.len(),
            missing = gaps.len(),
            "bigbed query"
        );

        let fetched = try_join_all(gaps.into_iter().map(|gap| {
            let file = Arc::clone(&file);
            async move {
                let data = read_data(
                    &self.io,
                    &file,
                    chrom,
                    gap.start,
                    gap.end,
                    None,
                    decode_bed_block,
                )
                .await?;
                Ok::<_, BBIError>(RangeEntry {
                    start: gap.start,
                    end: gap.end,
                    data,
                })
            }
        }))
        .await?;

        let mut combined = existing;
        combined.extend(fetched);
        let merged = self.bed_ranges.insert(key, combined);
        debug!(url, chrom, ranges = merged.len(), "bigbed cache updated");

        Ok(collect_window(&merged, start, end, |entry: &BedEntry| {
            entry.start
        }))
    }

    /// Returns the cached handle for `url`, opening and caching it on a
    /// miss. The open happens outside the lock; when two requests race, the
    /// first cached handle wins.
    async fn open_handle(&self, url: &str, kind: BBIKind) -> Result<Arc<BBIFile>, BBIError> {
        if let Some(file) = self.headers.read().get(url).cloned() {
            return verify_kind(file, kind);
        }

        let opened = Arc::new(header::open(&self.io, url, kind).await?);
        let file = {
            let mut headers = self.headers.write();
            match headers.get(url).cloned() {
                Some(existing) => existing,
                None => {
                    headers.insert(url.to_owned(), Arc::clone(&opened));
                    opened
                }
            }
        };
        verify_kind(file, kind)
    }

    pub fn header_cache_len(&self) -> usize {
        self.headers.read().len()
    }

    pub fn wig_cache_len(&self) -> usize {
        self.wig_ranges.len()
    }

    pub fn wig_cache_keys(&self) -> Vec<String> {
        self.wig_ranges.keys()
    }

    pub fn bed_cache_len(&self) -> usize {
        self.bed_ranges.len()
    }

    pub fn bed_cache_keys(&self) -> Vec<String> {
        self.bed_ranges.keys()
    }
}

fn verify_kind(file: Arc<BBIFile>, kind: BBIKind) -> Result<Arc<BBIFile>, BBIError> {
    if file.kind == kind {
        Ok(file)
    } else {
        Err(BBIError::InvalidMagic(file.kind.magic()))
    }
}

/// Copies out the points of every stored entry intersecting the window,
/// keeping those that start inside it. The capacity guess is the total
/// point count, an upper bound on the result.
fn collect_window<T: Clone>(
    entries: &[RangeEntry<T>],
    start: i32,
    end: i32,
    start_of: impl Fn(&T) -> i32,
) -> Vec<T> {
    let total: usize = entries.iter().map(|entry| entry.data.len()).sum();
    let mut out = Vec::with_capacity(total);
    for entry in entries {
        if entry.end <= start || entry.start >= end {
            continue;
        }
        for point in &entry.data {
            let point_start = start_of(point);
            if point_start >= start && point_start < end {
                out.push(point.clone());
            }
        }
    }
    out
}
