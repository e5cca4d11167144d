use crate::bbi::{WigValue, ZoomHeader};

/// Queries rendering fewer than this many bases per pixel stay at full
/// resolution.
const ZOOM_THRESHOLD: f64 = 2.0;

/// Picks the coarsest zoom level whose reduction does not exceed the
/// request's bases-per-pixel, or `None` for full resolution.
///
/// `zoom_headers` is ordered by non-decreasing reduction level; ties go to
/// the larger index.
pub fn select_zoom_level(zoom_headers: &[ZoomHeader], span: i32, width: u32) -> Option<usize> {
    if width == 0 || zoom_headers.is_empty() {
        return None;
    }

    let bases_per_pixel = span as f64 / width as f64;
    if bases_per_pixel < ZOOM_THRESHOLD {
        return None;
    }

    let mut best: Option<usize> = None;
    for (index, header) in zoom_headers.iter().enumerate() {
        if header.reduction_level as f64 <= bases_per_pixel {
            match best {
                Some(chosen) if zoom_headers[chosen].reduction_level > header.reduction_level => {}
                _ => best = Some(index),
            }
        }
    }
    best
}

/// One display bin produced by [`resample_to_width`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PixelBin {
    pub x: u32,
    pub min: f32,
    pub max: f32,
}

/// Projects full-resolution points onto exactly `width` min/max bins over
/// the genomic span the points cover. A point touching a bin's boundary
/// contributes to that bin. Bins with no data carry the last seen value
/// forward (or the next available value at the left edge).
pub fn resample_to_width(data: &[WigValue], width: u32) -> Vec<PixelBin> {
    if data.is_empty() || width == 0 {
        return Vec::new();
    }
    let width = width as usize;

    let range_start = data[0].start;
    let range_end = data[data.len() - 1].end;
    let total = (range_end - range_start) as f64;
    if total <= 0.0 {
        return Vec::new();
    }
    let bin_size = total / width as f64;

    struct BinState {
        has_data: bool,
        min: f32,
        max: f32,
    }
    let mut bins: Vec<BinState> = (0..width)
        .map(|_| BinState {
            has_data: false,
            min: 0.0,
            max: 0.0,
        })
        .collect();

    for point in data {
        let first_bin =
            (((point.start - range_start) as f64 / bin_size) as isize).clamp(0, width as isize - 1)
                as usize;
        let last_bin =
            (((point.end - range_start) as f64 / bin_size) as isize).clamp(0, width as isize - 1)
                as usize;

        for bin in &mut bins[first_bin..=last_bin] {
            if !bin.has_data {
                bin.has_data = true;
                bin.min = point.value;
                bin.max = point.value;
            } else {
                bin.min = bin.min.min(point.value);
                bin.max = bin.max.max(point.value);
            }
        }
    }

    let mut out = Vec::with_capacity(width);
    let mut last_value: Option<f32> = None;
    for (x, bin) in bins.iter().enumerate() {
        if bin.has_data {
            out.push(PixelBin {
                x: x as u32,
                min: bin.min,
                max: bin.max,
            });
            last_value = Some(bin.max);
        } else {
            // Forward fill, or look ahead when nothing has been seen yet.
            let fill = last_value.unwrap_or_else(|| {
                bins[x + 1..]
                    .iter()
                    .find(|b| b.has_data)
                    .map(|b| b.max)
                    .unwrap_or(0.0)
            });
            out.push(PixelBin {
                x: x as u32,
                min: fill,
                max: fill,
            });
        }
    }
    out
}
