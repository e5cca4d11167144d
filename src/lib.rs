/*!
Bbiserve answers genomic window queries against bigWig and bigBed files
hosted at arbitrary HTTP URLs, fetching only the byte ranges a query needs.

The file format is defined in this paper: <https://doi.org/10.1093/bioinformatics/btq351>

## Querying

Construct a [`TrackService`] once and share it. Each query names a file URL,
a chromosome, and a half-open base window:

```no_run
use bbiserve::{Settings, TrackService};

# async fn run() -> Result<(), bbiserve::BBIError> {
let service = TrackService::new(Settings::default())?;
let values = service
    .bigwig("https://example.org/signal.bw", "chr19", 44_905_000, 44_916_000, 0)
    .await?;
# Ok(())
# }
```

Headers are parsed once per URL and cached. Decoded data is cached per
`(url, chromosome, zoom)` as coalesced intervals, so a query overlapping
earlier ones only fetches the missing sub-ranges, each as its own concurrent
sequence of range requests.

## Rendering

For display, a nonzero pixel width passed to [`TrackService::bigwig`] reads
from the file's precomputed zoom pyramid (see [`select_zoom_level`]), and
[`resample_to_width`] projects the returned values onto a fixed number of
min/max bins. BigBed entries following the cCRE schema can be split into
typed records with [`parse_ccre`].
*/

mod bbi;
mod cache;
mod config;
mod error;
mod service;
mod utils;
mod zoom;

pub use bbi::{
    parse_ccre, BBIFile, BBIHeader, BBIKind, BedEntry, CcreEntry, ChromTree, Summary, WigValue,
    ZoomHeader,
};
pub use config::Settings;
pub use error::BBIError;
pub use service::TrackService;
pub use zoom::{resample_to_width, select_zoom_level, PixelBin};
