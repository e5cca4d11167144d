pub(crate) mod fetch;
pub(crate) mod inflate;
pub(crate) mod parser;

use crate::config::Settings;
use crate::error::BBIError;

use self::fetch::Fetcher;
use self::inflate::Inflate;

/// Process-wide I/O resources: the pooled HTTP client and the
/// decompression scratch buffers. Shared by every query.
pub(crate) struct IoContext {
    pub(crate) fetcher: Fetcher,
    pub(crate) inflate: Inflate,
}

impl IoContext {
    pub(crate) fn new(settings: &Settings) -> Result<IoContext, BBIError> {
        Ok(IoContext {
            fetcher: Fetcher::new(settings)?,
            inflate: Inflate::new(),
        })
    }
}
