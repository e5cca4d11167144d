use bytes::Bytes;
use reqwest::header::RANGE;
use reqwest::Client;

use crate::config::Settings;
use crate::error::BBIError;

/// HTTP range fetcher backed by a single pooled client.
///
/// Block-level data is already zlib-compressed, so transfer compression is
/// never negotiated. There are no retries here; callers see fetch errors
/// unmodified.
pub(crate) struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub(crate) fn new(settings: &Settings) -> Result<Fetcher, BBIError> {
        let client = Client::builder()
            .timeout(settings.fetch_timeout)
            .pool_max_idle_per_host(settings.pool_idle_per_host)
            .pool_idle_timeout(settings.pool_idle_timeout)
            .build()?;
        Ok(Fetcher { client })
    }

    /// Fetches exactly `length` bytes at `offset` via a `Range` request.
    ///
    /// Fails with [`BBIError::ShortRead`] when the server returns fewer
    /// bytes than requested; any excess beyond `length` is dropped.
    pub(crate) async fn fetch(
        &self,
        url: &str,
        offset: u64,
        length: usize,
    ) -> Result<Bytes, BBIError> {
        if length == 0 {
            return Ok(Bytes::new());
        }
        let range = format!("bytes={}-{}", offset, offset + length as u64 - 1);
        let response = self
            .client
            .get(url)
            .header(RANGE, range)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        if body.len() < length {
            return Err(BBIError::ShortRead {
                expected: length,
                got: body.len(),
            });
        }
        Ok(body.slice(..length))
    }
}
