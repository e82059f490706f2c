use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use tracing::trace;
use url::Url;

use crate::{
    error::{BackendError, BackendResult},
    traits::{FetchOutcome, RangeBackend},
    types::{NetOptions, RangeSpec},
};

/// HTTP Range GET backend.
///
/// Wire contract: requests carry an inclusive `Range` header; 206 maps to
/// [`FetchOutcome::Bytes`], 416 to [`FetchOutcome::Empty`], and any other
/// status is a hard error carrying the server's reason phrase.
///
/// Concurrent `fetch_range` calls on one handle are safe without external
/// locking: each call runs an independent request on the pooled client.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    url: Url,
    options: NetOptions,
}

impl HttpBackend {
    /// Open a backend for `url`. Builds the client only; the first range
    /// fetch is the construction-time reachability check.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the client cannot be built.
    pub fn open(url: Url, options: NetOptions) -> BackendResult<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .build()
            .map_err(BackendError::from)?;
        Ok(Self {
            client,
            url,
            options,
        })
    }
}

#[async_trait]
impl RangeBackend for HttpBackend {
    async fn fetch_range(&self, offset: u64, len: u64) -> Result<FetchOutcome, BackendError> {
        let range = RangeSpec::with_len(offset, len);
        trace!(url = %self.url, range = %range.to_header_value(), "HTTP range fetch");

        let resp = self
            .client
            .get(self.url.clone())
            .header(header::RANGE, range.to_header_value())
            .timeout(self.options.request_timeout)
            .send()
            .await
            .map_err(BackendError::from)?;

        match resp.status() {
            StatusCode::PARTIAL_CONTENT => {
                let payload = resp.bytes().await.map_err(BackendError::from)?;
                if payload.is_empty() {
                    // A 206 with no body carries the same meaning as 416.
                    Ok(FetchOutcome::Empty)
                } else {
                    Ok(FetchOutcome::Bytes(payload))
                }
            }
            StatusCode::RANGE_NOT_SATISFIABLE => Ok(FetchOutcome::Empty),
            status => Err(BackendError::http_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status"),
                self.url.as_str(),
            )),
        }
    }

    fn url(&self) -> &Url {
        &self.url
    }
}
