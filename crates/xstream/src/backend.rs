use async_trait::async_trait;
use url::Url;
use xstream_net::{BackendError, FetchOutcome, HttpBackend, RangeBackend};
use xstream_stream::StreamError;
use xstream_xrootd::XrootdBackend;

use crate::{config::StreamConfig, open::OpenError};

/// Backend chosen by URL scheme: `http`/`https` or `root`/`xrootd`.
///
/// Static dispatch over the two concrete backends; each keeps its own
/// EOF/error signaling convention behind the shared capability.
#[derive(Clone, Debug)]
pub enum AnyBackend {
    Http(HttpBackend),
    Xrootd(XrootdBackend),
}

impl AnyBackend {
    /// Resolve `url`'s scheme and open the matching backend.
    ///
    /// Scheme rejection happens here, before any network I/O.
    pub(crate) async fn connect(url: &Url, config: &StreamConfig) -> Result<Self, OpenError> {
        match url.scheme() {
            "http" | "https" => {
                let backend = HttpBackend::open(url.clone(), config.net.clone())
                    .map_err(|source| connection_error(url, source))?;
                Ok(Self::Http(backend))
            }
            "root" | "xrootd" => {
                let backend = XrootdBackend::open(url)
                    .await
                    .map_err(|source| connection_error(url, source))?;
                Ok(Self::Xrootd(backend))
            }
            scheme => Err(OpenError::UnsupportedScheme {
                scheme: scheme.to_string(),
                url: url.to_string(),
            }),
        }
    }
}

fn connection_error(url: &Url, source: BackendError) -> OpenError {
    OpenError::Stream(StreamError::Connection {
        url: url.to_string(),
        source,
    })
}

#[async_trait]
impl RangeBackend for AnyBackend {
    async fn fetch_range(&self, offset: u64, len: u64) -> Result<FetchOutcome, BackendError> {
        match self {
            Self::Http(backend) => backend.fetch_range(offset, len).await,
            Self::Xrootd(backend) => backend.fetch_range(offset, len).await,
        }
    }

    fn url(&self) -> &Url {
        match self {
            Self::Http(backend) => backend.url(),
            Self::Xrootd(backend) => backend.url(),
        }
    }

    async fn close(&self) -> Result<(), BackendError> {
        match self {
            Self::Http(backend) => backend.close().await,
            Self::Xrootd(backend) => backend.close().await,
        }
    }
}
