use thiserror::Error;
use tracing::debug;
use url::Url;
use xstream_io::StreamReader;
use xstream_stream::{PrefetchingStreamBuffer, StreamError};

use crate::{backend::AnyBackend, config::StreamConfig};

/// A prefetching stream over whichever backend the URL scheme selected.
pub type RemoteStream = PrefetchingStreamBuffer<AnyBackend>;

/// Errors raised while opening a stream.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("unsupported url scheme `{scheme}` in {url}")]
    UnsupportedScheme { scheme: String, url: String },

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("failed to start blocking runtime: {0}")]
    Runtime(String),
}

/// Open `url` as an async sequential stream.
///
/// Dispatches on the URL scheme, opens the backend, fetches block 0
/// inline, and primes the prefetch window.
///
/// # Errors
///
/// `InvalidUrl` / `UnsupportedScheme` before any network I/O;
/// `Stream(StreamError::Connection)` when the backend open or the initial
/// fetch fails.
pub async fn open(url: impl AsRef<str>, config: &StreamConfig) -> Result<RemoteStream, OpenError> {
    let url = Url::parse(url.as_ref()).map_err(|err| OpenError::InvalidUrl(err.to_string()))?;
    debug!(%url, block_size = config.block_size, "opening remote stream");

    let backend = AnyBackend::connect(&url, config).await?;
    let stream = PrefetchingStreamBuffer::open(backend, &config.stream_options()).await?;
    Ok(stream)
}

/// Open `url` as a blocking `Read + BufRead` stream.
///
/// Builds a small dedicated runtime for the prefetch tasks and hands it
/// to the reader. Call from a non-async thread.
///
/// # Errors
///
/// Everything [`open`] raises, plus `Runtime` if the runtime cannot be
/// built.
pub fn open_blocking(
    url: impl AsRef<str>,
    config: &StreamConfig,
) -> Result<StreamReader<AnyBackend>, OpenError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|err| OpenError::Runtime(err.to_string()))?;

    let buffer = runtime.block_on(open(url, config))?;
    Ok(StreamReader::with_runtime(buffer, runtime))
}
