use thiserror::Error;
use xstream_net::BackendError;

/// Errors produced by the prefetching stream buffer.
///
/// Notes:
/// - `Connection` covers open and the inline block-0 fetch; it aborts
///   stream construction.
/// - `RangeFetch` is a later block's failure, raised on the consumer
///   thread at the moment that block becomes current — never from inside
///   the background task.
/// - `TaskJoin` is a panicked/aborted fetch task; the failure is still
///   delivered in order, like any other block failure.
///
/// All variants are `Clone`: once a stream fails it stays in a terminal
/// error state and every subsequent read reports the same error.
#[derive(Debug, Error, Clone)]
pub enum StreamError {
    #[error("failed to open remote resource {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: BackendError,
    },

    #[error("range fetch failed at offset {offset}: {source}")]
    RangeFetch {
        offset: u64,
        #[source]
        source: BackendError,
    },

    #[error("fetch task aborted at offset {offset}: {detail}")]
    TaskJoin { offset: u64, detail: String },
}

pub type StreamResult<T> = Result<T, StreamError>;
