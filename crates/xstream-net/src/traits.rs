use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::error::BackendError;

/// Outcome of a range fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Payload for the requested range. May be shorter than the request if
    /// the resource ends inside it.
    Bytes(Bytes),
    /// The request started at or beyond the end of the resource — the EOF
    /// sentinel, not an error.
    Empty,
}

impl FetchOutcome {
    pub fn len(&self) -> usize {
        match self {
            FetchOutcome::Bytes(payload) => payload.len(),
            FetchOutcome::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            FetchOutcome::Bytes(payload) => Some(payload),
            FetchOutcome::Empty => None,
        }
    }
}

/// Capability to fetch inclusive byte ranges from an opened remote resource.
///
/// Normative:
/// - `fetch_range(offset, len)` must return `Bytes` for a range that starts
///   inside the resource (clipped at the end as needed), `Empty` when
///   `offset` is at/after the end of the resource, and `Err` for everything
///   else.
/// - Concurrency is part of the implementation's contract: `fetch_range` is
///   called from multiple tasks on one handle. An implementation must
///   either document that concurrent calls are safe or serialize them
///   internally — a naive shared file handle is not acceptable.
/// - `close()` releases backend resources and must be idempotent.
#[async_trait]
pub trait RangeBackend: Send + Sync + 'static {
    async fn fetch_range(&self, offset: u64, len: u64) -> Result<FetchOutcome, BackendError>;

    /// The URL this backend was opened on. Used for error detail only.
    fn url(&self) -> &Url;

    async fn close(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
