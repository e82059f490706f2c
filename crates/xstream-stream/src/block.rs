use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::trace;
use xstream_net::{BackendError, FetchOutcome, RangeBackend};

use crate::error::StreamError;

/// Terminal-or-pending state of one block.
///
/// `Pending` is the only non-terminal state; `join()` performs the single
/// transition out of it. A terminal state is never rewritten.
#[derive(Debug)]
pub(crate) enum BlockState {
    Pending(JoinHandle<Result<FetchOutcome, BackendError>>),
    Ready(Bytes),
    Exhausted,
    Failed(StreamError),
}

/// A fixed-capacity chunk of the remote resource: the unit of prefetch
/// and eviction. Offset and size are fixed at creation; exactly one fetch
/// task writes the outcome.
#[derive(Debug)]
pub(crate) struct StreamBlock {
    offset: u64,
    size: u64,
    state: BlockState,
}

impl StreamBlock {
    /// Create a `Pending` block and dispatch its background fetch.
    pub(crate) fn dispatch<B: RangeBackend + Clone>(backend: &B, offset: u64, size: u64) -> Self {
        let task_backend = backend.clone();
        let handle = tokio::spawn(async move { task_backend.fetch_range(offset, size).await });
        Self {
            offset,
            size,
            state: BlockState::Pending(handle),
        }
    }

    /// Block 0 is fetched inline during construction; it enters the window
    /// already `Ready`.
    pub(crate) fn ready(offset: u64, size: u64, payload: Bytes) -> Self {
        Self {
            offset,
            size,
            state: BlockState::Ready(payload),
        }
    }

    /// An immediately-empty resource yields an `Exhausted` block 0.
    pub(crate) fn exhausted(offset: u64, size: u64) -> Self {
        Self {
            offset,
            size,
            state: BlockState::Exhausted,
        }
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(self.state, BlockState::Pending(_))
    }

    pub(crate) fn payload(&self) -> Option<&Bytes> {
        match &self.state {
            BlockState::Ready(payload) => Some(payload),
            _ => None,
        }
    }

    /// Wait for the fetch task and publish its terminal state.
    ///
    /// Idempotent: joining a terminal block returns the state unchanged.
    /// A short (clipped) payload is `Ready`; an empty outcome is the EOF
    /// sentinel `Exhausted`; a fetch error or a panicked task becomes
    /// `Failed` without ever crossing the task boundary as a panic.
    pub(crate) async fn join(&mut self) -> &BlockState {
        if let BlockState::Pending(handle) = &mut self.state {
            let joined = handle.await;
            let offset = self.offset;
            self.state = match joined {
                Ok(Ok(FetchOutcome::Bytes(payload))) if !payload.is_empty() => {
                    trace!(offset, len = payload.len(), "block ready");
                    BlockState::Ready(payload)
                }
                Ok(Ok(_)) => {
                    trace!(offset, "block exhausted (EOF sentinel)");
                    BlockState::Exhausted
                }
                Ok(Err(source)) => BlockState::Failed(StreamError::RangeFetch { offset, source }),
                Err(join_err) => BlockState::Failed(StreamError::TaskJoin {
                    offset,
                    detail: join_err.to_string(),
                }),
            };
        }
        &self.state
    }
}
