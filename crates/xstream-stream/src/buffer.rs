use bytes::Bytes;
use tracing::{debug, trace};
use xstream_net::{BackendError, FetchOutcome, RangeBackend};

use crate::{
    block::StreamBlock,
    error::{StreamError, StreamResult},
    options::StreamOptions,
    window::{PrefetchWindow, StepOutcome, WindowStats},
};

#[derive(Debug)]
enum StreamState {
    Active,
    Eof,
    Failed(StreamError),
}

/// Sequential-read front end over a [`PrefetchWindow`].
///
/// Construction fetches block 0 inline (there is nothing to prefetch yet),
/// then primes the window with `readahead` background fetches. Ordinary
/// reads never block; exhausting the active block triggers `read_more()`,
/// which joins the next block's task and re-establishes the window bounds.
///
/// The buffer owns the backend handle for the stream's lifetime. `close()`
/// joins every outstanding fetch task and then closes the backend exactly
/// once — a buffer is never torn down while a task it dispatched is still
/// running.
#[derive(Debug)]
pub struct PrefetchingStreamBuffer<B: RangeBackend + Clone> {
    window: PrefetchWindow<B>,
    cursor: usize,
    state: StreamState,
    delivered: u64,
}

impl<B: RangeBackend + Clone> PrefetchingStreamBuffer<B> {
    /// Open a stream over `backend`.
    ///
    /// # Errors
    ///
    /// [`StreamError::Connection`] if the inline block-0 fetch fails. An
    /// `Empty` outcome at offset 0 is not an error: the stream opens
    /// already at EOF.
    pub async fn open(backend: B, options: &StreamOptions) -> StreamResult<Self> {
        let opts = options.clamped();
        let outcome = backend
            .fetch_range(0, opts.block_size)
            .await
            .map_err(|source| StreamError::Connection {
                url: backend.url().to_string(),
                source,
            })?;

        let (first, state) = match outcome {
            FetchOutcome::Bytes(payload) if !payload.is_empty() => {
                trace!(len = payload.len(), "initial block ready");
                (
                    StreamBlock::ready(0, opts.block_size, payload),
                    StreamState::Active,
                )
            }
            _ => {
                debug!("resource empty at offset 0");
                (
                    StreamBlock::exhausted(0, opts.block_size),
                    StreamState::Eof,
                )
            }
        };

        let mut window = PrefetchWindow::new(backend, first, &opts);
        if matches!(state, StreamState::Active) {
            window.advance();
        }

        Ok(Self {
            window,
            cursor: 0,
            state,
            delivered: 0,
        })
    }

    /// Unread bytes of the active block. Empty when the block is exhausted
    /// (call [`read_more`](Self::read_more)), at EOF, or after a failure.
    pub fn remaining(&self) -> &[u8] {
        match &self.state {
            StreamState::Active => {
                let payload: &Bytes = self
                    .window
                    .current_payload()
                    .expect("active stream always has a ready current block");
                &payload[self.cursor..]
            }
            _ => &[],
        }
    }

    /// Mark `amt` bytes of the active block as consumed.
    pub fn consume(&mut self, amt: usize) {
        let available = self.remaining().len();
        let amt = amt.min(available);
        self.cursor += amt;
        self.delivered += amt as u64;
    }

    /// Advance to the next block once the active one is exhausted.
    ///
    /// Blocks (awaits) until the next block's fetch task completes, then:
    /// - `Ready`: its payload becomes the active read window; returns
    ///   `true` after re-establishing the eviction and readahead bounds.
    /// - `Exhausted`: end of stream; returns `false`, and every later call
    ///   returns `false` with no further fetch dispatched.
    /// - `Failed`: the captured error is returned here, on the consumer
    ///   side, and the stream becomes unusable; every later read reports
    ///   the same error.
    ///
    /// Any unread remainder of the active block is discarded.
    pub async fn read_more(&mut self) -> StreamResult<bool> {
        match &self.state {
            StreamState::Eof => return Ok(false),
            StreamState::Failed(err) => return Err(err.clone()),
            StreamState::Active => {}
        }

        self.cursor = 0;
        match self.window.step().await {
            Ok(StepOutcome::Ready) => {
                self.window.evict().await;
                self.window.advance();
                Ok(true)
            }
            Ok(StepOutcome::Eof) => {
                debug!(delivered = self.delivered, "end of stream");
                self.state = StreamState::Eof;
                Ok(false)
            }
            Err(err) => {
                debug!(error = %err, "stream failed");
                self.state = StreamState::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Convenience sequential read: fills `buf` from the active block,
    /// crossing block boundaries as needed. Returns `Ok(0)` at end of
    /// stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let chunk = self.remaining();
            if !chunk.is_empty() {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                self.consume(n);
                return Ok(n);
            }
            if !self.read_more().await? {
                return Ok(0);
            }
        }
    }

    /// Total bytes delivered to the consumer so far.
    pub fn position(&self) -> u64 {
        self.delivered
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.state, StreamState::Eof)
    }

    /// The terminal error, if the stream has failed.
    pub fn error(&self) -> Option<&StreamError> {
        match &self.state {
            StreamState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Window snapshot for diagnostics and invariant checks.
    pub fn stats(&self) -> WindowStats {
        self.window.stats()
    }

    /// Join every outstanding fetch task, then close the backend.
    ///
    /// # Errors
    ///
    /// Propagates the backend's close failure; all tasks are joined
    /// regardless.
    pub async fn close(mut self) -> Result<(), BackendError> {
        self.window.shutdown().await;
        self.window.backend().close().await
    }
}
