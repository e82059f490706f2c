use std::collections::VecDeque;

use bytes::Bytes;
use tracing::{debug, trace};
use xstream_net::RangeBackend;

use crate::{
    block::{BlockState, StreamBlock},
    error::StreamError,
    options::StreamOptions,
};

/// Result of advancing consumption to the next block.
pub(crate) enum StepOutcome {
    Ready,
    Eof,
}

/// Snapshot of the window for diagnostics and invariant checks.
#[derive(Debug, Clone)]
pub struct WindowStats {
    /// Number of blocks currently tracked.
    pub len: usize,
    /// Index of the block being consumed.
    pub current_index: usize,
    /// Blocks dispatched ahead of the current one.
    pub ahead: usize,
    /// Consumed blocks retained behind the current one.
    pub behind: usize,
    /// Offsets of all tracked blocks, oldest first.
    pub offsets: Vec<u64>,
}

/// Ordered collection of blocks plus the current-read index.
///
/// Owns the prefetch/eviction policy. Invariants:
/// - the window is never empty; `current` always indexes a tracked block
/// - adjacent blocks cover a contiguous byte range
/// - `ahead() <= readahead` and `behind() <= lookback` after every
///   `advance()`/`evict()` pair
///
/// Only the consumer mutates the window. Fetch tasks write into their own
/// block's outcome, published through the task handle on join.
#[derive(Debug)]
pub(crate) struct PrefetchWindow<B> {
    backend: B,
    blocks: VecDeque<StreamBlock>,
    current: usize,
    block_size: u64,
    readahead: usize,
    lookback: usize,
    verbose: bool,
}

impl<B: RangeBackend + Clone> PrefetchWindow<B> {
    pub(crate) fn new(backend: B, first: StreamBlock, opts: &StreamOptions) -> Self {
        let mut blocks = VecDeque::with_capacity(opts.readahead + opts.lookback + 1);
        blocks.push_back(first);
        Self {
            backend,
            blocks,
            current: 0,
            block_size: opts.block_size,
            readahead: opts.readahead,
            lookback: opts.lookback,
            verbose: opts.verbose,
        }
    }

    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    /// Blocks dispatched ahead of the current one.
    pub(crate) fn ahead(&self) -> usize {
        self.blocks.len() - 1 - self.current
    }

    /// Consumed blocks retained behind the current one.
    pub(crate) fn behind(&self) -> usize {
        self.current
    }

    pub(crate) fn current_payload(&self) -> Option<&Bytes> {
        self.blocks[self.current].payload()
    }

    /// Top the window up to `readahead` dispatched blocks ahead of the
    /// current one. Each new block starts at the tail's end offset, so the
    /// window covers a contiguous region regardless of completion order.
    pub(crate) fn advance(&mut self) -> usize {
        let mut dispatched = 0;
        while self.ahead() < self.readahead {
            let tail = self.blocks.back().expect("window is never empty");
            let offset = tail.offset() + tail.size();
            self.log_transition("advance: dispatching block fetch", offset);
            self.blocks
                .push_back(StreamBlock::dispatch(&self.backend, offset, self.block_size));
            dispatched += 1;
        }
        dispatched
    }

    /// Move consumption to the next block, waiting for its fetch task.
    ///
    /// This is the consumer's only suspension point. Consumption order is
    /// strictly index order: a later block may already be complete, but it
    /// is not exposed until every earlier block has been consumed.
    pub(crate) async fn step(&mut self) -> Result<StepOutcome, StreamError> {
        self.current += 1;
        let block = self
            .blocks
            .get_mut(self.current)
            .expect("window invariant: a block is always dispatched ahead of the current one");
        match block.join().await {
            BlockState::Ready(payload) => {
                let len = payload.len();
                let offset = block.offset();
                self.log_transition("step: block current", offset);
                trace!(offset, len, "serving block payload");
                Ok(StepOutcome::Ready)
            }
            BlockState::Exhausted => Ok(StepOutcome::Eof),
            BlockState::Failed(err) => Err(err.clone()),
            BlockState::Pending(_) => unreachable!("join() always leaves a terminal state"),
        }
    }

    /// Drop blocks that fell behind the lookback horizon.
    ///
    /// Eviction never removes the current block or anything after it. A
    /// block is joined before it is freed; in practice evicted blocks are
    /// already terminal because they were current once.
    pub(crate) async fn evict(&mut self) -> usize {
        let mut evicted = 0;
        while self.behind() > self.lookback {
            let mut block = self.blocks.pop_front().expect("window is never empty");
            self.current -= 1;
            if block.is_pending() {
                let _ = block.join().await;
            }
            self.log_transition("evict: dropping block", block.offset());
            evicted += 1;
        }
        evicted
    }

    /// Join every outstanding fetch task. Called at teardown so no task
    /// outlives the window.
    pub(crate) async fn shutdown(&mut self) {
        for block in &mut self.blocks {
            if block.is_pending() {
                let _ = block.join().await;
            }
        }
        trace!(len = self.blocks.len(), "window shut down");
    }

    pub(crate) fn stats(&self) -> WindowStats {
        WindowStats {
            len: self.blocks.len(),
            current_index: self.current,
            ahead: self.ahead(),
            behind: self.behind(),
            offsets: self.blocks.iter().map(StreamBlock::offset).collect(),
        }
    }

    fn log_transition(&self, msg: &'static str, offset: u64) {
        if self.verbose {
            debug!(offset, block_size = self.block_size, "{msg}");
        } else {
            trace!(offset, block_size = self.block_size, "{msg}");
        }
    }
}
