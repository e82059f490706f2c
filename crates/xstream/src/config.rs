use xstream_net::NetOptions;
use xstream_stream::StreamOptions;

/// Unified configuration for opening a stream.
///
/// # Example
///
/// ```ignore
/// use xstream::StreamConfig;
///
/// let config = StreamConfig::default()
///     .with_block_size(4 * 1024 * 1024)
///     .with_readahead(2)
///     .with_verbose(true);
/// ```
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Bytes per fetch unit.
    pub block_size: u64,
    /// Blocks kept prefetched ahead of the current one.
    pub readahead: usize,
    /// Consumed blocks retained for cheap rewind without refetch.
    pub lookback: usize,
    /// Log window state transitions at `debug` level.
    pub verbose: bool,
    /// Network configuration (timeouts, pooling) for the HTTP backend.
    pub net: NetOptions,
}

impl Default for StreamConfig {
    fn default() -> Self {
        let stream = StreamOptions::default();
        Self {
            block_size: stream.block_size,
            readahead: stream.readahead,
            lookback: stream.lookback,
            verbose: stream.verbose,
            net: NetOptions::default(),
        }
    }
}

impl StreamConfig {
    /// Set bytes per fetch unit.
    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set blocks to keep prefetched ahead of the current one.
    pub fn with_readahead(mut self, readahead: usize) -> Self {
        self.readahead = readahead;
        self
    }

    /// Set consumed blocks to retain behind the current one.
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// Enable diagnostic logging of window state transitions.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set network options.
    pub fn with_net(mut self, net: NetOptions) -> Self {
        self.net = net;
        self
    }

    pub(crate) fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            block_size: self.block_size,
            readahead: self.readahead,
            lookback: self.lookback,
            verbose: self.verbose,
        }
    }
}
