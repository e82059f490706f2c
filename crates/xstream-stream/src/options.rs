/// Tuning knobs for the prefetch window.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Bytes per fetch unit.
    pub block_size: u64,
    /// Blocks kept fetching ahead of the one currently being consumed.
    pub readahead: usize,
    /// Already-consumed blocks retained behind the current one.
    pub lookback: usize,
    /// Log window state transitions at `debug` instead of `trace`.
    pub verbose: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            block_size: 10_000_000,
            readahead: 3,
            lookback: 3,
            verbose: false,
        }
    }
}

impl StreamOptions {
    /// Options with invalid values pulled back into the supported range.
    ///
    /// `readahead` is clamped to at least 1 — the read protocol always
    /// needs a next block to join. `block_size` is clamped to at least 1
    /// byte. `lookback` of 0 is legal (no rewind retention).
    pub(crate) fn clamped(&self) -> Self {
        Self {
            block_size: self.block_size.max(1),
            readahead: self.readahead.max(1),
            lookback: self.lookback,
            verbose: self.verbose,
        }
    }
}
