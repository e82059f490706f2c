#![forbid(unsafe_code)]

//! `xstream-stream`
//!
//! The prefetching stream buffer: a sliding window of fixed-size blocks
//! fetched ahead of the consumer by background tasks.
//!
//! ## Design goals
//! - `StreamBlock`: one fetch task per block, outcome published once as
//!   terminal state (`Ready` / `Exhausted` / `Failed`)
//! - `PrefetchWindow`: contiguous coverage, bounded readahead and lookback,
//!   index-ordered consumption regardless of task completion order
//! - `PrefetchingStreamBuffer`: sequential-read front end; the only
//!   blocking point is `read_more()` joining the next block's task
//! - Errors never cross a task boundary implicitly: a failed fetch is
//!   captured into its block and re-raised on the consumer side when that
//!   block becomes current

mod block;
mod buffer;
mod error;
mod options;
mod window;

pub use buffer::PrefetchingStreamBuffer;
pub use error::{StreamError, StreamResult};
pub use options::StreamOptions;
pub use window::WindowStats;
