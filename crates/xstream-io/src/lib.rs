#![forbid(unsafe_code)]

//! `xstream-io`
//!
//! Blocking byte/line adapter over the async prefetching stream buffer.
//!
//! ## Design goals
//! - `StreamReader`: `std::io::Read + BufRead` so downstream consumers
//!   (record parsers, `lines()`) need nothing stream-specific
//! - Refill delegates to `read_more()`; the stream's `Failed` state maps
//!   to `io::Error`, `Exhausted` to a clean zero-byte read
//! - Drives the buffer through a tokio runtime it owns, or a caller
//!   handle when the runtime lives elsewhere

mod reader;

pub use reader::StreamReader;
