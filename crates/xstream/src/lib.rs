#![forbid(unsafe_code)]

//! # xstream
//!
//! Facade crate: open a remote range-addressable resource as a sequential
//! byte stream with background prefetch.
//!
//! ## Quick start
//!
//! ```ignore
//! use std::io::BufRead;
//!
//! use xstream::StreamConfig;
//!
//! let config = StreamConfig::default();
//! let reader = xstream::open_blocking("https://example.org/data.bin", &config)?;
//! for line in reader.lines() {
//!     println!("{}", line?);
//! }
//! ```

// ── Re-export sub-crates ────────────────────────────────────────────────

pub mod io {
    pub use xstream_io::*;
}

pub mod net {
    pub use xstream_net::*;
}

pub mod stream {
    pub use xstream_stream::*;
}

pub mod xrootd {
    pub use xstream_xrootd::*;
}

// ── Facade ──────────────────────────────────────────────────────────────

mod backend;
mod config;
mod open;

pub use backend::AnyBackend;
pub use config::StreamConfig;
pub use open::{OpenError, RemoteStream, open, open_blocking};

// ── Prelude ─────────────────────────────────────────────────────────────

pub mod prelude {
    pub use xstream_io::StreamReader;
    pub use xstream_net::{FetchOutcome, NetOptions, RangeBackend};
    pub use xstream_stream::{PrefetchingStreamBuffer, StreamError, StreamOptions};

    pub use crate::{AnyBackend, OpenError, RemoteStream, StreamConfig, open, open_blocking};
}
