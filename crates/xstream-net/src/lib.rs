#![forbid(unsafe_code)]

//! `xstream-net`
//!
//! Backend capability for range-addressable remote resources.
//!
//! ## Design goals
//! - `RangeBackend`: one trait, one obligation — fetch an inclusive byte
//!   range and report `Bytes`, `Empty` (EOF sentinel), or an error
//! - `HttpBackend`: HTTP Range GET implementation over reqwest
//! - Backends own their concurrency contract: an implementation must either
//!   be safe for concurrent `fetch_range` calls or serialize them internally

mod error;
mod http;
mod traits;
mod types;

pub use crate::{
    error::{BackendError, BackendResult},
    http::HttpBackend,
    traits::{FetchOutcome, RangeBackend},
    types::{NetOptions, RangeSpec},
};
