#![forbid(unsafe_code)]

//! `xstream-xrootd`
//!
//! XRootD range backend speaking a minimal anonymous-read subset of the
//! kXR protocol: handshake, `kXR_protocol`, `kXR_login`, `kXR_open`
//! (read-only), `kXR_read` with `kXR_oksofar` continuation, `kXR_close`.
//!
//! ## Design goals
//! - One TCP connection per opened file; concurrent `fetch_range` calls
//!   are serialized internally (the backend-contract obligation — a file
//!   handle shared across tasks is unsafe without it)
//! - A read returning 0 bytes is the EOF sentinel, never an error
//! - Out-of-dialect responses (redirect, wait, auth challenges) surface
//!   as typed protocol errors instead of being half-handled

mod backend;
mod client;
pub mod wire;

pub use backend::XrootdBackend;
