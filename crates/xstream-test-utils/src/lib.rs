#![forbid(unsafe_code)]
#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "test utility crate — unwraps are acceptable"
)]

//! Shared test utilities for the xstream workspace.

pub mod http_server;
pub mod memory_backend;
pub mod rng;
pub mod xrootd_server;

pub use http_server::{BlobServer, TestHttpServer};
pub use memory_backend::MemoryBackend;
pub use rng::Xorshift64;
pub use xrootd_server::FakeXrootdServer;
