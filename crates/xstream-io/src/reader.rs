use std::{
    future::Future,
    io::{self, BufRead, Read},
};

use tokio::runtime::{Handle, Runtime};
use tracing::warn;
use xstream_net::RangeBackend;
use xstream_stream::PrefetchingStreamBuffer;

enum RuntimeFlavor {
    Owned(Runtime),
    Shared(Handle),
}

impl RuntimeFlavor {
    fn block_on<F: Future>(&self, fut: F) -> F::Output {
        match self {
            RuntimeFlavor::Owned(rt) => rt.block_on(fut),
            RuntimeFlavor::Shared(handle) => handle.block_on(fut),
        }
    }
}

/// Blocking `Read + BufRead` over a [`PrefetchingStreamBuffer`].
///
/// Intra-block reads copy straight out of the active payload; crossing a
/// block boundary drives `read_more()` on the runtime, which is the only
/// point that blocks. End of stream is a zero-byte read; a failed stream
/// yields the captured error as `io::Error` on this and every later read.
///
/// Must be driven from outside the async runtime it uses — reading (or
/// dropping) a reader on a runtime thread would block that runtime.
pub struct StreamReader<B: RangeBackend + Clone> {
    buffer: Option<PrefetchingStreamBuffer<B>>,
    rt: RuntimeFlavor,
}

impl<B: RangeBackend + Clone> StreamReader<B> {
    /// Wrap `buffer`, taking ownership of the runtime that drives it.
    pub fn with_runtime(buffer: PrefetchingStreamBuffer<B>, runtime: Runtime) -> Self {
        Self {
            buffer: Some(buffer),
            rt: RuntimeFlavor::Owned(runtime),
        }
    }

    /// Wrap `buffer`, driving it through `handle`. The reader must live on
    /// a thread outside that runtime.
    pub fn from_handle(buffer: PrefetchingStreamBuffer<B>, handle: Handle) -> Self {
        Self {
            buffer: Some(buffer),
            rt: RuntimeFlavor::Shared(handle),
        }
    }

    /// Total bytes delivered so far.
    pub fn position(&self) -> u64 {
        self.buffer
            .as_ref()
            .map_or(0, PrefetchingStreamBuffer::position)
    }

    pub fn is_eof(&self) -> bool {
        self.buffer
            .as_ref()
            .is_none_or(PrefetchingStreamBuffer::is_eof)
    }

    /// Join all outstanding fetch tasks and close the backend.
    ///
    /// # Errors
    ///
    /// Propagates the backend's close failure.
    pub fn close(mut self) -> io::Result<()> {
        match self.buffer.take() {
            Some(buffer) => self.rt.block_on(buffer.close()).map_err(io::Error::other),
            None => Ok(()),
        }
    }
}

impl<B: RangeBackend + Clone> Read for StreamReader<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let available = self.fill_buf()?;
        if available.is_empty() {
            return Ok(0);
        }
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<B: RangeBackend + Clone> BufRead for StreamReader<B> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let Self { buffer, rt } = self;
        let Some(buffer) = buffer.as_mut() else {
            return Ok(&[]);
        };
        if buffer.remaining().is_empty() {
            rt.block_on(buffer.read_more()).map_err(io::Error::other)?;
        }
        Ok(buffer.remaining())
    }

    fn consume(&mut self, amt: usize) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.consume(amt);
        }
    }
}

impl<B: RangeBackend + Clone> Drop for StreamReader<B> {
    fn drop(&mut self) {
        let Some(buffer) = self.buffer.take() else {
            return;
        };
        if Handle::try_current().is_ok() {
            // Blocking here would stall the runtime the fetch tasks run
            // on. Tasks hold their own backend clone, so they complete
            // safely; an owned runtime must be shut down without blocking.
            warn!("stream reader dropped inside an async context; fetch tasks detach");
            drop(buffer);
            let placeholder = RuntimeFlavor::Shared(Handle::current());
            if let RuntimeFlavor::Owned(rt) = std::mem::replace(&mut self.rt, placeholder) {
                rt.shutdown_background();
            }
            return;
        }
        if let Err(err) = self.rt.block_on(buffer.close()) {
            warn!(error = %err, "backend close failed during reader drop");
        }
    }
}
