//! In-memory `RangeBackend` with fetch accounting and fault injection.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;
use xstream_net::{BackendError, FetchOutcome, RangeBackend};

struct Inner {
    data: Vec<u8>,
    url: Url,
    fetch_log: Mutex<Vec<u64>>,
    started: AtomicUsize,
    completed: AtomicUsize,
    close_calls: AtomicUsize,
    fail_offsets: HashSet<u64>,
    delays: HashMap<u64, Duration>,
}

/// Scripted in-memory backend for driving the stream buffer in tests.
///
/// Records every fetch (offset order of arrival), counts in-flight
/// fetches for teardown assertions, and can be scripted to fail or delay
/// the fetch at a given offset — delays force out-of-order completion.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(Inner {
                data,
                url: Url::parse("memory://test/blob").unwrap(),
                fetch_log: Mutex::new(Vec::new()),
                started: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                close_calls: AtomicUsize::new(0),
                fail_offsets: HashSet::new(),
                delays: HashMap::new(),
            }),
        }
    }

    /// Fetches at `offset` fail with an HTTP 500-shaped error.
    #[must_use]
    pub fn with_failure_at(mut self, offset: u64) -> Self {
        self.inner_mut().fail_offsets.insert(offset);
        self
    }

    /// Fetches at `offset` sleep for `delay` before completing.
    #[must_use]
    pub fn with_delay(mut self, offset: u64, delay: Duration) -> Self {
        self.inner_mut().delays.insert(offset, delay);
        self
    }

    fn inner_mut(&mut self) -> &mut Inner {
        Arc::get_mut(&mut self.inner).expect("configure the backend before cloning it")
    }

    pub fn data(&self) -> &[u8] {
        &self.inner.data
    }

    /// Offsets fetched so far, in arrival order.
    pub fn fetches(&self) -> Vec<u64> {
        self.inner.fetch_log.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, offset: u64) -> usize {
        self.inner
            .fetch_log
            .lock()
            .unwrap()
            .iter()
            .filter(|&&o| o == offset)
            .count()
    }

    pub fn total_fetches(&self) -> usize {
        self.inner.fetch_log.lock().unwrap().len()
    }

    /// Fetches started but not yet completed.
    pub fn in_flight(&self) -> usize {
        self.inner.started.load(Ordering::SeqCst) - self.inner.completed.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }

    async fn fetch_inner(&self, offset: u64, len: u64) -> Result<FetchOutcome, BackendError> {
        if let Some(delay) = self.inner.delays.get(&offset) {
            tokio::time::sleep(*delay).await;
        }
        if self.inner.fail_offsets.contains(&offset) {
            return Err(BackendError::http_status(
                500,
                "Internal Server Error",
                self.inner.url.as_str(),
            ));
        }

        let total = self.inner.data.len() as u64;
        if offset >= total {
            return Ok(FetchOutcome::Empty);
        }
        let end = (offset + len).min(total);
        Ok(FetchOutcome::Bytes(Bytes::copy_from_slice(
            &self.inner.data[offset as usize..end as usize],
        )))
    }
}

#[async_trait]
impl RangeBackend for MemoryBackend {
    async fn fetch_range(&self, offset: u64, len: u64) -> Result<FetchOutcome, BackendError> {
        self.inner.fetch_log.lock().unwrap().push(offset);
        self.inner.started.fetch_add(1, Ordering::SeqCst);
        let result = self.fetch_inner(offset, len).await;
        self.inner.completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn url(&self) -> &Url {
        &self.inner.url
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
