use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;
use url::Url;
use xstream_net::{BackendError, FetchOutcome, RangeBackend};

use crate::client::XrootdConnection;

#[derive(Debug)]
struct Inner {
    conn: Mutex<XrootdConnection>,
    fhandle: [u8; 4],
    url: Url,
    closed: AtomicBool,
}

/// XRootD range backend over a single kXR session.
///
/// The session carries one in-flight request, so concurrent `fetch_range`
/// calls are serialized internally on the connection mutex — callers need
/// no external locking. Clones share the session.
#[derive(Clone, Debug)]
pub struct XrootdBackend {
    inner: Arc<Inner>,
}

impl XrootdBackend {
    /// Connect to the server named by `url`, log in anonymously, and open
    /// the file read-only.
    ///
    /// # Errors
    ///
    /// Any connect, login, or open failure — including a server that
    /// demands authentication or redirects elsewhere.
    pub async fn open(url: &Url) -> Result<Self, BackendError> {
        let mut conn = XrootdConnection::connect(url).await?;
        // kXR URLs conventionally double the slash after the authority;
        // normalize to a single absolute path.
        let path = format!("/{}", url.path().trim_start_matches('/'));
        let fhandle = conn.open_read(&path).await?;
        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                fhandle,
                url: url.clone(),
                closed: AtomicBool::new(false),
            }),
        })
    }
}

#[async_trait]
impl RangeBackend for XrootdBackend {
    async fn fetch_range(&self, offset: u64, len: u64) -> Result<FetchOutcome, BackendError> {
        let rlen = u32::try_from(len).map_err(|_| {
            BackendError::protocol(format!("block size {len} exceeds kXR read limit"))
        })?;

        let mut conn = self.inner.conn.lock().await;
        let data = conn.read(self.inner.fhandle, offset, rlen).await?;
        drop(conn);

        if data.is_empty() {
            trace!(offset, "kXR read at EOF");
            Ok(FetchOutcome::Empty)
        } else {
            Ok(FetchOutcome::Bytes(data))
        }
    }

    fn url(&self) -> &Url {
        &self.inner.url
    }

    async fn close(&self) -> Result<(), BackendError> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut conn = self.inner.conn.lock().await;
        conn.close_file(self.inner.fhandle).await
    }
}
