//! Fake kXR server speaking the anonymous-read dialect.
//!
//! Accepts any login, serves one in-memory blob for any path, and can be
//! scripted to fail reads at given offsets. Large reads are split into a
//! `kXR_oksofar` continuation followed by the final `kXR_ok` frame so the
//! client's reassembly loop gets exercised.

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::oneshot,
};
use tracing::trace;
use url::Url;
use xstream_xrootd::wire::{
    HANDSHAKE_LEN, KXR_CLOSE, KXR_ERROR, KXR_LOGIN, KXR_OK, KXR_OKSOFAR, KXR_OPEN, KXR_PROTOCOL,
    KXR_READ, PROTOCOL_VERSION,
};

/// Reads longer than this are answered as oksofar + ok.
const OKSOFAR_SPLIT: usize = 1024;

/// Error number reported for scripted read failures.
const INJECTED_ERRNUM: i32 = 3011;

pub struct FakeXrootdServer {
    port: u16,
    close_count: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FakeXrootdServer {
    pub async fn spawn(data: Vec<u8>) -> Self {
        Self::spawn_with_failures(data, []).await
    }

    pub async fn spawn_with_failures(
        data: Vec<u8>,
        fail_offsets: impl IntoIterator<Item = u64>,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake kXR listener");
        let port = listener.local_addr().expect("read listener addr").port();

        let data = Arc::new(data);
        let fail_offsets: Arc<HashSet<u64>> = Arc::new(fail_offsets.into_iter().collect());
        let close_count = Arc::new(AtomicUsize::new(0));

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let accept_close_count = close_count.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { break };
                        let data = data.clone();
                        let fail_offsets = fail_offsets.clone();
                        let close_count = accept_close_count.clone();
                        tokio::spawn(async move {
                            let _ = handle_conn(stream, data, fail_offsets, close_count).await;
                        });
                    }
                }
            }
        });

        Self {
            port,
            close_count,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// URL of the served blob under `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!(
            "root://127.0.0.1:{}/{}",
            self.port,
            path.trim_start_matches('/')
        ))
        .expect("parse fake kXR URL")
    }

    /// Number of `kXR_close` requests seen.
    pub fn close_requests(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

impl Drop for FakeXrootdServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

async fn handle_conn(
    mut stream: TcpStream,
    data: Arc<Vec<u8>>,
    fail_offsets: Arc<HashSet<u64>>,
    close_count: Arc<AtomicUsize>,
) -> std::io::Result<()> {
    let mut handshake = [0u8; HANDSHAKE_LEN];
    stream.read_exact(&mut handshake).await?;

    let mut hello = Vec::with_capacity(8);
    hello.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    hello.extend_from_slice(&1i32.to_be_bytes());
    write_frame(&mut stream, [0, 0], KXR_OK, &hello).await?;

    loop {
        let mut header = [0u8; 24];
        if stream.read_exact(&mut header).await.is_err() {
            // Client hung up; session over.
            return Ok(());
        }
        let streamid = [header[0], header[1]];
        let reqid = u16::from_be_bytes([header[2], header[3]]);
        let params: [u8; 16] = header[4..20].try_into().expect("fixed header slice");
        let dlen = u32::from_be_bytes(header[20..24].try_into().expect("fixed header slice"));
        let mut payload = vec![0u8; dlen as usize];
        stream.read_exact(&mut payload).await?;

        match reqid {
            KXR_PROTOCOL => {
                let mut body = Vec::with_capacity(8);
                body.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
                body.extend_from_slice(&1i32.to_be_bytes());
                write_frame(&mut stream, streamid, KXR_OK, &body).await?;
            }
            KXR_LOGIN => {
                write_frame(&mut stream, streamid, KXR_OK, &[0u8; 16]).await?;
            }
            KXR_OPEN => {
                trace!(path = %String::from_utf8_lossy(&payload), "fake kXR open");
                write_frame(&mut stream, streamid, KXR_OK, &[0xCA, 0xFE, 0x00, 0x01]).await?;
            }
            KXR_READ => {
                let offset = u64::from_be_bytes(params[4..12].try_into().expect("read params"));
                let rlen = u32::from_be_bytes(params[12..16].try_into().expect("read params"));

                if fail_offsets.contains(&offset) {
                    write_error(&mut stream, streamid, INJECTED_ERRNUM, "injected read failure")
                        .await?;
                    continue;
                }

                let total = data.len() as u64;
                let slice: &[u8] = if offset >= total {
                    &[]
                } else {
                    let end = (offset + u64::from(rlen)).min(total);
                    &data[offset as usize..end as usize]
                };

                if slice.len() > OKSOFAR_SPLIT {
                    let (head, tail) = slice.split_at(slice.len() / 2);
                    write_frame(&mut stream, streamid, KXR_OKSOFAR, head).await?;
                    write_frame(&mut stream, streamid, KXR_OK, tail).await?;
                } else {
                    write_frame(&mut stream, streamid, KXR_OK, slice).await?;
                }
            }
            KXR_CLOSE => {
                close_count.fetch_add(1, Ordering::SeqCst);
                write_frame(&mut stream, streamid, KXR_OK, &[]).await?;
            }
            other => {
                write_error(
                    &mut stream,
                    streamid,
                    3001,
                    &format!("unsupported request {other}"),
                )
                .await?;
            }
        }
    }
}

async fn write_frame(
    stream: &mut TcpStream,
    streamid: [u8; 2],
    status: u16,
    data: &[u8],
) -> std::io::Result<()> {
    let mut frame = Vec::with_capacity(8 + data.len());
    frame.extend_from_slice(&streamid);
    frame.extend_from_slice(&status.to_be_bytes());
    frame.extend_from_slice(&(data.len() as u32).to_be_bytes());
    frame.extend_from_slice(data);
    stream.write_all(&frame).await?;
    stream.flush().await
}

async fn write_error(
    stream: &mut TcpStream,
    streamid: [u8; 2],
    errnum: i32,
    message: &str,
) -> std::io::Result<()> {
    let mut body = Vec::with_capacity(4 + message.len() + 1);
    body.extend_from_slice(&errnum.to_be_bytes());
    body.extend_from_slice(message.as_bytes());
    body.push(0);
    write_frame(stream, streamid, KXR_ERROR, &body).await
}
