use bytes::{Buf, Bytes, BytesMut};
use tokio::net::TcpStream;
use tracing::{trace, warn};
use url::Url;
use xstream_net::BackendError;

use crate::wire::{
    self, KXR_AUTHMORE, KXR_CLOSE, KXR_ERROR, KXR_LOGIN, KXR_OK, KXR_OKSOFAR, KXR_OPEN,
    KXR_OPEN_READ, KXR_PROTOCOL, KXR_READ, KXR_REDIRECT, KXR_WAIT, ResponseFrame,
};

const DEFAULT_PORT: u16 = 1094;

/// One logged-in kXR session.
///
/// All methods take `&mut self`: a session carries exactly one in-flight
/// request. Serialization across tasks is the caller's job (see
/// `XrootdBackend`).
#[derive(Debug)]
pub(crate) struct XrootdConnection {
    stream: TcpStream,
}

impl XrootdConnection {
    /// Connect, handshake, exchange protocol versions, and log in with an
    /// anonymous identity.
    pub(crate) async fn connect(url: &Url) -> Result<Self, BackendError> {
        let host = url
            .host_str()
            .ok_or_else(|| BackendError::protocol(format!("missing host in {url}")))?;
        let port = url.port().unwrap_or(DEFAULT_PORT);

        let stream = TcpStream::connect((host, port)).await?;
        let mut conn = Self { stream };
        conn.handshake().await?;
        conn.exchange_protocol().await?;
        conn.login().await?;
        trace!(host, port, "kXR session established");
        Ok(conn)
    }

    async fn handshake(&mut self) -> Result<(), BackendError> {
        use tokio::io::AsyncWriteExt;

        self.stream.write_all(&wire::encode_handshake()).await?;
        let resp = wire::read_response(&mut self.stream).await?;
        if resp.status != KXR_OK {
            return Err(Self::status_error(&resp));
        }
        if resp.data.len() >= 8 {
            let mut data = resp.data.clone();
            let pval = data.get_i32();
            let server_type = data.get_i32();
            trace!(pval, server_type, "kXR handshake accepted");
        }
        Ok(())
    }

    async fn exchange_protocol(&mut self) -> Result<(), BackendError> {
        let frame = self
            .request(KXR_PROTOCOL, &wire::protocol_params(), b"")
            .await?;
        trace!(dlen = frame.data.len(), "kXR_protocol exchanged");
        Ok(())
    }

    async fn login(&mut self) -> Result<(), BackendError> {
        let pid = i32::try_from(std::process::id()).unwrap_or(0);
        let frame = self
            .request(KXR_LOGIN, &wire::login_params(pid, "xstream"), b"")
            .await?;
        trace!(session_len = frame.data.len(), "kXR_login accepted");
        Ok(())
    }

    /// Open `path` read-only; returns the server's file handle.
    pub(crate) async fn open_read(&mut self, path: &str) -> Result<[u8; 4], BackendError> {
        let frame = self
            .request(KXR_OPEN, &wire::open_params(KXR_OPEN_READ), path.as_bytes())
            .await?;
        if frame.data.len() < 4 {
            return Err(BackendError::protocol(
                "kXR_open response carries no file handle",
            ));
        }
        let mut fhandle = [0u8; 4];
        fhandle.copy_from_slice(&frame.data[..4]);
        trace!(path, ?fhandle, "file opened for read");
        Ok(fhandle)
    }

    /// Read up to `rlen` bytes at `offset`, reassembling `kXR_oksofar`
    /// continuation frames. An empty result means the offset is at or past
    /// the end of the file.
    pub(crate) async fn read(
        &mut self,
        fhandle: [u8; 4],
        offset: u64,
        rlen: u32,
    ) -> Result<Bytes, BackendError> {
        wire::write_request(
            &mut self.stream,
            KXR_READ,
            &wire::read_params(fhandle, offset, rlen),
            b"",
        )
        .await?;

        let mut payload = BytesMut::new();
        loop {
            let frame = wire::read_response(&mut self.stream).await?;
            self.check_streamid(&frame);
            match frame.status {
                KXR_OKSOFAR => payload.extend_from_slice(&frame.data),
                KXR_OK => {
                    payload.extend_from_slice(&frame.data);
                    trace!(offset, rlen, len = payload.len(), "kXR_read complete");
                    return Ok(payload.freeze());
                }
                _ => return Err(Self::status_error(&frame)),
            }
        }
    }

    /// Release the server-side file handle.
    pub(crate) async fn close_file(&mut self, fhandle: [u8; 4]) -> Result<(), BackendError> {
        self.request(KXR_CLOSE, &wire::close_params(fhandle), b"")
            .await?;
        trace!(?fhandle, "file closed");
        Ok(())
    }

    /// Send one request and read its single response, mapping any
    /// non-`kXR_ok` status to an error.
    async fn request(
        &mut self,
        reqid: u16,
        params: &[u8; 16],
        data: &[u8],
    ) -> Result<ResponseFrame, BackendError> {
        wire::write_request(&mut self.stream, reqid, params, data).await?;
        let frame = wire::read_response(&mut self.stream).await?;
        self.check_streamid(&frame);
        if frame.status != KXR_OK {
            return Err(Self::status_error(&frame));
        }
        Ok(frame)
    }

    fn check_streamid(&self, frame: &ResponseFrame) {
        if frame.streamid != wire::STREAM_ID {
            // One request in flight at a time; a foreign id is a server bug.
            warn!(?frame.streamid, "unexpected kXR stream id");
        }
    }

    fn status_error(frame: &ResponseFrame) -> BackendError {
        match frame.status {
            KXR_ERROR => wire::decode_error(&frame.data),
            KXR_REDIRECT => BackendError::protocol("server redirect not supported"),
            KXR_WAIT => BackendError::protocol("server requested wait; not supported"),
            KXR_AUTHMORE => {
                BackendError::protocol("server requires authentication; anonymous login only")
            }
            status => BackendError::protocol(format!("unexpected kXR status {status}")),
        }
    }
}
