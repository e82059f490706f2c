//! kXR wire framing for the anonymous-read dialect.
//!
//! Every client request is a fixed 24-byte header followed by `dlen`
//! payload bytes; every server response is an 8-byte header followed by
//! `dlen` data bytes. All integers are big-endian.
//!
//! ```text
//! request                              response
//! +----------+-------+--------+------+ +----------+--------+------+
//! | streamid | reqid | params | dlen | | streamid | status | dlen |
//! | 2 bytes  | u16   | 16 B   | u32  | | 2 bytes  | u16    | u32  |
//! +----------+-------+--------+------+ +----------+--------+------+
//! ```
//!
//! A session opens with a 20-byte handshake (five big-endian words, the
//! last two `4` and `2012`) answered by a standard response frame whose
//! data carries the server's protocol version and type.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use xstream_net::BackendError;

// Request ids used by this dialect.
pub const KXR_CLOSE: u16 = 3003;
pub const KXR_PROTOCOL: u16 = 3006;
pub const KXR_LOGIN: u16 = 3007;
pub const KXR_OPEN: u16 = 3010;
pub const KXR_READ: u16 = 3013;

// Response status codes.
pub const KXR_OK: u16 = 0;
pub const KXR_OKSOFAR: u16 = 4000;
pub const KXR_ATTN: u16 = 4001;
pub const KXR_AUTHMORE: u16 = 4002;
pub const KXR_ERROR: u16 = 4003;
pub const KXR_REDIRECT: u16 = 4004;
pub const KXR_WAIT: u16 = 4005;

/// `kXR_open` option bit: open for reading.
pub const KXR_OPEN_READ: u16 = 0x0010;

/// Protocol version advertised in `kXR_protocol`.
pub const PROTOCOL_VERSION: i32 = 0x0310;

pub const REQUEST_HEADER_LEN: usize = 24;
pub const RESPONSE_HEADER_LEN: usize = 8;
pub const HANDSHAKE_LEN: usize = 20;

/// Stream id used on the single serialized session.
pub const STREAM_ID: [u8; 2] = *b"xs";

/// One server response: header fields plus its data payload.
#[derive(Debug)]
pub struct ResponseFrame {
    pub streamid: [u8; 2],
    pub status: u16,
    pub data: Bytes,
}

/// The fixed 20-byte client handshake.
#[must_use]
pub fn encode_handshake() -> [u8; HANDSHAKE_LEN] {
    let mut buf = [0u8; HANDSHAKE_LEN];
    buf[12..16].copy_from_slice(&4i32.to_be_bytes());
    buf[16..20].copy_from_slice(&2012i32.to_be_bytes());
    buf
}

/// Write one request frame and flush.
pub async fn write_request<W>(
    io: &mut W,
    reqid: u16,
    params: &[u8; 16],
    data: &[u8],
) -> Result<(), BackendError>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = BytesMut::with_capacity(REQUEST_HEADER_LEN + data.len());
    frame.put_slice(&STREAM_ID);
    frame.put_u16(reqid);
    frame.put_slice(params);
    frame.put_u32(u32::try_from(data.len()).map_err(|_| {
        BackendError::protocol(format!("request payload of {} bytes exceeds frame limit", data.len()))
    })?);
    frame.put_slice(data);
    io.write_all(&frame).await?;
    io.flush().await?;
    Ok(())
}

/// Read one response frame (header plus `dlen` data bytes).
pub async fn read_response<R>(io: &mut R) -> Result<ResponseFrame, BackendError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; RESPONSE_HEADER_LEN];
    io.read_exact(&mut header).await?;

    let mut buf = &header[..];
    let mut streamid = [0u8; 2];
    buf.copy_to_slice(&mut streamid);
    let status = buf.get_u16();
    let dlen = buf.get_u32() as usize;

    let mut data = vec![0u8; dlen];
    io.read_exact(&mut data).await?;

    Ok(ResponseFrame {
        streamid,
        status,
        data: Bytes::from(data),
    })
}

/// `kXR_login` params: pid, 8-char username, ability/capver/role bytes.
#[must_use]
pub fn login_params(pid: i32, username: &str) -> [u8; 16] {
    let mut params = [0u8; 16];
    params[..4].copy_from_slice(&pid.to_be_bytes());
    let name = username.as_bytes();
    let n = name.len().min(8);
    params[4..4 + n].copy_from_slice(&name[..n]);
    // params[12] reserved, [13] ability, [14] capver, [15] role
    params[14] = 4;
    params
}

/// `kXR_protocol` params: client protocol version, rest reserved.
#[must_use]
pub fn protocol_params() -> [u8; 16] {
    let mut params = [0u8; 16];
    params[..4].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    params
}

/// `kXR_open` params: mode, option bits, rest reserved. The path travels
/// in the request data.
#[must_use]
pub fn open_params(options: u16) -> [u8; 16] {
    let mut params = [0u8; 16];
    params[2..4].copy_from_slice(&options.to_be_bytes());
    params
}

/// `kXR_read` params: file handle, offset, requested length.
#[must_use]
pub fn read_params(fhandle: [u8; 4], offset: u64, rlen: u32) -> [u8; 16] {
    let mut params = [0u8; 16];
    params[..4].copy_from_slice(&fhandle);
    params[4..12].copy_from_slice(&offset.to_be_bytes());
    params[12..16].copy_from_slice(&rlen.to_be_bytes());
    params
}

/// `kXR_close` params: file handle, rest reserved.
#[must_use]
pub fn close_params(fhandle: [u8; 4]) -> [u8; 16] {
    let mut params = [0u8; 16];
    params[..4].copy_from_slice(&fhandle);
    params
}

/// Decode a `kXR_error` data payload: errnum plus NUL-terminated message.
#[must_use]
pub fn decode_error(data: &[u8]) -> BackendError {
    if data.len() < 4 {
        return BackendError::protocol("short kXR_error frame");
    }
    let code = i32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let raw = &data[4..];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let message = String::from_utf8_lossy(&raw[..end]).into_owned();
    BackendError::Server { code, message }
}
