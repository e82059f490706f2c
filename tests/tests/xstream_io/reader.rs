//! Blocking reader: Read/BufRead behavior, line iteration, teardown.

use std::io::{BufRead, Read};

use tokio::runtime::Runtime;
use xstream::StreamConfig;
use xstream_io::StreamReader;
use xstream_stream::{PrefetchingStreamBuffer, StreamOptions};
use xstream_test_utils::{BlobServer, MemoryBackend, Xorshift64};

fn opts(block_size: u64) -> StreamOptions {
    StreamOptions {
        block_size,
        readahead: 2,
        lookback: 1,
        verbose: false,
    }
}

#[test]
fn open_blocking_reads_to_end() {
    let data = Xorshift64::new(41).bytes(10_000);

    // The fixture server needs its own runtime; the reader builds one of
    // its own inside open_blocking.
    let server_rt = Runtime::new().expect("server runtime");
    let server = server_rt.block_on(BlobServer::serve(data.clone()));

    let config = StreamConfig::default().with_block_size(1024);
    let mut reader =
        xstream::open_blocking(server.url().as_str(), &config).expect("open_blocking");

    let mut out = Vec::new();
    reader.read_to_end(&mut out).expect("read_to_end");
    assert_eq!(out, data);
    assert_eq!(reader.position(), data.len() as u64);
    assert!(reader.is_eof());

    reader.close().expect("close");
}

#[test]
fn lines_iterate_over_the_stream() {
    let text = b"alpha\nbeta\ngamma\n".to_vec();

    let server_rt = Runtime::new().expect("server runtime");
    let server = server_rt.block_on(BlobServer::serve(text));

    // A block size smaller than a line exercises refill mid-line.
    let config = StreamConfig::default().with_block_size(4);
    let reader = xstream::open_blocking(server.url().as_str(), &config).expect("open_blocking");

    let lines: Vec<String> = reader.lines().map(|l| l.expect("line")).collect();
    assert_eq!(lines, ["alpha", "beta", "gamma"]);
}

#[test]
fn from_handle_drives_a_shared_runtime() {
    let data = Xorshift64::new(43).bytes(500);
    let backend = MemoryBackend::new(data.clone());

    let rt = Runtime::new().expect("runtime");
    let buffer = rt
        .block_on(PrefetchingStreamBuffer::open(backend.clone(), &opts(64)))
        .expect("open");
    let mut reader = StreamReader::from_handle(buffer, rt.handle().clone());

    let mut out = Vec::new();
    reader.read_to_end(&mut out).expect("read_to_end");
    assert_eq!(out, data);

    // Dropping without close still joins tasks and closes the backend.
    drop(reader);
    assert_eq!(backend.in_flight(), 0);
    assert_eq!(backend.close_calls(), 1);
}

#[test]
fn stream_failure_maps_to_io_error() {
    let data = Xorshift64::new(44).bytes(256);
    let backend = MemoryBackend::new(data).with_failure_at(64);

    let rt = Runtime::new().expect("runtime");
    let buffer = rt
        .block_on(PrefetchingStreamBuffer::open(backend, &opts(64)))
        .expect("open");
    let mut reader = StreamReader::from_handle(buffer, rt.handle().clone());

    let mut out = Vec::new();
    let err = reader.read_to_end(&mut out).expect_err("block 1 fails");
    assert!(err.to_string().contains("range fetch failed at offset 64"));
}
