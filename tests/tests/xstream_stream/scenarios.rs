//! End-to-end scenarios: clipped EOF, construction failure, lookback
//! eviction, mid-stream fetch failure.

use std::time::Duration;

use rstest::rstest;
use xstream::{OpenError, StreamConfig};
use xstream_stream::{PrefetchingStreamBuffer, StreamError, StreamOptions};
use xstream_test_utils::{BlobServer, MemoryBackend, Xorshift64};

fn opts(block_size: u64, readahead: usize, lookback: usize) -> StreamOptions {
    StreamOptions {
        block_size,
        readahead,
        lookback,
        verbose: false,
    }
}

// A 25-unit resource with 10-unit blocks: block 2 is clipped, block 3 is
// the EOF sentinel.
#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn clipped_block_then_empty_terminates_stream() {
    let data = Xorshift64::new(1).bytes(25);
    let backend = MemoryBackend::new(data.clone());
    let mut stream = PrefetchingStreamBuffer::open(backend.clone(), &opts(10, 3, 3))
        .await
        .expect("open");

    // Construction yields block 0 synchronously.
    assert_eq!(stream.remaining(), &data[..10]);

    let mut out = Vec::new();
    let mut buf = [0u8; 10];
    loop {
        let n = stream.read(&mut buf).await.expect("read");
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }

    assert_eq!(out, data);
    assert_eq!(stream.position(), 25);
    assert!(stream.is_eof());

    // The clipped block and the EOF probe were both fetched exactly once.
    let fetches = backend.fetches();
    for offset in [0, 10, 20, 30] {
        assert_eq!(
            fetches.iter().filter(|&&o| o == offset).count(),
            1,
            "offset {offset} fetched more than once: {fetches:?}"
        );
    }

    stream.close().await.expect("close");
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn http_404_fails_construction_synchronously() {
    let server = BlobServer::serve(Xorshift64::new(2).bytes(100)).await;

    let err = xstream::open(server.missing_url().as_str(), &StreamConfig::default())
        .await
        .expect_err("404 must abort construction");

    match err {
        OpenError::Stream(StreamError::Connection { ref source, .. }) => {
            assert_eq!(source.status_code(), Some(404));
        }
        other => panic!("expected Connection error, got {other:?}"),
    }
    assert!(err.to_string().contains("404 Not Found"));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn failed_initial_fetch_starts_no_background_tasks() {
    let server = BlobServer::serve_with_failures(Xorshift64::new(2).bytes(100), [0]).await;

    let err = xstream::open(server.url().as_str(), &StreamConfig::default())
        .await
        .expect_err("500 on block 0 must abort construction");

    assert!(matches!(
        err,
        OpenError::Stream(StreamError::Connection { .. })
    ));
    // Exactly the inline block-0 request; nothing was dispatched behind it.
    assert_eq!(server.requests(), vec![0]);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn lookback_eviction_frees_old_blocks_without_refetch() {
    let block = 8u64;
    let data = Xorshift64::new(4).bytes(8 * block as usize);
    let backend = MemoryBackend::new(data);
    let mut stream = PrefetchingStreamBuffer::open(backend.clone(), &opts(block, 2, 3))
        .await
        .expect("open");

    // Advance through six blocks.
    for _ in 0..5 {
        assert!(stream.read_more().await.expect("read_more"));
    }

    let stats = stream.stats();
    assert_eq!(stats.current_index, 3, "lookback retains three blocks");
    assert_eq!(stats.behind, 3);
    assert_eq!(stats.offsets[0], 2 * block, "blocks 0 and 1 evicted");

    // Blocks 2..=5 are still resident; nothing was ever fetched twice.
    for offset in (0..6).map(|i| i * block) {
        assert_eq!(
            backend.fetch_count(offset),
            1,
            "duplicate fetch at offset {offset}"
        );
    }

    stream.close().await.expect("close");
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn mid_stream_failure_surfaces_when_block_becomes_current() {
    let block = 8u64;
    let data = Xorshift64::new(6).bytes(8 * block as usize);
    let backend = MemoryBackend::new(data.clone()).with_failure_at(2 * block);
    let mut stream = PrefetchingStreamBuffer::open(backend, &opts(block, 2, 1))
        .await
        .expect("open");

    // Blocks 0 and 1 read normally.
    let mut buf = [0u8; 8];
    for i in 0..2 {
        assert_eq!(stream.read(&mut buf).await.expect("read"), 8);
        assert_eq!(buf, data[i * 8..(i + 1) * 8]);
    }

    // The read that would consume block 2 raises the captured error.
    let err = stream.read(&mut buf).await.expect_err("block 2 failed");
    match &err {
        StreamError::RangeFetch { offset, source } => {
            assert_eq!(*offset, 16);
            assert_eq!(source.status_code(), Some(500));
        }
        other => panic!("expected RangeFetch, got {other:?}"),
    }
    assert!(err.to_string().contains("Internal Server Error"));

    // The stream is terminally failed: same error, every time.
    let again = stream.read(&mut buf).await.expect_err("stream is unusable");
    assert_eq!(again.to_string(), err.to_string());
    assert!(!stream.is_eof());
    assert!(stream.error().is_some());
    assert_eq!(stream.position(), 16, "delivered bytes are preserved");
}
