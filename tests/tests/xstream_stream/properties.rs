//! Stream-level properties: content exactness, window bounds, EOF
//! delivery, teardown.

use std::time::Duration;

use rstest::rstest;
use xstream_stream::{PrefetchingStreamBuffer, StreamOptions};
use xstream_test_utils::{MemoryBackend, Xorshift64};

fn opts(block_size: u64, readahead: usize, lookback: usize) -> StreamOptions {
    StreamOptions {
        block_size,
        readahead,
        lookback,
        verbose: false,
    }
}

async fn read_all(stream: &mut PrefetchingStreamBuffer<MemoryBackend>) -> Vec<u8> {
    let mut out = Vec::new();
    // Odd buffer size so reads land unevenly on block boundaries.
    let mut buf = [0u8; 97];
    loop {
        let n = stream.read(&mut buf).await.expect("read");
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out
}

#[rstest]
#[case::block_larger_than_resource(25, 100, 3, 3)]
#[case::resource_is_exact_multiple(64, 8, 3, 3)]
#[case::tiny_blocks(1000, 7, 1, 0)]
#[case::no_lookback(123, 10, 2, 0)]
#[case::deep_window(4096, 32, 8, 5)]
#[case::single_byte_blocks(40, 1, 4, 2)]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn content_is_exact_regardless_of_tuning(
    #[case] len: usize,
    #[case] block_size: u64,
    #[case] readahead: usize,
    #[case] lookback: usize,
) {
    let data = Xorshift64::new(42).bytes(len);
    let backend = MemoryBackend::new(data.clone());
    let mut stream =
        PrefetchingStreamBuffer::open(backend, &opts(block_size, readahead, lookback))
            .await
            .expect("open");

    assert_eq!(read_all(&mut stream).await, data);
    assert_eq!(stream.position(), len as u64);
    stream.close().await.expect("close");
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn window_bounds_hold_throughout_consumption() {
    let data = Xorshift64::new(7).bytes(64 * 4);
    let backend = MemoryBackend::new(data);
    let mut stream = PrefetchingStreamBuffer::open(backend, &opts(4, 3, 2))
        .await
        .expect("open");

    loop {
        let stats = stream.stats();
        assert!(stats.ahead <= 3, "readahead bound violated: {stats:?}");
        assert!(stats.behind <= 2, "lookback bound violated: {stats:?}");
        for pair in stats.offsets.windows(2) {
            assert_eq!(pair[1], pair[0] + 4, "window not contiguous: {stats:?}");
        }
        if !stream.read_more().await.expect("read_more") {
            break;
        }
    }
    stream.close().await.expect("close");
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn eof_reported_once_with_no_further_fetches() {
    let data = Xorshift64::new(3).bytes(10);
    let backend = MemoryBackend::new(data.clone());
    let mut stream = PrefetchingStreamBuffer::open(backend.clone(), &opts(4, 2, 1))
        .await
        .expect("open");

    assert_eq!(read_all(&mut stream).await, data);
    assert!(stream.is_eof());

    let fetches_at_eof = backend.total_fetches();
    assert!(!stream.read_more().await.expect("read_more after EOF"));
    assert!(!stream.read_more().await.expect("read_more after EOF"));
    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).await.expect("read after EOF"), 0);
    assert_eq!(backend.total_fetches(), fetches_at_eof);

    stream.close().await.expect("close");
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn empty_resource_is_a_legal_empty_stream() {
    let backend = MemoryBackend::new(Vec::new());
    let mut stream = PrefetchingStreamBuffer::open(backend.clone(), &opts(8, 3, 3))
        .await
        .expect("open");

    assert!(stream.is_eof());
    assert!(stream.remaining().is_empty());
    let mut buf = [0u8; 8];
    assert_eq!(stream.read(&mut buf).await.expect("read"), 0);
    // Only the inline block-0 probe; EOF dispatches nothing.
    assert_eq!(backend.total_fetches(), 1);

    stream.close().await.expect("close");
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn close_joins_every_outstanding_fetch() {
    let data = Xorshift64::new(11).bytes(64);
    let backend = MemoryBackend::new(data)
        .with_delay(4, Duration::from_millis(150))
        .with_delay(8, Duration::from_millis(50));
    let stream = PrefetchingStreamBuffer::open(backend.clone(), &opts(4, 3, 1))
        .await
        .expect("open");

    // Close immediately, while the delayed prefetches are still in flight.
    stream.close().await.expect("close");

    assert_eq!(backend.in_flight(), 0, "close returned with tasks running");
    assert_eq!(backend.close_calls(), 1);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn delivery_order_is_offset_order_despite_completion_order() {
    let data = Xorshift64::new(5).bytes(40);
    // Block 1 completes long after blocks 2 and 3.
    let backend = MemoryBackend::new(data.clone()).with_delay(8, Duration::from_millis(120));
    let mut stream = PrefetchingStreamBuffer::open(backend, &opts(8, 3, 1))
        .await
        .expect("open");

    assert_eq!(read_all(&mut stream).await, data);
    stream.close().await.expect("close");
}
