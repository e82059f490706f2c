//! XRootD backend against the fake kXR server.

use std::time::Duration;

use rstest::rstest;
use xstream_net::{BackendError, FetchOutcome, RangeBackend};
use xstream_stream::{PrefetchingStreamBuffer, StreamError, StreamOptions};
use xstream_test_utils::{FakeXrootdServer, Xorshift64};
use xstream_xrootd::XrootdBackend;

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn reads_reassemble_oksofar_continuations() {
    // 2000-byte reads exceed the server's split threshold, so every block
    // arrives as oksofar + ok.
    let data = Xorshift64::new(31).bytes(5000);
    let server = FakeXrootdServer::spawn(data.clone()).await;
    let backend = XrootdBackend::open(&server.url("store/run42.dat"))
        .await
        .expect("open");

    match backend.fetch_range(0, 2000).await.expect("fetch") {
        FetchOutcome::Bytes(payload) => assert_eq!(&payload[..], &data[..2000]),
        FetchOutcome::Empty => panic!("expected payload"),
    }
    match backend.fetch_range(4000, 2000).await.expect("fetch") {
        FetchOutcome::Bytes(payload) => assert_eq!(&payload[..], &data[4000..]),
        FetchOutcome::Empty => panic!("expected clipped payload"),
    }
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn zero_byte_read_is_the_eof_sentinel() {
    let server = FakeXrootdServer::spawn(Xorshift64::new(32).bytes(100)).await;
    let backend = XrootdBackend::open(&server.url("f")).await.expect("open");

    assert!(matches!(
        backend.fetch_range(100, 50).await.expect("fetch"),
        FetchOutcome::Empty
    ));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn concurrent_fetches_are_serialized_internally() {
    let data = Xorshift64::new(33).bytes(4000);
    let server = FakeXrootdServer::spawn(data.clone()).await;
    let backend = XrootdBackend::open(&server.url("f")).await.expect("open");

    let (a, b) = tokio::join!(backend.fetch_range(0, 2000), backend.fetch_range(2000, 2000));
    assert_eq!(
        &a.expect("fetch a").into_bytes().expect("payload")[..],
        &data[..2000]
    );
    assert_eq!(
        &b.expect("fetch b").into_bytes().expect("payload")[..],
        &data[2000..]
    );
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn stream_over_xrootd_delivers_exact_content() {
    let data = Xorshift64::new(34).bytes(5000);
    let server = FakeXrootdServer::spawn(data.clone()).await;
    let backend = XrootdBackend::open(&server.url("f")).await.expect("open");

    let opts = StreamOptions {
        block_size: 1500,
        readahead: 2,
        lookback: 1,
        verbose: false,
    };
    let mut stream = PrefetchingStreamBuffer::open(backend, &opts)
        .await
        .expect("open stream");

    let mut out = Vec::new();
    let mut buf = [0u8; 333];
    loop {
        let n = stream.read(&mut buf).await.expect("read");
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, data);

    stream.close().await.expect("close");
    assert_eq!(server.close_requests(), 1);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn injected_server_error_surfaces_in_order() {
    let block = 1000u64;
    let data = Xorshift64::new(35).bytes(4000);
    let server = FakeXrootdServer::spawn_with_failures(data.clone(), [2 * block]).await;
    let backend = XrootdBackend::open(&server.url("f")).await.expect("open");

    let opts = StreamOptions {
        block_size: block,
        readahead: 2,
        lookback: 1,
        verbose: false,
    };
    let mut stream = PrefetchingStreamBuffer::open(backend, &opts)
        .await
        .expect("open stream");

    let mut buf = vec![0u8; block as usize];
    for i in 0..2 {
        assert_eq!(stream.read(&mut buf).await.expect("read"), block as usize);
        assert_eq!(buf, data[i * block as usize..(i + 1) * block as usize]);
    }

    let err = stream.read(&mut buf).await.expect_err("block 2 fails");
    match &err {
        StreamError::RangeFetch { offset, source } => {
            assert_eq!(*offset, 2 * block);
            assert!(matches!(source, BackendError::Server { code: 3011, .. }));
        }
        other => panic!("expected RangeFetch, got {other:?}"),
    }
    assert!(err.to_string().contains("injected read failure"));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn close_sends_kxr_close_exactly_once() {
    let server = FakeXrootdServer::spawn(Xorshift64::new(36).bytes(100)).await;
    let backend = XrootdBackend::open(&server.url("f")).await.expect("open");

    backend.close().await.expect("first close");
    backend.close().await.expect("second close");
    assert_eq!(server.close_requests(), 1);
}
