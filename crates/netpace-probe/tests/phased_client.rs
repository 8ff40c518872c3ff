//! Integration tests for PhasedHttpClient against an in-process HTTP/1.1 server.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use netpace_probe::{
    AddressFamily, Error, Method, PhasedHttpClient, RequestOptions, Resolve, TimingRecord,
    CHUNKED_EMPTY_TRANSFER_PADDING,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the canned server saw on its single connection.
#[derive(Debug)]
struct Received {
    head: String,
    body: Vec<u8>,
    peer: SocketAddr,
}

impl Received {
    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }
}

/// Accept one connection, read one request and answer with `response` verbatim.
async fn serve_once(response: &'static [u8]) -> (SocketAddr, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, peer) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let head_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let mut received = Received {
            head,
            body: buf[head_end..].to_vec(),
            peer,
        };
        let expected = received
            .header("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        while received.body.len() < expected {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending the body");
            received.body.extend_from_slice(&chunk[..n]);
        }

        socket.write_all(response).await.unwrap();
        socket.shutdown().await.unwrap();
        received
    });

    (addr, handle)
}

/// Accept one connection and answer whatever arrives with plain HTTP.
async fn serve_plaintext() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut chunk = [0u8; 1024];
        let _ = socket.read(&mut chunk).await;
        let _ = socket
            .write_all(b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n")
            .await;
        let _ = socket.shutdown().await;
    });

    (addr, handle)
}

struct FixedResolver(IpAddr);

impl Resolve for FixedResolver {
    async fn resolve(&self, _host: &str, _port: u16, _family: AddressFamily) -> netpace_probe::Result<IpAddr> {
        Ok(self.0)
    }
}

struct FailingResolver;

impl Resolve for FailingResolver {
    async fn resolve(&self, host: &str, _port: u16, _family: AddressFamily) -> netpace_probe::Result<IpAddr> {
        Err(Error::Dns {
            host: host.to_string(),
            reason: "no such host".to_string(),
        })
    }
}

#[tokio::test]
async fn test_get_with_content_length() {
    let (addr, server) = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nX-Probe-Id: abc\r\nConnection: close\r\n\r\nhello",
    )
    .await;
    let client = PhasedHttpClient::new().unwrap();

    let mut response = client
        .request(&format!("http://{}/__down?bytes=5", addr), RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.status_text(), "OK");
    assert!(response.ok());
    assert_eq!(response.headers().get("x-probe-id"), Some("abc"));
    assert_eq!(response.bytes().unwrap().as_ref(), b"hello");
    assert!(matches!(response.bytes(), Err(Error::BodyReuse)));
    assert!(response.is_body_used());

    let timing = response.timing();
    assert!(timing.is_monotonic());
    assert_eq!(timing.transfer_size, 5);
    assert_eq!(timing.decoded_body_size, 5);
    assert!(timing.download_latency.is_some());
    assert!(timing.upload_latency.is_none());
    assert_eq!(timing.protocol, "http/1.1");
    assert_eq!(timing.remote_addr, Some(addr));
    // IP literal: no lookup, no TLS
    assert_eq!(timing.dns_duration(), Duration::ZERO);
    assert_eq!(timing.tls_duration(), Duration::ZERO);

    let received = server.await.unwrap();
    assert!(received.head.starts_with("GET /__down?bytes=5 HTTP/1.1\r\n"));
    assert_eq!(received.header("host"), Some(addr.to_string().as_str()));
    assert!(received.header("user-agent").unwrap().starts_with("netpace/"));
}

#[tokio::test]
async fn test_empty_chunked_response_is_padded() {
    let (addr, server) =
        serve_once(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n").await;
    let client = PhasedHttpClient::new().unwrap();

    let response = client
        .request(&format!("http://{}/", addr), RequestOptions::default())
        .await
        .unwrap();

    let timing = response.timing();
    assert_eq!(timing.transfer_size, CHUNKED_EMPTY_TRANSFER_PADDING);
    assert_eq!(timing.decoded_body_size, 0);
    assert!(timing.is_monotonic());
    server.await.unwrap();
}

#[tokio::test]
async fn test_chunked_padding_is_configurable() {
    let (addr, server) =
        serve_once(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n").await;
    let client = PhasedHttpClient::new().unwrap();

    let response = client
        .request(
            &format!("http://{}/", addr),
            RequestOptions::default().chunked_padding(0),
        )
        .await
        .unwrap();

    assert_eq!(response.timing().transfer_size, 0);
    server.await.unwrap();
}

#[tokio::test]
async fn test_post_sends_body_and_reports_upload_latency() {
    let (addr, server) =
        serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
    let client = PhasedHttpClient::new().unwrap();

    let response = client
        .request(
            &format!("http://{}/__up", addr),
            RequestOptions::default()
                .method(Method::POST)
                .body(vec![b'0'; 16])
                .header("Content-Type", "text/plain"),
        )
        .await
        .unwrap();

    let timing = response.timing();
    assert!(timing.upload_latency.is_some());
    assert!(timing.download_latency.is_none());
    assert!(timing.is_monotonic());

    let received = server.await.unwrap();
    assert!(received.head.starts_with("POST /__up HTTP/1.1\r\n"));
    assert_eq!(received.header("content-length"), Some("16"));
    assert_eq!(received.header("content-type"), Some("text/plain"));
    assert_eq!(received.body, vec![b'0'; 16]);
}

#[tokio::test]
async fn test_non_success_status_is_not_an_error() {
    let (addr, server) = serve_once(
        b"HTTP/1.1 404 Nope\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
    )
    .await;
    let client = PhasedHttpClient::new().unwrap();

    let mut response = client
        .request(&format!("http://{}/missing", addr), RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    assert_eq!(response.status_text(), "Nope");
    assert!(!response.ok());
    assert_eq!(response.bytes().unwrap().as_ref(), b"not found");
    server.await.unwrap();
}

#[tokio::test]
async fn test_closed_port_fails_in_connect_phase() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = PhasedHttpClient::new().unwrap();
    let err = client
        .request(
            &format!("http://{}/", addr),
            RequestOptions::default().connect_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Connect { addr: failed, .. } if failed == addr));
    assert!(err.is_connect_phase());
}

#[tokio::test]
async fn test_tls_handshake_failure() {
    let (addr, server) = serve_plaintext().await;
    let client = PhasedHttpClient::new().unwrap();
    let err = client
        .request(
            &format!("https://{}/", addr),
            RequestOptions::default().connect_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Tls { ref host, .. } if host == "127.0.0.1"), "{:?}", err);
    assert!(err.is_connect_phase());
    server.await.unwrap();
}

#[tokio::test]
async fn test_malformed_header_is_rejected_before_connecting() {
    let client = PhasedHttpClient::new().unwrap();
    let err = client
        .request(
            "http://127.0.0.1:9/",
            RequestOptions::default().header("bad header", "x"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(ref reason) if reason.starts_with("invalid request for")));
    assert!(!err.is_connect_phase());
}

#[tokio::test]
async fn test_resolution_failure() {
    let client = PhasedHttpClient::with_resolver(FailingResolver).unwrap();
    let err = client
        .request("http://speed.invalid/__down", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Dns { ref host, .. } if host == "speed.invalid"));
}

#[tokio::test]
async fn test_invalid_url_is_rejected_before_connecting() {
    let client = PhasedHttpClient::new().unwrap();
    let err = client
        .request("ftp://example.com/file", RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidUrl { .. }));
}

#[tokio::test]
async fn test_domain_goes_through_resolver() {
    let (addr, server) =
        serve_once(b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n").await;
    let client = PhasedHttpClient::with_resolver(FixedResolver(addr.ip()))
        .unwrap()
        .user_agent("probe-test");

    let response = client
        .request(
            &format!("http://speed.test:{}/__down", addr.port()),
            RequestOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 204);
    assert_eq!(response.timing().remote_addr, Some(addr));

    let received = server.await.unwrap();
    assert_eq!(
        received.header("host"),
        Some(format!("speed.test:{}", addr.port()).as_str())
    );
    assert_eq!(received.header("user-agent"), Some("probe-test"));
}

#[tokio::test]
async fn test_local_address_binds_source() {
    let (addr, server) =
        serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
    let client = PhasedHttpClient::new().unwrap();
    let source: IpAddr = "127.0.0.1".parse().unwrap();

    let response = client
        .request(
            &format!("http://{}/", addr),
            RequestOptions::default().local_address(source),
        )
        .await
        .unwrap();

    assert_eq!(response.timing().local_addr.map(|a| a.ip()), Some(source));
    let received = server.await.unwrap();
    assert_eq!(received.peer.ip(), source);
}

#[tokio::test]
async fn test_timing_hook_fires_once() {
    let (addr, server) = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc",
    )
    .await;
    let client = PhasedHttpClient::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    client
        .request(
            &format!("http://{}/", addr),
            RequestOptions::default().on_timing(Arc::new(move |timing: &TimingRecord| {
                assert_eq!(timing.transfer_size, 3);
                seen.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    server.await.unwrap();
}

#[tokio::test]
async fn test_unretained_body_is_still_counted() {
    let (addr, server) = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\n0123456789",
    )
    .await;
    let client = PhasedHttpClient::new().unwrap();

    let mut response = client
        .request(
            &format!("http://{}/", addr),
            RequestOptions::default().retain_body(false),
        )
        .await
        .unwrap();

    assert!(response.bytes().unwrap().is_empty());
    assert_eq!(response.timing().decoded_body_size, 10);
    assert_eq!(response.timing().transfer_size, 10);
    server.await.unwrap();
}
