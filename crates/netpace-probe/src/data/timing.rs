use std::net::SocketAddr;
use std::time::Duration;

use http::{Method, Version};
use serde::Serialize;
use tokio::time::Instant;

use crate::core::{is_write_method, transfer_size, TransferFacts, CHUNKED_EMPTY_TRANSFER_PADDING};

/// Phase boundaries and derived sizes of one HTTP exchange.
///
/// Mirrors the browser resource-timing model. Timestamps are monotonic and
/// never decrease in field order:
///
/// `start_time ≤ dns_start ≤ dns_end ≤ tcp_connect_start ≤ tcp_connect_end ≤
/// tls_handshake_start ≤ tls_handshake_end ≤ first_byte_time ≤ end_time`
///
/// A record is produced by a [`TimingRecorder`] and handed to the caller; the
/// client keeps no copy.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingRecord {
    pub start_time: Instant,
    pub dns_start: Instant,
    pub dns_end: Instant,
    pub tcp_connect_start: Instant,
    pub tcp_connect_end: Instant,
    pub tls_handshake_start: Instant,
    pub tls_handshake_end: Instant,
    pub first_byte_time: Instant,
    pub end_time: Instant,

    /// Time to first byte.
    pub latency: Duration,

    /// Declared content length, else received bytes (see [`transfer_size`]).
    pub transfer_size: u64,
    pub encoded_body_size: u64,
    pub decoded_body_size: u64,

    /// Set for read methods: first byte minus start.
    pub download_latency: Option<Duration>,
    /// Set for write methods: end of the handshake minus start.
    pub upload_latency: Option<Duration>,

    /// Negotiated protocol, e.g. `"http/1.1"`.
    pub protocol: &'static str,
    pub remote_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
}

impl TimingRecord {
    pub fn dns_duration(&self) -> Duration {
        self.dns_end - self.dns_start
    }

    pub fn connect_duration(&self) -> Duration {
        self.tcp_connect_end - self.tcp_connect_start
    }

    pub fn tls_duration(&self) -> Duration {
        self.tls_handshake_end - self.tls_handshake_start
    }

    pub fn ttfb(&self) -> Duration {
        self.latency
    }

    /// Time spent streaming the body after the first byte.
    pub fn transfer_duration(&self) -> Duration {
        self.end_time - self.first_byte_time
    }

    pub fn total_duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Body throughput in bits per second, `None` when the transfer took no measurable time.
    pub fn throughput_bps(&self) -> Option<f64> {
        let secs = self.transfer_duration().as_secs_f64();
        (secs > 0.0).then(|| (self.decoded_body_size * 8) as f64 / secs)
    }

    /// Checks the phase ordering invariant.
    pub fn is_monotonic(&self) -> bool {
        let phases = [
            self.start_time,
            self.dns_start,
            self.dns_end,
            self.tcp_connect_start,
            self.tcp_connect_end,
            self.tls_handshake_start,
            self.tls_handshake_end,
            self.first_byte_time,
            self.end_time,
        ];
        phases.windows(2).all(|w| w[0] <= w[1])
    }

    /// Serializable view with every phase in milliseconds relative to `start_time`.
    pub fn snapshot(&self) -> TimingSnapshot {
        let offset = |at: Instant| millis(at - self.start_time);
        TimingSnapshot {
            dns_start: offset(self.dns_start),
            dns_end: offset(self.dns_end),
            tcp_connect_start: offset(self.tcp_connect_start),
            tcp_connect_end: offset(self.tcp_connect_end),
            tls_handshake_start: offset(self.tls_handshake_start),
            tls_handshake_end: offset(self.tls_handshake_end),
            first_byte_time: offset(self.first_byte_time),
            end_time: offset(self.end_time),
            latency: millis(self.latency),
            transfer_size: self.transfer_size,
            encoded_body_size: self.encoded_body_size,
            decoded_body_size: self.decoded_body_size,
            download_latency: self.download_latency.map(millis),
            upload_latency: self.upload_latency.map(millis),
            protocol: self.protocol,
            remote_addr: self.remote_addr,
            local_addr: self.local_addr,
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

/// [`TimingRecord`] flattened to millisecond offsets for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingSnapshot {
    pub dns_start: f64,
    pub dns_end: f64,
    pub tcp_connect_start: f64,
    pub tcp_connect_end: f64,
    pub tls_handshake_start: f64,
    pub tls_handshake_end: f64,
    pub first_byte_time: f64,
    pub end_time: f64,
    pub latency: f64,
    pub transfer_size: u64,
    pub encoded_body_size: u64,
    pub decoded_body_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_latency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_latency: Option<f64>,
    pub protocol: &'static str,
    pub remote_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
}

/// Facts about a finished exchange needed to finalize a [`TimingRecord`].
#[derive(Debug, Clone)]
pub struct ExchangeSummary {
    pub method: Method,
    pub transfer: TransferFacts,
    pub chunked_padding: u64,
    pub protocol: &'static str,
    pub remote_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
}

impl Default for ExchangeSummary {
    fn default() -> Self {
        Self {
            method: Method::GET,
            transfer: TransferFacts::default(),
            chunked_padding: CHUNKED_EMPTY_TRANSFER_PADDING,
            protocol: protocol_name(Version::HTTP_11),
            remote_addr: None,
            local_addr: None,
        }
    }
}

/// Phase clock for one exchange.
///
/// Each mark is clamped to the previous one, so a record finalized from marks
/// taken in phase order always satisfies the ordering invariant. Phases that do
/// not happen (no DNS lookup for IP literals, no TLS for plain HTTP) collapse to
/// zero-length intervals.
#[derive(Debug, Clone)]
pub struct TimingRecorder {
    start: Instant,
    dns_start: Instant,
    dns_end: Instant,
    connect_start: Instant,
    connect_end: Instant,
    tls_start: Instant,
    tls_end: Instant,
    response_head: Option<Instant>,
    first_byte: Option<Instant>,
    last: Instant,
}

impl TimingRecorder {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            dns_start: now,
            dns_end: now,
            connect_start: now,
            connect_end: now,
            tls_start: now,
            tls_end: now,
            response_head: None,
            first_byte: None,
            last: now,
        }
    }

    fn mark(&mut self) -> Instant {
        let now = Instant::now().max(self.last);
        self.last = now;
        now
    }

    pub fn dns_started(&mut self) {
        self.dns_start = self.mark();
        self.dns_end = self.dns_start;
    }

    pub fn dns_finished(&mut self) {
        self.dns_end = self.mark();
    }

    pub fn connect_started(&mut self) {
        self.connect_start = self.mark();
        self.connect_end = self.connect_start;
    }

    /// Ends the TCP phase. The handshake interval starts here and is zero-length until
    /// [`tls_finished`](Self::tls_finished) is called.
    pub fn connect_finished(&mut self) {
        self.connect_end = self.mark();
        self.tls_start = self.connect_end;
        self.tls_end = self.connect_end;
    }

    pub fn tls_finished(&mut self) {
        self.tls_end = self.mark();
    }

    /// Response status line and headers arrived.
    pub fn response_started(&mut self) {
        if self.response_head.is_none() {
            self.response_head = Some(self.mark());
        }
    }

    /// First body byte arrived; later calls are ignored.
    pub fn first_byte(&mut self) {
        if self.first_byte.is_none() {
            self.first_byte = Some(self.mark());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stamp the end of the exchange and derive latencies and sizes.
    pub fn finish(mut self, summary: ExchangeSummary) -> TimingRecord {
        let end_time = self.mark();

        // Phases that were never marked sit at `start`; lift them to the
        // preceding phase so the record stays ordered.
        let mut floor = self.start;
        let mut lift = |at: Instant| {
            floor = floor.max(at);
            floor
        };
        let dns_start = lift(self.dns_start);
        let dns_end = lift(self.dns_end);
        let tcp_connect_start = lift(self.connect_start);
        let tcp_connect_end = lift(self.connect_end);
        let tls_handshake_start = lift(self.tls_start);
        let tls_handshake_end = lift(self.tls_end);
        let first_byte_time = lift(self.first_byte.or(self.response_head).unwrap_or(end_time));

        let latency = first_byte_time - self.start;
        let write = is_write_method(&summary.method);

        TimingRecord {
            start_time: self.start,
            dns_start,
            dns_end,
            tcp_connect_start,
            tcp_connect_end,
            tls_handshake_start,
            tls_handshake_end,
            first_byte_time,
            end_time,
            latency,
            transfer_size: transfer_size(&summary.transfer, summary.chunked_padding),
            encoded_body_size: summary.transfer.body_bytes,
            decoded_body_size: summary.transfer.body_bytes,
            download_latency: (!write).then_some(latency),
            upload_latency: write.then(|| tls_handshake_end - self.start),
            protocol: summary.protocol,
            remote_addr: summary.remote_addr,
            local_addr: summary.local_addr,
        }
    }
}

/// ALPN-style name of an HTTP version.
pub fn protocol_name(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "http/0.9",
        Version::HTTP_10 => "http/1.0",
        Version::HTTP_11 => "http/1.1",
        Version::HTTP_2 => "h2",
        Version::HTTP_3 => "h3",
        _ => "unknown",
    }
}
