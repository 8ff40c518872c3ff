use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING, USER_AGENT};
use http::Request;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::connect::connect_tcp;
#[cfg(feature = "native-tls")]
use super::connect::TlsHandshaker;
use super::probe::Probe;
use super::resolve::{Resolve, SystemResolver};
use crate::core::{is_chunked, Target, TargetHost, TransferFacts};
use crate::data::{
    protocol_name, ExchangeSummary, Headers, RequestOptions, ResponseEnvelope, TimingRecorder,
};
use crate::error::{Error, Result};

const DEFAULT_USER_AGENT: &str = concat!("netpace/", env!("CARGO_PKG_VERSION"));

/// HTTP/1.1 client that times every phase of a single exchange.
///
/// Each call resolves the host, opens a fresh connection (bound to the
/// configured source address, if any), performs the TLS handshake for `https`,
/// sends the request and streams the body to its end. No connection is reused,
/// so every request pays and measures the full setup cost.
pub struct PhasedHttpClient<R = SystemResolver> {
    resolver: R,
    #[cfg(feature = "native-tls")]
    tls: TlsHandshaker,
    user_agent: String,
}

impl PhasedHttpClient {
    /// Create a client using the system resolver.
    pub fn new() -> Result<Self> {
        Self::with_resolver(SystemResolver)
    }
}

impl<R: Resolve> PhasedHttpClient<R> {
    pub fn with_resolver(resolver: R) -> Result<Self> {
        Ok(Self {
            resolver,
            #[cfg(feature = "native-tls")]
            tls: TlsHandshaker::new()?,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Override the `User-Agent` sent when the request options carry none.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Perform one request, recording phase boundaries along the way.
    pub async fn request(&self, url: &str, options: RequestOptions) -> Result<ResponseEnvelope> {
        let target = Target::parse(url)?;
        let request = self.build_request(&target, &options)?;
        let mut clock = TimingRecorder::start();

        // IP literals skip the lookup; the DNS phase collapses onto the start.
        let ip = match &target.host {
            TargetHost::Ip(ip) => *ip,
            TargetHost::Domain(name) => {
                clock.dns_started();
                let ip = self
                    .resolver
                    .resolve(name, target.port, options.effective_family())
                    .await?;
                clock.dns_finished();
                ip
            }
        };

        let remote = SocketAddr::new(ip, target.port);
        clock.connect_started();
        let stream = connect_tcp(remote, options.local_address, options.connect_timeout).await?;
        clock.connect_finished();

        let local = stream.local_addr().ok();
        debug!(
            "probe {} {} via {} from {} ({})",
            options.method,
            target.url,
            remote,
            local.map_or_else(|| "unknown".to_string(), |addr| addr.to_string()),
            if options.local_address.is_some() { "bound source" } else { "default route" },
        );

        if target.secure {
            let stream = self.secure(&target, stream).await?;
            clock.tls_finished();
            exchange(stream, request, clock, &options, remote, local).await
        } else {
            exchange(stream, request, clock, &options, remote, local).await
        }
    }

    #[cfg(feature = "native-tls")]
    async fn secure(
        &self,
        target: &Target,
        stream: tokio::net::TcpStream,
    ) -> Result<tokio_native_tls::TlsStream<tokio::net::TcpStream>> {
        self.tls.handshake(&target.server_name(), stream).await
    }

    #[cfg(not(feature = "native-tls"))]
    async fn secure(
        &self,
        target: &Target,
        _stream: tokio::net::TcpStream,
    ) -> Result<tokio::net::TcpStream> {
        Err(Error::Tls {
            host: target.server_name(),
            reason: "TLS support is not compiled in".to_string(),
        })
    }

    fn build_request(&self, target: &Target, options: &RequestOptions) -> Result<Request<Full<Bytes>>> {
        let mut builder = Request::builder()
            .method(options.method.clone())
            .uri(target.path_and_query())
            .header(HOST, target.authority());

        if !options.headers.contains(USER_AGENT.as_str()) {
            builder = builder.header(USER_AGENT, self.user_agent.as_str());
        }
        for (name, value) in options.headers.iter() {
            if name.eq_ignore_ascii_case(HOST.as_str()) {
                continue;
            }
            builder = builder.header(name, value);
        }

        builder
            .body(Full::new(options.body.clone()))
            .map_err(|e| Error::transport(format_args!("invalid request for {}: {}", target.url, e)))
    }
}

impl<R: Resolve> Probe for PhasedHttpClient<R> {
    async fn request(&self, url: &str, options: RequestOptions) -> Result<ResponseEnvelope> {
        PhasedHttpClient::<R>::request(self, url, options).await
    }
}

/// Send the request over an established stream and read the response to its end.
async fn exchange<S>(
    stream: S,
    request: Request<Full<Bytes>>,
    mut clock: TimingRecorder,
    options: &RequestOptions,
    remote: SocketAddr,
    local: Option<SocketAddr>,
) -> Result<ResponseEnvelope>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("probe connection to {} ended with error: {}", remote, e);
        }
    });

    let response = sender.send_request(request).await?;
    clock.response_started();

    let (parts, mut body) = response.into_parts();
    let declared_length = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let chunked = parts
        .headers
        .get(TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_chunked);

    let (buffer, body_bytes) = drain_body(&mut body, &mut clock, options.retain_body).await?;
    drop(sender);

    let timing = clock.finish(ExchangeSummary {
        method: options.method.clone(),
        transfer: TransferFacts {
            declared_length,
            chunked,
            body_bytes,
        },
        chunked_padding: options.chunked_padding,
        protocol: protocol_name(parts.version),
        remote_addr: Some(remote),
        local_addr: local,
    });
    options.notify_timing(&timing);

    let status_text = parts
        .extensions
        .get::<hyper::ext::ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
        .or_else(|| parts.status.canonical_reason().map(str::to_string))
        .unwrap_or_default();

    Ok(ResponseEnvelope::new(
        parts.status,
        status_text,
        Headers::from(&parts.headers),
        buffer,
        timing,
    ))
}

/// Stream the body frame by frame, stamping the first data byte.
async fn drain_body(
    body: &mut Incoming,
    clock: &mut TimingRecorder,
    retain: bool,
) -> Result<(Bytes, u64)> {
    let mut buffer = BytesMut::new();
    let mut received = 0u64;

    while let Some(frame) = body.frame().await {
        let frame = frame?;
        let Ok(data) = frame.into_data() else {
            continue;
        };
        if data.is_empty() {
            continue;
        }
        clock.first_byte();
        received += data.len() as u64;
        if retain {
            buffer.extend_from_slice(&data);
        }
    }

    Ok((buffer.freeze(), received))
}
