use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Method;

use super::headers::Headers;
use super::timing::TimingRecord;
use crate::core::CHUNKED_EMPTY_TRANSFER_PADDING;

/// Address family a hostname is resolved to.
///
/// Resolution is pinned to a single family so repeated measurements against the
/// same host take the same network path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressFamily {
    #[default]
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    pub fn matches(&self, ip: &IpAddr) -> bool {
        Self::of(ip) == *self
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Hook receiving the finalized timing of a request.
pub type TimingHook = Arc<dyn Fn(&TimingRecord) + Send + Sync>;

/// Options for a single probe request.
///
/// # Examples
///
/// ```
/// use netpace_probe::{Method, RequestOptions};
///
/// let options = RequestOptions::default()
///     .method(Method::POST)
///     .body(vec![b'0'; 16])
///     .header("X-Probe", "1")
///     .local_address("127.0.0.1".parse().unwrap());
/// ```
#[derive(Clone)]
pub struct RequestOptions {
    /// HTTP method.
    ///
    /// Default: GET
    pub method: Method,

    /// Request body; sent with a `Content-Length` header.
    ///
    /// Default: empty
    pub body: Bytes,

    /// Extra request headers. `Host` is always set by the client.
    ///
    /// Default: empty
    pub headers: Headers,

    /// Source address outgoing connections are bound to.
    ///
    /// When set, its family overrides [`address_family`](Self::address_family).
    ///
    /// Default: None
    pub local_address: Option<IpAddr>,

    /// Family hostnames are resolved to.
    ///
    /// Default: [`AddressFamily::V4`]
    pub address_family: AddressFamily,

    /// Upper bound on TCP connection establishment.
    ///
    /// Default: None (operating system timeout)
    pub connect_timeout: Option<Duration>,

    /// Keep the response body for [`ResponseEnvelope::bytes`](crate::ResponseEnvelope::bytes).
    ///
    /// When `false` bytes are only counted, which keeps memory flat for large
    /// downloads.
    ///
    /// Default: true
    pub retain_body: bool,

    /// Transfer size reported for an empty chunked response.
    ///
    /// Default: [`CHUNKED_EMPTY_TRANSFER_PADDING`]
    pub chunked_padding: u64,

    /// Invoked once with the timing of every request that completes.
    ///
    /// Default: None
    pub on_timing: Option<TimingHook>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("body_len", &self.body.len())
            .field("headers", &self.headers)
            .field("local_address", &self.local_address)
            .field("address_family", &self.address_family)
            .field("connect_timeout", &self.connect_timeout)
            .field("retain_body", &self.retain_body)
            .field("chunked_padding", &self.chunked_padding)
            .field("on_timing", &self.on_timing.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: Bytes::new(),
            headers: Headers::new(),
            local_address: None,
            address_family: AddressFamily::default(),
            connect_timeout: None,
            retain_body: true,
            chunked_padding: CHUNKED_EMPTY_TRANSFER_PADDING,
            on_timing: None,
        }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header; an existing header with the same name is replaced.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn local_address(mut self, ip: IpAddr) -> Self {
        self.local_address = Some(ip);
        self
    }

    #[must_use]
    pub fn address_family(mut self, family: AddressFamily) -> Self {
        self.address_family = family;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn retain_body(mut self, retain: bool) -> Self {
        self.retain_body = retain;
        self
    }

    #[must_use]
    pub fn chunked_padding(mut self, padding: u64) -> Self {
        self.chunked_padding = padding;
        self
    }

    #[must_use]
    pub fn on_timing(mut self, hook: TimingHook) -> Self {
        self.on_timing = Some(hook);
        self
    }

    /// Family actually used for resolution and the socket.
    pub fn effective_family(&self) -> AddressFamily {
        self.local_address
            .as_ref()
            .map(AddressFamily::of)
            .unwrap_or(self.address_family)
    }

    /// Hand a finished record to the timing hook, if one is set.
    pub fn notify_timing(&self, record: &TimingRecord) {
        if let Some(ref hook) = self.on_timing {
            hook(record);
        }
    }
}
