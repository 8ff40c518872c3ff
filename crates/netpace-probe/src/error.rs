//! Error types for netpace-probe.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("DNS lookup for '{host}' failed: {reason}")]
    Dns { host: String, reason: String },

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("TLS handshake with '{host}' failed: {reason}")]
    Tls { host: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("response body already consumed")]
    BodyReuse,
}

impl Error {
    pub(crate) fn transport(e: impl std::fmt::Display) -> Self {
        Error::Transport(e.to_string())
    }

    /// Returns `true` for failures raised before any byte of the request was sent.
    pub fn is_connect_phase(&self) -> bool {
        matches!(self, Error::Dns { .. } | Error::Connect { .. } | Error::Tls { .. })
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Self {
        Error::transport(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
