//! Single HTTP exchanges timed phase by phase.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Request options, headers, timing records and the response envelope
//! - [`core`] - Pure transformations (URL targets, transfer-size derivation)
//! - [`effects`] - Resolution, connection and the HTTP exchange behind trait seams
//!
//! # Key Features
//!
//! - **Phase Timing**: DNS, TCP connect, TLS handshake, first byte and end of
//!   body are stamped on a monotonic clock, like browser resource timing
//! - **Fresh Connections**: Every request opens its own connection, optionally
//!   bound to a source address, so setup cost is always measured
//! - **Pinned Address Family**: Hostnames resolve to one family (IPv4 unless told
//!   otherwise) so repeated runs take the same path
//! - **Mechanism-Only**: No retries, no metrics aggregation; callers attach a
//!   timing hook and decide what to do with the records
//!
//! # Example
//!
//! ```no_run
//! use netpace_probe::{PhasedHttpClient, RequestOptions};
//!
//! # async fn run() -> netpace_probe::Result<()> {
//! let client = PhasedHttpClient::new()?;
//! let mut response = client
//!     .request("https://example.com/", RequestOptions::default())
//!     .await?;
//!
//! let timing = response.timing();
//! println!("ttfb {:?}, tls {:?}", timing.ttfb(), timing.tls_duration());
//! let body = response.bytes()?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use self::core::CHUNKED_EMPTY_TRANSFER_PADDING;
pub use data::{
    AddressFamily, ExchangeSummary, Headers, RequestOptions, ResponseEnvelope, TimingHook,
    TimingRecord, TimingRecorder, TimingSnapshot,
};
pub use effects::{PhasedHttpClient, Probe, Resolve, SystemResolver};
pub use error::{Error, Result};

pub use http::{Method, StatusCode};
