//! Immutable data types for HTTP probing.
//!
//! Request options, the header container, timing records and the response
//! envelope. These types carry no I/O and are shared by the client and by
//! stub transports in tests.

pub mod headers;
pub mod options;
pub mod response;
pub mod timing;

pub use headers::Headers;
pub use options::{AddressFamily, RequestOptions, TimingHook};
pub use response::ResponseEnvelope;
pub use timing::{protocol_name, ExchangeSummary, TimingRecord, TimingRecorder, TimingSnapshot};
