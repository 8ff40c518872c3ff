/// Bytes reported as `transfer_size` for a chunked response whose body was empty.
///
/// A chunked exchange always puts framing on the wire, so reporting zero would
/// understate it. The value is a diagnostic heuristic, not a measurement; it can
/// be overridden per request with
/// [`RequestOptions::chunked_padding`](crate::RequestOptions::chunked_padding).
pub const CHUNKED_EMPTY_TRANSFER_PADDING: u64 = 300;

/// What the exchange told us about the size of the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferFacts {
    /// Value of the `Content-Length` header, if present and numeric.
    pub declared_length: Option<u64>,
    /// Whether the response used chunked transfer encoding.
    pub chunked: bool,
    /// Body bytes actually received.
    pub body_bytes: u64,
}

/// Derive the reported transfer size.
///
/// The declared content length wins; otherwise the received byte count is used,
/// padded only when the response was chunked and nothing arrived.
///
/// # Examples
///
/// ```
/// use netpace_probe::core::{transfer_size, TransferFacts};
///
/// let facts = TransferFacts { declared_length: Some(10), chunked: false, body_bytes: 10 };
/// assert_eq!(transfer_size(&facts, 300), 10);
///
/// let empty_chunked = TransferFacts { declared_length: None, chunked: true, body_bytes: 0 };
/// assert_eq!(transfer_size(&empty_chunked, 300), 300);
/// ```
pub fn transfer_size(facts: &TransferFacts, padding: u64) -> u64 {
    match facts.declared_length {
        Some(declared) => declared,
        None if facts.chunked && facts.body_bytes == 0 => padding,
        None => facts.body_bytes,
    }
}

/// Returns `true` when a `Transfer-Encoding` value ends in `chunked`.
pub fn is_chunked(transfer_encoding: &str) -> bool {
    transfer_encoding
        .rsplit(',')
        .next()
        .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
}
