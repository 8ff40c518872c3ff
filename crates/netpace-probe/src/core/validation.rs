use http::Method;

/// Returns `true` if the HTTP status code is in the 2xx range.
///
/// # Examples
///
/// ```
/// use netpace_probe::core::is_success;
///
/// assert!(is_success(200));
/// assert!(is_success(204));
/// assert!(!is_success(301));
/// assert!(!is_success(404));
/// ```
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Returns `true` if the method sends a request body to the server.
///
/// Write methods have their latency measured up to the end of the handshake
/// (upload latency); every other method is timed to the first response byte
/// (download latency).
pub fn is_write_method(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}
