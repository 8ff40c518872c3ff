use std::future::Future;

use crate::data::{RequestOptions, ResponseEnvelope};
use crate::error::Result;

/// One timed HTTP exchange.
///
/// This is the seam the load and reachability engines are written against.
///
/// # Implementations
///
/// - [`PhasedHttpClient`](crate::PhasedHttpClient): production implementation
/// - Stub implementations for testing
pub trait Probe: Send + Sync {
    /// Perform one request and return the timing-annotated response.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Dns`](crate::Error::Dns),
    /// [`Error::Connect`](crate::Error::Connect),
    /// [`Error::Tls`](crate::Error::Tls) or
    /// [`Error::Transport`](crate::Error::Transport). A non-2xx status is
    /// not an error; check [`ResponseEnvelope::ok`].
    fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> impl Future<Output = Result<ResponseEnvelope>> + Send;
}
