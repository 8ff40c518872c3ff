use bytes::Bytes;
use http::StatusCode;

use super::headers::Headers;
use super::timing::TimingRecord;
use crate::core::is_success;
use crate::error::{Error, Result};

/// Result of one completed HTTP exchange.
///
/// The body can be taken exactly once; a second [`bytes`](Self::bytes) call
/// fails with [`Error::BodyReuse`]. A non-2xx status is not an error here, it is
/// reported through [`ok`](Self::ok).
#[derive(Debug)]
pub struct ResponseEnvelope {
    status: StatusCode,
    status_text: String,
    headers: Headers,
    body: Option<Bytes>,
    timing: TimingRecord,
}

impl ResponseEnvelope {
    pub fn new(
        status: StatusCode,
        status_text: impl Into<String>,
        headers: Headers,
        body: Bytes,
        timing: TimingRecord,
    ) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers,
            body: Some(body),
            timing,
        }
    }

    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// Reason phrase sent by the server, or the canonical one.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// `true` for 2xx statuses.
    pub fn ok(&self) -> bool {
        is_success(self.status())
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn timing(&self) -> &TimingRecord {
        &self.timing
    }

    pub fn into_timing(self) -> TimingRecord {
        self.timing
    }

    /// Take the body. Empty when the request was made with `retain_body(false)`.
    pub fn bytes(&mut self) -> Result<Bytes> {
        self.body.take().ok_or(Error::BodyReuse)
    }

    pub fn is_body_used(&self) -> bool {
        self.body.is_none()
    }
}
