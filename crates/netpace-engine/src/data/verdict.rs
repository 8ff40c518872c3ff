use netpace_probe::ResponseEnvelope;

use crate::error::Error;

/// How a reachability check settled.
#[derive(Debug)]
pub enum Outcome {
    /// The exchange completed, whatever the status.
    Response(ResponseEnvelope),
    /// The request failed, or the deadline passed first ([`Error::Timeout`]).
    Error(Error),
}

/// Verdict of one reachability check.
#[derive(Debug)]
pub struct ReachabilityResult {
    pub target_url: String,
    pub outcome: Outcome,
}

impl ReachabilityResult {
    pub fn reachable(target_url: impl Into<String>, response: ResponseEnvelope) -> Self {
        Self {
            target_url: target_url.into(),
            outcome: Outcome::Response(response),
        }
    }

    pub fn unreachable(target_url: impl Into<String>, error: Error) -> Self {
        Self {
            target_url: target_url.into(),
            outcome: Outcome::Error(error),
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self.outcome, Outcome::Response(_))
    }

    pub fn response(&self) -> Option<&ResponseEnvelope> {
        match &self.outcome {
            Outcome::Response(response) => Some(response),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            Outcome::Response(_) => None,
            Outcome::Error(error) => Some(error),
        }
    }

    pub fn into_response(self) -> Option<ResponseEnvelope> {
        match self.outcome {
            Outcome::Response(response) => Some(response),
            Outcome::Error(_) => None,
        }
    }
}
