//! Error types for netpace-engine.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Probe(#[from] netpace_probe::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("{url} answered with status {status}")]
    Status { status: u16, url: String },

    #[error("check ended without a verdict: {0}")]
    Interrupted(String),
}

impl Error {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Error::Configuration(reason.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
