//! Recording stub transport shared by the engine tests.

#![allow(dead_code)]

use std::net::IpAddr;
use std::time::Duration;

use bytes::Bytes;
use netpace_probe::{
    Error, ExchangeSummary, Headers, Method, Probe, RequestOptions, ResponseEnvelope, StatusCode,
    TimingRecorder,
};
use parking_lot::Mutex;
use tokio::time::{sleep, Instant};

/// What the stub answers to one call.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(u16),
    Fail(&'static str),
}

/// A request the stub received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub method: Method,
    pub body: Bytes,
    pub local_address: Option<IpAddr>,
    pub started: Instant,
    pub settled: Option<Instant>,
}

type Responder = Box<dyn Fn(usize, &RecordedCall) -> Reply + Send + Sync>;

/// Probe that sleeps for a fixed delay, then answers according to its responder.
pub struct StubProbe {
    delay: Duration,
    responder: Responder,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubProbe {
    /// Every call succeeds with 200 after `delay`.
    pub fn new(delay: Duration) -> Self {
        Self::responding(delay, |_, _| Reply::Status(200))
    }

    pub fn responding(
        delay: Duration,
        responder: impl Fn(usize, &RecordedCall) -> Reply + Send + Sync + 'static,
    ) -> Self {
        Self {
            delay,
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn count_matching(&self, method: &Method) -> usize {
        self.calls.lock().iter().filter(|c| &c.method == method).count()
    }
}

impl Probe for StubProbe {
    async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> netpace_probe::Result<ResponseEnvelope> {
        let call = RecordedCall {
            url: url.to_string(),
            method: options.method.clone(),
            body: options.body.clone(),
            local_address: options.local_address,
            started: Instant::now(),
            settled: None,
        };
        let index = {
            let mut calls = self.calls.lock();
            calls.push(call.clone());
            calls.len() - 1
        };

        let clock = TimingRecorder::start();
        sleep(self.delay).await;
        self.calls.lock()[index].settled = Some(Instant::now());

        match (self.responder)(index, &call) {
            Reply::Fail(reason) => Err(Error::Transport(reason.to_string())),
            Reply::Status(status) => {
                let timing = clock.finish(ExchangeSummary {
                    method: options.method.clone(),
                    ..ExchangeSummary::default()
                });
                options.notify_timing(&timing);
                let status = StatusCode::from_u16(status).map_err(|e| Error::Transport(e.to_string()))?;
                Ok(ResponseEnvelope::new(
                    status,
                    status.canonical_reason().unwrap_or_default(),
                    Headers::new(),
                    Bytes::new(),
                    timing,
                ))
            }
        }
    }
}
