use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use netpace_probe::{Method, Probe, RequestOptions, TimingRecord};
use tracing::debug;

use super::cancelable_loop::{CancelableLoop, LoopFailureHook};
use crate::core::{channel_url, download_url, upload_body, validate_load_config};
use crate::data::{ChannelConfig, Direction, LoadConfig, LoadHooks};
use crate::error::{Error, Result};

/// Sustains download and/or upload load until stopped.
///
/// Each configured direction is an independent [`CancelableLoop`] issuing one
/// probe request after another. Channels do not wait for each other, and a
/// failing request (transport error or non-2xx status) halts only its own
/// channel.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use netpace_engine::{ChannelConfig, LoadConfig, LoadNetworkEngine};
/// use netpace_probe::PhasedHttpClient;
///
/// # async fn run() -> netpace_engine::Result<()> {
/// let config = LoadConfig::default()
///     .download(ChannelConfig::new("https://speed.example/__down", 1_000_000))
///     .upload(ChannelConfig::new("https://speed.example/__up", 100_000));
/// let engine = LoadNetworkEngine::new(config, Arc::new(PhasedHttpClient::new()?))?;
///
/// engine.play();
/// tokio::time::sleep(std::time::Duration::from_secs(10)).await;
/// engine.stop();
/// # Ok(())
/// # }
/// ```
pub struct LoadNetworkEngine {
    channels: Vec<Channel>,
    local_address: Option<IpAddr>,
}

struct Channel {
    direction: Direction,
    driver: CancelableLoop<Error>,
}

impl LoadNetworkEngine {
    /// Build the engine; fails with [`Error::Configuration`] when no channel is
    /// configured or a configured one is unusable.
    pub fn new<P>(config: LoadConfig, probe: Arc<P>) -> Result<Self>
    where
        P: Probe + 'static,
    {
        Self::with_hooks(config, probe, LoadHooks::default())
    }

    pub fn with_hooks<P>(config: LoadConfig, probe: Arc<P>, hooks: LoadHooks) -> Result<Self>
    where
        P: Probe + 'static,
    {
        validate_load_config(&config)?;

        let channels = config
            .channels()
            .map(|(direction, channel)| {
                let (url, options) = channel_request(direction, channel, config.local_address)?;
                let options = match hooks.on_timing.clone() {
                    Some(hook) => options.on_timing(Arc::new(move |timing: &TimingRecord| {
                        hook(direction, timing)
                    })),
                    None => options,
                };
                debug!("{} channel targets {} ({} bytes)", direction, url, channel.chunk_size);
                Ok(Channel {
                    direction,
                    driver: channel_loop(direction, url, options, Arc::clone(&probe), &hooks),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            channels,
            local_address: config.local_address,
        })
    }

    /// Start every channel.
    pub fn play(&self) {
        for channel in &self.channels {
            channel.driver.play();
        }
    }

    /// Stop every channel; in-flight requests finish but are not followed by another.
    pub fn pause(&self) {
        for channel in &self.channels {
            channel.driver.pause();
        }
    }

    /// Same as [`pause`](Self::pause).
    pub fn stop(&self) {
        self.pause();
    }
}

impl fmt::Debug for LoadNetworkEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadNetworkEngine")
            .field(
                "channels",
                &self.channels.iter().map(|c| c.direction).collect::<Vec<_>>(),
            )
            .field("local_address", &self.local_address)
            .finish()
    }
}

/// Target URL and request options of one channel.
fn channel_request(
    direction: Direction,
    channel: &ChannelConfig,
    local_address: Option<IpAddr>,
) -> Result<(String, RequestOptions)> {
    let base = channel_url(direction, channel)?;
    let (url, options) = match direction {
        Direction::Download => (
            download_url(base, channel.chunk_size),
            RequestOptions::default().retain_body(false),
        ),
        Direction::Upload => (
            base,
            RequestOptions::default()
                .method(Method::POST)
                .body(upload_body(channel.chunk_size)?)
                .retain_body(false),
        ),
    };

    let options = match local_address {
        Some(ip) => options.local_address(ip),
        None => options,
    };
    Ok((url.to_string(), options))
}

fn channel_loop<P>(
    direction: Direction,
    url: String,
    options: RequestOptions,
    probe: Arc<P>,
    hooks: &LoadHooks,
) -> CancelableLoop<Error>
where
    P: Probe + 'static,
{
    let url: Arc<str> = Arc::from(url);
    let on_failure = hooks.on_failure.clone().map(|hook| {
        Arc::new(move |e: &Error| hook(direction, e)) as LoopFailureHook<Error>
    });

    let driver = CancelableLoop::new(move || {
        let probe = Arc::clone(&probe);
        let url = Arc::clone(&url);
        let options = options.clone();
        async move {
            let response = probe.request(&url, options).await?;
            if !response.ok() {
                return Err(Error::Status {
                    status: response.status(),
                    url: url.to_string(),
                });
            }
            Ok(())
        }
    })
    .label(format!("{} channel", direction));

    match on_failure {
        Some(hook) => driver.on_failure(hook),
        None => driver,
    }
}
