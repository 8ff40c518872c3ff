use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use netpace_probe::{RequestOptions, TimingRecord};
use serde::{Deserialize, Deserializer};

use super::direction::Direction;
use crate::error::Error;

/// One load channel: the endpoint and how many bytes each request moves.
///
/// Missing fields deserialize to an empty URL and a zero chunk size, both of
/// which are rejected when the engine is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelConfig {
    pub api_url: String,
    pub chunk_size: u64,
}

impl ChannelConfig {
    pub fn new(api_url: impl Into<String>, chunk_size: u64) -> Self {
        Self {
            api_url: api_url.into(),
            chunk_size,
        }
    }
}

/// Configuration of a [`LoadNetworkEngine`](crate::LoadNetworkEngine).
///
/// # Examples
///
/// ```
/// use netpace_engine::LoadConfig;
///
/// let config: LoadConfig = serde_json::from_str(
///     r#"{ "download": { "apiUrl": "https://speed.example/__down", "chunkSize": 1000000 } }"#,
/// )
/// .unwrap();
/// assert!(config.upload.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadConfig {
    pub download: Option<ChannelConfig>,
    pub upload: Option<ChannelConfig>,

    /// Source address every request of every channel is bound to.
    pub local_address: Option<IpAddr>,
}

impl LoadConfig {
    #[must_use]
    pub fn download(mut self, channel: ChannelConfig) -> Self {
        self.download = Some(channel);
        self
    }

    #[must_use]
    pub fn upload(mut self, channel: ChannelConfig) -> Self {
        self.upload = Some(channel);
        self
    }

    #[must_use]
    pub fn local_address(mut self, ip: IpAddr) -> Self {
        self.local_address = Some(ip);
        self
    }

    /// Configured channels in fan-out order, download first.
    pub fn channels(&self) -> impl Iterator<Item = (Direction, &ChannelConfig)> {
        [
            (Direction::Download, self.download.as_ref()),
            (Direction::Upload, self.upload.as_ref()),
        ]
        .into_iter()
        .filter_map(|(direction, channel)| channel.map(|c| (direction, c)))
    }
}

/// Observer of per-request timings, tagged with the channel.
pub type ChannelTimingHook = Arc<dyn Fn(Direction, &TimingRecord) + Send + Sync>;

/// Observer of the failure that halted a channel.
pub type ChannelFailureHook = Arc<dyn Fn(Direction, &Error) + Send + Sync>;

/// Hooks through which a metrics collaborator watches a load run.
#[derive(Clone, Default)]
pub struct LoadHooks {
    /// Invoked once per completed request.
    ///
    /// Default: None
    pub on_timing: Option<ChannelTimingHook>,

    /// Invoked once when a channel halts on a failed request.
    ///
    /// Default: None (the failure is only logged)
    pub on_failure: Option<ChannelFailureHook>,
}

impl fmt::Debug for LoadHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadHooks")
            .field("on_timing", &self.on_timing.as_ref().map(|_| "{ ... }"))
            .field("on_failure", &self.on_failure.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

impl LoadHooks {
    #[must_use]
    pub fn on_timing(mut self, hook: ChannelTimingHook) -> Self {
        self.on_timing = Some(hook);
        self
    }

    #[must_use]
    pub fn on_failure(mut self, hook: ChannelFailureHook) -> Self {
        self.on_failure = Some(hook);
        self
    }
}

/// Options of a [`ReachabilityEngine`](crate::ReachabilityEngine).
///
/// Deserializes from `{ "timeoutMs": 5000, "localAddress": "10.0.0.2" }`.
/// Request options carry hooks and are only set programmatically.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReachabilityOptions {
    /// Deadline for the whole check. `None` or zero disables it.
    ///
    /// Default: None
    #[serde(rename = "timeoutMs", deserialize_with = "timeout_ms")]
    pub timeout: Option<Duration>,

    /// Options passed to the probe request.
    ///
    /// Default: [`RequestOptions::default`]
    #[serde(skip)]
    pub fetch_options: RequestOptions,

    /// Source address the request is bound to. Overrides the one in
    /// [`fetch_options`](Self::fetch_options).
    ///
    /// Default: None
    pub local_address: Option<IpAddr>,
}

impl ReachabilityOptions {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn fetch_options(mut self, options: RequestOptions) -> Self {
        self.fetch_options = options;
        self
    }

    #[must_use]
    pub fn local_address(mut self, ip: IpAddr) -> Self {
        self.local_address = Some(ip);
        self
    }

    /// The deadline that is actually armed.
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }

    /// Request options with the source address applied.
    pub fn request_options(&self) -> RequestOptions {
        let options = self.fetch_options.clone();
        match self.local_address {
            Some(ip) => options.local_address(ip),
            None => options,
        }
    }
}

/// Milliseconds; zero and negative values disable the deadline.
fn timeout_ms<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = Option::<i64>::deserialize(deserializer)?;
    Ok(ms
        .and_then(|ms| u64::try_from(ms).ok())
        .filter(|&ms| ms > 0)
        .map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_json() {
        let config: LoadConfig = serde_json::from_str(
            r#"{
                "download": { "apiUrl": "https://x/down", "chunkSize": 1000 },
                "upload": { "apiUrl": "https://x/up", "chunkSize": 16 },
                "localAddress": "192.168.1.5"
            }"#,
        )
        .unwrap();

        assert_eq!(config.download, Some(ChannelConfig::new("https://x/down", 1000)));
        assert_eq!(config.upload, Some(ChannelConfig::new("https://x/up", 16)));
        assert_eq!(config.local_address, Some("192.168.1.5".parse().unwrap()));
    }

    #[test]
    fn test_missing_channel_fields_default_to_empty() {
        let config: LoadConfig = serde_json::from_str(r#"{ "upload": {} }"#).unwrap();
        assert_eq!(config.upload, Some(ChannelConfig::default()));
        assert!(config.download.is_none());
    }

    #[test]
    fn test_channels_order() {
        let config = LoadConfig::default()
            .upload(ChannelConfig::new("https://x/up", 1))
            .download(ChannelConfig::new("https://x/down", 1));
        let directions: Vec<_> = config.channels().map(|(d, _)| d).collect();
        assert_eq!(directions, vec![Direction::Download, Direction::Upload]);
    }

    #[test]
    fn test_reachability_timeout_parsing() {
        let options: ReachabilityOptions =
            serde_json::from_str(r#"{ "timeoutMs": 50, "localAddress": "::1" }"#).unwrap();
        assert_eq!(options.effective_timeout(), Some(Duration::from_millis(50)));
        assert_eq!(
            options.request_options().local_address,
            Some("::1".parse().unwrap())
        );

        let disabled: ReachabilityOptions = serde_json::from_str(r#"{ "timeoutMs": -1 }"#).unwrap();
        assert_eq!(disabled.effective_timeout(), None);

        let zero = ReachabilityOptions::default().timeout(Duration::ZERO);
        assert_eq!(zero.effective_timeout(), None);
    }

    #[test]
    fn test_hooks_debug() {
        let hooks = LoadHooks::default().on_failure(Arc::new(|_: Direction, _: &Error| {}));
        let debug = format!("{:?}", hooks);
        assert!(debug.contains("on_timing: None"));
        assert!(debug.contains("{ ... }"));
    }
}
