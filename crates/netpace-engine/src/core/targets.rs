use bytes::Bytes;
use url::Url;

use crate::data::{ChannelConfig, Direction, LoadConfig};
use crate::error::{Error, Result};

/// Byte used to fill upload bodies.
pub const UPLOAD_FILLER: u8 = b'0';

/// Query parameter carrying the requested download size.
pub const BYTES_PARAM: &str = "bytes";

/// Largest upload body a channel may be configured with (256 MiB).
pub const MAX_UPLOAD_CHUNK: u64 = 256 * 1024 * 1024;

/// Check that at least one channel is configured and every configured one is usable.
pub fn validate_load_config(config: &LoadConfig) -> Result<()> {
    if config.download.is_none() && config.upload.is_none() {
        return Err(Error::configuration(
            "at least one of download or upload must be configured",
        ));
    }
    for (direction, channel) in config.channels() {
        channel_url(direction, channel)?;
    }
    Ok(())
}

/// Parse and check one channel's endpoint.
pub fn channel_url(direction: Direction, channel: &ChannelConfig) -> Result<Url> {
    if channel.chunk_size == 0 {
        return Err(Error::configuration(format!(
            "{} chunk size must be positive",
            direction
        )));
    }
    if direction == Direction::Upload {
        upload_len(channel.chunk_size)?;
    }
    parse_absolute(&channel.api_url)
        .map_err(|reason| Error::configuration(format!("{} apiUrl {}", direction, reason)))
}

/// Download target: the endpoint with `bytes=<chunk size>` appended to its query.
pub fn download_url(mut base: Url, chunk_size: u64) -> Url {
    base.query_pairs_mut()
        .append_pair(BYTES_PARAM, &chunk_size.to_string());
    base
}

/// Upload body of `chunk_size` filler bytes.
pub fn upload_body(chunk_size: u64) -> Result<Bytes> {
    Ok(Bytes::from(vec![UPLOAD_FILLER; upload_len(chunk_size)?]))
}

fn upload_len(chunk_size: u64) -> Result<usize> {
    match usize::try_from(chunk_size) {
        Ok(len) if chunk_size <= MAX_UPLOAD_CHUNK => Ok(len),
        _ => Err(Error::configuration(format!(
            "upload chunk size {} exceeds the {} byte limit",
            chunk_size, MAX_UPLOAD_CHUNK
        ))),
    }
}

/// Validate a reachability target.
pub fn target_url(raw: &str) -> Result<Url> {
    parse_absolute(raw).map_err(|reason| Error::configuration(format!("target URL {}", reason)))
}

fn parse_absolute(raw: &str) -> std::result::Result<Url, String> {
    if raw.trim().is_empty() {
        return Err("is empty".to_string());
    }
    let url = Url::parse(raw).map_err(|e| format!("'{}' is invalid: {}", raw, e))?;
    if url.cannot_be_a_base() || !url.has_host() {
        return Err(format!("'{}' is not an absolute URL with a host", raw));
    }
    Ok(url)
}
