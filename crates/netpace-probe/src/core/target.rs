use std::net::IpAddr;

use url::{Host, Position, Url};

use crate::error::{Error, Result};

/// Host part of a request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetHost {
    /// IP literal; resolution is skipped.
    Ip(IpAddr),
    /// Name that must go through the resolver.
    Domain(String),
}

/// A parsed, validated request target.
#[derive(Debug, Clone)]
pub struct Target {
    pub url: Url,
    pub host: TargetHost,
    pub port: u16,
    pub secure: bool,
}

impl Target {
    /// Parse an absolute `http` or `https` URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use netpace_probe::core::{Target, TargetHost};
    ///
    /// let target = Target::parse("https://example.com/down?bytes=10").unwrap();
    /// assert_eq!(target.port, 443);
    /// assert!(target.secure);
    /// assert_eq!(target.host, TargetHost::Domain("example.com".into()));
    /// assert_eq!(target.path_and_query(), "/down?bytes=10");
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        let secure = match url.scheme() {
            "http" => false,
            "https" => true,
            _ => return Err(invalid("scheme must be http or https")),
        };
        let host = match url.host() {
            Some(Host::Ipv4(ip)) => TargetHost::Ip(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => TargetHost::Ip(IpAddr::V6(ip)),
            Some(Host::Domain(name)) => TargetHost::Domain(name.to_string()),
            None => return Err(invalid("missing host")),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("cannot determine port"))?;

        Ok(Self {
            url,
            host,
            port,
            secure,
        })
    }

    /// Host name used for SNI and certificate validation.
    pub fn server_name(&self) -> String {
        match &self.host {
            TargetHost::Ip(ip) => ip.to_string(),
            TargetHost::Domain(name) => name.clone(),
        }
    }

    /// Value for the `Host` request header; the port is omitted when it is the scheme default.
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Origin-form request target (`/path?query`).
    pub fn path_and_query(&self) -> &str {
        let slice = &self.url[Position::BeforePath..Position::AfterQuery];
        if slice.is_empty() { "/" } else { slice }
    }
}
