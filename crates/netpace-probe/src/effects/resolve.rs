use std::future::Future;
use std::net::IpAddr;

use tracing::debug;

use crate::data::AddressFamily;
use crate::error::{Error, Result};

/// Hostname resolution.
///
/// Implementations return a single address of the requested family, so that
/// every request to the same host measures the same path.
pub trait Resolve: Send + Sync {
    fn resolve(
        &self,
        host: &str,
        port: u16,
        family: AddressFamily,
    ) -> impl Future<Output = Result<IpAddr>> + Send;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolve for SystemResolver {
    async fn resolve(&self, host: &str, port: u16, family: AddressFamily) -> Result<IpAddr> {
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| Error::Dns {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        let ip = addrs
            .map(|addr| addr.ip())
            .find(|ip| family.matches(ip))
            .ok_or_else(|| Error::Dns {
                host: host.to_string(),
                reason: format!("no {} address", family),
            })?;

        debug!("resolved {} to {} ({})", host, ip, family);
        Ok(ip)
    }
}
