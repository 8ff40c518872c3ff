use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::{TcpSocket, TcpStream};
use tracing::debug;

use crate::error::{Error, Result};

/// Open a TCP connection, optionally bound to a source address first.
pub(crate) async fn connect_tcp(
    addr: SocketAddr,
    local_address: Option<IpAddr>,
    timeout: Option<Duration>,
) -> Result<TcpStream> {
    let failed = |source: io::Error| Error::Connect { addr, source };

    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
    .map_err(failed)?;

    if let Some(ip) = local_address {
        socket.bind(SocketAddr::new(ip, 0)).map_err(failed)?;
    }

    let connecting = socket.connect(addr);
    let stream = match timeout {
        Some(limit) => tokio::time::timeout(limit, connecting)
            .await
            .map_err(|_| failed(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")))?,
        None => connecting.await,
    }
    .map_err(failed)?;

    // Small probe requests must not wait on Nagle.
    if let Err(e) = stream.set_nodelay(true) {
        debug!("TCP_NODELAY on connection to {} not set: {}", addr, e);
    }
    Ok(stream)
}

#[cfg(feature = "native-tls")]
mod tls {
    use tokio::net::TcpStream;
    use tokio_native_tls::{native_tls, TlsConnector, TlsStream};

    use crate::error::{Error, Result};

    pub(crate) struct TlsHandshaker {
        connector: TlsConnector,
    }

    impl TlsHandshaker {
        pub(crate) fn new() -> Result<Self> {
            let connector = native_tls::TlsConnector::new()
                .map_err(|e| Error::transport(format_args!("TLS backend unavailable: {}", e)))?;
            Ok(Self {
                connector: TlsConnector::from(connector),
            })
        }

        /// Resolves once the secure channel is established.
        pub(crate) async fn handshake(
            &self,
            server_name: &str,
            stream: TcpStream,
        ) -> Result<TlsStream<TcpStream>> {
            self.connector
                .connect(server_name, stream)
                .await
                .map_err(|e| Error::Tls {
                    host: server_name.to_string(),
                    reason: e.to_string(),
                })
        }
    }
}

#[cfg(feature = "native-tls")]
pub(crate) use tls::TlsHandshaker;
