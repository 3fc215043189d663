//! TCP connect primitive

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// Opens (and immediately closes) one TCP connection.
///
/// A deadline overrun is reported as [`io::ErrorKind::TimedOut`].
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, address: SocketAddr, timeout: Duration) -> io::Result<()>;
}

/// Full three-way handshake through the OS socket API
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioConnector;

#[async_trait]
impl Connector for TokioConnector {
    async fn connect(&self, address: SocketAddr, timeout: Duration) -> io::Result<()> {
        match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {} timed out", address),
            )),
        }
    }
}
