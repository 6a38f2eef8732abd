use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use socket2::SockRef;
use tokio::net::TcpStream;

use crate::error::ProxyError;

/// Opens the outbound leg of a session.
#[async_trait]
pub trait Dialer: Sync + Send {
    async fn dial(&self, target: &str) -> Result<TcpStream, ProxyError>;
}

pub struct TcpDialer {
    timeout: Duration,
    keepalive: bool,
}

impl TcpDialer {
    pub fn new(timeout: Duration, keepalive: bool) -> Self {
        Self { timeout, keepalive }
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, target: &str) -> Result<TcpStream, ProxyError> {
        let stream = match tokio::time::timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(stream) => stream?,
            Err(_) => {
                return Err(ProxyError::DialTimeout {
                    target: target.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        if self.keepalive {
            set_keepalive(&stream)?;
        }
        debug!("Connected {} via {}", target, stream.local_addr()?);
        Ok(stream)
    }
}

pub(crate) fn set_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    SockRef::from(stream).set_keepalive(true)
}
