use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("socks5: unsupported VER {0}")]
    UnsupportedVersion(u8),
    #[error("socks5: unsupported CMD {0}")]
    CommandNotSupported(u8),
    #[error("socks5: unsupported addr type {0}")]
    AddressTypeNotSupported(u8),
    #[error("socks5: domain is invalid")]
    InvalidDomain,
    #[error("dial {target} timed out after {timeout:?}")]
    DialTimeout { target: String, timeout: Duration },
    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Whether the client violated the protocol, as opposed to an I/O or dial
    /// failure.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            ProxyError::UnsupportedVersion(_)
                | ProxyError::CommandNotSupported(_)
                | ProxyError::AddressTypeNotSupported(_)
                | ProxyError::InvalidDomain
        )
    }
}
