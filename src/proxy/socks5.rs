use std::net::{Ipv4Addr, Ipv6Addr};

use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{address::Address, error::ProxyError};

const SOCKS5_VER: u8 = 5;
const METHOD_NO_AUTH: u8 = 0;

const CMD_CONNECT: u8 = 1;

const ADDR_TYPE_IPV4: u8 = 1;
const ADDR_TYPE_DOMAIN: u8 = 3;
const ADDR_TYPE_IPV6: u8 = 4;

/// ATYP + domain length + longest domain + port.
const MAX_ADDR_LEN: usize = 1 + 1 + 255 + 2;

/// Success reply. The bound address is always reported as 0.0.0.0:0.
pub const REPLY_SUCCESS: [u8; 10] = [SOCKS5_VER, 0, 0, ADDR_TYPE_IPV4, 0, 0, 0, 0, 0, 0];

pub struct Socks5Proxy;

impl Socks5Proxy {
    /// Runs the server side of the handshake and returns the CONNECT target.
    ///
    /// On any error the success reply has not been (fully) written, so the
    /// caller only has to drop the stream.
    pub async fn negotiate<S>(stream: &mut S) -> Result<Address, ProxyError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf = [0u8; MAX_ADDR_LEN];

        Self::select_method(stream, &mut buf).await?;

        stream.read_exact(&mut buf[..4]).await?;
        trace!("socks5: request {:?}", &buf[..4]);
        match buf[1] {
            CMD_CONNECT => {}
            c => return Err(ProxyError::CommandNotSupported(c)),
        }

        let addr_type = buf[3];
        let addr = Self::read_addr(stream, addr_type, &mut buf).await?;

        stream.write_all(&REPLY_SUCCESS).await?;
        Ok(addr)
    }

    async fn select_method<S>(stream: &mut S, buf: &mut [u8; MAX_ADDR_LEN]) -> Result<(), ProxyError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream.read_exact(&mut buf[..2]).await?;
        if buf[0] != SOCKS5_VER {
            return Err(ProxyError::UnsupportedVersion(buf[0]));
        }

        // Only NO AUTH is offered back, but the methods still have to be drained.
        let nmethods = buf[1] as usize;
        stream.read_exact(&mut buf[..nmethods]).await?;

        let ack = [SOCKS5_VER, METHOD_NO_AUTH];
        stream.write_all(&ack).await?;
        Ok(())
    }

    async fn read_addr<S>(
        stream: &mut S,
        addr_type: u8,
        buf: &mut [u8; MAX_ADDR_LEN],
    ) -> Result<Address, ProxyError>
    where
        S: AsyncRead + Unpin,
    {
        match addr_type {
            ADDR_TYPE_IPV4 => {
                let raw = &mut buf[..4 + 2];
                stream.read_exact(raw).await?;
                let ip = Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]);
                let port = u16::from_be_bytes([raw[4], raw[5]]);
                Ok(Address::Ipv4(ip, port))
            }
            ADDR_TYPE_DOMAIN => {
                stream.read_exact(&mut buf[..1]).await?;
                let len = buf[0] as usize;
                let raw = &mut buf[..len + 2];
                stream.read_exact(raw).await?;
                let port = u16::from_be_bytes([raw[len], raw[len + 1]]);
                let domain = std::str::from_utf8(&raw[..len])
                    .map_err(|_| ProxyError::InvalidDomain)?
                    .to_string();
                Ok(Address::Domain(domain, port))
            }
            ADDR_TYPE_IPV6 => {
                let raw = &mut buf[..16 + 2];
                stream.read_exact(raw).await?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&raw[..16]);
                let port = u16::from_be_bytes([raw[16], raw[17]]);
                Ok(Address::Ipv6(Ipv6Addr::from(octets), port))
            }
            addr_type => Err(ProxyError::AddressTypeNotSupported(addr_type)),
        }
    }
}
