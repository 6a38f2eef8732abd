pub mod address;
pub mod config;
pub mod dial;
pub mod error;
pub mod proxy;
pub mod relay;

use tokio::io::{AsyncRead, AsyncWrite};

pub use address::Address;
pub use config::Config;
pub use dial::{Dialer, TcpDialer};
pub use error::ProxyError;
pub use proxy::{Socks5Proxy, Socks5Server};
pub use relay::{relay, Relayed};

pub trait AsyncSocket: AsyncRead + AsyncWrite + Unpin + Send + 'static {}
impl<T> AsyncSocket for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}
