mod socks5;

use std::{
    io::{Error, ErrorKind},
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use futures::stream::StreamExt;
use log::{debug, info, warn};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{OwnedSemaphorePermit, Semaphore},
};
use tokio_stream::wrappers::TcpListenerStream;

use crate::{
    config::Config,
    dial::{set_keepalive, Dialer},
    error::ProxyError,
    relay::relay,
};

pub use socks5::{Socks5Proxy, REPLY_SUCCESS};

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct Socks5Server {
    listener: TcpListener,
    dialer: Arc<dyn Dialer>,
    sessions: Option<Arc<Semaphore>>,
    keepalive: bool,
}

impl Socks5Server {
    pub async fn listen(config: &Config, dialer: Arc<dyn Dialer>) -> std::io::Result<Self> {
        config
            .validate()
            .map_err(|e| Error::new(ErrorKind::InvalidInput, e))?;
        let listener = TcpListener::bind(&config.listen).await?;
        let sessions = config
            .max_sessions
            .map(|max| Arc::new(Semaphore::new(max)));
        Ok(Self {
            listener,
            dialer,
            sessions,
            keepalive: config.keepalive,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts forever, one task per connection.
    pub async fn run(self) {
        let mut listener = TcpListenerStream::new(self.listener);

        loop {
            let permit = match &self.sessions {
                Some(sessions) => match sessions.clone().acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };

            let stream = match listener.next().await {
                Some(stream) => stream,
                None => return,
            };

            match stream {
                Ok(stream) => {
                    let peer = match stream.peer_addr() {
                        Ok(peer) => peer,
                        Err(e) => {
                            debug!("Drop connection without peer address: {}", e);
                            continue;
                        }
                    };
                    if self.keepalive {
                        if let Err(e) = set_keepalive(&stream) {
                            debug!("{} keepalive: {}", peer, e);
                        }
                    }

                    let session = Session::new(stream, peer, self.dialer.clone(), permit);
                    tokio::spawn(session.run());
                }
                Err(e) => {
                    // EMFILE and friends persist until some session closes.
                    warn!("Accept error: {}", e);
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }
}

struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    dialer: Arc<dyn Dialer>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Session {
    fn new(
        stream: TcpStream,
        peer: SocketAddr,
        dialer: Arc<dyn Dialer>,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        Self {
            stream,
            peer,
            dialer,
            _permit: permit,
        }
    }

    async fn run(self) {
        let peer = self.peer;
        match self.proxy().await {
            Ok((sent, received)) => debug!("{} closed, sent {} received {}", peer, sent, received),
            Err(e) if e.is_protocol() => warn!("{} {}", peer, e),
            Err(e) => debug!("{} {}", peer, e),
        }
    }

    async fn proxy(self) -> Result<(u64, u64), ProxyError> {
        let Session {
            mut stream,
            peer,
            dialer,
            _permit,
        } = self;

        let addr = Socks5Proxy::negotiate(&mut stream).await?;
        info!("{} - {}", peer, addr);

        let server = dialer.dial(&addr.to_string()).await?;

        // Both sockets are dropped, and so closed, when this returns.
        let relayed = relay(stream, server).await?;
        Ok((relayed.client_to_dest, relayed.dest_to_client))
    }
}
