use std::io;
use std::sync::Arc;

use log::trace;
use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use crate::AsyncSocket;

const RELAY_BUF_SIZE: usize = 16 * 1024;

/// Shared expiry flag for the two directions of a relay.
///
/// Once armed, every pending and future I/O raced against [`Deadline::expired`]
/// gives up. Arming is idempotent and can happen from either direction.
#[derive(Clone)]
pub struct Deadline {
    tx: Arc<watch::Sender<bool>>,
}

impl Deadline {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn arm(&self) {
        self.tx.send_replace(true);
    }

    pub(crate) fn is_armed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the deadline has been armed.
    pub async fn expired(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns once armed.
        let _ = rx.wait_for(|armed| *armed).await;
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::new()
    }
}

/// Both streams handed back after a relay, with per-direction byte totals.
pub struct Relayed<C, D> {
    pub client: C,
    pub dest: D,
    pub client_to_dest: u64,
    pub dest_to_client: u64,
}

/// Copies bytes between `client` and `dest` until one direction ends, then
/// expires the other one.
///
/// The streams are returned untouched; closing them is up to the caller.
pub async fn relay<C, D>(client: C, dest: D) -> io::Result<Relayed<C, D>>
where
    C: AsyncSocket,
    D: AsyncSocket,
{
    let deadline = Deadline::new();
    let (mut client_reader, mut client_writer) = split(client);
    let (mut dest_reader, mut dest_writer) = split(dest);

    let upstream = {
        let deadline = deadline.clone();
        tokio::spawn(async move {
            let n = copy_until_expired(&mut client_reader, &mut dest_writer, &deadline).await;
            deadline.arm();
            (n, client_reader, dest_writer)
        })
    };

    let dest_to_client = copy_until_expired(&mut dest_reader, &mut client_writer, &deadline).await;
    deadline.arm();

    let (client_to_dest, client_reader, dest_writer) = upstream.await.map_err(io::Error::other)?;
    trace!(
        "relay finished, client->dest {} dest->client {}",
        client_to_dest,
        dest_to_client
    );

    Ok(Relayed {
        client: client_reader.unsplit(client_writer),
        dest: dest_reader.unsplit(dest_writer),
        client_to_dest,
        dest_to_client,
    })
}

/// Streams `reader` into `writer` until EOF, an I/O error, or `deadline`
/// expires. Returns the number of bytes written.
async fn copy_until_expired<R, W>(reader: &mut R, writer: &mut W, deadline: &Deadline) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUF_SIZE];
    let mut transferred = 0u64;

    while !deadline.is_armed() {
        let n = tokio::select! {
            res = reader.read(&mut buf) => match res {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            },
            _ = deadline.expired() => break,
        };

        let written = tokio::select! {
            res = write_chunk(writer, &buf[..n]) => res.is_ok(),
            _ = deadline.expired() => false,
        };
        if !written {
            break;
        }
        transferred += n as u64;
    }

    transferred
}

async fn write_chunk<W>(writer: &mut W, chunk: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(chunk).await?;
    writer.flush().await
}
