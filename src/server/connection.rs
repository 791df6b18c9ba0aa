use anyhow::Context;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::trace;

use crate::protocol::{ConnectionHandle, Outbound, OutboundQueue, Protocol, ProtocolFactory};

const READ_BUFFER_SIZE: usize = 8192;

/// One accepted socket and the protocol instance that owns its state.
///
/// All calls into the protocol happen from the task running [`run`], which
/// provides the per-connection serialisation protocols rely on.
///
/// [`run`]: Connection::run
pub struct Connection {
    id: u64,
    stream: TcpStream,
    protocol: Box<dyn Protocol>,
    outbound: OutboundQueue,
}

impl Connection {
    pub fn open(stream: TcpStream, id: u64, factory: &dyn ProtocolFactory) -> Self {
        let peer = stream.peer_addr().ok();
        let (handle, outbound) = ConnectionHandle::channel(id, peer);
        let protocol = factory.on_open(handle);

        Self {
            id,
            stream,
            protocol,
            outbound,
        }
    }

    /// Drives the protocol until the peer leaves, the protocol closes the
    /// connection, or shutdown is signalled. `on_close` runs exactly once.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let result = self.drive(&mut shutdown).await;
        self.protocol.on_close();
        let _ = self.stream.shutdown().await;
        result
    }

    async fn drive(&mut self, shutdown: &mut watch::Receiver<bool>) -> anyhow::Result<()> {
        let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

        loop {
            buf.clear();
            let n = tokio::select! {
                res = self.stream.read_buf(&mut buf) => res?,
                _ = shutdown.changed() => {
                    self.protocol.on_shutdown();
                    self.flush().await?;
                    return Ok(());
                }
            };

            if n == 0 {
                trace!(conn = self.id, "peer closed connection");
                return Ok(());
            }

            let result = self.protocol.on_data(&buf);
            let open = self.flush().await?;
            result?;

            if !open {
                trace!(conn = self.id, "protocol closed connection");
                return Ok(());
            }
        }
    }

    /// Writes everything queued. Returns `false` once a close was requested.
    async fn flush(&mut self) -> anyhow::Result<bool> {
        while let Ok(item) = self.outbound.try_recv() {
            match item {
                Outbound::Data(bytes) => self.stream.write_all(&bytes).await?,
                Outbound::File { path, len } => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("opening {}", path.display()))?;
                    let mut reader = file.take(len);
                    let copied = tokio::io::copy(&mut reader, &mut self.stream).await?;
                    if copied < len {
                        anyhow::bail!("{} shrank while streaming", path.display());
                    }
                }
                Outbound::Close => {
                    self.stream.flush().await?;
                    return Ok(false);
                }
            }
        }

        self.stream.flush().await?;
        Ok(true)
    }
}
