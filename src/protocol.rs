//! Protocol capability contract between the server core and a protocol layer.
//!
//! The server core accepts connections and moves bytes. For every accepted
//! connection it asks a [`ProtocolFactory`] for a fresh [`Protocol`] instance,
//! feeds it every chunk read from the socket and tells it when the socket is
//! gone. The protocol answers by queueing [`Outbound`] items on the
//! [`ConnectionHandle`] it was opened with.
//!
//! # Preconditions
//!
//! The server core must serialise all calls into one instance: `on_data`,
//! `on_shutdown` and `on_close` never overlap for the same connection. The
//! `&mut self` receivers encode this; instances are therefore never shared
//! between tasks and need no internal locking.

use std::net::SocketAddr;
use std::path::PathBuf;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::ProtocolError;

/// A per-connection protocol instance.
pub trait Protocol: Send {
    /// Feeds bytes freshly read from the connection.
    ///
    /// An `Err` is fatal: the server core flushes whatever was queued and
    /// closes the connection.
    fn on_data(&mut self, data: &[u8]) -> Result<(), ProtocolError>;

    /// Called once, after which the instance is dropped.
    fn on_close(&mut self);

    /// Called when the server starts shutting down, before `on_close`.
    fn on_shutdown(&mut self) {}
}

/// Creates one [`Protocol`] per accepted connection.
pub trait ProtocolFactory: Send + Sync + 'static {
    fn on_open(&self, conn: ConnectionHandle) -> Box<dyn Protocol>;
}

/// Work queued for the server core to perform on the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Raw bytes to write.
    Data(Bytes),
    /// Stream `len` bytes of a file from disk.
    File { path: PathBuf, len: u64 },
    /// Flush everything queued before this, then close.
    Close,
}

/// Receiving side of a connection's outbound queue, owned by the server core.
pub type OutboundQueue = mpsc::UnboundedReceiver<Outbound>;

/// Write access to a connection, handed to protocols and applications.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: u64,
    peer: Option<SocketAddr>,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Creates a handle together with the queue the server core drains.
    pub fn channel(id: u64, peer: Option<SocketAddr>) -> (Self, OutboundQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id, peer, tx }, rx)
    }

    /// Server-local connection id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Queues bytes for writing. Returns `false` once the connection is gone.
    pub fn write(&self, data: impl Into<Bytes>) -> bool {
        self.send(Outbound::Data(data.into()))
    }

    /// Queues a file to be streamed after everything already queued.
    pub fn send_file(&self, path: impl Into<PathBuf>, len: u64) -> bool {
        self.send(Outbound::File {
            path: path.into(),
            len,
        })
    }

    /// Asks the server core to close the connection after flushing.
    pub fn close(&self) -> bool {
        self.send(Outbound::Close)
    }

    /// Whether the server core still drains this connection's queue.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, item: Outbound) -> bool {
        self.tx.send(item).is_ok()
    }
}
