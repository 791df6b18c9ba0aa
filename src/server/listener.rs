use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::protocol::ProtocolFactory;
use crate::server::connection::Connection;

/// Binds `addr` and serves connections until `shutdown` flips.
pub async fn run(
    addr: &str,
    factory: Arc<dyn ProtocolFactory>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    serve(listener, factory, shutdown).await
}

/// Accept loop over an already bound listener.
pub async fn serve(
    listener: TcpListener,
    factory: Arc<dyn ProtocolFactory>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut next_id: u64 = 0;

    loop {
        let (socket, peer) = tokio::select! {
            res = listener.accept() => match res {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = shutdown.changed() => {
                info!("Listener stopping");
                return Ok(());
            }
        };

        next_id += 1;
        let id = next_id;
        info!(conn = id, "Accepted connection from {}", peer);

        let factory = Arc::clone(&factory);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut conn = Connection::open(socket, id, factory.as_ref());
            if let Err(e) = conn.run(shutdown).await {
                warn!(conn = id, "Connection error from {}: {}", peer, e);
            }
        });
    }
}
