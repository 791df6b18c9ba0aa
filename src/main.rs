use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use keel::config::Config;
use keel::http::request::Method;
use keel::http::response::Response;
use keel::http::{HttpProtocolFactory, RequestOutcome};
use keel::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let has_folder = cfg.http.public_folder.is_some();

    // With a public folder everything but /health falls through to it.
    let settings = cfg
        .http
        .settings()?
        .on_request(move |req| match (&req.method, req.path.as_str()) {
            (Method::GET, "/health") => RequestOutcome::Respond(Response::ok("ok\n")),
            _ if has_folder => RequestOutcome::Unhandled,
            _ => RequestOutcome::Respond(Response::ok("Hello from keel\n")),
        })
        .build()?;

    let factory = Arc::new(HttpProtocolFactory::new(settings));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let addr = cfg.server.listen_addr.clone();
    let mut listener =
        tokio::spawn(async move { server::listener::run(&addr, factory, shutdown_rx).await });

    tokio::select! {
        res = &mut listener => {
            res??;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
            listener.await??;
        }
    }

    Ok(())
}
