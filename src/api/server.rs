use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::{config::ServerConfig, dispatch::MethodRegistry, errors::Error};

use super::routes::build_router_with_timeout;

/// Bind, serve until Ctrl-C / SIGTERM, then drain for the configured grace period.
pub async fn start_api_server(
    config: &ServerConfig,
    registry: Arc<MethodRegistry>,
) -> crate::errors::Result<()> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| Error::config(format!("Invalid API address: {}", e)))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::transport(format!("Failed to bind API server: {}", e)))?;

    info!(methods = ?registry.method_names(), "Storage methods available");
    let router = build_router_with_timeout(registry, config.timeout());
    serve(listener, router, shutdown_signal(), config.shutdown_grace()).await
}

/// Serve `router` on `listener` until `shutdown` resolves.
///
/// In-flight requests get `grace` to finish; anything still running after
/// that is aborted.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send,
    grace: Duration,
) -> crate::errors::Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| Error::transport(format!("Failed to read local address: {}", e)))?;
    info!(address = %addr, "Starting HTTP API server");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => return flatten(result),
        _ = shutdown => {}
    }

    info!(grace_ms = grace.as_millis() as u64, "Shutdown requested, draining connections");
    let _ = stop_tx.send(());

    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => flatten(result)?,
        Err(_) => {
            warn!("Drain period elapsed, aborting remaining connections");
            server.abort();
        }
    }

    info!("API server shutdown completed");
    Ok(())
}

fn flatten(
    result: std::result::Result<std::io::Result<()>, tokio::task::JoinError>,
) -> crate::errors::Result<()> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Error::transport(format!("API server error: {}", e))),
        Err(e) => Err(Error::internal(format!("API server task failed: {}", e))),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "API server shutdown listener failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM listener failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::build_router;

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(Arc::new(MethodRegistry::new()));
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(serve(
            listener,
            router,
            async {
                let _ = rx.await;
            },
            Duration::from_secs(1),
        ));

        let body = reqwest::get(format!("http://{}/ping", addr)).await.unwrap().text().await.unwrap();
        assert_eq!(body, ".");

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_invalid_bind_address() {
        let config = ServerConfig { host: "not an address".to_string(), ..Default::default() };
        let result = start_api_server(&config, Arc::new(MethodRegistry::new())).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
