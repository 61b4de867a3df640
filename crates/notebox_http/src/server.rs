//! Listener lifecycle for the note service and the reverse proxy.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use log::info;
use tokio::net::TcpListener;
use tokio::signal;

use crate::proxy::{create_proxy_router, ProxyState};
use crate::routes::create_router;
use crate::state::AppState;

/// Serves the note service until `shutdown` resolves.
pub async fn serve_notes<F>(listener: TcpListener, state: AppState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("event=server_start module=server status=ok role=notes addr={addr}");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("event=server_stop module=server status=ok role=notes addr={addr}");
    Ok(())
}

/// Serves the reverse proxy until `shutdown` resolves.
pub async fn serve_proxy<F>(listener: TcpListener, state: ProxyState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(
        "event=server_start module=server status=ok role=proxy addr={addr} upstream={}",
        state.upstream()
    );

    axum::serve(
        listener,
        create_proxy_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("event=server_stop module=server status=ok role=proxy addr={addr}");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("event=shutdown module=server reason=ctrl_c"),
        () = terminate => info!("event=shutdown module=server reason=sigterm"),
    }
}
