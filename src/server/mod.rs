//! HTTP services: the per-node speedtest server and the discovery center

pub mod center;
pub mod node;

pub use center::{center_router, CenterState, NodeProxy};
pub use node::{node_router, NodeState};

use crate::error::{AppError, Result};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Bind `0.0.0.0:<port>`
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::http(format!("failed to bind {}: {}", addr, e)))
}

/// Serve `router` until `shutdown` resolves
pub async fn serve<F>(router: Router, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::http(format!("server error: {}", e)))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Serve on an ephemeral loopback port and return its base URL
    pub async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(router, listener, std::future::pending()));
        format!("http://{}", addr)
    }
}
