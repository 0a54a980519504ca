//! CareBase HTTP and WebSocket server.
//!
//! Routes live in [`routes`], the real-time channel in [`realtime`]. All
//! handlers share an [`AppState`] holding the core, the assistant and the
//! notification hub.

pub mod ai;
pub mod config;
pub mod error;
pub mod realtime;
pub mod routes;
pub mod state;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;

/// Serve until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "CareBase API listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
