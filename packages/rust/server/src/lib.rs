//! HTTP transport for ConceptLens.
//!
//! Exposes the concept pipeline over axum. Development mode answers from a
//! fixed record and works without a configured completion service.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

use conceptlens_shared::{ConceptLensError, Result};
use tokio::net::TcpListener;
use tracing::info;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;

/// Bind `bind_addr` and serve until Ctrl-C.
pub async fn serve(bind_addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| ConceptLensError::config(format!("cannot bind {bind_addr}: {e}")))?;

    info!(
        addr = %bind_addr,
        llm_configured = state.is_configured(),
        "conceptlens server listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ConceptLensError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
