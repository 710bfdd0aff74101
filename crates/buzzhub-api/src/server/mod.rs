//! HTTP server.

mod router;
mod types;

pub use router::create_router_with_state;
pub use types::ServerState;

use tracing::info;

/// Serve the dashboard on `bind` (`host:port`) until the listener fails.
pub async fn run(state: ServerState, bind: &str) -> anyhow::Result<()> {
    let app = create_router_with_state(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
