pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use common::{Advisor, Result};
use dashboard::SharedDashboard;
use feed::PriceFeed;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: SharedDashboard,
    /// Read-only here: only its connection state is reported.
    pub feed: Arc<dyn PriceFeed>,
    pub advisor: Arc<dyn Advisor>,
}

/// All routes with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::api_router())
        .merge(routes::ws_router())
        .merge(routes::health_router())
        .with_state(state)
        .layer(cors)
}

/// Build and run the Axum API server.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Dashboard API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
