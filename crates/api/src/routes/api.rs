use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use common::{Error, Instrument, LoggedRecommendation};
use dashboard::DashboardView;

use crate::AppState;

type ApiError = (StatusCode, Json<Value>);

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/select", post(post_select))
        .route("/api/strategy", post(post_strategy))
        .route("/api/strategies", get(get_strategies))
}

fn api_error(status: StatusCode, err: &Error) -> ApiError {
    (status, Json(json!({ "error": err.to_string() })))
}

// ─── Dashboard ────────────────────────────────────────────────────────────────

async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    let connection = state.feed.connection_state();
    Json(state.dashboard.read().await.view(connection))
}

#[derive(Deserialize)]
struct SelectBody {
    instrument: Instrument,
}

/// Switch the instrument on screen. Seeds its history on first selection.
async fn post_select(
    State(state): State<AppState>,
    Json(body): Json<SelectBody>,
) -> Result<Json<DashboardView>, ApiError> {
    let connection = state.feed.connection_state();
    let mut dash = state.dashboard.write().await;
    dash.select(body.instrument).map_err(|e| {
        warn!(instrument = %body.instrument, error = %e, "Selection failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, &e)
    })?;
    info!(instrument = %body.instrument, "Instrument selected");
    Ok(Json(dash.view(connection)))
}

// ─── Strategy ─────────────────────────────────────────────────────────────────

async fn post_strategy(
    State(state): State<AppState>,
) -> Result<Json<LoggedRecommendation>, ApiError> {
    dashboard::request_strategy(&state.dashboard, state.advisor.as_ref())
        .await
        .map(Json)
        .map_err(|e| match e {
            Error::Config(_) => api_error(StatusCode::SERVICE_UNAVAILABLE, &e),
            _ => api_error(StatusCode::BAD_GATEWAY, &e),
        })
}

async fn get_strategies(State(state): State<AppState>) -> Json<Vec<LoggedRecommendation>> {
    Json(state.dashboard.read().await.strategy_log())
}
