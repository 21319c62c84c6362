pub mod dashboard;
pub mod history;
pub mod seed;

pub use dashboard::{Dashboard, DashboardView, ADVISORY_LOOKBACK, STRATEGY_LOG_CAPACITY};
pub use history::HistoryStore;
pub use seed::{SeedSource, SyntheticSeed};

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

use common::{Advisor, LoggedRecommendation, PriceUpdate, Result};

/// Dashboard shared between the update loop and the HTTP handlers.
pub type SharedDashboard = Arc<RwLock<Dashboard>>;

/// Run the update loop: fold every feed update into the dashboard.
/// Each update is applied under the write lock, so readers never see a
/// half-slid window. Call from `tokio::spawn`.
pub async fn run(dashboard: SharedDashboard, mut updates: mpsc::UnboundedReceiver<PriceUpdate>) {
    info!("Dashboard update loop running");
    while let Some(update) = updates.recv().await {
        if let Err(e) = dashboard.write().await.apply_update(update) {
            warn!(instrument = %update.instrument, error = %e, "Failed to apply price update");
        }
    }
    warn!("Price update channel closed, stopping dashboard loop");
}

/// Ask `advisor` about the current view and log the answer.
///
/// The lock is released while the model is thinking; the result is logged
/// against the instrument the request was built for.
pub async fn request_strategy(
    dashboard: &SharedDashboard,
    advisor: &dyn Advisor,
) -> Result<LoggedRecommendation> {
    let request = dashboard.read().await.advisory_request();
    info!(instrument = %request.instrument, price = request.current_price, "Requesting strategy");

    let recommendation = advisor.recommend(&request).await.map_err(|e| {
        error!(instrument = %request.instrument, error = %e, "Strategy request failed");
        e
    })?;

    let entry = dashboard
        .write()
        .await
        .record_recommendation(request.instrument, recommendation);
    info!(
        instrument = %entry.instrument,
        action = %entry.recommendation.action,
        confidence = entry.recommendation.confidence,
        "Strategy received"
    );
    Ok(entry)
}
