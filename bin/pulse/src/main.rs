use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use advisor::GeminiAdvisor;
use common::{Config, ConnectionState, Instrument};
use dashboard::{Dashboard, SyntheticSeed};
use feed::{FeedSettings, PriceFeed, StreamManager, TungsteniteConnector};
use indicators::IndicatorConfig;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {e}"));
    let indicator_cfg = IndicatorConfig::load_or_default(cfg.indicator_config_path.as_deref())
        .unwrap_or_else(|e| panic!("Invalid indicator configuration: {e}"));
    info!(
        feed = %cfg.feed_url,
        capacity = cfg.history_capacity,
        sma = indicator_cfg.sma_period,
        rsi = indicator_cfg.rsi_period,
        "Pulse starting"
    );

    // ── Dashboard ─────────────────────────────────────────────────────────────
    let seeds = Arc::new(SyntheticSeed::generate(cfg.history_capacity));
    let dash = Dashboard::new(Instrument::BtcUsd, cfg.history_capacity, seeds, indicator_cfg)
        .unwrap_or_else(|e| panic!("Failed to seed dashboard: {e}"));
    let dash = Arc::new(RwLock::new(dash));

    // ── Advisory model ────────────────────────────────────────────────────────
    let advisor = GeminiAdvisor::from_config(&cfg)
        .unwrap_or_else(|e| panic!("Failed to build advisory client: {e}"));
    if !advisor.is_configured() {
        warn!("ADVISOR_API_KEY not set. Strategy requests will be rejected.");
    }

    // ── Price feed ────────────────────────────────────────────────────────────
    let price_feed: Arc<dyn PriceFeed> = Arc::new(StreamManager::new(
        FeedSettings::from_config(&cfg),
        Arc::new(TungsteniteConnector),
    ));
    let updates = feed::subscribe_channel(price_feed.as_ref());

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    let api_state = api::AppState {
        dashboard: dash.clone(),
        feed: price_feed.clone(),
        advisor: Arc::new(advisor),
    };
    tokio::spawn(dashboard::run(dash, updates));
    let server = tokio::spawn(api::serve(api_state, cfg.dashboard_port));

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received."),
        res = server => match res {
            Ok(Ok(())) => warn!("Dashboard API stopped"),
            Ok(Err(e)) => error!(error = %e, "Dashboard API failed"),
            Err(e) => error!(error = %e, "Dashboard API task panicked"),
        },
    }

    // Give the close frame a moment to go out.
    price_feed.unsubscribe();
    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        while price_feed.connection_state() == ConnectionState::Closing {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    info!("Price feed closed. Exiting.");
}
