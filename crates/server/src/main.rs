//! Ad-hoc SQL execution gateway server.

mod api;
mod audit;
mod coordinator;
mod policy;
mod results;
mod router;
mod state;

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    adhoc_core::config::load_dotenv();
    let config = adhoc_core::Config::from_env();
    config.log_summary();

    let state = state::build_state(config.clone())?;

    results::spawn_sweeper(
        state.results.clone(),
        std::time::Duration::from_secs(config.storage.sweep_interval_seconds),
    );

    let app = router::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Ad-hoc SQL gateway listening on {}", addr);
    info!("API docs at http://{}/docs", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
