mod config;
mod error;
mod html;
mod routes;
mod state;
mod view;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cardio_common::client::GuidelinesClient;

use config::Config;
use error::AppError;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting cardio-dashboard");

    let config = Config::from_env()?;
    info!(
        api = %config.api.base_url,
        listen_addr = %config.listen_addr,
        health_interval_secs = config.api.health_interval.as_secs(),
        timeout_secs = config.api.request_timeout.map(|t| t.as_secs()),
        "configuration loaded"
    );

    let state = build_state(&config)?;
    state.start_health_poller().await;

    let app = routes::app(state, config.max_upload_bytes);
    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %config.listen_addr, "dashboard ready");
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "dashboard server error");
    })?;

    info!("dashboard shut down");
    Ok(())
}

fn build_state(config: &Config) -> Result<AppState, AppError> {
    let client = GuidelinesClient::new(config.api.clone())?;
    Ok(AppState::new(client))
}
