use budget_dashboard_dev_server::{create_router, DevServerConfig, DevState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = DevServerConfig::from_env()?;

    info!("Seeding in-memory ledger");
    let state = DevState::seeded(&config.token);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Dev server listening on http://{}/api", config.addr);

    axum::serve(listener, app).await?;

    Ok(())
}
