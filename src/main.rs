use std::{sync::Arc, time::Duration};

use anyhow::Context;

use pdfquiz_server::{
    auth::bootstrap::seed_admin,
    config::AppConfig,
    db::connection,
    logging::init_tracing,
    notify::LogNotificationSink,
    routes::app,
    services::{AuthPolicy, ServiceContext, sweeper},
    state::AppState,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!("server failed: {err:?}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env().context("failed to load config")?;
    init_tracing(&cfg.logging);

    let db_cfg = cfg
        .database
        .as_ref()
        .context("database config is required (set APP_DATABASE__URL)")?;
    let db = connection::connect(db_cfg).await?;
    let services = ServiceContext::new(&db);

    let auth = services.auth(Arc::new(LogNotificationSink), AuthPolicy::from(&cfg.auth));
    seed_admin(&cfg.auth, &auth).await?;
    let _sweeper = sweeper::spawn(
        auth.clone(),
        Duration::from_secs(cfg.auth.sweep_interval_secs),
    );

    let state = AppState::new(cfg, auth);
    let addr = state.config.general.socket_addr()?;

    tracing::info!("listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
