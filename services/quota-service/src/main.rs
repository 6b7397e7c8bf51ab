use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use coffer_quota_core::QuotaEngine;
use coffer_quota_service::api::{self, ApiState};
use coffer_quota_service::config::QuotaServiceConfig;
use coffer_quota_service::storage::SqliteStorage;

#[tokio::main]
async fn main() -> Result<()> {
    let config = QuotaServiceConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config);

    info!(
        host = %config.server_host,
        port = config.server_port,
        data_dir = %config.data_dir.display(),
        "starting quota service"
    );

    let settings = config
        .load_quota_settings()
        .context("failed to load quota settings")?;
    let storage = Arc::new(
        SqliteStorage::new(config.data_dir.clone()).context("failed to open quota storage")?,
    );
    let engine = QuotaEngine::new(storage, settings);

    let state = Arc::new(ApiState::new(engine));
    let router = api::create_router(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("invalid server bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;
    info!(%addr, "quota service listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server encountered an unrecoverable error")?;

    info!("quota service shutting down");
    Ok(())
}

fn init_tracing(config: &QuotaServiceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
