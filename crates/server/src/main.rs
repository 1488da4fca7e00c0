use std::net::SocketAddr;
use std::path::Path;

use portal_core::app::scheduler::GuardianScheduler;
use portal_server::app_state::AppState;
use portal_server::config::{AppMode, ConfigError, ServerConfig};
use portal_server::{db, handlers, logging, schema};

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    let config_path = std::env::var("SERVER_CONFIG_PATH")
        .unwrap_or_else(|_| "crates/server/res/config.toml".to_string());
    let config_path = Path::new(&config_path);

    let config = ServerConfig::load(config_path).await?;
    logging::init_tracing(&config)?;
    if let Some(tz) = config.app.timezone.as_deref() {
        tracing::info!(timezone = tz, "server timezone configured");
    }

    tracing::info!(mode = ?config.app.mode, name = %config.app.name, "server mode configured");
    tracing::info!(host = %config.http.host, port = config.http.port, "server http bind");

    let pool = db::connect_db(&config, config_path).await?;
    schema::apply_server_schema(&pool, config_path).await?;

    if config.app.mode == AppMode::Dev && config.dev.reset_on_start {
        db::reset_server_data(&pool).await?;
    }
    db::ensure_default_admin(&config, &pool).await?;

    let state = AppState::from_config(&config, pool)?;

    if config.guardian.enabled {
        let guardian = state.guardian.clone();
        let cache = state.cache.clone();
        tokio::spawn(async move {
            GuardianScheduler::run_forever(guardian, move |report| {
                handlers::guardian::invalidate_after_survival(&cache, report);
            })
            .await;
        });
    } else {
        tracing::info!("storage guardian disabled");
    }

    let addr: SocketAddr = format!("{}:{}", config.http.host, config.http.port)
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("invalid http bind: {e}")))?;

    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ConfigError::Invalid(format!("http server error: {e}")))?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
