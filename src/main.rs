use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use userfs::api;
use userfs::config::validate_config;
use userfs::domain;
use userfs::utils::cli::Args;
use userfs::utils::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("userfs=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let config = validate_config(&args).await?;

    let pool = domain::connect(&config.db_url, 12).await?;
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, Arc::new(pool)));

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down");
}
