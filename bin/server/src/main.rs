use accweb_server::{app, config::ServerConfig, error::StartupError};
use rootcause::prelude::Report;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(report) = run().await {
        tracing::error!("{report}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<StartupError>> {
    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| StartupError::Config {
        details: e.to_string(),
    })?;
    tracing::info!("Loaded configuration");

    let router = app::from_config(&config)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| StartupError::Serve {
            details: format!("failed to bind {}: {e}", config.bind_addr),
        })?;

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Serve {
            details: e.to_string(),
        })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
