//! # secureapp-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for SecureApp.
//! Binds to configurable port (default 8080).

use anyhow::Context;
use secureapp_api::oidc::OidcClient;
use secureapp_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    let oidc = match config.oidc.clone() {
        Some(oidc_config) => {
            let client = OidcClient::new(oidc_config).context("failed to build OIDC client")?;
            tracing::info!(registration = %config.registration_id, "single sign-on configured");
            Some(client)
        }
        None => {
            tracing::warn!(
                "OIDC_CLIENT_ID not set. Login endpoints will return 503 and protected paths are unreachable."
            );
            None
        }
    };

    let port = config.port;
    let state = AppState::with_config(config, oidc);
    let app = secureapp_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("SecureApp API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

/// Structured tracing; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
