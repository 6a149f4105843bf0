//! Application entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use solana_sweep_service::api::{RateLimitConfig, create_router, create_router_with_rate_limit};
use solana_sweep_service::app::{AppState, SweepConfig};

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = SweepConfig::from_env().context("Failed to load configuration")?;
    init_tracing(config.json_logs);

    info!("🧹 Solana Sweep Service v{}", env!("CARGO_PKG_VERSION"));
    info!("🎯 Sweep destination: {}", config.destination);

    info!("📦 Initializing components...");
    let connector = config.connector();
    let price_oracle = Arc::new(config.price_oracle()?);
    info!("   ✓ Price oracle created (coingecko, binance)");

    let planner = Arc::new(config.planner(Arc::clone(&connector), price_oracle));
    info!(
        "   ✓ Planner ready ({} endpoints, sweep {} bps)",
        config.planner_endpoints.len(),
        config.policy.sweep_bps
    );
    let broadcaster = Arc::new(config.broadcaster(connector));
    info!(
        "   ✓ Broadcaster ready ({} endpoints)",
        config.broadcast_endpoints.len()
    );

    let request_timeout = config.request_timeout();
    info!("   ✓ Request timeout {}s", request_timeout.as_secs());
    let app_state =
        Arc::new(AppState::new(planner, broadcaster).with_request_timeout(request_timeout));

    let router = if config.enable_rate_limiting {
        info!(
            "   ✓ Rate limiting enabled ({} rps, burst {})",
            config.rate_limit_rps, config.rate_limit_burst
        );
        create_router_with_rate_limit(
            app_state,
            RateLimitConfig::new(config.rate_limit_rps, config.rate_limit_burst),
        )
    } else {
        info!("   ○ Rate limiting disabled");
        create_router(app_state)
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🚀 Server starting on http://{}", addr);
    info!("📖 Swagger UI available at http://{}/swagger-ui", addr);
    info!("📄 OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
