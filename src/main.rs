use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use donation_gateway::config::GatewayConfig;
use donation_gateway::http::{AppState, HttpServer};
use donation_gateway::payments::StripeClient;
use donation_gateway::ratelimit::RateLimiter;

/// Rate-limited donation payment gateway.
#[derive(Parser, Debug)]
#[command(name = "donation-gateway", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the HTTP listen address
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match args.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .init(),
    }

    info!("Starting Donation Gateway");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = GatewayConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.http_addr {
        config.server.http_addr = addr;
    }
    if config.payments.secret_key.is_none() {
        config.payments.secret_key = std::env::var("STRIPE_SECRET_KEY").ok();
    }

    let policy = config.rate_limiting.policy()?;
    let sweep_interval = config.rate_limiting.sweep_interval()?;
    info!(
        http_addr = %config.server.http_addr,
        max_requests = policy.max_requests(),
        window_ms = policy.window_millis(),
        "Configuration loaded"
    );

    // Initialize the rate limiter and its sweeper
    let rate_limiter = Arc::new(RateLimiter::new());
    let sweeper = rate_limiter.spawn_sweeper(sweep_interval);

    let payments = StripeClient::new(
        config.payments.secret_key.clone(),
        &config.payments.api_base,
        &config.payments.api_version,
    );
    if !payments.is_configured() {
        warn!("STRIPE_SECRET_KEY is not configured; payment intents will fail");
    }

    let state = AppState::new(rate_limiter, policy, Arc::new(payments))
        .with_currency(config.payments.default_currency.clone())
        .with_organization(config.payments.organization_name.clone());

    HttpServer::new(config.server.http_addr, state)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;
    info!("Donation Gateway stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
