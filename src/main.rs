//! Webhook receiver binary.
//!
//! Accepts update deliveries over HTTP(S) and logs each decoded update.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │               WEBHOOK RECEIVER               │
//!                       │                                              │
//!     Update delivery   │  ┌─────────┐    ┌─────────┐    ┌──────────┐  │
//!     ──────────────────┼─▶│   net   │───▶│ server  │───▶│ dispatch │  │
//!                       │  │transport│    │ router  │    │processor │  │
//!                       │  └─────────┘    └────┬────┘    └────┬─────┘  │
//!                       │                      │              │        │
//!     200 "OK"          │                      ▼              ▼        │
//!     ◀─────────────────┼── health / teapot / unauthorized  listener   │
//!                       │                                   or log     │
//!                       │  ┌────────────────────────────────────────┐  │
//!                       │  │   config (schema, loader, validation)  │  │
//!                       │  └────────────────────────────────────────┘  │
//!                       └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webhook_gate::{load_config, UpdateProcessor, WebhookConfig, WebhookServer};

#[derive(Parser)]
#[command(name = "webhook-gate")]
#[command(about = "Inbound webhook receiver", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind, overriding the file.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overriding the file.
    #[arg(long)]
    port: Option<u16>,

    /// Secret token expected in update paths, overriding the file.
    #[arg(long)]
    secret_token: Option<String>,

    /// Health probe pattern, overriding the file.
    #[arg(long)]
    health_endpoint: Option<String>,
}

/// Stock processor: logs each decoded update.
struct LoggingProcessor;

impl UpdateProcessor for LoggingProcessor {
    fn process_update(&self, update: Value) {
        let update_id = update.get("update_id").and_then(Value::as_i64);
        tracing::info!(update_id = ?update_id, "Update received");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webhook_gate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("webhook-gate v0.1.0 starting");

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WebhookConfig::default(),
    };
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(token) = cli.secret_token {
        config.secret_token = token;
    }
    if let Some(pattern) = cli.health_endpoint {
        config.health_endpoint = pattern;
    }

    tracing::info!(
        host = %config.host,
        port = config.port,
        health_endpoint = %config.health_endpoint,
        tls = config.tls.is_some(),
        "Configuration loaded"
    );

    let server = WebhookServer::new(config, Arc::new(LoggingProcessor)).await?;
    server.open().await?;

    shutdown_signal().await;

    server.close().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
