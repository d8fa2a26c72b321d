//! Keygate license activation server.
//!
//! Verifies identity tokens with an OAuth2 `tokeninfo` endpoint, redeems
//! one-time license keys and tracks time-bounded sessions in SQLite.
//!
//! Usage:
//!   keygate-server --port 8080 --database keygate.db
//!
//! Every flag can also be set through its `KEYGATE_*` environment variable.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use keygate_identity::{TokenInfoConfig, TokenInfoVerifier};
use keygate_license::Authorizer;
use keygate_server::{build_router, AppState};
use keygate_storage::SqliteStore;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "keygate-server")]
#[command(about = "License activation and session authorization service")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, env = "KEYGATE_PORT", default_value = "8080")]
    port: u16,

    /// Address to bind
    #[arg(long, env = "KEYGATE_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Path to the SQLite database file
    #[arg(short, long, env = "KEYGATE_DATABASE", default_value = "keygate.db")]
    database: PathBuf,

    /// Identity provider token introspection endpoint
    #[arg(
        long,
        env = "KEYGATE_IDENTITY_URL",
        default_value = "https://www.googleapis.com/oauth2/v3/tokeninfo"
    )]
    identity_url: String,

    /// Timeout for identity provider calls, in seconds
    #[arg(long, env = "KEYGATE_IDENTITY_TIMEOUT_SECS", default_value = "10")]
    identity_timeout_secs: u64,

    /// Token required in the x-admin-token header for admin routes
    #[arg(long, env = "KEYGATE_ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Keygate starting...");

    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("Failed to open database {}", args.database.display()))?;

    let verifier = TokenInfoVerifier::new(TokenInfoConfig {
        endpoint: args.identity_url.clone(),
        timeout_ms: args.identity_timeout_secs.saturating_mul(1_000),
    })
    .context("Failed to build identity provider client")?;

    let authorizer = Authorizer::new(Arc::new(verifier), Arc::new(store));
    let mut state = AppState::new(authorizer);
    match args.admin_token {
        Some(token) => state = state.with_admin_token(token),
        None => warn!("No admin token configured; admin routes are open"),
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.bind, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Identity provider: {}", args.identity_url);
    info!("Listening on http://{}", addr);

    axum::serve(listener, build_router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Keygate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
