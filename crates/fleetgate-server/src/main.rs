//! `FleetGate` Server
//!
//! REST backend for an IoT fleet: device registration and approval,
//! telemetry ingest and token-based access control.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use fleetgate_core::config::load_config;
use fleetgate_core::db::unix_timestamp;
use fleetgate_core::tracing_init::{LogFormat, init_tracing};
use fleetgate_server::auth::{Argon2Verifier, JwtManager, TokenPolicy, TokenService};
use fleetgate_server::http::build_router;
use fleetgate_server::state::AppState;
use fleetgate_server::storage::FleetDatabase;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Parser, Debug)]
#[command(name = "fleetgate-server")]
#[command(
    version,
    about = "FleetGate server - device registry, telemetry ingest and access control"
)]
struct Args {
    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JWT secret key.
    #[arg(long)]
    jwt_secret: Option<String>,

    /// Device token TTL in seconds.
    #[arg(long)]
    device_ttl: Option<i64>,

    /// Admin token TTL in seconds.
    #[arg(long)]
    admin_ttl: Option<i64>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing("fleetgate_server=info", LogFormat::from_json_flag(args.log_json))?;

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.listen_addr = addr;
    }
    if let Some(path) = args.db_path {
        config.database_path = Some(path);
    }
    if let Some(secret) = args.jwt_secret {
        config.jwt_secret = Some(secret);
    }
    if let Some(ttl) = args.device_ttl {
        config.device_token_ttl_secs = ttl;
    }
    if let Some(ttl) = args.admin_ttl {
        config.admin_token_ttl_secs = ttl;
    }
    if config.device_token_ttl_secs <= 0 || config.admin_token_ttl_secs <= 0 {
        anyhow::bail!("Token TTLs must be positive");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr,
        "Starting fleetgate-server"
    );

    let db_path = config.resolved_database_path()?;
    info!(path = %db_path.display(), "Opening fleet database");
    let db = FleetDatabase::open(&db_path).await?;

    let secret = config.jwt_secret.clone().unwrap_or_else(|| {
        warn!("No JWT secret configured; using the development secret");
        DEV_JWT_SECRET.to_string()
    });
    let policy = TokenPolicy {
        device_ttl_secs: config.device_token_ttl_secs,
        admin_ttl_secs: config.admin_token_ttl_secs,
    };

    let state = AppState::new(
        db,
        JwtManager::new(secret.as_bytes()),
        policy,
        Arc::new(Argon2Verifier::default()),
    );

    spawn_blocklist_sweep(
        Arc::clone(&state.tokens),
        Duration::from_secs(config.blocklist_sweep_interval_secs),
    );

    let app = build_router(state, config.max_payload_bytes);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Server listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Periodically drop blocklist entries that can no longer match a live token.
fn spawn_blocklist_sweep(tokens: Arc<TokenService>, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            match tokens.sweep_blocklist(unix_timestamp()).await {
                Ok(removed) if removed > 0 => {
                    info!(removed, "Blocklist sweep completed");
                }
                Err(e) => {
                    warn!(error = %e, "Blocklist sweep failed");
                }
                _ => {}
            }
        }
    });
}
