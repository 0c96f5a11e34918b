//! Configuration resolution for `FleetGate`.
//!
//! Implements layered config resolution:
//! 1. Built-in defaults
//! 2. JSON config file (only when a path is given)
//! 3. Environment variables (`FLEETGATE_*`)
//! 4. CLI arguments (applied by the binary, highest priority)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Device tokens live for a year; devices rarely re-authenticate.
pub const DEFAULT_DEVICE_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;
/// Admin session tokens live for thirty minutes.
pub const DEFAULT_ADMIN_TOKEN_TTL_SECS: i64 = 30 * 60;

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    /// HMAC secret for token signing. `None` means the binary falls back to
    /// a development secret and warns about it.
    pub jwt_secret: Option<String>,
    pub device_token_ttl_secs: i64,
    pub admin_token_ttl_secs: i64,
    /// How often expired blocklist rows are swept, in seconds.
    pub blocklist_sweep_interval_secs: u64,
    pub max_payload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: None,
            jwt_secret: None,
            device_token_ttl_secs: DEFAULT_DEVICE_TOKEN_TTL_SECS,
            admin_token_ttl_secs: DEFAULT_ADMIN_TOKEN_TTL_SECS,
            blocklist_sweep_interval_secs: 3600,
            max_payload_bytes: 64 * 1024,
        }
    }
}

impl ServerConfig {
    /// Database path, falling back to `~/.fleetgate/fleet.db`.
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        default_database_path()
            .ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.device_token_ttl_secs <= 0 || self.admin_token_ttl_secs <= 0 {
            return Err(Error::Config("Token TTLs must be positive".to_string()));
        }
        if self.blocklist_sweep_interval_secs == 0 {
            return Err(Error::Config(
                "Blocklist sweep interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default location of the fleet database.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".fleetgate").join("fleet.db"))
}

/// Load configuration with layered resolution.
///
/// A missing file is an error: the caller asked for it explicitly.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => ServerConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;

    Ok(config)
}

fn load_config_file(path: &Path) -> Result<ServerConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> Result<T> {
    val.parse()
        .map_err(|_| Error::Config(format!("Invalid value for {key}: {val:?}")))
}

/// Apply `FLEETGATE_*` overrides read through `lookup`.
fn apply_env_overrides(
    config: &mut ServerConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = lookup("FLEETGATE_LISTEN_ADDR") {
        config.listen_addr = parse_env("FLEETGATE_LISTEN_ADDR", &val)?;
    }
    if let Some(val) = lookup("FLEETGATE_DATABASE_PATH") {
        config.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("FLEETGATE_JWT_SECRET") {
        config.jwt_secret = Some(val);
    }
    if let Some(val) = lookup("FLEETGATE_DEVICE_TOKEN_TTL") {
        config.device_token_ttl_secs = parse_env("FLEETGATE_DEVICE_TOKEN_TTL", &val)?;
    }
    if let Some(val) = lookup("FLEETGATE_ADMIN_TOKEN_TTL") {
        config.admin_token_ttl_secs = parse_env("FLEETGATE_ADMIN_TOKEN_TTL", &val)?;
    }
    if let Some(val) = lookup("FLEETGATE_BLOCKLIST_SWEEP_INTERVAL") {
        config.blocklist_sweep_interval_secs =
            parse_env("FLEETGATE_BLOCKLIST_SWEEP_INTERVAL", &val)?;
    }
    if let Some(val) = lookup("FLEETGATE_MAX_PAYLOAD_BYTES") {
        config.max_payload_bytes = parse_env("FLEETGATE_MAX_PAYLOAD_BYTES", &val)?;
    }
    Ok(())
}
