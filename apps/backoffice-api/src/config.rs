//! Server configuration.
//!
//! Loaded from `TRADEDESK_*` environment variables with fallback to defaults.
//!
//! | Variable                    | Default                              |
//! |-----------------------------|--------------------------------------|
//! | `TRADEDESK_HOST`            | `0.0.0.0`                            |
//! | `TRADEDESK_PORT`            | `8080`                               |
//! | `TRADEDESK_DB_PATH`         | platform data dir / `tradedesk.db`   |
//! | `TRADEDESK_MAX_CONNECTIONS` | `5`                                  |
//! | `TRADEDESK_LOG`             | `RUST_LOG`, then `info`              |

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_path: PathBuf,
    pub max_connections: u32,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ServerConfig {
            host: parse_or(&lookup, "TRADEDESK_HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&lookup, "TRADEDESK_PORT", 8080)?,
            database_path: match lookup("TRADEDESK_DB_PATH") {
                Some(path) if !path.trim().is_empty() => PathBuf::from(path),
                Some(_) => return Err(ConfigError::InvalidValue("TRADEDESK_DB_PATH".to_string())),
                None => default_database_path()?,
            },
            max_connections: parse_or(&lookup, "TRADEDESK_MAX_CONNECTIONS", 5)?,
            log_filter: lookup("TRADEDESK_LOG")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("TRADEDESK_MAX_CONNECTIONS".to_string()));
        }
        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// `<data dir>/tradedesk.db`, e.g. `~/.local/share/backoffice/tradedesk.db`.
fn default_database_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("com", "tradedesk", "backoffice").ok_or(ConfigError::NoDataDirectory)?;
    Ok(dirs.data_dir().join("tradedesk.db"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine a data directory; set TRADEDESK_DB_PATH")]
    NoDataDirectory,
}
