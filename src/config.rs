//! Configuration management
//!
//! Settings are seeded with defaults, optionally overlaid from an
//! `ets.toml` file, and finally overridden from `ETS_*` environment
//! variables. Optional collaborator credentials that are absent do not
//! fail loading; the corresponding tools degrade to a "not configured"
//! error at call time.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::AppResult;

/// Top-level server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Adzuna job board credentials
    #[serde(default)]
    pub adzuna: AdzunaConfig,
    /// Google Sheets export settings
    #[serde(default)]
    pub sheets: SheetsConfig,
}

/// Transport and dispatch settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host for the RPC listener
    pub host: String,
    /// Bind port for the RPC listener
    pub port: u16,
    /// Bind port for the health probe listener
    pub health_port: u16,
    /// Per-tool execution ceiling in seconds
    pub tool_timeout_secs: u64,
    /// Grace period for in-flight calls during shutdown, in seconds
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            health_port: 8081,
            tool_timeout_secs: 120,
            shutdown_grace_secs: 10,
        }
    }
}

impl ServerConfig {
    /// RPC listener address as `host:port`
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Health listener address as `host:port`
    pub fn health_addr(&self) -> String {
        format!("{}:{}", self.host, self.health_port)
    }

    /// Per-tool execution ceiling
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Shutdown grace period
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Adzuna API credentials; both keys must be present for the provider
/// to be constructed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdzunaConfig {
    pub app_id: Option<String>,
    pub app_key: Option<String>,
    pub country: Option<String>,
}

impl AdzunaConfig {
    /// Whether enough credentials are present to build the client
    pub fn is_configured(&self) -> bool {
        self.app_id.is_some() && self.app_key.is_some()
    }
}

/// Google Sheets export settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetsConfig {
    /// OAuth bearer token for the Sheets values API
    pub token: Option<String>,
    /// Default spreadsheet document id
    pub spreadsheet_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            adzuna: AdzunaConfig::default(),
            sheets: SheetsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `ets.toml` (if present) and the environment
    ///
    /// Environment variables use the `ETS_` prefix with `__` separating
    /// nesting levels, e.g. `ETS_SERVER__PORT=9090` or
    /// `ETS_ADZUNA__APP_KEY=...`.
    pub fn load() -> AppResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("ets").required(false))
            .add_source(
                config::Environment::with_prefix("ETS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        info!(
            addr = %cfg.server.rpc_addr(),
            adzuna = cfg.adzuna.is_configured(),
            sheets = cfg.sheets.token.is_some(),
            "configuration loaded"
        );
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.rpc_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.health_addr(), "0.0.0.0:8081");
        assert_eq!(cfg.tool_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_adzuna_configured() {
        let mut cfg = AdzunaConfig::default();
        assert!(!cfg.is_configured());
        cfg.app_id = Some("id".into());
        cfg.app_key = Some("key".into());
        assert!(cfg.is_configured());
    }
}
