//! Configuration management

use serde::{Deserialize, Serialize};

use relay_broker::db::DbConfig;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/relay";

/// Default garbage-collection sweep interval in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Default worker binary spawned by the process provisioner.
pub const DEFAULT_WORKER_BINARY: &str = "relay-worker";

/// Which compute provisioner backs the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionerKind {
    /// Worker child processes on the local host
    #[default]
    Process,
    /// In-memory units only; dry runs and tests
    Memory,
}

impl std::str::FromStr for ProvisionerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "process" | "local" => Ok(ProvisionerKind::Process),
            "memory" | "dry-run" => Ok(ProvisionerKind::Memory),
            _ => Err(anyhow::anyhow!("Invalid provisioner kind: {}", s)),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DbConfig,
    pub cors: CorsConfig,
    pub sweeper: SweeperSettings,
    pub orchestrator: OrchestratorSettings,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Garbage-collection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperSettings {
    pub interval_secs: u64,
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    pub provisioner: ProvisionerKind,
    /// Binary spawned per compute unit by the process provisioner
    pub worker_binary: String,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("RELAY_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("RELAY_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: std::env::var("RELAY_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            database: DbConfig::from_env().unwrap_or_else(|_| DbConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                ..DbConfig::default()
            }),
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
                allow_credentials: std::env::var("CORS_ALLOW_CREDENTIALS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
            },
            sweeper: SweeperSettings {
                interval_secs: std::env::var("RELAY_SWEEP_INTERVAL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
            },
            orchestrator: OrchestratorSettings {
                provisioner: std::env::var("RELAY_PROVISIONER")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
                worker_binary: std::env::var("RELAY_WORKER_BINARY")
                    .unwrap_or_else(|_| DEFAULT_WORKER_BINARY.to_string()),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.sweeper.interval_secs == 0 {
            anyhow::bail!("Sweep interval must be greater than 0");
        }

        if self.orchestrator.worker_binary.trim().is_empty() {
            anyhow::bail!("Worker binary path cannot be empty");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DbConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                ..DbConfig::default()
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            sweeper: SweeperSettings {
                interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            },
            orchestrator: OrchestratorSettings {
                provisioner: ProvisionerKind::default(),
                worker_binary: DEFAULT_WORKER_BINARY.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_sweep_interval_is_rejected() {
        let mut config = Config::default();
        config.sweeper.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provisioner_kind_from_str() {
        assert_eq!("process".parse::<ProvisionerKind>().unwrap(), ProvisionerKind::Process);
        assert_eq!("memory".parse::<ProvisionerKind>().unwrap(), ProvisionerKind::Memory);
        assert_eq!("dry-run".parse::<ProvisionerKind>().unwrap(), ProvisionerKind::Memory);
        assert!("cloud".parse::<ProvisionerKind>().is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_load_reads_environment_overrides() {
        std::env::set_var("RELAY_PORT", "9100");
        std::env::set_var("RELAY_PROVISIONER", "memory");
        std::env::set_var("RELAY_SWEEP_INTERVAL", "5");

        let config = Config::load().unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.orchestrator.provisioner, ProvisionerKind::Memory);
        assert_eq!(config.sweeper.interval_secs, 5);

        std::env::remove_var("RELAY_PORT");
        std::env::remove_var("RELAY_PROVISIONER");
        std::env::remove_var("RELAY_SWEEP_INTERVAL");
    }
}
