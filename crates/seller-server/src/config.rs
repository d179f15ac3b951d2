//! Configuration management

use serde::{Deserialize, Serialize};

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
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/seller_sync";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

// ============================================================================
// Collaborator Constants
// ============================================================================

/// Seller API host.
pub const DEFAULT_MARKETPLACE_BASE_URL: &str = "https://api-seller.ozon.ru";

/// Upstream request timeout. The pipelines do not retry, so this is the only bound
/// on a hung upstream call.
pub const DEFAULT_MARKETPLACE_TIMEOUT_SECS: u64 = 120;

/// Google Sheets REST host.
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Sheets request timeout in seconds.
pub const DEFAULT_SHEETS_TIMEOUT_SECS: u64 = 60;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub marketplace: MarketplaceConfig,
    pub sheets: SheetsConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Upstream marketplace API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Spreadsheet export target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    pub base_url: String,
    /// Target spreadsheet; export endpoints fail when unset
    pub spreadsheet_id: Option<String>,
    /// OAuth bearer token for the Sheets API
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: env_or("SELLER_HOST", DEFAULT_SERVER_HOST),
                port: env_parse("SELLER_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_parse(
                    "SELLER_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_parse(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_parse(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_parse(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_parse(
                    "DATABASE_IDLE_TIMEOUT",
                    DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
                ),
            },
            cors: CorsConfig {
                allowed_origins: env_or("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_parse("CORS_ALLOW_CREDENTIALS", true),
            },
            marketplace: MarketplaceConfig {
                base_url: env_or("MARKETPLACE_BASE_URL", DEFAULT_MARKETPLACE_BASE_URL),
                timeout_secs: env_parse("MARKETPLACE_TIMEOUT_SECS", DEFAULT_MARKETPLACE_TIMEOUT_SECS),
            },
            sheets: SheetsConfig {
                base_url: env_or("SHEETS_BASE_URL", DEFAULT_SHEETS_BASE_URL),
                spreadsheet_id: env_opt("SHEETS_SPREADSHEET_ID"),
                access_token: env_opt("SHEETS_ACCESS_TOKEN"),
                timeout_secs: env_parse("SHEETS_TIMEOUT_SECS", DEFAULT_SHEETS_TIMEOUT_SECS),
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

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.marketplace.base_url.is_empty() {
            anyhow::bail!("Marketplace base URL cannot be empty");
        }

        if self.marketplace.timeout_secs == 0 || self.sheets.timeout_secs == 0 {
            anyhow::bail!("Collaborator timeouts must be greater than 0");
        }

        if self.sheets.spreadsheet_id.is_none() || self.sheets.access_token.is_none() {
            tracing::warn!(
                "SHEETS_SPREADSHEET_ID or SHEETS_ACCESS_TOKEN not set - spreadsheet export will fail"
            );
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
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            marketplace: MarketplaceConfig {
                base_url: DEFAULT_MARKETPLACE_BASE_URL.to_string(),
                timeout_secs: DEFAULT_MARKETPLACE_TIMEOUT_SECS,
            },
            sheets: SheetsConfig {
                base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
                spreadsheet_id: None,
                access_token: None,
                timeout_secs: DEFAULT_SHEETS_TIMEOUT_SECS,
            },
        }
    }
}
