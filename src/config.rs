//! Configuration handling for the gateway.
//!
//! Database settings are selected by a deployment environment indicator and
//! resolved from environment variables, with development-profile fallbacks for
//! anything missing.

use crate::error::{GatewayError, GatewayResult};
use clap::ValueEnum;
use sqlx::postgres::PgConnectOptions;
use std::env;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_USER: &str = "postgres";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_DATABASE: &str = "mydb";

// Pool configuration defaults
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 180;

/// Environment variable that selects the deployment environment.
pub const ENV_SELECTOR_VAR: &str = "APP_ENV";

/// Deployment environment the database configuration is selected by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    #[default]
    Development,
    Qa,
    Production,
    Training,
}

impl Environment {
    /// Resolve the environment from `APP_ENV`. Unset means development;
    /// an unrecognized value is a configuration error.
    pub fn from_env() -> GatewayResult<Self> {
        match env::var(ENV_SELECTOR_VAR) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::Development),
        }
    }

    /// Environment-variable suffix for this environment's settings group.
    fn var_suffix(self) -> &'static str {
        match self {
            Self::Development => "",
            Self::Qa => "_QA",
            Self::Production => "_PROD",
            Self::Training => "_TRAINING",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "qa" => Ok(Self::Qa),
            "production" | "prod" => Ok(Self::Production),
            "training" => Ok(Self::Training),
            other => Err(GatewayError::configuration(format!(
                "Unknown environment '{}' (expected development, qa, production or training)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Qa => write!(f, "qa"),
            Self::Production => write!(f, "production"),
            Self::Training => write!(f, "training"),
        }
    }
}

/// Database connection and pool configuration.
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    /// Sensitive - redacted from Debug output.
    pub password: String,
    pub port: u16,
    pub database: String,
    /// Minimum connections kept in the pool (default: 1)
    pub min_connections: u32,
    /// Maximum connections in the pool (default: 10)
    pub max_connections: u32,
    /// How long an invocation may wait for an idle connection (default: 30s)
    pub acquire_timeout: Duration,
    /// Connection-establishment timeout (default: 180s)
    pub connect_timeout: Duration,
    /// Per-statement execution timeout (default: 180s)
    pub statement_timeout: Duration,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("database", &self.database)
            .field("min_connections", &self.min_connections)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            statement_timeout: Duration::from_secs(DEFAULT_STATEMENT_TIMEOUT_SECS),
        }
    }
}

impl DbConfig {
    /// Build the configuration for a deployment environment.
    ///
    /// Each field is read from `DB_<FIELD><SUFFIX>` (e.g. `DB_HOST_QA`),
    /// falling back to the unsuffixed development variable and finally to the
    /// built-in development default.
    pub fn for_env(environment: Environment) -> Self {
        let suffix = environment.var_suffix();
        Self {
            host: env_field("DB_HOST", suffix).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            user: env_field("DB_USER", suffix).unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: env_field("DB_PASSWORD", suffix).unwrap_or_default(),
            port: env_field("DB_PORT", suffix)
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            database: env_field("DB_NAME", suffix)
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            min_connections: env_field("DB_POOL_MIN", suffix)
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MIN_CONNECTIONS),
            max_connections: env_field("DB_POOL_MAX", suffix)
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: env_field("DB_ACQUIRE_TIMEOUT", suffix)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS)),
            connect_timeout: env_field("DB_CONNECT_TIMEOUT", suffix)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            statement_timeout: env_field("DB_STATEMENT_TIMEOUT", suffix)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_STATEMENT_TIMEOUT_SECS)),
        }
    }

    /// Build the configuration for the environment named by `APP_ENV`.
    pub fn from_env() -> GatewayResult<Self> {
        let config = Self::for_env(Environment::from_env()?);
        config.validate()?;
        Ok(config)
    }

    /// Validate pool bounds and connection fields.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.max_connections == 0 {
            return Err(GatewayError::configuration(
                "max_connections must be greater than 0",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(GatewayError::configuration(format!(
                "min_connections ({}) cannot exceed max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.port == 0 {
            return Err(GatewayError::configuration("port must be non-zero"));
        }
        if self.host.is_empty() {
            return Err(GatewayError::configuration("host must not be empty"));
        }
        Ok(())
    }

    /// Connect options for the sqlx Postgres driver.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// Set the pool bounds (useful for tests and one-off scripts).
    pub fn with_pool_bounds(mut self, min: u32, max: u32) -> Self {
        self.min_connections = min;
        self.max_connections = max;
        self
    }

    /// Set the acquire timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }
}

/// Read `DB_<name><suffix>`, falling back to the unsuffixed variable.
/// Empty values count as unset.
fn env_field(name: &str, suffix: &str) -> Option<String> {
    let read = |var: &str| env::var(var).ok().filter(|v| !v.is_empty());
    if suffix.is_empty() {
        read(name)
    } else {
        read(&format!("{}{}", name, suffix)).or_else(|| read(name))
    }
}
