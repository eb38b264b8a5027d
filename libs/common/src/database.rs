//! Database module for resolving store configuration into a connection pool
//!
//! The backend kind is read once at startup and dispatched to the matching
//! sqlx driver. An unsupported backend is a configuration error and never
//! reaches a request path.

use crate::error::{DatabaseError, DatabaseResult};
use config::{Config, Environment};
use serde::Deserialize;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode},
    postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode},
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::{fmt, str::FromStr, time::Duration};
use tracing::{error, info};

/// Relational backends the store can be built on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Postgres,
    MySql,
    Sqlite,
}

impl BackendKind {
    /// Port used when `DATABASE_PORT` is not set
    pub fn default_port(self) -> u16 {
        match self {
            BackendKind::Postgres => 5432,
            BackendKind::MySql => 3306,
            BackendKind::Sqlite => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::MySql => "mysql",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "mysql" => Ok(BackendKind::MySql),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(DatabaseError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Transport security requested for the store connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    Disable,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl FromStr for TlsMode {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "disable" | "disabled" => Ok(TlsMode::Disable),
            "prefer" | "preferred" => Ok(TlsMode::Prefer),
            "require" | "required" => Ok(TlsMode::Require),
            "verify-ca" => Ok(TlsMode::VerifyCa),
            "verify-full" | "verify-identity" => Ok(TlsMode::VerifyFull),
            other => Err(DatabaseError::Configuration(format!(
                "Unknown TLS mode: {}",
                other
            ))),
        }
    }
}

impl From<TlsMode> for PgSslMode {
    fn from(mode: TlsMode) -> Self {
        match mode {
            TlsMode::Disable => PgSslMode::Disable,
            TlsMode::Prefer => PgSslMode::Prefer,
            TlsMode::Require => PgSslMode::Require,
            TlsMode::VerifyCa => PgSslMode::VerifyCa,
            TlsMode::VerifyFull => PgSslMode::VerifyFull,
        }
    }
}

impl From<TlsMode> for MySqlSslMode {
    fn from(mode: TlsMode) -> Self {
        match mode {
            TlsMode::Disable => MySqlSslMode::Disabled,
            TlsMode::Prefer => MySqlSslMode::Preferred,
            TlsMode::Require => MySqlSslMode::Required,
            TlsMode::VerifyCa => MySqlSslMode::VerifyCa,
            TlsMode::VerifyFull => MySqlSslMode::VerifyIdentity,
        }
    }
}

/// Database configuration struct
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Which driver to connect with
    pub backend: BackendKind,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Database name, or the file path for SQLite (`:memory:` for an in-memory store)
    pub name: String,
    pub ssl_mode: TlsMode,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connection_timeout: u64,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

/// Shape of the `DATABASE_*` environment before backend and TLS mode are resolved
#[derive(Debug, Deserialize)]
struct RawDatabaseConfig {
    backend: String,
    host: String,
    port: Option<u16>,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    name: String,
    ssl_mode: String,
    max_connections: u32,
    min_connections: u32,
    connection_timeout: u64,
}

impl TryFrom<RawDatabaseConfig> for DatabaseConfig {
    type Error = DatabaseError;

    fn try_from(raw: RawDatabaseConfig) -> DatabaseResult<Self> {
        let backend: BackendKind = raw.backend.parse()?;
        let ssl_mode: TlsMode = raw.ssl_mode.parse()?;

        if backend == BackendKind::Sqlite && raw.name.is_empty() {
            return Err(DatabaseError::Configuration(
                "DATABASE_NAME must name a SQLite file or :memory:".to_string(),
            ));
        }

        Ok(Self {
            backend,
            host: raw.host,
            port: raw.port.unwrap_or_else(|| backend.default_port()),
            username: raw.username,
            password: raw.password,
            name: raw.name,
            ssl_mode,
            max_connections: raw.max_connections,
            min_connections: raw.min_connections,
            connection_timeout: raw.connection_timeout,
        })
    }
}

impl DatabaseConfig {
    /// Create a new DatabaseConfig from environment variables
    ///
    /// # Environment Variables
    /// - `DATABASE_BACKEND`: `postgres`, `mysql` or `sqlite` (required)
    /// - `DATABASE_HOST`: server host (default: "localhost")
    /// - `DATABASE_PORT`: server port (default: the backend's well-known port)
    /// - `DATABASE_USERNAME` / `DATABASE_PASSWORD`: credentials
    /// - `DATABASE_NAME`: database name, or file path for SQLite
    /// - `DATABASE_SSL_MODE`: `disable`, `prefer`, `require`, `verify-ca`, `verify-full`
    ///   (default: "prefer")
    /// - `DATABASE_MAX_CONNECTIONS`: Maximum number of connections (default: 10)
    /// - `DATABASE_MIN_CONNECTIONS`: Minimum number of connections (default: 0)
    /// - `DATABASE_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 30)
    pub fn from_env() -> DatabaseResult<Self> {
        let raw: RawDatabaseConfig = Config::builder()
            .set_default("host", "localhost")?
            .set_default("ssl_mode", "prefer")?
            .set_default("max_connections", 10_i64)?
            .set_default("min_connections", 0_i64)?
            .set_default("connection_timeout", 30_i64)?
            .add_source(Environment::with_prefix("DATABASE"))
            .build()?
            .try_deserialize()?;

        Self::try_from(raw)
    }

    /// Configuration for a private in-memory SQLite store
    pub fn sqlite_in_memory() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            host: String::new(),
            port: 0,
            username: String::new(),
            password: String::new(),
            name: ":memory:".to_string(),
            ssl_mode: TlsMode::Disable,
            max_connections: 1,
            min_connections: 1,
            connection_timeout: 30,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.backend == BackendKind::Sqlite && self.name == ":memory:"
    }
}

/// One connection pool for whichever backend was configured
#[derive(Debug, Clone)]
pub enum StorePool {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl StorePool {
    pub fn backend(&self) -> BackendKind {
        match self {
            StorePool::Postgres(_) => BackendKind::Postgres,
            StorePool::MySql(_) => BackendKind::MySql,
            StorePool::Sqlite(_) => BackendKind::Sqlite,
        }
    }

    /// Close every connection held by the pool
    pub async fn close(&self) {
        match self {
            StorePool::Postgres(pool) => pool.close().await,
            StorePool::MySql(pool) => pool.close().await,
            StorePool::Sqlite(pool) => pool.close().await,
        }
    }
}

/// Initialize a connection pool for the configured backend
///
/// # Arguments
/// * `config` - Database configuration
///
/// # Returns
/// * `DatabaseResult<StorePool>` - Connection pool or error
pub async fn init_pool(config: &DatabaseConfig) -> DatabaseResult<StorePool> {
    info!(
        backend = %config.backend,
        host = %config.host,
        database = %config.name,
        "Initializing database connection pool"
    );

    let acquire_timeout = Duration::from_secs(config.connection_timeout);

    let pool = match config.backend {
        BackendKind::Postgres => {
            let options = PgConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .username(&config.username)
                .password(&config.password)
                .database(&config.name)
                .ssl_mode(config.ssl_mode.into());

            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(acquire_timeout)
                .connect_with(options)
                .await
                .map_err(DatabaseError::Connection)?;

            StorePool::Postgres(pool)
        }
        BackendKind::MySql => {
            let options = MySqlConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .username(&config.username)
                .password(&config.password)
                .database(&config.name)
                .ssl_mode(config.ssl_mode.into());

            let pool = MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(acquire_timeout)
                .connect_with(options)
                .await
                .map_err(DatabaseError::Connection)?;

            StorePool::MySql(pool)
        }
        BackendKind::Sqlite => {
            // An in-memory database lives and dies with its connection, so the
            // pool must hold exactly one and never recycle it.
            let (options, pool_options) = if config.is_in_memory() {
                let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
                    DatabaseError::Configuration(format!("Invalid SQLite options: {}", e))
                })?;
                let pool_options = SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None::<Duration>)
                    .max_lifetime(None::<Duration>);
                (options, pool_options)
            } else {
                let options = SqliteConnectOptions::new()
                    .filename(&config.name)
                    .create_if_missing(true);
                let pool_options = SqlitePoolOptions::new()
                    .max_connections(config.max_connections)
                    .min_connections(config.min_connections);
                (options, pool_options)
            };

            let pool = pool_options
                .acquire_timeout(acquire_timeout)
                .connect_with(options)
                .await
                .map_err(DatabaseError::Connection)?;

            StorePool::Sqlite(pool)
        }
    };

    info!(backend = %config.backend, "Database connection pool initialized successfully");
    Ok(pool)
}

/// Check database connectivity
///
/// # Arguments
/// * `pool` - Connection pool for any backend
///
/// # Returns
/// * `DatabaseResult<bool>` - True if the database is reachable, false otherwise
pub async fn health_check(pool: &StorePool) -> DatabaseResult<bool> {
    let result = match pool {
        StorePool::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        StorePool::MySql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        StorePool::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
    };

    match result {
        Ok(()) => {
            info!(backend = %pool.backend(), "Database health check successful");
            Ok(true)
        }
        Err(e) => {
            error!(backend = %pool.backend(), "Database health check failed: {}", e);
            Ok(false)
        }
    }
}
