use crate::config::AppConfig;
use crate::entities::{recent_change, vacation};
use crate::errors::{ResultExt, ServiceError};
use metrics::{counter, gauge};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl DbConfig {
    /// Each connection to `sqlite::memory:` opens its own empty database, so the
    /// pool is pinned to a single connection for in-memory URLs.
    fn effective_max_connections(&self) -> u32 {
        if self.url.starts_with("sqlite::memory") || self.url.contains("mode=memory") {
            1
        } else {
            self.max_connections
        }
    }
}

/// Establishes a connection pool to the database
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let max_connections = config.effective_max_connections();
    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(max_connections)
        .min_connections(config.min_connections.min(max_connections))
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("staff_manager.db.max_connections", max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        max_connections
    );

    let db_pool = Database::connect(opt)
        .await
        .context("database connection establishment")?;

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

/// Establishes a connection pool using the application configuration
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    establish_connection_with_config(&cfg.db_config()).await
}

/// Creates the relational tables from their entity definitions when missing.
/// Used for fresh deployments and tests; there is no versioned migration history.
pub async fn create_schema(pool: &DbPool) -> Result<(), ServiceError> {
    create_table(pool, vacation::Entity).await?;
    create_table(pool, recent_change::Entity).await?;
    info!("Relational schema is in place");
    Ok(())
}

async fn create_table<E>(pool: &DbPool, entity: E) -> Result<(), ServiceError>
where
    E: EntityTrait,
{
    let backend = pool.get_database_backend();
    let table = entity.table_name().to_string();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();

    pool.execute(backend.build(&statement))
        .await
        .map_err(|e| {
            error!(table = %table, "Creating table failed: {}", e);
            e
        })
        .context(format!("creating table {}", table))?;

    debug!(table = %table, "Table ensured");
    Ok(())
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    debug!("Checking database connection");
    let result = pool.ping().await.context("database ping");
    if let Err(e) = &result {
        error!("Database connection check failed: {}", e);
        counter!("staff_manager.db.connection_failures", 1);
    }
    result
}
